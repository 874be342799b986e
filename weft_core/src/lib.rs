//! `weft_core` is the build pipeline behind the [weft](https://github.com/weft-rs/weft) directory generator. It walks a source tree, classifies every file by its role, resolves inherited metadata for each output and renders templates into a mirrored output tree.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source tree
//!   → Discover (depth-first walk, ignored directories pruned)
//!   → Classify (partial, template, meta-template, metadata, markdown, static)
//!   → Verify partials (every partial compiles, names are unique)
//!   → Render templates (one output each)
//!   → Render meta-templates (one output per child directory with metadata)
//!   → Finalize (output-path collisions rejected)
//!   → Write (only after every stage succeeded)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: `weft.toml` loading, naming conventions and the resolved [`BuildConfig`].
//! - [`path_set`]: Ordered relative path sets, their filters and the directory walk.
//! - [`meta`]: Hierarchical metadata resolution and breadcrumbs.
//! - [`output`]: Input/output directory checks and the output writer.
//!
//! ## Rendering Context
//!
//! Every template is rendered with `path`, `breadcrumbs`, `meta`, `childMeta`, `content` (when the directory has a markdown file) and every global value. The five named keys always win over globals of the same name.
//!
//! ```text
//! blog/
//!   meta.yaml                 # { section: Blog }
//!   post.metatemplate.html    # rendered once per child below
//!   first/meta.yaml           # { title: First }
//!   second/meta.yaml          # { title: Second }
//! ```
//!
//! renders `blog/first/post.html` and `blog/second/post.html`, each with `meta` holding the blog metadata merged with its own.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weft_core::BuildConfig;
//! use weft_core::CommonMarkRenderer;
//! use weft_core::JinjaEngine;
//! use weft_core::build_site;
//!
//! let config = BuildConfig::new("site", "dist");
//! let report = build_site(&config, &JinjaEngine, &CommonMarkRenderer).unwrap();
//! println!("{} file(s) rendered", report.output.rendered.len());
//! ```

pub use classify::*;
pub use config::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use merge::*;
pub use meta::*;
pub use output::*;
pub use pipeline::*;
pub use value::*;

mod classify;
pub mod config;
mod context;
mod engine;
#[allow(unused_assignments)]
mod error;
mod merge;
pub mod meta;
pub mod output;
pub mod path_set;
mod pipeline;
mod value;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
