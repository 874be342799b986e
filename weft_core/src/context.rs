use std::path::Path;

use crate::WeftError;
use crate::WeftResult;
use crate::config::Conventions;
use crate::engine::MarkdownRenderer;
use crate::meta::Breadcrumb;
use crate::meta::MetaResolver;
use crate::meta::breadcrumbs;
use crate::path_set::PathSet;
use crate::path_set::parent_dir;
use crate::path_set::read_source;
use crate::value::Mapping;
use crate::value::Value;

/// Context keys owned by weft. Global values with the same name are shadowed.
pub const RESERVED_KEYS: [&str; 5] = ["path", "breadcrumbs", "meta", "childMeta", "content"];

/// Everything a template sees when rendering one output.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
	/// Output path relative to the output root.
	pub path: String,
	pub breadcrumbs: Vec<Breadcrumb>,
	/// Inherited metadata of the target's directory, `None` when the ancestry
	/// has no metadata file.
	pub meta: Option<Value>,
	/// Resolved metadata of each child directory that carries a metadata
	/// file.
	pub child_meta: Mapping,
	/// HTML converted from the directory's markdown content file.
	pub content: Option<String>,
	pub globals: Mapping,
}

impl RenderContext {
	/// Flatten into the value handed to the template engine.
	///
	/// Globals are laid down first and the reserved keys written over them.
	/// `meta` is always present (as null when absent) while `content` is left
	/// out entirely when the directory has no markdown.
	pub fn to_value(&self) -> Value {
		let mut map = self.globals.clone();

		map.insert("path".to_string(), Value::String(self.path.clone()));
		map.insert(
			"breadcrumbs".to_string(),
			Value::Sequence(
				self.breadcrumbs
					.iter()
					.map(|crumb| {
						let mut entry = Mapping::new();
						entry.insert("name".to_string(), Value::String(crumb.name.clone()));
						entry.insert("path".to_string(), Value::String(crumb.path.clone()));
						Value::Mapping(entry)
					})
					.collect(),
			),
		);
		map.insert("meta".to_string(), self.meta.clone().unwrap_or_default());
		map.insert(
			"childMeta".to_string(),
			Value::Mapping(self.child_meta.clone()),
		);
		match &self.content {
			Some(content) => {
				map.insert("content".to_string(), Value::String(content.clone()));
			}
			None => {
				map.remove("content");
			}
		}

		Value::Mapping(map)
	}
}

/// Assembles a [`RenderContext`] for each output target.
pub struct ContextBuilder<'a> {
	root: &'a Path,
	markdown: &'a PathSet,
	conventions: &'a Conventions,
	resolver: MetaResolver<'a>,
	renderer: &'a dyn MarkdownRenderer,
	globals: &'a Mapping,
}

impl<'a> ContextBuilder<'a> {
	pub fn new(
		root: &'a Path,
		markdown: &'a PathSet,
		conventions: &'a Conventions,
		resolver: MetaResolver<'a>,
		renderer: &'a dyn MarkdownRenderer,
		globals: &'a Mapping,
	) -> Self {
		Self {
			root,
			markdown,
			conventions,
			resolver,
			renderer,
			globals,
		}
	}

	/// Build the context of `target`, an output path relative to the output
	/// root. Metadata and content come from the target's directory in the
	/// source tree.
	pub fn build(&self, target: &str) -> WeftResult<RenderContext> {
		let dir = parent_dir(target);

		Ok(RenderContext {
			path: target.to_string(),
			breadcrumbs: breadcrumbs(target),
			meta: self.resolver.resolve(dir)?,
			child_meta: self.resolver.child_meta(dir)?,
			content: self.content(dir)?,
			globals: self.globals.clone(),
		})
	}

	/// Convert the markdown content file of `dir`, if there is exactly one.
	fn content(&self, dir: &str) -> WeftResult<Option<String>> {
		let found = self
			.markdown
			.filter_by_depth_at_prefix(dir, 0)
			.filter_by_name(&self.conventions.markdown_name);

		match found.as_slice() {
			[] => Ok(None),
			[path] => {
				let source = read_source(self.root, path)?;
				self.renderer.to_html(path, &source).map(Some)
			}
			many => {
				Err(WeftError::DuplicateContent {
					directory: if dir.is_empty() {
						".".to_string()
					} else {
						dir.to_string()
					},
					name: self.conventions.markdown_name.clone(),
					count: many.len(),
				})
			}
		}
	}
}
