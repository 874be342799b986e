use std::collections::BTreeMap;
use std::error::Error as _;
use std::sync::Arc;

use minijinja::AutoEscape;
use minijinja::Environment;
use minijinja::UndefinedBehavior;

use crate::WeftError;
use crate::WeftResult;
use crate::value::Value;

/// Partial sources keyed by the name templates include them under.
pub type Partials = BTreeMap<String, String>;

/// Executes templates against a rendering context.
pub trait TemplateEngine {
	/// Parse a partial and return the names it makes available to other
	/// templates. `name` is the name derived from the partial's file name.
	fn defined_names(&self, path: &str, name: &str, source: &str) -> WeftResult<Vec<String>>;

	/// Render `source` (read from `path`) with `context`. Templates may refer
	/// to any entry of `partials` by name.
	fn render(
		&self,
		path: &str,
		source: &str,
		context: &Value,
		partials: &Arc<Partials>,
	) -> WeftResult<String>;
}

/// Converts markdown content to HTML.
pub trait MarkdownRenderer {
	fn to_html(&self, path: &str, source: &str) -> WeftResult<String>;
}

/// [`TemplateEngine`] backed by [`minijinja`].
///
/// Output is not auto-escaped since targets can be any text format, and
/// undefined attribute chains render as empty instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaEngine;

impl JinjaEngine {
	fn environment<'source>(partials: Option<Arc<Partials>>) -> Environment<'source> {
		let mut env = Environment::new();
		env.set_keep_trailing_newline(true);
		env.set_undefined_behavior(UndefinedBehavior::Chainable);
		env.set_auto_escape_callback(|_| AutoEscape::None);

		if let Some(partials) = partials {
			env.set_loader(move |name| Ok(partials.get(name).cloned()));
		}

		env
	}
}

impl TemplateEngine for JinjaEngine {
	fn defined_names(&self, path: &str, name: &str, source: &str) -> WeftResult<Vec<String>> {
		let env = Self::environment(None);
		env.template_from_named_str(name, source)
			.map_err(|e| {
				WeftError::TemplateSyntax {
					path: path.to_string(),
					reason: describe(&e),
				}
			})?;

		Ok(vec![name.to_string()])
	}

	fn render(
		&self,
		path: &str,
		source: &str,
		context: &Value,
		partials: &Arc<Partials>,
	) -> WeftResult<String> {
		let env = Self::environment(Some(Arc::clone(partials)));
		let template = env.template_from_named_str(path, source).map_err(|e| {
			WeftError::TemplateSyntax {
				path: path.to_string(),
				reason: describe(&e),
			}
		})?;

		template
			.render(minijinja::Value::from_serialize(context))
			.map_err(|e| {
				WeftError::TemplateRender {
					path: path.to_string(),
					reason: describe(&e),
				}
			})
	}
}

/// Flatten a minijinja error and its causes into one line.
fn describe(error: &minijinja::Error) -> String {
	let mut message = error.to_string();
	let mut source = error.source();
	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}
	message
}

/// [`MarkdownRenderer`] backed by the `markdown` crate with GitHub flavored
/// extensions. Raw HTML in the source is passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonMarkRenderer;

impl MarkdownRenderer for CommonMarkRenderer {
	fn to_html(&self, path: &str, source: &str) -> WeftResult<String> {
		let options = markdown::Options {
			compile: markdown::CompileOptions {
				allow_dangerous_html: true,
				..markdown::CompileOptions::gfm()
			},
			..markdown::Options::gfm()
		};

		markdown::to_html_with_options(source, &options).map_err(|message| {
			WeftError::Markdown {
				path: path.to_string(),
				reason: message.to_string(),
			}
		})
	}
}
