use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::WeftError;
use crate::WeftResult;
use crate::classify::Classification;
use crate::classify::classify;
use crate::config::BuildConfig;
use crate::context::ContextBuilder;
use crate::engine::MarkdownRenderer;
use crate::engine::Partials;
use crate::engine::TemplateEngine;
use crate::meta::MetaResolver;
use crate::output::OutputGuard;
use crate::output::OutputPlan;
use crate::output::OutputRelation;
use crate::output::WriteSummary;
use crate::output::write_output;
use crate::path_set::PathSet;
use crate::path_set::parent_dir;
use crate::path_set::read_source;

/// The steps of one build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Discover,
	Classify,
	VerifyPartials,
	RenderTemplates,
	RenderMetaTemplates,
	Finalize,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::Discover => "discover",
			Self::Classify => "classify",
			Self::VerifyPartials => "verify-partials",
			Self::RenderTemplates => "render-templates",
			Self::RenderMetaTemplates => "render-meta-templates",
			Self::Finalize => "finalize",
		};
		f.write_str(label)
	}
}

/// One rendered output and the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
	pub source: String,
	pub contents: String,
}

/// Everything a build produces, ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
	/// Rendered files keyed by output path.
	pub rendered: BTreeMap<String, RenderedFile>,
	/// Files copied verbatim. Their output path equals their source path.
	pub statics: PathSet,
}

impl RenderOutput {
	/// Every output path, rendered and static, sorted.
	pub fn targets(&self) -> Vec<&str> {
		let mut targets: Vec<&str> = self
			.rendered
			.keys()
			.map(String::as_str)
			.chain(self.statics.iter().map(String::as_str))
			.collect();
		targets.sort_unstable();
		targets
	}
}

/// Runs discovery through rendering for one [`BuildConfig`] and returns the
/// output map. Nothing is written.
pub struct Pipeline<'a> {
	config: &'a BuildConfig,
	engine: &'a dyn TemplateEngine,
	markdown: &'a dyn MarkdownRenderer,
	extra_ignore: Vec<String>,
	keep_statics: bool,
}

impl<'a> Pipeline<'a> {
	pub fn new(
		config: &'a BuildConfig,
		engine: &'a dyn TemplateEngine,
		markdown: &'a dyn MarkdownRenderer,
	) -> Self {
		Self {
			config,
			engine,
			markdown,
			extra_ignore: Vec::new(),
			keep_statics: true,
		}
	}

	/// Additional gitignore lines applied during discovery.
	#[must_use]
	pub fn with_ignored(mut self, lines: Vec<String>) -> Self {
		self.extra_ignore.extend(lines);
		self
	}

	/// Leave static files out of the output. Used when building in place,
	/// where every static file is already at its destination.
	#[must_use]
	pub fn without_statics(mut self) -> Self {
		self.keep_statics = false;
		self
	}

	/// Discover and classify the source tree without rendering.
	pub fn discover(&self) -> WeftResult<Classification> {
		enter(Stage::Discover);
		let rules = self.config.ignore_rules(&self.extra_ignore)?;
		let paths = PathSet::generate(&self.config.input, &rules)?;

		enter(Stage::Classify);
		Ok(classify(&paths, &self.config.conventions))
	}

	/// Run every stage. Any failure aborts the run before output is
	/// produced.
	pub fn run(&self) -> WeftResult<RenderOutput> {
		let classification = self.discover()?;

		enter(Stage::VerifyPartials);
		let partials = Arc::new(self.verify_partials(&classification.partials)?);

		let root = self.config.input.as_path();
		let conventions = &self.config.conventions;
		let resolver = MetaResolver::new(root, &classification.metadata, &conventions.metadata_name);
		let contexts = ContextBuilder::new(
			root,
			&classification.markdown,
			conventions,
			resolver,
			self.markdown,
			&self.config.globals,
		);

		let mut rendered = Vec::new();

		enter(Stage::RenderTemplates);
		for path in &classification.templates {
			let source = read_source(root, path)?;
			let target = conventions.template_target(path);
			let contents = self.render(&contexts, &partials, path, &source, &target)?;
			rendered.push((target, RenderedFile {
				source: path.clone(),
				contents,
			}));
		}

		enter(Stage::RenderMetaTemplates);
		for path in &classification.meta_templates {
			let children = resolver.children_with_metadata(parent_dir(path));
			if children.is_empty() {
				tracing::warn!(path = %path, "meta-template has no child directories with metadata");
				continue;
			}

			let source = read_source(root, path)?;
			for child in children {
				let target = conventions.meta_template_target(path, &child);
				let contents = self.render(&contexts, &partials, path, &source, &target)?;
				rendered.push((target, RenderedFile {
					source: path.clone(),
					contents,
				}));
			}
		}

		enter(Stage::Finalize);
		let statics = if self.keep_statics {
			classification.statics
		} else {
			PathSet::default()
		};
		finalize(rendered, statics)
	}

	/// Compile every partial and map each name it defines to its source.
	/// Two files defining the same name is an error.
	fn verify_partials(&self, paths: &PathSet) -> WeftResult<Partials> {
		let mut partials = Partials::new();
		let mut origins: BTreeMap<String, String> = BTreeMap::new();

		for path in paths {
			let source = read_source(&self.config.input, path)?;
			let name = self.config.conventions.partial_name(path);

			for defined in self.engine.defined_names(path, &name, &source)? {
				if let Some(first) = origins.get(&defined) {
					return Err(WeftError::DuplicatePartial {
						name: defined,
						first_file: first.clone(),
						second_file: path.clone(),
					});
				}
				origins.insert(defined.clone(), path.clone());
				partials.insert(defined, source.clone());
			}
		}

		tracing::debug!(count = partials.len(), "registered partials");
		Ok(partials)
	}

	fn render(
		&self,
		contexts: &ContextBuilder<'_>,
		partials: &Arc<Partials>,
		path: &str,
		source: &str,
		target: &str,
	) -> WeftResult<String> {
		let context = contexts.build(target)?;
		let contents = self
			.engine
			.render(path, source, &context.to_value(), partials)?;
		tracing::debug!(source = %path, target = %target, "rendered");

		Ok(contents)
	}
}

fn enter(stage: Stage) {
	tracing::debug!(%stage, "entering stage");
}

/// Collect rendered files into the output map, rejecting any output path
/// produced twice or shadowing a static file.
fn finalize(rendered: Vec<(String, RenderedFile)>, statics: PathSet) -> WeftResult<RenderOutput> {
	let mut output: BTreeMap<String, RenderedFile> = BTreeMap::new();

	for (target, file) in rendered {
		if let Some(existing) = output.get(&target) {
			return Err(WeftError::OutputCollision {
				path: target,
				first_source: existing.source.clone(),
				second_source: file.source,
			});
		}
		output.insert(target, file);
	}

	for path in &statics {
		if let Some(existing) = output.get(path) {
			return Err(WeftError::OutputCollision {
				path: path.clone(),
				first_source: existing.source.clone(),
				second_source: path.clone(),
			});
		}
	}

	Ok(RenderOutput {
		rendered: output,
		statics,
	})
}

/// The outcome of [`build_site`].
#[derive(Debug, Clone)]
pub struct BuildReport {
	pub plan: OutputPlan,
	pub output: RenderOutput,
	/// `None` for a dry run.
	pub written: Option<WriteSummary>,
}

/// Check the output directory, render the source tree and, unless this is a
/// dry run, write the result.
///
/// The output directory is only prepared once rendering has succeeded, so a
/// failed build never touches it.
pub fn build_site(
	config: &BuildConfig,
	engine: &dyn TemplateEngine,
	markdown: &dyn MarkdownRenderer,
) -> WeftResult<BuildReport> {
	let plan = OutputGuard::check(&config.input, &config.output, config.preserve_output)?;
	let mut pipeline =
		Pipeline::new(config, engine, markdown).with_ignored(plan.ignored_paths());
	if plan.relation == OutputRelation::Same {
		pipeline = pipeline.without_statics();
	}
	let output = pipeline.run()?;

	let written = if config.dry_run {
		None
	} else {
		plan.prepare()?;
		Some(write_output(&plan, &output)?)
	};

	tracing::info!(
		rendered = output.rendered.len(),
		statics = output.statics.len(),
		dry_run = config.dry_run,
		"build finished"
	);

	Ok(BuildReport {
		plan,
		output,
		written,
	})
}
