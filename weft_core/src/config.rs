use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::WeftError;
use crate::WeftResult;
use crate::merge::MergeMode;
use crate::merge::merge;
use crate::path_set::IgnoreRules;
use crate::path_set::escape_glob;
use crate::path_set::file_name;
use crate::path_set::join;
use crate::path_set::parent_dir;
use crate::value::Mapping;
use crate::value::Value;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["weft.toml", ".weft.toml", ".config/weft.toml"];

pub const DEFAULT_TEMPLATE_MARKER: &str = ".template";
pub const DEFAULT_META_TEMPLATE_MARKER: &str = ".metatemplate";
pub const DEFAULT_PARTIAL_MARKER: &str = ".partial";
pub const DEFAULT_METADATA_NAME: &str = "meta.yaml";
pub const DEFAULT_MARKDOWN_NAME: &str = "index.md";
/// Ignore file picked up from the input root when none is configured.
pub const DEFAULT_IGNORE_FILE: &str = ".weftignore";

/// Configuration loaded from a `weft.toml` file in the input root.
///
/// ```toml
/// ignore_file = ".weftignore"
/// metadata = "meta.yaml"
/// markdown = "index.md"
/// value_files = ["site.yaml"]
///
/// [markers]
/// template = ".template"
/// meta_template = ".metatemplate"
/// partial = ".partial"
///
/// [ignore]
/// patterns = ["drafts/", "*.bak"]
///
/// [values]
/// site = "Example"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeftConfig {
	/// Gitignore-syntax file, relative to the input root.
	#[serde(default)]
	pub ignore_file: Option<PathBuf>,
	/// Name of the per-directory metadata file.
	#[serde(default)]
	pub metadata: Option<String>,
	/// Name of the per-directory markdown content file.
	#[serde(default)]
	pub markdown: Option<String>,
	/// YAML files merged into the global values, relative to the input root.
	#[serde(default)]
	pub value_files: Vec<PathBuf>,
	#[serde(default)]
	pub markers: MarkersConfig,
	#[serde(default)]
	pub ignore: IgnoreConfig,
	/// Global values with the lowest precedence.
	#[serde(default)]
	pub values: Option<toml::Table>,
}

/// File name markers, matched by substring.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkersConfig {
	#[serde(default)]
	pub template: Option<String>,
	#[serde(default)]
	pub meta_template: Option<String>,
	#[serde(default)]
	pub partial: Option<String>,
}

/// Inline exclusion rules in gitignore syntax, applied on top of the ignore
/// file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreConfig {
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl WeftConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if no config file exists.
	pub fn load(root: &Path) -> WeftResult<Option<WeftConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content =
			std::fs::read_to_string(&config_path).map_err(|e| WeftError::io(&config_path, e))?;
		let config: WeftConfig =
			toml::from_str(&content).map_err(|e| WeftError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}
}

/// Naming conventions used to classify files and derive output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
	pub template_marker: String,
	pub meta_template_marker: String,
	pub partial_marker: String,
	pub metadata_name: String,
	pub markdown_name: String,
}

impl Default for Conventions {
	fn default() -> Self {
		Self {
			template_marker: DEFAULT_TEMPLATE_MARKER.to_string(),
			meta_template_marker: DEFAULT_META_TEMPLATE_MARKER.to_string(),
			partial_marker: DEFAULT_PARTIAL_MARKER.to_string(),
			metadata_name: DEFAULT_METADATA_NAME.to_string(),
			markdown_name: DEFAULT_MARKDOWN_NAME.to_string(),
		}
	}
}

impl Conventions {
	/// Output path of a template: the template marker removed from its file
	/// name. `docs/index.template.html` becomes `docs/index.html`.
	pub fn template_target(&self, path: &str) -> String {
		strip_marker(path, &self.template_marker)
	}

	/// Output path of a meta-template rendered for `child`:
	/// `blog/post.metatemplate.html` with child `one` becomes
	/// `blog/one/post.html`.
	pub fn meta_template_target(&self, path: &str, child: &str) -> String {
		let stripped = strip_marker(file_name(path), &self.meta_template_marker);
		join(&join(parent_dir(path), child), &stripped)
	}

	/// Name a partial is registered under: its file name without the partial
	/// marker. `layout/nav.partial.html` defines `nav.html`.
	pub fn partial_name(&self, path: &str) -> String {
		strip_marker(file_name(path), &self.partial_marker)
	}
}

/// Remove the first occurrence of `marker` from the file name of `path`.
fn strip_marker(path: &str, marker: &str) -> String {
	if marker.is_empty() {
		return path.to_string();
	}

	let name = file_name(path);
	join(parent_dir(path), &name.replacen(marker, "", 1))
}

/// Build options supplied on the command line. Every `Some` overrides the
/// corresponding `weft.toml` entry.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
	pub ignore_file: Option<PathBuf>,
	pub template_marker: Option<String>,
	pub meta_template_marker: Option<String>,
	pub partial_marker: Option<String>,
	pub metadata_name: Option<String>,
	pub markdown_name: Option<String>,
	/// YAML files merged over the config values, in order.
	pub value_files: Vec<PathBuf>,
	/// `key=value` pairs merged last, in order.
	pub values: Vec<String>,
	pub dry_run: bool,
	pub preserve_output: bool,
}

/// The fully resolved, immutable configuration for one build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
	pub input: PathBuf,
	pub output: PathBuf,
	pub conventions: Conventions,
	/// Absolute path of the ignore file, when one applies.
	pub ignore_file: Option<PathBuf>,
	/// Inline ignore lines, applied after the ignore file.
	pub ignore_lines: Vec<String>,
	/// Caller supplied values exposed to every template.
	pub globals: Mapping,
	pub dry_run: bool,
	pub preserve_output: bool,
}

impl BuildConfig {
	/// A configuration with default conventions and no globals.
	pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
		Self {
			input: input.into(),
			output: output.into(),
			conventions: Conventions::default(),
			ignore_file: None,
			ignore_lines: Vec::new(),
			globals: Mapping::new(),
			dry_run: false,
			preserve_output: false,
		}
	}

	/// Resolve defaults, `weft.toml` and command line options into a single
	/// configuration. Later sources win.
	pub fn resolve(input: &Path, output: &Path, options: &BuildOptions) -> WeftResult<Self> {
		let config = if input.is_dir() {
			WeftConfig::load(input)?.unwrap_or_default()
		} else {
			WeftConfig::default()
		};

		let defaults = Conventions::default();
		let conventions = Conventions {
			template_marker: pick(
				options.template_marker.as_deref(),
				config.markers.template.as_deref(),
				defaults.template_marker,
			),
			meta_template_marker: pick(
				options.meta_template_marker.as_deref(),
				config.markers.meta_template.as_deref(),
				defaults.meta_template_marker,
			),
			partial_marker: pick(
				options.partial_marker.as_deref(),
				config.markers.partial.as_deref(),
				defaults.partial_marker,
			),
			metadata_name: pick(
				options.metadata_name.as_deref(),
				config.metadata.as_deref(),
				defaults.metadata_name,
			),
			markdown_name: pick(
				options.markdown_name.as_deref(),
				config.markdown.as_deref(),
				defaults.markdown_name,
			),
		};

		let ignore_file = match (&options.ignore_file, &config.ignore_file) {
			(Some(file), _) => Some(file.clone()),
			(None, Some(file)) => Some(input.join(file)),
			(None, None) => {
				let fallback = input.join(DEFAULT_IGNORE_FILE);
				fallback.is_file().then_some(fallback)
			}
		};

		let mut ignore_lines: Vec<String> = CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| format!("/{candidate}"))
			.collect();
		let data_files = config
			.value_files
			.iter()
			.map(|file| input.join(file))
			.chain(options.value_files.iter().cloned());
		for file in ignore_file.iter().cloned().chain(data_files) {
			if let Some(relative) = relative_to_input(input, &file) {
				ignore_lines.push(format!("/{}", escape_glob(&relative)));
			}
		}
		ignore_lines.extend(config.ignore.patterns.iter().cloned());

		let mut globals = Value::Mapping(Mapping::new());
		if let Some(table) = config.values.clone() {
			let values = Value::from_toml(toml::Value::Table(table), "weft.toml [values]")?;
			globals = merge(values, globals, MergeMode::Override);
		}
		for file in &config.value_files {
			let values = load_value_file(&input.join(file))?;
			globals = merge(values, globals, MergeMode::Override);
		}
		for file in &options.value_files {
			let values = load_value_file(file)?;
			globals = merge(values, globals, MergeMode::Override);
		}
		for pair in &options.values {
			let (key, value) = parse_value_pair(pair)?;
			let mut single = Mapping::new();
			single.insert(key, value);
			globals = merge(Value::Mapping(single), globals, MergeMode::Override);
		}
		let globals = match globals {
			Value::Mapping(map) => map,
			_ => Mapping::new(),
		};

		Ok(Self {
			input: input.to_path_buf(),
			output: output.to_path_buf(),
			conventions,
			ignore_file,
			ignore_lines,
			globals,
			dry_run: options.dry_run,
			preserve_output: options.preserve_output,
		})
	}

	/// Compile the ignore file and lines, plus any `extra` lines (such as a
	/// nested output directory).
	pub fn ignore_rules(&self, extra: &[String]) -> WeftResult<IgnoreRules> {
		let mut lines = self.ignore_lines.clone();
		lines.extend(extra.iter().cloned());
		IgnoreRules::build(&self.input, self.ignore_file.as_deref(), &lines)
	}
}

/// The `/`-separated path of `file` below `input`, when it lies inside it.
fn relative_to_input(input: &Path, file: &Path) -> Option<String> {
	let relative = match (input.canonicalize(), file.canonicalize()) {
		(Ok(input), Ok(file)) => file.strip_prefix(input).ok()?.to_path_buf(),
		_ => file.strip_prefix(input).ok()?.to_path_buf(),
	};
	let relative = relative.to_string_lossy().replace('\\', "/");

	(!relative.is_empty()).then_some(relative)
}

fn pick(option: Option<&str>, config: Option<&str>, default: String) -> String {
	option.or(config).map_or(default, str::to_string)
}

/// Load a YAML values file. The document root must be a mapping.
pub fn load_value_file(path: &Path) -> WeftResult<Value> {
	let content = std::fs::read_to_string(path).map_err(|e| WeftError::io(path, e))?;
	Value::mapping_from_yaml_str(&content, &path.display().to_string())
}

/// Split `key=value`; the value is read as a YAML scalar.
pub fn parse_value_pair(pair: &str) -> WeftResult<(String, Value)> {
	let Some((key, value)) = pair.split_once('=') else {
		return Err(WeftError::InvalidValue(pair.to_string()));
	};
	let key = key.trim();
	if key.is_empty() {
		return Err(WeftError::InvalidValue(pair.to_string()));
	}

	Ok((key.to_string(), Value::from_scalar(value)))
}
