use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Broad category of a [`WeftError`].
///
/// Every kind is fatal for a one-shot build. In watch mode the failed rebuild
/// is reported and the loop keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Bad directories, ambiguous partials, colliding outputs and similar
	/// problems with how the source tree is laid out.
	Configuration,
	/// The source tree or its ignore rules could not be enumerated.
	Discovery,
	/// Metadata, values or template syntax could not be parsed.
	Parse,
	/// A template or markdown file failed while being executed.
	Render,
	/// Reading or writing the filesystem failed.
	Io,
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum WeftError {
	#[error("failed to access `{path}`: {source}")]
	#[diagnostic(code(weft::io_error))]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("input directory `{0}` does not exist")]
	#[diagnostic(
		code(weft::missing_input),
		help("pass an existing directory as the build input")
	)]
	MissingInput(PathBuf),

	#[error("`{0}` is not a directory")]
	#[diagnostic(code(weft::not_a_directory))]
	NotADirectory(PathBuf),

	#[error("input and output are the same directory: `{0}`")]
	#[diagnostic(
		code(weft::destructive_output),
		help(
			"the output directory is cleared before every build; choose a different output or \
			 pass `--preserve-output`"
		)
	)]
	InputIsOutput(PathBuf),

	#[error("output directory `{output}` contains the input directory `{input}`")]
	#[diagnostic(
		code(weft::output_contains_input),
		help(
			"the output directory is cleared before every build, which would delete the sources; \
			 choose a different output or pass `--preserve-output`"
		)
	)]
	OutputContainsInput { input: PathBuf, output: PathBuf },

	#[error("duplicate partial `{name}`: defined in `{first_file}` and `{second_file}`")]
	#[diagnostic(
		code(weft::duplicate_partial),
		help("each partial name must be unique across the source tree")
	)]
	DuplicatePartial {
		name: String,
		first_file: String,
		second_file: String,
	},

	#[error("output `{path}` is produced by both `{first_source}` and `{second_source}`")]
	#[diagnostic(
		code(weft::output_collision),
		help("rename one of the sources so that every output path is unique")
	)]
	OutputCollision {
		path: String,
		first_source: String,
		second_source: String,
	},

	#[error("directory `{directory}` contains {count} markdown content files named `{name}`")]
	#[diagnostic(
		code(weft::duplicate_content),
		help("keep exactly one markdown content file per directory")
	)]
	DuplicateContent {
		directory: String,
		name: String,
		count: usize,
	},

	#[error("source root `{0}` could not be found")]
	#[diagnostic(code(weft::missing_root))]
	MissingRoot(PathBuf),

	#[error("failed to load ignore rules from `{path}`: {reason}")]
	#[diagnostic(
		code(weft::ignore_rules),
		help("ignore files use `.gitignore` syntax")
	)]
	IgnoreRules { path: String, reason: String },

	#[error("symlink cycle detected at: `{path}`")]
	#[diagnostic(
		code(weft::symlink_cycle),
		help("remove the circular symlink or ignore this path")
	)]
	SymlinkCycle { path: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(weft::config_parse),
		help("check that weft.toml is valid TOML")
	)]
	ConfigParse(String),

	#[error("invalid value `{0}`")]
	#[diagnostic(
		code(weft::invalid_value),
		help("values are passed as `key=value`")
	)]
	InvalidValue(String),

	#[error("failed to parse metadata `{path}`: {reason}")]
	#[diagnostic(code(weft::metadata_parse))]
	MetadataParse { path: String, reason: String },

	#[error("failed to parse template `{path}`: {reason}")]
	#[diagnostic(code(weft::template_syntax))]
	TemplateSyntax { path: String, reason: String },

	#[error("failed to render `{path}`: {reason}")]
	#[diagnostic(code(weft::template_render))]
	TemplateRender { path: String, reason: String },

	#[error("failed to convert markdown `{path}`: {reason}")]
	#[diagnostic(code(weft::markdown))]
	Markdown { path: String, reason: String },

	#[error("file `{0}` is not valid UTF-8")]
	#[diagnostic(code(weft::invalid_utf8))]
	InvalidUtf8(PathBuf),
}

impl WeftError {
	/// Wrap an [`std::io::Error`] together with the path it happened on.
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}

	/// The category this error falls into.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Io { .. } | Self::InvalidUtf8(_) => ErrorKind::Io,
			Self::MissingInput(_)
			| Self::NotADirectory(_)
			| Self::InputIsOutput(_)
			| Self::OutputContainsInput { .. }
			| Self::DuplicatePartial { .. }
			| Self::OutputCollision { .. }
			| Self::DuplicateContent { .. } => ErrorKind::Configuration,
			Self::MissingRoot(_) | Self::IgnoreRules { .. } | Self::SymlinkCycle { .. } => {
				ErrorKind::Discovery
			}
			Self::ConfigParse(_)
			| Self::InvalidValue(_)
			| Self::MetadataParse { .. }
			| Self::TemplateSyntax { .. } => ErrorKind::Parse,
			Self::TemplateRender { .. } | Self::Markdown { .. } => ErrorKind::Render,
		}
	}
}

pub type WeftResult<T> = Result<T, WeftError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
