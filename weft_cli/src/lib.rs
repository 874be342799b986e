use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use weft_core::BuildOptions;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render a directory of templates, metadata and markdown into a mirrored output tree.",
	long_about = "weft walks a source directory, classifies every file by its name and renders \
	              templates with metadata inherited from the directories above them.\n\nFile \
	              roles:\n  *.template.*      rendered once\n  *.metatemplate.*  rendered once \
	              per child directory with a meta.yaml\n  *.partial.*       included by other \
	              templates\n  meta.yaml         metadata inherited by the directory\n  \
	              index.md          markdown exposed as `content`\n  anything else     copied \
	              verbatim\n\nQuick start:\n  weft init   Create a sample weft.toml and template\n  \
	              weft build  Render the current directory into ./dist\n  weft list   Show how \
	              each file is classified"
)]
pub struct WeftCli {
	#[command(subcommand)]
	pub command: Commands,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render the input directory into the output directory.
	///
	/// The output directory is cleared before writing unless
	/// `--preserve-output` is passed. An output nested inside the input is
	/// skipped during discovery.
	Build(BuildArgs),
	/// List every discovered file grouped by the role it plays.
	List {
		/// The source directory.
		#[arg(default_value = ".")]
		input: PathBuf,

		/// The output directory, excluded from the listing when nested inside
		/// the input.
		#[arg(long, default_value = "dist")]
		output: PathBuf,
	},
	/// Create a sample `weft.toml` and `index.template.html`.
	///
	/// Existing files are left untouched.
	Init {
		/// The directory to initialize.
		#[arg(default_value = ".")]
		input: PathBuf,
	},
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuildArgs {
	/// The source directory.
	#[arg(default_value = ".")]
	pub input: PathBuf,

	/// The output directory.
	#[arg(default_value = "dist")]
	pub output: PathBuf,

	/// Gitignore-syntax file listing sources to skip. Defaults to
	/// `.weftignore` in the input when present.
	#[arg(long)]
	pub ignore_file: Option<PathBuf>,

	/// File name marker of templates.
	#[arg(long, value_name = "MARKER")]
	pub template_marker: Option<String>,

	/// File name marker of meta-templates.
	#[arg(long, value_name = "MARKER")]
	pub meta_template_marker: Option<String>,

	/// File name marker of partials.
	#[arg(long, value_name = "MARKER")]
	pub partial_marker: Option<String>,

	/// Name of the per-directory metadata file.
	#[arg(long, value_name = "NAME")]
	pub metadata: Option<String>,

	/// Name of the per-directory markdown content file.
	#[arg(long, value_name = "NAME")]
	pub markdown: Option<String>,

	/// A global value available to every template. Repeatable; later values
	/// win.
	#[arg(long = "value", value_name = "KEY=VALUE")]
	pub values: Vec<String>,

	/// A YAML file of global values. Repeatable; merged before `--value`.
	#[arg(long = "values", value_name = "FILE")]
	pub value_files: Vec<PathBuf>,

	/// Render everything but write nothing.
	#[arg(long, default_value_t = false)]
	pub dry_run: bool,

	/// With `--dry-run`, show a diff against the existing output files.
	#[arg(long, default_value_t = false, requires = "dry_run")]
	pub diff: bool,

	/// Keep existing files in the output directory.
	#[arg(long, default_value_t = false)]
	pub preserve_output: bool,

	/// Rebuild whenever the input changes.
	#[arg(long, default_value_t = false, conflicts_with = "dry_run")]
	pub watch: bool,
}

impl BuildArgs {
	/// The command line layer of the build configuration.
	pub fn options(&self) -> BuildOptions {
		BuildOptions {
			ignore_file: self.ignore_file.clone(),
			template_marker: self.template_marker.clone(),
			meta_template_marker: self.meta_template_marker.clone(),
			partial_marker: self.partial_marker.clone(),
			metadata_name: self.metadata.clone(),
			markdown_name: self.markdown.clone(),
			value_files: self.value_files.clone(),
			values: self.values.clone(),
			dry_run: self.dry_run,
			preserve_output: self.preserve_output,
		}
	}
}
