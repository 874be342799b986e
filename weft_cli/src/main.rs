use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use weft_cli::BuildArgs;
use weft_cli::Commands;
use weft_cli::WeftCli;
use weft_core::BuildConfig;
use weft_core::BuildOptions;
use weft_core::BuildReport;
use weft_core::CommonMarkRenderer;
use weft_core::FileKind;
use weft_core::JinjaEngine;
use weft_core::OutputGuard;
use weft_core::OutputRelation;
use weft_core::Pipeline;
use weft_core::build_site;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
	let args = WeftCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Commands::Build(build) => run_build(build),
		Commands::List { input, output } => run_list(input, output),
		Commands::Init { input } => run_init(input),
	};

	if let Err(e) = result {
		report_error(e);
		process::exit(2);
	}
}

/// Diagnostics go to stderr. `RUST_LOG` overrides the level picked by
/// `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_filter = if verbose { "weft=debug" } else { "weft=warn" };

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
		.with(
			tracing_subscriber::fmt::layer()
				.with_writer(std::io::stderr)
				.with_ansi(use_color),
		)
		.init();
}

fn report_error(e: Box<dyn std::error::Error>) {
	// Try to render through miette for rich diagnostics with help text
	// and error codes.
	match e.downcast::<weft_core::WeftError>() {
		Ok(weft_err) => {
			let report: miette::Report = (*weft_err).into();
			eprintln!("{report:?}");
		}
		Err(e) => {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn resolve_config(build: &BuildArgs) -> CliResult<BuildConfig> {
	Ok(BuildConfig::resolve(
		&build.input,
		&build.output,
		&build.options(),
	)?)
}

fn run_build(build: &BuildArgs) -> CliResult<()> {
	if !build.watch {
		run_build_once(build)?;
		return Ok(());
	}

	// A failing first build is reported like any later one.
	let first = match run_build_once(build) {
		Ok(report) => Some(report),
		Err(e) => {
			report_error(e);
			None
		}
	};

	run_watch(build, first.as_ref())
}

fn run_build_once(build: &BuildArgs) -> CliResult<BuildReport> {
	let config = resolve_config(build)?;
	let report = build_site(&config, &JinjaEngine, &CommonMarkRenderer)?;

	match report.written {
		Some(summary) => {
			println!(
				"{} {} rendered and {} copied file(s) into {}",
				colored!("Built", green),
				summary.rendered,
				summary.copied,
				config.output.display()
			);
		}
		None => {
			let targets = report.output.targets();
			println!(
				"{} would write {} file(s) to {}:",
				colored!("Dry run:", yellow),
				targets.len(),
				config.output.display()
			);
			for target in targets {
				println!("  {target}");
			}
			if build.diff {
				print_diffs(&report);
			}
		}
	}

	Ok(report)
}

fn print_diffs(report: &BuildReport) {
	for (target, file) in &report.output.rendered {
		let existing = std::fs::read_to_string(report.plan.output.join(target)).unwrap_or_default();
		if existing == file.contents {
			continue;
		}

		eprintln!();
		eprintln!("{}", colored!(target, bold));
		print_diff(&existing, &file.contents);
	}
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
		if change.missing_newline() {
			eprintln!();
		}
	}
}

/// Filesystem events worth a rebuild: anything outside a nested output
/// directory that the previous build did not write itself.
struct WatchFilter {
	output: Option<PathBuf>,
	generated: HashSet<PathBuf>,
}

impl WatchFilter {
	fn new(report: Option<&BuildReport>) -> Self {
		let mut filter = Self {
			output: None,
			generated: HashSet::new(),
		};
		if let Some(report) = report {
			filter.update(report);
		}
		filter
	}

	fn update(&mut self, report: &BuildReport) {
		let plan = &report.plan;
		self.output = matches!(plan.relation, OutputRelation::Nested(_)).then(|| plan.output.clone());
		self.generated = if plan.relation == OutputRelation::Same {
			report
				.output
				.rendered
				.keys()
				.map(|target| plan.output.join(target))
				.collect()
		} else {
			HashSet::new()
		};
	}

	fn is_relevant(&self, paths: &[PathBuf]) -> bool {
		paths.iter().any(|path| {
			let in_output = self
				.output
				.as_deref()
				.is_some_and(|output| path.starts_with(output));
			!in_output && !self.generated.contains(path)
		})
	}
}

fn run_watch(build: &BuildArgs, first: Option<&BuildReport>) -> CliResult<()> {
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = match first {
		Some(report) => report.plan.input.clone(),
		None => build.input.canonicalize()?,
	};
	let mut filter = WatchFilter::new(first);
	let (tx, rx) = mpsc::channel::<Vec<PathBuf>>();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(event.paths);
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;

	loop {
		let mut changed = rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while let Ok(paths) = rx.recv_timeout(Duration::from_millis(200)) {
			changed.extend(paths);
		}

		if !filter.is_relevant(&changed) {
			tracing::debug!(paths = changed.len(), "ignoring changes to generated output");
			continue;
		}

		println!("\nFile change detected, rebuilding...");
		match run_build_once(build) {
			Ok(report) => filter.update(&report),
			Err(e) => report_error(e),
		}
	}
}

fn print_section(title: &str) {
	println!();
	println!("{}", colored!(title, bold));
}

fn run_list(input: &Path, output: &Path) -> CliResult<()> {
	let config = BuildConfig::resolve(input, output, &BuildOptions::default())?;
	let plan = OutputGuard::check(&config.input, &config.output, true)?;
	let classification = Pipeline::new(&config, &JinjaEngine, &CommonMarkRenderer)
		.with_ignored(plan.ignored_paths())
		.discover()?;

	println!("{} file(s) in {}", classification.len(), input.display());
	for kind in FileKind::ALL {
		let paths = classification.get(kind);
		if paths.is_empty() {
			continue;
		}

		print_section(&format!("{kind} ({})", paths.len()));
		for path in paths {
			println!("  {path}");
		}
	}

	Ok(())
}

fn run_init(input: &Path) -> CliResult<()> {
	std::fs::create_dir_all(input)?;
	let config_path = input.join("weft.toml");
	let template_path = input.join("index.template.html");

	if config_path.exists() {
		println!("Config file already exists: {}", config_path.display());
	} else {
		let sample_config = "# weft configuration\n\n# metadata = \"meta.yaml\"\n# markdown = \
		                     \"index.md\"\n# ignore_file = \".weftignore\"\n# value_files = \
		                     [\"site.yaml\"]\n\n# [markers]\n# template = \".template\"\n# \
		                     meta_template = \".metatemplate\"\n# partial = \".partial\"\n\n# \
		                     [ignore]\n# patterns = [\"drafts/\"]\n\n[values]\ntitle = \"My \
		                     site\"\n";

		std::fs::write(&config_path, sample_config)?;
		println!("Created weft.toml");
	}

	if template_path.exists() {
		println!("Template file already exists: {}", template_path.display());
	} else {
		let sample_template = "<!doctype html>\n<title>{{ title }}</title>\n<h1>{{ title \
		                       }}</h1>\n{{ content }}\n";

		std::fs::write(&template_path, sample_template)?;
		println!("Created template file: {}", template_path.display());
		println!();
		println!("Next steps:");
		println!("  1. Add a meta.yaml next to the template; its keys appear under `meta`");
		println!("  2. Write an index.md to fill `content`");
		println!("  3. Run `weft build` to render into ./dist");
	}

	Ok(())
}
