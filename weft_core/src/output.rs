use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::WeftError;
use crate::WeftResult;
use crate::path_set::ancestors;
use crate::path_set::escape_glob;
use crate::path_set::parent_dir;
use crate::pipeline::RenderOutput;

/// Where the output directory sits relative to the input directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRelation {
	/// Output and input are the same directory.
	Same,
	/// Output is a strict descendant of the input, at this relative path.
	Nested(String),
	/// Output is a sibling, an ancestor or unrelated.
	Separate,
}

/// The validated input/output pair for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
	pub input: PathBuf,
	pub output: PathBuf,
	pub relation: OutputRelation,
	/// Keep existing output files instead of clearing the directory.
	pub preserve: bool,
}

/// Validates the input and output directories before anything is written.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputGuard;

impl OutputGuard {
	/// Check the directories without touching the filesystem.
	///
	/// The input must be an existing directory and the output, when it
	/// exists, must be a directory. Because the output is cleared before
	/// writing, an output equal to or containing the input is rejected unless
	/// `preserve` is set.
	pub fn check(input: &Path, output: &Path, preserve: bool) -> WeftResult<OutputPlan> {
		if !input.exists() {
			return Err(WeftError::MissingInput(input.to_path_buf()));
		}
		if !input.is_dir() {
			return Err(WeftError::NotADirectory(input.to_path_buf()));
		}
		if output.exists() && !output.is_dir() {
			return Err(WeftError::NotADirectory(output.to_path_buf()));
		}

		let input_abs = input.canonicalize().map_err(|e| WeftError::io(input, e))?;
		let output_abs = project(output)?;

		let relation = if input_abs == output_abs {
			if !preserve {
				return Err(WeftError::InputIsOutput(output.to_path_buf()));
			}
			OutputRelation::Same
		} else if let Ok(rest) = output_abs.strip_prefix(&input_abs) {
			OutputRelation::Nested(to_slash(rest))
		} else if input_abs.starts_with(&output_abs) && !preserve {
			return Err(WeftError::OutputContainsInput {
				input: input.to_path_buf(),
				output: output.to_path_buf(),
			});
		} else {
			OutputRelation::Separate
		};

		tracing::debug!(
			input = %input_abs.display(),
			output = %output_abs.display(),
			?relation,
			"checked output directory"
		);

		Ok(OutputPlan {
			input: input_abs,
			output: output_abs,
			relation,
			preserve,
		})
	}
}

impl OutputPlan {
	/// Relative path of a nested output, which discovery must skip.
	pub fn ignore_path(&self) -> Option<&str> {
		match &self.relation {
			OutputRelation::Nested(relative) => Some(relative),
			_ => None,
		}
	}

	/// Ignore lines excluding the output directory from discovery.
	pub fn ignored_paths(&self) -> Vec<String> {
		self.ignore_path()
			.map(|relative| vec![format!("/{}/", escape_glob(relative))])
			.unwrap_or_default()
	}

	/// Create the output directory with the input's permissions, or clear its
	/// contents when output is not preserved.
	pub fn prepare(&self) -> WeftResult<()> {
		if !self.output.exists() {
			fs::create_dir_all(&self.output).map_err(|e| WeftError::io(&self.output, e))?;
			copy_permissions(&self.input, &self.output)?;
			return Ok(());
		}

		if self.preserve || self.relation == OutputRelation::Same {
			return Ok(());
		}

		let entries = fs::read_dir(&self.output).map_err(|e| WeftError::io(&self.output, e))?;
		for entry in entries {
			let path = entry.map_err(|e| WeftError::io(&self.output, e))?.path();
			let removed = if path.is_dir() && !path.is_symlink() {
				fs::remove_dir_all(&path)
			} else {
				fs::remove_file(&path)
			};
			removed.map_err(|e| WeftError::io(&path, e))?;
		}
		tracing::debug!(output = %self.output.display(), "cleared output directory");

		Ok(())
	}
}

/// Counts of files produced by [`write_output`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
	pub rendered: usize,
	pub copied: usize,
}

/// Write every rendered file and copy every static file into the output
/// directory. Parent directories are created with the permissions of their
/// source counterparts.
pub fn write_output(plan: &OutputPlan, output: &RenderOutput) -> WeftResult<WriteSummary> {
	let mut summary = WriteSummary::default();

	for (target, file) in &output.rendered {
		create_parents(plan, target)?;
		let destination = plan.output.join(target);
		fs::write(&destination, &file.contents).map_err(|e| WeftError::io(&destination, e))?;
		tracing::debug!(target = %target, source = %file.source, "wrote rendered file");
		summary.rendered += 1;
	}

	for path in &output.statics {
		create_parents(plan, path)?;
		let source = plan.input.join(path);
		let destination = plan.output.join(path);
		fs::copy(&source, &destination).map_err(|e| WeftError::io(&source, e))?;
		summary.copied += 1;
	}

	Ok(summary)
}

fn create_parents(plan: &OutputPlan, relative: &str) -> WeftResult<()> {
	for dir in ancestors(parent_dir(relative)) {
		let destination = plan.output.join(dir);
		if destination.is_dir() {
			continue;
		}

		fs::create_dir(&destination).map_err(|e| WeftError::io(&destination, e))?;
		let source = plan.input.join(dir);
		if source.is_dir() {
			copy_permissions(&source, &destination)?;
		}
	}

	Ok(())
}

fn copy_permissions(from: &Path, to: &Path) -> WeftResult<()> {
	let permissions = fs::metadata(from)
		.map_err(|e| WeftError::io(from, e))?
		.permissions();
	fs::set_permissions(to, permissions).map_err(|e| WeftError::io(to, e))
}

/// Absolute form of a path that may not exist yet: the deepest existing
/// ancestor is canonicalized and the rest appended.
fn project(path: &Path) -> WeftResult<PathBuf> {
	if path.exists() {
		return path.canonicalize().map_err(|e| WeftError::io(path, e));
	}

	let absolute = if path.is_absolute() {
		path.to_path_buf()
	} else {
		std::env::current_dir()
			.map_err(|e| WeftError::io(path, e))?
			.join(path)
	};

	let mut existing = absolute.as_path();
	let mut missing = Vec::new();
	while !existing.exists() {
		let Some(name) = existing.file_name() else {
			break;
		};
		missing.push(name.to_os_string());
		let Some(parent) = existing.parent() else {
			break;
		};
		existing = parent;
	}

	let mut projected = existing
		.canonicalize()
		.map_err(|e| WeftError::io(existing, e))?;
	for name in missing.into_iter().rev() {
		projected.push(name);
	}

	Ok(normalize(&projected))
}

/// Resolve `.` and `..` lexically.
fn normalize(path: &Path) -> PathBuf {
	let mut normalized = PathBuf::new();
	for component in path.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => {
				normalized.pop();
			}
			other => normalized.push(other),
		}
	}
	normalized
}

fn to_slash(path: &Path) -> String {
	path.components()
		.map(|component| component.as_os_str().to_string_lossy())
		.collect::<Vec<_>>()
		.join("/")
}
