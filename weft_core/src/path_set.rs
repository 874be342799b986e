//! Ordered sets of root-relative paths and the directory walk that produces
//! them.
//!
//! Paths are `/`-separated strings relative to the source root and never carry
//! the root prefix. Every filter returns a new [`PathSet`]; the original is
//! left untouched.

use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::WeftError;
use crate::WeftResult;

/// An ordered collection of relative file paths in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct PathSet(Vec<String>);

impl PathSet {
	pub fn new(paths: Vec<String>) -> Self {
		Self(paths)
	}

	pub fn into_inner(self) -> Vec<String> {
		self.0
	}

	/// Keep the paths matching `predicate`.
	pub fn filter(&self, predicate: impl Fn(&str) -> bool) -> Self {
		self.0
			.iter()
			.filter(|path| predicate(path))
			.cloned()
			.collect()
	}

	pub fn filter_by_prefix(&self, prefix: &str) -> Self {
		self.filter(|path| path.starts_with(prefix))
	}

	pub fn filter_by_suffix(&self, suffix: &str) -> Self {
		self.filter(|path| path.ends_with(suffix))
	}

	/// Keep paths whose file name is exactly `name`.
	pub fn filter_by_name(&self, name: &str) -> Self {
		self.filter(|path| file_name(path) == name)
	}

	/// Keep paths whose file name contains `needle`.
	pub fn filter_by_name_contains(&self, needle: &str) -> Self {
		self.filter(|path| file_name(path).contains(needle))
	}

	/// Keep paths with exactly `level` separators, i.e. files `level`
	/// directories below the root.
	pub fn filter_by_depth(&self, level: usize) -> Self {
		self.filter(|path| depth(path) == level)
	}

	/// Keep paths below `prefix` whose depth relative to `prefix` is `level`.
	///
	/// Level `0` selects the files directly inside `prefix`; level `1` selects
	/// files inside its direct child directories. An empty prefix is the root.
	pub fn filter_by_depth_at_prefix(&self, prefix: &str, level: usize) -> Self {
		let dir = prefix.trim_matches('/');
		if dir.is_empty() {
			return self.filter_by_depth(level);
		}

		self.filter(|path| {
			strip_dir(path, dir).is_some_and(|rest| depth(rest) == level)
		})
	}

	/// Drop paths excluded by the given gitignore-syntax lines.
	pub fn filter_by_ignore_lines(&self, lines: &[String]) -> WeftResult<Self> {
		let rules = IgnoreRules::from_lines(lines)?;
		Ok(self.filter(|path| !rules.is_path_ignored(path)))
	}

	/// Every file visible from `target_dir`: the files at the root followed by
	/// the files directly inside each ancestor of `target_dir`, root first and
	/// `target_dir` itself last.
	pub fn filter_by_ancestry_path(&self, target_dir: &str) -> Self {
		let mut visible = self.filter_by_depth(0).0;
		for ancestor in ancestors(target_dir) {
			visible.extend(self.filter_by_depth_at_prefix(ancestor, 0).0);
		}

		Self(visible)
	}

	/// Walk `root` depth-first and collect every file not excluded by
	/// `rules`. Ignored directories are pruned without being read.
	pub fn generate(root: &Path, rules: &IgnoreRules) -> WeftResult<Self> {
		if !root.exists() {
			return Err(WeftError::MissingRoot(root.to_path_buf()));
		}
		if !root.is_dir() {
			return Err(WeftError::NotADirectory(root.to_path_buf()));
		}

		let mut paths = Vec::new();
		let mut visited_dirs = HashSet::new();
		walk_dir(root, "", rules, &mut paths, &mut visited_dirs)?;
		tracing::debug!(root = %root.display(), files = paths.len(), "discovered source tree");

		Ok(Self(paths))
	}
}

impl FromIterator<String> for PathSet {
	fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl IntoIterator for PathSet {
	type IntoIter = std::vec::IntoIter<String>;
	type Item = String;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a PathSet {
	type IntoIter = std::slice::Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// Escape glob metacharacters so `literal` matches only itself inside an
/// ignore line.
pub fn escape_glob(literal: &str) -> String {
	let mut escaped = String::with_capacity(literal.len());
	for ch in literal.chars() {
		if matches!(ch, '\\' | '*' | '?' | '[' | ']' | '{' | '}') {
			escaped.push('\\');
		}
		escaped.push(ch);
	}
	escaped
}

/// Compiled gitignore-syntax exclusion rules.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
	matcher: Gitignore,
}

impl Default for IgnoreRules {
	fn default() -> Self {
		Self::empty()
	}
}

impl IgnoreRules {
	pub fn empty() -> Self {
		Self {
			matcher: Gitignore::empty(),
		}
	}

	/// Compile inline lines only. Patterns are anchored at the path root.
	pub fn from_lines(lines: &[String]) -> WeftResult<Self> {
		Self::build(Path::new("."), None, lines)
	}

	/// Compile the rules in `file` (when given) followed by `lines`.
	///
	/// A `file` that cannot be read is a discovery error.
	pub fn build(root: &Path, file: Option<&Path>, lines: &[String]) -> WeftResult<Self> {
		let mut builder = GitignoreBuilder::new(root);

		if let Some(file) = file {
			if !file.is_file() {
				return Err(WeftError::IgnoreRules {
					path: file.display().to_string(),
					reason: "file not found".to_string(),
				});
			}
			if let Some(error) = builder.add(file) {
				return Err(WeftError::IgnoreRules {
					path: file.display().to_string(),
					reason: error.to_string(),
				});
			}
		}

		for line in lines {
			builder.add_line(None, line).map_err(|e| {
				WeftError::IgnoreRules {
					path: format!("<inline `{line}`>"),
					reason: e.to_string(),
				}
			})?;
		}

		let matcher = builder.build().map_err(|e| {
			WeftError::IgnoreRules {
				path: root.display().to_string(),
				reason: e.to_string(),
			}
		})?;

		Ok(Self { matcher })
	}

	pub fn is_empty(&self) -> bool {
		self.matcher.is_empty()
	}

	/// Whether the entry itself matches. Used while walking, where an ignored
	/// directory is pruned before its children are seen.
	///
	/// `path` is the entry's filesystem path, including the root the rules
	/// were built with.
	pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
		self.matcher.matched(path, is_dir).is_ignore()
	}

	/// Whether the file or any of its parent directories matches.
	pub fn is_path_ignored(&self, relative: &str) -> bool {
		let relative = relative.trim_start_matches('/');
		if relative.is_empty() {
			return false;
		}

		self.matcher
			.matched_path_or_any_parents(relative, false)
			.is_ignore()
	}
}

fn walk_dir(
	dir: &Path,
	relative_dir: &str,
	rules: &IgnoreRules,
	paths: &mut Vec<String>,
	visited_dirs: &mut HashSet<PathBuf>,
) -> WeftResult<()> {
	// Detect symlink cycles by tracking canonical paths.
	let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
	if !visited_dirs.insert(canonical) {
		return Err(WeftError::SymlinkCycle {
			path: dir.display().to_string(),
		});
	}

	let mut entries = std::fs::read_dir(dir)
		.map_err(|e| WeftError::io(dir, e))?
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| WeftError::io(dir, e))?;
	// Lexical order keeps discovery deterministic across platforms.
	entries.sort_by_key(std::fs::DirEntry::file_name);

	for entry in entries {
		let path = entry.path();
		let Some(name) = entry.file_name().to_str().map(str::to_string) else {
			return Err(WeftError::InvalidUtf8(path));
		};
		let relative = join(relative_dir, &name);
		let is_dir = path.is_dir();

		if rules.is_ignored(&path, is_dir) {
			tracing::trace!(path = %relative, "ignored");
			continue;
		}

		if is_dir {
			walk_dir(&path, &relative, rules, paths, visited_dirs)?;
		} else {
			paths.push(relative);
		}
	}

	Ok(())
}

/// Join a relative directory and a child name with `/`.
pub fn join(dir: &str, name: &str) -> String {
	if dir.is_empty() {
		name.to_string()
	} else {
		format!("{dir}/{name}")
	}
}

/// The last path segment.
pub fn file_name(path: &str) -> &str {
	path.rsplit('/').next().unwrap_or(path)
}

/// The containing directory, or `""` for files at the root.
pub fn parent_dir(path: &str) -> &str {
	path.rfind('/').map_or("", |index| &path[..index])
}

/// Number of separators in `path`.
pub fn depth(path: &str) -> usize {
	path.matches('/').count()
}

/// Every ancestor of `dir` including itself, shortest first.
///
/// `a/b/c` yields `a`, `a/b`, `a/b/c`; the root (`""`) yields nothing.
pub fn ancestors(dir: &str) -> Vec<&str> {
	let dir = dir.trim_matches('/');
	if dir.is_empty() {
		return Vec::new();
	}

	let mut result: Vec<&str> = dir
		.match_indices('/')
		.map(|(index, _)| &dir[..index])
		.collect();
	result.push(dir);
	result
}

fn strip_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
	path.strip_prefix(dir)?.strip_prefix('/')
}

/// Read a source file addressed relative to `root`.
pub fn read_source(root: &Path, relative: &str) -> WeftResult<String> {
	let path = root.join(relative);
	let bytes = std::fs::read(&path).map_err(|e| WeftError::io(&path, e))?;
	String::from_utf8(bytes).map_err(|_| WeftError::InvalidUtf8(path))
}
