use std::path::Path;

use serde::Serialize;

use crate::WeftResult;
use crate::merge::MergeMode;
use crate::merge::merge_all;
use crate::path_set::PathSet;
use crate::path_set::ancestors;
use crate::path_set::file_name;
use crate::path_set::join;
use crate::path_set::parent_dir;
use crate::path_set::read_source;
use crate::value::Mapping;
use crate::value::Value;

/// One ancestor directory on the way to a rendered target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
	/// The directory's own segment.
	pub name: String,
	/// `/` followed by every segment up to and including this one.
	pub path: String,
}

/// The breadcrumb trail of `target`, root first.
///
/// The directory containing the target is left out since the target is that
/// directory's own page: `a/b/c/index.html` yields `a` and `a/b`, while
/// `index.html` and `a/index.html` yield nothing.
pub fn breadcrumbs(target: &str) -> Vec<Breadcrumb> {
	ancestors(parent_dir(parent_dir(target)))
		.into_iter()
		.map(|ancestor| {
			Breadcrumb {
				name: file_name(ancestor).to_string(),
				path: format!("/{ancestor}"),
			}
		})
		.collect()
}

/// Resolves the inherited metadata of a directory from the metadata files
/// along its ancestry.
///
/// Nothing is cached; each call reads the files it needs.
#[derive(Debug, Clone, Copy)]
pub struct MetaResolver<'a> {
	root: &'a Path,
	metadata: &'a PathSet,
	metadata_name: &'a str,
}

impl<'a> MetaResolver<'a> {
	/// `metadata` holds the discovered metadata files, relative to `root`.
	pub fn new(root: &'a Path, metadata: &'a PathSet, metadata_name: &'a str) -> Self {
		Self {
			root,
			metadata,
			metadata_name,
		}
	}

	/// Merge every metadata file from the root down to `dir`, deeper files
	/// overriding shallower ones.
	///
	/// Returns `None` when no metadata file exists anywhere in the ancestry.
	pub fn resolve(&self, dir: &str) -> WeftResult<Option<Value>> {
		let visible = self
			.metadata
			.filter_by_ancestry_path(dir)
			.filter_by_name(self.metadata_name);

		let mut trees = Vec::with_capacity(visible.len());
		for path in &visible {
			let content = read_source(self.root, path)?;
			trees.push(Value::mapping_from_yaml_str(&content, path)?);
		}

		Ok(merge_all(trees, MergeMode::Override))
	}

	/// Names of the direct child directories of `dir` that carry a metadata
	/// file, in discovery order.
	pub fn children_with_metadata(&self, dir: &str) -> Vec<String> {
		self.metadata
			.filter_by_depth_at_prefix(dir, 1)
			.filter_by_name(self.metadata_name)
			.iter()
			.map(|path| file_name(parent_dir(path)).to_string())
			.collect()
	}

	/// The resolved metadata of each qualifying child of `dir`, keyed by the
	/// child's directory name.
	pub fn child_meta(&self, dir: &str) -> WeftResult<Mapping> {
		let mut children = Mapping::new();
		for child in self.children_with_metadata(dir) {
			let child_dir = join(dir, &child);
			if let Some(meta) = self.resolve(&child_dir)? {
				children.insert(child, meta);
			}
		}

		Ok(children)
	}
}
