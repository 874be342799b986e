use std::path::Path;

use crate::BuildConfig;
use crate::BuildReport;
use crate::CommonMarkRenderer;
use crate::JinjaEngine;
use crate::Mapping;
use crate::Value;
use crate::WeftResult;
use crate::build_site;
use crate::path_set::PathSet;

/// Write `files` below `root`, creating parent directories.
pub(crate) fn write_tree(root: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
	for (relative, contents) in files {
		let path = root.join(relative);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, contents)?;
	}

	Ok(())
}

pub(crate) fn build(config: &BuildConfig) -> WeftResult<BuildReport> {
	build_site(config, &JinjaEngine, &CommonMarkRenderer)
}

pub(crate) fn mapping(entries: &[(&str, Value)]) -> Value {
	Value::Mapping(
		entries
			.iter()
			.map(|(key, value)| ((*key).to_string(), value.clone()))
			.collect::<Mapping>(),
	)
}

pub(crate) fn sequence(items: &[i64]) -> Value {
	Value::Sequence(items.iter().map(|item| Value::from(*item)).collect())
}

pub(crate) fn paths(items: &[&str]) -> PathSet {
	items.iter().map(|item| (*item).to_string()).collect()
}
