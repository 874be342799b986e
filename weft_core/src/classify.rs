use std::fmt;

use serde::Serialize;

use crate::config::Conventions;
use crate::path_set::PathSet;
use crate::path_set::file_name;

/// The role a discovered file plays in a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
	/// Named fragment included by other templates; produces no output.
	Partial,
	/// Produces exactly one output.
	Template,
	/// Produces one output per child directory that carries metadata.
	MetaTemplate,
	/// Structured data inherited by the directory and its descendants.
	Metadata,
	/// Markdown converted to HTML and exposed as `content`.
	MarkdownContent,
	/// Copied verbatim.
	Static,
}

impl FileKind {
	pub const ALL: [Self; 6] = [
		Self::Partial,
		Self::Template,
		Self::MetaTemplate,
		Self::Metadata,
		Self::MarkdownContent,
		Self::Static,
	];

	/// Classify a single path by its file name.
	///
	/// Markers are matched by substring so multi-dot names such as
	/// `x.foo.template.html` work. The checks run in a fixed order and the
	/// first hit wins.
	pub fn of(path: &str, conventions: &Conventions) -> Self {
		let name = file_name(path);

		if contains_marker(name, &conventions.partial_marker) {
			Self::Partial
		} else if contains_marker(name, &conventions.template_marker) {
			Self::Template
		} else if contains_marker(name, &conventions.meta_template_marker) {
			Self::MetaTemplate
		} else if name == conventions.metadata_name {
			Self::Metadata
		} else if name == conventions.markdown_name {
			Self::MarkdownContent
		} else {
			Self::Static
		}
	}
}

impl fmt::Display for FileKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::Partial => "partial",
			Self::Template => "template",
			Self::MetaTemplate => "meta-template",
			Self::Metadata => "metadata",
			Self::MarkdownContent => "markdown",
			Self::Static => "static",
		};
		f.write_str(label)
	}
}

fn contains_marker(name: &str, marker: &str) -> bool {
	!marker.is_empty() && name.contains(marker)
}

/// A discovered [`PathSet`] split into six disjoint groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
	pub partials: PathSet,
	pub templates: PathSet,
	pub meta_templates: PathSet,
	pub metadata: PathSet,
	pub markdown: PathSet,
	pub statics: PathSet,
}

impl Classification {
	pub fn get(&self, kind: FileKind) -> &PathSet {
		match kind {
			FileKind::Partial => &self.partials,
			FileKind::Template => &self.templates,
			FileKind::MetaTemplate => &self.meta_templates,
			FileKind::Metadata => &self.metadata,
			FileKind::MarkdownContent => &self.markdown,
			FileKind::Static => &self.statics,
		}
	}

	/// Total number of classified paths.
	pub fn len(&self) -> usize {
		FileKind::ALL.iter().map(|kind| self.get(*kind).len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Partition `paths` by [`FileKind`], preserving discovery order in each
/// group.
pub fn classify(paths: &PathSet, conventions: &Conventions) -> Classification {
	let mut buckets: [Vec<String>; 6] = Default::default();

	for path in paths {
		// Bucket order follows the declaration order of `FileKind`.
		buckets[FileKind::of(path, conventions) as usize].push(path.clone());
	}

	let [partials, templates, meta_templates, metadata, markdown, statics] = buckets;

	Classification {
		partials: PathSet::new(partials),
		templates: PathSet::new(templates),
		meta_templates: PathSet::new(meta_templates),
		metadata: PathSet::new(metadata),
		markdown: PathSet::new(markdown),
		statics: PathSet::new(statics),
	}
}
