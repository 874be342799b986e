use std::path::Path;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::path_set::IgnoreRules;
use crate::path_set::PathSet;

#[rstest]
#[case::root_file("index.html", vec![])]
#[case::first_level("a/index.html", vec![])]
#[case::second_level("a/b/index.html", vec![("a", "/a")])]
#[case::third_level("a/b/c/index.html", vec![("a", "/a"), ("b", "/a/b")])]
fn breadcrumb_trail(#[case] target: &str, #[case] expected: Vec<(&str, &str)>) {
	let expected: Vec<Breadcrumb> = expected
		.into_iter()
		.map(|(name, path)| {
			Breadcrumb {
				name: name.to_string(),
				path: path.to_string(),
			}
		})
		.collect();

	assert_eq!(breadcrumbs(target), expected);
}

#[test]
fn override_merge_replaces_incoming_keys_and_keeps_the_rest() {
	let src = mapping(&[
		("b", Value::from(3)),
		("c", Value::from(4)),
		("nested", mapping(&[("p", Value::from(1))])),
	]);
	let dst = mapping(&[
		("a", Value::from(1)),
		("b", Value::from(2)),
		("nested", mapping(&[("q", Value::from(2))])),
	]);

	let merged = merge(src, dst, MergeMode::Override);

	assert_eq!(
		merged,
		mapping(&[
			("a", Value::from(1)),
			("b", Value::from(3)),
			("c", Value::from(4)),
			("nested", mapping(&[("p", Value::from(1))])),
		])
	);
}

#[test]
fn combine_merge_recurses_into_maps_and_keeps_existing_scalars() {
	let src = mapping(&[
		("b", Value::from(3)),
		("nested", mapping(&[("p", Value::from(1))])),
	]);
	let dst = mapping(&[
		("b", Value::from(2)),
		("nested", mapping(&[("q", Value::from(2))])),
	]);

	let merged = merge(src, dst, MergeMode::Combine);

	assert_eq!(
		merged,
		mapping(&[
			("b", Value::from(2)),
			(
				"nested",
				mapping(&[("p", Value::from(1)), ("q", Value::from(2))])
			),
		])
	);
}

#[rstest]
#[case::override_replaces(MergeMode::Override, sequence(&[3, 4]))]
#[case::combine_concatenates(MergeMode::Combine, sequence(&[1, 2, 3, 4]))]
fn list_merge(#[case] mode: MergeMode, #[case] expected: Value) {
	assert_eq!(merge(sequence(&[3, 4]), sequence(&[1, 2]), mode), expected);
}

#[rstest]
#[case::override_takes_source(MergeMode::Override, Value::from("src"))]
#[case::combine_keeps_destination(MergeMode::Combine, sequence(&[1]))]
fn mismatched_merge(#[case] mode: MergeMode, #[case] expected: Value) {
	assert_eq!(merge(Value::from("src"), sequence(&[1]), mode), expected);
}

#[test]
fn merge_all_of_nothing_is_none() {
	assert_eq!(merge_all(Vec::new(), MergeMode::Override), None);
}

#[rstest]
#[case::partial("layout/nav.partial.html", FileKind::Partial)]
#[case::template("index.template.html", FileKind::Template)]
#[case::multi_dot_template("x.foo.template.html", FileKind::Template)]
#[case::meta_template("blog/post.metatemplate.html", FileKind::MetaTemplate)]
#[case::metadata("docs/meta.yaml", FileKind::Metadata)]
#[case::markdown("index.md", FileKind::MarkdownContent)]
#[case::other_markdown("notes.md", FileKind::Static)]
#[case::asset("css/site.css", FileKind::Static)]
#[case::partial_wins("a.partial.template.html", FileKind::Partial)]
fn classify_file(#[case] path: &str, #[case] expected: FileKind) {
	assert_eq!(FileKind::of(path, &Conventions::default()), expected);
}

#[test]
fn classification_is_disjoint_and_exhaustive() {
	let discovered = paths(&[
		"index.template.html",
		"meta.yaml",
		"index.md",
		"nav.partial.html",
		"blog/post.metatemplate.html",
		"blog/one/meta.yaml",
		"css/site.css",
		"robots.txt",
	]);

	let classification = classify(&discovered, &Conventions::default());

	assert_eq!(classification.len(), discovered.len());
	for path in &discovered {
		let hits = FileKind::ALL
			.iter()
			.filter(|kind| classification.get(**kind).contains(path))
			.count();
		assert_eq!(hits, 1, "`{path}` classified {hits} times");
	}
	assert_eq!(classification.statics, paths(&["css/site.css", "robots.txt"]));
}

#[test]
fn custom_markers_classify_files() {
	let conventions = Conventions {
		template_marker: ".tpl".to_string(),
		metadata_name: "_data.yml".to_string(),
		..Conventions::default()
	};

	assert_eq!(FileKind::of("page.tpl.html", &conventions), FileKind::Template);
	assert_eq!(FileKind::of("page.template.html", &conventions), FileKind::Static);
	assert_eq!(FileKind::of("a/_data.yml", &conventions), FileKind::Metadata);
}

#[rstest]
#[case::template("docs/index.template.html", "docs/index.html")]
#[case::multi_dot("x.foo.template.html", "x.foo.html")]
fn template_target(#[case] path: &str, #[case] expected: &str) {
	assert_eq!(Conventions::default().template_target(path), expected);
}

#[test]
fn meta_template_target_moves_into_the_child() {
	let conventions = Conventions::default();

	assert_eq!(
		conventions.meta_template_target("blog/post.metatemplate.html", "one"),
		"blog/one/post.html"
	);
	assert_eq!(
		conventions.meta_template_target("post.metatemplate.html", "one"),
		"one/post.html"
	);
	assert_eq!(conventions.partial_name("layout/nav.partial.html"), "nav.html");
}

#[test]
fn depth_filters() {
	let set = paths(&[
		"meta.yaml",
		"a/meta.yaml",
		"a/b/meta.yaml",
		"a/c/meta.yaml",
		"ab/meta.yaml",
		"a/b/deep/meta.yaml",
	]);

	assert_eq!(set.filter_by_depth(0), paths(&["meta.yaml"]));
	assert_eq!(
		set.filter_by_depth_at_prefix("", 1),
		paths(&["a/meta.yaml", "ab/meta.yaml"])
	);
	assert_eq!(
		set.filter_by_depth_at_prefix("a", 1),
		paths(&["a/b/meta.yaml", "a/c/meta.yaml"])
	);
	assert_eq!(set.filter_by_depth_at_prefix("a/", 0), paths(&["a/meta.yaml"]));
}

#[test]
fn ancestry_path_is_root_first() {
	let set = paths(&[
		"a/b/meta.yaml",
		"meta.yaml",
		"a/c/meta.yaml",
		"a/meta.yaml",
		"a/b/deep/meta.yaml",
	]);

	assert_eq!(
		set.filter_by_ancestry_path("a/b"),
		paths(&["meta.yaml", "a/meta.yaml", "a/b/meta.yaml"])
	);
	assert_eq!(set.filter_by_ancestry_path(""), paths(&["meta.yaml"]));
}

#[test]
fn name_and_affix_filters() {
	let set = paths(&["a/index.md", "a/readme.md", "b/index.md.bak", "index.md"]);

	assert_eq!(set.filter_by_name("index.md"), paths(&["a/index.md", "index.md"]));
	assert_eq!(set.filter_by_prefix("a/"), paths(&["a/index.md", "a/readme.md"]));
	assert_eq!(set.filter_by_suffix(".bak"), paths(&["b/index.md.bak"]));
	assert_eq!(set.filter_by_name_contains("read"), paths(&["a/readme.md"]));
}

#[test]
fn ignore_lines_exclude_files_and_directories() -> AnyEmptyResult {
	let set = paths(&[
		"index.html",
		"drafts/a.html",
		"notes.bak",
		"sub/drafts/b.html",
		"sub/keep.html",
	]);

	let filtered = set.filter_by_ignore_lines(&["drafts/".to_string(), "*.bak".to_string()])?;

	assert_eq!(filtered, paths(&["index.html", "sub/keep.html"]));
	Ok(())
}

#[test]
fn discovery_prunes_ignored_directories_in_lexical_order() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[
		("b.txt", ""),
		("a/z.txt", ""),
		("a/x.txt", ""),
		("drafts/y.txt", ""),
	])?;

	let rules = IgnoreRules::build(tmp.path(), None, &["/drafts/".to_string()])?;
	let discovered = PathSet::generate(tmp.path(), &rules)?;

	assert_eq!(discovered, paths(&["a/x.txt", "a/z.txt", "b.txt"]));
	Ok(())
}

#[test]
fn discovery_of_missing_root_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let error = PathSet::generate(&tmp.path().join("missing"), &IgnoreRules::empty())
		.expect_err("missing root must fail");

	assert!(matches!(error, WeftError::MissingRoot(_)));
	assert_eq!(error.kind(), ErrorKind::Discovery);
	Ok(())
}

#[test]
fn child_metadata_overrides_parent() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[
		("meta.yaml", "a: 1\nb: 2\n"),
		("child/meta.yaml", "b: 3\nc: 4\n"),
	])?;
	let metadata = paths(&["meta.yaml", "child/meta.yaml"]);
	let resolver = MetaResolver::new(tmp.path(), &metadata, "meta.yaml");

	let first = resolver.resolve("child")?;
	let second = resolver.resolve("child")?;

	let expected = mapping(&[
		("a", Value::from(1)),
		("b", Value::from(3)),
		("c", Value::from(4)),
	]);
	assert_eq!(first, Some(expected));
	assert_eq!(first, second);
	Ok(())
}

#[test]
fn missing_metadata_is_distinct_from_empty_metadata() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[("empty/meta.yaml", "")])?;
	let metadata = paths(&["empty/meta.yaml"]);
	let resolver = MetaResolver::new(tmp.path(), &metadata, "meta.yaml");

	assert_eq!(resolver.resolve("other")?, None);
	assert_eq!(resolver.resolve("empty")?, Some(mapping(&[])));
	Ok(())
}

#[test]
fn non_mapping_metadata_is_a_parse_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[("meta.yaml", "- a\n- b\n")])?;
	let metadata = paths(&["meta.yaml"]);
	let resolver = MetaResolver::new(tmp.path(), &metadata, "meta.yaml");

	let error = resolver.resolve("").expect_err("a list root must fail");

	assert!(matches!(error, WeftError::MetadataParse { .. }));
	assert_eq!(error.kind(), ErrorKind::Parse);
	Ok(())
}

#[test]
fn child_meta_only_includes_directories_with_metadata() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[
		("blog/meta.yaml", "section: Blog\n"),
		("blog/one/meta.yaml", "title: One\n"),
		("blog/two/meta.yaml", "title: Two\n"),
		("blog/two/deep/meta.yaml", "title: Deep\n"),
	])?;
	let metadata = paths(&[
		"blog/meta.yaml",
		"blog/one/meta.yaml",
		"blog/two/meta.yaml",
		"blog/two/deep/meta.yaml",
	]);
	let resolver = MetaResolver::new(tmp.path(), &metadata, "meta.yaml");

	let children = resolver.child_meta("blog")?;

	assert_eq!(children.keys().collect::<Vec<_>>(), vec!["one", "two"]);
	assert_eq!(
		children.get("one"),
		Some(&mapping(&[
			("section", Value::from("Blog")),
			("title", Value::from("One")),
		]))
	);
	Ok(())
}

#[test]
fn render_context_shape() -> AnyEmptyResult {
	let mut globals = Mapping::new();
	globals.insert("site".to_string(), Value::from("Example"));
	globals.insert("path".to_string(), Value::from("ignored"));

	let context = RenderContext {
		path: "a/b/c/index.html".to_string(),
		breadcrumbs: breadcrumbs("a/b/c/index.html"),
		meta: Some(mapping(&[("title", Value::from("C"))])),
		child_meta: Mapping::new(),
		content: None,
		globals,
	};

	let json = serde_json::to_string_pretty(&context.to_value())?;
	insta::assert_snapshot!(json, @r#"
{
  "breadcrumbs": [
    {
      "name": "a",
      "path": "/a"
    },
    {
      "name": "b",
      "path": "/a/b"
    }
  ],
  "childMeta": {},
  "meta": {
    "title": "C"
  },
  "path": "a/b/c/index.html",
  "site": "Example"
}
"#);
	Ok(())
}

#[test]
fn duplicate_markdown_content_is_rejected() {
	let markdown = paths(&["docs/index.md", "docs/index.md"]);
	let metadata = PathSet::default();
	let conventions = Conventions::default();
	let globals = Mapping::new();
	let resolver = MetaResolver::new(Path::new("."), &metadata, "meta.yaml");
	let builder = ContextBuilder::new(
		Path::new("."),
		&markdown,
		&conventions,
		resolver,
		&CommonMarkRenderer,
		&globals,
	);

	let error = builder
		.build("docs/index.html")
		.expect_err("duplicate content must fail");

	assert!(matches!(error, WeftError::DuplicateContent { count: 2, .. }));
	assert_eq!(error.kind(), ErrorKind::Configuration);
}

#[test]
fn renders_template_path() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("index.template.html", "{{ path }}")])?;

	let report = build(&BuildConfig::new(&input, &output))?;

	assert_eq!(std::fs::read_to_string(output.join("index.html"))?, "index.html");
	assert_eq!(
		report.written,
		Some(WriteSummary {
			rendered: 1,
			copied: 0,
		})
	);
	Ok(())
}

#[test]
fn renders_site_with_partials_content_and_statics() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		("meta.yaml", "site: Example\n"),
		("layout/nav.partial.html", "<nav>{{ meta.site }}</nav>"),
		(
			"docs/index.template.html",
			"{% include \"nav.html\" %}|{{ breadcrumbs | length }}|{{ content }}",
		),
		("docs/index.md", "# Hello"),
		("docs/meta.yaml", "title: Docs\n"),
		("css/site.css", "body {}"),
	])?;

	let report = build(&BuildConfig::new(&input, &output))?;

	let rendered = std::fs::read_to_string(output.join("docs/index.html"))?;
	assert_eq!(rendered, "<nav>Example</nav>|0|<h1>Hello</h1>");
	assert_eq!(std::fs::read_to_string(output.join("css/site.css"))?, "body {}");
	assert!(!output.join("meta.yaml").exists());
	assert!(!output.join("layout").exists());
	assert_eq!(report.output.targets(), vec!["css/site.css", "docs/index.html"]);
	Ok(())
}

#[rstest]
#[case::no_children(0)]
#[case::one_child(1)]
#[case::three_children(3)]
fn meta_template_fans_out_per_child(#[case] children: usize) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		("blog/post.metatemplate.html", "{{ meta.title }}"),
		("blog/unlisted/notes.txt", "no metadata here"),
	])?;
	for index in 0..children {
		let path = format!("blog/p{index}/meta.yaml");
		let meta = format!("title: Post {index}\n");
		write_tree(&input, &[(path.as_str(), meta.as_str())])?;
	}

	let report = build(&BuildConfig::new(&input, &output))?;

	assert_eq!(report.output.rendered.len(), children);
	for index in 0..children {
		let rendered = std::fs::read_to_string(output.join(format!("blog/p{index}/post.html")))?;
		assert_eq!(rendered, format!("Post {index}"));
	}
	assert!(!output.join("blog/unlisted/post.html").exists());
	Ok(())
}

#[test]
fn meta_template_outputs_get_the_childs_own_child_meta() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		(
			"blog/post.metatemplate.html",
			"{{ meta.title }}:{{ childMeta | length }}:{% for name in childMeta %}{{ name }}={{ childMeta[name].title }};{% endfor %}",
		),
		("blog/one/meta.yaml", "title: One\n"),
		("blog/one/x/meta.yaml", "title: X\n"),
		("blog/one/y/meta.yaml", "title: Y\n"),
		("blog/one/y/deeper/meta.yaml", "title: Deeper\n"),
		("blog/two/meta.yaml", "title: Two\n"),
	])?;

	build(&BuildConfig::new(&input, &output))?;

	assert_eq!(
		std::fs::read_to_string(output.join("blog/one/post.html"))?,
		"One:2:x=X;y=Y;"
	);
	assert_eq!(
		std::fs::read_to_string(output.join("blog/two/post.html"))?,
		"Two:0:"
	);
	Ok(())
}

#[test]
fn index_template_lists_children() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		(
			"blog/index.template.html",
			"{% for name, child in childMeta | items %}{{ name }}={{ child.title }};{% endfor %}",
		),
		("blog/a/meta.yaml", "title: A\n"),
		("blog/b/meta.yaml", "title: B\n"),
	])?;

	build(&BuildConfig::new(&input, &output))?;

	assert_eq!(
		std::fs::read_to_string(output.join("blog/index.html"))?,
		"a=A;b=B;"
	);
	Ok(())
}

#[test]
fn reserved_keys_win_over_globals() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("index.template.html", "{{ path }}|{{ site }}")])?;

	let mut config = BuildConfig::new(&input, &output);
	config.globals.insert("path".to_string(), Value::from("foo"));
	config.globals.insert("site".to_string(), Value::from("Example"));
	build(&config)?;

	assert_eq!(
		std::fs::read_to_string(output.join("index.html"))?,
		"index.html|Example"
	);
	Ok(())
}

#[test]
fn duplicate_partials_fail_before_writing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		("a/nav.partial.html", "one"),
		("b/nav.partial.html", "two"),
		("index.template.html", "{% include \"nav.html\" %}"),
	])?;

	let error = build(&BuildConfig::new(&input, &output)).expect_err("duplicate partials");

	assert!(matches!(error, WeftError::DuplicatePartial { ref name, .. } if name == "nav.html"));
	assert_eq!(error.kind(), ErrorKind::Configuration);
	assert!(!output.exists());
	Ok(())
}

#[test]
fn template_syntax_errors_name_the_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("broken.template.html", "{% if %}")])?;

	let error = build(&BuildConfig::new(&input, &output)).expect_err("syntax error");

	assert!(
		matches!(error, WeftError::TemplateSyntax { ref path, .. } if path == "broken.template.html")
	);
	assert!(!output.exists());
	Ok(())
}

#[test]
fn static_file_colliding_with_rendered_target_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[
		("page.template.html", "rendered"),
		("page.html", "static"),
	])?;

	let error = build(&BuildConfig::new(&input, &output)).expect_err("collision");

	assert!(matches!(error, WeftError::OutputCollision { ref path, .. } if path == "page.html"));
	Ok(())
}

#[test]
fn nested_output_is_ignored_by_discovery() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = input.join("out");
	write_tree(&input, &[("index.template.html", "{{ path }}"), ("site.css", "")])?;

	let plan = OutputGuard::check(&input, &output, false)?;
	assert_eq!(plan.relation, OutputRelation::Nested("out".to_string()));
	assert_eq!(plan.ignore_path(), Some("out"));

	let config = BuildConfig::new(&input, &output);
	build(&config)?;
	let second = build(&config)?;

	assert_eq!(second.output.targets(), vec!["index.html", "site.css"]);
	Ok(())
}

#[rstest]
#[case::shared_first_letter("b", "/build/out/", "b/build/out")]
#[case::shared_prefix("site", "/site-assets/raw/", "site/site-assets/raw")]
#[case::dot_prefixed("./b", "/build/", "./b/build")]
fn anchored_rules_match_under_a_relative_root(
	#[case] root: &str,
	#[case] line: &str,
	#[case] entry: &str,
) -> AnyEmptyResult {
	let rules = IgnoreRules::build(Path::new(root), None, &[line.to_string()])?;

	assert!(rules.is_ignored(Path::new(entry), true));
	Ok(())
}

#[test]
fn nested_output_with_glob_characters_is_ignored() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = input.join("out[1]");
	write_tree(&input, &[("index.template.html", "{{ path }}"), ("o1/keep.txt", "")])?;

	let plan = OutputGuard::check(&input, &output, false)?;
	assert_eq!(plan.ignored_paths(), vec!["/out\\[1\\]/".to_string()]);

	let config = BuildConfig::new(&input, &output);
	build(&config)?;
	let second = build(&config)?;

	assert_eq!(second.output.targets(), vec!["index.html", "o1/keep.txt"]);
	Ok(())
}

#[rstest]
#[case::refused(false)]
#[case::preserved(true)]
fn input_equal_to_output(#[case] preserve: bool) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let result = OutputGuard::check(tmp.path(), tmp.path(), preserve);

	if preserve {
		assert_eq!(result?.relation, OutputRelation::Same);
	} else {
		let error = result.expect_err("same directory without preserve");
		assert!(matches!(error, WeftError::InputIsOutput(_)));
		assert_eq!(error.kind(), ErrorKind::Configuration);
	}
	Ok(())
}

#[test]
fn guard_rejects_bad_directories() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[("file.txt", "")])?;
	let input = tmp.path().join("src");
	std::fs::create_dir(&input)?;

	let missing = OutputGuard::check(&tmp.path().join("missing"), tmp.path(), false);
	assert!(matches!(missing, Err(WeftError::MissingInput(_))));

	let file_output = OutputGuard::check(&input, &tmp.path().join("file.txt"), false);
	assert!(matches!(file_output, Err(WeftError::NotADirectory(_))));

	let containing = OutputGuard::check(&input, tmp.path(), false);
	assert!(matches!(containing, Err(WeftError::OutputContainsInput { .. })));

	let sibling = OutputGuard::check(&input, &tmp.path().join("dist"), false)?;
	assert_eq!(sibling.relation, OutputRelation::Separate);
	assert_eq!(sibling.ignored_paths(), Vec::<String>::new());
	Ok(())
}

#[test]
fn prepare_clears_previous_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("index.template.html", "new")])?;
	write_tree(&output, &[("stale/old.html", "old")])?;

	build(&BuildConfig::new(&input, &output))?;
	assert!(!output.join("stale").exists());

	write_tree(&output, &[("kept.html", "kept")])?;
	let mut config = BuildConfig::new(&input, &output);
	config.preserve_output = true;
	build(&config)?;
	assert!(output.join("kept.html").exists());
	Ok(())
}

#[test]
fn dry_run_leaves_output_untouched() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("index.template.html", "{{ path }}")])?;

	let mut config = BuildConfig::new(&input, &output);
	config.dry_run = true;
	let report = build(&config)?;

	assert_eq!(report.written, None);
	assert_eq!(report.output.targets(), vec!["index.html"]);
	assert!(!output.exists());
	Ok(())
}

#[test]
fn resolves_configuration_layers() -> AnyEmptyResult {
	const CONFIG: &str = r#"value_files = ["site.yaml"]

[markers]
template = ".tpl"

[ignore]
patterns = ["drafts/"]

[values]
site = "Config"
count = 1
"#;

	let tmp = tempfile::tempdir()?;
	write_tree(tmp.path(), &[
		("weft.toml", CONFIG),
		("site.yaml", "site: File\nauthor: Ann\n"),
		("index.tpl.html", "{{ site }} by {{ author }} ({{ count }})"),
		("drafts/wip.tpl.html", "draft"),
	])?;
	let options = BuildOptions {
		partial_marker: Some(".inc".to_string()),
		values: vec!["count=3".to_string()],
		..BuildOptions::default()
	};

	let config = BuildConfig::resolve(tmp.path(), &tmp.path().join("dist"), &options)?;

	assert_eq!(config.conventions.template_marker, ".tpl");
	assert_eq!(config.conventions.partial_marker, ".inc");
	assert_eq!(config.conventions.metadata_name, DEFAULT_METADATA_NAME);
	assert_eq!(
		Value::Mapping(config.globals.clone()),
		mapping(&[
			("author", Value::from("Ann")),
			("count", Value::from(3)),
			("site", Value::from("File")),
		])
	);

	let report = build(&config)?;
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("dist/index.html"))?,
		"File by Ann (3)"
	);
	assert_eq!(report.output.targets(), vec!["index.html"]);
	Ok(())
}

#[test]
fn value_files_inside_the_input_are_not_published() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	write_tree(tmp.path(), &[
		("src/index.template.html", "{{ site }}/{{ theme }}"),
		("src/data/extra.yaml", "site: Inner\n"),
		("src/data/table.csv", "a,b"),
		("theme.yaml", "theme: dark\n"),
	])?;
	let options = BuildOptions {
		value_files: vec![input.join("data/extra.yaml"), tmp.path().join("theme.yaml")],
		..BuildOptions::default()
	};

	let config = BuildConfig::resolve(&input, &tmp.path().join("out"), &options)?;
	let report = build(&config)?;

	assert_eq!(report.output.targets(), vec!["data/table.csv", "index.html"]);
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("out/index.html"))?,
		"Inner/dark"
	);
	Ok(())
}

#[test]
fn explicit_missing_ignore_file_is_a_discovery_error() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let options = BuildOptions {
		ignore_file: Some(tmp.path().join("missing.ignore")),
		..BuildOptions::default()
	};

	let config = BuildConfig::resolve(tmp.path(), &tmp.path().join("dist"), &options)?;
	let error = config.ignore_rules(&[]).expect_err("missing ignore file");

	assert_eq!(error.kind(), ErrorKind::Discovery);
	Ok(())
}

#[test]
fn default_ignore_file_is_applied_and_excluded() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	write_tree(&input, &[
		(".weftignore", "*.bak\n"),
		("keep.txt", ""),
		("old.bak", ""),
	])?;

	let config = BuildConfig::resolve(&input, &tmp.path().join("out"), &BuildOptions::default())?;
	let report = build(&config)?;

	assert_eq!(report.output.targets(), vec!["keep.txt"]);
	Ok(())
}

#[rstest]
#[case::number("n=3", "n", Value::from(3))]
#[case::boolean("flag=true", "flag", Value::from(true))]
#[case::string("x=hi", "x", Value::from("hi"))]
#[case::equals_in_value("q=a=b", "q", Value::from("a=b"))]
fn value_pairs(#[case] pair: &str, #[case] key: &str, #[case] expected: Value) -> WeftResult<()> {
	assert_eq!(parse_value_pair(pair)?, (key.to_string(), expected));
	Ok(())
}

#[rstest]
#[case::no_separator("novalue")]
#[case::empty_key("=3")]
fn invalid_value_pairs(#[case] pair: &str) {
	let error = parse_value_pair(pair).expect_err("invalid pair");
	assert!(matches!(error, WeftError::InvalidValue(_)));
}

#[test]
#[traced_test]
fn logs_each_stage() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let input = tmp.path().join("src");
	let output = tmp.path().join("out");
	write_tree(&input, &[("blog/post.metatemplate.html", "{{ meta.title }}")])?;

	build(&BuildConfig::new(&input, &output))?;

	assert!(logs_contain("stage=discover"));
	assert!(logs_contain("stage=verify-partials"));
	assert!(logs_contain("stage=finalize"));
	assert!(logs_contain("meta-template has no child directories with metadata"));
	assert!(logs_contain("build finished"));
	Ok(())
}
