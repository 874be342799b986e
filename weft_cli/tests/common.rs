use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn weft_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("weft"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Write `files` below `root`, creating parent directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) -> std::io::Result<()> {
	for (relative, contents) in files {
		let path = root.join(relative);
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, contents)?;
	}

	Ok(())
}
