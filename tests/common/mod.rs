//! Shared helpers for CLI integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Command for the compiled rescomp binary.
pub fn rescomp() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rescomp"))
}

/// Write a file under `dir`, creating parent directories.
pub fn write_file(dir: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// A small HUD-style fixture: a root file pulling in one existing and one
/// missing target.
pub fn hud_fixture(dir: &Path) -> PathBuf {
    write_file(
        dir,
        "hud/colors.res",
        "\"Scheme\"\n{\n\"red\" \"255 0 0 255\"\n}\n",
    );
    write_file(
        dir,
        "hud/health.res",
        concat!(
            "#base \"colors.res\"\n",
            "#include \"overrides/custom.res\"\n",
            "\"Scheme\"\n{\n\"blue\" \"0 0 255 255\"\n}\n",
        ),
    )
}
