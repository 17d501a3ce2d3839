use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::Context;

/// Where `mvn package` leaves the kernel jar, relative to the project root.
pub const BUILT_JAR: &str = "target/IGraalVM-1.0-SNAPSHOT.jar";

/// Staging directory handed to the kernel registry, relative to the project
/// root.
pub const STAGING_DIR: &str = "graalvm";

/// The jar's name inside the staging directory and the installed kernel.
pub const JAR_NAME: &str = "IGraalVM.jar";

pub const GUIDANCE: &str =
    "Set GraalVM installation location via --graalvm option, or set GRAALVM_HOME environment variable";

/// GraalVM home is the `--graalvm` flag, else a non-empty `GRAALVM_HOME`.
/// `None` means the installer should print guidance and exit cleanly.
pub fn resolve_graalvm_home(flag: Option<&Path>, env_value: Option<OsString>) -> Option<PathBuf> {
    flag.filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| {
            env_value
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
}

/// Run `mvn package` with `JAVA_HOME` pointing at the resolved GraalVM. The
/// caller decides what to do with a non-zero status.
pub fn run_package_build(graalvm_home: &Path) -> anyhow::Result<ExitStatus> {
    Command::new("mvn")
        .arg("package")
        .env("JAVA_HOME", graalvm_home)
        .status()
        .context("Failed to run \"mvn package\" (is Maven on the PATH?)")
}

/// Make sure the staging directory exists and move the built jar into it.
/// Returns the staging directory path.
pub fn stage_artifact(project_dir: &Path) -> anyhow::Result<PathBuf> {
    let staging_dir = project_dir.join(STAGING_DIR);
    fs::create_dir_all(&staging_dir)
        .with_context(|| format!("Failed to create {}", staging_dir.display()))?;

    let built = project_dir.join(BUILT_JAR);
    let staged = staging_dir.join(JAR_NAME);
    move_file(&built, &staged).with_context(|| {
        format!("Failed to move {} to {}", built.display(), staged.display())
    })?;

    Ok(staging_dir)
}

// Rename, falling back to copy+delete when source and destination sit on
// different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
