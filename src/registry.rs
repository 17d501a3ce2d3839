use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Where the kernel lands in the registry. Exactly one mode is active per
/// install; user mode is the default when no location flag is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallLocation {
    User,
    SysPrefix,
    Prefix(PathBuf),
}

/// Copy the staged kernel directory into the registry and return the
/// absolute install destination. Kernel names are case-insensitive on the
/// registry side, so the directory name is the lowercased kernel name, and a
/// previous install of the same kernel is replaced wholesale.
// DOCS: https://jupyter-client.readthedocs.io/en/latest/kernels.html#kernel-specs
pub fn install_kernel_spec(
    staging_dir: &Path,
    kernel_name: &str,
    location: &InstallLocation,
) -> anyhow::Result<PathBuf> {
    let dest = kernels_root(location)?.join(kernel_name.to_lowercase());

    if dest.exists() {
        fs::remove_dir_all(&dest)
            .with_context(|| format!("Failed to remove previous install at {}", dest.display()))?;
    }
    fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    copy_dir(staging_dir, &dest).with_context(|| {
        format!(
            "Failed to copy {} into {}",
            staging_dir.display(),
            dest.display()
        )
    })?;

    Ok(dest)
}

fn kernels_root(location: &InstallLocation) -> anyhow::Result<PathBuf> {
    match location {
        InstallLocation::User => Ok(jupyter_data_dir()?.join("kernels")),
        InstallLocation::SysPrefix => {
            Ok(sys_prefix()?.join("share").join("jupyter").join("kernels"))
        }
        InstallLocation::Prefix(prefix) => {
            Ok(prefix.join("share").join("jupyter").join("kernels"))
        }
    }
}

// DOCS: https://docs.jupyter.org/en/latest/use/jupyter-directories.html
fn jupyter_data_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = env::var_os("JUPYTER_DATA_DIR").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if cfg!(target_os = "macos") {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        return Ok(home.join("Library").join("Jupyter"));
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find user data directory"))?;
    Ok(data_dir.join("jupyter"))
}

// The active virtualenv or conda env stands in for the front-end's prefix.
fn sys_prefix() -> anyhow::Result<PathBuf> {
    for key in ["VIRTUAL_ENV", "CONDA_PREFIX"] {
        if let Some(prefix) = env::var_os(key) {
            if !prefix.is_empty() {
                return Ok(PathBuf::from(prefix));
            }
        }
    }
    Err(anyhow::anyhow!(
        "--sys-prefix requires an active virtualenv or conda environment \
         (neither VIRTUAL_ENV nor CONDA_PREFIX is set)"
    ))
}

fn copy_dir(src: &Path, dest: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
