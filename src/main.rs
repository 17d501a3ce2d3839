mod builder;
mod env_flags;
mod kernelspec;
mod native;
mod registry;

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitStatus;

use clap::Parser;

use crate::kernelspec::{KernelIdentity, KernelSpec};
use crate::registry::InstallLocation;

#[derive(Parser, Debug)]
#[command(name = "igraalvm-install")]
#[command(about = "Install the GraalVM kernel.")]
pub struct Cli {
    /// Install to the per-user kernel registry.
    #[arg(long, group = "location")]
    pub user: bool,

    /// Install to the active environment prefix. Useful in conda/virtual
    /// environments.
    #[arg(long, group = "location")]
    pub sys_prefix: bool,

    /// Specify a prefix to install to, e.g. an env. The kernelspec will be
    /// installed in PREFIX/share/jupyter/kernels/
    #[arg(long, value_name = "PREFIX", group = "location")]
    pub prefix: Option<PathBuf>,

    /// A duration specifying a timeout (in milliseconds by default) for a
    /// single top level statement. If less than 1 then there is no timeout.
    /// If desired a time may be specified with a TimeUnit following the
    /// duration number (e.g. "30 SECONDS").
    #[arg(long, value_name = "VALUE", value_parser = env_flags::timeout_value)]
    pub timeout: Vec<String>,

    /// Path to the GraalVM.
    #[arg(long, value_name = "PATH")]
    pub graalvm: Option<PathBuf>,

    /// Build and install a native kernel with the provided set of
    /// comma-separated languages.
    #[arg(long, value_name = "LANG1,LANG2,...", value_delimiter = ',')]
    pub native: Option<Vec<String>>,
}

/// Everything the install flow needs, built once from the CLI and immutable
/// afterwards.
#[derive(Debug)]
pub struct ParsedArgs {
    pub location: InstallLocation,
    pub graalvm: Option<PathBuf>,
    pub native: Option<Vec<String>>,
    pub env_overrides: BTreeMap<String, String>,
}

impl ParsedArgs {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        // The location flags are mutually exclusive at the parser level.
        // User installation by default.
        let location = if cli.user {
            InstallLocation::User
        } else if cli.sys_prefix {
            InstallLocation::SysPrefix
        } else if let Some(prefix) = cli.prefix {
            InstallLocation::Prefix(prefix)
        } else {
            InstallLocation::User
        };

        // Timeout values come out of the parser already alias-resolved; fold
        // them into the override map under the flag's environment variable.
        let timeout_flag = env_flags::env_flag("timeout")?;
        let mut overrides = env_flags::EnvOverrides::new();
        for value in &cli.timeout {
            overrides.apply(timeout_flag, value);
        }

        Ok(ParsedArgs {
            location,
            graalvm: cli.graalvm,
            native: cli.native,
            env_overrides: overrides.into_map(),
        })
    }
}

// A failed subprocess ends the install with the child's own exit code.
fn propagate_failure(status: ExitStatus) {
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
}

fn main() -> anyhow::Result<()> {
    let args = ParsedArgs::from_cli(Cli::parse())?;

    let Some(graalvm_home) =
        builder::resolve_graalvm_home(args.graalvm.as_deref(), env::var_os("GRAALVM_HOME"))
    else {
        // No runtime configured is a soft exit, not a failure.
        println!("{}", builder::GUIDANCE);
        return Ok(());
    };

    propagate_failure(builder::run_package_build(&graalvm_home)?);

    let project_dir = env::current_dir()?;
    let staging_dir = builder::stage_artifact(&project_dir)?;

    let mut identity = KernelIdentity::Jar;
    if let Some(languages) = &args.native {
        propagate_failure(native::compile_native(&graalvm_home, &staging_dir, languages)?);
        identity = KernelIdentity::Native;
    }

    let install_dest =
        registry::install_kernel_spec(&staging_dir, identity.registry_name(), &args.location)?;

    let spec = KernelSpec::build(identity, &install_dest, &graalvm_home, &args.env_overrides);
    spec.write(&install_dest)?;

    println!(
        "Installed GraalVM kernel into \"{}\"",
        install_dest.display()
    );
    Ok(())
}
