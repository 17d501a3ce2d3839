use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::builder::JAR_NAME;

/// Substituted by the front-end at kernel launch time; passed through
/// verbatim, never escaped or resolved here.
pub const CONNECTION_FILE_TOKEN: &str = "{connection_file}";

/// Name of the native executable that `native-image` produces from the jar.
pub const NATIVE_BINARY: &str = "IGraalVM";

pub const DESCRIPTOR_FILE: &str = "kernel.json";

/// Which artifact the installed kernel launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelIdentity {
    Jar,
    Native,
}

impl KernelIdentity {
    /// Name the kernel directory is registered under.
    pub fn registry_name(self) -> &'static str {
        match self {
            Self::Jar => "GraalVM",
            Self::Native => "GraalVMNative",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Jar => "GraalVM",
            Self::Native => "GraalVM Native",
        }
    }

    pub fn language(self) -> &'static str {
        match self {
            Self::Jar => "GraalVM",
            Self::Native => "GraalVM Native",
        }
    }
}

// Installed kernel descriptor. Fields stay in alphabetical order and `env`
// is a BTreeMap so identical inputs serialize to byte-identical kernel.json.
// DOCS: https://jupyter-client.readthedocs.io/en/latest/kernels.html#kernel-specs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KernelSpec {
    pub argv: Vec<String>, // A list of command line arguments used to start the kernel
    pub display_name: String, // The kernel's name as it should be displayed in the UI
    pub env: BTreeMap<String, String>, // Environment variables set for the launched kernel
    pub interrupt_mode: String, // "message": interrupts arrive as kernel messages, not signals
    pub language: String,  // The name of the language of the kernel
}

impl KernelSpec {
    /// Build the descriptor for a kernel installed at `install_dest`.
    /// CLI-derived overrides merge into `env` after the base keys, so they
    /// win on key collision.
    pub fn build(
        identity: KernelIdentity,
        install_dest: &Path,
        graalvm_home: &Path,
        overrides: &BTreeMap<String, String>,
    ) -> Self {
        let argv = match identity {
            KernelIdentity::Native => vec![
                install_dest.join(NATIVE_BINARY).display().to_string(),
                CONNECTION_FILE_TOKEN.to_string(),
            ],
            KernelIdentity::Jar => vec![
                graalvm_home.join("bin").join("java").display().to_string(),
                "-jar".to_string(),
                install_dest.join(JAR_NAME).display().to_string(),
                CONNECTION_FILE_TOKEN.to_string(),
            ],
        };

        let mut env = BTreeMap::new();
        env.insert(
            "GRAALVM_HOME".to_string(),
            graalvm_home.display().to_string(),
        );
        env.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        KernelSpec {
            argv,
            display_name: identity.display_name().to_string(),
            env,
            interrupt_mode: "message".to_string(),
            language: identity.language().to_string(),
        }
    }

    /// Write `kernel.json` into the installed destination.
    pub fn write(&self, install_dest: &Path) -> anyhow::Result<()> {
        let path = install_dest.join(DESCRIPTOR_FILE);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize kernel spec")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{CONNECTION_FILE_TOKEN, DESCRIPTOR_FILE, KernelIdentity, KernelSpec};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    #[test]
    fn test_jar_argv_launches_java_with_installed_jar() {
        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &BTreeMap::new(),
        );

        assert_eq!(
            spec.argv,
            vec![
                "/opt/gvm/bin/java",
                "-jar",
                "/kernels/graalvm/IGraalVM.jar",
                "{connection_file}",
            ]
        );
        assert_eq!(spec.display_name, "GraalVM");
        assert_eq!(spec.language, "GraalVM");
        assert_eq!(spec.interrupt_mode, "message");
    }

    #[test]
    fn test_native_argv_launches_the_standalone_executable() {
        let spec = KernelSpec::build(
            KernelIdentity::Native,
            Path::new("/kernels/graalvmnative"),
            Path::new("/opt/gvm"),
            &BTreeMap::new(),
        );

        assert_eq!(
            spec.argv,
            vec!["/kernels/graalvmnative/IGraalVM", "{connection_file}"]
        );
        assert!(spec.argv[0].ends_with("IGraalVM"));
        assert!(spec.display_name.contains("Native"));
        assert!(spec.language.contains("Native"));
    }

    #[test]
    fn test_connection_file_token_passes_through_unescaped() {
        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &BTreeMap::new(),
        );
        assert_eq!(spec.argv.last().map(String::as_str), Some(CONNECTION_FILE_TOKEN));

        let json = serde_json::to_string_pretty(&spec).unwrap();
        assert!(json.contains("\"{connection_file}\""));
    }

    #[test]
    fn test_env_holds_runtime_home_plus_resolved_overrides() {
        // `--timeout NO_TIMEOUT --graalvm /opt/gvm` worked end to end.
        let flag = crate::env_flags::env_flag("timeout").unwrap();
        let mut overrides = crate::env_flags::EnvOverrides::new();
        overrides.apply(flag, &flag.resolve_alias("NO_TIMEOUT"));

        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &overrides.into_map(),
        );

        let expected: BTreeMap<String, String> = [
            ("GRAALVM_HOME".to_string(), "/opt/gvm".to_string()),
            ("IGRAALVM_TIMEOUT".to_string(), "-1".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(spec.env, expected);
    }

    #[test]
    fn test_colliding_override_wins_over_base_key() {
        let overrides: BTreeMap<String, String> =
            [("GRAALVM_HOME".to_string(), "/elsewhere".to_string())]
                .into_iter()
                .collect();

        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &overrides,
        );
        assert_eq!(
            spec.env.get("GRAALVM_HOME").map(String::as_str),
            Some("/elsewhere")
        );
    }

    #[test]
    fn test_repeated_writes_are_byte_identical() {
        let mut overrides = BTreeMap::new();
        overrides.insert("IGRAALVM_TIMEOUT".to_string(), "-1".to_string());
        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &overrides,
        );

        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        spec.write(first_dir.path()).unwrap();
        spec.write(second_dir.path()).unwrap();

        let first = fs::read(first_dir.path().join(DESCRIPTOR_FILE)).unwrap();
        let second = fs::read(second_dir.path().join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_keys_are_sorted() {
        let spec = KernelSpec::build(
            KernelIdentity::Jar,
            Path::new("/kernels/graalvm"),
            Path::new("/opt/gvm"),
            &BTreeMap::new(),
        );
        let json = serde_json::to_string_pretty(&spec).unwrap();

        let positions: Vec<usize> = ["\"argv\"", "\"display_name\"", "\"env\"", "\"interrupt_mode\"", "\"language\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
