use std::collections::BTreeMap;

// CLI flags that feed the kernel environment, one row per flag.
// `env_var` is the key the resolved value is stored under in the installed
// kernel.json; `aliases` maps symbolic values to their stored form; a flag
// with a `list_sep` joins repeated occurrences instead of overwriting.
pub struct EnvFlag {
    pub flag: &'static str,
    pub env_var: &'static str,
    pub aliases: &'static [(&'static str, &'static str)],
    pub list_sep: Option<&'static str>,
}

pub const ENV_FLAGS: &[EnvFlag] = &[EnvFlag {
    flag: "timeout",
    env_var: "IGRAALVM_TIMEOUT",
    aliases: &[("NO_TIMEOUT", "-1")],
    list_sep: None,
}];

// A flag missing from the table is a configuration mistake in this crate,
// not bad user input.
pub fn env_flag(flag: &str) -> anyhow::Result<&'static EnvFlag> {
    ENV_FLAGS
        .iter()
        .find(|entry| entry.flag == flag)
        .ok_or_else(|| anyhow::anyhow!("Flag \"{flag}\" is not mapped to an environment variable"))
}

impl EnvFlag {
    /// Expand a symbolic alias to its stored value; anything else passes
    /// through unchanged.
    pub fn resolve_alias(&self, value: &str) -> String {
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == value)
            .map(|(_, resolved)| (*resolved).to_string())
            .unwrap_or_else(|| value.to_string())
    }

    /// Alias expansion plus the value check, run at CLI parse time.
    pub fn parse_value(&self, value: &str) -> Result<String, String> {
        // Every string is a valid value today; stricter checks slot in here.
        Ok(self.resolve_alias(value))
    }
}

/// clap value parser for `--timeout`.
pub fn timeout_value(value: &str) -> Result<String, String> {
    env_flag("timeout")
        .map_err(|e| e.to_string())?
        .parse_value(value)
}

/// Environment-variable overrides collected from the CLI, merged into the
/// installed descriptor's `env` block after the base keys.
#[derive(Debug, Default)]
pub struct EnvOverrides {
    values: BTreeMap<String, String>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one already-parsed flag occurrence into the mapping. With a list
    /// separator the value is appended to any previous one; without, the
    /// newest occurrence wins.
    pub fn apply(&mut self, flag: &EnvFlag, value: &str) {
        let stored = match (flag.list_sep, self.values.get(flag.env_var)) {
            (Some(sep), Some(old)) => format!("{old}{sep}{value}"),
            _ => value.to_string(),
        };
        self.values.insert(flag.env_var.to_string(), stored);
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }
}
