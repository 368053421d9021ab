use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub history: Option<PathBuf>,
    pub history_size: Option<usize>,
    pub no_history: bool,
    pub prompt: Option<String>,
    pub log_file: Option<PathBuf>,
    pub poll_ms: Option<u64>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            history: other.history.clone().or_else(|| self.history.clone()),
            history_size: other.history_size.or(self.history_size),
            no_history: self.no_history || other.no_history,
            prompt: other.prompt.clone().or_else(|| self.prompt.clone()),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
            poll_ms: other.poll_ms.or(self.poll_ms),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("rawline").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("rawline")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("rawline").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("rawline").join("config");
        }
    }

    PathBuf::from(".rawlinerc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".rawlinerc")
}

/// Read flags from a config file, one flag per line.
///
/// Everything after the flag name is its value, so values may contain
/// spaces. Surrounding double quotes are removed, which keeps trailing
/// spaces in a prompt.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| match line.split_once(char::is_whitespace) {
            Some((flag, value)) => vec![flag.to_string(), unquote(value.trim()).to_string()],
            None => vec![line.to_string()],
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# rawline defaults (saved with --save)".to_string());
    if let Some(history) = &flags.history {
        lines.push(format!("--history {}", history.display()));
    }
    if let Some(size) = flags.history_size {
        lines.push(format!("--history-size {size}"));
    }
    if flags.no_history {
        lines.push("--no-history".to_string());
    }
    if let Some(prompt) = &flags.prompt {
        lines.push(format!("--prompt \"{prompt}\""));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(ms) = flags.poll_ms {
        lines.push(format!("--poll-ms {ms}"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of a token list. Unknown tokens and values that
/// do not parse are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--no-history" {
            flags.no_history = true;
            i += 1;
            continue;
        }
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        if !matches!(
            name,
            "--history" | "--history-size" | "--prompt" | "--log-file" | "--poll-ms"
        ) {
            i += 1;
            continue;
        }
        let value = match inline {
            Some(value) => value,
            None => {
                i += 1;
                match tokens.get(i) {
                    Some(next) => next.as_str(),
                    None => break,
                }
            }
        };
        match name {
            "--history" => flags.history = Some(PathBuf::from(value)),
            "--history-size" => flags.history_size = value.parse().ok().or(flags.history_size),
            "--prompt" => flags.prompt = Some(value.to_string()),
            "--log-file" => flags.log_file = Some(PathBuf::from(value)),
            _ => flags.poll_ms = value.parse().ok().or(flags.poll_ms),
        }
        i += 1;
    }
    flags
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
