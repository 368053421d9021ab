//! Rawline - an interactive line editor demo.
//!
//! Echoes every accepted line. `exit` or Ctrl-D quits and saves history.
//!
//! # Usage
//!
//! ```bash
//! rawline
//! rawline --prompt "db> " --history ~/.db_history
//! RUST_LOG=rawline=debug rawline --log-file rawline.log
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use rawline::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags,
};
use rawline::editor::{History, LineEditor, Outcome};
use rawline::terminal::{self, RawMode, TerminalSize};
use rawline::watcher::ResizeWatcher;

const DEFAULT_PROMPT: &str = "rawline> ";

/// An interactive line editor for raw-mode terminals
#[derive(Parser, Debug)]
#[command(name = "rawline", version, about, long_about = None)]
struct Cli {
    /// History file (defaults to a file next to the global config)
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,

    /// Maximum number of history entries
    #[arg(long, value_name = "N")]
    history_size: Option<usize>,

    /// Do not load or save history
    #[arg(long)]
    no_history: bool,

    /// Prompt shown before each line
    #[arg(long)]
    prompt: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Poll for terminal resizes every MS milliseconds instead of waiting for
    /// resize signals
    #[arg(long, value_name = "MS")]
    poll_ms: Option<u64>,

    /// Save current command-line flags as defaults in the global config
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in the global config
    #[arg(long)]
    clear: bool,
}

fn default_history_path() -> PathBuf {
    global_config_path().with_file_name("history")
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_history(flags: &ConfigFlags) -> Result<Option<(History, PathBuf)>> {
    if flags.no_history {
        return Ok(None);
    }
    let path = flags.history.clone().unwrap_or_else(default_history_path);
    let mut history = match flags.history_size {
        Some(size) => History::with_capacity(size)?,
        None => History::new(),
    };
    history
        .load_file(&path)
        .with_context(|| format!("Failed to load history {}", path.display()))?;
    Ok(Some((history, path)))
}

fn main() -> Result<()> {
    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    init_logging(effective.log_file.as_deref())?;

    let history = load_history(&effective)?;
    let prompt = effective
        .prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let raw = RawMode::enable()
        .context("Failed to enter raw mode, rawline requires an interactive terminal")?;
    let mut editor =
        LineEditor::new(std::io::stdin(), std::io::stdout(), terminal::columns()).with_prompt(prompt);
    let history_path = history.map(|(history, path)| {
        editor.set_history(history);
        path
    });
    let watcher = match effective.poll_ms {
        Some(ms) => {
            ResizeWatcher::spawn_polling(TerminalSize, editor.screen(), Duration::from_millis(ms))
        }
        None => ResizeWatcher::spawn(TerminalSize, editor.screen()),
    }
    .context("Failed to start resize watcher")?;

    loop {
        let line = editor.read_line().context("Line editing failed")?;
        match line.outcome {
            Outcome::Accepted if line.text == "exit" => break,
            Outcome::Accepted if !line.text.is_empty() => {
                editor.write_notice(&format!("=> {}", line.text))?;
            }
            Outcome::Accepted | Outcome::Interrupted => {}
            Outcome::EndOfInput => break,
        }
    }

    watcher.stop();
    drop(raw);

    if let (Some(history), Some(path)) = (editor.take_history(), history_path) {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history dir {}", parent.display()))?;
        }
        history
            .save_file(&path)
            .with_context(|| format!("Failed to save history {}", path.display()))?;
    }
    Ok(())
}
