//! Command-line access to the panel's classification, reduction, stats and
//! settings, for scripting and for inspecting engine output offline.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use panel::core::classifier::{Domain, classify};
use panel::core::log_reducer::reduce;
use panel::core::stats::aggregate;
use panel::core::types::{LogEvent, RunResult};
use panel::exit_codes;
use panel::io::init::{InitOptions, PanelPaths, init_panel};
use panel::io::settings::{CredentialsPatch, SettingsStore};
use panel::view::format_event_time;

#[derive(Parser)]
#[command(
    name = "panel",
    version,
    about = "Control and observability panel for curation runs"
)]
struct Cli {
    /// Project directory (contains .panel/)
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.panel/` scaffolding with a default config.
    Init {
        /// Overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the badge (label, color, icon) for a raw status code.
    Classify {
        #[arg(long, value_enum, default_value = "worker")]
        domain: DomainArg,
        code: String,
    },
    /// Print the latest event of a JSON log array and whether it blocks a stage.
    Reduce { log: PathBuf },
    /// Print display statistics for a JSON run result.
    Stats { result: PathBuf },
    /// Show or change stored API credentials.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print which keys are set (values are masked).
    Show,
    /// Update one or both keys; omitted keys keep their value.
    Set {
        #[arg(long)]
        llm_key: Option<String>,
        #[arg(long)]
        crawler_key: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DomainArg {
    Worker,
    Stage,
}

impl From<DomainArg> for Domain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Worker => Domain::Worker,
            DomainArg::Stage => Domain::Stage,
        }
    }
}

fn main() {
    panel::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.project_dir, force),
        Command::Classify { domain, code } => cmd_classify(domain.into(), &code),
        Command::Reduce { log } => cmd_reduce(&log),
        Command::Stats { result } => cmd_stats(&result),
        Command::Settings { action } => cmd_settings(&cli.project_dir, action),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_panel(root, &InitOptions { force })?;
    println!("{}", paths.panel_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_classify(domain: Domain, code: &str) -> Result<i32> {
    let badge = classify(code, domain);
    let color = serde_json::to_value(badge.color)?;
    let icon = serde_json::to_value(badge.icon)?;
    println!(
        "{}\t{}\t{}",
        badge.label,
        color.as_str().unwrap_or_default(),
        icon.as_str().unwrap_or_default()
    );
    Ok(exit_codes::OK)
}

fn cmd_reduce(path: &Path) -> Result<i32> {
    let log: Vec<LogEvent> = read_json(path)?;
    let summary = reduce(&log);
    let Some(latest) = summary.latest else {
        println!("no events");
        return Ok(exit_codes::OK);
    };
    println!("{}  {}", format_event_time(latest.timestamp), latest.description);
    if !summary.is_blocked {
        return Ok(exit_codes::OK);
    }
    match summary.blocked_stage_id {
        Some(stage_id) => println!("blocked: {}", stage_id),
        None => println!("blocked: (stage id missing)"),
    }
    Ok(exit_codes::BLOCKED)
}

fn cmd_stats(path: &Path) -> Result<i32> {
    let result: RunResult = read_json(path)?;
    let stats = aggregate(&result).ok_or_else(|| {
        anyhow!(
            "run result is {} without usable stats",
            result.status.as_code()
        )
    })?;
    println!("duration: {}", stats.duration_label());
    println!("tokens: {}", stats.tokens_label());
    println!("cost: {}", stats.cost_label());
    Ok(exit_codes::OK)
}

fn cmd_settings(root: &Path, action: SettingsAction) -> Result<i32> {
    let paths = PanelPaths::new(root);
    let mut store = SettingsStore::open(&paths.settings_path);
    match action {
        SettingsAction::Show => {
            let current = store.current();
            println!("llm_key: {}", mask(&current.llm_key));
            println!("crawler_key: {}", mask(&current.crawler_key));
        }
        SettingsAction::Set {
            llm_key,
            crawler_key,
        } => {
            let patch = CredentialsPatch {
                llm_key,
                crawler_key,
            };
            if patch.is_empty() {
                return Err(anyhow!("settings set: pass --llm-key and/or --crawler-key"));
            }
            store.update(patch)?;
        }
    }
    Ok(exit_codes::OK)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Show only the last four characters of a key.
fn mask(value: &str) -> String {
    if value.is_empty() {
        return "(unset)".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}
