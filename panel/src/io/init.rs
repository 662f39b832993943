//! Canonical `.panel/` layout and scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::io::config::{PanelConfig, write_config};
use crate::io::settings::SETTINGS_FILE;

/// All canonical paths within `.panel/` for a project root.
#[derive(Debug, Clone)]
pub struct PanelPaths {
    pub root: PathBuf,
    pub panel_dir: PathBuf,
    pub state_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub engine_dir: PathBuf,
    pub requests_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    pub settings_path: PathBuf,
    pub snapshot_path: PathBuf,
}

impl PanelPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let panel_dir = root.join(".panel");
        let state_dir = panel_dir.join("state");
        let engine_dir = panel_dir.join("engine");
        Self {
            root: root.clone(),
            panel_dir: panel_dir.clone(),
            state_dir: state_dir.clone(),
            runs_dir: panel_dir.join("runs"),
            engine_dir: engine_dir.clone(),
            requests_dir: engine_dir.join("requests"),
            gitignore_path: panel_dir.join(".gitignore"),
            config_path: state_dir.join("config.toml"),
            settings_path: state_dir.join(SETTINGS_FILE),
            snapshot_path: engine_dir.join("snapshot.json"),
        }
    }

    /// Archive directory for one run.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(run_id)
    }
}

/// Options for `init_panel`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite the config and gitignore.
    pub force: bool,
}

/// Create `.panel/` scaffolding in `root`.
///
/// Credentials are never written here; they only appear once the operator
/// sets them.
pub fn init_panel(root: &Path, options: &InitOptions) -> Result<PanelPaths> {
    let paths = PanelPaths::new(root);
    if paths.panel_dir.exists() && !options.force {
        return Err(anyhow!(
            "panel init: .panel already exists (use --force to overwrite)"
        ));
    }
    if paths.panel_dir.exists() && !paths.panel_dir.is_dir() {
        return Err(anyhow!("panel init: .panel exists but is not a directory"));
    }

    create_dir(&paths.state_dir)?;
    create_dir(&paths.runs_dir)?;
    create_dir(&paths.requests_dir)?;

    fs::write(&paths.gitignore_path, PANEL_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &PanelConfig::default())?;

    Ok(paths)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("create directory {}", path.display()))
}

const PANEL_GITIGNORE: &str = "state/api_settings.json\nengine/\nruns/\n";
