use crate::core::dirs::get_config_directory;
use crate::core::error::{DashboardError, Result};
use git2::{BranchType, ConfigLevel, Repository};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Local git config key holding the tracking-branch preference
pub const TRACKING_BRANCH_KEY: &str = "dashboard.trackingBranch";

/// Conventional default branch names tried when no preference is stored
pub const DEFAULT_BRANCH_CANDIDATES: [&str; 2] = ["main", "master"];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardConfig {
    pub commit_count: usize,
    pub cache_ttl_ms: u64,
    pub progress_interval_ms: u64,
    pub diff_pager: String,
    pub diff_pager_flags: Vec<String>,
    pub trace_commands: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            commit_count: 5,
            cache_ttl_ms: 100,
            progress_interval_ms: 100,
            diff_pager: "delta".to_string(),
            diff_pager_flags: vec!["--paging=never".to_string()],
            trace_commands: false,
        }
    }
}

impl DashboardConfig {
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_config_directory()?.join("config.json"))
    }

    /// Load from `path`, or the default location. Never fails: a missing file
    /// yields defaults and a malformed one is reported and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("Could not determine config directory: {e}");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::read(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config file '{}': {e}", path.display());
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

fn local_branch_exists(repo: &Repository, name: &str) -> bool {
    repo.find_branch(name, BranchType::Local).is_ok()
}

/// The raw stored preference, whether or not the branch still exists
pub fn stored_tracking_branch(repo: &Repository) -> Option<String> {
    let config = repo.config().ok()?;
    config
        .get_string(TRACKING_BRANCH_KEY)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The effective tracking branch.
///
/// The stored preference wins while it names an existing local branch;
/// otherwise the first existing conventional default is used. With neither,
/// no tracking comparison is available.
pub fn resolve_tracking_branch(repo: &Repository) -> Option<String> {
    if let Some(stored) = stored_tracking_branch(repo) {
        if local_branch_exists(repo, &stored) {
            return Some(stored);
        }
        log::debug!("Stored tracking branch '{stored}' no longer exists");
    }

    DEFAULT_BRANCH_CANDIDATES
        .iter()
        .find(|candidate| local_branch_exists(repo, candidate))
        .map(|candidate| candidate.to_string())
}

/// Persist the preference in the repository-local git config
pub fn save_tracking_branch(repo: &Repository, branch: &str) -> Result<()> {
    if !local_branch_exists(repo, branch) {
        return Err(DashboardError::precondition(format!(
            "No local branch named '{branch}'"
        )));
    }
    let mut config = repo.config()?.open_level(ConfigLevel::Local)?;
    config.set_str(TRACKING_BRANCH_KEY, branch)?;
    log::debug!("Tracking branch set to '{branch}'");
    Ok(())
}
