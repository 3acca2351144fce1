// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Build driver settings, typically loaded from a `Tagforge.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Read-only source root that is scanned for provisions.
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,

    /// Writable root that action outputs are resolved under. Created if
    /// absent.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Upper bound on simultaneously running actions.
    #[serde(default = "default_max_concurrent_actions")]
    pub max_concurrent_actions: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            tmp_dir: default_tmp_dir(),
            max_concurrent_actions: default_max_concurrent_actions(),
        }
    }
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_max_concurrent_actions() -> usize {
    1
}
