//! Centralized configuration for the store and per-cluster construction options.
//!
//! - `EslConfig::from_env()` reads ESL_* env vars; fluent `with_*` setters override them.
//! - `ClusterOptions` describes how `Registry::get_or_create` builds a cluster
//!   (load from disk, force recreate on a broken load, auto-save on register).
//!
//! Defaults:
//! - root_dir = ".esl_store" (relative to the current dir)
//! - auto_save = true (every register dumps the cluster)
//! - fsync = false (manifest/snapshot are still written via tmp+rename)
//! - pretty = true (human-readable manifest.json / registry.json)

use std::fmt;
use std::path::PathBuf;

use crate::consts::DEFAULT_ROOT_DIR;

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "on" || s == "yes"
    })
}

/// Top-level configuration of a store.
#[derive(Clone, Debug)]
pub struct EslConfig {
    /// Root directory holding registry.json and one subdirectory per cluster.
    /// Env: ESL_ROOT_DIR (default ".esl_store")
    pub root_dir: PathBuf,

    /// Default auto-save for clusters opened through `ClusterOptions::default()`.
    /// Env: ESL_AUTO_SAVE (default true)
    pub auto_save: bool,

    /// fsync manifest/snapshot files after writing.
    /// Env: ESL_FSYNC (default false)
    pub fsync: bool,

    /// Pretty-print JSON manifests and the registry snapshot.
    /// Env: ESL_PRETTY (default true)
    pub pretty: bool,
}

impl Default for EslConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            auto_save: true,
            fsync: false,
            pretty: true,
        }
    }
}

impl EslConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("ESL_ROOT_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.root_dir = PathBuf::from(s);
            }
        }
        if let Some(on) = env_flag("ESL_AUTO_SAVE") {
            cfg.auto_save = on;
        }
        if let Some(on) = env_flag("ESL_FSYNC") {
            cfg.fsync = on;
        }
        if let Some(on) = env_flag("ESL_PRETTY") {
            cfg.pretty = on;
        }

        cfg
    }

    /// Config rooted at an explicit directory (env is not consulted).
    pub fn at<P: Into<PathBuf>>(root: P) -> Self {
        Self::default().with_root_dir(root)
    }

    pub fn with_root_dir<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root_dir = root.into();
        self
    }

    pub fn with_auto_save(mut self, on: bool) -> Self {
        self.auto_save = on;
        self
    }

    pub fn with_fsync(mut self, on: bool) -> Self {
        self.fsync = on;
        self
    }

    pub fn with_pretty(mut self, on: bool) -> Self {
        self.pretty = on;
        self
    }

    /// Options for a general cluster derived from this config.
    pub fn cluster_options(&self) -> ClusterOptions {
        ClusterOptions::default().auto_save(self.auto_save)
    }
}

impl fmt::Display for EslConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EslConfig {{ root_dir: {}, auto_save: {}, fsync: {}, pretty: {} }}",
            self.root_dir.display(),
            self.auto_save,
            self.fsync,
            self.pretty,
        )
    }
}

/// How a cluster is constructed by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Load entries from the manifest on construction.
    pub load: bool,
    /// On a failed load keep what was readable and rewrite a fresh manifest
    /// instead of failing with LoadFailure.
    pub force_recreate: bool,
    /// Dump the whole cluster after every register call.
    pub auto_save: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            load: true,
            force_recreate: false,
            auto_save: true,
        }
    }
}

impl ClusterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(mut self, on: bool) -> Self {
        self.load = on;
        self
    }

    pub fn force_recreate(mut self, on: bool) -> Self {
        self.force_recreate = on;
        self
    }

    pub fn auto_save(mut self, on: bool) -> Self {
        self.auto_save = on;
        self
    }

    /// Function-capture cluster: fresh, no load, explicit single dump.
    pub fn capture() -> Self {
        Self {
            load: false,
            force_recreate: true,
            auto_save: false,
        }
    }

    /// Function-replay cluster: strict load, read-only usage.
    pub fn replay() -> Self {
        Self {
            load: true,
            force_recreate: false,
            auto_save: false,
        }
    }
}
