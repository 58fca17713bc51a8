//! Runtime tunables, loadable from the `[invoke]` table of a TOML file.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use crate::util::sync::{read, write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Invocations after which a handle asks for its own thunk.
    pub custom_thunk_threshold: u32,
    /// Longest run of skipped equivalence checks on a mutable call site.
    pub equivalence_backoff_cap: u32,
    /// Argument slots a handle type may use.
    pub arity_limit: usize,
    /// When false every handle gets a private thunk.
    pub share_thunks: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            custom_thunk_threshold: 1000,
            equivalence_backoff_cap: 1000,
            arity_limit: 254,
            share_thunks: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default)]
    invoke: InvokeSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct InvokeSection {
    #[serde(default)]
    custom_thunk_threshold: Option<u32>,
    #[serde(default)]
    equivalence_backoff_cap: Option<u32>,
    #[serde(default)]
    arity_limit: Option<usize>,
    #[serde(default)]
    share_thunks: Option<bool>,
}

impl RuntimeConfig {
    /// Parses a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(input).context("invalid invoke configuration")?;
        let section = file.invoke;
        let mut cfg = Self::default();
        if let Some(v) = section.custom_thunk_threshold.filter(|v| *v > 0) {
            cfg.custom_thunk_threshold = v;
        }
        if let Some(v) = section.equivalence_backoff_cap {
            cfg.equivalence_backoff_cap = v;
        }
        if let Some(v) = section.arity_limit.filter(|v| *v > 0) {
            cfg.arity_limit = v;
        }
        if let Some(v) = section.share_thunks {
            cfg.share_thunks = v;
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text)
    }
}

static CURRENT: Lazy<RwLock<Arc<RuntimeConfig>>> = Lazy::new(|| RwLock::new(Arc::new(RuntimeConfig::default())));

// hot-path copies of the fields read on every invocation
static THRESHOLD: AtomicU32 = AtomicU32::new(1000);
static BACKOFF_CAP: AtomicU32 = AtomicU32::new(1000);
static ARITY_LIMIT: AtomicUsize = AtomicUsize::new(254);
static SHARE_THUNKS: AtomicBool = AtomicBool::new(true);

/// Replaces the process-wide configuration.
pub fn install(cfg: RuntimeConfig) {
    debug!(target: "invoke::handle", ?cfg, "installing runtime configuration");
    THRESHOLD.store(cfg.custom_thunk_threshold, Ordering::Relaxed);
    BACKOFF_CAP.store(cfg.equivalence_backoff_cap, Ordering::Relaxed);
    ARITY_LIMIT.store(cfg.arity_limit, Ordering::Relaxed);
    SHARE_THUNKS.store(cfg.share_thunks, Ordering::Relaxed);
    *write(&CURRENT) = Arc::new(cfg);
}

pub fn current() -> Arc<RuntimeConfig> {
    read(&CURRENT).clone()
}

#[inline]
pub fn custom_thunk_threshold() -> u32 {
    THRESHOLD.load(Ordering::Relaxed)
}

#[inline]
pub fn equivalence_backoff_cap() -> u32 {
    BACKOFF_CAP.load(Ordering::Relaxed)
}

#[inline]
pub fn arity_limit() -> usize {
    ARITY_LIMIT.load(Ordering::Relaxed)
}

#[inline]
pub fn share_thunks() -> bool {
    SHARE_THUNKS.load(Ordering::Relaxed)
}
