//! Scan configuration: built-in defaults, `cartograph.yaml`, environment, flags.
//!
//! Later layers override earlier ones key by key. The keyword table and the
//! route table are plain data in [`DEFAULTS_YAML`] so they can be swapped
//! without touching the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::capability::CapabilityTable;
use crate::error::{CartographError, Result};
use crate::ports::FileSystem;
use crate::synth::routes::{RouteRule, RouteTable};

/// Built-in configuration document.
pub const DEFAULTS_YAML: &str = include_str!("defaults.yaml");

/// Name of the optional per-project configuration file at the scan root.
pub const CONFIG_FILE_NAME: &str = "cartograph.yaml";

/// Default directory for persisted generations.
pub const DEFAULT_OUT_DIR: &str = ".cartograph";

/// Environment variable overriding the required-capability list.
pub const ENV_REQUIRED_CAPABILITIES: &str = "SCAN_REQUIRED_CAPABILITIES";

/// Environment variable overriding the worker pool size.
pub const ENV_MAX_WORKERS: &str = "SCAN_MAX_WORKERS";

/// Upper bound on extraction workers regardless of core count.
pub const MAX_WORKERS: usize = 64;

/// One configuration layer as written in YAML. Absent keys leave the lower
/// layer untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigLayer {
    /// Extra ignore globs.
    pub ignore: Option<Vec<String>>,
    /// Files larger than this are skipped.
    pub max_file_size: Option<u64>,
    /// Worker pool size.
    pub max_workers: Option<usize>,
    /// Capability groups larger than this are reported.
    pub capability_threshold: Option<usize>,
    /// More entry points than this are reported.
    pub launcher_threshold: Option<usize>,
    /// Capabilities that must be implemented somewhere.
    pub required_capabilities: Option<Vec<String>>,
    /// Keyword table.
    pub capabilities: Option<BTreeMap<String, Vec<String>>>,
    /// Route prefix table.
    pub routes: Option<Vec<RouteRule>>,
}

impl ConfigLayer {
    /// Parses a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] when the YAML is malformed or has
    /// unknown keys.
    pub fn from_yaml(source: &str, origin: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(source)
            .map_err(|e| CartographError::Config(format!("{origin}: {e}")))
    }
}

/// Flag values from the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--ignore` globs, appended to the configured ones.
    pub ignore: Vec<String>,
    /// `--max-file-size`.
    pub max_file_size: Option<u64>,
    /// `--workers`.
    pub workers: Option<usize>,
    /// `--out`.
    pub out_dir: Option<PathBuf>,
}

/// Everything a scan needs to know.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Directory being scanned.
    pub root: PathBuf,
    /// Where generations are persisted.
    pub out_dir: PathBuf,
    /// Directory-name and path globs to skip.
    pub ignore: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Extraction worker count.
    pub workers: usize,
    /// Capability groups with more members than this are reported.
    pub capability_threshold: usize,
    /// More entry points than this are reported.
    pub launcher_threshold: usize,
    /// Capabilities that must be present somewhere in the tree.
    pub required_capabilities: Vec<String>,
    /// Keyword table for capability inference.
    pub capabilities: CapabilityTable,
    /// Capability to URL prefix table.
    pub routes: RouteTable,
}

impl ScanConfig {
    /// Built-in defaults for `root`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded defaults fail to parse.
    pub fn defaults(root: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self {
            root: root.into(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            ignore: Vec::new(),
            max_file_size: 0,
            workers: default_workers(),
            capability_threshold: 0,
            launcher_threshold: 0,
            required_capabilities: Vec::new(),
            capabilities: CapabilityTable::default(),
            routes: RouteTable::default(),
        };
        config.apply(ConfigLayer::from_yaml(DEFAULTS_YAML, "built-in defaults")?);
        Ok(config)
    }

    /// Resolves the full layering for a scan of `root`.
    ///
    /// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
    /// in production.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] for a malformed `cartograph.yaml`
    /// or a non-numeric `SCAN_MAX_WORKERS`.
    pub fn load(
        root: &Path,
        fs: &dyn FileSystem,
        env: impl Fn(&str) -> Option<String>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut config = Self::defaults(root)?;

        let file = root.join(CONFIG_FILE_NAME);
        if fs.exists(&file) {
            let source = fs.read_to_string(&file).map_err(|e| CartographError::io(&file, e))?;
            debug!(path = %file.display(), "loading project configuration");
            config.apply(ConfigLayer::from_yaml(&source, CONFIG_FILE_NAME)?);
        }

        config.apply_env(env)?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Overlays a YAML layer.
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(ignore) = layer.ignore {
            self.ignore = ignore;
        }
        if let Some(size) = layer.max_file_size {
            self.max_file_size = size;
        }
        if let Some(workers) = layer.max_workers {
            self.workers = clamp_workers(workers);
        }
        if let Some(t) = layer.capability_threshold {
            self.capability_threshold = t;
        }
        if let Some(t) = layer.launcher_threshold {
            self.launcher_threshold = t;
        }
        if let Some(required) = layer.required_capabilities {
            self.required_capabilities = required;
        }
        if let Some(table) = layer.capabilities {
            self.capabilities = CapabilityTable::new(table);
        }
        if let Some(routes) = layer.routes {
            self.routes = RouteTable::new(routes);
        }
    }

    /// Applies `SCAN_REQUIRED_CAPABILITIES` and `SCAN_MAX_WORKERS`.
    ///
    /// # Errors
    ///
    /// Returns [`CartographError::Config`] if the worker count is not a number.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = env(ENV_REQUIRED_CAPABILITIES) {
            self.required_capabilities = split_list(&raw);
        }
        if let Some(raw) = env(ENV_MAX_WORKERS) {
            let workers: usize = raw.trim().parse().map_err(|_| {
                CartographError::Config(format!("{ENV_MAX_WORKERS} must be a number, got '{raw}'"))
            })?;
            self.workers = clamp_workers(workers);
        }
        Ok(())
    }

    /// Applies command-line flags, the highest-precedence layer.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.ignore.extend(overrides.ignore.iter().filter(|g| !g.is_empty()).cloned());
        if let Some(size) = overrides.max_file_size {
            self.max_file_size = size;
        }
        if let Some(workers) = overrides.workers {
            self.workers = clamp_workers(workers);
        }
        if let Some(out) = &overrides.out_dir {
            self.out_dir.clone_from(out);
        }
    }
}

/// Core count, clamped to `1..=MAX_WORKERS`.
#[must_use]
pub fn default_workers() -> usize {
    clamp_workers(num_cpus::get())
}

fn clamp_workers(n: usize) -> usize {
    n.clamp(1, MAX_WORKERS)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_parse() {
        let config = ScanConfig::defaults("/src").unwrap();
        assert_eq!(config.max_file_size, 1_048_576);
        assert_eq!(config.capability_threshold, 2);
        assert_eq!(config.launcher_threshold, 3);
        assert_eq!(config.required_capabilities, vec!["monitoring", "authentication"]);
        assert!(config.capabilities.capabilities().any(|c| c == "service"));
        assert!(config.workers >= 1 && config.workers <= MAX_WORKERS);
        assert_eq!(config.out_dir, PathBuf::from(DEFAULT_OUT_DIR));
    }

    #[test]
    fn project_file_overrides_defaults() {
        let fs = MemoryFileSystem::with_files([(
            "/src/cartograph.yaml",
            "launcherThreshold: 5\nrequiredCapabilities: [persistence]\n",
        )]);
        let overrides = Overrides::default();
        let config = ScanConfig::load(Path::new("/src"), &fs, no_env, &overrides).unwrap();
        assert_eq!(config.launcher_threshold, 5);
        assert_eq!(config.required_capabilities, vec!["persistence"]);
        assert_eq!(config.capability_threshold, 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let fs = MemoryFileSystem::with_files([("/src/cartograph.yaml", "launcherTreshold: 5\n")]);
        let err = ScanConfig::load(Path::new("/src"), &fs, no_env, &Overrides::default())
            .unwrap_err();
        assert!(matches!(err, CartographError::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let fs = MemoryFileSystem::with_files([(
            "/src/cartograph.yaml",
            "requiredCapabilities: [persistence]\nmaxWorkers: 3\n",
        )]);
        let env = |key: &str| match key {
            ENV_REQUIRED_CAPABILITIES => Some(" billing , ,audit ".to_string()),
            ENV_MAX_WORKERS => Some("7".to_string()),
            _ => None,
        };
        let config = ScanConfig::load(Path::new("/src"), &fs, env, &Overrides::default()).unwrap();
        assert_eq!(config.required_capabilities, vec!["billing", "audit"]);
        assert_eq!(config.workers, 7);
    }

    #[test]
    fn bad_worker_count_is_a_config_error() {
        let mut config = ScanConfig::defaults("/src").unwrap();
        let err = config
            .apply_env(|k| (k == ENV_MAX_WORKERS).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_WORKERS));
    }

    #[test]
    fn flags_win_and_workers_are_clamped() {
        let mut config = ScanConfig::defaults("/src").unwrap();
        config.apply_overrides(&Overrides {
            ignore: vec!["*.min.js".into(), String::new()],
            max_file_size: Some(10),
            workers: Some(10_000),
            out_dir: Some(PathBuf::from("/tmp/out")),
        });
        assert_eq!(config.ignore, vec!["*.min.js"]);
        assert_eq!(config.max_file_size, 10);
        assert_eq!(config.workers, MAX_WORKERS);
        assert_eq!(config.out_dir, PathBuf::from("/tmp/out"));

        config.apply_overrides(&Overrides {
            workers: Some(0),
            ..Overrides::default()
        });
        assert_eq!(config.workers, 1);
    }
}
