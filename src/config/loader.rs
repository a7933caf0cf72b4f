//! Configuration lookup, loading and overrides

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::value_objects::NodeSpec;
use crate::error::ConfigError;

use super::types::Config;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "mirrorfleet.toml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{}'?)", suggestion)?;
        }
        Ok(())
    }
}

/// A configuration ready for use, plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    pub warnings: Vec<ConfigWarning>,
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let mut config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    config.ssh.identity_file = config.ssh.identity_file.map(|p| expand_home(&p));
    for node in &mut config.nodes {
        node.identity_file = node.identity_file.take().map(|p| expand_home(&p));
    }

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Places a configuration is looked for, in order, when none is given.
pub fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("mirrorfleet").join("config.toml"));
    }
    locations
}

/// Find, load, override from the environment, and validate.
///
/// An explicit path must exist; otherwise the first of `default_locations`
/// that exists wins.
pub fn resolve(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let tried = default_locations();
            match tried.iter().find(|p| p.is_file()) {
                Some(found) => found.clone(),
                None => return Err(ConfigError::NotFound { tried }),
            }
        }
    };

    debug!(path = %path.display(), "loading configuration");
    let (config, warnings) = load_with_warnings(&path)?;
    let config = with_env_overrides(config)?;
    config.validate()?;

    Ok(LoadedConfig {
        config,
        path,
        warnings,
    })
}

/// Apply environment variable overrides (MIRRORFLEET_* prefix).
pub fn with_env_overrides(config: Config) -> Result<Config, ConfigError> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from any variable source.
pub fn apply_overrides(
    mut config: Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    // MIRRORFLEET_LOCAL_ROOT
    if let Some(root) = var("MIRRORFLEET_LOCAL_ROOT") {
        config.local_root = PathBuf::from(root);
    }

    // MIRRORFLEET_LOCAL_ARCHIVE
    if let Some(archive) = var("MIRRORFLEET_LOCAL_ARCHIVE") {
        config.local_archive = PathBuf::from(archive);
    }

    // MIRRORFLEET_CONNECT_ATTEMPTS
    if let Some(attempts) = var("MIRRORFLEET_CONNECT_ATTEMPTS") {
        match attempts.trim().parse::<u32>() {
            Ok(n) if n > 0 => config.ssh.connect_attempts = n,
            _ => warn!(value = %attempts, "ignoring invalid MIRRORFLEET_CONNECT_ATTEMPTS"),
        }
    }

    // MIRRORFLEET_CONNECT_TIMEOUT_SECS
    if let Some(timeout) = var("MIRRORFLEET_CONNECT_TIMEOUT_SECS") {
        match timeout.trim().parse::<u64>() {
            Ok(secs) => config.ssh.connect_timeout_secs = secs,
            Err(_) => warn!(value = %timeout, "ignoring invalid MIRRORFLEET_CONNECT_TIMEOUT_SECS"),
        }
    }

    // MIRRORFLEET_NODES (comma-separated node specs, appended)
    if let Some(nodes) = var("MIRRORFLEET_NODES") {
        for spec in nodes.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let parsed: NodeSpec = spec.parse().map_err(|source| ConfigError::NodeSpec {
                spec: spec.to_string(),
                source,
            })?;
            config.nodes.push(parsed.into());
        }
    }

    Ok(config)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "local_root",
        "local_archive",
        "ssh",
        "connect_attempts",
        "connect_timeout_secs",
        "retry_delay_ms",
        "strict_host_key_checking",
        "identity_file",
        "nodes",
        "user",
        "host",
        "port",
        "remote_root",
    ];

    CANDIDATES
        .iter()
        .map(|candidate| (*candidate, levenshtein(unknown, candidate)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 2)
        .map(|(candidate, _)| candidate.to_string())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ac) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, bc) in b.iter().enumerate() {
            let cost = usize::from(ac != *bc);
            curr.push((prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost));
        }
        prev = curr;
    }

    prev[b.len()]
}
