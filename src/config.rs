use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::{
    engine::{pattern::PatternSet, registry::HandlerKind, Engine},
    errors::FlowPatchError,
    handlers::fs_watch::WatchStore,
    protocol::tcp::parser::FlowKey,
};

fn default_table() -> String {
    "FLOWPATCH".to_string()
}

fn default_target_port() -> u16 {
    8000
}

fn default_patterns() -> Vec<String> {
    vec!["HTTP/1.1 200 OK".to_string()]
}

fn default_sweep_interval() -> u64 {
    5
}

/// Top-level daemon configuration, read from a TOML file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub hook: HookConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Registrations armed at startup.
    #[serde(default)]
    pub registration: Vec<RegistrationConfig>,
    /// Snapshots published to the fs-watch handler at startup.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// NFQUEUE number the packets are queued to.
    #[serde(default)]
    pub queue_num: u16,
    /// Local TCP port whose outgoing responses are inspected.
    #[serde(default = "default_target_port")]
    pub target_port: u16,
    /// nftables `inet` table owned by the daemon.
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        HookConfig {
            queue_num: 0,
            target_port: default_target_port(),
            table: default_table(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            patterns: default_patterns(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Registrations older than this are swept. Unset means never.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            max_age_secs: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl RegistryConfig {
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationConfig {
    pub saddr: Ipv4Addr,
    pub daddr: Ipv4Addr,
    pub sport: u16,
    pub dport: u16,
    pub kind: u32,
    pub request: String,
}

impl RegistrationConfig {
    pub fn flow(&self) -> FlowKey {
        FlowKey::new(self.saddr, self.daddr, self.sport, self.dport)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    pub path: String,
    pub content: String,
}

impl Config {
    /// Read `path`, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FlowPatchError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, FlowPatchError> {
        toml::from_str(content).map_err(|e| FlowPatchError::Config(e.to_string()))
    }

    pub fn pattern_set(&self) -> Result<PatternSet, FlowPatchError> {
        let set = PatternSet::from_strings(&self.filter.patterns)?;
        if set.is_empty() {
            return Err(FlowPatchError::Config(
                "filter.patterns must not be empty".to_string(),
            ));
        }
        Ok(set)
    }

    /// Publish configured snapshots and arm configured registrations.
    pub fn apply(&self, engine: &Engine, store: &WatchStore) {
        for watch in &self.watch {
            store.publish(watch.path.as_str(), watch.content.as_bytes());
        }
        for reg in &self.registration {
            engine.register(reg.flow(), HandlerKind(reg.kind), reg.request.as_bytes());
        }
        info!(
            "Applied {} watch snapshot(s) and {} registration(s)",
            self.watch.len(),
            self.registration.len()
        );
    }
}
