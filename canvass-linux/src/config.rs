//! Load config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Daemon configuration. File: ~/.config/canvass/config.toml or
/// /etc/canvass/config.toml. Env overrides: CANVASS_DISCOVERY_PORT,
/// CANVASS_BELL.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Discovery UDP port (default 45688). The questionnaire data port is
    /// fixed; only the presence plane is configurable.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// Ring the terminal bell when a payload arrives (default true).
    #[serde(default = "default_bell")]
    pub bell: bool,
}

fn default_discovery_port() -> u16 {
    45688
}
fn default_bell() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            bell: default_bell(),
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_else(Config::default);
    if let Ok(s) = std::env::var("CANVASS_DISCOVERY_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.discovery_port = p;
        }
    }
    if let Ok(s) = std::env::var("CANVASS_BELL") {
        if let Ok(b) = s.parse::<bool>() {
            c.bell = b;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/canvass/config.toml"));
    }
    out.push(PathBuf::from("/etc/canvass/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.discovery_port, 45688);
        assert!(c.bell);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let c: Config = toml::from_str("bell = false").unwrap();
        assert_eq!(c.discovery_port, 45688);
        assert!(!c.bell);
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(toml::from_str::<Config>("proxy_port = 3128").is_err());
    }
}
