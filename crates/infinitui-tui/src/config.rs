//! TOML + environment configuration for the panel binary.
//!
//! One daemon, no profiles: a flat `config.toml` under the platform
//! config dir (`~/.config/infinitui/config.toml` on Linux), overridable
//! via `INFINITUI_*` environment variables and the `--url` flag.

use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr, eyre};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use infinitui_core::{PanelConfig, ReconnectConfig};

// ── TOML config structs ──────────────────────────────────────────────

/// On-disk configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct FileConfig {
    /// Daemon base URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// REST request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Stream reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectSection,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout(),
            reconnect: ReconnectSection::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReconnectSection {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,

    /// Give up after this many attempts; absent means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            initial_delay_secs: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            max_retries: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost:8080".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_initial_delay() -> u64 {
    1
}
fn default_max_delay() -> u64 {
    30
}

// ── Config file path ─────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "infinitui", "infinitui").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("infinitui");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading ──────────────────────────────────────────────────────────

/// Load the panel configuration.
///
/// Precedence (low to high): built-in defaults, `config.toml`,
/// `INFINITUI_*` environment variables, the `--url` CLI flag.
pub fn load(cli_url: Option<&str>) -> Result<PanelConfig> {
    let file: FileConfig = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("INFINITUI_"))
        .extract()
        .wrap_err("invalid configuration")?;

    to_panel_config(&file, cli_url)
}

fn to_panel_config(file: &FileConfig, cli_url: Option<&str>) -> Result<PanelConfig> {
    let url_str = cli_url.unwrap_or(&file.url);
    let url = url_str
        .parse()
        .map_err(|e| eyre!("invalid daemon URL '{url_str}': {e}"))?;

    Ok(PanelConfig {
        url,
        timeout: Duration::from_secs(file.timeout_secs),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_secs(file.reconnect.initial_delay_secs),
            max_delay: Duration::from_secs(file.reconnect.max_delay_secs),
            max_retries: file.reconnect.max_retries,
        },
    })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_point_at_localhost() {
        let cfg = to_panel_config(&FileConfig::default(), None).expect("default config");
        assert_eq!(cfg.url.as_str(), "http://localhost:8080/");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert!(cfg.reconnect.max_retries.is_none());
    }

    #[test]
    fn cli_url_overrides_file() {
        let file = FileConfig {
            url: "http://from-file:8080".into(),
            ..FileConfig::default()
        };
        let cfg = to_panel_config(&file, Some("http://from-cli:9090")).expect("config");
        assert_eq!(cfg.url.as_str(), "http://from-cli:9090/");
    }

    #[test]
    fn reconnect_section_maps_to_policy() {
        let file = FileConfig {
            reconnect: ReconnectSection {
                initial_delay_secs: 2,
                max_delay_secs: 60,
                max_retries: Some(5),
            },
            ..FileConfig::default()
        };
        let cfg = to_panel_config(&file, None).expect("config");
        assert_eq!(cfg.reconnect.initial_delay, Duration::from_secs(2));
        assert_eq!(cfg.reconnect.max_delay, Duration::from_secs(60));
        assert_eq!(cfg.reconnect.max_retries, Some(5));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let file = FileConfig {
            url: "not a url".into(),
            ..FileConfig::default()
        };
        assert!(to_panel_config(&file, None).is_err());
    }

    #[test]
    fn toml_round_trips_through_figment() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    url = "http://thermostat.local:8080"
                    timeout_secs = 5

                    [reconnect]
                    max_retries = 3
                "#,
            )?;

            let file: FileConfig = Figment::new()
                .merge(Serialized::defaults(FileConfig::default()))
                .merge(Toml::file("config.toml"))
                .extract()?;

            assert_eq!(file.url, "http://thermostat.local:8080");
            assert_eq!(file.timeout_secs, 5);
            assert_eq!(file.reconnect.max_retries, Some(3));
            // Unset reconnect keys keep their defaults
            assert_eq!(file.reconnect.initial_delay_secs, 1);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("config.toml", r#"url = "http://from-file:8080""#)?;
            jail.set_env("INFINITUI_URL", "http://from-env:8080");

            let file: FileConfig = Figment::new()
                .merge(Serialized::defaults(FileConfig::default()))
                .merge(Toml::file("config.toml"))
                .merge(Env::prefixed("INFINITUI_"))
                .extract()?;

            assert_eq!(file.url, "http://from-env:8080");
            Ok(())
        });
    }
}
