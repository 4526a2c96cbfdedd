//! Gateway configuration.
//!
//! Settings are layered: built-in defaults, then the TOML file, then
//! environment variables prefixed with `FIELDLINK_` using `__` between
//! nested keys (`FIELDLINK_SINK__URL`, `FIELDLINK_PROBE__ADDRESS`).
//!
//! ```toml
//! site_id = "site-7"
//!
//! [sockets]
//! heartbeat = "@rethos/4"
//!
//! [sink]
//! url = "https://collector.example.org/ingest"
//!
//! [keys.static]
//! "00ca" = "f1597d0ee9178be2e8c650097db265b3"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use fieldlink_decode::{KeyStore, KeyTable};
use fieldlink_link::{StatsOutput, DEFAULT_MAX_FRAME_LEN};
use fieldlink_types::STATS_FRAME_MIN_LEN;
use serde::Deserialize;

/// Environment variable read as the sink URL when none is configured.
pub const LEGACY_SINK_URL_VAR: &str = "TARGET_URL";

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Site identifier attached to every sensor message.
    pub site_id: String,
    pub sockets: SocketSettings,
    pub sink: SinkSettings,
    pub keys: KeySettings,
    pub indicator: IndicatorSettings,
    pub probe: ProbeSettings,
    pub stats: StatsSettings,
}

/// Local IPC endpoints. A leading `@` names a Linux abstract socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocketSettings {
    pub heartbeat: String,
    pub stats: String,
    pub data: String,
    /// Largest frame accepted from any socket.
    pub max_frame_len: usize,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            heartbeat: "@rethos/4".to_string(),
            stats: "@rethos/0".to_string(),
            data: "@rethos/5".to_string(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Telemetry endpoint. An empty URL disables publishing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl SinkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Device keys: an inline table, optionally overlaid by a key file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    pub file: Option<PathBuf>,
    #[serde(rename = "static")]
    pub inline: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    /// Value file driven with `1`/`0`. Unset logs instead.
    pub path: Option<PathBuf>,
}

/// Internet reachability probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// `host:port` to connect to. Unset reports the WAN as always reachable.
    pub address: Option<String>,
    pub interval_secs: u64,
    pub timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            address: None,
            interval_secs: 10,
            timeout_ms: 3_000,
        }
    }
}

impl ProbeSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    /// `log` or `tcp://host:port`.
    pub output: String,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            output: "log".to_string(),
        }
    }
}

impl StatsSettings {
    /// Parse the configured output.
    pub fn output(&self) -> Result<StatsOutput> {
        match self.output.as_str() {
            "log" => Ok(StatsOutput::Log),
            other => match other.strip_prefix("tcp://") {
                Some(addr) if !addr.is_empty() => Ok(StatsOutput::tcp(addr)),
                _ => bail!(
                    "Invalid stats output: {} (must be \"log\" or tcp://host:port)",
                    other
                ),
            },
        }
    }
}

impl Settings {
    /// Load settings from `path` (optional) and the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("FIELDLINK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        settings.apply_legacy_sink_url(std::env::var(LEGACY_SINK_URL_VAR).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text alone.
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .context("Failed to parse configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Use `url` as the sink URL unless one is already configured.
    pub fn apply_legacy_sink_url(&mut self, url: Option<String>) {
        if self.sink.url.is_empty() {
            if let Some(url) = url.filter(|u| !u.is_empty()) {
                tracing::info!("Using {} from environment", LEGACY_SINK_URL_VAR);
                self.sink.url = url;
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("heartbeat", &self.sockets.heartbeat),
            ("stats", &self.sockets.stats),
            ("data", &self.sockets.data),
        ] {
            if path.is_empty() || path == "@" {
                bail!("Socket path for {} must not be empty", name);
            }
        }

        if self.sockets.max_frame_len < STATS_FRAME_MIN_LEN {
            bail!(
                "sockets.max_frame_len {} is below the stats frame size {}",
                self.sockets.max_frame_len,
                STATS_FRAME_MIN_LEN
            );
        }

        let url = &self.sink.url;
        if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Invalid sink URL: {} (must start with http:// or https://)", url);
        }

        if self.probe.address.is_some() && self.probe.interval_secs == 0 {
            bail!("probe.interval_secs must be greater than 0");
        }

        self.stats.output()?;
        self.inline_keys()?;
        Ok(())
    }

    fn inline_keys(&self) -> Result<KeyTable> {
        KeyTable::from_entries(&self.keys.inline).context("Invalid entry in keys.static")
    }

    /// Build the key store: inline keys overlaid with the key file, if any.
    pub fn key_store(&self) -> Result<KeyStore> {
        let inline = self.inline_keys()?;
        match &self.keys.file {
            Some(path) => KeyStore::with_file(inline, path)
                .with_context(|| format!("Failed to load key file {}", path.display())),
            None => Ok(KeyStore::new(inline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.sockets.heartbeat, "@rethos/4");
        assert_eq!(settings.sockets.stats, "@rethos/0");
        assert_eq!(settings.sockets.data, "@rethos/5");
        assert_eq!(settings.sockets.max_frame_len, 1 << 20);
        assert_eq!(settings.sink.timeout(), Duration::from_secs(10));
        assert_eq!(settings.probe.interval(), Duration::from_secs(10));
        assert!(settings.sink.url.is_empty());
        assert!(matches!(settings.stats.output().unwrap(), StatsOutput::Log));
    }

    #[test]
    fn parses_full_file() {
        let settings = Settings::from_toml(
            r#"
            site_id = "site-7"

            [sockets]
            heartbeat = "/run/mcu/heartbeat.sock"
            max_frame_len = 65536

            [sink]
            url = "https://collector.example.org/ingest"
            timeout_ms = 2500

            [probe]
            address = "1.1.1.1:53"

            [stats]
            output = "tcp://127.0.0.1:9090"

            [keys.static]
            "00ca" = "f1597d0ee9178be2e8c650097db265b3"
            "#,
        )
        .unwrap();

        assert_eq!(settings.site_id, "site-7");
        assert_eq!(settings.sockets.heartbeat, "/run/mcu/heartbeat.sock");
        assert_eq!(settings.sockets.stats, "@rethos/0");
        assert_eq!(settings.sink.timeout(), Duration::from_millis(2500));
        assert_eq!(settings.probe.address.as_deref(), Some("1.1.1.1:53"));
        assert!(matches!(
            settings.stats.output().unwrap(),
            StatsOutput::Tcp(ref addr) if addr == "127.0.0.1:9090"
        ));
        assert!(settings.key_store().unwrap().lookup("00ca").is_some());
    }

    #[test]
    fn example_config_is_valid() {
        let settings =
            Settings::from_toml(include_str!("../config/fieldlink.example.toml")).unwrap();
        assert_eq!(settings.site_id, "site-7");
        assert_eq!(settings.key_store().unwrap().snapshot().len(), 6);
    }

    #[test]
    fn test_config_validation() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.sockets.data = String::new();
        assert!(settings.validate().is_err());
        settings.sockets.data = "@rethos/5".to_string();

        settings.sockets.max_frame_len = STATS_FRAME_MIN_LEN - 1;
        assert!(settings.validate().is_err());
        settings.sockets.max_frame_len = STATS_FRAME_MIN_LEN;
        assert!(settings.validate().is_ok());

        settings.sink.url = "ftp://collector".to_string();
        assert!(settings.validate().is_err());
        settings.sink.url = "http://collector".to_string();
        assert!(settings.validate().is_ok());

        settings.stats.output = "udp://host:1".to_string();
        assert!(settings.validate().is_err());
        settings.stats.output = "tcp://".to_string();
        assert!(settings.validate().is_err());
        settings.stats.output = "log".to_string();

        settings
            .keys
            .inline
            .insert("00CA".to_string(), "f1597d0ee9178be2e8c650097db265b3".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn legacy_url_only_fills_empty_sink() {
        let mut settings = Settings::default();
        settings.apply_legacy_sink_url(Some("http://legacy".to_string()));
        assert_eq!(settings.sink.url, "http://legacy");

        settings.apply_legacy_sink_url(Some("http://other".to_string()));
        assert_eq!(settings.sink.url, "http://legacy");

        let mut settings = Settings::default();
        settings.apply_legacy_sink_url(Some(String::new()));
        assert!(settings.sink.url.is_empty());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.sockets.heartbeat, "@rethos/4");
    }

    #[test]
    fn key_file_overrides_inline_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\"00ca\" = \"00000000000000000000000000000001\"").unwrap();

        let mut settings = Settings::default();
        settings
            .keys
            .inline
            .insert("00ca".to_string(), "f1597d0ee9178be2e8c650097db265b3".to_string());
        settings.keys.file = Some(file.path().to_path_buf());

        let store = settings.key_store().unwrap();
        assert_eq!(store.lookup("00ca").unwrap()[15], 1);
    }

    #[test]
    fn missing_key_file_fails() {
        let mut settings = Settings::default();
        settings.keys.file = Some(PathBuf::from("/nonexistent/keys.toml"));
        assert!(settings.key_store().is_err());
    }
}
