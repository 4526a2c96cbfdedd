//! # fieldlink
//!
//! A field gateway bridging a local sensor-radio MCU to a cloud telemetry
//! sink. It supervises MCU liveness, relays WAN reachability to the MCU,
//! aggregates link statistics, and decrypts, decodes and republishes sensor
//! frames as JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          fieldlink                            │
//! │  config ─▶ gateway ─┬─▶ fieldlink-link   (heartbeat, LED,    │
//! │                     │                     WAN, stats)        │
//! │  indicator, probe ──┤                                        │
//! │                     └─▶ fieldlink-decode (keys, AES, sinks)  │
//! │                                │                              │
//! │                                ▼                              │
//! │                         fieldlink-types (wire layouts)        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: layered settings (file, environment) and validation
//! - **[`gateway`]**: socket connection and stage wiring
//! - **[`indicator`]**: status pin implementations
//! - **[`probe`]**: internet reachability probe
//!
//! ## Usage
//!
//! ```bash
//! # Validate configuration and key table
//! fieldlink --config /etc/fieldlink.toml --check
//!
//! # Run with a telemetry endpoint from the environment
//! FIELDLINK_SINK__URL=https://collector.example.org/ingest fieldlink
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldlink::Settings;
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::from_toml(r#"site_id = "site-7""#).unwrap();
//! let keys = Arc::new(settings.key_store().unwrap());
//! fieldlink::gateway::run(settings, keys).await.unwrap();
//! # });
//! ```

pub mod config;
pub mod gateway;
pub mod indicator;
pub mod probe;

pub use config::Settings;
pub use indicator::{LogPin, SysfsPin};
pub use probe::Probe;
