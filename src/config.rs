//! Process configuration. Server settings come from the command line, then
//! `TRACKPAD_MATH_*` environment variables, then defaults. The client side
//! gets one [`ClientConfig`] built up front and handed to every component.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_NEIGHBORS: usize = 3;
const APP_DIR_NAME: &str = "trackpad-math";
const DB_FILE_NAME: &str = "app.db";

/// Command-line flags for the recognition server.
#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "trackpad-math",
    version = env!("CARGO_PKG_VERSION"),
    about = "Trackpad math symbol recognition server",
    long_about = None
)]
pub struct Args {
    /// Address to bind (env: TRACKPAD_MATH_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind, 0 picks a free one (env: TRACKPAD_MATH_PORT)
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Directory holding app.db (env: TRACKPAD_MATH_DATA_DIR)
    #[arg(long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Neighbours consulted per classification (env: TRACKPAD_MATH_NEIGHBORS)
    #[arg(long)]
    pub neighbors: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub neighbors: usize,
}

impl AppConfig {
    pub fn from_env(args: Args) -> Result<Self> {
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Resolution with an injectable environment, so tests never touch the
    /// real process environment.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = args
            .host
            .or_else(|| lookup("TRACKPAD_MATH_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match args.port {
            Some(port) => port,
            None => match lookup("TRACKPAD_MATH_PORT") {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("invalid TRACKPAD_MATH_PORT '{raw}'"))?,
                None => DEFAULT_PORT,
            },
        };

        let neighbors = match args.neighbors {
            Some(k) => k,
            None => match lookup("TRACKPAD_MATH_NEIGHBORS") {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("invalid TRACKPAD_MATH_NEIGHBORS '{raw}'"))?,
                None => DEFAULT_NEIGHBORS,
            },
        };
        anyhow::ensure!(neighbors > 0, "neighbors must be at least 1");

        let data_dir = match args
            .data_dir
            .or_else(|| lookup("TRACKPAD_MATH_DATA_DIR").map(PathBuf::from))
        {
            Some(dir) => dir,
            None => default_data_dir()?,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            neighbors,
        })
    }

    /// Config rooted at `data_dir`, bound to an ephemeral localhost port.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 0,
            data_dir: data_dir.into(),
            neighbors: DEFAULT_NEIGHBORS,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no platform data directory available")?;
    Ok(base.join(APP_DIR_NAME))
}

/// Everything the recording client needs, built once.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `http://host:port` of the recognition server, no trailing slash.
    pub base_url: String,
    /// Absolute screen position the pointer is recentered to.
    pub anchor: (f64, f64),
    pub ack_timeout: Duration,
    pub max_recenter_attempts: u32,
    pub jitter_threshold_px: f64,
    pub click_symbol: String,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    /// Upper bound on any single HTTP call, settings fetch included.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            anchor: (640.0, 400.0),
            ack_timeout: Duration::from_millis(1500),
            max_recenter_attempts: 3,
            jitter_threshold_px: 5.0,
            click_symbol: ".".to_string(),
            backoff_initial: Duration::from_millis(250),
            backoff_max: Duration::from_secs(5),
            request_timeout: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Websocket URL for `path`; `http` becomes `ws`, `https` becomes `wss`.
    pub fn ws_url(&self, path: &str) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn flags_beat_environment() {
        let args = Args {
            port: Some(9100),
            data_dir: Some(PathBuf::from("/tmp/flags")),
            ..Args::default()
        };
        let config = AppConfig::resolve(
            args,
            env_of(&[
                ("TRACKPAD_MATH_PORT", "9200"),
                ("TRACKPAD_MATH_HOST", "0.0.0.0"),
                ("TRACKPAD_MATH_DATA_DIR", "/tmp/env"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/flags"));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/flags/app.db"));
        assert_eq!(config.neighbors, DEFAULT_NEIGHBORS);
    }

    #[test]
    fn bad_environment_values_are_errors() {
        let args = Args {
            data_dir: Some(PathBuf::from("/tmp/x")),
            ..Args::default()
        };
        assert!(AppConfig::resolve(args.clone(), env_of(&[("TRACKPAD_MATH_PORT", "http")])).is_err());
        assert!(AppConfig::resolve(args, env_of(&[("TRACKPAD_MATH_NEIGHBORS", "0")])).is_err());
    }

    #[test]
    fn client_urls() {
        let config = ClientConfig::new("http://127.0.0.1:8000/");
        assert_eq!(config.api_url("/api/teach"), "http://127.0.0.1:8000/api/teach");
        assert_eq!(config.ws_url("ws/record"), "ws://127.0.0.1:8000/ws/record");
        assert_eq!(
            ClientConfig::new("https://example.test").ws_url("/ws/record"),
            "wss://example.test/ws/record"
        );
    }
}
