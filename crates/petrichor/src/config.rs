//! Runtime settings read from `PETRICHOR_*` environment variables.

use std::path::PathBuf;

use anyhow::Context;

use crate::email::{EmailConfig, SmtpAuth};
use crate::room::graph::DEFAULT_GRAPH_DEPTH;

pub const DEFAULT_DATA_PATH: &str = "locks/petrichor.json";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8008";
pub const DEFAULT_GRID_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    /// Origin used when building links in outgoing mail.
    pub base_url: String,
    pub graph_depth: u32,
    pub grid_size: usize,
    pub email: EmailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: DEFAULT_DATA_PATH.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            graph_depth: DEFAULT_GRAPH_DEPTH,
            grid_size: DEFAULT_GRID_SIZE,
            email: EmailConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |k: &str| get(k).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = var("PETRICHOR_DATA_PATH") {
            cfg.data_path = v.into();
        }
        if let Some(v) = var("PETRICHOR_BASE_URL") {
            cfg.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = var("PETRICHOR_GRAPH_DEPTH") {
            cfg.graph_depth = v.trim().parse().context("parse PETRICHOR_GRAPH_DEPTH")?;
        }
        if let Some(v) = var("PETRICHOR_GRID_SIZE") {
            cfg.grid_size = v.trim().parse().context("parse PETRICHOR_GRID_SIZE")?;
            if cfg.grid_size == 0 || cfg.grid_size % 2 == 0 {
                anyhow::bail!("PETRICHOR_GRID_SIZE must be odd and positive, got {}", cfg.grid_size);
            }
        }

        if let Some(v) = var("PETRICHOR_EMAIL_MODE") {
            cfg.email.mode = v.parse().context("parse PETRICHOR_EMAIL_MODE")?;
        }
        if let Some(v) = var("PETRICHOR_EMAIL_FROM") {
            cfg.email.from = v.trim().to_string();
        }
        cfg.email.smtp_host = var("PETRICHOR_SMTP_HOST");
        if let Some(v) = var("PETRICHOR_SMTP_PORT") {
            cfg.email.smtp_port = v.trim().parse().context("parse PETRICHOR_SMTP_PORT")?;
        }
        // Credentials are only used when a username is given.
        cfg.email.smtp_auth = var("PETRICHOR_SMTP_USERNAME").map(|username| SmtpAuth {
            username,
            password: var("PETRICHOR_SMTP_PASSWORD").unwrap_or_default(),
        });
        if let Some(v) = var("PETRICHOR_EMAIL_FILE_DIR") {
            cfg.email.outbox = v.into();
        }
        Ok(cfg)
    }
}
