//! petrichor
//!
//! Domain core for the PetrichorMUD website: player accounts, email
//! verification and recovery, permissions, the room map editor and the
//! character application review workflow.
//!
//! Everything lives in memory and is persisted through [`db::Db`] as a single
//! JSON document written atomically.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;

pub mod actor;
pub mod cache;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod player;
pub mod request;
pub mod room;
pub mod sanitize;
pub mod validate;

pub use error::{Error, Result};

pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Random URL-safe token, `nbytes` of entropy.
pub fn random_b64url(nbytes: usize) -> anyhow::Result<String> {
    let mut b = vec![0u8; nbytes];
    getrandom::getrandom(&mut b).map_err(|e| anyhow::anyhow!("getrandom: {e:?}"))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b))
}
