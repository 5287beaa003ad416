//! The persisted store: every record kind in one JSON document.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::actor::{ActorImages, Characters};
use crate::email::{Emails, PlayerEmail, Tokens};
use crate::player::password;
use crate::player::permission::PermissionStore;
use crate::player::Players;
use crate::request::Requests;
use crate::room::Rooms;
use crate::Error;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Db {
    #[serde(skip)]
    path: PathBuf,

    #[serde(default)]
    pub players: Players,
    #[serde(default)]
    pub permissions: PermissionStore,
    #[serde(default)]
    pub emails: Emails,
    #[serde(default)]
    pub rooms: Rooms,
    #[serde(default)]
    pub images: ActorImages,
    #[serde(default)]
    pub characters: Characters,
    #[serde(default)]
    pub requests: Requests,
    #[serde(default)]
    pub tokens: Tokens,
}

impl Db {
    /// Reads the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let raw = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?path, "no store yet, starting empty");
                return Ok(Self {
                    path,
                    ..Self::default()
                });
            }
            Err(e) => return Err(e).with_context(|| format!("read store {path:?}")),
        };
        let mut db: Db =
            serde_json::from_str(&raw).with_context(|| format!("parse store {path:?}"))?;
        db.path = path;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `<path>.json.tmp` and renames it over the store.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store dir {parent:?}"))?;
        }
        let s = serde_json::to_string_pretty(self)? + "\n";
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, s).with_context(|| format!("write {tmp:?}"))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {tmp:?} -> {:?}", self.path))?;
        debug!(path = ?self.path, "store saved");
        Ok(())
    }

    /// Redeems a verification token and marks its email verified.
    pub fn verify_email(&mut self, token: &str, now: u64) -> crate::Result<PlayerEmail> {
        let id = self
            .tokens
            .redeem_verification(token, now)
            .ok_or(Error::NotFound("token"))?;
        self.emails.mark_verified(id)
    }

    /// The player a verified address belongs to, for recovery flows.
    pub fn player_for_verified_address(&self, address: &str) -> Option<i64> {
        self.emails.get_verified_by_address(address).map(|e| e.pid)
    }

    /// Sets a new password through a recovery token. The password is
    /// checked before the token is spent.
    pub fn reset_password(&mut self, token: &str, new: &str, now: u64) -> anyhow::Result<i64> {
        if !password::is_valid(new) {
            return Err(Error::InvalidInput.into());
        }
        let pid = self
            .tokens
            .redeem_password_recovery(token, now)
            .ok_or(Error::NotFound("token"))?;
        self.players.set_password(pid, new)?;
        info!(pid, "password reset through recovery");
        Ok(pid)
    }
}
