//! player
//!
//! Accounts, credentials and the permissions granted to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

pub mod password;
pub mod permission;
pub mod username;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub username: String,
    pub pw_hash: String,
    #[serde(default)]
    pub created_unix: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Players {
    #[serde(default)]
    players: BTreeMap<i64, Player>,
    #[serde(default)]
    last_id: i64,
}

impl Players {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new account. The username is sanitized before checks, so
    /// `"Test"` and `"test"` collide.
    pub fn create(&mut self, username: &str, pw: &str, now: u64) -> anyhow::Result<Player> {
        let u = username::sanitize(username);
        if !username::is_valid(&u) || !password::is_valid(pw) {
            return Err(Error::InvalidInput.into());
        }
        if self.get_by_username(&u).is_some() {
            return Err(Error::Conflict.into());
        }
        let pw_hash = password::hash(pw)?;

        self.last_id += 1;
        let p = Player {
            id: self.last_id,
            username: u,
            pw_hash,
            created_unix: now,
        };
        self.players.insert(p.id, p.clone());
        info!(pid = p.id, username = %p.username, "player created");
        Ok(p)
    }

    pub fn get(&self, pid: i64) -> Option<&Player> {
        self.players.get(&pid)
    }

    pub fn get_by_username(&self, u: &str) -> Option<&Player> {
        let u = username::sanitize(u);
        self.players.values().find(|p| p.username == u)
    }

    pub fn require(&self, pid: i64) -> Result<&Player> {
        self.get(pid).ok_or(Error::NotFound("player"))
    }

    pub fn login(&self, u: &str, pw: &str) -> Result<&Player> {
        let p = self.get_by_username(u).ok_or(Error::InvalidCredentials)?;
        if !password::verify(pw, &p.pw_hash) {
            return Err(Error::InvalidCredentials);
        }
        Ok(p)
    }

    pub fn change_password(&mut self, pid: i64, current: &str, new: &str) -> anyhow::Result<()> {
        let p = self.require(pid)?;
        if !password::verify(current, &p.pw_hash) {
            return Err(Error::InvalidCredentials.into());
        }
        self.set_password(pid, new)
    }

    /// Replaces the password without checking the old one. Used by recovery
    /// after a token has been redeemed.
    pub fn set_password(&mut self, pid: i64, new: &str) -> anyhow::Result<()> {
        if !password::is_valid(new) {
            return Err(Error::InvalidInput.into());
        }
        let pw_hash = password::hash(new)?;
        let p = self.players.get_mut(&pid).ok_or(Error::NotFound("player"))?;
        p.pw_hash = pw_hash;
        info!(pid, "password changed");
        Ok(())
    }

    /// Players whose username starts with `prefix`, ordered by username.
    pub fn search(&self, prefix: &str) -> Vec<&Player> {
        let prefix = username::sanitize(prefix);
        let mut out: Vec<&Player> = self
            .players
            .values()
            .filter(|p| p.username.starts_with(&prefix))
            .collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err_of(e: anyhow::Error) -> Error {
        e.downcast::<Error>().unwrap()
    }

    #[test]
    fn create_and_login() {
        let mut players = Players::new();
        let p = players.create("Testing", "T3sted_tested", 1).unwrap();
        assert_eq!(p.username, "testing");
        assert_ne!(p.pw_hash, "T3sted_tested");

        assert_eq!(players.login("TESTING", "T3sted_tested").unwrap().id, p.id);
        assert_eq!(
            players.login("testing", "wrong-password").unwrap_err(),
            Error::InvalidCredentials
        );
        assert_eq!(
            players.login("nobody", "T3sted_tested").unwrap_err(),
            Error::InvalidCredentials
        );
    }

    #[test]
    fn create_rejects_bad_and_duplicate() {
        let mut players = Players::new();
        players.create("testing", "T3sted_tested", 1).unwrap();
        assert_eq!(
            err_of(players.create("Testing", "T3sted_tested", 2).unwrap_err()),
            Error::Conflict
        );
        assert_eq!(
            err_of(players.create("abc", "T3sted_tested", 2).unwrap_err()),
            Error::InvalidInput
        );
        assert_eq!(
            err_of(players.create("another", "short", 2).unwrap_err()),
            Error::InvalidInput
        );
    }

    #[test]
    fn change_password_checks_current() {
        let mut players = Players::new();
        let pid = players.create("testing", "T3sted_tested", 1).unwrap().id;
        assert_eq!(
            err_of(players.change_password(pid, "nope-nope", "N3w_password").unwrap_err()),
            Error::InvalidCredentials
        );
        players
            .change_password(pid, "T3sted_tested", "N3w_password")
            .unwrap();
        assert!(players.login("testing", "N3w_password").is_ok());
    }

    #[test]
    fn search_by_prefix() {
        let mut players = Players::new();
        players.create("testzed", "T3sted_tested", 1).unwrap();
        players.create("testabc", "T3sted_tested", 1).unwrap();
        players.create("other", "T3sted_tested", 1).unwrap();
        let names: Vec<&str> = players
            .search("Test")
            .iter()
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(names, vec!["testabc", "testzed"]);
    }
}
