//! Named capabilities granted to players.
//!
//! The catalog is fixed. Grants are stored per player with the id of the
//! issuer, and every grant or revoke is appended to a history log.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub name: &'static str,
    pub title: &'static str,
    pub about: &'static str,
}

pub const GRANT_ALL: Permission = Permission {
    name: "grant-all",
    title: "Grant All Permissions",
    about: "The root permission. Only one person should have this at a time.",
};

pub const REVOKE_ALL: Permission = Permission {
    name: "revoke-all",
    title: "Revoke All Permissions",
    about: "The root revocation permission. Only one person should have this at a time.",
};

pub const REVIEW_CHARACTER_APPLICATIONS: Permission = Permission {
    name: "review-character-applications",
    title: "Review Character Applications",
    about: "Enable this player to review Character Applications.",
};

pub const VIEW_ALL_ROOMS: Permission = Permission {
    name: "view-all-rooms",
    title: "View All Rooms",
    about: "The permission to view (but not edit) all room data.",
};

pub const CREATE_ROOM: Permission = Permission {
    name: "create-room",
    title: "Create Room",
    about: "Create a new room, but not connect it to the grid.",
};

pub const VIEW_ALL_ACTOR_IMAGES: Permission = Permission {
    name: "view-all-actor-images",
    title: "View All Actor Images",
    about: "View all Actor Images, i.e. in the main Actor Images list.",
};

pub const CREATE_ACTOR_IMAGE: Permission = Permission {
    name: "create-actor-image",
    title: "Create Actor Image",
    about: "Create new actor via creating new Actor Images",
};

pub const ALL: [Permission; 7] = [
    GRANT_ALL,
    REVOKE_ALL,
    REVIEW_CHARACTER_APPLICATIONS,
    VIEW_ALL_ROOMS,
    CREATE_ROOM,
    VIEW_ALL_ACTOR_IMAGES,
    CREATE_ACTOR_IMAGE,
];

pub const ROOT: [Permission; 2] = [GRANT_ALL, REVOKE_ALL];

/// Holding any of these unlocks the permission admin views.
pub const SHOW_PERMISSION_VIEW_PERMISSIONS: [&str; 1] = [GRANT_ALL.name];

pub fn is_valid_name(name: &str) -> bool {
    ALL.iter().any(|p| p.name == name)
}

pub fn is_root(name: &str) -> bool {
    ROOT.iter().any(|p| p.name == name)
}

pub fn lookup(name: &str) -> Option<Permission> {
    ALL.into_iter().find(|p| p.name == name)
}

/// A player's effective permission set. Unknown names are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    pub pid: i64,
    list: Vec<String>,
    set: HashSet<String>,
}

impl Permissions {
    pub fn new<I, S>(pid: i64, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Vec::new();
        let mut set = HashSet::new();
        for name in names {
            let name = name.into();
            if !is_valid_name(&name) || set.contains(&name) {
                continue;
            }
            set.insert(name.clone());
            list.push(name);
        }
        Self { pid, list, set }
    }

    pub fn list(&self) -> &[String] {
        &self.list
    }

    pub fn has_permission(&self, name: &str) -> bool {
        self.set.contains(name)
    }

    /// Any one of `set`.
    pub fn has_permission_in_set(&self, set: &[&str]) -> bool {
        set.iter().any(|p| self.set.contains(*p))
    }

    pub fn has_all_permissions_in_set(&self, set: &[&str]) -> bool {
        set.iter().all(|p| self.set.contains(*p))
    }

    /// Root permissions can never be handed out through the toggle.
    pub fn can_grant(&self, name: &str) -> bool {
        is_valid_name(name) && !is_root(name) && self.has_permission(GRANT_ALL.name)
    }

    /// Revoking is gated on `grant-all` as well; `revoke-all` alone is
    /// not enough.
    pub fn can_revoke(&self, name: &str) -> bool {
        is_valid_name(name) && !is_root(name) && self.has_permission(GRANT_ALL.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub name: String,
    /// Issuer.
    pub ipid: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Issued,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeHistory {
    pub pid: i64,
    pub ipid: i64,
    pub name: String,
    pub kind: ChangeKind,
    pub unix: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionStore {
    #[serde(default)]
    grants: BTreeMap<i64, Vec<Grant>>,
    #[serde(default)]
    history: Vec<ChangeHistory>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_player(&self, pid: i64) -> Permissions {
        let names = self
            .grants
            .get(&pid)
            .into_iter()
            .flatten()
            .map(|g| g.name.clone());
        Permissions::new(pid, names)
    }

    pub fn history(&self) -> &[ChangeHistory] {
        &self.history
    }

    fn is_granted(&self, pid: i64, name: &str) -> bool {
        self.grants
            .get(&pid)
            .is_some_and(|gs| gs.iter().any(|g| g.name == name))
    }

    fn issue(&mut self, pid: i64, ipid: i64, name: &str, now: u64) {
        self.history.push(ChangeHistory {
            pid,
            ipid,
            name: name.to_string(),
            kind: ChangeKind::Issued,
            unix: now,
        });
        self.grants.entry(pid).or_default().push(Grant {
            name: name.to_string(),
            ipid,
        });
    }

    fn revoke(&mut self, pid: i64, ipid: i64, name: &str, now: u64) {
        self.history.push(ChangeHistory {
            pid,
            ipid,
            name: name.to_string(),
            kind: ChangeKind::Revoked,
            unix: now,
        });
        if let Some(gs) = self.grants.get_mut(&pid) {
            gs.retain(|g| g.name != name);
        }
    }

    /// Gives `pid` both root permissions, bypassing the toggle checks.
    /// Only for seeding the first administrator.
    pub fn seed_root(&mut self, pid: i64, now: u64) {
        for p in ROOT {
            if !self.is_granted(pid, p.name) {
                self.issue(pid, pid, p.name, now);
            }
        }
        info!(pid, "root permissions seeded");
    }

    /// Grants (`grant == true`) or revokes `name` on `target` as `actor`.
    pub fn toggle_player_permission(
        &mut self,
        actor: &Permissions,
        target: i64,
        name: &str,
        grant: bool,
        now: u64,
    ) -> Result<()> {
        if !actor.has_permission(GRANT_ALL.name) {
            return Err(Error::Forbidden);
        }
        if !is_valid_name(name) {
            return Err(Error::InvalidInput);
        }

        let granted = self.is_granted(target, name);
        if grant {
            if granted {
                return Err(Error::Conflict);
            }
            if !actor.can_grant(name) {
                return Err(Error::Forbidden);
            }
            self.issue(target, actor.pid, name, now);
            info!(target, actor = actor.pid, permission = name, "permission granted");
        } else {
            if !granted {
                return Err(Error::Conflict);
            }
            if !actor.can_revoke(name) {
                return Err(Error::Forbidden);
            }
            self.revoke(target, actor.pid, name, now);
            info!(target, actor = actor.pid, permission = name, "permission revoked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_filters_invalid_names() {
        let p = Permissions::new(1, ["grant-all", "fly", "create-room", "grant-all"]);
        assert_eq!(p.list(), ["grant-all", "create-room"]);
        assert!(p.has_permission("create-room"));
        assert!(!p.has_permission("fly"));
    }

    #[test]
    fn set_queries() {
        let p = Permissions::new(1, ["view-all-rooms", "create-room"]);
        assert!(p.has_permission_in_set(&["grant-all", "create-room"]));
        assert!(!p.has_permission_in_set(&["grant-all"]));
        assert!(p.has_all_permissions_in_set(&["view-all-rooms", "create-room"]));
        assert!(!p.has_all_permissions_in_set(&["view-all-rooms", "grant-all"]));
        assert!(!p.has_permission_in_set(&SHOW_PERMISSION_VIEW_PERMISSIONS));
    }

    #[test]
    fn grant_and_revoke_rules() {
        let root = Permissions::new(1, ["grant-all", "revoke-all"]);
        assert!(root.can_grant("create-room"));
        assert!(!root.can_grant("grant-all"));
        assert!(!root.can_grant("nope"));
        assert!(root.can_revoke("create-room"));
        assert!(!root.can_revoke("revoke-all"));

        let granter = Permissions::new(2, ["grant-all"]);
        assert!(granter.can_grant("view-all-rooms"));
        assert!(granter.can_revoke("view-all-rooms"));

        let revoker = Permissions::new(3, ["revoke-all"]);
        assert!(!revoker.can_revoke("view-all-rooms"));
    }

    #[test]
    fn toggle_flow() {
        let mut store = PermissionStore::new();
        store.seed_root(1, 10);
        let root = store.for_player(1);
        assert!(root.has_all_permissions_in_set(&["grant-all", "revoke-all"]));

        store
            .toggle_player_permission(&root, 2, "create-room", true, 11)
            .unwrap();
        assert!(store.for_player(2).has_permission("create-room"));

        assert_eq!(
            store.toggle_player_permission(&root, 2, "create-room", true, 12),
            Err(Error::Conflict)
        );

        store
            .toggle_player_permission(&root, 2, "create-room", false, 13)
            .unwrap();
        assert!(!store.for_player(2).has_permission("create-room"));
        assert_eq!(
            store.toggle_player_permission(&root, 2, "create-room", false, 14),
            Err(Error::Conflict)
        );

        let kinds: Vec<ChangeKind> = store
            .history()
            .iter()
            .filter(|h| h.pid == 2)
            .map(|h| h.kind)
            .collect();
        assert_eq!(kinds, vec![ChangeKind::Issued, ChangeKind::Revoked]);
    }

    #[test]
    fn toggle_rejections() {
        let mut store = PermissionStore::new();
        let nobody = Permissions::new(3, ["create-room"]);
        assert_eq!(
            store.toggle_player_permission(&nobody, 2, "create-room", true, 1),
            Err(Error::Forbidden)
        );

        let root = Permissions::new(1, ["grant-all", "revoke-all"]);
        assert_eq!(
            store.toggle_player_permission(&root, 2, "fly", true, 1),
            Err(Error::InvalidInput)
        );
        assert_eq!(
            store.toggle_player_permission(&root, 2, "grant-all", true, 1),
            Err(Error::Forbidden)
        );

        let revoker = Permissions::new(4, ["revoke-all"]);
        assert_eq!(
            store.toggle_player_permission(&revoker, 2, "create-room", true, 1),
            Err(Error::Forbidden)
        );
    }

    #[test]
    fn grant_all_holder_can_revoke() {
        let mut store = PermissionStore::new();
        let granter = Permissions::new(1, ["grant-all"]);
        store
            .toggle_player_permission(&granter, 2, "create-room", true, 1)
            .unwrap();
        store
            .toggle_player_permission(&granter, 2, "create-room", false, 2)
            .unwrap();
        assert!(!store.for_player(2).has_permission("create-room"));

        store
            .toggle_player_permission(&granter, 2, "create-room", true, 3)
            .unwrap();
        let revoker = Permissions::new(4, ["revoke-all"]);
        assert_eq!(
            store.toggle_player_permission(&revoker, 2, "create-room", false, 4),
            Err(Error::Forbidden)
        );
    }
}
