//! Reviewer change requests against single fields.
//!
//! A change request is open while its review round is running. Finishing
//! the review locks it; the owner's resubmission marks it old.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{can_review, definition_for, FieldStatus, RequestStatus, Requests};
use crate::player::permission::Permissions;
use crate::sanitize::{RegexSanitizer, StringSanitizer};
use crate::validate::{StringValidator, ValidatorGroup};
use crate::{Error, Result};

pub const MIN_CHANGE_REQUEST_TEXT_LEN: usize = 10;
pub const MAX_CHANGE_REQUEST_TEXT_LEN: usize = 1000;

/// Characters review text may not contain. Shared with comments.
pub(crate) static REVIEW_TEXT_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^a-zA-Z, "'\-\.?!()\r\n]+"#).expect("review text regex"));

pub fn is_text_valid(text: &str) -> bool {
    ValidatorGroup::length_and_charset(
        MIN_CHANGE_REQUEST_TEXT_LEN,
        MAX_CHANGE_REQUEST_TEXT_LEN,
        &REVIEW_TEXT_DISALLOWED,
    )
    .is_valid(text)
}

pub fn sanitize_text(text: &str) -> String {
    RegexSanitizer(REVIEW_TEXT_DISALLOWED.clone()).sanitize(text)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: i64,
    pub rid: i64,
    pub field: String,
    /// The field's value when the change was asked for.
    pub value: String,
    pub text: String,
    /// Author.
    pub pid: i64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub old: bool,
    #[serde(default)]
    pub created_unix: u64,
}

impl ChangeRequest {
    pub fn is_open(&self) -> bool {
        !self.locked && !self.old
    }
}

impl Requests {
    pub fn change(&self, id: i64) -> Option<&ChangeRequest> {
        self.changes.get(&id)
    }

    pub fn changes_for(&self, rid: i64) -> Vec<&ChangeRequest> {
        self.changes.values().filter(|c| c.rid == rid).collect()
    }

    /// The change request from the running or latest review round.
    pub fn current_change_for(&self, rid: i64, field: &str) -> Option<&ChangeRequest> {
        self.changes
            .values()
            .find(|c| c.rid == rid && c.field == field && !c.old)
    }

    fn open_change_for(&self, rid: i64, field: &str) -> Option<&ChangeRequest> {
        self.changes
            .values()
            .find(|c| c.rid == rid && c.field == field && c.is_open())
    }

    /// Checks shared by every change request edit: `pid` is reviewing
    /// `rid` right now and `field` belongs to its player.
    fn check_change_access(&self, pid: i64, perms: &Permissions, rid: i64, field: &str) -> Result<()> {
        if !can_review(perms) {
            return Err(Error::Forbidden);
        }
        let req = self.require(rid)?;
        let group = definition_for(&req.kind)?;
        if !group.get(field).is_some_and(|fd| fd.for_player()) {
            return Err(Error::InvalidType);
        }
        if pid == req.pid || req.status != RequestStatus::InReview || pid != req.rpid {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    pub(super) fn lock_changes(&mut self, rid: i64) {
        for c in self.changes.values_mut().filter(|c| c.rid == rid && c.is_open()) {
            c.locked = true;
        }
    }

    pub(super) fn retire_changes(&mut self, rid: i64) {
        for c in self.changes.values_mut().filter(|c| c.rid == rid && c.locked) {
            c.old = true;
        }
    }

    /// Asks the owner to change one field. The field is marked Reviewed.
    pub fn create_change_request(
        &mut self,
        pid: i64,
        perms: &Permissions,
        rid: i64,
        field: &str,
        text: &str,
        now: u64,
    ) -> Result<ChangeRequest> {
        self.check_change_access(pid, perms, rid, field)?;
        let text = sanitize_text(text);
        if !is_text_valid(&text) {
            return Err(Error::InvalidInput);
        }
        if self.open_change_for(rid, field).is_some() {
            return Err(Error::Conflict);
        }

        let value = self
            .require(rid)?
            .field(field)
            .map(|f| f.value.clone())
            .unwrap_or_default();
        self.last_change_id += 1;
        let c = ChangeRequest {
            id: self.last_change_id,
            rid,
            field: field.to_string(),
            value,
            text,
            pid,
            locked: false,
            old: false,
            created_unix: now,
        };
        self.changes.insert(c.id, c.clone());
        self.set_field_status(rid, field, FieldStatus::Reviewed)?;
        info!(id = c.id, rid, pid, field, "change request created");
        Ok(c)
    }

    pub fn edit_change_request(
        &mut self,
        pid: i64,
        perms: &Permissions,
        id: i64,
        text: &str,
    ) -> Result<ChangeRequest> {
        let c = self.change(id).ok_or(Error::NotFound("change request"))?;
        if c.pid != pid || !c.is_open() {
            return Err(Error::Forbidden);
        }
        let (rid, field) = (c.rid, c.field.clone());
        self.check_change_access(pid, perms, rid, &field)?;
        let text = sanitize_text(text);
        if !is_text_valid(&text) {
            return Err(Error::InvalidInput);
        }

        let c = self
            .changes
            .get_mut(&id)
            .ok_or(Error::NotFound("change request"))?;
        c.text = text;
        info!(id, rid, pid, "change request edited");
        Ok(c.clone())
    }

    /// Withdraws an open change request. A Reviewed field goes back to
    /// Approved.
    pub fn delete_change_request(&mut self, pid: i64, perms: &Permissions, id: i64) -> Result<()> {
        let c = self.change(id).ok_or(Error::NotFound("change request"))?;
        if c.pid != pid || !c.is_open() {
            return Err(Error::Forbidden);
        }
        let (rid, field) = (c.rid, c.field.clone());
        self.check_change_access(pid, perms, rid, &field)?;

        self.changes.remove(&id);
        let reviewed = self
            .require(rid)?
            .field(&field)
            .is_some_and(|f| f.status == FieldStatus::Reviewed);
        if reviewed {
            self.set_field_status(rid, &field, FieldStatus::Approved)?;
        }
        info!(id, rid, pid, "change request deleted");
        Ok(())
    }
}
