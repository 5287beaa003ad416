//! request
//!
//! Player-submitted requests and their review lifecycle. The only request
//! type today is the Character Application:
//!
//! Incomplete -> Ready -> Submitted -> InReview -> Approved | Reviewed
//!
//! A Reviewed application goes back to its owner for changes and is
//! resubmitted. Approved applications are fulfilled into an actor image and
//! archived. Owners may cancel; reviewers may reject a submitted one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::player::permission::{Permissions, REVIEW_CHARACTER_APPLICATIONS};
use crate::{Error, Result};

pub mod change;
pub mod comment;
pub mod definition;
pub mod dialog;
pub mod field;
pub mod fulfill;

pub use change::ChangeRequest;
pub use comment::Comment;
pub use definition::{definition_for, title, TYPE_CHARACTER_APPLICATION};
pub use field::{FieldDef, FieldFor, FieldGroup, FieldMap, NextField, RequestField};

/// Open applications a single player may hold at once.
pub const MAX_OPEN_CHARACTER_APPLICATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Incomplete,
    Ready,
    Submitted,
    InReview,
    Approved,
    Reviewed,
    Rejected,
    Archived,
    Canceled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Incomplete => "Incomplete",
            RequestStatus::Ready => "Ready",
            RequestStatus::Submitted => "Submitted",
            RequestStatus::InReview => "InReview",
            RequestStatus::Approved => "Approved",
            RequestStatus::Reviewed => "Reviewed",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Archived => "Archived",
            RequestStatus::Canceled => "Canceled",
        }
    }

    /// Still counts against the player's open application limit.
    pub fn is_open(self) -> bool {
        !matches!(
            self,
            RequestStatus::Archived | RequestStatus::Canceled | RequestStatus::Rejected
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldStatus {
    NotReviewed,
    Approved,
    Reviewed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub pid: i64,
    /// Reviewer; 0 until someone picks the request up.
    #[serde(default)]
    pub rpid: i64,
    pub status: RequestStatus,
    #[serde(default)]
    pub created_unix: u64,
    #[serde(default)]
    pub fields: FieldMap,
}

impl Request {
    pub fn field(&self, kind: &str) -> Option<&RequestField> {
        self.fields.get(kind)
    }

    pub fn value(&self, kind: &str) -> Option<&str> {
        self.fields.get(kind).map(|f| f.value.as_str())
    }

    pub fn has_reviewer(&self) -> bool {
        self.rpid != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub rid: i64,
    /// Who caused the change.
    pub pid: i64,
    pub status: RequestStatus,
    pub unix: u64,
}

/// Whether the request as a whole is still a draft.
pub fn is_editable(req: &Request) -> bool {
    matches!(req.status, RequestStatus::Incomplete | RequestStatus::Ready)
}

pub fn is_field_editable(pid: i64, req: &Request, fd: &FieldDef) -> bool {
    match fd.for_ {
        FieldFor::Reviewer => req.status == RequestStatus::InReview && pid == req.rpid,
        FieldFor::Player => {
            pid == req.pid
                && matches!(
                    req.status,
                    RequestStatus::Incomplete | RequestStatus::Ready | RequestStatus::Reviewed
                )
        }
    }
}

fn can_review(perms: &Permissions) -> bool {
    perms.has_permission(REVIEW_CHARACTER_APPLICATIONS.name)
}

/// The status `pid` may move `req` to next, if any.
pub fn next_status(pid: i64, perms: &Permissions, req: &Request) -> Result<RequestStatus> {
    let group = definition_for(&req.kind)?;
    let owner = pid == req.pid;
    match req.status {
        RequestStatus::Ready if owner => Ok(RequestStatus::Submitted),
        RequestStatus::Submitted if !owner && can_review(perms) => Ok(RequestStatus::InReview),
        RequestStatus::InReview if !owner && pid == req.rpid => {
            let statuses: Vec<FieldStatus> = group
                .player_fields()
                .map(|fd| {
                    req.field(fd.kind)
                        .map_or(FieldStatus::NotReviewed, |f| f.status)
                })
                .collect();
            let reviewer_ready = group
                .reviewer_fields()
                .all(|fd| req.field(fd.kind).is_some_and(|f| fd.is_field_valid(f)));

            if statuses.iter().all(|s| *s == FieldStatus::Approved) && reviewer_ready {
                Ok(RequestStatus::Approved)
            } else if statuses.iter().all(|s| *s != FieldStatus::NotReviewed)
                && statuses.contains(&FieldStatus::Reviewed)
            {
                Ok(RequestStatus::Reviewed)
            } else {
                Err(Error::NextStatusForbidden)
            }
        }
        RequestStatus::Reviewed if owner => Ok(RequestStatus::Submitted),
        _ => Err(Error::NextStatusForbidden),
    }
}

/// All requests with their fields, status history, change requests and
/// comments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requests {
    #[serde(default)]
    requests: BTreeMap<i64, Request>,
    #[serde(default)]
    last_id: i64,
    #[serde(default)]
    history: Vec<StatusChange>,
    #[serde(default)]
    changes: BTreeMap<i64, ChangeRequest>,
    #[serde(default)]
    last_change_id: i64,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    last_comment_id: i64,
}

impl Requests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rid: i64) -> Option<&Request> {
        self.requests.get(&rid)
    }

    pub fn require(&self, rid: i64) -> Result<&Request> {
        self.get(rid).ok_or(Error::NotFound("request"))
    }

    fn require_mut(&mut self, rid: i64) -> Result<&mut Request> {
        self.requests.get_mut(&rid).ok_or(Error::NotFound("request"))
    }

    pub fn list_for_player(&self, pid: i64) -> Vec<&Request> {
        self.requests.values().filter(|r| r.pid == pid).collect()
    }

    /// The review queue and similar listings.
    pub fn list_by_status(&self, status: RequestStatus) -> Vec<&Request> {
        self.requests
            .values()
            .filter(|r| r.status == status)
            .collect()
    }

    pub fn history(&self, rid: i64) -> Vec<&StatusChange> {
        self.history.iter().filter(|h| h.rid == rid).collect()
    }

    pub fn create_character_application(&mut self, pid: i64, now: u64) -> Result<Request> {
        let open = self
            .requests
            .values()
            .filter(|r| r.pid == pid && r.kind == TYPE_CHARACTER_APPLICATION && r.status.is_open())
            .count();
        if open >= MAX_OPEN_CHARACTER_APPLICATIONS {
            return Err(Error::TooManyOpenApplications);
        }

        let group = definition_for(TYPE_CHARACTER_APPLICATION)?;
        let fields = group
            .list()
            .iter()
            .map(|fd| (fd.kind.to_string(), RequestField::empty(fd.kind)))
            .collect();

        self.last_id += 1;
        let req = Request {
            id: self.last_id,
            kind: TYPE_CHARACTER_APPLICATION.to_string(),
            pid,
            rpid: 0,
            status: RequestStatus::Incomplete,
            created_unix: now,
            fields,
        };
        self.requests.insert(req.id, req.clone());
        self.record_status(req.id, pid, RequestStatus::Incomplete, now);
        info!(rid = req.id, pid, "character application created");
        Ok(req)
    }

    fn record_status(&mut self, rid: i64, pid: i64, status: RequestStatus, unix: u64) {
        self.history.push(StatusChange {
            rid,
            pid,
            status,
            unix,
        });
    }

    fn set_status(&mut self, rid: i64, pid: i64, status: RequestStatus, now: u64) -> Result<()> {
        let req = self.require_mut(rid)?;
        let from = req.status;
        req.status = status;
        self.record_status(rid, pid, status, now);
        info!(rid, pid, %from, to = %status, "request status changed");
        Ok(())
    }

    fn editable_def(
        &self,
        pid: i64,
        rid: i64,
        kind: &str,
    ) -> Result<(&'static FieldGroup, &'static FieldDef)> {
        let req = self.require(rid)?;
        let group = definition_for(&req.kind)?;
        let fd = group.get(kind).ok_or(Error::InvalidType)?;
        if !is_field_editable(pid, req, fd) {
            return Err(Error::Forbidden);
        }
        Ok((group, fd))
    }

    /// Stores a new value for one field and keeps the Incomplete/Ready
    /// status in line with the player fields' validity.
    pub fn update_field(&mut self, pid: i64, rid: i64, kind: &str, value: &str, now: u64) -> Result<()> {
        let (group, fd) = self.editable_def(pid, rid, kind)?;
        let value = definition::sanitize_value(kind, value);
        if fd.subfields.is_some() || !fd.is_valid(&value) {
            return Err(Error::InvalidInput);
        }

        let req = self.require_mut(rid)?;
        let f = req
            .fields
            .entry(kind.to_string())
            .or_insert_with(|| RequestField::empty(kind));
        f.value = value;
        f.status = FieldStatus::NotReviewed;

        self.sync_readiness(group, pid, rid, now)
    }

    /// Replaces the values of a multi-valued field.
    pub fn update_field_subfields(
        &mut self,
        pid: i64,
        rid: i64,
        kind: &str,
        values: &[String],
        now: u64,
    ) -> Result<()> {
        let (group, fd) = self.editable_def(pid, rid, kind)?;
        let Some(cfg) = fd.subfields else {
            return Err(Error::InvalidInput);
        };
        if !fd.for_reviewer() || !fd.are_subfields_valid(cfg, values) {
            return Err(Error::InvalidInput);
        }

        let req = self.require_mut(rid)?;
        let f = req
            .fields
            .entry(kind.to_string())
            .or_insert_with(|| RequestField::empty(kind));
        f.subfields = values.to_vec();
        f.value = values.join(" ");

        self.sync_readiness(group, pid, rid, now)
    }

    fn sync_readiness(&mut self, group: &FieldGroup, pid: i64, rid: i64, now: u64) -> Result<()> {
        let req = self.require(rid)?;
        let ready = group.is_ready(&req.fields);
        let status = req.status;
        match status {
            RequestStatus::Incomplete if ready => {
                self.set_status(rid, pid, RequestStatus::Ready, now)
            }
            RequestStatus::Ready if !ready => {
                self.set_status(rid, pid, RequestStatus::Incomplete, now)
            }
            _ => Ok(()),
        }
    }

    pub fn next_incomplete_field(&self, rid: i64) -> Result<Option<NextField>> {
        let req = self.require(rid)?;
        Ok(definition_for(&req.kind)?.next_incomplete(&req.fields))
    }

    pub fn next_unreviewed_field(&self, rid: i64) -> Result<Option<NextField>> {
        let req = self.require(rid)?;
        Ok(definition_for(&req.kind)?.next_unreviewed(&req.fields))
    }

    /// Moves the request to its next status on behalf of `pid`.
    pub fn advance_status(
        &mut self,
        pid: i64,
        perms: &Permissions,
        rid: i64,
        now: u64,
    ) -> Result<RequestStatus> {
        let req = self.require(rid)?;
        let from = req.status;
        let to = next_status(pid, perms, req)?;

        if to == RequestStatus::InReview {
            self.require_mut(rid)?.rpid = pid;
        }
        match (from, to) {
            (RequestStatus::InReview, RequestStatus::Reviewed) => self.lock_changes(rid),
            (RequestStatus::Reviewed, RequestStatus::Submitted) => self.retire_changes(rid),
            _ => {}
        }
        self.set_status(rid, pid, to, now)?;
        Ok(to)
    }

    /// Records the reviewer's verdict on one player field. A field with a
    /// pending change request is marked Reviewed, otherwise Approved.
    pub fn update_field_status(
        &mut self,
        pid: i64,
        perms: &Permissions,
        rid: i64,
        kind: &str,
    ) -> Result<FieldStatus> {
        if !can_review(perms) {
            return Err(Error::Forbidden);
        }
        let req = self.require(rid)?;
        if req.status != RequestStatus::InReview || pid != req.rpid {
            return Err(Error::Forbidden);
        }
        let group = definition_for(&req.kind)?;
        if !group.get(kind).is_some_and(|fd| fd.for_player()) {
            return Err(Error::InvalidType);
        }

        let status = if self.current_change_for(rid, kind).is_some() {
            FieldStatus::Reviewed
        } else {
            FieldStatus::Approved
        };
        self.set_field_status(rid, kind, status)?;
        info!(rid, pid, field = kind, ?status, "field reviewed");
        Ok(status)
    }

    fn set_field_status(&mut self, rid: i64, kind: &str, status: FieldStatus) -> Result<()> {
        let req = self.require_mut(rid)?;
        let f = req.fields.get_mut(kind).ok_or(Error::MissingField)?;
        f.status = status;
        Ok(())
    }

    /// Owners cancel their own applications; reviewers reject submitted
    /// ones. Nothing is removed from the store.
    pub fn delete_request(
        &mut self,
        pid: i64,
        perms: &Permissions,
        rid: i64,
        now: u64,
    ) -> Result<RequestStatus> {
        let req = self.require(rid)?;
        let to = if pid == req.pid {
            if matches!(req.status, RequestStatus::Archived | RequestStatus::Canceled) {
                return Err(Error::Forbidden);
            }
            RequestStatus::Canceled
        } else {
            if req.status != RequestStatus::Submitted || !can_review(perms) {
                return Err(Error::Forbidden);
            }
            RequestStatus::Rejected
        };
        self.set_status(rid, pid, to, now)?;
        Ok(to)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actor::{DEFAULT_IMAGE_DESCRIPTION, DEFAULT_IMAGE_SHORT_DESCRIPTION};

    pub const OWNER: i64 = 1;
    pub const REVIEWER: i64 = 2;

    pub fn backstory() -> String {
        "This character grew up on the salt flats, far from anyone who cared. ".repeat(9)
    }

    pub fn reviewer_perms() -> Permissions {
        Permissions::new(REVIEWER, [REVIEW_CHARACTER_APPLICATIONS.name])
    }

    /// A ready application owned by `OWNER`.
    pub fn ready_app(reqs: &mut Requests) -> i64 {
        let rid = reqs.create_character_application(OWNER, 1).unwrap().id;
        reqs.update_field(OWNER, rid, "name", "Test", 2).unwrap();
        reqs.update_field(OWNER, rid, "gender", "NonBinary", 2).unwrap();
        reqs.update_field(OWNER, rid, "sdesc", DEFAULT_IMAGE_SHORT_DESCRIPTION, 2)
            .unwrap();
        reqs.update_field(OWNER, rid, "desc", DEFAULT_IMAGE_DESCRIPTION, 2)
            .unwrap();
        reqs.update_field(OWNER, rid, "backstory", &backstory(), 2)
            .unwrap();
        rid
    }

    /// A ready application submitted and picked up by `REVIEWER`.
    pub fn in_review_app(reqs: &mut Requests) -> i64 {
        let rid = ready_app(reqs);
        let owner = Permissions::new(OWNER, Vec::<String>::new());
        reqs.advance_status(OWNER, &owner, rid, 3).unwrap();
        reqs.advance_status(REVIEWER, &reviewer_perms(), rid, 4)
            .unwrap();
        rid
    }

    pub fn approve_all(reqs: &mut Requests, rid: i64) {
        let perms = reviewer_perms();
        for kind in ["name", "gender", "sdesc", "desc", "backstory"] {
            reqs.update_field_status(REVIEWER, &perms, rid, kind).unwrap();
        }
        reqs.update_field_subfields(
            REVIEWER,
            rid,
            "keywords",
            &["test".to_string(), "blob".to_string()],
            5,
        )
        .unwrap();
    }

    #[test]
    fn create_starts_incomplete_with_every_field() {
        let mut reqs = Requests::new();
        let req = reqs.create_character_application(OWNER, 1).unwrap();
        assert_eq!(req.status, RequestStatus::Incomplete);
        assert_eq!(req.kind, "CharacterApplication");
        assert_eq!(req.fields.len(), 6);
        assert!(req.fields.values().all(|f| f.value.is_empty()));
        assert_eq!(reqs.history(req.id).len(), 1);
    }

    #[test]
    fn open_application_limit() {
        let mut reqs = Requests::new();
        let perms = Permissions::new(OWNER, Vec::<String>::new());
        for _ in 0..MAX_OPEN_CHARACTER_APPLICATIONS {
            reqs.create_character_application(OWNER, 1).unwrap();
        }
        assert_eq!(
            reqs.create_character_application(OWNER, 1).unwrap_err(),
            Error::TooManyOpenApplications
        );
        reqs.delete_request(OWNER, &perms, 1, 2).unwrap();
        assert!(reqs.create_character_application(OWNER, 3).is_ok());
        assert!(reqs.create_character_application(OWNER + 1, 3).is_ok());
    }

    #[test]
    fn keyword_subfields_limits_and_access() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let words = |ws: &[&str]| ws.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        let eleven: Vec<String> = "abcdefghijk".chars().map(|c| format!("word{c}")).collect();

        for bad in [
            words(&[]),
            words(&["eyes"]),
            eleven.clone(),
            words(&["eyes", "a1"]),
            words(&["eyes", "x"]),
        ] {
            assert_eq!(
                reqs.update_field_subfields(REVIEWER, rid, "keywords", &bad, 5),
                Err(Error::InvalidInput),
                "{bad:?}"
            );
        }
        assert_eq!(reqs.get(rid).unwrap().value("keywords"), Some(""));

        assert_eq!(
            reqs.update_field_subfields(OWNER, rid, "keywords", &words(&["eyes", "blob"]), 5),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.update_field_subfields(REVIEWER + 7, rid, "keywords", &words(&["eyes", "blob"]), 5),
            Err(Error::Forbidden)
        );
        // Single-valued fields never take subfields.
        assert_eq!(
            reqs.update_field_subfields(REVIEWER, rid, "name", &words(&["eyes", "blob"]), 5),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.update_field(REVIEWER, rid, "keywords", "eyes blob", 5),
            Err(Error::InvalidInput)
        );

        let ten = eleven[..10].to_vec();
        reqs.update_field_subfields(REVIEWER, rid, "keywords", &ten, 5)
            .unwrap();
        let f = reqs.get(rid).unwrap().field("keywords").unwrap();
        assert_eq!(f.subfields.len(), 10);
        assert_eq!(f.value, ten.join(" "));
    }

    #[test]
    fn update_field_tracks_readiness() {
        let mut reqs = Requests::new();
        let rid = ready_app(&mut reqs);
        assert_eq!(reqs.get(rid).unwrap().status, RequestStatus::Ready);

        assert_eq!(
            reqs.update_field(OWNER, rid, "name", "x", 3),
            Err(Error::InvalidInput)
        );
        assert_eq!(
            reqs.update_field(OWNER, rid, "gender", "Object", 3),
            Err(Error::InvalidInput)
        );
        assert_eq!(
            reqs.update_field(OWNER + 5, rid, "name", "Other", 3),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.update_field(OWNER, rid, "nope", "Other", 3),
            Err(Error::InvalidType)
        );
        // Reviewer-only field.
        assert_eq!(
            reqs.update_field(OWNER, rid, "keywords", "Other", 3),
            Err(Error::Forbidden)
        );

        let statuses: Vec<RequestStatus> =
            reqs.history(rid).iter().map(|h| h.status).collect();
        assert_eq!(statuses, vec![RequestStatus::Incomplete, RequestStatus::Ready]);
    }

    #[test]
    fn next_fields() {
        let mut reqs = Requests::new();
        let rid = reqs.create_character_application(OWNER, 1).unwrap().id;
        assert_eq!(
            reqs.next_incomplete_field(rid).unwrap(),
            Some(NextField { kind: "name", last: false })
        );
        reqs.update_field(OWNER, rid, "name", "Test", 2).unwrap();
        reqs.update_field(OWNER, rid, "gender", "Male", 2).unwrap();
        reqs.update_field(OWNER, rid, "sdesc", DEFAULT_IMAGE_SHORT_DESCRIPTION, 2)
            .unwrap();
        reqs.update_field(OWNER, rid, "desc", DEFAULT_IMAGE_DESCRIPTION, 2)
            .unwrap();
        assert_eq!(
            reqs.next_incomplete_field(rid).unwrap(),
            Some(NextField { kind: "backstory", last: true })
        );
        assert_eq!(
            reqs.next_unreviewed_field(rid).unwrap(),
            Some(NextField { kind: "name", last: false })
        );
    }

    #[test]
    fn submit_review_approve() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let perms = reviewer_perms();
        assert_eq!(reqs.get(rid).unwrap().rpid, REVIEWER);

        assert_eq!(
            reqs.advance_status(REVIEWER, &perms, rid, 5),
            Err(Error::NextStatusForbidden)
        );
        approve_all(&mut reqs, rid);
        assert_eq!(
            reqs.advance_status(REVIEWER, &perms, rid, 6).unwrap(),
            RequestStatus::Approved
        );

        let statuses: Vec<RequestStatus> =
            reqs.history(rid).iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![
                RequestStatus::Incomplete,
                RequestStatus::Ready,
                RequestStatus::Submitted,
                RequestStatus::InReview,
                RequestStatus::Approved,
            ]
        );
    }

    #[test]
    fn approval_waits_for_keywords() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let perms = reviewer_perms();
        for kind in ["name", "gender", "sdesc", "desc", "backstory"] {
            reqs.update_field_status(REVIEWER, &perms, rid, kind).unwrap();
        }
        assert_eq!(
            next_status(REVIEWER, &perms, reqs.get(rid).unwrap()),
            Err(Error::NextStatusForbidden)
        );
    }

    #[test]
    fn next_status_rules() {
        let mut reqs = Requests::new();
        let rid = ready_app(&mut reqs);
        let nobody = Permissions::new(9, Vec::<String>::new());
        let owner = Permissions::new(OWNER, Vec::<String>::new());
        let req = reqs.get(rid).unwrap();

        assert_eq!(next_status(OWNER, &owner, req), Ok(RequestStatus::Submitted));
        assert_eq!(
            next_status(9, &nobody, req),
            Err(Error::NextStatusForbidden)
        );

        reqs.advance_status(OWNER, &owner, rid, 3).unwrap();
        let req = reqs.get(rid).unwrap();
        assert_eq!(
            next_status(9, &nobody, req),
            Err(Error::NextStatusForbidden)
        );
        // Owners never review their own application.
        let owner_reviewer = Permissions::new(OWNER, [REVIEW_CHARACTER_APPLICATIONS.name]);
        assert_eq!(
            next_status(OWNER, &owner_reviewer, req),
            Err(Error::NextStatusForbidden)
        );
        assert_eq!(
            next_status(REVIEWER, &reviewer_perms(), req),
            Ok(RequestStatus::InReview)
        );
    }

    #[test]
    fn field_status_requires_the_reviewer() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let other = Permissions::new(7, [REVIEW_CHARACTER_APPLICATIONS.name]);
        assert_eq!(
            reqs.update_field_status(7, &other, rid, "name"),
            Err(Error::Forbidden)
        );
        let no_perm = Permissions::new(REVIEWER, Vec::<String>::new());
        assert_eq!(
            reqs.update_field_status(REVIEWER, &no_perm, rid, "name"),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.update_field_status(REVIEWER, &reviewer_perms(), rid, "keywords"),
            Err(Error::InvalidType)
        );
    }

    #[test]
    fn editability() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let req = reqs.get(rid).unwrap();
        let group = definition_for(&req.kind).unwrap();
        let name = group.get("name").unwrap();
        let keywords = group.get("keywords").unwrap();

        assert!(!is_editable(req));
        assert!(!is_field_editable(OWNER, req, name));
        assert!(is_field_editable(REVIEWER, req, keywords));
        assert!(!is_field_editable(OWNER, req, keywords));
    }

    #[test]
    fn delete_cancels_or_rejects() {
        let mut reqs = Requests::new();
        let owner = Permissions::new(OWNER, Vec::<String>::new());
        let rid = ready_app(&mut reqs);

        assert_eq!(
            reqs.delete_request(REVIEWER, &reviewer_perms(), rid, 3),
            Err(Error::Forbidden)
        );
        reqs.advance_status(OWNER, &owner, rid, 3).unwrap();
        let nobody = Permissions::new(9, Vec::<String>::new());
        assert_eq!(
            reqs.delete_request(9, &nobody, rid, 4),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.delete_request(REVIEWER, &reviewer_perms(), rid, 4),
            Ok(RequestStatus::Rejected)
        );

        let rid = ready_app(&mut reqs);
        assert_eq!(
            reqs.delete_request(OWNER, &owner, rid, 5),
            Ok(RequestStatus::Canceled)
        );
        assert_eq!(
            reqs.delete_request(OWNER, &owner, rid, 6),
            Err(Error::Forbidden)
        );
    }

    #[test]
    fn status_serializes_by_name() {
        let s = serde_json::to_string(&RequestStatus::InReview).unwrap();
        assert_eq!(s, "\"InReview\"");
        assert_eq!(RequestStatus::Canceled.to_string(), "Canceled");
    }
}
