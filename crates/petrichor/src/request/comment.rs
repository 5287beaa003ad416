use serde::{Deserialize, Serialize};
use tracing::info;

use super::change::REVIEW_TEXT_DISALLOWED;
use super::{can_review, definition_for, Requests};
use crate::player::permission::Permissions;
use crate::sanitize::{RegexSanitizer, StringSanitizer};
use crate::validate::{StringValidator, ValidatorGroup};
use crate::{Error, Result};

pub const MIN_COMMENT_LEN: usize = 1;
pub const MAX_COMMENT_LEN: usize = 500;

pub fn is_text_valid(text: &str) -> bool {
    ValidatorGroup::length_and_charset(MIN_COMMENT_LEN, MAX_COMMENT_LEN, &REVIEW_TEXT_DISALLOWED)
        .is_valid(text)
}

pub fn sanitize_text(text: &str) -> String {
    RegexSanitizer(REVIEW_TEXT_DISALLOWED.clone()).sanitize(text)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub rid: i64,
    pub pid: i64,
    /// Field the comment is attached to; `None` for the whole request.
    #[serde(default)]
    pub field: Option<String>,
    pub text: String,
    #[serde(default)]
    pub created_unix: u64,
}

impl Requests {
    /// Owners and the assigned reviewer may comment.
    pub fn add_comment(
        &mut self,
        pid: i64,
        perms: &Permissions,
        rid: i64,
        field: Option<&str>,
        text: &str,
        now: u64,
    ) -> Result<Comment> {
        let req = self.require(rid)?;
        let reviewer = req.has_reviewer() && pid == req.rpid && can_review(perms);
        if pid != req.pid && !reviewer {
            return Err(Error::Forbidden);
        }
        if let Some(field) = field {
            if !definition_for(&req.kind)?.contains(field) {
                return Err(Error::InvalidType);
            }
        }
        let text = sanitize_text(text);
        if !is_text_valid(&text) {
            return Err(Error::InvalidInput);
        }

        self.last_comment_id += 1;
        let c = Comment {
            id: self.last_comment_id,
            rid,
            pid,
            field: field.map(str::to_string),
            text,
            created_unix: now,
        };
        self.comments.push(c.clone());
        info!(id = c.id, rid, pid, "comment added");
        Ok(c)
    }

    pub fn comments_for(&self, rid: i64) -> Vec<&Comment> {
        self.comments.iter().filter(|c| c.rid == rid).collect()
    }

    pub fn field_comments(&self, rid: i64, field: &str) -> Vec<&Comment> {
        self.comments
            .iter()
            .filter(|c| c.rid == rid && c.field.as_deref() == Some(field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{in_review_app, reviewer_perms, OWNER, REVIEWER};

    #[test]
    fn owner_and_reviewer_comment() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let owner = Permissions::new(OWNER, Vec::<String>::new());

        reqs.add_comment(OWNER, &owner, rid, None, "Thanks for looking!", 10)
            .unwrap();
        reqs.add_comment(REVIEWER, &reviewer_perms(), rid, Some("name"), "Nice name.", 11)
            .unwrap();
        assert_eq!(reqs.comments_for(rid).len(), 2);
        assert_eq!(reqs.field_comments(rid, "name").len(), 1);

        let outsider = Permissions::new(9, Vec::<String>::new());
        assert_eq!(
            reqs.add_comment(9, &outsider, rid, None, "Hello", 12),
            Err(Error::Forbidden)
        );
        assert_eq!(
            reqs.add_comment(OWNER, &owner, rid, Some("age"), "Hello", 12),
            Err(Error::InvalidType)
        );
        assert_eq!(
            reqs.add_comment(OWNER, &owner, rid, None, "", 12),
            Err(Error::InvalidInput)
        );
        assert_eq!(
            reqs.add_comment(OWNER, &owner, rid, None, "#1234", 12),
            Err(Error::InvalidInput)
        );
    }

    #[test]
    fn stored_text_is_sanitized() {
        let mut reqs = Requests::new();
        let rid = in_review_app(&mut reqs);
        let owner = Permissions::new(OWNER, Vec::<String>::new());
        let c = reqs
            .add_comment(OWNER, &owner, rid, None, "Looks good :)", 10)
            .unwrap();
        assert_eq!(c.text, "Looks good )");
        assert_eq!(reqs.comments_for(rid)[0].text, "Looks good )");
    }

    #[test]
    fn sanitizer_strips_disallowed() {
        assert_eq!(sanitize_text("<b>hi</b>"), "bhib");
        assert!(is_text_valid(&sanitize_text("ok :)")));
    }
}
