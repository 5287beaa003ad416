//! Confirmation dialogs shown before irreversible request actions.

use super::{can_review, next_status, Request, RequestStatus};
use crate::player::permission::Permissions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Primary,
    Destructive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialog {
    pub header: &'static str,
    pub text: &'static str,
    pub button: &'static str,
    /// Client-side toggle that opens the dialog.
    pub variable: &'static str,
    pub kind: DialogKind,
}

pub const SUBMIT: Dialog = Dialog {
    header: "Submit This Application?",
    text: "Once your character application is put in review, this cannot be undone.",
    button: "Submit This Application",
    variable: "showSubmitDialog",
    kind: DialogKind::Primary,
};

pub const CANCEL: Dialog = Dialog {
    header: "Cancel This Application?",
    text: "Once you've canceled this application, it cannot be undone. If you want to apply with this character again in the future, you'll need to create a new application.",
    button: "Cancel This Application",
    variable: "showCancelDialog",
    kind: DialogKind::Destructive,
};

pub const PUT_IN_REVIEW: Dialog = Dialog {
    header: "Put This Application In Review?",
    text: "Once you put this application in review, you must review it within 24 hours. After picking up this application, you'll be the only reviewer able to review it.",
    button: "I'm Ready to Review This Application",
    variable: "showPutInReviewDialog",
    kind: DialogKind::Primary,
};

pub const APPROVE: Dialog = Dialog {
    header: "Approve This Character Application?",
    text: "Once approved, this cannot be undone. The character will go back to the player for them to create.",
    button: "Approve Character",
    variable: "showApproveDialog",
    kind: DialogKind::Primary,
};

pub const FINISH_REVIEW: Dialog = Dialog {
    header: "Finish Reviewing This Character Application?",
    text: "Once you finish reviewing, this cannot be undone. It will be sent back for the player to update and re-submit. Please make sure your change requests are clear!",
    button: "Finish Review",
    variable: "showFinishReviewDialog",
    kind: DialogKind::Primary,
};

pub const REJECT: Dialog = Dialog {
    header: "Reject This Character Application?",
    text: "Once rejected, this Application cannot be re-opened. Please be absolutely certain before doing this.",
    button: "Reject",
    variable: "showRejectDialog",
    kind: DialogKind::Destructive,
};

/// The dialogs `pid` can act on for `req` in its current status.
pub fn dialogs_for(pid: i64, perms: &Permissions, req: &Request) -> Vec<Dialog> {
    let mut out = Vec::new();
    if pid == req.pid {
        if matches!(req.status, RequestStatus::Ready | RequestStatus::Reviewed) {
            out.push(SUBMIT);
        }
        if !matches!(
            req.status,
            RequestStatus::Archived
                | RequestStatus::Canceled
                | RequestStatus::Rejected
                | RequestStatus::Approved
        ) {
            out.push(CANCEL);
        }
        return out;
    }

    match req.status {
        RequestStatus::Submitted if can_review(perms) => {
            out.push(PUT_IN_REVIEW);
            out.push(REJECT);
        }
        RequestStatus::InReview if pid == req.rpid => match next_status(pid, perms, req) {
            Ok(RequestStatus::Approved) => out.push(APPROVE),
            Ok(RequestStatus::Reviewed) => out.push(FINISH_REVIEW),
            _ => {}
        },
        _ => {}
    }
    out
}
