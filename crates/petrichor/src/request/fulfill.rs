//! Turning approved requests into game data.

use std::collections::BTreeMap;

use tracing::info;

use super::definition::{
    FIELD_BACKSTORY, FIELD_DESCRIPTION, FIELD_GENDER, FIELD_KEYWORDS, FIELD_NAME,
    FIELD_SHORT_DESCRIPTION, TYPE_CHARACTER_APPLICATION,
};
use super::{Request, RequestField, RequestStatus, Requests};
use crate::actor::{sanitize_gender, ActorImage, ActorImages, Characters, NewActorImage};
use crate::{Error, Result};

pub const CHARACTER_HANDS: i32 = 2;

fn require_field<'a>(req: &'a Request, kind: &str) -> Result<&'a RequestField> {
    req.field(kind).ok_or(Error::MissingField)
}

/// Actor image name for a fulfilled character application.
pub fn character_image_name(pid: i64, rid: i64, name: &str) -> String {
    format!("{pid}-{rid}-{}", name.to_lowercase())
}

fn fulfill_character_application(
    req: &Request,
    images: &mut ActorImages,
    characters: &mut Characters,
) -> Result<ActorImage> {
    if characters.current_for(req.pid).is_some() {
        return Err(Error::CurrentActorImage);
    }

    let name = require_field(req, FIELD_NAME)?;
    let gender = require_field(req, FIELD_GENDER)?;
    let sdesc = require_field(req, FIELD_SHORT_DESCRIPTION)?;
    let desc = require_field(req, FIELD_DESCRIPTION)?;
    let backstory = require_field(req, FIELD_BACKSTORY)?;
    let keywords = require_field(req, FIELD_KEYWORDS)?;

    let mut character = BTreeMap::new();
    character.insert(FIELD_NAME.to_string(), name.value.clone());
    character.insert(FIELD_BACKSTORY.to_string(), backstory.value.clone());

    let img = images.create(NewActorImage {
        name: character_image_name(req.pid, req.id, &name.value),
        gender: sanitize_gender(&gender.value).to_string(),
        short_description: sdesc.value.clone(),
        description: desc.value.clone(),
        keywords: keywords.subfields.clone(),
        hands: vec![CHARACTER_HANDS],
        character,
    })?;
    characters.add_current(req.pid, img.id);
    Ok(img)
}

impl Requests {
    /// Creates the character an approved application describes and
    /// archives the application.
    pub fn fulfill(
        &mut self,
        rid: i64,
        images: &mut ActorImages,
        characters: &mut Characters,
        now: u64,
    ) -> Result<ActorImage> {
        let req = self.require(rid)?;
        if req.status != RequestStatus::Approved {
            return Err(Error::Forbidden);
        }
        let img = match req.kind.as_str() {
            TYPE_CHARACTER_APPLICATION => fulfill_character_application(req, images, characters)?,
            _ => return Err(Error::NoDefinition),
        };
        let pid = req.pid;
        self.set_status(rid, pid, RequestStatus::Archived, now)?;
        info!(rid, pid, aiid = img.id, name = %img.name, "request fulfilled");
        Ok(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::tests::{approve_all, backstory, in_review_app, reviewer_perms, OWNER, REVIEWER};

    fn approved(reqs: &mut Requests) -> i64 {
        let rid = in_review_app(reqs);
        approve_all(reqs, rid);
        reqs.advance_status(REVIEWER, &reviewer_perms(), rid, 6)
            .unwrap();
        rid
    }

    #[test]
    fn fulfill_creates_character_and_archives() {
        let mut reqs = Requests::new();
        let mut images = ActorImages::new();
        let mut characters = Characters::default();
        let rid = approved(&mut reqs);

        let img = reqs
            .fulfill(rid, &mut images, &mut characters, 7)
            .unwrap();
        assert_eq!(img.name, format!("{OWNER}-{rid}-test"));
        assert_eq!(img.gender, "NonBinary");
        assert_eq!(img.keywords, vec!["test", "blob"]);
        assert_eq!(img.hands, vec![2]);
        assert_eq!(img.character.get("name").map(String::as_str), Some("Test"));
        assert_eq!(
            img.character.get("backstory").cloned(),
            Some(backstory())
        );
        assert_eq!(characters.current_for(OWNER).map(|c| c.aiid), Some(img.id));
        assert_eq!(reqs.get(rid).unwrap().status, RequestStatus::Archived);
    }

    #[test]
    fn stray_gender_becomes_non_binary() {
        let mut reqs = Requests::new();
        let mut images = ActorImages::new();
        let mut characters = Characters::default();
        let rid = approved(&mut reqs);
        if let Some(f) = reqs
            .requests
            .get_mut(&rid)
            .and_then(|r| r.fields.get_mut(FIELD_GENDER))
        {
            f.value = "Robot".to_string();
        }

        let img = reqs
            .fulfill(rid, &mut images, &mut characters, 7)
            .unwrap();
        assert_eq!(img.gender, "NonBinary");
    }

    #[test]
    fn fulfill_requires_approval_and_no_current_character() {
        let mut reqs = Requests::new();
        let mut images = ActorImages::new();
        let mut characters = Characters::default();

        let pending = in_review_app(&mut reqs);
        assert_eq!(
            reqs.fulfill(pending, &mut images, &mut characters, 7),
            Err(Error::Forbidden)
        );

        characters.add_current(OWNER, 99);
        let rid = approved(&mut reqs);
        assert_eq!(
            reqs.fulfill(rid, &mut images, &mut characters, 7),
            Err(Error::CurrentActorImage)
        );
        assert_eq!(reqs.get(rid).unwrap().status, RequestStatus::Approved);
    }
}
