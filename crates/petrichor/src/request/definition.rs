//! Per-type field definitions.

use std::sync::LazyLock;

use super::field::{FieldDef, FieldFor, FieldGroup, RequestField, SubfieldConfig};
use super::Request;
use crate::actor::{ActorField, GenderValidator, DEFAULT_CHARACTER_NAME};
use crate::{Error, Result};

pub const TYPE_CHARACTER_APPLICATION: &str = "CharacterApplication";

pub const FIELD_NAME: &str = "name";
pub const FIELD_GENDER: &str = "gender";
pub const FIELD_SHORT_DESCRIPTION: &str = "sdesc";
pub const FIELD_DESCRIPTION: &str = "desc";
pub const FIELD_BACKSTORY: &str = "backstory";
pub const FIELD_KEYWORDS: &str = "keywords";

pub const MIN_KEYWORDS: usize = 2;
pub const MAX_KEYWORDS: usize = 10;

static CHARACTER_APPLICATION: LazyLock<FieldGroup> = LazyLock::new(|| {
    FieldGroup::new(vec![
        FieldDef::builder(FIELD_NAME)
            .label("Name")
            .description("Your character's name")
            .validator(ActorField::CharacterName.validator())
            .build(),
        FieldDef::builder(FIELD_GENDER)
            .label("Gender")
            .description("Your character's gender determines the pronouns used by third-person descriptions in the game")
            .validator(GenderValidator)
            .build(),
        FieldDef::builder(FIELD_SHORT_DESCRIPTION)
            .label("Short Description")
            .description("This is how your character will appear in third-person descriptions during the game")
            .validator(ActorField::ShortDescription.validator())
            .build(),
        FieldDef::builder(FIELD_DESCRIPTION)
            .label("Description")
            .description("This is how your character will appear when examined")
            .validator(ActorField::Description.validator())
            .build(),
        FieldDef::builder(FIELD_BACKSTORY)
            .label("Backstory")
            .description("This is your character's private backstory")
            .validator(ActorField::Backstory.validator())
            .build(),
        FieldDef::builder(FIELD_KEYWORDS)
            .for_(FieldFor::Reviewer)
            .label("Keywords")
            .description("These are your character's keywords")
            .validator(ActorField::Keyword.validator())
            .subfields(SubfieldConfig::new(MIN_KEYWORDS, MAX_KEYWORDS))
            .build(),
    ])
});

pub fn is_type_valid(kind: &str) -> bool {
    kind == TYPE_CHARACTER_APPLICATION
}

pub fn definition_for(kind: &str) -> Result<&'static FieldGroup> {
    match kind {
        TYPE_CHARACTER_APPLICATION => Ok(&*CHARACTER_APPLICATION),
        _ => Err(Error::InvalidType),
    }
}

/// Whether `field` names a field of request type `kind`.
pub fn is_field_type_valid(kind: &str, field: &str) -> bool {
    definition_for(kind).is_ok_and(|g| g.contains(field))
}

pub fn is_field_valid(kind: &str, f: &RequestField) -> bool {
    definition_for(kind)
        .ok()
        .and_then(|g| g.get(&f.kind))
        .is_some_and(|fd| fd.is_field_valid(f))
}

/// Strips characters a field never accepts before it is validated.
/// Only the character name is cleaned; other fields are checked as given.
pub fn sanitize_value(kind: &str, value: &str) -> String {
    match kind {
        FIELD_NAME => ActorField::CharacterName.sanitize(value),
        _ => value.to_string(),
    }
}

/// Display title, e.g. "Character Application (Test)".
pub fn title(req: &Request) -> String {
    let name = req
        .value(FIELD_NAME)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_CHARACTER_NAME);
    format!("Character Application ({name})")
}
