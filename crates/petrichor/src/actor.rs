//! Actor images: the templates characters and NPCs are instantiated from.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sanitize::{RegexSanitizer, StringSanitizer};
use crate::validate::{StringValidator, ValidatorGroup};
use crate::{Error, Result};

pub const MIN_IMAGE_NAME_LEN: usize = 4;
pub const MAX_IMAGE_NAME_LEN: usize = 50;
pub const MIN_SHORT_DESCRIPTION_LEN: usize = 8;
pub const MAX_SHORT_DESCRIPTION_LEN: usize = 300;
pub const MIN_DESCRIPTION_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MIN_CHARACTER_NAME_LEN: usize = 4;
pub const MAX_CHARACTER_NAME_LEN: usize = 16;
pub const MIN_BACKSTORY_LEN: usize = 500;
pub const MAX_BACKSTORY_LEN: usize = 10000;
pub const MIN_KEYWORD_LEN: usize = 2;
pub const MAX_KEYWORD_LEN: usize = 300;

pub const DEFAULT_CHARACTER_NAME: &str = "Unnamed";
pub const DEFAULT_IMAGE_SHORT_DESCRIPTION: &str =
    "glistening handful of pure potential, studded with eyes";
pub const DEFAULT_IMAGE_DESCRIPTION: &str = "Mucus clings to the subtly-twitching bumps and pocks of this handful of pure potential. Where it runnels into a tear duct or beneath a rubbery eyelid, the eye there blinks - one of many, each with a distinct color and construction. In places it's warm to the touch and others, sickly cold.";

pub const GENDER_MALE: &str = "Male";
pub const GENDER_FEMALE: &str = "Female";
pub const GENDER_NON_BINARY: &str = "NonBinary";
pub const GENDER_OBJECT: &str = "Object";
pub const DEFAULT_IMAGE_GENDER: &str = GENDER_OBJECT;
pub const CHARACTER_GENDERS: [&str; 3] = [GENDER_MALE, GENDER_FEMALE, GENDER_NON_BINARY];

static IMAGE_NAME_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z-]+").expect("image name regex"));
static SHORT_DESCRIPTION_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z, -]+").expect("sdesc regex"));
static DESCRIPTION_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z, '\-.!()]+").expect("desc regex"));
static CHARACTER_NAME_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z'-]+").expect("name regex"));
static BACKSTORY_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^a-zA-Z, "'\-\.?!()\r\n]+"#).expect("backstory regex"));
static KEYWORD_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z]+").expect("keyword regex"));

/// The text fields of an actor, each with its length bounds and the
/// characters it may not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorField {
    ImageName,
    ShortDescription,
    Description,
    CharacterName,
    Backstory,
    Keyword,
}

impl ActorField {
    fn rule(self) -> (usize, usize, &'static Regex) {
        match self {
            ActorField::ImageName => (MIN_IMAGE_NAME_LEN, MAX_IMAGE_NAME_LEN, &IMAGE_NAME_DISALLOWED),
            ActorField::ShortDescription => (
                MIN_SHORT_DESCRIPTION_LEN,
                MAX_SHORT_DESCRIPTION_LEN,
                &SHORT_DESCRIPTION_DISALLOWED,
            ),
            ActorField::Description => {
                (MIN_DESCRIPTION_LEN, MAX_DESCRIPTION_LEN, &DESCRIPTION_DISALLOWED)
            }
            ActorField::CharacterName => (
                MIN_CHARACTER_NAME_LEN,
                MAX_CHARACTER_NAME_LEN,
                &CHARACTER_NAME_DISALLOWED,
            ),
            ActorField::Backstory => (MIN_BACKSTORY_LEN, MAX_BACKSTORY_LEN, &BACKSTORY_DISALLOWED),
            ActorField::Keyword => (MIN_KEYWORD_LEN, MAX_KEYWORD_LEN, &KEYWORD_DISALLOWED),
        }
    }

    pub fn validator(self) -> ValidatorGroup {
        let (min, max, re) = self.rule();
        ValidatorGroup::length_and_charset(min, max, re)
    }

    pub fn sanitizer(self) -> RegexSanitizer {
        RegexSanitizer(self.rule().2.clone())
    }

    pub fn is_valid(self, s: &str) -> bool {
        self.validator().is_valid(s)
    }

    pub fn sanitize(self, s: &str) -> String {
        self.sanitizer().sanitize(s)
    }
}

/// Gender as chosen for a character. "Object" is reserved for images.
pub struct GenderValidator;

impl StringValidator for GenderValidator {
    fn is_valid(&self, s: &str) -> bool {
        is_gender_valid(s)
    }
}

pub fn is_gender_valid(s: &str) -> bool {
    CHARACTER_GENDERS.contains(&s)
}

pub fn sanitize_gender(s: &str) -> &'static str {
    CHARACTER_GENDERS
        .into_iter()
        .find(|g| *g == s)
        .unwrap_or(GENDER_NON_BINARY)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorImage {
    pub id: i64,
    pub name: String,
    pub gender: String,
    pub short_description: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub hands: Vec<i32>,
    /// Extra character data (name, backstory) for player characters.
    #[serde(default)]
    pub character: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewActorImage {
    pub name: String,
    pub gender: String,
    pub short_description: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub hands: Vec<i32>,
    pub character: BTreeMap<String, String>,
}

impl NewActorImage {
    /// A blank image carrying the default description text.
    pub fn with_defaults(name: &str) -> Self {
        Self {
            name: name.to_string(),
            gender: DEFAULT_IMAGE_GENDER.to_string(),
            short_description: DEFAULT_IMAGE_SHORT_DESCRIPTION.to_string(),
            description: DEFAULT_IMAGE_DESCRIPTION.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorImages {
    #[serde(default)]
    images: BTreeMap<i64, ActorImage>,
    #[serde(default)]
    last_id: i64,
}

impl ActorImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names are unique across all images. Name format is checked by
    /// callers: staff-made images use `ActorField::ImageName`, generated
    /// character images carry ids in theirs.
    pub fn create(&mut self, img: NewActorImage) -> Result<ActorImage> {
        if img.name.trim().is_empty() {
            return Err(Error::InvalidInput);
        }
        if self.get_by_name(&img.name).is_some() {
            return Err(Error::Conflict);
        }
        self.last_id += 1;
        let rec = ActorImage {
            id: self.last_id,
            name: img.name,
            gender: img.gender,
            short_description: img.short_description,
            description: img.description,
            keywords: img.keywords,
            hands: img.hands,
            character: img.character,
        };
        self.images.insert(rec.id, rec.clone());
        Ok(rec)
    }

    pub fn get(&self, id: i64) -> Option<&ActorImage> {
        self.images.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ActorImage> {
        self.images.values().find(|i| i.name == name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ActorImage> {
        self.images.values()
    }
}

/// Links a player to an actor image they play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCharacter {
    pub pid: i64,
    pub aiid: i64,
    pub current: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Characters {
    #[serde(default)]
    by_player: HashMap<i64, Vec<PlayerCharacter>>,
}

impl Characters {
    pub fn current_for(&self, pid: i64) -> Option<&PlayerCharacter> {
        self.by_player.get(&pid)?.iter().find(|c| c.current)
    }

    pub fn list_for(&self, pid: i64) -> &[PlayerCharacter] {
        self.by_player.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds a character and makes it the current one.
    pub fn add_current(&mut self, pid: i64, aiid: i64) {
        let list = self.by_player.entry(pid).or_default();
        for c in list.iter_mut() {
            c.current = false;
        }
        list.push(PlayerCharacter {
            pid,
            aiid,
            current: true,
        });
    }
}
