//! room
//!
//! Rooms are joined by eight directional exit columns. An exit value of 0
//! means "no exit"; anything else is the id of the destination room. Links
//! are one-sided rows, so a two-way connection is just two exits that point
//! at each other.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::validate::{StringValidator, ValidatorGroup};
use crate::{Error, Result};

pub mod direction;
pub mod graph;
pub mod matrix;

pub use direction::{is_direction_valid, Direction};

pub const DEFAULT_TITLE: &str = "A dark ocean expanse";
pub const DEFAULT_DESCRIPTION: &str = "Dark, roiling waters stretch to the horizon in every direction, torn to white where the wind rakes the tops of the waves. The ocean itself is a deep green that turns black in the troughs, promising blindness to any unfortunate enough to go under. Stinging salt hangs heavy in every breath of the air.";
pub const DEFAULT_SIZE: i32 = 2;

pub const MIN_TITLE_LEN: usize = 2;
pub const MAX_TITLE_LEN: usize = 150;
pub const MIN_DESCRIPTION_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MIN_IMAGE_NAME_LEN: usize = 6;
pub const MAX_IMAGE_NAME_LEN: usize = 50;
pub const MIN_SIZE: i32 = 0;
pub const MAX_SIZE: i32 = 4;

static TITLE_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z, -]+").expect("title regex"));
static DESCRIPTION_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z,'. -]+").expect("description regex"));
static IMAGE_NAME_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z-]+").expect("image name regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exits {
    #[serde(default)]
    pub north: i64,
    #[serde(default)]
    pub northeast: i64,
    #[serde(default)]
    pub east: i64,
    #[serde(default)]
    pub southeast: i64,
    #[serde(default)]
    pub south: i64,
    #[serde(default)]
    pub southwest: i64,
    #[serde(default)]
    pub west: i64,
    #[serde(default)]
    pub northwest: i64,
}

impl Exits {
    pub fn get(&self, dir: Direction) -> i64 {
        match dir {
            Direction::North => self.north,
            Direction::Northeast => self.northeast,
            Direction::East => self.east,
            Direction::Southeast => self.southeast,
            Direction::South => self.south,
            Direction::Southwest => self.southwest,
            Direction::West => self.west,
            Direction::Northwest => self.northwest,
        }
    }

    pub fn set(&mut self, dir: Direction, id: i64) {
        let slot = match dir {
            Direction::North => &mut self.north,
            Direction::Northeast => &mut self.northeast,
            Direction::East => &mut self.east,
            Direction::Southeast => &mut self.southeast,
            Direction::South => &mut self.south,
            Direction::Southwest => &mut self.southwest,
            Direction::West => &mut self.west,
            Direction::Northwest => &mut self.northwest,
        };
        *slot = id;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub size: i32,
    #[serde(default)]
    pub exits: Exits,
}

impl Room {
    pub fn with_defaults(id: i64) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            size: DEFAULT_SIZE,
            exits: Exits::default(),
        }
    }
}

/// Exit ids in direction order, zeros included.
pub fn exit_ids(room: &Room) -> Vec<i64> {
    Direction::ALL.iter().map(|d| room.exits.get(*d)).collect()
}

pub fn exit_id(room: &Room, dir: Direction) -> i64 {
    room.exits.get(dir)
}

/// First direction (in order) whose exit points at `id`.
pub fn exit_direction(room: &Room, id: i64) -> Result<Direction> {
    if id == 0 {
        return Err(Error::ExitIdNotFound);
    }
    Direction::ALL
        .into_iter()
        .find(|d| room.exits.get(*d) == id)
        .ok_or(Error::ExitIdNotFound)
}

pub fn title_with_id(title: &str, id: i64) -> String {
    format!("[{id}] {title}")
}

pub fn size_to_string(size: i32) -> &'static str {
    match size {
        0 => "Tiny",
        1 => "Small",
        2 => "Medium",
        3 => "Large",
        4 => "Huge",
        _ => "Invalid",
    }
}

pub fn is_title_valid(title: &str) -> bool {
    ValidatorGroup::length_and_charset(MIN_TITLE_LEN, MAX_TITLE_LEN, &TITLE_DISALLOWED)
        .is_valid(title)
}

pub fn is_description_valid(description: &str) -> bool {
    ValidatorGroup::length_and_charset(
        MIN_DESCRIPTION_LEN,
        MAX_DESCRIPTION_LEN,
        &DESCRIPTION_DISALLOWED,
    )
    .is_valid(description)
}

pub fn is_size_valid(size: i32) -> bool {
    (MIN_SIZE..=MAX_SIZE).contains(&size)
}

pub fn is_image_name_valid(name: &str) -> bool {
    ValidatorGroup::length_and_charset(MIN_IMAGE_NAME_LEN, MAX_IMAGE_NAME_LEN, &IMAGE_NAME_DISALLOWED)
        .is_valid(name)
}

/// Read/write access to rooms, by id.
pub trait RoomStore {
    fn get_room(&self, id: i64) -> Result<Room>;
    /// Rooms for the non-zero ids that exist. Unknown ids are skipped.
    fn list_rooms_by_ids(&self, ids: &[i64]) -> Result<Vec<Room>>;
    fn set_exit(&mut self, id: i64, dir: Direction, to: i64) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rooms {
    #[serde(default)]
    rooms: BTreeMap<i64, Room>,
    #[serde(default)]
    last_id: i64,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Room {
        self.last_id += 1;
        let room = Room::with_defaults(self.last_id);
        self.rooms.insert(room.id, room.clone());
        room
    }

    pub fn get(&self, id: i64) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut Room> {
        self.rooms.get_mut(&id).ok_or(Error::NotFound("room"))
    }

    pub fn update_title(&mut self, id: i64, title: &str) -> Result<()> {
        if !is_title_valid(title) {
            return Err(Error::InvalidInput);
        }
        self.get_mut(id)?.title = title.to_string();
        Ok(())
    }

    pub fn update_description(&mut self, id: i64, description: &str) -> Result<()> {
        if !is_description_valid(description) {
            return Err(Error::InvalidInput);
        }
        self.get_mut(id)?.description = description.to_string();
        Ok(())
    }

    pub fn update_size(&mut self, id: i64, size: i32) -> Result<()> {
        if !is_size_valid(size) {
            return Err(Error::InvalidInput);
        }
        self.get_mut(id)?.size = size;
        Ok(())
    }
}

impl RoomStore for Rooms {
    fn get_room(&self, id: i64) -> Result<Room> {
        self.rooms.get(&id).cloned().ok_or(Error::NotFound("room"))
    }

    fn list_rooms_by_ids(&self, ids: &[i64]) -> Result<Vec<Room>> {
        Ok(ids
            .iter()
            .filter(|id| **id != 0)
            .filter_map(|id| self.rooms.get(id).cloned())
            .collect())
    }

    fn set_exit(&mut self, id: i64, dir: Direction, to: i64) -> Result<()> {
        self.get_mut(id)?.exits.set(dir, to);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LinkParams<'a> {
    pub id: i64,
    pub to: i64,
    pub direction: &'a str,
    pub two_way: bool,
}

/// Points `id`'s exit at `to`. A two-way link also points `to`'s opposite
/// exit back at `id`.
pub fn link(store: &mut impl RoomStore, p: LinkParams<'_>) -> Result<()> {
    let dir = Direction::parse(p.direction).ok_or(Error::InvalidDirection)?;
    if p.id == p.to {
        return Err(Error::LinkSelf);
    }
    // Both rooms must exist before anything is written.
    store.get_room(p.id)?;
    store.get_room(p.to)?;

    store.set_exit(p.id, dir, p.to)?;
    if p.two_way {
        store.set_exit(p.to, dir.opposite(), p.id)?;
    }
    info!(id = p.id, to = p.to, dir = %dir, two_way = p.two_way, "room linked");
    Ok(())
}

/// Clears one side of a link. The destination's reverse exit is untouched.
pub fn unlink(store: &mut impl RoomStore, id: i64, direction: &str) -> Result<()> {
    let dir = Direction::parse(direction).ok_or(Error::InvalidDirection)?;
    store.set_exit(id, dir, 0)?;
    info!(id, dir = %dir, "room unlinked");
    Ok(())
}

/// Removes the exit from `id` in `direction` along with whichever exit of
/// the destination leads back to `id`.
pub fn clear_exit(store: &mut impl RoomStore, id: i64, direction: &str) -> Result<()> {
    let dir = Direction::parse(direction).ok_or(Error::InvalidDirection)?;
    let room = store.get_room(id)?;
    let to = exit_id(&room, dir);
    let dest = store.get_room(to)?;
    match exit_direction(&dest, id) {
        Ok(back) => unlink(store, to, back.as_str())?,
        Err(Error::ExitIdNotFound) => {}
        Err(e) => return Err(e),
    }
    unlink(store, id, dir.as_str())
}
