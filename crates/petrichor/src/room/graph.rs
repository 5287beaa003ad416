use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::{exit_id, exit_ids, Direction, Room, RoomStore};
use crate::{Error, Result};

/// Depth used when a caller asks for `max_depth == 0`. Two hops fills a
/// 5x5 grid centred on the root.
pub const DEFAULT_GRAPH_DEPTH: u32 = 2;

/// A room plus whatever of its neighbourhood was loaded. Children are
/// indexed by `Direction::ALL` position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub id: i64,
    pub title: String,
    pub description: String,
    exits: [Option<Box<Node>>; 8],
}

fn slot(dir: Direction) -> usize {
    dir as usize
}

impl Node {
    /// A node with every exit empty, used at the depth limit.
    pub fn terminal(room: &Room) -> Self {
        Self {
            id: room.id,
            title: room.title.clone(),
            description: room.description.clone(),
            exits: Default::default(),
        }
    }

    pub fn exit(&self, dir: Direction) -> Option<&Node> {
        self.exits[slot(dir)].as_deref().filter(|n| n.id != 0)
    }

    pub fn is_exit_empty(&self, dir: Direction) -> bool {
        self.exit(dir).is_none()
    }

    pub fn exit_id(&self, dir: Direction) -> i64 {
        self.exit(dir).map(|n| n.id).unwrap_or(0)
    }

    pub fn set_exit(&mut self, dir: Direction, node: Node) {
        self.exits[slot(dir)] = Some(Box::new(node));
    }

    /// True when `en`, reached through `dir`, leads straight back here.
    pub fn is_exit_two_way(&self, en: &Node, dir: Direction) -> bool {
        if self.exit_id(dir) == 0 {
            return false;
        }
        let back = en.exit_id(dir.opposite());
        back != 0 && back == self.id
    }

    pub fn bind_exits(&self) -> Vec<ExitView> {
        Direction::ALL
            .into_iter()
            .map(|dir| match self.exit(dir) {
                Some(en) => self.bind_exit(dir, en),
                None => self.bind_empty_exit(dir),
            })
            .collect()
    }

    pub fn bind_empty_exit(&self, dir: Direction) -> ExitView {
        ExitView {
            id: 0,
            room_id: self.id,
            direction: dir,
            letter: dir.letter(),
            title: dir.title(),
            edit_element_id: dir.edit_element_id(),
            select_element_id: dir.select_element_id(),
            exit_title: None,
            exit_description: None,
            two_way: false,
        }
    }

    fn bind_exit(&self, dir: Direction, en: &Node) -> ExitView {
        ExitView {
            id: en.id,
            exit_title: Some(en.title.clone()),
            exit_description: Some(en.description.clone()),
            two_way: self.is_exit_two_way(en, dir),
            ..self.bind_empty_exit(dir)
        }
    }
}

/// Presentation data for one exit of the room being edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitView {
    pub id: i64,
    pub room_id: i64,
    pub direction: Direction,
    pub letter: &'static str,
    pub title: &'static str,
    pub edit_element_id: String,
    pub select_element_id: String,
    pub exit_title: Option<String>,
    pub exit_description: Option<String>,
    pub two_way: bool,
}

/// Rebuilds the neighbourhood of `room` out to `max_depth` hops.
///
/// Each level loads its exit rooms in one batch. Exits whose room is gone
/// are treated as empty. Rooms at the depth limit become terminal nodes so
/// the walk stays bounded even on cyclic maps.
pub fn build_graph(
    store: &impl RoomStore,
    room: &Room,
    max_depth: u32,
    depth: u32,
) -> Result<Node> {
    let max_depth = if max_depth == 0 {
        DEFAULT_GRAPH_DEPTH
    } else {
        max_depth
    };

    let exit_rooms = store
        .list_rooms_by_ids(&exit_ids(room))
        .map_err(|_| Error::ListingRooms)?;
    let by_id: HashMap<i64, Room> = exit_rooms.into_iter().map(|r| (r.id, r)).collect();

    let mut node = Node::terminal(room);
    for dir in Direction::ALL {
        let id = exit_id(room, dir);
        if id == 0 {
            continue;
        }
        let Some(exit_room) = by_id.get(&id) else {
            debug!(room = room.id, exit = id, dir = %dir, "exit room missing");
            continue;
        };
        let child = if depth >= max_depth {
            Node::terminal(exit_room)
        } else {
            build_graph(store, exit_room, max_depth, depth + 1)?
        };
        node.set_exit(dir, child);
    }
    Ok(node)
}
