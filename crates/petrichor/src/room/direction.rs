use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl Direction {
    /// Clockwise from north. Exit lists, graph walks and bind output all
    /// follow this order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::Northeast => "northeast",
            Direction::East => "east",
            Direction::Southeast => "southeast",
            Direction::South => "south",
            Direction::Southwest => "southwest",
            Direction::West => "west",
            Direction::Northwest => "northwest",
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::Northeast => "ne",
            Direction::East => "e",
            Direction::Southeast => "se",
            Direction::South => "s",
            Direction::Southwest => "sw",
            Direction::West => "w",
            Direction::Northwest => "nw",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::Northeast => "Northeast",
            Direction::East => "East",
            Direction::Southeast => "Southeast",
            Direction::South => "South",
            Direction::Southwest => "Southwest",
            Direction::West => "West",
            Direction::Northwest => "Northwest",
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::Northeast => Direction::Southwest,
            Direction::East => Direction::West,
            Direction::Southeast => Direction::Northwest,
            Direction::South => Direction::North,
            Direction::Southwest => Direction::Northeast,
            Direction::West => Direction::East,
            Direction::Northwest => Direction::Southeast,
        }
    }

    /// Accepts the full name or its letter, case-insensitively.
    pub fn parse(s: &str) -> Option<Direction> {
        let s = s.trim().to_ascii_lowercase();
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str() == s || d.letter() == s)
    }

    pub fn edit_element_id(self) -> String {
        format!("edit-room-exits-edit-{}", self.as_str())
    }

    pub fn select_element_id(self) -> String {
        format!("edit-room-exits-select-{}", self.as_str())
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only full lowercase direction names are valid on the wire.
pub fn is_direction_valid(s: &str) -> bool {
    Direction::ALL.iter().any(|d| d.as_str() == s)
}
