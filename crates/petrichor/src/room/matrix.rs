//! Projection of a room graph onto a square display grid.
//!
//! The root is bound at the centre and every exit is placed at the
//! neighbouring coordinate for its direction. Maps are not guaranteed to be
//! planar, so two rooms can land on the same cell; a priority list decides
//! those collisions, otherwise the first room bound keeps the cell.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::graph::{build_graph, Node};
use super::{Direction, RoomStore};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridExit {
    pub id: i64,
    pub direction: Direction,
    /// The exit's room is drawn somewhere on the grid.
    pub in_matrix: bool,
    /// The neighbouring cell in this direction holds the exit's room.
    pub canonical: bool,
    /// The neighbouring coordinate falls outside the grid.
    pub off_matrix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub exits: Vec<GridExit>,
}

impl GridCell {
    pub fn empty() -> Self {
        Self {
            id: 0,
            title: String::new(),
            description: String::new(),
            exits: Direction::ALL.into_iter().map(empty_exit).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0
    }

    fn from_node(n: &Node) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            description: n.description.clone(),
            exits: Direction::ALL
                .into_iter()
                .map(|dir| GridExit {
                    id: n.exit_id(dir),
                    ..empty_exit(dir)
                })
                .collect(),
        }
    }
}

fn empty_exit(direction: Direction) -> GridExit {
    GridExit {
        id: 0,
        direction,
        in_matrix: false,
        canonical: false,
        off_matrix: false,
    }
}

pub type Matrix = Vec<Vec<GridCell>>;

pub fn empty_matrix(size: usize) -> Matrix {
    (0..size)
        .map(|_| (0..size).map(|_| GridCell::empty()).collect())
        .collect()
}

pub fn coordinate_for_direction(dir: Direction, row: i64, col: i64) -> (i64, i64) {
    match dir {
        Direction::North => (row - 1, col),
        Direction::Northeast => (row - 1, col + 1),
        Direction::East => (row, col + 1),
        Direction::Southeast => (row + 1, col + 1),
        Direction::South => (row + 1, col),
        Direction::Southwest => (row + 1, col - 1),
        Direction::West => (row, col - 1),
        Direction::Northwest => (row - 1, col - 1),
    }
}

pub fn is_valid_coordinate(matrix: &Matrix, row: i64, col: i64) -> bool {
    if row < 0 || col < 0 {
        return false;
    }
    let Some(first) = matrix.first() else {
        return false;
    };
    (row as usize) < matrix.len() && (col as usize) < first.len()
}

/// Weights for a priority list. Earlier entries weigh more: the last entry
/// gets 1 and each step toward the front adds one. A repeated id keeps its
/// earliest position.
pub fn priority_map(priority: &[i64]) -> HashMap<i64, usize> {
    let mut m = HashMap::new();
    for (weight, id) in priority.iter().rev().enumerate() {
        m.insert(*id, weight + 1);
    }
    m
}

/// Whether `id` should replace `visited` in a contested cell.
pub fn priority(map: &HashMap<i64, usize>, id: i64, visited: i64) -> bool {
    let Some(w) = map.get(&id) else {
        return false;
    };
    match map.get(&visited) {
        Some(v) => w > v,
        None => true,
    }
}

impl Node {
    /// Binds this node and its loaded neighbourhood into `matrix` with this
    /// node at (`row`, `col`).
    ///
    /// A deep bind first places every direct neighbour (shallow), then
    /// recurses into each of them, and only then claims its own cell. The
    /// shallow pass keeps near rooms ahead of far rooms that would otherwise
    /// reach a shared cell first.
    pub fn bind_matrix(
        &self,
        matrix: &mut Matrix,
        priority_weights: &HashMap<i64, usize>,
        row: i64,
        col: i64,
        shallow: bool,
    ) {
        if !is_valid_coordinate(matrix, row, col) {
            return;
        }

        if !shallow {
            for pass_shallow in [true, false] {
                for dir in Direction::ALL {
                    let Some(en) = self.exit(dir) else {
                        continue;
                    };
                    let (r, c) = coordinate_for_direction(dir, row, col);
                    en.bind_matrix(matrix, priority_weights, r, c, pass_shallow);
                }
            }
        }

        let cell = &mut matrix[row as usize][col as usize];
        if cell.is_empty() || priority(priority_weights, self.id, cell.id) {
            *cell = GridCell::from_node(self);
        }
    }
}

/// Fills in `in_matrix`, `canonical` and `off_matrix` for every exit.
pub fn annotate_matrix_exits(matrix: &mut Matrix) {
    let ids: HashSet<i64> = matrix
        .iter()
        .flat_map(|row| row.iter().map(|c| c.id))
        .collect();

    for i in 0..matrix.len() {
        for j in 0..matrix[i].len() {
            for k in 0..matrix[i][j].exits.len() {
                let exit = &matrix[i][j].exits[k];
                if exit.id == 0 {
                    continue;
                }
                let (exit_id, dir) = (exit.id, exit.direction);
                let (r, c) = coordinate_for_direction(dir, i as i64, j as i64);
                let neighbour = is_valid_coordinate(matrix, r, c)
                    .then(|| matrix[r as usize][c as usize].id);

                let exit = &mut matrix[i][j].exits[k];
                exit.in_matrix = ids.contains(&exit_id);
                match neighbour {
                    Some(nid) => {
                        exit.canonical = nid == exit_id;
                        exit.off_matrix = false;
                    }
                    None => exit.off_matrix = true,
                }
            }
        }
    }
}

/// Builds the graph around `room_id` and projects it onto a `size`x`size`
/// grid centred on the room, annotated and ready to render.
pub fn grid_for_room(
    store: &impl RoomStore,
    room_id: i64,
    max_depth: u32,
    size: usize,
    priority_list: &[i64],
) -> Result<Matrix> {
    let room = store.get_room(room_id)?;
    let graph = build_graph(store, &room, max_depth, 0)?;
    let mut matrix = empty_matrix(size);
    let centre = (size / 2) as i64;
    graph.bind_matrix(&mut matrix, &priority_map(priority_list), centre, centre, false);
    annotate_matrix_exits(&mut matrix);
    Ok(matrix)
}

/// Plain-text view of a grid: room ids, `.` for empty cells.
pub fn render_grid(matrix: &Matrix) -> String {
    let mut s = String::new();
    for row in matrix {
        let line = row
            .iter()
            .map(|c| {
                if c.is_empty() {
                    format!("{:>5}", ".")
                } else {
                    format!("{:>5}", c.id)
                }
            })
            .collect::<Vec<_>>()
            .join("");
        s.push_str(line.trim_end());
        s.push('\n');
    }
    s
}
