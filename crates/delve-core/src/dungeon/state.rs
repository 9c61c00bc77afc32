//! Runtime dungeon state
//!
//! Wraps a finished `GenerationResult` into a queryable grid of `Cell`s and
//! tracks everything that mutates after generation: the party position and
//! the revealed-secret mask.

use hashbrown::HashMap;

use super::cell::{Cell, Orientation};
use super::generator::GenerationResult;
use super::grid::Grid;
use super::room::{Room, Stair};

/// Queryable dungeon built from a generation result
///
/// Door and stair orientations are derived properties keyed by coordinate,
/// not stored in the cell word, so the side tables must exist before the
/// cells are populated. `new` enforces that ordering.
#[derive(Debug, Clone)]
pub struct DungeonState {
    grid: Grid,
    rooms: Vec<Room>,
    stairs: Vec<Stair>,
    door_orientations: HashMap<(i32, i32), Orientation>,
    stair_orientations: HashMap<(i32, i32), Orientation>,
    /// One bit per cell, indexed [y][x]; starts all-false
    secret_mask: Vec<Vec<bool>>,
    party_position: (i32, i32),
}

impl DungeonState {
    pub fn new(result: &GenerationResult) -> Self {
        let width = result.n_cols + 1;
        let height = result.n_rows + 1;

        // Orientation side tables first; cell population reads them
        let mut door_orientations = HashMap::new();
        for door in &result.doors {
            door_orientations.insert((door.x, door.y), door.orientation);
        }
        let mut stair_orientations = HashMap::new();
        for stair in &result.stairs {
            stair_orientations.insert((stair.x, stair.y), stair.orientation);
        }

        let mut grid = Grid::from_words(&result.grid);
        for cell in grid.iter_mut() {
            let key = cell.position();
            if cell.is_door() {
                cell.orientation = door_orientations.get(&key).copied();
            } else if cell.is_stairs() {
                cell.orientation = stair_orientations.get(&key).copied();
            }
        }

        let mut state = Self {
            grid,
            rooms: result.rooms.clone(),
            stairs: result.stairs.clone(),
            door_orientations,
            stair_orientations,
            secret_mask: vec![vec![false; width]; height],
            party_position: (0, 0),
        };
        state.place_party_at_start();
        state
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn stairs(&self) -> &[Stair] {
        &self.stairs
    }

    pub fn get_cell(&self, x: i32, y: i32) -> Option<&Cell> {
        self.grid.get(x, y)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.grid.in_bounds(x, y)
    }

    pub fn party_position(&self) -> (i32, i32) {
        self.party_position
    }

    pub fn set_party_position(&mut self, x: i32, y: i32) {
        self.party_position = (x, y);
    }

    /// Default to the first room's center; fall back to any open cell
    pub fn place_party_at_start(&mut self) {
        if let Some(room) = self.rooms.first() {
            let (x, y) = room.center();
            if self.is_passable(x, y) {
                self.party_position = (x, y);
                return;
            }
        }
        let fallback = self
            .grid
            .iter()
            .find(|cell| {
                cell.flags.is_open_space() && cell.is_passable(false) && !cell.is_stairs()
            })
            .map(|cell| cell.position());
        if let Some(position) = fallback {
            self.party_position = position;
        }
    }

    /// Orientation defaults to horizontal for unknown coordinates, matching
    /// how renderers treat unadorned doors
    pub fn door_orientation(&self, x: i32, y: i32) -> Orientation {
        self.door_orientations
            .get(&(x, y))
            .copied()
            .unwrap_or(Orientation::Horizontal)
    }

    pub fn stair_orientation(&self, x: i32, y: i32) -> Orientation {
        self.stair_orientations
            .get(&(x, y))
            .copied()
            .unwrap_or(Orientation::Horizontal)
    }

    pub fn is_secret_revealed(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.secret_mask[y as usize][x as usize]
    }

    /// Mark a secret door as discovered; false when out of bounds
    pub fn reveal_secret(&mut self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.secret_mask[y as usize][x as usize] = true;
        true
    }

    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        let Some(cell) = self.grid.get(x, y) else {
            return false;
        };
        cell.is_passable(self.is_secret_revealed(x, y))
    }

    /// Stable one-glyph-per-cell dump parsed by operational tooling
    pub fn debug_grid(&self) -> Vec<String> {
        let (px, py) = self.party_position;
        let mut lines = Vec::with_capacity(self.grid.height());

        for y in 0..self.grid.height() as i32 {
            let mut line = String::with_capacity(self.grid.width());
            for x in 0..self.grid.width() as i32 {
                let Some(cell) = self.grid.get(x, y) else {
                    line.push('?');
                    continue;
                };
                let glyph = if (x, y) == (px, py) {
                    'P'
                } else if cell.is_blocked() {
                    '#'
                } else if cell.is_perimeter() {
                    'X'
                } else if cell.is_door() {
                    'D'
                } else if cell.is_room() {
                    'R'
                } else if cell.is_corridor() {
                    'C'
                } else {
                    '!'
                };
                line.push(glyph);
            }
            lines.push(line);
        }
        lines
    }
}
