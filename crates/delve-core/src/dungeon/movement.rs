//! Party movement validation
//!
//! Movement never panics and never returns a hard error: bad directions,
//! bad step counts, and blocked paths all come back as a structured
//! `MoveOutcome` so a long-lived session survives any input.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::state::DungeonState;
use super::visibility::VisibilityEngine;

/// Eight compass directions accepted by the movement interface
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    /// Unit vector as (dx, dy); y grows southward
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Northeast => (1, -1),
            Direction::Northwest => (-1, -1),
            Direction::Southeast => (1, 1),
            Direction::Southwest => (-1, 1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Northeast
                | Direction::Northwest
                | Direction::Southeast
                | Direction::Southwest
        )
    }
}

/// Result of a move attempt; `success` means at least one step landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub success: bool,
    pub message: String,
    pub old_position: (i32, i32),
    pub new_position: (i32, i32),
    pub steps_moved: u32,
}

impl MoveOutcome {
    fn rejected(message: impl Into<String>, position: (i32, i32)) -> Self {
        Self {
            success: false,
            message: message.into(),
            old_position: position,
            new_position: position,
            steps_moved: 0,
        }
    }
}

/// Walks the party through the dungeon, driving visibility updates
pub struct Mover<'a> {
    state: &'a mut DungeonState,
    visibility: &'a mut VisibilityEngine,
}

impl<'a> Mover<'a> {
    pub fn new(state: &'a mut DungeonState, visibility: &'a mut VisibilityEngine) -> Self {
        Self { state, visibility }
    }

    /// Move the party up to `steps` cells in a compass direction
    ///
    /// The path is lit before the position advances, so even a blocked walk
    /// reveals what the party saw on the way.
    pub fn move_party(&mut self, direction: &str, steps: u32) -> MoveOutcome {
        let position = self.state.party_position();

        if steps == 0 {
            return MoveOutcome::rejected("Invalid steps value", position);
        }
        let Ok(direction) = Direction::from_str(direction) else {
            return MoveOutcome::rejected(format!("Invalid direction: {direction}"), position);
        };

        let (x0, y0) = position;
        if !self.state.in_bounds(x0, y0) {
            return MoveOutcome::rejected("Invalid starting position", position);
        }

        self.visibility.update_directional(self.state, direction, steps);

        let outcome = calculate_movement(self.state, x0, y0, direction, steps);
        if outcome.success {
            let (x, y) = outcome.new_position;
            self.state.set_party_position(x, y);
            self.visibility.update(self.state);
        }
        outcome
    }
}

/// Pure movement calculation, no side effects
///
/// Walks step by step, stopping at the first invalid cell. Diagonal steps
/// additionally require both orthogonal component cells to be passable, so
/// a wall corner cannot be cut even when the destination itself is open.
pub fn calculate_movement(
    state: &DungeonState,
    start_x: i32,
    start_y: i32,
    direction: Direction,
    steps: u32,
) -> MoveOutcome {
    let (dx, dy) = direction.vector();
    let (mut x, mut y) = (start_x, start_y);
    let mut steps_moved = 0;
    let mut messages = Vec::new();

    for _ in 0..steps {
        let (new_x, new_y) = (x + dx, y + dy);

        if !state.in_bounds(new_x, new_y) {
            messages.push(format!("Cannot move to ({new_x}, {new_y}) - out of bounds"));
            break;
        }
        let Some(cell) = state.get_cell(new_x, new_y) else {
            messages.push(format!("Invalid cell at ({new_x}, {new_y})"));
            break;
        };

        if !state.is_passable(new_x, new_y) {
            if cell.is_stairs() {
                messages.push(format!("Do you wish to take stairs at ({new_x}, {new_y})"));
            } else if cell.is_door() || cell.is_secret() {
                messages.push(format!("Blocked by door at ({new_x}, {new_y})"));
            } else {
                messages.push(format!("Blocked at ({new_x}, {new_y})"));
            }
            break;
        }

        if direction.is_diagonal()
            && !(state.is_passable(x + dx, y) && state.is_passable(x, y + dy))
        {
            messages.push(format!("Diagonal path blocked to ({new_x}, {new_y})"));
            break;
        }

        (x, y) = (new_x, new_y);
        steps_moved += 1;
        messages.push(format!("Moved {direction} to ({x}, {y})"));
    }

    MoveOutcome {
        success: steps_moved > 0,
        message: messages.join("\n"),
        old_position: (start_x, start_y),
        new_position: (x, y),
        steps_moved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::cell::CellFlags;
    use crate::dungeon::config::GeneratorConfig;
    use crate::dungeon::generator::{GenerationResult, generate};
    use strum::IntoEnumIterator;

    fn test_state() -> DungeonState {
        let config = GeneratorConfig {
            seed: Some(1),
            ..Default::default()
        };
        DungeonState::new(&generate(&config).unwrap())
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_str("north"), Ok(Direction::North));
        assert_eq!(Direction::from_str("southwest"), Ok(Direction::Southwest));
        assert!(Direction::from_str("up").is_err());
        assert!(Direction::from_str("").is_err());
    }

    #[test]
    fn test_direction_vectors_are_units() {
        for direction in Direction::iter() {
            let (dx, dy) = direction.vector();
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!((dx, dy) != (0, 0));
            assert_eq!(direction.is_diagonal(), dx != 0 && dy != 0);
        }
    }

    #[test]
    fn test_invalid_direction_is_structured_failure() {
        let mut state = test_state();
        let mut visibility = VisibilityEngine::new(&state);
        let before = state.party_position();

        let outcome = Mover::new(&mut state, &mut visibility).move_party("sideways", 1);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Invalid direction: sideways");
        assert_eq!(outcome.steps_moved, 0);
        assert_eq!(state.party_position(), before);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut state = test_state();
        let mut visibility = VisibilityEngine::new(&state);
        let outcome = Mover::new(&mut state, &mut visibility).move_party("north", 0);
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Invalid steps value");
    }

    #[test]
    fn test_blocked_north_leaves_position_unchanged() {
        let mut state = test_state();

        // Find an open cell whose north neighbor is hard-blocked
        let mut start = None;
        'scan: for y in 1..state.height() as i32 {
            for x in 0..state.width() as i32 {
                let Some(cell) = state.get_cell(x, y) else {
                    continue;
                };
                if !cell.flags.is_open_space() || cell.is_stairs() {
                    continue;
                }
                let Some(north) = state.get_cell(x, y - 1) else {
                    continue;
                };
                if north.flags.contains(CellFlags::BLOCKED) {
                    start = Some((x, y));
                    break 'scan;
                }
            }
        }
        let (x, y) = start.expect("no open cell with a blocked north neighbor");
        state.set_party_position(x, y);
        let mut visibility = VisibilityEngine::new(&state);

        let outcome = Mover::new(&mut state, &mut visibility).move_party("north", 1);
        assert!(!outcome.success);
        assert_eq!(outcome.steps_moved, 0);
        assert_eq!(outcome.new_position, (x, y));
        assert_eq!(state.party_position(), (x, y));
    }

    #[test]
    fn test_walk_along_open_room_cells() {
        let mut state = test_state();

        // A room at least 3 wide has an open east neighbor at its center
        let (x, y) = state
            .rooms()
            .iter()
            .find(|room| room.width >= 3)
            .map(|room| room.center())
            .expect("no room wide enough");
        state.set_party_position(x, y);
        let mut visibility = VisibilityEngine::new(&state);

        let outcome = Mover::new(&mut state, &mut visibility).move_party("east", 1);
        assert!(outcome.success, "unexpected failure: {}", outcome.message);
        assert_eq!(outcome.steps_moved, 1);
        assert_eq!(outcome.new_position, (x + 1, y));
        assert_eq!(state.party_position(), (x + 1, y));
        assert!(outcome.message.contains("Moved east"));
    }

    #[test]
    fn test_partial_walk_reports_steps_moved() {
        let mut state = test_state();

        // Walking a long way east from a room center eventually hits a wall
        let (x, y) = state
            .rooms()
            .iter()
            .find(|room| room.width >= 3)
            .map(|room| room.center())
            .expect("no room wide enough");
        state.set_party_position(x, y);
        let mut visibility = VisibilityEngine::new(&state);

        let outcome = Mover::new(&mut state, &mut visibility).move_party("east", 100);
        let (nx, ny) = outcome.new_position;
        assert_eq!(nx, x + outcome.steps_moved as i32);
        assert_eq!(ny, y);
        assert!((outcome.steps_moved as i32) < 100);
    }

    /// 4x4 fixture: a 2x2 open pocket at (1,1)..(2,2) whose northeast cell
    /// (2,1) is either open or walled
    fn corner_state(corner_open: bool) -> DungeonState {
        let b = CellFlags::BLOCKED;
        let r = CellFlags::ROOM.with_room_id(1);
        let corner = if corner_open { r } else { b };
        let grid = vec![
            vec![b, b, b, b],
            vec![b, r, corner, b],
            vec![b, r, r, b],
            vec![b, b, b, b],
        ];
        DungeonState::new(&GenerationResult {
            grid,
            rooms: Vec::new(),
            doors: Vec::new(),
            stairs: Vec::new(),
            diagnostics: Vec::new(),
            n_rows: 3,
            n_cols: 3,
            seed: 0,
        })
    }

    #[test]
    fn test_diagonal_corner_rule() {
        // Open diagonal destination, blocked horizontal component: the
        // southeast step from (1,1) to (2,2) must refuse to cut the corner
        let state = corner_state(false);
        let outcome = calculate_movement(&state, 1, 1, Direction::Southeast, 1);
        assert!(!outcome.success);
        assert_eq!(outcome.steps_moved, 0);
        assert_eq!(outcome.new_position, (1, 1));
        assert_eq!(outcome.message, "Diagonal path blocked to (2, 2)");

        // Same step with the corner open goes through
        let state = corner_state(true);
        let outcome = calculate_movement(&state, 1, 1, Direction::Southeast, 1);
        assert!(outcome.success);
        assert_eq!(outcome.new_position, (2, 2));
        assert_eq!(outcome.steps_moved, 1);
    }

    #[test]
    fn test_move_lights_the_path() {
        let mut state = test_state();
        let (x, y) = state
            .rooms()
            .iter()
            .find(|room| room.width >= 3)
            .map(|room| room.center())
            .expect("no room wide enough");
        state.set_party_position(x, y);
        let mut visibility = VisibilityEngine::new(&state);
        let before = visibility.seen_count();

        Mover::new(&mut state, &mut visibility).move_party("east", 2);
        assert!(visibility.seen_count() >= before);
        assert!(visibility.is_seen(x + 1, y));
    }
}
