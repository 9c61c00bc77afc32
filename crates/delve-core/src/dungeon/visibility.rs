//! Fog-of-war visibility
//!
//! Sight is persistent: once a cell has been seen it stays seen, so the set
//! only ever grows. A full `update` recomputes the lit disk from the party
//! position; `update_directional` is the cheap path used while walking.

use hashbrown::HashSet;

use super::movement::Direction;
use super::state::DungeonState;

pub const DEFAULT_LIGHT_RADIUS: i32 = 3;

/// Persistent "ever seen" cell set plus the current light radius
#[derive(Debug, Clone)]
pub struct VisibilityEngine {
    light_radius: i32,
    seen: HashSet<(i32, i32)>,
}

impl VisibilityEngine {
    /// Build the engine and light the party's starting position
    pub fn new(state: &DungeonState) -> Self {
        Self::with_radius(state, DEFAULT_LIGHT_RADIUS)
    }

    pub fn with_radius(state: &DungeonState, light_radius: i32) -> Self {
        let mut engine = Self {
            light_radius,
            seen: HashSet::new(),
        };
        engine.update(state);
        engine
    }

    pub fn light_radius(&self) -> i32 {
        self.light_radius
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Whether a cell has ever been seen
    pub fn is_seen(&self, x: i32, y: i32) -> bool {
        self.seen.contains(&(x, y))
    }

    /// Recompute visibility from the party position
    ///
    /// Candidate cells form a Manhattan-distance disk capped at the light
    /// radius; each candidate must also have an unobstructed Bresenham line
    /// back to the party. Everything visible joins the persistent set.
    pub fn update(&mut self, state: &DungeonState) {
        let (x0, y0) = state.party_position();
        self.seen.insert((x0, y0));

        let radius = self.light_radius;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() + dy.abs() > radius {
                    continue;
                }
                let (x, y) = (x0 + dx, y0 + dy);
                if !state.in_bounds(x, y) {
                    continue;
                }
                if self.has_line_of_sight(state, x0, y0, x, y) {
                    self.seen.insert((x, y));
                }
            }
        }
    }

    /// Light the path of an impending move: each traversed cell plus its
    /// four orthogonal neighbors, stopping at the first blocking cell
    ///
    /// Runs before the party position advances, so the walked path itself is
    /// illuminated rather than just the destination.
    pub fn update_directional(&mut self, state: &DungeonState, direction: Direction, steps: u32) {
        let (x0, y0) = state.party_position();
        let (dx, dy) = direction.vector();

        for step in 1..=steps as i32 {
            let (x, y) = (x0 + dx * step, y0 + dy * step);
            if !state.in_bounds(x, y) {
                break;
            }
            if Self::blocks_sight(state, x, y) {
                break;
            }
            self.seen.insert((x, y));
            for (adj_dx, adj_dy) in [(0, 1), (1, 0), (0, -1), (-1, 0)] {
                let (ax, ay) = (x + adj_dx, y + adj_dy);
                if state.in_bounds(ax, ay) {
                    self.seen.insert((ax, ay));
                }
            }
        }
    }

    /// True when no interior cell of the line blocks sight; the endpoints
    /// themselves never block
    fn has_line_of_sight(&self, state: &DungeonState, x0: i32, y0: i32, x1: i32, y1: i32) -> bool {
        for (cx, cy) in bresenham_line(x0, y0, x1, y1) {
            if (cx, cy) == (x0, y0) || (cx, cy) == (x1, y1) {
                continue;
            }
            if Self::blocks_sight(state, cx, cy) {
                return false;
            }
        }
        true
    }

    fn blocks_sight(state: &DungeonState, x: i32, y: i32) -> bool {
        match state.get_cell(x, y) {
            Some(cell) => cell.blocks_sight(),
            None => true,
        }
    }
}

/// All integer points on the line from (x0, y0) to (x1, y1) inclusive
fn bresenham_line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dungeon::config::GeneratorConfig;
    use crate::dungeon::generator::generate;

    fn test_state() -> DungeonState {
        let config = GeneratorConfig {
            seed: Some(1),
            ..Default::default()
        };
        DungeonState::new(&generate(&config).unwrap())
    }

    #[test]
    fn test_bresenham_endpoints() {
        let line = bresenham_line(0, 0, 5, 3);
        assert_eq!(line.first(), Some(&(0, 0)));
        assert_eq!(line.last(), Some(&(5, 3)));

        let line = bresenham_line(4, 4, 4, 4);
        assert_eq!(line, vec![(4, 4)]);
    }

    #[test]
    fn test_bresenham_straight_line() {
        let line = bresenham_line(2, 3, 6, 3);
        assert_eq!(line, vec![(2, 3), (3, 3), (4, 3), (5, 3), (6, 3)]);
    }

    #[test]
    fn test_party_cell_always_seen() {
        let state = test_state();
        let engine = VisibilityEngine::new(&state);
        let (x, y) = state.party_position();
        assert!(engine.is_seen(x, y));
    }

    #[test]
    fn test_seen_set_is_monotonic() {
        let mut state = test_state();
        let mut engine = VisibilityEngine::new(&state);
        let mut last = engine.seen_count();
        assert!(last > 0);

        let (x, y) = state.party_position();
        for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1), (2, 2)] {
            state.set_party_position(x + dx, y + dy);
            engine.update(&state);
            let now = engine.seen_count();
            assert!(now >= last, "seen set shrank: {last} -> {now}");
            last = now;
        }
    }

    #[test]
    fn test_directional_update_is_monotonic() {
        let state = test_state();
        let mut engine = VisibilityEngine::new(&state);
        let before = engine.seen_count();
        for direction in [
            Direction::North,
            Direction::East,
            Direction::Southwest,
            Direction::Northeast,
        ] {
            engine.update_directional(&state, direction, 3);
        }
        assert!(engine.seen_count() >= before);
    }

    #[test]
    fn test_light_radius_caps_distance() {
        let state = test_state();
        let engine = VisibilityEngine::with_radius(&state, 2);
        let (px, py) = state.party_position();
        for &(x, y) in engine.seen.iter() {
            let distance = (x - px).abs() + (y - py).abs();
            assert!(
                distance <= 2,
                "cell ({x},{y}) seen at Manhattan distance {distance}"
            );
        }
    }

    #[test]
    fn test_walls_stop_sight() {
        // A perimeter wall next to the party must not let sight through to
        // the far side
        let state = test_state();
        let (px, py) = state.party_position();
        let engine = VisibilityEngine::new(&state);

        for (dx, dy) in [(0, -1), (0, 1), (1, 0), (-1, 0)] {
            let (wx, wy) = (px + dx, py + dy);
            let Some(cell) = state.get_cell(wx, wy) else {
                continue;
            };
            if !cell.blocks_sight() {
                continue;
            }
            // Two steps past a blocking cell in the same direction
            let (fx, fy) = (px + dx * 3, py + dy * 3);
            if state.in_bounds(fx, fy) {
                assert!(
                    !engine.is_seen(fx, fy),
                    "saw ({fx},{fy}) through a wall at ({wx},{wy})"
                );
            }
        }
    }
}
