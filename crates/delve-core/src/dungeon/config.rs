//! Generator configuration

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::GenerationError;

/// Smallest grid the generator accepts on either axis
pub const MIN_DIMENSION: usize = 5;

/// Overall dungeon footprint mask
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum DungeonLayout {
    Box,
    Cross,
    Round,
}

impl DungeonLayout {
    /// 3x3 occupancy mask scaled over the grid; `None` for the radial mask
    pub const fn mask(self) -> Option<[[u8; 3]; 3]> {
        match self {
            DungeonLayout::Box => Some([[1, 1, 1], [1, 0, 1], [1, 1, 1]]),
            DungeonLayout::Cross => Some([[0, 1, 0], [1, 1, 1], [0, 1, 0]]),
            DungeonLayout::Round => None,
        }
    }
}

/// Room placement strategy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum RoomLayout {
    /// Random placement attempts, count sized by a floor-area heuristic
    #[default]
    Scattered,
    /// Fill every other lattice point, probabilistically skipping edges
    Packed,
}

/// Corridor straightness bias
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum CorridorLayout {
    /// Never continue in the previous direction on purpose
    Labyrinth,
    /// 50% chance of continuing straight
    #[default]
    Bent,
    /// Always prefer continuing straight
    Straight,
}

impl CorridorLayout {
    /// Probability (0-100) of favoring the previous carve direction
    pub const fn bias(self) -> u32 {
        match self {
            CorridorLayout::Labyrinth => 0,
            CorridorLayout::Bent => 50,
            CorridorLayout::Straight => 100,
        }
    }
}

/// Generation options
///
/// Row/column counts are normalized to even values internally; callers must
/// not assume the requested counts are preserved exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed; `None` picks one at random and echoes it in the result
    pub seed: Option<u64>,
    pub n_rows: usize,
    pub n_cols: usize,
    pub dungeon_layout: Option<DungeonLayout>,
    pub room_min: usize,
    pub room_max: usize,
    pub room_layout: RoomLayout,
    pub corridor_layout: CorridorLayout,
    /// Dead-end removal percentage, 0-100 (100 removes all)
    pub remove_deadends: u8,
    /// Number of stairways to place at corridor dead ends
    pub add_stairs: usize,
    /// Cosmetic tag passed through to renderers; ignored by the algorithm
    pub grid_style: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            n_rows: 39,
            n_cols: 39,
            dungeon_layout: None,
            room_min: 3,
            room_max: 9,
            room_layout: RoomLayout::Scattered,
            corridor_layout: CorridorLayout::Bent,
            remove_deadends: 50,
            add_stairs: 2,
            grid_style: String::from("standard"),
        }
    }
}

impl GeneratorConfig {
    /// Check the configuration before generation
    ///
    /// Only configuration problems are fatal; generation itself self-corrects
    /// ordinary bad luck.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.n_rows < MIN_DIMENSION || self.n_cols < MIN_DIMENSION {
            return Err(GenerationError::InvalidDimensions {
                rows: self.n_rows,
                cols: self.n_cols,
                min: MIN_DIMENSION,
            });
        }
        if self.room_min < 1 || self.room_min > self.room_max {
            return Err(GenerationError::InvalidRoomSize {
                min: self.room_min,
                max: self.room_max,
            });
        }
        // The smallest legal room must fit the lattice
        let room_base = (self.room_min + 1) / 2;
        if room_base > self.n_rows / 2 || room_base > self.n_cols / 2 {
            return Err(GenerationError::RoomTooLarge {
                room_max: self.room_max,
                rows: self.n_rows,
                cols: self.n_cols,
            });
        }
        if self.remove_deadends > 100 {
            return Err(GenerationError::InvalidDeadendPercent(self.remove_deadends));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let cfg = GeneratorConfig {
            n_rows: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(GenerationError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_inverted_room_range_rejected() {
        let cfg = GeneratorConfig {
            room_min: 9,
            room_max: 3,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(GenerationError::InvalidRoomSize { .. })
        ));
    }

    #[test]
    fn test_deadend_percent_bounds() {
        let cfg = GeneratorConfig {
            remove_deadends: 101,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(GenerationError::InvalidDeadendPercent(101))
        );
    }

    #[test]
    fn test_corridor_bias_values() {
        assert_eq!(CorridorLayout::Labyrinth.bias(), 0);
        assert_eq!(CorridorLayout::Bent.bias(), 50);
        assert_eq!(CorridorLayout::Straight.bias(), 100);
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("Packed".parse::<RoomLayout>().unwrap(), RoomLayout::Packed);
        assert_eq!(
            "Cross".parse::<DungeonLayout>().unwrap(),
            DungeonLayout::Cross
        );
    }
}
