//! Dungeon model: cell words, grid, generation, and runtime state

pub mod cell;
pub mod config;
pub mod generator;
pub mod grid;
pub mod movement;
pub mod room;
pub mod state;
pub mod visibility;

pub use cell::{Cell, CellFlags, CellKind, DoorKind, Entity, EntityKind, Orientation, Overlay};
pub use config::{CorridorLayout, DungeonLayout, GeneratorConfig, RoomLayout};
pub use generator::{GenerationResult, generate, generate_with_rng};
pub use grid::Grid;
pub use movement::{Direction, MoveOutcome, Mover};
pub use room::{CardinalDirection, Door, Room, RoomDiagnostics, Stair, StairKind};
pub use state::DungeonState;
pub use visibility::VisibilityEngine;
