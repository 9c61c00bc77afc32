//! Core dungeon engine: deterministic generation, cell/grid model,
//! visibility, and movement validation.
//!
//! The crate is pure computation, with no I/O and no global state. Callers own a
//! `GenerationResult`, wrap it in a [`DungeonState`], attach a
//! [`VisibilityEngine`], and drive moves through a [`Mover`]. Identical
//! configuration and seed always reproduce the same dungeon.

pub mod dungeon;
pub mod error;
pub mod rng;

pub use dungeon::{
    CardinalDirection, Cell, CellFlags, CellKind, CorridorLayout, Direction, Door, DoorKind,
    DungeonLayout, DungeonState, GenerationResult, GeneratorConfig, Grid, MoveOutcome, Mover,
    Orientation, Room, RoomDiagnostics, RoomLayout, Stair, StairKind, VisibilityEngine, generate,
    generate_with_rng,
};
pub use error::GenerationError;
pub use rng::DungeonRng;
