//! Generation errors
//!
//! Only invalid configuration is fatal. Bad generation luck (isolated rooms,
//! zero-door rooms) is self-healed or reported through diagnostics instead.

use thiserror::Error;

/// Errors raised while validating a generator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("invalid dungeon dimensions {rows}x{cols}: need at least {min}x{min}")]
    InvalidDimensions { rows: usize, cols: usize, min: usize },

    #[error("invalid room size range {min}..={max}")]
    InvalidRoomSize { min: usize, max: usize },

    #[error("room max size {room_max} does not fit a {rows}x{cols} grid")]
    RoomTooLarge {
        room_max: usize,
        rows: usize,
        cols: usize,
    },

    #[error("dead-end removal must be 0-100, got {0}")]
    InvalidDeadendPercent(u8),
}
