//! Room, door, and stair records produced by generation

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::cell::{DoorKind, Orientation};

/// The four cardinal walls of a room
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CardinalDirection {
    North,
    South,
    West,
    East,
}

impl CardinalDirection {
    /// Fixed scan order used wherever walls are enumerated; keeping it stable
    /// keeps generation output deterministic.
    pub const ALL: [CardinalDirection; 4] = [
        CardinalDirection::North,
        CardinalDirection::South,
        CardinalDirection::West,
        CardinalDirection::East,
    ];

    /// Unit vector as (dx, dy) in world coordinates
    pub const fn vector(self) -> (i32, i32) {
        match self {
            CardinalDirection::North => (0, -1),
            CardinalDirection::South => (0, 1),
            CardinalDirection::East => (1, 0),
            CardinalDirection::West => (-1, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            CardinalDirection::North => CardinalDirection::South,
            CardinalDirection::South => CardinalDirection::North,
            CardinalDirection::East => CardinalDirection::West,
            CardinalDirection::West => CardinalDirection::East,
        }
    }
}

/// A door carved out of a room wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
    #[serde(rename = "key")]
    pub kind: DoorKind,
    /// Room on the far side, when the door opens directly into another room
    #[serde(default)]
    pub out_id: Option<u16>,
}

/// Up/down tag for a stairway
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StairKind {
    Up,
    Down,
}

/// A stairway at a corridor dead end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stair {
    pub x: i32,
    pub y: i32,
    /// Direction vector into the adjoining corridor cell
    pub dx: i32,
    pub dy: i32,
    #[serde(rename = "key")]
    pub kind: StairKind,
    pub orientation: Orientation,
}

/// A placed room: boundary coordinates plus per-wall door lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: u16,
    pub north: i32,
    pub south: i32,
    pub west: i32,
    pub east: i32,
    pub width: i32,
    pub height: i32,
    pub area: i32,
    #[serde(default)]
    pub doors: HashMap<CardinalDirection, Vec<Door>>,
}

impl Room {
    /// Create a room from its four boundary coordinates (inclusive)
    pub fn new(id: u16, north: i32, south: i32, west: i32, east: i32) -> Self {
        let width = east - west + 1;
        let height = south - north + 1;
        Self {
            id,
            north,
            south,
            west,
            east,
            width,
            height,
            area: width * height,
            doors: HashMap::new(),
        }
    }

    /// Top-left corner as world coordinates
    pub fn position(&self) -> (i32, i32) {
        (self.west, self.north)
    }

    /// Center cell of the room interior
    pub fn center(&self) -> (i32, i32) {
        ((self.west + self.east) / 2, (self.north + self.south) / 2)
    }

    /// True when any wall has at least one door
    pub fn has_doors(&self) -> bool {
        self.doors.values().any(|doors| !doors.is_empty())
    }

    /// Total number of doors across all walls
    pub fn door_count(&self) -> usize {
        self.doors.values().map(Vec::len).sum()
    }

    /// Record a door on a wall
    pub fn add_door(&mut self, wall: CardinalDirection, door: Door) {
        self.doors.entry(wall).or_default().push(door);
    }
}

/// Why a room ended up with no doors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorFailure {
    NoValidSills,
    ZeroDoorAllocation,
    AllSillsRejected,
}

/// A sill that was drawn from the candidate list but not opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSill {
    pub x: i32,
    pub y: i32,
    pub reason: SillRejection,
}

/// Why a drawn sill was not opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SillRejection {
    ExistingDoor,
    DuplicateConnection,
}

/// Per-room door placement report
///
/// Callers use this to detect disconnected dungeons without re-deriving the
/// door math themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDiagnostics {
    pub room_id: u16,
    pub initial_sills: usize,
    pub allocated_doors: usize,
    pub placed_doors: usize,
    #[serde(default)]
    pub rejected_sills: Vec<RejectedSill>,
    #[serde(default)]
    pub failure_reason: Option<DoorFailure>,
}

impl RoomDiagnostics {
    pub fn new(room_id: u16) -> Self {
        Self {
            room_id,
            initial_sills: 0,
            allocated_doors: 0,
            placed_doors: 0,
            rejected_sills: Vec::new(),
            failure_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_derived_dimensions() {
        let room = Room::new(1, 3, 7, 5, 11);
        assert_eq!(room.height, 5);
        assert_eq!(room.width, 7);
        assert_eq!(room.area, 35);
        assert_eq!(room.position(), (5, 3));
        assert_eq!(room.center(), (8, 5));
    }

    #[test]
    fn test_door_bookkeeping() {
        let mut room = Room::new(2, 1, 5, 1, 5);
        assert!(!room.has_doors());

        room.add_door(
            CardinalDirection::North,
            Door {
                x: 3,
                y: 0,
                orientation: Orientation::Horizontal,
                kind: DoorKind::Arch,
                out_id: None,
            },
        );
        assert!(room.has_doors());
        assert_eq!(room.door_count(), 1);
    }

    #[test]
    fn test_direction_vectors() {
        assert_eq!(CardinalDirection::North.vector(), (0, -1));
        assert_eq!(CardinalDirection::East.vector(), (1, 0));
        assert_eq!(
            CardinalDirection::North.opposite(),
            CardinalDirection::South
        );
    }

    #[test]
    fn test_failure_reason_wire_format() {
        let json = serde_json::to_string(&DoorFailure::NoValidSills).unwrap();
        assert_eq!(json, "\"no_valid_sills\"");
        let json = serde_json::to_string(&DoorFailure::AllSillsRejected).unwrap();
        assert_eq!(json, "\"all_sills_rejected\"");
    }
}
