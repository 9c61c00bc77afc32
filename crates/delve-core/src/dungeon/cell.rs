//! Map cell model
//!
//! A cell's terrain is a 32-bit legacy word with fixed bit regions; external
//! tooling consumes the raw words, so the layout must not change. Inside the
//! crate the word is wrapped in `CellFlags` (bitflags) and exposed through
//! typed views (`CellKind`, `DoorKind`) for matching.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

bitflags! {
    /// Legacy 32-bit cell word
    ///
    /// Bit regions (each region mutually exclusive unless composite):
    /// open-space kind in the low bits, `ROOM_ID` in bits 6-15, door kind in
    /// bits 16-21, stairs in 22-23, room label glyph in 24-31.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u32 {
        const BLOCKED   = 0x0000_0001;
        const ROOM      = 0x0000_0002;
        const CORRIDOR  = 0x0000_0004;
        const PERIMETER = 0x0000_0010;
        const ENTRANCE  = 0x0000_0020;
        const ROOM_ID   = 0x0000_FFC0;
        const ARCH      = 0x0001_0000;
        const DOOR      = 0x0002_0000;
        const LOCKED    = 0x0004_0000;
        const TRAPPED   = 0x0008_0000;
        const SECRET    = 0x0010_0000;
        const PORTC     = 0x0020_0000;
        const STAIR_DN  = 0x0040_0000;
        const STAIR_UP  = 0x0080_0000;
        const LABEL     = 0xFF00_0000;

        // Composite masks
        const DOORSPACE = Self::ARCH.bits()
            | Self::DOOR.bits()
            | Self::LOCKED.bits()
            | Self::TRAPPED.bits()
            | Self::SECRET.bits()
            | Self::PORTC.bits();
        const ESPACE = Self::ENTRANCE.bits() | Self::DOORSPACE.bits() | Self::LABEL.bits();
        const STAIRS = Self::STAIR_DN.bits() | Self::STAIR_UP.bits();
        const OPENSPACE = Self::ROOM.bits() | Self::CORRIDOR.bits();
        const BLOCK_ROOM = Self::BLOCKED.bits() | Self::ROOM.bits();
        const BLOCK_CORR = Self::BLOCKED.bits() | Self::PERIMETER.bits() | Self::CORRIDOR.bits();
        const BLOCK_DOOR = Self::BLOCKED.bits() | Self::DOORSPACE.bits();
    }
}

impl CellFlags {
    /// Shift of the `ROOM_ID` bit region
    pub const ROOM_ID_SHIFT: u32 = 6;
    /// Shift of the `LABEL` bit region
    pub const LABEL_SHIFT: u32 = 24;

    /// Room id encoded in bits 6-15 (0 = not in a room)
    pub fn room_id(self) -> u16 {
        ((self & Self::ROOM_ID).bits() >> Self::ROOM_ID_SHIFT) as u16
    }

    /// Encode a room id into the `ROOM_ID` region, replacing any previous id
    pub fn with_room_id(self, id: u16) -> Self {
        let cleared = self.bits() & !Self::ROOM_ID.bits();
        Self::from_bits_retain(cleared | ((id as u32) << Self::ROOM_ID_SHIFT))
    }

    /// Label glyph encoded in bits 24-31, if any
    pub fn label(self) -> Option<char> {
        let code = (self & Self::LABEL).bits() >> Self::LABEL_SHIFT;
        if code == 0 {
            None
        } else {
            char::from_u32(code)
        }
    }

    /// Encode an ASCII label glyph into the `LABEL` region
    pub fn with_label(self, glyph: char) -> Self {
        let cleared = self.bits() & !Self::LABEL.bits();
        Self::from_bits_retain(cleared | ((glyph as u32 & 0xFF) << Self::LABEL_SHIFT))
    }

    /// Check if this is walkable open space (room or corridor)
    pub fn is_open_space(self) -> bool {
        self.intersects(Self::OPENSPACE)
    }
}

// Manual serde impl: the raw word is the external format
impl Serialize for CellFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(CellFlags::from_bits_retain(bits))
    }
}

/// Door kind tag
///
/// String forms match the legacy wire tags (`arch`, `open`, `lock`, `trap`,
/// `secret`, `portc`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DoorKind {
    Arch,
    Open,
    Lock,
    Trap,
    Secret,
    Portc,
}

impl DoorKind {
    /// The cell word bit for this door kind
    pub const fn flag(self) -> CellFlags {
        match self {
            DoorKind::Arch => CellFlags::ARCH,
            DoorKind::Open => CellFlags::DOOR,
            DoorKind::Lock => CellFlags::LOCKED,
            DoorKind::Trap => CellFlags::TRAPPED,
            DoorKind::Secret => CellFlags::SECRET,
            DoorKind::Portc => CellFlags::PORTC,
        }
    }

    /// Extract the door kind from a cell word, if it carries one
    pub fn from_flags(flags: CellFlags) -> Option<Self> {
        if flags.contains(CellFlags::ARCH) {
            Some(DoorKind::Arch)
        } else if flags.contains(CellFlags::DOOR) {
            Some(DoorKind::Open)
        } else if flags.contains(CellFlags::LOCKED) {
            Some(DoorKind::Lock)
        } else if flags.contains(CellFlags::TRAPPED) {
            Some(DoorKind::Trap)
        } else if flags.contains(CellFlags::SECRET) {
            Some(DoorKind::Secret)
        } else if flags.contains(CellFlags::PORTC) {
            Some(DoorKind::Portc)
        } else {
            None
        }
    }
}

/// Orientation of a door or stair, derived from which neighbor axis is open
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Typed view of a cell word for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Nothing,
    Blocked,
    Room,
    Corridor,
    Perimeter,
    Entrance,
    Door(DoorKind),
    Stair { up: bool },
}

/// Kind tag for an entity occupying a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Npc,
    Monster,
    Item,
    Trap,
    Portal,
    Chest,
    Corpse,
    Altar,
    Fountain,
}

/// A movable or interactive object sitting on a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Decorative primitive drawn over a cell by external renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OverlayPrimitive {
    Circle,
    Square,
    Triangle,
    Line,
    Text,
    Polygon,
}

/// An overlay record; parameters are free-form and interpreted by renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub primitive: OverlayPrimitive,
    #[serde(default)]
    pub params: hashbrown::HashMap<String, f64>,
}

impl Overlay {
    pub fn new(primitive: OverlayPrimitive) -> Self {
        Self {
            primitive,
            params: hashbrown::HashMap::new(),
        }
    }
}

/// A single map cell: terrain word plus mutable per-cell extras
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Legacy terrain word
    pub flags: CellFlags,

    /// Grid column
    pub x: i32,

    /// Grid row
    pub y: i32,

    /// Door/stair orientation, populated from the state side table
    pub orientation: Option<Orientation>,

    /// Entities occupying this cell
    #[serde(default)]
    pub entities: Vec<Entity>,

    /// Decorative overlays
    #[serde(default)]
    pub overlays: Vec<Overlay>,

    /// Free-text description
    #[serde(default)]
    pub description: String,
}

impl Cell {
    /// Wrap a raw terrain word at a grid position
    pub fn new(flags: CellFlags, x: i32, y: i32) -> Self {
        Self {
            flags,
            x,
            y,
            orientation: None,
            entities: Vec::new(),
            overlays: Vec::new(),
            description: String::new(),
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn is_blocked(&self) -> bool {
        self.flags.contains(CellFlags::BLOCKED)
    }

    pub fn is_room(&self) -> bool {
        self.flags.contains(CellFlags::ROOM)
    }

    pub fn is_corridor(&self) -> bool {
        self.flags.contains(CellFlags::CORRIDOR)
    }

    pub fn is_perimeter(&self) -> bool {
        self.flags.contains(CellFlags::PERIMETER)
    }

    pub fn is_entrance(&self) -> bool {
        self.flags.contains(CellFlags::ENTRANCE)
    }

    /// Check if this cell holds any door kind
    pub fn is_door(&self) -> bool {
        self.flags.intersects(CellFlags::DOORSPACE)
    }

    pub fn is_arch(&self) -> bool {
        self.flags.contains(CellFlags::ARCH)
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(CellFlags::LOCKED)
    }

    pub fn is_trapped(&self) -> bool {
        self.flags.contains(CellFlags::TRAPPED)
    }

    pub fn is_secret(&self) -> bool {
        self.flags.contains(CellFlags::SECRET)
    }

    pub fn is_portcullis(&self) -> bool {
        self.flags.contains(CellFlags::PORTC)
    }

    pub fn is_stair_up(&self) -> bool {
        self.flags.contains(CellFlags::STAIR_UP)
    }

    pub fn is_stair_down(&self) -> bool {
        self.flags.contains(CellFlags::STAIR_DN)
    }

    pub fn is_stairs(&self) -> bool {
        self.flags.intersects(CellFlags::STAIRS)
    }

    pub fn has_label(&self) -> bool {
        self.flags.intersects(CellFlags::LABEL)
    }

    pub fn room_id(&self) -> u16 {
        self.flags.room_id()
    }

    pub fn door_kind(&self) -> Option<DoorKind> {
        DoorKind::from_flags(self.flags)
    }

    /// Typed view of the terrain word
    pub fn kind(&self) -> CellKind {
        if self.is_stairs() {
            CellKind::Stair {
                up: self.is_stair_up(),
            }
        } else if let Some(kind) = self.door_kind() {
            CellKind::Door(kind)
        } else if self.is_room() {
            CellKind::Room
        } else if self.is_corridor() {
            CellKind::Corridor
        } else if self.is_entrance() {
            CellKind::Entrance
        } else if self.is_perimeter() {
            CellKind::Perimeter
        } else if self.is_blocked() {
            CellKind::Blocked
        } else {
            CellKind::Nothing
        }
    }

    /// Check if the party can stand here
    ///
    /// Stairs always fail - taking stairs is a separate explicit action.
    /// Unrevealed secret doors fail; any other door passes only as an arch.
    pub fn is_passable(&self, secret_revealed: bool) -> bool {
        if self.is_stairs() {
            return false;
        }
        if self.is_secret() && !secret_revealed {
            return false;
        }
        if self.is_door() {
            return self.is_arch();
        }
        !(self.is_blocked() || self.is_perimeter())
    }

    /// Check if this cell blocks line of sight
    ///
    /// Anything that is not open floor blocks: walls, fill, and every door
    /// kind except an archway.
    pub fn blocks_sight(&self) -> bool {
        if self.is_blocked() || self.is_perimeter() {
            return true;
        }
        self.is_door() && !self.is_arch()
    }
}
