//! Dungeon generation
//!
//! Fills a grid of legacy cell words with rooms, corridors, doors, and
//! stairs from a seed and a configuration. Identical `(config, seed)` pairs
//! always produce identical output; all randomness flows through one
//! `DungeonRng` handle owned by the run.
//!
//! Pipeline: mask -> emplace rooms -> open rooms (sills/doors) -> label ->
//! carve corridors -> place stairs -> cleanup (dead ends, disconnected
//! doors, registry reconciliation, fill).

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::rng::DungeonRng;

use super::cell::{CellFlags, DoorKind, Orientation};
use super::config::{GeneratorConfig, RoomLayout};
use super::room::{
    CardinalDirection, Door, DoorFailure, RejectedSill, Room, RoomDiagnostics, SillRejection,
    Stair, StairKind,
};

/// Hard cap on room count; the ROOM_ID bit region holds 10 bits
const MAX_ROOMS: usize = 999;

/// Depth cap for the corridor carve and dead-end collapse worklists
const MAX_WORKLIST_DEPTH: usize = 4096;

/// Everything a generation run produces
///
/// The grid uses the legacy 32-bit word layout and is consumed directly by
/// `DungeonState` and by debug tooling as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub grid: Vec<Vec<CellFlags>>,
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub stairs: Vec<Stair>,
    pub diagnostics: Vec<RoomDiagnostics>,
    pub n_rows: usize,
    pub n_cols: usize,
    /// Seed actually used; echoed back so a random seed can be replayed
    pub seed: u64,
}

/// Generate a dungeon from a configuration
///
/// When `config.seed` is `None` a random seed is chosen and echoed back in
/// the result.
pub fn generate(config: &GeneratorConfig) -> Result<GenerationResult, GenerationError> {
    let rng = match config.seed {
        Some(seed) => DungeonRng::new(seed),
        None => DungeonRng::from_entropy(),
    };
    generate_with_rng(config, rng)
}

/// Generate a dungeon with an explicit RNG handle
///
/// Passing the handle explicitly lets multiple dungeons generate
/// concurrently without shared RNG state.
pub fn generate_with_rng(
    config: &GeneratorConfig,
    rng: DungeonRng,
) -> Result<GenerationResult, GenerationError> {
    config.validate()?;
    Ok(Generator::new(config, rng).run())
}

/// A door sill candidate: the room-edge cell a door is carved outward from
#[derive(Debug, Clone, Copy)]
struct Sill {
    sill_r: i32,
    sill_c: i32,
    dir: CardinalDirection,
    door_r: i32,
    door_c: i32,
    out_id: Option<u16>,
}

/// Copyable room boundary, used where borrowing the full room would conflict
/// with mutating the grid
#[derive(Debug, Clone, Copy)]
struct RoomRect {
    id: u16,
    north: i32,
    south: i32,
    west: i32,
    east: i32,
}

impl From<&Room> for RoomRect {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            north: room.north,
            south: room.south,
            west: room.west,
            east: room.east,
        }
    }
}

/// Prototype room dimensions/position on the half-resolution lattice
#[derive(Debug, Clone, Copy, Default)]
struct RoomProto {
    i: Option<i32>,
    j: Option<i32>,
    height: Option<i32>,
    width: Option<i32>,
}

/// Directional cell template, offsets as (row, col)
///
/// `corridor` cells must be pure corridor; `walled` cells must not be open
/// space. The same matching idiom detects stair ends and collapses dead
/// ends.
struct EndTemplate {
    walled: &'static [(i32, i32)],
    corridor: &'static [(i32, i32)],
    /// Next cell along the run, as (row, col) offset
    next: (i32, i32),
}

/// Stair-end detection, one template per cardinal direction
const STAIR_END: [EndTemplate; 4] = [
    // north
    EndTemplate {
        walled: &[(1, -1), (0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1)],
        corridor: &[(0, 0), (1, 0), (2, 0)],
        next: (1, 0),
    },
    // south
    EndTemplate {
        walled: &[(-1, -1), (0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1)],
        corridor: &[(0, 0), (-1, 0), (-2, 0)],
        next: (-1, 0),
    },
    // west
    EndTemplate {
        walled: &[(-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1), (1, 0), (1, 1)],
        corridor: &[(0, 0), (0, 1), (0, 2)],
        next: (0, 1),
    },
    // east
    EndTemplate {
        walled: &[(-1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0), (1, -1)],
        corridor: &[(0, 0), (0, -1), (0, -2)],
        next: (0, -1),
    },
];

/// Dead-end collapse, one template per cardinal direction; `next` is the
/// predecessor cell the collapse follows
const CLOSE_END: [EndTemplate; 4] = [
    // north
    EndTemplate {
        walled: &[(0, -1), (1, -1), (1, 0), (1, 1), (0, 1)],
        corridor: &[],
        next: (-1, 0),
    },
    // south
    EndTemplate {
        walled: &[(0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1)],
        corridor: &[],
        next: (1, 0),
    },
    // west
    EndTemplate {
        walled: &[(-1, 0), (-1, 1), (0, 1), (1, 1), (1, 0)],
        corridor: &[],
        next: (0, -1),
    },
    // east
    EndTemplate {
        walled: &[(-1, 0), (-1, -1), (0, -1), (1, -1), (1, 0)],
        corridor: &[],
        next: (0, 1),
    },
];

struct Generator {
    rng: DungeonRng,
    /// Normalized (even) dimensions; the grid is one cell larger on each axis
    n_rows: i32,
    n_cols: i32,
    /// Lattice dimensions (half resolution)
    n_i: i32,
    n_j: i32,
    max_row: i32,
    max_col: i32,
    room_base: i32,
    room_radix: i32,
    room_max: i32,
    room_layout: RoomLayout,
    corridor_bias: u32,
    remove_deadends: u8,
    add_stairs: usize,
    dungeon_layout: Option<super::config::DungeonLayout>,

    cells: Vec<Vec<CellFlags>>,
    rooms: Vec<Room>,
    /// Every door as placed, before cleanup reconciliation
    all_doors: Vec<Door>,
    /// Final reconciled door registry
    doors: Vec<Door>,
    stairs: Vec<Stair>,
    /// Room pairs already joined directly, to avoid duplicate connections
    connect: HashSet<(u16, u16)>,
    /// Room cells the corridor carve has traversed, as (r, c)
    ///
    /// Corridor cells mark themselves with the CORRIDOR bit, but ROOM cells
    /// never take that bit, so the carve needs a separate visited marker for
    /// them or it would re-enter room interiors forever.
    carved: HashSet<(i32, i32)>,
    diagnostics: Vec<RoomDiagnostics>,
}

impl Generator {
    fn new(config: &GeneratorConfig, rng: DungeonRng) -> Self {
        // Round down to the odd+1 lattice parity
        let n_i = (config.n_rows / 2) as i32;
        let n_j = (config.n_cols / 2) as i32;
        let n_rows = n_i * 2;
        let n_cols = n_j * 2;

        let room_base = ((config.room_min + 1) / 2) as i32;
        let room_radix = ((config.room_max - config.room_min) / 2 + 1) as i32;

        let cells =
            vec![vec![CellFlags::empty(); (n_cols + 1) as usize]; (n_rows + 1) as usize];

        Self {
            rng,
            n_rows,
            n_cols,
            n_i,
            n_j,
            max_row: n_rows - 1,
            max_col: n_cols - 1,
            room_base,
            room_radix,
            room_max: config.room_max as i32,
            room_layout: config.room_layout,
            corridor_bias: config.corridor_layout.bias(),
            remove_deadends: config.remove_deadends,
            add_stairs: config.add_stairs,
            dungeon_layout: config.dungeon_layout,
            cells,
            rooms: Vec::new(),
            all_doors: Vec::new(),
            doors: Vec::new(),
            stairs: Vec::new(),
            connect: HashSet::new(),
            carved: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(mut self) -> GenerationResult {
        self.apply_mask();
        self.emplace_rooms();
        self.open_rooms();
        self.label_rooms();
        self.corridors();
        if self.add_stairs > 0 {
            self.emplace_stairs();
        }
        self.clean_dungeon();

        GenerationResult {
            grid: self.cells,
            rooms: self.rooms,
            doors: self.doors,
            stairs: self.stairs,
            diagnostics: self.diagnostics,
            n_rows: self.n_rows as usize,
            n_cols: self.n_cols as usize,
            seed: self.rng.seed(),
        }
    }

    // ---- grid word helpers ----

    fn in_grid(&self, r: i32, c: i32) -> bool {
        r >= 0 && r <= self.n_rows && c >= 0 && c <= self.n_cols
    }

    fn word(&self, r: i32, c: i32) -> CellFlags {
        self.cells[r as usize][c as usize]
    }

    fn word_mut(&mut self, r: i32, c: i32) -> &mut CellFlags {
        &mut self.cells[r as usize][c as usize]
    }

    // ---- stage 1: shape mask ----

    fn apply_mask(&mut self) {
        let Some(layout) = self.dungeon_layout else {
            return;
        };
        match layout.mask() {
            Some(mask) => self.mask_cells(&mask),
            None => self.round_mask(),
        }
    }

    fn mask_cells(&mut self, mask: &[[u8; 3]; 3]) {
        let r_scale = mask.len() as f64 / (self.n_rows + 1) as f64;
        let c_scale = mask[0].len() as f64 / (self.n_cols + 1) as f64;

        for r in 0..=self.n_rows {
            for c in 0..=self.n_cols {
                let mask_r = (r as f64 * r_scale) as usize;
                let mask_c = (c as f64 * c_scale) as usize;
                if mask_r < mask.len() && mask_c < mask[0].len() && mask[mask_r][mask_c] == 0 {
                    *self.word_mut(r, c) = CellFlags::BLOCKED;
                }
            }
        }
    }

    fn round_mask(&mut self) {
        let center_r = self.n_rows / 2;
        let center_c = self.n_cols / 2;
        let radius = center_c as f64;

        for r in 0..=self.n_rows {
            for c in 0..=self.n_cols {
                let dr = (r - center_r) as f64;
                let dc = (c - center_c) as f64;
                if (dr * dr + dc * dc).sqrt() > radius {
                    *self.word_mut(r, c) = CellFlags::BLOCKED;
                }
            }
        }
    }

    // ---- stage 2: room placement ----

    fn emplace_rooms(&mut self) {
        match self.room_layout {
            RoomLayout::Packed => self.pack_rooms(),
            RoomLayout::Scattered => self.scatter_rooms(),
        }
    }

    fn pack_rooms(&mut self) {
        for i in 0..self.n_i {
            let r = i * 2 + 1;
            for j in 0..self.n_j {
                let c = j * 2 + 1;
                if self.word(r, c).contains(CellFlags::ROOM) {
                    continue;
                }
                if (i == 0 || j == 0) && self.rng.rn2(2) == 1 {
                    continue;
                }
                self.emplace_room(RoomProto {
                    i: Some(i),
                    j: Some(j),
                    ..RoomProto::default()
                });
            }
        }
    }

    fn scatter_rooms(&mut self) {
        let n_rooms = self.alloc_rooms();
        for _ in 0..n_rooms {
            self.emplace_room(RoomProto::default());
        }
    }

    /// Placement attempt count from the floor-area heuristic
    fn alloc_rooms(&self) -> usize {
        let dungeon_area = (self.n_cols * self.n_rows) as usize;
        let room_area = (self.room_max * self.room_max) as usize;
        (dungeon_area / room_area.max(1)).max(1)
    }

    /// Fill in missing prototype fields from the RNG
    fn set_room(&mut self, proto: RoomProto) -> Option<(i32, i32, i32, i32)> {
        let height = proto
            .height
            .unwrap_or_else(|| self.room_base + self.rng.rn2(self.room_radix as u32) as i32);
        let width = proto
            .width
            .unwrap_or_else(|| self.room_base + self.rng.rn2(self.room_radix as u32) as i32);

        let i = match proto.i {
            Some(i) => i,
            None => {
                let span = self.n_i - height;
                if span < 0 {
                    return None;
                }
                self.rng.rn2(span as u32 + 1) as i32
            }
        };
        let j = match proto.j {
            Some(j) => j,
            None => {
                let span = self.n_j - width;
                if span < 0 {
                    return None;
                }
                self.rng.rn2(span as u32 + 1) as i32
            }
        };

        Some((i, j, height, width))
    }

    fn emplace_room(&mut self, proto: RoomProto) {
        if self.rooms.len() >= MAX_ROOMS {
            return;
        }
        let Some((i, j, height, width)) = self.set_room(proto) else {
            return;
        };

        let r1 = i * 2 + 1;
        let c1 = j * 2 + 1;
        let r2 = (i + height) * 2 - 1;
        let c2 = (j + width) * 2 - 1;

        if r1 < 1 || r2 > self.max_row || c1 < 1 || c2 > self.max_col {
            return;
        }
        if self.room_collides(r1, c1, r2, c2) {
            return;
        }

        let room_id = self.rooms.len() as u16 + 1;

        for r in r1..=r2 {
            for c in c1..=c2 {
                let word = self.word_mut(r, c);
                if word.contains(CellFlags::ENTRANCE) {
                    word.remove(CellFlags::ESPACE);
                } else if word.contains(CellFlags::PERIMETER) {
                    word.remove(CellFlags::PERIMETER);
                }
                word.insert(CellFlags::ROOM);
                *word = word.with_room_id(room_id);
            }
        }

        self.rooms.push(Room::new(room_id, r1, r2, c1, c2));

        // Perimeter ring; soft block, door carving may clear it later
        for r in (r1 - 1)..=(r2 + 1) {
            if r <= self.max_row {
                for c in [c1 - 1, c2 + 1] {
                    if !self.word(r, c).intersects(CellFlags::ROOM | CellFlags::ENTRANCE) {
                        self.word_mut(r, c).insert(CellFlags::PERIMETER);
                    }
                }
            }
        }
        for c in (c1 - 1)..=(c2 + 1) {
            if c <= self.max_col {
                for r in [r1 - 1, r2 + 1] {
                    if !self.word(r, c).intersects(CellFlags::ROOM | CellFlags::ENTRANCE) {
                        self.word_mut(r, c).insert(CellFlags::PERIMETER);
                    }
                }
            }
        }
    }

    /// Collision check over the full rectangle including the 1-cell ring
    fn room_collides(&self, r1: i32, c1: i32, r2: i32, c2: i32) -> bool {
        for r in (r1 - 1)..=(r2 + 1) {
            for c in (c1 - 1)..=(c2 + 1) {
                if !self.in_grid(r, c) {
                    continue;
                }
                if self.word(r, c).intersects(CellFlags::BLOCK_ROOM) {
                    return true;
                }
            }
        }
        false
    }

    // ---- stage 3: door placement ----

    fn open_rooms(&mut self) {
        self.connect.clear();
        for idx in 0..self.rooms.len() {
            self.open_room(idx);
        }
    }

    fn open_room(&mut self, room_idx: usize) {
        let rect = RoomRect::from(&self.rooms[room_idx]);
        let mut diag = RoomDiagnostics::new(rect.id);

        let mut sills = self.door_sills(rect);
        diag.initial_sills = sills.len();

        if sills.is_empty() {
            diag.failure_reason = Some(DoorFailure::NoValidSills);
            self.diagnostics.push(diag);
            return;
        }

        let n_opens = self.alloc_opens(rect);
        diag.allocated_doors = n_opens;

        for _ in 0..n_opens {
            if sills.is_empty() {
                break;
            }
            let idx = self.rng.rn2(sills.len() as u32) as usize;
            let sill = sills.remove(idx);
            let (door_r, door_c) = (sill.door_r, sill.door_c);

            if self.word(door_r, door_c).intersects(CellFlags::DOORSPACE) {
                diag.rejected_sills.push(RejectedSill {
                    x: door_c,
                    y: door_r,
                    reason: SillRejection::ExistingDoor,
                });
                continue;
            }

            if let Some(out_id) = sill.out_id {
                let key = (rect.id.min(out_id), rect.id.max(out_id));
                if !self.connect.insert(key) {
                    diag.rejected_sills.push(RejectedSill {
                        x: door_c,
                        y: door_r,
                        reason: SillRejection::DuplicateConnection,
                    });
                    continue;
                }
            }

            self.place_door(room_idx, &sill);
            diag.placed_doors += 1;
        }

        // Last resort: a duplicate connection beats a sealed room
        if !self.rooms[room_idx].has_doors() {
            for sill in sills {
                if self
                    .word(sill.door_r, sill.door_c)
                    .intersects(CellFlags::DOORSPACE)
                {
                    continue;
                }
                self.place_door(room_idx, &sill);
                diag.placed_doors += 1;
                break;
            }
        }

        if !self.rooms[room_idx].has_doors() {
            diag.failure_reason = Some(if diag.initial_sills == 0 {
                DoorFailure::NoValidSills
            } else if diag.allocated_doors == 0 {
                DoorFailure::ZeroDoorAllocation
            } else {
                DoorFailure::AllSillsRejected
            });
        }
        self.diagnostics.push(diag);
    }

    /// Carve the 3-deep entrance strip and record the door
    fn place_door(&mut self, room_idx: usize, sill: &Sill) {
        let (dx, dy) = sill.dir.vector();
        for step in 0..3 {
            let r = sill.sill_r + dy * step;
            let c = sill.sill_c + dx * step;
            if self.in_grid(r, c) {
                let word = self.word_mut(r, c);
                word.remove(CellFlags::PERIMETER);
                word.insert(CellFlags::ENTRANCE);
            }
        }

        let orientation = match sill.dir {
            CardinalDirection::East | CardinalDirection::West => Orientation::Vertical,
            CardinalDirection::North | CardinalDirection::South => Orientation::Horizontal,
        };
        let kind = self.door_kind();
        self.word_mut(sill.door_r, sill.door_c).insert(kind.flag());

        let door = Door {
            x: sill.door_c,
            y: sill.door_r,
            orientation,
            kind,
            out_id: sill.out_id,
        };
        self.all_doors.push(door.clone());
        self.rooms[room_idx].add_door(sill.dir, door);
    }

    /// Door budget: sqrt of the lattice area plus a random amount in the same
    /// range
    fn alloc_opens(&mut self, rect: RoomRect) -> usize {
        let room_h = (rect.south - rect.north) / 2 + 1;
        let room_w = (rect.east - rect.west) / 2 + 1;
        let base = ((room_h * room_w) as u32).isqrt();
        (base + self.rng.rn2(base)) as usize
    }

    fn door_sills(&mut self, rect: RoomRect) -> Vec<Sill> {
        let mut sills = Vec::new();

        if rect.north >= 3 {
            let mut c = rect.west;
            while c <= rect.east {
                if let Some(sill) = self.check_sill(rect, rect.north, c, CardinalDirection::North) {
                    sills.push(sill);
                }
                c += 2;
            }
        }
        if rect.south <= self.n_rows - 3 {
            let mut c = rect.west;
            while c <= rect.east {
                if let Some(sill) = self.check_sill(rect, rect.south, c, CardinalDirection::South) {
                    sills.push(sill);
                }
                c += 2;
            }
        }
        if rect.west >= 3 {
            let mut r = rect.north;
            while r <= rect.south {
                if let Some(sill) = self.check_sill(rect, r, rect.west, CardinalDirection::West) {
                    sills.push(sill);
                }
                r += 2;
            }
        }
        if rect.east <= self.n_cols - 3 {
            let mut r = rect.north;
            while r <= rect.south {
                if let Some(sill) = self.check_sill(rect, r, rect.east, CardinalDirection::East) {
                    sills.push(sill);
                }
                r += 2;
            }
        }

        if sills.is_empty() {
            return self.guaranteed_sill(rect);
        }
        self.rng.shuffle(&mut sills);
        sills
    }

    fn check_sill(
        &self,
        rect: RoomRect,
        sill_r: i32,
        sill_c: i32,
        dir: CardinalDirection,
    ) -> Option<Sill> {
        let (dx, dy) = dir.vector();
        let door_r = sill_r + dy;
        let door_c = sill_c + dx;

        if !self.in_grid(door_r, door_c) {
            return None;
        }
        let door = self.word(door_r, door_c);
        if !door.contains(CellFlags::PERIMETER) {
            return None;
        }
        if door.intersects(CellFlags::BLOCK_DOOR) {
            return None;
        }

        let out_r = door_r + dy;
        let out_c = door_c + dx;
        if !self.in_grid(out_r, out_c) {
            return None;
        }
        let out = self.word(out_r, out_c);
        if out.contains(CellFlags::BLOCKED) {
            return None;
        }

        let out_id = if out.contains(CellFlags::ROOM) {
            let id = out.room_id();
            if id == rect.id {
                return None;
            }
            Some(id)
        } else {
            None
        };

        Some(Sill {
            sill_r,
            sill_c,
            dir,
            door_r,
            door_c,
            out_id,
        })
    }

    /// Force at least one door position for an otherwise sealed room
    fn guaranteed_sill(&mut self, rect: RoomRect) -> Vec<Sill> {
        let center_r = (rect.north + rect.south) / 2;
        let center_c = (rect.west + rect.east) / 2;

        // Wall centers first
        let walls = [
            (CardinalDirection::North, rect.north, center_c),
            (CardinalDirection::South, rect.south, center_c),
            (CardinalDirection::West, center_r, rect.west),
            (CardinalDirection::East, center_r, rect.east),
        ];
        for (dir, r, c) in walls {
            if let Some(sill) = self.check_sill(rect, r, c, dir) {
                return vec![sill];
            }
        }

        // Then scan entire walls for any valid position
        for dir in CardinalDirection::ALL {
            let (start, end, fixed, horizontal) = match dir {
                CardinalDirection::North if rect.north >= 3 => {
                    (rect.west, rect.east, rect.north, true)
                }
                CardinalDirection::South if rect.south <= self.n_rows - 3 => {
                    (rect.west, rect.east, rect.south, true)
                }
                CardinalDirection::West if rect.west >= 3 => {
                    (rect.north, rect.south, rect.west, false)
                }
                CardinalDirection::East if rect.east <= self.n_cols - 3 => {
                    (rect.north, rect.south, rect.east, false)
                }
                _ => continue,
            };
            let mut pos = start;
            while pos <= end {
                let (r, c) = if horizontal { (fixed, pos) } else { (pos, fixed) };
                if let Some(sill) = self.check_sill(rect, r, c, dir) {
                    return vec![sill];
                }
                pos += 2;
            }
        }

        // Ultimate fallback: synthesize a doorway at the east wall center
        vec![Sill {
            sill_r: center_r,
            sill_c: rect.east,
            dir: CardinalDirection::East,
            door_r: center_r,
            door_c: (rect.east + 1).min(self.n_cols),
            out_id: None,
        }]
    }

    /// Weighted door kind table (out of 110)
    fn door_kind(&mut self) -> DoorKind {
        match self.rng.rn2(110) {
            0..15 => DoorKind::Arch,
            15..60 => DoorKind::Open,
            60..75 => DoorKind::Lock,
            75..90 => DoorKind::Trap,
            90..100 => DoorKind::Secret,
            _ => DoorKind::Portc,
        }
    }

    // ---- stage 4: room labels ----

    fn label_rooms(&mut self) {
        for idx in 0..self.rooms.len() {
            let rect = RoomRect::from(&self.rooms[idx]);
            let label = rect.id.to_string();
            let label_r = (rect.north + rect.south) / 2;
            let label_c = (rect.west + rect.east - label.len() as i32) / 2 + 1;

            for (i, glyph) in label.chars().enumerate() {
                let c = label_c + i as i32;
                if self.in_grid(label_r, c) {
                    let word = self.word_mut(label_r, c);
                    *word = word.with_label(glyph);
                }
            }
        }
    }

    // ---- stage 5: corridor carving ----

    fn corridors(&mut self) {
        for i in 1..self.n_i {
            let r = i * 2 + 1;
            for j in 1..self.n_j {
                let c = j * 2 + 1;
                if self.word(r, c).contains(CellFlags::CORRIDOR) || self.is_carved(r, c) {
                    continue;
                }
                self.tunnel(i, j);
            }
        }
        self.block_corridor_walls();
    }

    /// Depth-first carve from a lattice point, as an explicit frame stack
    ///
    /// The frame order reproduces the recursive formulation exactly: each
    /// frame holds its own shuffled direction list, so the RNG call sequence
    /// (and therefore the dungeon) is stable for a given seed.
    fn tunnel(&mut self, i: i32, j: i32) {
        struct Frame {
            i: i32,
            j: i32,
            dirs: Vec<CardinalDirection>,
            next: usize,
        }

        let dirs = self.tunnel_dirs(None);
        let mut stack = vec![Frame {
            i,
            j,
            dirs,
            next: 0,
        }];

        while let Some(top) = stack.last_mut() {
            let Some(&dir) = top.dirs.get(top.next) else {
                stack.pop();
                continue;
            };
            top.next += 1;
            let (fi, fj) = (top.i, top.j);

            if self.open_tunnel(fi, fj, dir) && stack.len() < MAX_WORKLIST_DEPTH {
                let (dx, dy) = dir.vector();
                let dirs = self.tunnel_dirs(Some(dir));
                stack.push(Frame {
                    i: fi + dy,
                    j: fj + dx,
                    dirs,
                    next: 0,
                });
            }
        }
    }

    /// Shuffled directions, optionally biased toward the previous direction
    fn tunnel_dirs(&mut self, last_dir: Option<CardinalDirection>) -> Vec<CardinalDirection> {
        let mut dirs = CardinalDirection::ALL.to_vec();
        self.rng.shuffle(&mut dirs);

        if let Some(last) = last_dir {
            if self.rng.percent(self.corridor_bias) {
                dirs.insert(0, last);
            }
        }
        dirs
    }

    fn open_tunnel(&mut self, i: i32, j: i32, dir: CardinalDirection) -> bool {
        let (dx, dy) = dir.vector();
        let this_r = i * 2 + 1;
        let this_c = j * 2 + 1;
        let next_r = (i + dy) * 2 + 1;
        let next_c = (j + dx) * 2 + 1;
        let mid_r = (this_r + next_r) / 2;
        let mid_c = (this_c + next_c) / 2;

        if self.sound_tunnel(mid_r, mid_c, next_r, next_c) {
            self.delve_tunnel(this_r, this_c, next_r, next_c);
            true
        } else {
            false
        }
    }

    /// Check a 2-cell carve step for blocking cells
    ///
    /// Already-traversed room cells block like CORRIDOR cells do, so every
    /// successful step claims fresh ground and the carve terminates.
    fn sound_tunnel(&self, mid_r: i32, mid_c: i32, next_r: i32, next_c: i32) -> bool {
        if next_r < 0 || next_r > self.n_rows || next_c < 0 || next_c > self.n_cols {
            return false;
        }
        let (r1, r2) = (mid_r.min(next_r), mid_r.max(next_r));
        let (c1, c2) = (mid_c.min(next_c), mid_c.max(next_c));
        for r in r1..=r2 {
            for c in c1..=c2 {
                if self.word(r, c).intersects(CellFlags::BLOCK_CORR) || self.is_carved(r, c) {
                    return false;
                }
            }
        }
        true
    }

    fn is_carved(&self, r: i32, c: i32) -> bool {
        self.word(r, c).contains(CellFlags::ROOM) && self.carved.contains(&(r, c))
    }

    fn delve_tunnel(&mut self, r1: i32, c1: i32, r2: i32, c2: i32) {
        let (min_r, max_r) = (r1.min(r2), r1.max(r2));
        let (min_c, max_c) = (c1.min(c2), c1.max(c2));
        for r in min_r..=max_r {
            for c in min_c..=max_c {
                // Never stack CORRIDOR onto a room cell; the carved set is
                // its visited marker instead
                if self.word(r, c).contains(CellFlags::ROOM) {
                    self.carved.insert((r, c));
                } else {
                    let word = self.word_mut(r, c);
                    word.remove(CellFlags::ENTRANCE);
                    word.insert(CellFlags::CORRIDOR);
                }
            }
        }
    }

    /// Wall in carved corridors so nothing later carves across them
    fn block_corridor_walls(&mut self) {
        for i in 1..self.n_i {
            let r = i * 2 + 1;
            for j in 1..self.n_j {
                let c = j * 2 + 1;
                if !self.word(r, c).contains(CellFlags::CORRIDOR) {
                    continue;
                }
                for (dr, dc) in [(0, 1), (1, 0), (0, -1), (-1, 0)] {
                    let (nr, nc) = (r + dr, c + dc);
                    if nr >= 0
                        && nr <= self.max_row
                        && nc >= 0
                        && nc <= self.max_col
                        && !self.word(nr, nc).intersects(
                            CellFlags::ROOM | CellFlags::CORRIDOR | CellFlags::ENTRANCE,
                        )
                    {
                        self.word_mut(nr, nc)
                            .insert(CellFlags::BLOCKED | CellFlags::PERIMETER);
                    }
                }
            }
        }
    }

    // ---- stage 6: stairs ----

    fn emplace_stairs(&mut self) {
        let mut ends = self.stair_ends();
        if ends.is_empty() {
            return;
        }
        self.rng.shuffle(&mut ends);

        for i in 0..self.add_stairs {
            if ends.is_empty() {
                break;
            }
            let (r, c, dx, dy) = ends.remove(0);

            // First two alternate down/up, the rest are random
            let kind = match i {
                0 => StairKind::Down,
                1 => StairKind::Up,
                _ => {
                    if self.rng.coin() {
                        StairKind::Down
                    } else {
                        StairKind::Up
                    }
                }
            };
            let flag = match kind {
                StairKind::Down => CellFlags::STAIR_DN,
                StairKind::Up => CellFlags::STAIR_UP,
            };
            self.word_mut(r, c).insert(flag);

            let orientation = if dx != 0 {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            self.stairs.push(Stair {
                x: c,
                y: r,
                dx,
                dy,
                kind,
                orientation,
            });
        }
    }

    /// Corridor dead ends suitable for a stairway, as (r, c, dx, dy) with the
    /// direction vector pointing into the adjoining corridor cell
    fn stair_ends(&self) -> Vec<(i32, i32, i32, i32)> {
        let mut ends = Vec::new();
        for i in 0..self.n_i {
            let r = i * 2 + 1;
            for j in 0..self.n_j {
                let c = j * 2 + 1;
                if self.word(r, c) != CellFlags::CORRIDOR {
                    continue;
                }
                for template in &STAIR_END {
                    if self.matches_template(r, c, template) {
                        let (next_dr, next_dc) = template.next;
                        ends.push((r, c, next_dc, next_dr));
                        break;
                    }
                }
            }
        }
        ends
    }

    /// Template match: `corridor` offsets must be pure corridor cells,
    /// `walled` offsets must not be open space
    fn matches_template(&self, r: i32, c: i32, template: &EndTemplate) -> bool {
        for &(dr, dc) in template.corridor {
            let (nr, nc) = (r + dr, c + dc);
            if !self.in_grid(nr, nc) {
                return false;
            }
            if self.word(nr, nc) != CellFlags::CORRIDOR {
                return false;
            }
        }
        for &(dr, dc) in template.walled {
            let (nr, nc) = (r + dr, c + dc);
            if !self.in_grid(nr, nc) {
                continue;
            }
            if self.word(nr, nc).is_open_space() {
                return false;
            }
        }
        true
    }

    // ---- stage 7: cleanup ----

    fn clean_dungeon(&mut self) {
        if self.remove_deadends > 0 {
            self.collapse_deadends();
        }
        self.clean_disconnected_doors();
        self.fix_doors();
        self.clean_stray_doors();
        self.fill_blocks();
    }

    fn collapse_deadends(&mut self) {
        let p = self.remove_deadends as u32;
        let all = p == 100;

        for i in 0..self.n_i {
            let r = i * 2 + 1;
            for j in 0..self.n_j {
                let c = j * 2 + 1;
                if !self.word(r, c).is_open_space() {
                    continue;
                }
                if self.word(r, c).intersects(CellFlags::STAIRS) {
                    continue;
                }
                if !all && !self.rng.percent(p) {
                    continue;
                }
                if self.adjacent_protected(r, c) {
                    continue;
                }
                self.collapse(r, c);
            }
        }
    }

    /// Collapse a dead-end chain, template match per step, iteratively
    ///
    /// A chain stops at any cell adjacent to a door or a stairway, so
    /// removing dead ends can never seal a room, strand a door with fewer
    /// than two open neighbors, or isolate a stair.
    fn collapse(&mut self, r: i32, c: i32) {
        struct Frame {
            r: i32,
            c: i32,
            next_dir: usize,
        }

        let mut stack = vec![Frame { r, c, next_dir: 0 }];

        while let Some(top) = stack.last_mut() {
            let (r, c) = (top.r, top.c);
            if top.next_dir == 0
                && (!self.word(r, c).is_open_space()
                    || self.word(r, c).intersects(CellFlags::STAIRS)
                    || self.adjacent_protected(r, c))
            {
                stack.pop();
                continue;
            }
            if top.next_dir >= CLOSE_END.len() {
                stack.pop();
                continue;
            }
            let dir_idx = top.next_dir;
            top.next_dir += 1;

            let template = &CLOSE_END[dir_idx];
            if self.matches_template(r, c, template) {
                *self.word_mut(r, c) = CellFlags::empty();
                let (dr, dc) = template.next;
                let (nr, nc) = (r + dr, c + dc);
                if self.in_grid(nr, nc) && stack.len() < MAX_WORKLIST_DEPTH {
                    stack.push(Frame {
                        r: nr,
                        c: nc,
                        next_dir: 0,
                    });
                }
            }
        }
    }

    /// True when an orthogonal neighbor carries a door or stair flag
    fn adjacent_protected(&self, r: i32, c: i32) -> bool {
        for (dr, dc) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let (nr, nc) = (r + dr, c + dc);
            if self.in_grid(nr, nc)
                && self
                    .word(nr, nc)
                    .intersects(CellFlags::DOORSPACE | CellFlags::STAIRS)
            {
                return true;
            }
        }
        false
    }

    /// Demote door cells with fewer than two open/door neighbors back to
    /// plain wall
    fn clean_disconnected_doors(&mut self) {
        for r in 0..=self.n_rows {
            for c in 0..=self.n_cols {
                if !self.word(r, c).intersects(CellFlags::DOORSPACE) {
                    continue;
                }
                let mut connected = 0;
                for (dr, dc) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                    let (nr, nc) = (r + dr, c + dc);
                    if self.in_grid(nr, nc)
                        && self
                            .word(nr, nc)
                            .intersects(CellFlags::OPENSPACE | CellFlags::DOORSPACE)
                    {
                        connected += 1;
                    }
                }
                if connected < 2 {
                    let word = self.word_mut(r, c);
                    word.remove(CellFlags::DOORSPACE);
                    word.insert(CellFlags::PERIMETER);
                }
            }
        }
    }

    /// Rebuild the door registry from the per-room lists, dropping doors
    /// whose cell is no longer open space and mirroring shared doors into
    /// the neighboring room's opposite wall
    fn fix_doors(&mut self) {
        let mut fixed: HashSet<(i32, i32)> = HashSet::new();
        let mut mirrored: Vec<(u16, CardinalDirection, Door)> = Vec::new();
        self.doors.clear();

        for room_idx in 0..self.rooms.len() {
            for dir in CardinalDirection::ALL {
                let Some(doors) = self.rooms[room_idx].doors.get(&dir).cloned() else {
                    continue;
                };
                let mut shiny = Vec::new();

                for door in doors {
                    if !self.in_grid(door.y, door.x) {
                        continue;
                    }
                    if !self.word(door.y, door.x).is_open_space() {
                        continue;
                    }
                    if !fixed.insert((door.x, door.y)) {
                        shiny.push(door);
                        continue;
                    }

                    if let Some(out_id) = door.out_id {
                        mirrored.push((out_id, dir.opposite(), door.clone()));
                    }
                    self.doors.push(door.clone());
                    shiny.push(door);
                }

                if shiny.is_empty() {
                    self.rooms[room_idx].doors.remove(&dir);
                } else {
                    self.rooms[room_idx].doors.insert(dir, shiny);
                }
            }
        }

        // Both rooms agree on shared doors
        for (out_id, dir, door) in mirrored {
            if let Some(out_room) = self.rooms.iter_mut().find(|room| room.id == out_id) {
                let already = out_room
                    .doors
                    .get(&dir)
                    .is_some_and(|doors| doors.iter().any(|d| d.x == door.x && d.y == door.y));
                if !already {
                    out_room.add_door(dir, door);
                }
            }
        }
    }

    /// Demote door-flagged cells the registry no longer knows to entrances
    fn clean_stray_doors(&mut self) {
        let registered: HashSet<(i32, i32)> =
            self.doors.iter().map(|door| (door.x, door.y)).collect();
        for r in 0..=self.n_rows {
            for c in 0..=self.n_cols {
                if self.word(r, c).intersects(CellFlags::DOORSPACE)
                    && !registered.contains(&(c, r))
                {
                    let word = self.word_mut(r, c);
                    word.remove(CellFlags::DOORSPACE);
                    word.insert(CellFlags::ENTRANCE);
                }
            }
        }
    }

    /// Fill every remaining undefined or stray-wall cell as blocked so the
    /// grid has no ambiguous cells
    fn fill_blocks(&mut self) {
        for r in 0..=self.n_rows {
            for c in 0..=self.n_cols {
                let word = self.word(r, c);
                if word.is_empty() {
                    *self.word_mut(r, c) = CellFlags::BLOCKED;
                } else if word.contains(CellFlags::PERIMETER)
                    && !word.intersects(CellFlags::ENTRANCE | CellFlags::DOORSPACE)
                {
                    *self.word_mut(r, c) = CellFlags::BLOCKED;
                } else if word.contains(CellFlags::ENTRANCE)
                    && !word.intersects(CellFlags::OPENSPACE | CellFlags::DOORSPACE)
                {
                    // Entrance strips the corridor carve never reached
                    *self.word_mut(r, c) = CellFlags::BLOCKED;
                }
            }
        }
    }
}
