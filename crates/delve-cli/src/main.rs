//! Dungeon generator CLI
//!
//! Generates a dungeon from command-line options and prints it either as
//! the glyph text dump or as the full JSON generation result.

use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

use delve_core::{
    CorridorLayout, DungeonLayout, DungeonState, GeneratorConfig, RoomLayout, generate,
};

/// Generate and inspect dungeons
#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(author, version, about = "Deterministic dungeon generator", long_about = None)]
struct Args {
    /// Seed; omit for a random one (the chosen seed is reported)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Grid rows (normalized to an even value)
    #[arg(long, default_value_t = 39)]
    rows: usize,

    /// Grid columns (normalized to an even value)
    #[arg(long, default_value_t = 39)]
    cols: usize,

    /// Minimum room size
    #[arg(long, default_value_t = 3)]
    room_min: usize,

    /// Maximum room size
    #[arg(long, default_value_t = 9)]
    room_max: usize,

    /// Dungeon footprint mask (box/cross/round)
    #[arg(long)]
    dungeon_layout: Option<String>,

    /// Room placement (scattered/packed)
    #[arg(long, default_value = "scattered")]
    room_layout: String,

    /// Corridor straightness (labyrinth/bent/straight)
    #[arg(long, default_value = "bent")]
    corridor_layout: String,

    /// Dead-end removal percentage, 0-100
    #[arg(long, default_value_t = 50)]
    remove_deadends: u8,

    /// Number of stairways to place
    #[arg(long, default_value_t = 2)]
    add_stairs: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Print per-room door diagnostics after the grid
    #[arg(long)]
    diagnostics: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// Glyph grid (P party, # blocked, X perimeter, D door, R room, C corridor)
    Text,
    /// Full generation result as JSON
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let result = match generate(&config) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match args.format {
        Format::Json => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        },
        Format::Text => {
            let state = DungeonState::new(&result);
            for line in state.debug_grid() {
                println!("{line}");
            }
            println!();
            println!(
                "seed {}  rooms {}  doors {}  stairs {}",
                result.seed,
                result.rooms.len(),
                result.doors.len(),
                result.stairs.len()
            );
        }
    }

    if args.diagnostics {
        for diag in &result.diagnostics {
            let failure = diag
                .failure_reason
                .map(|reason| format!("  FAILED: {reason:?}"))
                .unwrap_or_default();
            println!(
                "room {:>3}: sills {:>2}  budget {:>2}  placed {:>2}  rejected {:>2}{failure}",
                diag.room_id,
                diag.initial_sills,
                diag.allocated_doors,
                diag.placed_doors,
                diag.rejected_sills.len(),
            );
        }
    }

    ExitCode::SUCCESS
}

fn build_config(args: &Args) -> Result<GeneratorConfig, String> {
    let dungeon_layout = args
        .dungeon_layout
        .as_deref()
        .map(|name| {
            DungeonLayout::from_str(name)
                .map_err(|_| format!("unknown dungeon layout: {name}"))
        })
        .transpose()?;
    let room_layout = RoomLayout::from_str(&args.room_layout)
        .map_err(|_| format!("unknown room layout: {}", args.room_layout))?;
    let corridor_layout = CorridorLayout::from_str(&args.corridor_layout)
        .map_err(|_| format!("unknown corridor layout: {}", args.corridor_layout))?;

    Ok(GeneratorConfig {
        seed: args.seed,
        n_rows: args.rows,
        n_cols: args.cols,
        dungeon_layout,
        room_min: args.room_min,
        room_max: args.room_max,
        room_layout,
        corridor_layout,
        remove_deadends: args.remove_deadends,
        add_stairs: args.add_stairs,
        ..GeneratorConfig::default()
    })
}
