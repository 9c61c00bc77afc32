//! Generator invariants checked across random seeds and dimensions

use proptest::prelude::*;

use delve_core::{CellFlags, CorridorLayout, GeneratorConfig, RoomLayout, generate};

fn arb_config() -> impl Strategy<Value = GeneratorConfig> {
    (
        any::<u64>(),
        21usize..=45,
        21usize..=45,
        prop_oneof![Just(RoomLayout::Scattered), Just(RoomLayout::Packed)],
        prop_oneof![
            Just(CorridorLayout::Labyrinth),
            Just(CorridorLayout::Bent),
            Just(CorridorLayout::Straight),
        ],
        0u8..=100,
    )
        .prop_map(
            |(seed, n_rows, n_cols, room_layout, corridor_layout, remove_deadends)| {
                GeneratorConfig {
                    seed: Some(seed),
                    n_rows,
                    n_cols,
                    room_layout,
                    corridor_layout,
                    remove_deadends,
                    ..Default::default()
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_room_and_corridor_are_exclusive(config in arb_config()) {
        let result = generate(&config).unwrap();
        for row in &result.grid {
            for &word in row {
                prop_assert!(
                    !(word.contains(CellFlags::ROOM) && word.contains(CellFlags::CORRIDOR))
                );
                prop_assert_eq!(
                    word.room_id() != 0,
                    word.contains(CellFlags::ROOM)
                );
            }
        }
    }

    #[test]
    fn prop_cleanup_leaves_no_undefined_cells(config in arb_config()) {
        let result = generate(&config).unwrap();
        for row in &result.grid {
            for &word in row {
                prop_assert!(!word.is_empty());
            }
        }
    }

    #[test]
    fn prop_surviving_doors_stay_connected(config in arb_config()) {
        let result = generate(&config).unwrap();
        let height = result.grid.len() as i32;
        let width = result.grid[0].len() as i32;

        for (y, row) in result.grid.iter().enumerate() {
            for (x, &word) in row.iter().enumerate() {
                if !word.intersects(CellFlags::DOORSPACE) {
                    continue;
                }
                let mut open = 0;
                for (dx, dy) in [(0i32, -1i32), (0, 1), (1, 0), (-1, 0)] {
                    let (nx, ny) = (x as i32 + dx, y as i32 + dy);
                    if nx < 0 || ny < 0 || nx >= width || ny >= height {
                        continue;
                    }
                    let neighbor = result.grid[ny as usize][nx as usize];
                    if neighbor.intersects(CellFlags::OPENSPACE | CellFlags::DOORSPACE) {
                        open += 1;
                    }
                }
                prop_assert!(open >= 2, "door at ({}, {}) has {} open neighbors", x, y, open);
            }
        }
    }

    #[test]
    fn prop_stair_count_never_exceeds_request(config in arb_config()) {
        let result = generate(&config).unwrap();
        prop_assert!(result.stairs.len() <= 2);
        for stair in &result.stairs {
            let word = result.grid[stair.y as usize][stair.x as usize];
            prop_assert!(word.intersects(CellFlags::STAIRS));
        }
    }

    #[test]
    fn prop_rooms_stay_inside_the_grid(config in arb_config()) {
        let result = generate(&config).unwrap();
        for room in &result.rooms {
            prop_assert!(room.north >= 1);
            prop_assert!(room.west >= 1);
            prop_assert!((room.south as usize) < result.n_rows);
            prop_assert!((room.east as usize) < result.n_cols);
            prop_assert_eq!(room.area, room.width * room.height);
        }
    }

    #[test]
    fn prop_generation_is_deterministic(config in arb_config()) {
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        prop_assert_eq!(a, b);
    }
}
