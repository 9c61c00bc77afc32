//! Fixed-size cell grid with bounds-checked access

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFlags};

/// Rectangular grid of cells, indexed by world coordinates (x = column,
/// y = row). All access is bounds-checked; out-of-range queries return `None`
/// rather than panicking so a long-lived session can survive bad input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    /// Create a grid with every cell set to the empty word
    pub fn new(width: usize, height: usize) -> Self {
        let cells = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| Cell::new(CellFlags::empty(), x as i32, y as i32))
                    .collect()
            })
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    /// Wrap a raw terrain matrix (rows of words) into cells
    pub fn from_words(words: &[Vec<CellFlags>]) -> Self {
        let height = words.len();
        let width = words.first().map_or(0, Vec::len);
        let cells = words
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, &flags)| Cell::new(flags, x as i32, y as i32))
                    .collect()
            })
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Get cell at world coordinates
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&self.cells[y as usize][x as usize])
    }

    /// Get mutable cell at world coordinates
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        Some(&mut self.cells[y as usize][x as usize])
    }

    /// Replace the cell at world coordinates; ignored when out of bounds
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) {
        if self.in_bounds(x, y) {
            self.cells[y as usize][x as usize] = cell;
        }
    }

    /// Valid neighbor positions in the given directions
    pub fn neighbors(&self, x: i32, y: i32, directions: &[(i32, i32)]) -> Vec<(i32, i32)> {
        directions
            .iter()
            .map(|&(dx, dy)| (x + dx, y + dy))
            .filter(|&(nx, ny)| self.in_bounds(nx, ny))
            .collect()
    }

    /// Iterate all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flat_map(|row| row.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut().flat_map(|row| row.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_checking() {
        let grid = Grid::new(10, 8);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 8);
        assert!(grid.get(0, 0).is_some());
        assert!(grid.get(9, 7).is_some());
        assert!(grid.get(10, 0).is_none());
        assert!(grid.get(0, 8).is_none());
        assert!(grid.get(-1, 0).is_none());
    }

    #[test]
    fn test_cells_know_their_position() {
        let grid = Grid::new(4, 4);
        let cell = grid.get(2, 3).unwrap();
        assert_eq!(cell.position(), (2, 3));
    }

    #[test]
    fn test_from_words() {
        let words = vec![
            vec![CellFlags::BLOCKED, CellFlags::ROOM],
            vec![CellFlags::CORRIDOR, CellFlags::PERIMETER],
        ];
        let grid = Grid::from_words(&words);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 2);
        assert!(grid.get(1, 0).unwrap().is_room());
        assert!(grid.get(0, 1).unwrap().is_corridor());
    }

    #[test]
    fn test_neighbors_clipped_at_edges() {
        let grid = Grid::new(3, 3);
        let orthogonal = [(0, -1), (0, 1), (1, 0), (-1, 0)];
        assert_eq!(grid.neighbors(0, 0, &orthogonal).len(), 2);
        assert_eq!(grid.neighbors(1, 1, &orthogonal).len(), 4);
    }
}
