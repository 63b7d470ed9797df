//! Mine Grid and Reveal State
//!
//! Square boolean matrices stored row-major. The mine grid is fixed at
//! session start; the reveal state only ever flips cells from hidden to
//! shown.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, GridConfig};
use crate::core::rng::SessionRng;

/// A cell coordinate known to be inside its grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
}

impl Cell {
    /// Create a cell coordinate.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Convert raw client coordinates into a cell, if inside a `side` x `side` grid.
pub fn cell_in_bounds(side: usize, row: i64, col: i64) -> Option<Cell> {
    let row = usize::try_from(row).ok()?;
    let col = usize::try_from(col).ok()?;
    (row < side && col < side).then_some(Cell { row, col })
}

/// Immutable mine layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    side: usize,
    mines: Vec<bool>,
}

impl Grid {
    /// Build a grid with mines at the given cells.
    ///
    /// Out-of-range cells are ignored; duplicates collapse into one mine.
    pub fn from_mines(side: usize, cells: &[Cell]) -> Self {
        let mut mines = vec![false; side * side];
        for cell in cells {
            if cell.row < side && cell.col < side {
                mines[cell.row * side + cell.col] = true;
            }
        }
        Self { side, mines }
    }

    /// Side length.
    #[inline]
    pub fn side_length(&self) -> usize {
        self.side
    }

    /// Whether the cell holds a mine.
    #[inline]
    pub fn is_mine(&self, cell: Cell) -> bool {
        self.mines[cell.row * self.side + cell.col]
    }

    /// Total mines placed.
    pub fn mine_count(&self) -> usize {
        self.mines.iter().filter(|m| **m).count()
    }

    /// Bounds-checked coordinate conversion.
    pub fn cell_at(&self, row: i64, col: i64) -> Option<Cell> {
        cell_in_bounds(self.side, row, col)
    }

    /// Row-major nested copy for the wire.
    pub fn rows(&self) -> Vec<Vec<bool>> {
        if self.side == 0 {
            return Vec::new();
        }
        self.mines.chunks(self.side).map(<[bool]>::to_vec).collect()
    }
}

/// Which cells have been revealed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealState {
    side: usize,
    revealed: Vec<bool>,
}

impl RevealState {
    /// All-hidden state for a `side` x `side` grid.
    pub fn hidden(side: usize) -> Self {
        Self {
            side,
            revealed: vec![false; side * side],
        }
    }

    /// Whether the cell is shown.
    #[inline]
    pub fn is_revealed(&self, cell: Cell) -> bool {
        self.revealed[cell.row * self.side + cell.col]
    }

    /// Reveal a cell. Returns false if it was already shown.
    pub fn reveal(&mut self, cell: Cell) -> bool {
        let slot = &mut self.revealed[cell.row * self.side + cell.col];
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    /// Number of shown cells.
    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|r| **r).count()
    }

    /// Row-major nested copy for the wire.
    pub fn rows(&self) -> Vec<Vec<bool>> {
        if self.side == 0 {
            return Vec::new();
        }
        self.revealed.chunks(self.side).map(<[bool]>::to_vec).collect()
    }
}

/// Place `config.mine_count` distinct mines uniformly at random.
///
/// Samples cells until enough distinct ones are found. Terminates because
/// the config guarantees at least one cell stays free.
pub fn create_grid(config: &GridConfig, rng: &mut SessionRng) -> Result<Grid, ConfigError> {
    config.validate()?;

    let side = config.side_length;
    let mut mines = vec![false; config.cell_count()];
    let mut placed = 0;

    while placed < config.mine_count {
        let row = rng.next_index(side);
        let col = rng.next_index(side);
        let slot = &mut mines[row * side + col];
        if !*slot {
            *slot = true;
            placed += 1;
        }
    }

    Ok(Grid { side, mines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_grid_has_three_mines() {
        let mut rng = SessionRng::new(42);
        let grid = create_grid(&GridConfig::default(), &mut rng).unwrap();

        assert_eq!(grid.side_length(), 5);
        assert_eq!(grid.mine_count(), 3);
        assert_eq!(grid.rows().len(), 5);
        assert!(grid.rows().iter().all(|row| row.len() == 5));
    }

    #[test]
    fn test_thousand_grids_always_three_mines() {
        let config = GridConfig::default();
        for _ in 0..1000 {
            let mut rng = SessionRng::new(rand::random());
            let grid = create_grid(&config, &mut rng).unwrap();
            assert_eq!(grid.mine_count(), 3);
        }
    }

    #[test]
    fn test_nearly_full_grid_terminates() {
        let config = GridConfig::new(3, 8);
        let mut rng = SessionRng::new(7);
        let grid = create_grid(&config, &mut rng).unwrap();
        assert_eq!(grid.mine_count(), 8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut rng = SessionRng::new(1);
        let result = create_grid(&GridConfig::new(5, 25), &mut rng);
        assert!(matches!(result, Err(ConfigError::TooManyMines { .. })));
    }

    #[test]
    fn test_same_seed_same_layout() {
        let config = GridConfig::default();
        let a = create_grid(&config, &mut SessionRng::new(99)).unwrap();
        let b = create_grid(&config, &mut SessionRng::new(99)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_mines() {
        let grid = Grid::from_mines(5, &[Cell::new(0, 0), Cell::new(4, 4), Cell::new(0, 0)]);
        assert_eq!(grid.mine_count(), 2);
        assert!(grid.is_mine(Cell::new(4, 4)));
        assert!(!grid.is_mine(Cell::new(2, 2)));
    }

    #[test]
    fn test_cell_bounds() {
        let grid = Grid::from_mines(5, &[]);
        assert_eq!(grid.cell_at(4, 0), Some(Cell::new(4, 0)));
        assert_eq!(grid.cell_at(5, 0), None);
        assert_eq!(grid.cell_at(0, -1), None);
        assert_eq!(grid.cell_at(-3, 2), None);
    }

    #[test]
    fn test_reveal_once() {
        let mut state = RevealState::hidden(5);
        let cell = Cell::new(1, 3);

        assert!(state.reveal(cell));
        assert!(!state.reveal(cell));
        assert!(state.is_revealed(cell));
        assert_eq!(state.revealed_count(), 1);
        assert!(state.rows()[1][3]);
    }

    proptest! {
        #[test]
        fn prop_mine_count_exact(seed in any::<u64>(), side in 1usize..12, fill in 0.0f64..1.0) {
            let cells = side * side;
            let mine_count = ((cells - 1) as f64 * fill) as usize;
            let config = GridConfig::new(side, mine_count);

            let grid = create_grid(&config, &mut SessionRng::new(seed)).unwrap();
            prop_assert_eq!(grid.mine_count(), mine_count);
        }
    }
}
