//! The 3x3 board: pure data, no I/O.

use noughts_protocol::Role;
use thiserror::Error;

pub const SIZE: i32 = 3;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlaceError {
    #[error("cell ({x}, {y}) is out of range")]
    OutOfRange { x: i32, y: i32 },
    #[error("cell ({x}, {y}) is already occupied")]
    Occupied { x: i32, y: i32 },
}

/// Row-major grid, `cells[y][x]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Role>; 3]; 3],
}

// Rows first, then columns, then diagonals. The order only matters for
// test determinism; at most one role can complete a line in a legal game.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(2, 0), (1, 1), (0, 2)],
];

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds-checked cell lookup. Valid clients never need the error arm,
    /// but malformed coordinates must not panic the server.
    pub fn cell(&self, x: i32, y: i32) -> Result<Option<Role>, PlaceError> {
        let (xi, yi) = Self::index(x, y)?;
        Ok(self.cells[yi][xi])
    }

    /// Place `role` at (x, y). No state change on failure.
    pub fn place(&mut self, x: i32, y: i32, role: Role) -> Result<(), PlaceError> {
        let (xi, yi) = Self::index(x, y)?;
        if self.cells[yi][xi].is_some() {
            return Err(PlaceError::Occupied { x, y });
        }
        self.cells[yi][xi] = Some(role);
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_none())
    }

    /// The role holding a completed line, if any.
    pub fn winner(&self) -> Option<Role> {
        for line in LINES {
            let [a, b, c] = line.map(|(x, y)| self.cells[y][x]);
            if let Some(role) = a {
                if b == Some(role) && c == Some(role) {
                    return Some(role);
                }
            }
        }
        None
    }

    pub fn reset(&mut self) {
        self.cells = Default::default();
    }

    fn index(x: i32, y: i32) -> Result<(usize, usize), PlaceError> {
        if (0..SIZE).contains(&x) && (0..SIZE).contains(&y) {
            Ok((x as usize, y as usize))
        } else {
            Err(PlaceError::OutOfRange { x, y })
        }
    }
}
