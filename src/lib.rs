//! A perfect agent for scoring positions of the board game 'Connect 4'
//!
//! The solver computes the exact game-theoretic value of any legal position
//! with an optimised game tree search, optionally front-ended by a
//! precomputed opening book.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{position::Position, solver::Solver};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let position = Position::from_moves("112233")?;
//! let mut solver = Solver::new();
//!
//! // the first player wins with their fourth stone
//! assert_eq!(solver.solve(&position, false), 18);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod transposition_table;

pub mod position;

pub mod move_sorter;

pub mod opening_book;

pub mod solver;

pub mod book_generator;

mod test;

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
