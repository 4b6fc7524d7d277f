//! An agent to solve the game of Connect 4

use std::path::Path;

use static_assertions::const_assert;

use crate::move_sorter::MoveSorter;
use crate::opening_book::OpeningBook;
use crate::position::Position;
use crate::transposition_table::TranspositionTable;
use crate::{HEIGHT, WIDTH};

/// The minimum possible score of a position
pub const MIN_SCORE: i32 = -((WIDTH * HEIGHT) as i32) / 2 + 3;
/// The maximum possible score of a position
pub const MAX_SCORE: i32 = ((WIDTH * HEIGHT) as i32 + 1) / 2 - 3;

/// Score reported by [`Solver::analyze`] for unplayable columns
///
/// [`Solver::analyze`]: struct.Solver.html#method.analyze
pub const INVALID_MOVE: i32 = -1000;

// base 2 log of the search transposition table size
const LOG_TABLE_SIZE: u8 = 24;

// both bound encodings must fit in a byte, clear of the 0 "empty" sentinel
const_assert!(MAX_SCORE + MAX_SCORE - 2 * MIN_SCORE + 2 <= u8::MAX as i32);

/// Returns the column exploration order, starting with the centre columns
///
/// The middle columns take part in more alignments and are usually the
/// better moves. For a width of 7 the order is `[3, 2, 4, 1, 5, 0, 6]`.
pub const fn column_order() -> [usize; WIDTH] {
    let mut order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        order[i] = (WIDTH as i32 / 2 + (1 - 2 * (i as i32 % 2)) * (i as i32 + 1) / 2) as usize;
        i += 1;
    }
    order
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations
/// to find the mathematically exact value of any position, thus 'solving'
/// the game:
/// - negamax with alpha-beta pruning over non-losing moves only
/// - score-based move ordering to explore stronger moves first
/// - a transposition table caching score bounds of visited positions
/// - an optional opening book of precomputed scores for shallow positions
/// - an iteratively narrowed sequence of null-window searches
///
/// # Position Scoring
/// A position is scored by how far a forced win is from the end of the game.
/// The score is positive if the side to move wins, 1 when they win with
/// their final stone, 2 with their second to last stone, and so on; losses
/// mirror this negatively and a draw scores 0.
pub struct Solver {
    /// The number of nodes searched by this `Solver` so far (for diagnostics only)
    node_count: usize,
    table: TranspositionTable,
    book: Option<OpeningBook>,
}

impl Solver {
    const COLUMN_ORDER: [usize; WIDTH] = column_order();

    /// Creates a new `Solver` with an empty transposition table and no
    /// opening book
    pub fn new() -> Self {
        Self {
            node_count: 0,
            table: TranspositionTable::new(LOG_TABLE_SIZE),
            book: None,
        }
    }

    /// Adds an opening book to an existing `Solver`
    pub fn with_book(mut self, book: OpeningBook) -> Self {
        self.book = Some(book);
        self
    }

    /// Attempts to load an opening book from a file
    ///
    /// Returns whether the book was installed. On failure the cause is
    /// reported to stderr once and the solver keeps searching without a
    /// book, which is slower but still exact.
    pub fn load_book(&mut self, path: &Path) -> bool {
        match OpeningBook::load(path) {
            Ok(book) => {
                self.book = Some(book);
                true
            }
            Err(err) => {
                eprintln!("unable to load opening book: {:#}", err);
                false
            }
        }
    }

    /// Returns the number of nodes searched since the last reset
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Clears the node counter and the transposition table
    pub fn reset(&mut self) {
        self.node_count = 0;
        self.table.reset();
    }

    /// Computes the exact score of a position (see [Position Scoring])
    ///
    /// When `weak` is true only the win/draw/loss outcome is established:
    /// the result is merely guaranteed to share its sign with the exact
    /// score. Weak solves are considerably faster.
    ///
    /// [Position Scoring]: #position-scoring
    pub fn solve(&mut self, position: &Position, weak: bool) -> i32 {
        // the search assumes no immediate win exists, handle it here
        if position.can_win_next() {
            return ((WIDTH * HEIGHT + 1 - position.nb_moves()) / 2) as i32;
        }

        let (mut lo, mut hi) = if weak {
            (-1, 1)
        } else {
            (
                -(((WIDTH * HEIGHT - position.nb_moves()) / 2) as i32),
                ((WIDTH * HEIGHT + 1 - position.nb_moves()) / 2) as i32,
            )
        };

        // iteratively narrow the window with null-window searches
        while lo < hi {
            let mut med = lo + (hi - lo) / 2;
            // step exponentially towards zero first, true scores are
            // usually of small magnitude
            if med <= 0 && lo / 2 < med {
                med = lo / 2;
            } else if med >= 0 && hi / 2 > med {
                med = hi / 2;
            }

            // r indicates whether the true score is above or below med
            let r = self.negamax(position, med, med + 1);
            if r <= med {
                hi = r;
            } else {
                lo = r;
            }
        }
        lo
    }

    /// Scores every column of a position by solving each playable move
    ///
    /// Unplayable columns report [`INVALID_MOVE`].
    ///
    /// [`INVALID_MOVE`]: constant.INVALID_MOVE.html
    pub fn analyze(&mut self, position: &Position, weak: bool) -> [i32; WIDTH] {
        let mut scores = [INVALID_MOVE; WIDTH];
        for column in 0..WIDTH {
            if !position.can_play(column) {
                continue;
            }
            if position.is_winning_move(column) {
                scores[column] = ((WIDTH * HEIGHT + 1 - position.nb_moves()) / 2) as i32;
            } else {
                let mut next = *position;
                next.play_col(column);
                scores[column] = -self.solve(&next, weak);
            }
        }
        scores
    }

    /// Performs the recursive game tree search
    ///
    /// Returns the exact score when it lies within the `(alpha, beta)`
    /// window, otherwise a bound on the score from the side of the window
    /// that was crossed. The position must not allow an immediate win.
    fn negamax(&mut self, position: &Position, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        debug_assert!(!position.can_win_next());

        // no squares left, drawn game
        if position.nb_moves() == WIDTH * HEIGHT {
            return 0;
        }

        let non_losing = position.possible_non_losing_moves();
        if non_losing == 0 {
            // the opponent wins next move whatever is played
            return -(((WIDTH * HEIGHT - position.nb_moves()) / 2) as i32);
        }

        if position.nb_moves() >= WIDTH * HEIGHT - 2 {
            // neither side can complete an alignment with the stones left
            return 0;
        }
        self.node_count += 1;

        // the opponent cannot win next move, raising the score floor
        let lo_bound = -(((WIDTH * HEIGHT - 2 - position.nb_moves()) / 2) as i32);
        if alpha < lo_bound {
            alpha = lo_bound;
            if alpha >= beta {
                return alpha;
            }
        }
        // no immediate win exists either, lowering the ceiling
        let hi_bound = ((WIDTH * HEIGHT - 1 - position.nb_moves()) / 2) as i32;
        if beta > hi_bound {
            beta = hi_bound;
            if alpha >= beta {
                return beta;
            }
        }

        // fetch any cached bound on the score
        let key = position.key();
        let value = self.table.get(key) as i32;
        if value != 0 {
            if value > MAX_SCORE - MIN_SCORE + 1 {
                // a lower bound was stored
                let lo_bound = value + 2 * MIN_SCORE - MAX_SCORE - 2;
                if alpha < lo_bound {
                    alpha = lo_bound;
                    if alpha >= beta {
                        return alpha;
                    }
                }
            } else {
                // an upper bound was stored
                let hi_bound = value + MIN_SCORE - 1;
                if beta > hi_bound {
                    beta = hi_bound;
                    if alpha >= beta {
                        return beta;
                    }
                }
            }
        }

        // book entries are exact scores, not bounds
        if let Some(book) = &self.book {
            let value = book.get(position) as i32;
            if value != 0 {
                return value + MIN_SCORE - 1;
            }
        }

        let mut moves = MoveSorter::new();
        // feeding the sorter edges-first reduces the insertion work, as
        // those moves tend to score lower
        for i in (0..WIDTH).rev() {
            let column = Self::COLUMN_ORDER[i];
            let candidate = non_losing & Position::column_mask(column);
            if candidate != 0 {
                moves.add(candidate, position.move_score(candidate));
            }
        }

        for move_bitmap in moves {
            let mut next = *position;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, -beta, -alpha);

            // a perfect opponent will never allow a branch above beta
            if score >= beta {
                debug_assert!(score + MAX_SCORE - 2 * MIN_SCORE + 2 > 0);
                // save a lower bound of the score
                self.table
                    .put(key, (score + MAX_SCORE - 2 * MIN_SCORE + 2) as u8);
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        debug_assert!(alpha - MIN_SCORE + 1 > 0);
        // save an upper bound, offset by one so 0 keeps meaning "empty"
        self.table.put(key, (alpha - MIN_SCORE + 1) as u8);
        alpha
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_out_column_order() {
        assert_eq!(column_order(), [3, 2, 4, 1, 5, 0, 6]);
    }

    #[test]
    fn score_range() {
        assert_eq!(MIN_SCORE, -18);
        assert_eq!(MAX_SCORE, 18);
    }
}
