//! A compact, computationally efficient bit array representation of a Connect 4 board

use std::fmt;

use anyhow::{anyhow, Result};

use crate::{HEIGHT, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// A Connect 4 position
///
/// # Notes
/// Storing the state of the board in the bits of an integer allows parallel
/// computation of game conditions with bitwise operations. A 7x6 Connect 4
/// board fits into the bits of a `u64` like so:
///
/// ```comment
/// Column:  0  1  2  3  4  5  6
///
///          6  13 20 27 34 41 48
///          ____________________
///       5 |05 12 19 26 33 40 47|
///       4 |04 11 18 25 32 39 46|
///       3 |03 10 17 24 31 38 45|
///       2 |02 09 16 23 30 37 44|
///       1 |01 08 15 22 29 36 43|
/// Rows: 0 |00 07 14 21 28 35 42|
/// ```
/// Where bit index 00 is the least significant bit. The extra row of bits on
/// top of the board identifies full columns and prevents bits overflowing into
/// the next column.
///
/// # Internal Representation
/// Two `u64`s are used for computational efficiency. `mask` holds a bit for
/// every square containing a stone of either colour, and `current` holds the
/// stones of the side to move. After every move the two roles swap, so all
/// functions are relative to the player whose turn it is.
///
/// # Board Keys
/// `current + mask` places an extra bit on top of the last stone of each
/// column, which identifies every empty square without ambiguity. The sum is
/// therefore a unique fingerprint of the position and indexes the
/// [transposition table]. A second, symmetric fingerprint ([`Position::key3`])
/// encodes each column bottom-up in base 3 and collapses mirrored positions
/// onto one key; it is used by the opening book.
///
/// [transposition table]: ../transposition_table/struct.TranspositionTable.html
#[derive(Copy, Clone)]
pub struct Position {
    // stones of the side to move
    current: u64,
    // stones of both sides
    mask: u64,
    moves: usize,
}

impl Position {
    /// Creates a new, empty position
    pub fn new() -> Self {
        Self {
            current: 0,
            mask: 0,
            moves: 0,
        }
    }

    /// Creates a position from a string of 1-indexed moves
    ///
    /// # Notes
    /// The move string is a sequence of columns played, indexed from 1
    /// (meaning `"0"` is an invalid move)
    ///
    /// Returns `Err` if the move string represents an invalid position.
    /// Invalid positions can contain moves outside the column range,
    /// overfilled columns and winning positions for either player
    ///
    /// # Example
    /// ```
    /// # use std::error::Error;
    /// # fn main() -> Result<(), Box<dyn Error>> {
    /// use connect4_solver::position::Position;
    ///
    /// // columns in move strings are 1-indexed
    /// let position = Position::from_moves("112233")?;
    ///
    /// // columns as integers are 0-indexed
    /// assert!(position.is_winning_move(3));
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut position = Self::new();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    let column = column - 1;
                    if !position.can_play(column) {
                        return Err(anyhow!("invalid move, column {} full", column + 1));
                    }
                    // refuse sequences passing through a decided game
                    if position.is_winning_move(column) {
                        return Err(anyhow!("invalid position, game is over"));
                    }
                    position.play_col(column);
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(position)
    }

    /// Creates a position from its constituent bit masks and move counter
    /// (see [Internal Representation])
    ///
    /// The caller must supply a legal board; this is the entry point for
    /// hosts that track the game state themselves.
    ///
    /// [Internal Representation]: #internal-representation
    pub fn from_parts(current: u64, mask: u64, moves: usize) -> Self {
        Self {
            current,
            mask,
            moves,
        }
    }

    /// Plays a prefix of a sequence of 1-indexed moves, stopping at the first
    /// move that is unparsable, unplayable or immediately winning
    ///
    /// Returns the number of moves actually played, so a caller can compare
    /// against the sequence length to detect a partial replay.
    pub fn play_seq<S: AsRef<str>>(&mut self, seq: S) -> usize {
        let mut played = 0;
        for column_char in seq.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    let column = column - 1;
                    if !self.can_play(column) || self.is_winning_move(column) {
                        return played;
                    }
                    self.play_col(column);
                    played += 1;
                }
                _ => return played,
            }
        }
        played
    }

    /// Accesses the internal mask of the current player's stones
    pub fn current_position(&self) -> u64 {
        self.current
    }

    /// Accesses the internal mask of stones on the whole board
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Returns the number of moves played since the beginning of the game
    pub fn nb_moves(&self) -> usize {
        self.moves
    }

    /// Returns a mask of the top square of a given column
    pub const fn top_mask_col(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    /// Returns a mask of the bottom square of a given column
    pub const fn bottom_mask_col(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    /// Returns a mask of the given column
    pub const fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// Returns whether a column is a legal move
    pub fn can_play(&self, column: usize) -> bool {
        Self::top_mask_col(column) & self.mask == 0
    }

    /// Advances the game by applying a move bitmap and switching players
    ///
    /// The bitmap must contain a single bit in a playable square.
    pub fn play(&mut self, move_bitmap: u64) {
        // switch the current player
        self.current ^= self.mask;
        // add a stone of the previous player to the played square
        self.mask |= move_bitmap;
        self.moves += 1;
    }

    /// Drops a stone into the lowest empty square of a playable column
    pub fn play_col(&mut self, column: usize) {
        self.play((self.mask + Self::bottom_mask_col(column)) & Self::column_mask(column));
    }

    /// Returns whether a playable column completes an alignment for the
    /// current player
    pub fn is_winning_move(&self, column: usize) -> bool {
        self.winning_position() & self.possible() & Self::column_mask(column) != 0
    }

    /// Returns whether the current player has any immediately winning move
    pub fn can_win_next(&self) -> bool {
        self.winning_position() & self.possible() != 0
    }

    /// Returns a mask of all possible moves in the position
    pub fn possible(&self) -> u64 {
        (self.mask + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Returns a bitmap of all moves that don't give the opponent an immediate win
    ///
    /// # Warning
    /// This function is only meaningful when the current player cannot win
    /// directly; a winning move may be missed in favour of blocking the
    /// opponent.
    pub fn possible_non_losing_moves(&self) -> u64 {
        debug_assert!(!self.can_win_next());
        let mut possible_moves = self.possible();
        let opponent_win = self.opponent_winning_position();
        let forced_moves = possible_moves & opponent_win;

        if forced_moves != 0 {
            // with more than one forced move the opponent cannot be stopped
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves;
            }
        }
        // avoid playing below an opponent's winning square
        possible_moves & !(opponent_win >> 1)
    }

    /// Scores a move bitmap by counting the winning squares the current
    /// player would own after playing it
    pub fn move_score(&self, move_bitmap: u64) -> u32 {
        Self::compute_winning_position(self.current | move_bitmap, self.mask).count_ones()
    }

    /// Returns a bitmap of open squares that complete an alignment for the
    /// current player
    pub fn winning_position(&self) -> u64 {
        Self::compute_winning_position(self.current, self.mask)
    }

    /// Returns a bitmap of open squares that complete an alignment for the opponent
    pub fn opponent_winning_position(&self) -> u64 {
        Self::compute_winning_position(self.current ^ self.mask, self.mask)
    }

    /// Returns the unique key of the position (see [Board Keys])
    ///
    /// [Board Keys]: #board-keys
    pub fn key(&self) -> u64 {
        self.current + self.mask
    }

    /// Returns the symmetric base 3 key of the position (see [Board Keys])
    ///
    /// Each column contributes its stones bottom-up, digit 1 for the side to
    /// move and 2 for the opponent, followed by a 0 separator. The key is
    /// computed over the columns left-to-right and right-to-left and the
    /// minimum taken, so mirrored positions share a key. The trailing
    /// separator is always 0 and is dropped by the final division.
    ///
    /// [Board Keys]: #board-keys
    pub fn key3(&self) -> u64 {
        let mut key_forward = 0;
        for column in 0..WIDTH {
            self.partial_key3(&mut key_forward, column);
        }
        let mut key_reverse = 0;
        for column in (0..WIDTH).rev() {
            self.partial_key3(&mut key_reverse, column);
        }
        key_forward.min(key_reverse) / 3
    }

    /// Appends one column of base 3 digits to a partial key
    fn partial_key3(&self, key: &mut u64, column: usize) {
        let mut square = Self::bottom_mask_col(column);
        while square & self.mask != 0 {
            *key *= 3;
            if square & self.current != 0 {
                *key += 1;
            } else {
                *key += 2;
            }
            square <<= 1;
        }
        *key *= 3;
    }

    /// Returns a bitmap of the open squares completing an alignment for the
    /// player owning the stones of `position`
    ///
    /// The four shift distances cover the vertical, horizontal and both
    /// diagonal alignment directions of the bit layout.
    fn compute_winning_position(position: u64, mask: u64) -> u64 {
        // vertical
        // tops of vertical 3-alignments
        let mut r = (position << 1) & (position << 2) & (position << 3);

        // horizontal
        let mut p = (position << (HEIGHT + 1)) & (position << (2 * (HEIGHT + 1)));
        // right ends of 3-alignments
        r |= p & (position << (3 * (HEIGHT + 1)));
        // holes of the type O O _ O
        r |= p & (position >> (HEIGHT + 1));
        p = (position >> (HEIGHT + 1)) & (position >> (2 * (HEIGHT + 1)));
        // holes of the type O _ O O
        r |= p & (position << (HEIGHT + 1));
        // left ends of 3-alignments
        r |= p & (position >> (3 * (HEIGHT + 1)));

        // diagonal /
        p = (position << HEIGHT) & (position << (2 * HEIGHT));
        r |= p & (position << (3 * HEIGHT));
        r |= p & (position >> HEIGHT);
        p = (position >> HEIGHT) & (position >> (2 * HEIGHT));
        r |= p & (position << HEIGHT);
        r |= p & (position >> (3 * HEIGHT));

        // diagonal \
        p = (position << (HEIGHT + 2)) & (position << (2 * (HEIGHT + 2)));
        r |= p & (position << (3 * (HEIGHT + 2)));
        r |= p & (position >> (HEIGHT + 2));
        p = (position >> (HEIGHT + 2)) & (position >> (2 * (HEIGHT + 2)));
        r |= p & (position << (HEIGHT + 2));
        r |= p & (position >> (3 * (HEIGHT + 2)));

        r & (static_masks::full_board_mask() ^ mask)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    /// Renders the board top row first, `x` for the first player's stones,
    /// `o` for the second player's and `.` for empty squares
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (current, opponent) = if self.moves % 2 == 0 {
            ('x', 'o')
        } else {
            ('o', 'x')
        };
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let square = 1u64 << (row + column * (HEIGHT + 1));
                if self.mask & square == 0 {
                    write!(f, ".")?;
                } else if self.current & square != 0 {
                    write!(f, "{}", current)?;
                } else {
                    write!(f, "{}", opponent)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
