//! A persistent store of precomputed scores for shallow positions

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::position::Position;
use crate::transposition_table::TranspositionTable;
use crate::{HEIGHT, WIDTH};

/// A book table dispatching over the four supported partial key widths
///
/// The key width is chosen when a book is generated (just wide enough to
/// disambiguate slot sharers at the book's depth) and recorded in the file
/// header, so it is only known at load time.
pub(crate) enum BookTable {
    K1(TranspositionTable<u8>),
    K2(TranspositionTable<u16>),
    K4(TranspositionTable<u32>),
    K8(TranspositionTable<u64>),
}

impl BookTable {
    /// Creates an empty table storing `key_bytes`-wide partial keys
    pub(crate) fn with_key_bytes(key_bytes: u8, log_size: u8) -> Result<Self> {
        Ok(match key_bytes {
            1 => Self::K1(TranspositionTable::new(log_size)),
            2 => Self::K2(TranspositionTable::new(log_size)),
            4 => Self::K4(TranspositionTable::new(log_size)),
            8 => Self::K8(TranspositionTable::new(log_size)),
            other => bail!("invalid partial key size (found: {} bytes)", other),
        })
    }

    fn key_bytes(&self) -> u8 {
        match self {
            Self::K1(_) => 1,
            Self::K2(_) => 2,
            Self::K4(_) => 4,
            Self::K8(_) => 8,
        }
    }

    fn log_size(&self) -> u8 {
        match self {
            Self::K1(table) => table.log_size(),
            Self::K2(table) => table.log_size(),
            Self::K4(table) => table.log_size(),
            Self::K8(table) => table.log_size(),
        }
    }

    pub(crate) fn put(&mut self, key: u64, value: u8) {
        match self {
            Self::K1(table) => table.put(key, value),
            Self::K2(table) => table.put(key, value),
            Self::K4(table) => table.put(key, value),
            Self::K8(table) => table.put(key, value),
        }
    }

    fn get(&self, key: u64) -> u8 {
        match self {
            Self::K1(table) => table.get(key),
            Self::K2(table) => table.get(key),
            Self::K4(table) => table.get(key),
            Self::K8(table) => table.get(key),
        }
    }

    fn read_entries<R: Read>(&mut self, reader: &mut R) -> std::io::Result<()> {
        match self {
            Self::K1(table) => table.read_entries(reader),
            Self::K2(table) => table.read_entries(reader),
            Self::K4(table) => table.read_entries(reader),
            Self::K8(table) => table.read_entries(reader),
        }
    }

    fn write_entries<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Self::K1(table) => table.write_entries(writer),
            Self::K2(table) => table.write_entries(writer),
            Self::K4(table) => table.write_entries(writer),
            Self::K8(table) => table.write_entries(writer),
        }
    }
}

/// An opening book of exact scores for every position up to a fixed depth
///
/// Positions are keyed by their symmetric base 3 key ([`Position::key3`]),
/// so each entry covers a mirrored pair of positions. Stored values are
/// shifted to `score - MIN_SCORE + 1` so that no entry encodes to 0, which
/// marks an empty slot.
///
/// # File Format
/// Little-endian throughout:
///
/// ```comment
/// offset 0  u8  board width
/// offset 1  u8  board height
/// offset 2  u8  max stored position depth
/// offset 3  u8  partial key size in bytes (1, 2, 4 or 8)
/// offset 4  u8  value size in bytes (must be 1)
/// offset 5  u8  log2 of the table size (at most 40)
/// offset 6  key array, next_prime(2^log_size) partial keys
/// ...       value array, next_prime(2^log_size) bytes
/// ```
///
/// [`Position::key3`]: ../position/struct.Position.html#method.key3
pub struct OpeningBook {
    depth: u8,
    table: BookTable,
}

impl OpeningBook {
    pub(crate) fn new(depth: u8, table: BookTable) -> Self {
        Self { depth, table }
    }

    /// Returns the deepest move count stored in the book
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Loads a book from a file, validating the header against the compiled
    /// board dimensions
    ///
    /// Returns `Err` on a missing file, a header mismatch or truncated data;
    /// no partially loaded book is ever produced.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(
            File::open(path).with_context(|| format!("opening book {:?} not readable", path))?,
        );

        let width = reader.read_u8()?;
        let height = reader.read_u8()?;
        let depth = reader.read_u8()?;
        let key_bytes = reader.read_u8()?;
        let value_bytes = reader.read_u8()?;
        let log_size = reader.read_u8()?;

        if width as usize != WIDTH {
            bail!("invalid width (found: {}, expected: {})", width, WIDTH);
        }
        if height as usize != HEIGHT {
            bail!("invalid height (found: {}, expected: {})", height, HEIGHT);
        }
        if depth as usize > WIDTH * HEIGHT {
            bail!("invalid depth (found: {})", depth);
        }
        if value_bytes != 1 {
            bail!("invalid value size (found: {}, expected: 1)", value_bytes);
        }
        if log_size > 40 {
            bail!("invalid log2(size) (found: {})", log_size);
        }

        let mut table = BookTable::with_key_bytes(key_bytes, log_size)?;
        table
            .read_entries(&mut reader)
            .map_err(|_| anyhow!("unable to load book data, file truncated"))?;

        Ok(Self { depth, table })
    }

    /// Saves the book, writing the full key and value arrays
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(
            File::create(path).with_context(|| format!("cannot create book file {:?}", path))?,
        );

        writer.write_u8(WIDTH as u8)?;
        writer.write_u8(HEIGHT as u8)?;
        writer.write_u8(self.depth)?;
        writer.write_u8(self.table.key_bytes())?;
        writer.write_u8(1)?;
        writer.write_u8(self.table.log_size())?;
        self.table.write_entries(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Looks up the stored value for a position
    ///
    /// Returns 0 when the position is deeper than the book or absent. A
    /// non-zero value `v` decodes to the exact score `v + MIN_SCORE - 1`.
    pub fn get(&self, position: &Position) -> u8 {
        if position.nb_moves() > self.depth as usize {
            0
        } else {
            self.table.get(position.key3())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{BookTable, OpeningBook};
    use crate::position::Position;
    use crate::solver::MIN_SCORE;

    fn sample_book() -> OpeningBook {
        let mut table = BookTable::with_key_bytes(2, 8).unwrap();
        for (moves, score) in [("4", 2), ("34", -3), ("445", 1)] {
            let position = Position::from_moves(moves).unwrap();
            table.put(position.key3(), (score - MIN_SCORE + 1) as u8);
        }
        OpeningBook::new(3, table)
    }

    #[test]
    fn lookup_decodes_by_symmetric_key() {
        let book = sample_book();
        let position = Position::from_moves("4").unwrap();
        assert_eq!(book.get(&position), (2 - MIN_SCORE + 1) as u8);
        // a mirrored position shares its entry
        let mirrored = Position::from_moves("54").unwrap();
        assert_eq!(book.get(&mirrored), (-3 - MIN_SCORE + 1) as u8);
        // absent positions read as 0
        assert_eq!(book.get(&Position::from_moves("44").unwrap()), 0);
    }

    #[test]
    fn deep_positions_read_as_absent() {
        let book = sample_book();
        let deep = Position::from_moves("4455").unwrap();
        assert_eq!(book.get(&deep), 0);
    }

    #[test]
    fn round_trips_bit_for_bit() {
        let dir = std::env::temp_dir();
        let first = dir.join("connect4_solver_roundtrip_a.book");
        let second = dir.join("connect4_solver_roundtrip_b.book");

        let book = sample_book();
        book.save(&first).unwrap();
        let loaded = OpeningBook::load(&first).unwrap();
        assert_eq!(loaded.depth(), book.depth());
        let position = Position::from_moves("4").unwrap();
        assert_eq!(loaded.get(&position), book.get(&position));

        loaded.save(&second).unwrap();
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

        fs::remove_file(&first).unwrap();
        fs::remove_file(&second).unwrap();
    }

    #[test]
    fn rejects_corrupt_headers() {
        let dir = std::env::temp_dir();
        let path = dir.join("connect4_solver_corrupt.book");
        sample_book().save(&path).unwrap();
        let good = fs::read(&path).unwrap();

        // wrong board width
        let mut bad = good.clone();
        bad[0] = 9;
        fs::write(&path, &bad).unwrap();
        assert!(OpeningBook::load(&path).is_err());

        // unsupported value size
        let mut bad = good.clone();
        bad[4] = 2;
        fs::write(&path, &bad).unwrap();
        assert!(OpeningBook::load(&path).is_err());

        // oversized table exponent
        let mut bad = good.clone();
        bad[5] = 41;
        fs::write(&path, &bad).unwrap();
        assert!(OpeningBook::load(&path).is_err());

        // truncated data
        let mut bad = good;
        bad.truncate(bad.len() - 1);
        fs::write(&path, &bad).unwrap();
        assert!(OpeningBook::load(&path).is_err());

        fs::remove_file(&path).unwrap();
    }
}
