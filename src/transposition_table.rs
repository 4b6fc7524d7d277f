//! A transposition table to cache the results of Connect 4 game tree searches

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const fn med(min: u64, max: u64) -> u64 {
    (min + max) / 2
}

/// Tells whether `n` has a divisor between `min` (inclusive) and `max` (exclusive)
const fn has_factor(n: u64, min: u64, max: u64) -> bool {
    if min * min > n {
        // no need to search for factors above sqrt(n)
        false
    } else if min + 1 >= max {
        n % min == 0
    } else {
        has_factor(n, min, med(min, max)) || has_factor(n, med(min, max), max)
    }
}

/// Returns the smallest prime greater than or equal to `n`
///
/// Prime table sizes minimise index collisions. `n` must be at least 2.
pub const fn next_prime(n: u64) -> u64 {
    if has_factor(n, 2, n) {
        next_prime(n + 1)
    } else {
        n
    }
}

/// A truncated key as stored in a [`TranspositionTable`]
///
/// The table keeps only the low bits of each 64-bit key to reduce storage;
/// the width is picked per table through this trait. The byteorder-backed
/// serialisation is used by the opening book file format.
///
/// [`TranspositionTable`]: struct.TranspositionTable.html
pub trait PartialKey: Copy + Default + PartialEq {
    /// Width of the stored key in bytes
    const BYTES: u8;

    /// Keeps the low bits of a full key
    fn truncate(key: u64) -> Self;

    /// Reads one little-endian key
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self>;

    /// Writes one little-endian key
    fn write_to<W: Write>(self, writer: &mut W) -> std::io::Result<()>;
}

impl PartialKey for u8 {
    const BYTES: u8 = 1;

    fn truncate(key: u64) -> Self {
        key as u8
    }
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_u8()
    }
    fn write_to<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u8(self)
    }
}

impl PartialKey for u16 {
    const BYTES: u8 = 2;

    fn truncate(key: u64) -> Self {
        key as u16
    }
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_u16::<LittleEndian>()
    }
    fn write_to<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u16::<LittleEndian>(self)
    }
}

impl PartialKey for u32 {
    const BYTES: u8 = 4;

    fn truncate(key: u64) -> Self {
        key as u32
    }
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_u32::<LittleEndian>()
    }
    fn write_to<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u32::<LittleEndian>(self)
    }
}

impl PartialKey for u64 {
    const BYTES: u8 = 8;

    fn truncate(key: u64) -> Self {
        key
    }
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        reader.read_u64::<LittleEndian>()
    }
    fn write_to<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_u64::<LittleEndian>(self)
    }
}

/// A fixed-size cache mapping position keys to one-byte values
///
/// # Notes
/// The table holds `next_prime(2^log_size)` slots indexed by `key mod size`.
/// On collision the previous entry is overwritten. Only the low bits of each
/// key are kept ([`PartialKey`]), so a lookup can return a stale value for a
/// different position; callers must store data that stays safe under such
/// collisions. The value 0 is reserved to mean "no entry".
///
/// [`PartialKey`]: trait.PartialKey.html
pub struct TranspositionTable<K: PartialKey = u32> {
    keys: Vec<K>,
    values: Vec<u8>,
    log_size: u8,
}

impl<K: PartialKey> TranspositionTable<K> {
    /// Creates an empty table with `next_prime(2^log_size)` slots
    pub fn new(log_size: u8) -> Self {
        let size = next_prime(1 << log_size) as usize;
        Self {
            keys: vec![K::default(); size],
            values: vec![0; size],
            log_size,
        }
    }

    /// Returns the number of slots in the table
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns the base 2 log of the slot count the table was created with
    pub fn log_size(&self) -> u8 {
        self.log_size
    }

    fn index(&self, key: u64) -> usize {
        (key % self.keys.len() as u64) as usize
    }

    /// Stores a key-value pair, overwriting any previous entry in the slot
    pub fn put(&mut self, key: u64, value: u8) {
        let pos = self.index(key);
        self.keys[pos] = K::truncate(key);
        self.values[pos] = value;
    }

    /// Retrieves the value stored for a key, or 0 if the slot holds another key
    pub fn get(&self, key: u64) -> u8 {
        let pos = self.index(key);
        if self.keys[pos] == K::truncate(key) {
            self.values[pos]
        } else {
            0
        }
    }

    /// Empties the table
    pub fn reset(&mut self) {
        self.keys.fill(K::default());
        self.values.fill(0);
    }

    /// Streams the key array then the value array from a reader
    pub(crate) fn read_entries<R: Read>(&mut self, reader: &mut R) -> std::io::Result<()> {
        for key in self.keys.iter_mut() {
            *key = K::read_from(reader)?;
        }
        reader.read_exact(&mut self.values)
    }

    /// Streams the key array then the value array to a writer
    pub(crate) fn write_entries<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for key in self.keys.iter() {
            key.write_to(writer)?;
        }
        writer.write_all(&self.values)
    }
}
