//! Offline tooling to enumerate opening positions and assemble a book

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::opening_book::{BookTable, OpeningBook};
use crate::position::Position;
use crate::solver::{MAX_SCORE, MIN_SCORE};
use crate::WIDTH;

/// Writes the move sequence of every unique position up to `depth` moves,
/// one per line
///
/// Mirrored positions count once (deduplicated on [`Position::key3`]) and
/// sequences passing through a finished game are pruned. The empty position
/// contributes an empty line.
///
/// [`Position::key3`]: ../position/struct.Position.html#method.key3
pub fn enumerate<W: Write>(depth: usize, out: &mut W) -> io::Result<()> {
    let mut visited = HashSet::new();
    let mut seq = String::with_capacity(depth);
    explore(&Position::new(), &mut seq, depth, &mut visited, out)
}

fn explore<W: Write>(
    position: &Position,
    seq: &mut String,
    depth: usize,
    visited: &mut HashSet<u64>,
    out: &mut W,
) -> io::Result<()> {
    if !visited.insert(position.key3()) {
        return Ok(());
    }
    if position.nb_moves() <= depth {
        writeln!(out, "{}", seq)?;
    }
    if position.nb_moves() >= depth {
        return Ok(());
    }
    for column in 0..WIDTH {
        if position.can_play(column) && !position.is_winning_move(column) {
            let mut next = *position;
            next.play_col(column);
            seq.push(char::from(b'1' + column as u8));
            explore(&next, seq, depth, visited, out)?;
            seq.pop();
        }
    }
    Ok(())
}

/// Picks a partial key width wide enough to tell apart the base 3 keys of
/// positions up to `depth` once the table index has consumed `log_size` bits
fn partial_key_bytes(depth: usize, log_size: u8) -> u8 {
    let key_bits = ((depth + WIDTH - 1) as f64 * 3f64.log2()) as i32 + 1 - log_size as i32;
    let bytes = (key_bits.max(1) + 7) / 8;
    // round up to a width the book file format can carry
    match bytes {
        1 => 1,
        2 => 2,
        3 | 4 => 4,
        _ => 8,
    }
}

/// Builds an opening book from scored lines of the form `<moves> <score>`
///
/// Lines that fail to split into two fields, to parse, to replay completely
/// or whose score is outside the legal range are reported on stderr and
/// skipped. Reading stops at the end of input or at an empty line. The
/// `progress` callback receives the running count of accepted lines.
pub fn build<R: BufRead>(
    input: &mut R,
    depth: usize,
    log_size: u8,
    mut progress: impl FnMut(usize),
) -> Result<OpeningBook> {
    let mut table = BookTable::with_key_bytes(partial_key_bytes(depth, log_size), log_size)?;

    let mut line = String::new();
    let mut line_number = 0;
    let mut entries = 0;
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        line_number += 1;

        let mut fields = line.split_whitespace();
        let (seq, score) = match (fields.next(), fields.next()) {
            (Some(seq), Some(score)) => (seq, score),
            _ => {
                eprintln!("line {} ignored: {:?}", line_number, line);
                continue;
            }
        };
        let score: i32 = match score.parse() {
            Ok(score) => score,
            Err(_) => {
                eprintln!("line {} has an invalid score, ignored: {:?}", line_number, line);
                continue;
            }
        };

        let mut position = Position::new();
        if position.play_seq(seq) != seq.len() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            eprintln!("line {} ignored: {:?}", line_number, line);
            continue;
        }

        // shift scores so no stored value collides with the empty marker 0
        table.put(position.key3(), (score - MIN_SCORE + 1) as u8);
        entries += 1;
        progress(entries);
    }

    Ok(OpeningBook::new(depth as u8, table))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{build, enumerate, partial_key_bytes};
    use crate::position::Position;
    use crate::solver::MIN_SCORE;
    use crate::WIDTH;

    fn enumerate_lines(depth: usize) -> Vec<String> {
        let mut out = Vec::new();
        enumerate(depth, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn shallow_position_counts() {
        // only the empty position at depth 0
        assert_eq!(enumerate_lines(0), vec![String::new()]);

        // mirror symmetry folds seven first moves onto four
        let lines = enumerate_lines(1);
        assert_eq!(lines.iter().filter(|l| l.len() == 1).count(), 4);

        let lines = enumerate_lines(2);
        assert_eq!(lines.iter().filter(|l| l.is_empty()).count(), 1);
        assert_eq!(lines.iter().filter(|l| l.len() == 1).count(), 4);
        // 49 two-move sequences fold onto 25 mirror classes
        assert_eq!(lines.iter().filter(|l| l.len() == 2).count(), 25);
        assert_eq!(lines.len(), 30);
    }

    #[test]
    fn enumeration_closed_under_extension() {
        let lines = enumerate_lines(2);
        let keys: HashSet<u64> = lines
            .iter()
            .map(|seq| {
                let mut position = Position::new();
                assert_eq!(position.play_seq(seq), seq.len());
                position.key3()
            })
            .collect();

        for seq in lines.iter().filter(|l| l.len() < 2) {
            let mut position = Position::new();
            position.play_seq(seq);
            for column in 0..WIDTH {
                if position.can_play(column) && !position.is_winning_move(column) {
                    let mut next = position;
                    next.play_col(column);
                    assert!(keys.contains(&next.key3()));
                }
            }
        }
    }

    #[test]
    fn key_width_grows_with_depth() {
        // the reference 7x6 book shape: depth 14, 2^23 slots
        assert_eq!(partial_key_bytes(14, 23), 2);
        assert_eq!(partial_key_bytes(5, 8), 2);
        assert_eq!(partial_key_bytes(2, 12), 1);
        assert_eq!(partial_key_bytes(30, 10), 8);
    }

    #[test]
    fn builds_from_scored_lines() {
        let input = "4 2\n34 -3\nbogus\n44 99\n123456 1\n";
        let book = build(&mut input.as_bytes(), 5, 8, |_| {}).unwrap();
        assert_eq!(book.depth(), 5);

        let position = Position::from_moves("4").unwrap();
        assert_eq!(book.get(&position), (2 - MIN_SCORE + 1) as u8);
        // entries are keyed symmetrically
        let mirrored = Position::from_moves("54").unwrap();
        assert_eq!(book.get(&mirrored), (-3 - MIN_SCORE + 1) as u8);
        // the malformed and out-of-range lines were dropped
        assert_eq!(book.get(&Position::from_moves("44").unwrap()), 0);
    }

    #[test]
    fn stops_at_blank_line() {
        let input = "4 2\n\n34 -3\n";
        let book = build(&mut input.as_bytes(), 5, 8, |_| {}).unwrap();
        assert_ne!(book.get(&Position::from_moves("4").unwrap()), 0);
        assert_eq!(book.get(&Position::from_moves("34").unwrap()), 0);
    }
}
