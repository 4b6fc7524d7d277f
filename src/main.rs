use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use connect4_solver::position::Position;
use connect4_solver::solver::Solver;
use connect4_solver::{HEIGHT, WIDTH};

/// Scores Connect 4 positions read from standard input
///
/// Each input line is a sequence of played columns, indexed from 1. Valid
/// lines are answered on stdout with the sequence, its score (or one score
/// per column with `-a`), the cumulative node count and the elapsed
/// microseconds. Invalid lines produce a diagnostic on stderr and a blank
/// line on stdout.
#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    /// Only establish the win/draw/loss outcome instead of the exact score
    #[arg(short)]
    weak: bool,

    /// Report a score for every playable column
    #[arg(short)]
    analyze: bool,

    /// Path of the opening book
    #[arg(short, value_name = "FILE")]
    book: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let book_path = args
        .book
        .unwrap_or_else(|| PathBuf::from(format!("{}x{}.book", WIDTH, HEIGHT)));
    let mut solver = Solver::new();
    if !solver.load_book(&book_path) {
        eprintln!("searching without an opening book, expect slow early-game solves");
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (line_number, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let seq = line.trim();

        let position = match Position::from_moves(seq) {
            Ok(position) => position,
            Err(err) => {
                eprintln!("line {}: {}: {:?}", line_number + 1, err, seq);
                writeln!(out)?;
                continue;
            }
        };

        let search_start = Instant::now();
        if args.analyze {
            let scores = solver.analyze(&position, args.weak);
            write!(out, "{}", seq)?;
            for score in scores {
                write!(out, " {}", score)?;
            }
        } else {
            let score = solver.solve(&position, args.weak);
            write!(out, "{} {}", seq, score)?;
        }
        writeln!(
            out,
            " {} {}",
            solver.node_count(),
            search_start.elapsed().as_micros()
        )?;
        out.flush()?;
    }
    Ok(())
}
