use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use connect4_solver::book_generator;
use connect4_solver::{HEIGHT, WIDTH};

/// Enumerates opening positions or assembles an opening book
///
/// With a depth argument, prints the move sequence of every unique position
/// up to that depth. Without one, reads `<moves> <score>` lines from
/// standard input and writes the resulting book file.
#[derive(Parser)]
#[command(about, long_about = None)]
struct Args {
    /// Enumerate unique positions up to this depth instead of building a book
    depth: Option<usize>,

    /// Deepest position stored in a generated book
    #[arg(long, default_value_t = 14)]
    book_depth: usize,

    /// Base 2 log of the generated book's table size
    #[arg(long, default_value_t = 23)]
    log_size: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(depth) = args.depth {
        let stdout = io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        book_generator::enumerate(depth, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner} {pos} lines scored"));

    let stdin = io::stdin();
    let book = book_generator::build(
        &mut stdin.lock(),
        args.book_depth,
        args.log_size,
        |_| progress.inc(1),
    )?;
    progress.finish_and_clear();

    let path = PathBuf::from(format!("{}x{}.book", WIDTH, HEIGHT));
    book.save(&path)?;
    eprintln!("opening book saved to {}", path.display());
    Ok(())
}
