#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::PathBuf;

    use crate::book_generator;
    use crate::position::Position;
    use crate::solver::{Solver, INVALID_MOVE};
    use crate::WIDTH;

    /// Builds a deep but undecided position by repeatedly playing the first
    /// column that is legal and not immediately winning
    ///
    /// Every prefix of the construction is a legal, unfinished game, which
    /// makes the result safe to hand to the solver at any depth.
    fn deep_position(target: usize) -> Position {
        let mut position = Position::new();
        while position.nb_moves() < target {
            let column = (0..WIDTH)
                .find(|&c| position.can_play(c) && !position.is_winning_move(c))
                .expect("ran out of non-winning moves");
            position.play_col(column);
        }
        position
    }

    #[test]
    pub fn immediate_wins() {
        let mut solver = Solver::new();

        // three in a row on the bottom, winning with the fourth stone
        let position = Position::from_moves("112233").unwrap();
        assert_eq!(solver.solve(&position, false), 18);
        // the one-ply shortcut ignores the weak flag
        assert_eq!(solver.solve(&position, true), 18);

        // a vertical three wins just the same
        let position = Position::from_moves("121212").unwrap();
        assert_eq!(solver.solve(&position, false), 18);
    }

    #[test]
    pub fn all_moves_losing() {
        // the first player owns columns 3-5 on the bottom row; whatever the
        // second player does, the win lands two plies later
        let position = Position::from_moves("44335").unwrap();
        let mut solver = Solver::new();
        assert_eq!(solver.solve(&position, false), -18);
        assert_eq!(solver.solve(&position, true), -1);
    }

    #[test]
    pub fn double_threat_wins() {
        // extending the pair on columns 3 and 4 to either side forks the
        // defence, so the first player wins with their fourth stone
        let position = Position::from_moves("4433").unwrap();
        let mut solver = Solver::new();
        assert_eq!(solver.solve(&position, false), 18);
    }

    #[test]
    pub fn near_full_board_scores_within_ply_bound() {
        let position = deep_position(38);
        assert_eq!(position.nb_moves(), 38);

        // with four squares left nobody can win sooner than two plies out
        let mut solver = Solver::new();
        let score = solver.solve(&position, false);
        assert!((-2..=2).contains(&score));
    }

    #[test]
    pub fn analyze_agrees_with_solve() {
        let position = deep_position(34);
        assert_eq!(position.nb_moves(), 34);

        let mut solver = Solver::new();
        let exact = solver.solve(&position, false);
        let scores = solver.analyze(&position, false);

        for column in 0..WIDTH {
            assert_eq!(scores[column] == INVALID_MOVE, !position.can_play(column));
        }
        // the score of a position is the score of its best move
        let best = scores
            .iter()
            .filter(|&&score| score != INVALID_MOVE)
            .max()
            .copied()
            .unwrap();
        assert_eq!(best, exact);

        // a weak solve agrees on the outcome
        let weak = solver.solve(&position, true);
        assert_eq!(weak.signum(), exact.signum());
    }

    #[test]
    pub fn search_independent_of_table_state() {
        let position = deep_position(34);
        let mut solver = Solver::new();

        let first = solver.solve(&position, false);
        // cached bounds may tighten later searches but never change them
        let warm = solver.solve(&position, false);
        solver.reset();
        let cold = solver.solve(&position, false);
        assert_eq!(first, warm);
        assert_eq!(first, cold);
        assert_eq!(Solver::new().solve(&position, false), first);
    }

    #[test]
    pub fn book_entries_short_circuit_the_search() {
        let path = std::env::temp_dir().join("connect4_solver_book_test.book");
        let book = book_generator::build(&mut "4433 18\n".as_bytes(), 6, 8, |_| {}).unwrap();
        book.save(&path).unwrap();

        let mut solver = Solver::new();
        assert!(solver.load_book(&path));
        let position = Position::from_moves("4433").unwrap();
        assert_eq!(solver.solve(&position, false), 18);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    pub fn missing_book_leaves_solver_working() {
        let mut solver = Solver::new();
        assert!(!solver.load_book(&PathBuf::from("no_such_file.book")));
        let position = Position::from_moves("44335").unwrap();
        assert_eq!(solver.solve(&position, false), -18);
    }

    #[test]
    #[ignore]
    pub fn full_search() {
        let position = Position::new();
        let mut solver = Solver::new();
        let start = std::time::Instant::now();
        let score = solver.solve(&position, false);
        println!(
            "empty board solved in {:.3}s over {} nodes",
            start.elapsed().as_secs_f64(),
            solver.node_count()
        );
        // the first player wins with their very last stone
        assert_eq!(score, 1);
    }

    #[test]
    #[ignore]
    pub fn weak_full_search() {
        let position = Position::new();
        let mut solver = Solver::new();
        assert!(solver.solve(&position, true) >= 1);
    }
}
