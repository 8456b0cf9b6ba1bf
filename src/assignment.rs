//! Minimum-cost matching between valid expert trajectories and predicted slots

use nalgebra::DMatrix;

/// Strategy used to match expert rows to predicted columns.
///
/// `Optimal` solves the exact minimum-cost assignment and is the default;
/// `GreedyNearest` takes each valid expert row in order and grabs its
/// cheapest free column. Both are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchingPolicy {
    #[default]
    Optimal,
    GreedyNearest,
}

/// One item's matching between expert rows and predicted columns.
///
/// Invariants: every pair references a valid expert row, each expert row
/// appears at most once, and each predicted column appears at most once.
/// Columns absent from the pairs are unassigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pairs: Vec<(usize, usize)>,
    set_size: usize,
}

impl Assignment {
    /// Matched `(expert_row, predicted_column)` pairs, ordered by expert row
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of slots per trajectory set
    pub fn set_size(&self) -> usize {
        self.set_size
    }

    /// Per-column flags: 1.0 where some expert row was matched to the column
    pub fn column_flags(&self) -> Vec<f32> {
        let mut flags = vec![0.0; self.set_size];
        for &(_, column) in &self.pairs {
            flags[column] = 1.0;
        }
        flags
    }

    /// Dense 0/1 matrix, row-major `set_size * set_size`
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.set_size * self.set_size];
        for &(row, column) in &self.pairs {
            dense[row * self.set_size + column] = 1.0;
        }
        dense
    }
}

/// Match valid expert rows of one item to predicted columns.
///
/// `cost` is the item's square position-cost matrix and `valid` marks which
/// expert rows hold a real trajectory. Invalid rows never receive a match;
/// when every row is invalid the assignment is empty, which is a normal
/// state rather than an error. A 1x1 instance short-circuits the solver.
pub fn assign(cost: &DMatrix<f32>, valid: &[bool], policy: MatchingPolicy) -> Assignment {
    let set_size = cost.nrows();
    debug_assert_eq!(cost.ncols(), set_size);
    debug_assert_eq!(valid.len(), set_size);

    if set_size == 1 {
        let pairs = if valid[0] { vec![(0, 0)] } else { Vec::new() };
        return Assignment { pairs, set_size };
    }

    let valid_rows: Vec<usize> = (0..set_size).filter(|&row| valid[row]).collect();
    if valid_rows.is_empty() {
        return Assignment {
            pairs: Vec::new(),
            set_size,
        };
    }

    // Drop invalid rows, keeping the mapping back to original indices.
    let mut reduced = DMatrix::zeros(valid_rows.len(), set_size);
    for (reduced_row, &row) in valid_rows.iter().enumerate() {
        for column in 0..set_size {
            reduced[(reduced_row, column)] = cost[(row, column)];
        }
    }

    let row_to_column = match policy {
        MatchingPolicy::Optimal => kuhn_munkres(&reduced),
        MatchingPolicy::GreedyNearest => greedy_nearest(&reduced),
    };

    let mut pairs = Vec::with_capacity(valid_rows.len());
    for (reduced_row, column) in row_to_column.into_iter().enumerate() {
        if let Some(column) = column {
            pairs.push((valid_rows[reduced_row], column));
        }
    }

    Assignment { pairs, set_size }
}

/// Exact rectangular minimum-cost assignment (shortest augmenting path).
///
/// Requires `nrows <= ncols`; every row ends up assigned to a distinct
/// column. Potentials are kept in f64 and comparisons are strict, so ties
/// resolve to the lowest column index and the result is deterministic.
fn kuhn_munkres(cost: &DMatrix<f32>) -> Vec<Option<usize>> {
    let rows = cost.nrows();
    let columns = cost.ncols();
    debug_assert!(rows <= columns);

    // 1-based arrays with column 0 as the virtual start of each augmenting path
    let mut row_potential = vec![0.0f64; rows + 1];
    let mut column_potential = vec![0.0f64; columns + 1];
    let mut assigned_row = vec![0usize; columns + 1];
    let mut path = vec![0usize; columns + 1];

    for row in 1..=rows {
        assigned_row[0] = row;
        let mut current = 0usize;
        let mut min_reduced = vec![f64::INFINITY; columns + 1];
        let mut visited = vec![false; columns + 1];

        loop {
            visited[current] = true;
            let pivot_row = assigned_row[current];
            let mut delta = f64::INFINITY;
            let mut next = 0usize;

            for column in 1..=columns {
                if visited[column] {
                    continue;
                }
                let reduced = cost[(pivot_row - 1, column - 1)] as f64
                    - row_potential[pivot_row]
                    - column_potential[column];
                if reduced < min_reduced[column] {
                    min_reduced[column] = reduced;
                    path[column] = current;
                }
                if min_reduced[column] < delta {
                    delta = min_reduced[column];
                    next = column;
                }
            }

            // Non-finite costs make every column unreachable; leave the row
            // unmatched instead of spinning. The NaN still reaches the loss
            // through the cost volumes.
            if next == 0 {
                current = 0;
                break;
            }

            for column in 0..=columns {
                if visited[column] {
                    row_potential[assigned_row[column]] += delta;
                    column_potential[column] -= delta;
                } else {
                    min_reduced[column] -= delta;
                }
            }

            current = next;
            if assigned_row[current] == 0 {
                break;
            }
        }

        // Walk the augmenting path back, flipping assignments.
        while current != 0 {
            let previous = path[current];
            assigned_row[current] = assigned_row[previous];
            current = previous;
        }
    }

    let mut row_to_column = vec![None; rows];
    for column in 1..=columns {
        if assigned_row[column] != 0 {
            row_to_column[assigned_row[column] - 1] = Some(column - 1);
        }
    }
    row_to_column
}

/// Greedy alternative: each row takes its cheapest still-free column.
fn greedy_nearest(cost: &DMatrix<f32>) -> Vec<Option<usize>> {
    let rows = cost.nrows();
    let columns = cost.ncols();
    let mut taken = vec![false; columns];
    let mut row_to_column = vec![None; rows];

    for row in 0..rows {
        let mut best: Option<(usize, f32)> = None;
        for column in 0..columns {
            if taken[column] {
                continue;
            }
            let value = cost[(row, column)];
            match best {
                Some((_, best_value)) if value >= best_value => {}
                _ => best = Some((column, value)),
            }
        }
        if let Some((column, _)) = best {
            taken[column] = true;
            row_to_column[row] = Some(column);
        }
    }
    row_to_column
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, columns: usize, values: &[f32]) -> DMatrix<f32> {
        DMatrix::from_row_slice(rows, columns, values)
    }

    #[test]
    fn test_two_by_two_prefers_cheaper_total() {
        // Diagonal totals 1 + 2 = 3, the alternative 4 + 3 = 7.
        let cost = matrix(2, 2, &[1.0, 4.0, 3.0, 2.0]);
        let assignment = assign(&cost, &[true, true], MatchingPolicy::Optimal);

        assert_eq!(assignment.pairs(), &[(0, 0), (1, 1)]);
        assert_eq!(assignment.column_flags(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_optimal_beats_row_greedy() {
        // Row 0's cheapest column is 1, but taking it forces row 1 into
        // cost 10; the optimum is the other pairing.
        let cost = matrix(2, 2, &[2.0, 1.0, 10.0, 3.0]);
        let assignment = assign(&cost, &[true, true], MatchingPolicy::Optimal);
        assert_eq!(assignment.pairs(), &[(0, 0), (1, 1)]);

        let greedy = assign(&cost, &[true, true], MatchingPolicy::GreedyNearest);
        assert_eq!(greedy.pairs(), &[(0, 1), (1, 0)]);
    }

    #[test]
    fn test_three_by_three_optimal() {
        let cost = matrix(
            3,
            3,
            &[
                4.0, 1.0, 3.0, //
                2.0, 0.0, 5.0, //
                3.0, 2.0, 2.0, //
            ],
        );
        let assignment = assign(&cost, &[true, true, true], MatchingPolicy::Optimal);

        // Optimal total is 1 + 2 + 2 = 5.
        assert_eq!(assignment.pairs(), &[(0, 1), (1, 0), (2, 2)]);
    }

    #[test]
    fn test_invalid_row_never_matched() {
        // Row 1 has the cheapest entries but is invalid.
        let cost = matrix(2, 2, &[5.0, 6.0, 0.0, 0.0]);
        let assignment = assign(&cost, &[true, false], MatchingPolicy::Optimal);

        assert_eq!(assignment.pairs(), &[(0, 0)]);
        assert_eq!(assignment.column_flags(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_all_rows_invalid_yields_empty_assignment() {
        let cost = matrix(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let assignment = assign(&cost, &[false, false], MatchingPolicy::Optimal);

        assert!(assignment.is_empty());
        assert_eq!(assignment.column_flags(), vec![0.0, 0.0]);
        assert_eq!(assignment.to_dense(), vec![0.0; 4]);
    }

    #[test]
    fn test_single_slot_identity() {
        let cost = matrix(1, 1, &[7.5]);

        let valid = assign(&cost, &[true], MatchingPolicy::Optimal);
        assert_eq!(valid.pairs(), &[(0, 0)]);

        let invalid = assign(&cost, &[false], MatchingPolicy::Optimal);
        assert!(invalid.is_empty());
    }

    #[test]
    fn test_rectangular_leaves_columns_unassigned() {
        // One valid row out of three, four columns stay mostly free.
        let cost = matrix(
            3,
            3,
            &[
                9.0, 1.0, 9.0, //
                0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, //
            ],
        );
        let assignment = assign(&cost, &[true, false, false], MatchingPolicy::Optimal);

        assert_eq!(assignment.pairs(), &[(0, 1)]);
        assert_eq!(assignment.column_flags(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_ties_break_to_lowest_column() {
        let cost = matrix(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let assignment = assign(&cost, &[true, true], MatchingPolicy::Optimal);
        assert_eq!(assignment.pairs(), &[(0, 0), (1, 1)]);

        let greedy = assign(&cost, &[true, true], MatchingPolicy::GreedyNearest);
        assert_eq!(greedy.pairs(), &[(0, 0), (1, 1)]);
    }

    #[test]
    fn test_deterministic_across_calls() {
        let cost = matrix(
            3,
            3,
            &[
                0.3, 0.3, 0.7, //
                0.3, 0.3, 0.7, //
                0.1, 0.9, 0.2, //
            ],
        );
        let first = assign(&cost, &[true, true, true], MatchingPolicy::Optimal);
        for _ in 0..10 {
            let again = assign(&cost, &[true, true, true], MatchingPolicy::Optimal);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_dense_matrix_invariants() {
        let cost = matrix(
            3,
            3,
            &[
                1.0, 2.0, 3.0, //
                2.0, 1.0, 3.0, //
                3.0, 2.0, 1.0, //
            ],
        );
        let assignment = assign(&cost, &[true, false, true], MatchingPolicy::Optimal);
        let dense = assignment.to_dense();

        // Valid rows carry exactly one 1, the invalid row none.
        for row in 0..3 {
            let row_sum: f32 = dense[row * 3..(row + 1) * 3].iter().sum();
            let expected = if row == 1 { 0.0 } else { 1.0 };
            assert_eq!(row_sum, expected);
        }
        // Columns carry at most one 1.
        for column in 0..3 {
            let column_sum: f32 = (0..3).map(|row| dense[row * 3 + column]).sum();
            assert!(column_sum <= 1.0);
        }
    }
}
