//! DP initializer (C3), DP core (C4), and optimum locator (C5).
//!
//! The score matrix is an *inverse score*: lower is better, and the optimal
//! alignment is a minimum, not a maximum. Gap-open/extend are therefore
//! costs to be added, never subtracted. Deletions (reference bases with no
//! query counterpart) are swept left-to-right within a row and never carry
//! a run length across rows — a deletion run restarts from column 0 on
//! every new query row. Insertions (query bases with no reference
//! counterpart) carry vertically and so their run length and score persist
//! in a rolling row from one query position to the next. Only insertions
//! consume a query base, so only insertion/match costs are quality-weighted
//! — a deletion has no query quality to weight against.

use crate::buffers::Buffers;
use crate::cigar::{pack, CigarOp};
use crate::penalty::PenaltyTables;

/// A query base equals a reference base when they are literally equal, or
/// when the *reference* base is the ambiguous code `N`. A query `N` is not
/// a wildcard: it must match an actual reference `N` to count as equal.
#[inline]
pub fn bases_match(query_base: u8, ref_base: u8) -> bool {
    query_base == ref_base || ref_base == b'N'
}

pub struct Costs {
    pub gap_open_extend: i32,
    pub gap_extend: i32,
}

/// Seed the virtual row 0 of the score/insertion rows and mark its trace.
///
/// `global`: row 0 behaves as if the alignment had already deleted `n`
/// reference bases before the first query base — a real affine-gap cost. In
/// `semiglobal` mode (free ends on the reference), row 0 is free: the
/// alignment may begin at any reference column.
pub fn seed_row_zero(
    buffers: &mut Buffers,
    ref_len: usize,
    costs: &Costs,
    tables: &PenaltyTables,
    query_quality_0: u8,
    semiglobal: bool,
) {
    buffers.score_prev[0] = 0;
    buffers.set_trace(0, 0, pack(CigarOp::Eq, 0));

    for n in 1..=ref_len {
        let score = if semiglobal {
            0
        } else {
            costs.gap_open_extend + costs.gap_extend * (n as i32 - 1)
        };
        buffers.score_prev[n] = score;
        buffers.set_trace(0, n, pack(CigarOp::Del, n as u32));
    }

    // An insertion descending from row 0 into row 1 must pay the full
    // open cost on its first step; seeding with this correction lets the
    // row-1 recurrence always treat it as an "extend" of a run already
    // open, rather than needing a special-cased first row.
    let open0 = tables.pen_gap_open[query_quality_0 as usize] as i64;
    let ext0 = tables.pen_gap_extend[query_quality_0 as usize] as i64;
    let correction = (open0 - ext0) as i32;
    for n in 0..=ref_len {
        buffers.ins_prev[n] = buffers.score_prev[n] + correction;
        buffers.ins_run_prev[n] = 0;
    }
}

/// Run the affine-gap recurrence for one query row `m` (1-indexed query
/// position `m - 1`), sweeping reference columns `0..=ref_len` left to
/// right. Reads `buffers`' `*_prev` rolling rows (the previous query row)
/// and writes `*_cur` plus the trace matrix row `m`.
#[allow(clippy::too_many_arguments)]
pub fn run_row(
    buffers: &mut Buffers,
    row: usize,
    query_base: u8,
    quality: u8,
    reference: &[u8],
    costs: &Costs,
    tables: &PenaltyTables,
) {
    let q = quality as usize;
    let ref_len = reference.len();

    // Left edge (n = 0): only a vertical (insertion) move is possible.
    let ins_val = buffers.ins_prev[0] + tables.pen_gap_extend[q];
    let ins_run = buffers.ins_run_prev[0] + 1;
    buffers.score_cur[0] = ins_val;
    buffers.ins_cur[0] = ins_val;
    buffers.ins_run_cur[0] = ins_run;
    buffers.set_trace(row, 0, pack(CigarOp::Ins, ins_run));

    // Seed the deletion scalar so that extending it at column 1 reproduces
    // exactly the cost of opening a fresh deletion there.
    let mut stored_del_score = ins_val + (costs.gap_open_extend - costs.gap_extend);
    let mut stored_del_run = 0u32;

    for n in 1..=ref_len {
        let wd_open = buffers.score_cur[n - 1] + costs.gap_open_extend;
        let wd_extend = stored_del_score + costs.gap_extend;
        let (wd, cd) = if wd_extend <= wd_open {
            (wd_extend, stored_del_run + 1)
        } else {
            (wd_open, 1)
        };
        stored_del_score = wd;
        stored_del_run = cd;

        let wi_open = buffers.score_prev[n] + tables.pen_gap_open[q];
        let wi_extend = buffers.ins_prev[n] + tables.pen_gap_extend[q];
        let (wi, ci) = if wi_extend <= wi_open {
            (wi_extend, buffers.ins_run_prev[n] + 1)
        } else {
            (wi_open, 1)
        };
        buffers.ins_cur[n] = wi;
        buffers.ins_run_cur[n] = ci;

        let is_match = bases_match(query_base, reference[n - 1]);
        let match_cost = if is_match {
            tables.pen_match[q]
        } else {
            tables.pen_mismatch[q]
        };
        let wm = buffers.score_prev[n - 1] + match_cost;

        let (cell_score, cell) = if wm <= wi && wm <= wd {
            let op = if is_match { CigarOp::Eq } else { CigarOp::Diff };
            (wm, pack(op, 1))
        } else if wi <= wd {
            (wi, pack(CigarOp::Ins, ci))
        } else {
            (wd, pack(CigarOp::Del, cd))
        };

        buffers.score_cur[n] = cell_score;
        buffers.set_trace(row, n, cell);
    }
}

/// Scan the final row left to right; first occurrence of the minimum wins.
pub fn locate_optimum(last_row: &[i32]) -> (i32, usize) {
    let mut best = last_row[0];
    let mut best_col = 0usize;
    for (col, &score) in last_row.iter().enumerate().skip(1) {
        if score < best {
            best = score;
            best_col = col;
        }
    }
    (best, best_col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_n_matches_anything() {
        assert!(bases_match(b'A', b'N'));
        assert!(bases_match(b'T', b'N'));
    }

    #[test]
    fn query_n_is_not_a_wildcard() {
        assert!(!bases_match(b'N', b'A'));
        assert!(bases_match(b'N', b'N'));
    }

    #[test]
    fn literal_equality_matches() {
        assert!(bases_match(b'G', b'G'));
        assert!(!bases_match(b'G', b'C'));
    }

    #[test]
    fn locate_optimum_picks_first_minimum() {
        let row = [5, 2, 2, 9, 1, 1, 3];
        assert_eq!(locate_optimum(&row), (1, 4));
    }
}
