//! The public `Aligner` (C8 wiring): owns all engine state and composes
//! C1-C7 into the external interface a host runtime sees.

use log::{debug, warn};

use crate::buffers::Buffers;
use crate::cigar::PackedCigar;
use crate::clip;
use crate::dp::{self, Costs};
use crate::error::{AlignError, AlignResult};
use crate::penalty::PenaltyTables;
use crate::traceback;

#[derive(Clone, Debug, Default)]
struct Clip {
    head: usize,
    tail: usize,
}

/// A long-lived, reusable quality-weighted affine-gap aligner.
///
/// Construct once, then call `prepare`/`align`/`trace` (plus whichever C7
/// post-processing steps are wanted) for each new (reference, query) pair.
/// Not `Sync`: all state is owned and mutated in place across calls.
pub struct Aligner {
    match_cost: i32,
    mismatch_cost: i32,
    gap_open_extend_cost: i32,
    gap_extend_cost: i32,
    tables: PenaltyTables,
    phred_offset: u8,

    reference: Vec<u8>,
    ref_clip: Clip,
    query: Vec<u8>,
    quality: Vec<u8>,
    query_clip: Clip,

    buffers: Buffers,
    opt_score: i32,
    opt_score_col: usize,
    offset: usize,
    offset_includes_ref_head_clip: bool,
    cigar: PackedCigar,
}

impl Aligner {
    /// Build a new aligner from the four scalar costs (match, mismatch,
    /// gap-open+extend, gap-extend). All are costs to minimize; sign is the
    /// caller's choice.
    pub fn new(match_cost: i32, mismatch_cost: i32, gap_open_extend_cost: i32, gap_extend_cost: i32) -> Self {
        let tables = PenaltyTables::build(match_cost, mismatch_cost, gap_open_extend_cost, gap_extend_cost);
        Self {
            match_cost,
            mismatch_cost,
            gap_open_extend_cost,
            gap_extend_cost,
            tables,
            phred_offset: 33,
            reference: Vec::new(),
            ref_clip: Clip::default(),
            query: Vec::new(),
            quality: Vec::new(),
            query_clip: Clip::default(),
            buffers: Buffers::new(),
            opt_score: 0,
            opt_score_col: 0,
            offset: 0,
            offset_includes_ref_head_clip: false,
            cigar: PackedCigar::default(),
        }
    }

    /// Change the PHRED ASCII offset used to decode quality bytes. Takes
    /// effect on the next `align` call; does not itself rebuild the
    /// penalty tables (those depend only on the four scalar costs).
    pub fn set_phred_offset(&mut self, offset: u8) {
        self.phred_offset = offset;
    }

    /// Rebuild the penalty tables with new scalar costs.
    pub fn set_scoring(&mut self, match_cost: i32, mismatch_cost: i32, gap_open_extend_cost: i32, gap_extend_cost: i32) {
        self.match_cost = match_cost;
        self.mismatch_cost = mismatch_cost;
        self.gap_open_extend_cost = gap_open_extend_cost;
        self.gap_extend_cost = gap_extend_cost;
        self.tables = PenaltyTables::build(match_cost, mismatch_cost, gap_open_extend_cost, gap_extend_cost);
    }

    /// Supply the reference window to align against, with `head_clip`/
    /// `tail_clip` bases excluded from the alignment interior on each end.
    pub fn prepare_db(&mut self, reference: &[u8], head_clip: usize, tail_clip: usize) -> AlignResult<()> {
        check_clip(reference.len(), head_clip, tail_clip)?;
        self.reference = reference.to_vec();
        self.ref_clip = Clip { head: head_clip, tail: tail_clip };
        Ok(())
    }

    /// Supply the query and its per-base qualities, with `head_clip`/
    /// `tail_clip` bases excluded from the alignment interior on each end.
    pub fn prepare_query(&mut self, query: &[u8], quality: &[u8], head_clip: usize, tail_clip: usize) -> AlignResult<()> {
        if query.len() != quality.len() {
            return Err(AlignError::InvalidArgument("query and quality must have equal length"));
        }
        check_clip(query.len(), head_clip, tail_clip)?;
        self.query = query.to_vec();
        self.quality = quality.to_vec();
        self.query_clip = Clip { head: head_clip, tail: tail_clip };
        Ok(())
    }

    /// Combined `prepare_db` + `prepare_query`.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare(
        &mut self,
        reference: &[u8],
        ref_head_clip: usize,
        ref_tail_clip: usize,
        query: &[u8],
        quality: &[u8],
        query_head_clip: usize,
        query_tail_clip: usize,
    ) -> AlignResult<()> {
        self.prepare_db(reference, ref_head_clip, ref_tail_clip)?;
        self.prepare_query(query, quality, query_head_clip, query_tail_clip)
    }

    fn subdb(&self) -> &[u8] {
        let start = self.ref_clip.head;
        let end = self.reference.len() - self.ref_clip.tail;
        &self.reference[start..end]
    }

    fn subquery(&self) -> &[u8] {
        let start = self.query_clip.head;
        let end = self.query.len() - self.query_clip.tail;
        &self.query[start..end]
    }

    fn subqual(&self) -> &[u8] {
        let start = self.query_clip.head;
        let end = self.quality.len() - self.query_clip.tail;
        &self.quality[start..end]
    }

    /// Run the DP over the currently prepared sub-reference and sub-query.
    /// Returns the minimum score found in the last row. `semi`: align
    /// semiglobally on the reference (free start/end there) rather than
    /// globally.
    pub fn align(&mut self, semi: bool) -> AlignResult<i32> {
        let reference = self.subdb();
        let query = self.subquery();
        let quality = self.subqual();

        if reference.is_empty() || query.is_empty() {
            return Err(AlignError::InvalidArgument("subdb and subquery must be non-empty"));
        }

        let ref_len = reference.len();
        let query_len = query.len();
        debug!("aligning {query_len} query bases against {ref_len} reference bases (semiglobal={semi})");

        self.buffers.resize(query_len, ref_len)?;

        let costs = Costs {
            gap_open_extend: self.gap_open_extend_cost,
            gap_extend: self.gap_extend_cost,
        };

        let q0 = quality[0].wrapping_sub(self.phred_offset);
        dp::seed_row_zero(&mut self.buffers, ref_len, &costs, &self.tables, q0, semi);

        for m in 1..=query_len {
            let query_base = query[m - 1];
            let q = quality[m - 1].wrapping_sub(self.phred_offset);
            dp::run_row(&mut self.buffers, m, query_base, q, reference, &costs, &self.tables);
            self.buffers.swap_rows();
        }

        let (score, col) = dp::locate_optimum(&self.buffers.score_prev[..=ref_len]);
        self.opt_score = score;
        self.opt_score_col = col;
        Ok(score)
    }

    /// Reconstruct the CIGAR from the trace matrix produced by the last
    /// `align` call. Clears and rebuilds the scratch CIGAR buffer in place.
    pub fn trace(&mut self) -> AlignResult<()> {
        let query_len = self.subquery().len();
        match traceback::trace(&self.buffers, query_len, self.opt_score_col, &mut self.cigar) {
            Ok(offset) => {
                self.offset = offset;
                self.offset_includes_ref_head_clip = false;
                Ok(())
            }
            Err(err) => {
                warn!("corrupt trace cell during traceback: {err}");
                Err(err)
            }
        }
    }

    /// Trim leading/trailing non-match edits into soft clips (C7).
    pub fn softclip_trace(&mut self) {
        clip::softclip_trace(&mut self.cigar, &mut self.offset);
    }

    /// Fold in the head/tail clips recorded at `prepare_query`/`prepare_db`
    /// time as leading/trailing soft clips, contracting them against the
    /// aligned region where the bases agree.
    pub fn append_softclip(&mut self) {
        clip::append_softclip(
            &mut self.cigar,
            &mut self.offset,
            &self.reference,
            &self.query,
            self.ref_clip.head,
            self.query_clip.head,
            self.query_clip.tail,
        );
        self.offset_includes_ref_head_clip = true;
    }

    /// Attach additional leading/trailing hard clips (bases absent from
    /// the in-memory read entirely).
    pub fn append_hardclip(&mut self, head_len: u32, tail_len: u32) {
        clip::append_hardclip(&mut self.cigar, head_len, tail_len);
    }

    /// Collapse `=`/`X` runs into `M`.
    pub fn compact_trace(&mut self) {
        clip::compact_trace(&mut self.cigar);
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn opt_score(&self) -> i32 {
        self.opt_score
    }

    pub fn opt_score_col(&self) -> usize {
        self.opt_score_col
    }

    pub fn cigar(&self) -> &PackedCigar {
        &self.cigar
    }

    /// Render the CIGAR as SAM text, e.g. `3M1I2D`.
    pub fn show_cigar(&self) -> String {
        self.cigar.to_sam_string()
    }

    /// Absolute reference start in a larger coordinate system: `max(0,
    /// alstart) + offset + (subdb - db)`. If `append_softclip` has been
    /// called, `offset` is already relative to the full reference and the
    /// `(subdb - db)` term (`ref_clip.head`) has already been folded into
    /// it; otherwise `offset` is still relative to `subdb` as `trace`
    /// leaves it, and `ref_clip.head` is added here.
    pub fn alignment_start(&self, alstart: i64) -> usize {
        let ref_head_clip = if self.offset_includes_ref_head_clip { 0 } else { self.ref_clip.head };
        alstart.max(0) as usize + self.offset + ref_head_clip
    }
}

fn check_clip(len: usize, head: usize, tail: usize) -> AlignResult<()> {
    if head.checked_add(tail).map(|sum| sum > len).unwrap_or(true) {
        return Err(AlignError::InvalidArgument("head_clip + tail_clip exceeds sequence length"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quals(n: usize, q: u8) -> Vec<u8> {
        vec![q + 33; n]
    }

    #[test]
    fn exact_match_global() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"ACGT", 0, 0, b"ACGT", &quals(4, 40), 0, 0).unwrap();
        aligner.align(false).unwrap();
        aligner.trace().unwrap();
        assert_eq!(aligner.show_cigar(), "4=");
        assert_eq!(aligner.offset(), 0);
    }

    #[test]
    fn single_substitution_global() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"ACGT", 0, 0, b"AGGT", &quals(4, 40), 0, 0).unwrap();
        aligner.align(false).unwrap();
        aligner.trace().unwrap();
        assert_eq!(aligner.show_cigar(), "1=1X2=");
        assert_eq!(aligner.offset(), 0);
    }

    #[test]
    fn short_query_embedded_semiglobal() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"AAAACGTAA", 0, 0, b"CGT", &quals(3, 40), 0, 0).unwrap();
        aligner.align(true).unwrap();
        aligner.trace().unwrap();
        assert_eq!(aligner.show_cigar(), "3=");
        assert_eq!(aligner.offset(), 4);
    }

    #[test]
    fn leading_insertion_zero_quality_global() {
        // Matching the query's final 'A' against the reference's leading
        // 'A' (column 0) is strictly cheaper than matching it against the
        // trailing 'T' (column 6), so the first-minimum last-row scan
        // (C5) lands on offset 0, not the reference's tail.
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"AAAACGT", 0, 0, b"TGCA", &quals(4, 0), 0, 0).unwrap();
        aligner.align(false).unwrap();
        aligner.trace().unwrap();
        assert_eq!(aligner.show_cigar(), "3I1=");
        assert_eq!(aligner.offset(), 0);
    }

    #[test]
    fn deletion_in_query_global() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"ACGTACGT", 0, 0, b"ACGACGT", &quals(7, 40), 0, 0).unwrap();
        aligner.align(false).unwrap();
        aligner.trace().unwrap();
        assert_eq!(aligner.show_cigar(), "3=1D4=");
        assert_eq!(aligner.offset(), 0);
    }

    #[test]
    fn soft_clip_post_processing_scenario() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"ACGT", 0, 0, b"AGGT", &quals(4, 40), 0, 0).unwrap();
        aligner.align(false).unwrap();
        aligner.trace().unwrap();
        aligner.softclip_trace();
        // The mismatch sits strictly between two match runs, so neither
        // edge walk in `softclip_trace` reaches it.
        assert_eq!(aligner.show_cigar(), "1=1X2=");
    }

    #[test]
    fn global_score_is_never_better_than_semiglobal() {
        let mut global = Aligner::new(-10, 40, 80, 16);
        global.prepare(b"AAAACGTAA", 0, 0, b"CGT", &quals(3, 40), 0, 0).unwrap();
        let global_score = global.align(false).unwrap();

        let mut semi = Aligner::new(-10, 40, 80, 16);
        semi.prepare(b"AAAACGTAA", 0, 0, b"CGT", &quals(3, 40), 0, 0).unwrap();
        let semi_score = semi.align(true).unwrap();

        assert!(global_score >= semi_score);
    }

    #[test]
    fn rejects_clip_lengths_exceeding_sequence() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        let err = aligner.prepare_db(b"ACGT", 3, 3).unwrap_err();
        assert!(matches!(err, AlignError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_empty_subquery() {
        let mut aligner = Aligner::new(-10, 40, 80, 16);
        aligner.prepare(b"ACGT", 0, 4, b"ACGT", &quals(4, 40), 0, 0).unwrap();
        let err = aligner.align(false).unwrap_err();
        assert!(matches!(err, AlignError::InvalidArgument(_)));
    }
}
