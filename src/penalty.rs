//! Quality-indexed penalty tables (C1).
//!
//! Builds four cost tables, one entry per PHRED quality value in the Sanger
//! range, from the four scalar costs an `Aligner` is constructed with. Low
//! quality bases are cheap to edit; high quality bases are expensive to
//! edit. Pure function of the four scalars — rebuilt whenever they change.

/// Sanger PHRED quality range: 0..=93.
pub const QUALITY_RANGE: usize = 94;

#[derive(Clone, Debug)]
pub struct PenaltyTables {
    pub pen_match: [i32; QUALITY_RANGE],
    pub pen_mismatch: [i32; QUALITY_RANGE],
    pub pen_gap_open: [i32; QUALITY_RANGE],
    pub pen_gap_extend: [i32; QUALITY_RANGE],
}

impl PenaltyTables {
    pub fn build(
        match_cost: i32,
        mismatch_cost: i32,
        gap_open_extend_cost: i32,
        gap_extend_cost: i32,
    ) -> Self {
        // Per-base error contribution of an ambiguous ("N") base call.
        let q_n = -10.0 * 0.75f64.log10();

        let mut pen_match = [0i32; QUALITY_RANGE];
        let mut pen_mismatch = [0i32; QUALITY_RANGE];
        let mut pen_gap_open = [0i32; QUALITY_RANGE];
        let mut pen_gap_extend = [0i32; QUALITY_RANGE];

        for q in 0..QUALITY_RANGE {
            let w = 1.0 - 10f64.powf(-((q as f64) + q_n) / 10.0);
            pen_match[q] = scaled(match_cost, w);
            pen_mismatch[q] = scaled(mismatch_cost, w);
            pen_gap_open[q] = scaled(gap_open_extend_cost, w);
            pen_gap_extend[q] = scaled(gap_extend_cost, w);
        }

        Self {
            pen_match,
            pen_mismatch,
            pen_gap_open,
            pen_gap_extend,
        }
    }
}

/// `10 + round(w * scalar)`. The floor of 10 keeps quality-zero positions
/// from costing nothing to edit.
fn scaled(scalar: i32, w: f64) -> i32 {
    10 + (w * scalar as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_quality_is_cheaper_than_high_quality() {
        let tables = PenaltyTables::build(-10, 40, 80, 16);
        assert!(tables.pen_mismatch[0] < tables.pen_mismatch[93]);
        assert!(tables.pen_gap_open[0] < tables.pen_gap_open[93]);
    }

    #[test]
    fn floor_prevents_zero_cost_at_q0() {
        let tables = PenaltyTables::build(0, 0, 0, 0);
        assert_eq!(tables.pen_match[0], 10);
        assert_eq!(tables.pen_mismatch[0], 10);
    }

    #[test]
    fn table_is_monotonic_in_quality_for_positive_scalar() {
        let tables = PenaltyTables::build(-10, 40, 80, 16);
        for q in 1..QUALITY_RANGE {
            assert!(tables.pen_mismatch[q] >= tables.pen_mismatch[q - 1]);
        }
    }
}
