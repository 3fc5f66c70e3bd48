//! Traceback (C6).
//!
//! Walks the trace matrix from the optimal cell in the last row back to
//! query row 0, emitting a CIGAR in left-to-right genome order. Consecutive
//! `=`/`X` cells (each recorded with run length 1 by the DP core) are
//! absorbed into a single run; `I`/`D` cells already carry their full run
//! length from the DP core and are emitted as a single jump.

use crate::buffers::Buffers;
use crate::cigar::{unpack, CigarOp, PackedCigar};
use crate::error::{AlignError, AlignResult};

/// Reconstruct the CIGAR for a traceback starting at `(query_len, opt_col)`
/// and ending at query row 0. Returns the reference column the alignment
/// begins at (the `offset`). `cigar` is cleared and reused in place.
pub fn trace(
    buffers: &Buffers,
    query_len: usize,
    opt_col: usize,
    cigar: &mut PackedCigar,
) -> AlignResult<usize> {
    cigar.clear();
    let mut m = query_len;
    let mut n = opt_col;

    while m > 0 {
        let (op, len) = unpack(buffers.get_trace(m, n));
        match op {
            CigarOp::Eq | CigarOp::Diff => {
                let run_op = op;
                let mut total: u32 = 0;
                loop {
                    let (cur_op, cur_len) = unpack(buffers.get_trace(m, n));
                    if cur_op != run_op {
                        break;
                    }
                    total += cur_len;
                    m -= cur_len as usize;
                    n -= cur_len as usize;
                    if m == 0 {
                        break;
                    }
                }
                cigar.push_front(run_op, total);
            }
            CigarOp::Ins => {
                cigar.push_front(CigarOp::Ins, len);
                m -= len as usize;
            }
            CigarOp::Del => {
                cigar.push_front(CigarOp::Del, len);
                n -= len as usize;
            }
            other => {
                return Err(AlignError::CorruptTrace {
                    row: m,
                    col: n,
                    opcode: other as u8,
                });
            }
        }
    }

    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::pack;

    #[test]
    fn absorbs_consecutive_match_cells() {
        let mut buffers = Buffers::new();
        buffers.resize(4, 4).unwrap();
        // 4x4 perfect match: every diagonal cell is (1, Eq).
        for m in 1..=4 {
            buffers.set_trace(m, 0, pack(CigarOp::Ins, 0));
            for n in 1..=4 {
                buffers.set_trace(m, n, pack(CigarOp::Eq, 1));
            }
        }
        let mut cigar = PackedCigar::default();
        let offset = trace(&buffers, 4, 4, &mut cigar).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(cigar.len(), 1);
        assert_eq!(cigar.first(), Some((CigarOp::Eq, 4)));
    }

    #[test]
    fn jumps_full_insertion_run_in_one_step() {
        let mut buffers = Buffers::new();
        buffers.resize(3, 1).unwrap();
        buffers.set_trace(1, 0, pack(CigarOp::Ins, 1));
        buffers.set_trace(2, 0, pack(CigarOp::Ins, 2));
        buffers.set_trace(3, 0, pack(CigarOp::Ins, 3));
        let mut cigar = PackedCigar::default();
        let offset = trace(&buffers, 3, 0, &mut cigar).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(cigar.len(), 1);
        assert_eq!(cigar.first(), Some((CigarOp::Ins, 3)));
    }

    #[test]
    fn corrupt_trace_is_fatal() {
        let mut buffers = Buffers::new();
        buffers.resize(1, 1).unwrap();
        buffers.set_trace(1, 1, pack(CigarOp::Pad, 1));
        let mut cigar = PackedCigar::default();
        let err = trace(&buffers, 1, 1, &mut cigar).unwrap_err();
        assert!(matches!(err, AlignError::CorruptTrace { .. }));
    }
}
