//! Edge-clip post-processing (C7).
//!
//! Four transforms applied to a freshly traced-back CIGAR, in the order the
//! engine runs them: trim leading/trailing non-match edits into a soft
//! clip, fold in clips the caller had already applied upstream, attach hard
//! clips for bases that aren't even present in the read, and finally
//! compact adjacent `=`/`X` runs into generic `M` for callers that don't
//! want the extended CIGAR alphabet.

use crate::cigar::{CigarOp, PackedCigar};
use crate::dp::bases_match;

/// Trim leading/trailing runs of `X` and `I` (the ops that consume a query
/// base without being a clean match) into a single soft clip on each end.
///
/// `H` and `D` do not consume a query base, so they are skipped over rather
/// than folded into the clip length — but they're kept in place, since a
/// trailing hard clip must stay at the true edge of the read and a
/// surrounding deletion still describes reference bases the alignment
/// consumed. Only the left-side walk touches `offset`: a leading `D` or `X`
/// it skips had consumed a reference base before the first real match, so
/// that reference position is folded into the start offset. The
/// right-side walk never touches `offset` — trailing operations don't move
/// where the alignment begins.
pub fn softclip_trace(cigar: &mut PackedCigar, offset: &mut usize) {
    let mut ops: Vec<(CigarOp, u32)> = cigar.iter().collect();

    let mut i = 0;
    let mut lead_sum = 0u32;
    let mut lead_hardclip = None;
    while i < ops.len() {
        match ops[i].0 {
            CigarOp::HardClip => {
                lead_hardclip = Some(ops[i].1);
                i += 1;
            }
            CigarOp::Ins => {
                lead_sum += ops[i].1;
                i += 1;
            }
            CigarOp::Diff => {
                lead_sum += ops[i].1;
                *offset += ops[i].1 as usize;
                i += 1;
            }
            CigarOp::Del => {
                *offset += ops[i].1 as usize;
                i += 1;
            }
            _ => break,
        }
    }
    ops.drain(0..i);
    if lead_sum > 0 {
        ops.insert(0, (CigarOp::SoftClip, lead_sum));
    }
    if let Some(len) = lead_hardclip {
        ops.insert(0, (CigarOp::HardClip, len));
    }

    let mut j = ops.len();
    let mut tail_sum = 0u32;
    let mut tail_hardclip = None;
    let mut tail_dels = Vec::new();
    while j > 0 {
        let idx = j - 1;
        match ops[idx].0 {
            CigarOp::HardClip => {
                tail_hardclip = Some(ops[idx].1);
                j -= 1;
            }
            CigarOp::Del => {
                tail_dels.push(ops[idx].1);
                j -= 1;
            }
            CigarOp::Ins | CigarOp::Diff => {
                tail_sum += ops[idx].1;
                j -= 1;
            }
            _ => break,
        }
    }
    ops.truncate(j);
    if tail_sum > 0 {
        ops.push((CigarOp::SoftClip, tail_sum));
    }
    for len in tail_dels.into_iter().rev() {
        ops.push((CigarOp::Del, len));
    }
    if let Some(len) = tail_hardclip {
        ops.push((CigarOp::HardClip, len));
    }

    cigar.clear();
    for (op, len) in ops {
        cigar.push_back(op, len);
    }
}

/// Fold externally pre-existing soft clips into the CIGAR, contracting them
/// against the aligned region where possible.
///
/// `reference`/`query` are the full, un-clipped buffers; `ref_head_clip` is
/// how many reference bases precede the sub-reference window the aligner
/// actually ran against. `query_head_clip`/`query_tail_clip` are query
/// bases the caller excluded from alignment but that are still present in
/// the read.
///
/// If the CIGAR's edge element is already a leading/trailing match (`=` or
/// `M`), the clip is contracted: bases of the clip region are compared
/// against the reference immediately outside the aligned span, and each
/// matching pair is folded into the match run instead of the clip, shrinking
/// the clip and (on the leading side) the start offset. Whatever remains of
/// the clip after contraction is emitted as a single `S`. `offset`, which
/// enters this call relative to the sub-reference window, leaves it
/// expressed relative to the full reference: contraction folds in
/// `ref_head_clip` as it walks, so there is no separate term left for a
/// caller to add back in afterward.
pub fn append_softclip(
    cigar: &mut PackedCigar,
    offset: &mut usize,
    reference: &[u8],
    query: &[u8],
    ref_head_clip: usize,
    query_head_clip: usize,
    query_tail_clip: usize,
) {
    let mut ref_abs = ref_head_clip + *offset;

    if query_head_clip > 0 {
        let can_contract = matches!(cigar.first(), Some((CigarOp::Eq, _)) | Some((CigarOp::Match, _)));
        let mut consumed = 0usize;
        if can_contract {
            while consumed < query_head_clip && ref_abs > 0 {
                let q_base = query[query_head_clip - 1 - consumed];
                let r_base = reference[ref_abs - 1];
                if bases_match(q_base, r_base) {
                    consumed += 1;
                    ref_abs -= 1;
                } else {
                    break;
                }
            }
            if consumed > 0 {
                let (_, len) = cigar.first().unwrap();
                cigar.set_front_len(len + consumed as u32);
            }
        }
        let remaining = query_head_clip - consumed;
        if remaining > 0 {
            cigar.push_front(CigarOp::SoftClip, remaining as u32);
        }
    }
    *offset = ref_abs;

    if query_tail_clip > 0 {
        let tail_clip_start = query.len() - query_tail_clip;
        let mut ref_cursor = ref_abs + cigar.reference_len() as usize;
        let can_contract = matches!(cigar.last(), Some((CigarOp::Eq, _)) | Some((CigarOp::Match, _)));
        let mut consumed = 0usize;
        if can_contract {
            while consumed < query_tail_clip && ref_cursor < reference.len() {
                let q_base = query[tail_clip_start + consumed];
                let r_base = reference[ref_cursor];
                if bases_match(q_base, r_base) {
                    consumed += 1;
                    ref_cursor += 1;
                } else {
                    break;
                }
            }
            if consumed > 0 {
                let (_, len) = cigar.last().unwrap();
                cigar.set_back_len(len + consumed as u32);
            }
        }
        let remaining = query_tail_clip - consumed;
        if remaining > 0 {
            cigar.push_back(CigarOp::SoftClip, remaining as u32);
        }
    }
}

/// Attach hard clips for query bases that were never even present in the
/// in-memory read (as opposed to soft clips, which are present but
/// excluded from the alignment). `head_len`/`tail_len` of zero are no-ops,
/// so `append_hardclip(h, 0)` followed by `append_hardclip(0, t)` is
/// equivalent to a single `append_hardclip(h, t)`.
pub fn append_hardclip(cigar: &mut PackedCigar, head_len: u32, tail_len: u32) {
    if head_len > 0 {
        if let Some((CigarOp::HardClip, existing)) = cigar.first() {
            cigar.set_front_len(existing + head_len);
        } else {
            cigar.push_front(CigarOp::HardClip, head_len);
        }
    }
    if tail_len > 0 {
        if let Some((CigarOp::HardClip, existing)) = cigar.last() {
            cigar.set_back_len(existing + tail_len);
        } else {
            cigar.push_back(CigarOp::HardClip, tail_len);
        }
    }
}

/// Collapse adjacent `=`/`X` runs into generic `M`, for callers that want
/// the classic (non-extended) CIGAR alphabet. Idempotent: running it twice
/// produces the same result as running it once.
pub fn compact_trace(cigar: &mut PackedCigar) {
    let mut compacted = PackedCigar::default();
    for (op, len) in cigar.iter() {
        let op = match op {
            CigarOp::Eq | CigarOp::Diff => CigarOp::Match,
            other => other,
        };
        compacted.push_back(op, len);
    }
    *cigar = compacted;
}
