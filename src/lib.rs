mod buffers;
mod cigar;
mod clip;
mod dp;
mod engine;
mod error;
mod penalty;
mod traceback;

pub use cigar::{CigarOp, PackedCigar};
pub use engine::Aligner;
pub use error::{AlignError, AlignResult};
pub use penalty::QUALITY_RANGE;
