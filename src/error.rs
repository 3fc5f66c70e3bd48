use thiserror::Error;

/// Failure modes surfaced by the aligner. See §7 of the design: allocation
/// failures and invalid arguments are recoverable for the caller; a corrupt
/// trace cell indicates an implementation bug and is fatal for the current
/// call but does not affect destroyability of the `Aligner`.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("failed to grow {what} to {requested} elements")]
    OutOfMemory { what: &'static str, requested: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("corrupt trace cell at query row {row}, reference col {col}: opcode {opcode}")]
    CorruptTrace { row: usize, col: usize, opcode: u8 },
}

pub type AlignResult<T> = Result<T, AlignError>;
