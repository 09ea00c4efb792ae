use models::RecordKind;
use thiserror::Error;

/// Failures one provider can hit while collecting. A failed provider never
/// takes the run down; its error lands in the run summary instead.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{provider}: no input file matching '{pattern}' for {kind}")]
    MissingInput {
        provider: String,
        kind: RecordKind,
        pattern: String,
    },

    #[error("{provider}: malformed {kind} input: {detail}")]
    StructuralParse {
        provider: String,
        kind: RecordKind,
        detail: String,
    },

    #[error("workbook error: {0}")]
    Workbook(String),

    #[error("snapshot decode error: {0}")]
    Mime(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
