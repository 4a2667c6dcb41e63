use thiserror::Error;

/// Failures while turning captured stdout into reduced columns.
///
/// All of them are fatal for the run being extracted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("malformed data line {line:?}: {reason}")]
    MalformedLogLine { line: String, reason: String },

    #[error("tag {tag:?} mixes LIST and AVERAGE records")]
    MixedReductionKind { tag: String },

    #[error("AVERAGE tag {tag:?} got non-numeric value {payload:?}")]
    NonNumericAverage { tag: String, payload: String },
}
