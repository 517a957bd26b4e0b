//! Chronological train/evaluation split.

use chrono::{DateTime, Utc};

use crate::domain::EngineeredRow;
use crate::error::EngineError;

/// Rows discarded from the head of the evaluation window so its lag
/// features do not straddle the cutoff. Fixed at one day; the 168-hour lag
/// still reaches across the boundary for the first week of evaluation rows.
pub const EVAL_HEAD_DROP: usize = 24;

/// Partition the engineered rows at `cutoff`: training takes every row with
/// `timestamp <= cutoff`, evaluation takes the rest minus its first
/// [`EVAL_HEAD_DROP`] rows. Errors when either side ends up empty.
pub fn chronological(
    rows: Vec<EngineeredRow>,
    cutoff: DateTime<Utc>,
) -> Result<(Vec<EngineeredRow>, Vec<EngineeredRow>), EngineError> {
    let split_idx = rows.partition_point(|row| row.timestamp <= cutoff);
    let mut train = rows;
    let mut eval = train.split_off(split_idx);

    if train.is_empty() {
        return Err(EngineError::InsufficientData {
            side: "training",
            cutoff,
        });
    }
    if eval.len() <= EVAL_HEAD_DROP {
        return Err(EngineError::InsufficientData {
            side: "evaluation",
            cutoff,
        });
    }
    eval.drain(..EVAL_HEAD_DROP);
    Ok((train, eval))
}
