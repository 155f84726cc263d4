use std::collections::HashSet;

use rand::Rng;

use crate::core::error::TaskError;

/// Inclusive id range. Three digits keeps ids short enough to type in chat.
const ID_MIN: i64 = 100;
const ID_MAX: i64 = 999;

/// How many random draws to attempt before giving up. The budget is fixed
/// rather than falling back to an exhaustive scan, so allocation can fail
/// probabilistically once most of the 900-value space is taken.
const MAX_ATTEMPTS: u32 = 100;

/// Draw a random id in [100, 999] that is not already taken.
pub(crate) fn allocate_id(existing: &HashSet<i64>) -> Result<i64, TaskError> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ATTEMPTS {
        let candidate = rng.gen_range(ID_MIN..=ID_MAX);
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(TaskError::IdSpaceExhausted(MAX_ATTEMPTS))
}
