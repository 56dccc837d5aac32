use crate::core::{Observation, Receiver};
use crate::validation::error::MlatError;
use std::collections::HashSet;

/// Check that enough receivers are present for the number of unknowns
pub fn check_receiver_count(receivers: &[Receiver], required: usize) -> Result<(), MlatError> {
    if receivers.len() < required {
        return Err(MlatError::InsufficientReceivers {
            available: receivers.len(),
            required,
        });
    }
    Ok(())
}

/// Reject receiver sets in which an id repeats
pub fn check_unique_ids(receivers: &[Receiver]) -> Result<(), MlatError> {
    let mut seen = HashSet::with_capacity(receivers.len());
    for receiver in receivers {
        if !seen.insert(receiver.id.as_str()) {
            return Err(MlatError::MismatchedObservations {
                reason: format!("receiver id '{}' appears more than once", receiver.id),
            });
        }
    }
    Ok(())
}

/// Line an observation up with the receiver set.
///
/// Returns the reception times in receiver order. Fails when the counts
/// differ, a receiver has no timestamp, the observation names an unknown
/// receiver, receiver ids repeat, or a timestamp is not finite.
pub fn align_observations(receivers: &[Receiver], observation: &Observation) -> Result<Vec<f64>, MlatError> {
    check_unique_ids(receivers)?;
    let known: HashSet<&str> = receivers.iter().map(|r| r.id.as_str()).collect();

    if observation.len() != receivers.len() {
        return Err(MlatError::MismatchedObservations {
            reason: format!("{} receivers but {} timestamps", receivers.len(), observation.len()),
        });
    }

    if let Some((unknown, _)) = observation.iter().find(|(id, _)| !known.contains(id)) {
        return Err(MlatError::MismatchedObservations {
            reason: format!("timestamp for unknown receiver '{}'", unknown),
        });
    }

    let mut times = Vec::with_capacity(receivers.len());
    for receiver in receivers {
        let time = observation.get(&receiver.id).ok_or_else(|| MlatError::MismatchedObservations {
            reason: format!("no timestamp for receiver '{}'", receiver.id),
        })?;
        if !time.is_finite() {
            return Err(MlatError::MismatchedObservations {
                reason: format!("timestamp for receiver '{}' is not finite", receiver.id),
            });
        }
        times.push(time);
    }

    Ok(times)
}
