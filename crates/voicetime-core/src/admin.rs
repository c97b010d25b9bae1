//! Administrative operations invoked by the command layer.
//!
//! Authorization is the caller's job; these only validate well-formedness.

use crate::error::{Result, ValidationError};
use crate::storage::{ThresholdRecord, ThresholdStore, TimeStore};
use crate::{MemberId, RoleId};

/// Remove a member's voice record. Returns whether one existed.
pub fn delete_time<S: TimeStore + ?Sized>(store: &S, member_id: MemberId) -> Result<bool> {
    let existed = store.delete_record(member_id)?;
    tracing::info!(member_id, existed, "deleted voice record");
    Ok(existed)
}

/// Remove every voice record. Thresholds are untouched.
pub fn reset_all<S: TimeStore + ?Sized>(store: &S) -> Result<usize> {
    let removed = store.delete_all_records()?;
    tracing::info!(removed, "reset all voice records");
    Ok(removed)
}

/// Add a threshold rule. Duplicate or overlapping rules are accepted.
pub fn add_threshold<S: ThresholdStore + ?Sized>(
    store: &S,
    role_id: RoleId,
    required_minutes: f64,
) -> Result<ThresholdRecord> {
    if !required_minutes.is_finite() || required_minutes < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "required_minutes".into(),
            message: format!("must be a non-negative number, got {required_minutes}"),
        }
        .into());
    }
    if i64::try_from(role_id).is_err() {
        return Err(ValidationError::InvalidValue {
            field: "role_id".into(),
            message: format!("{role_id} is not a valid snowflake"),
        }
        .into());
    }

    let record = store.insert_threshold(role_id, required_minutes)?;
    tracing::info!(role_id, required_minutes, id = record.id, "added threshold");
    Ok(record)
}

/// Remove every threshold rule for a role. Returns the number removed.
pub fn remove_threshold<S: ThresholdStore + ?Sized>(store: &S, role_id: RoleId) -> Result<usize> {
    let removed = store.delete_thresholds(role_id)?;
    tracing::info!(role_id, removed, "removed thresholds");
    Ok(removed)
}

pub fn list_thresholds<S: ThresholdStore + ?Sized>(store: &S) -> Result<Vec<ThresholdRecord>> {
    Ok(store.thresholds()?)
}
