// Persisted form of the reminder state
//
// One JSON blob: `{"schedules": [[id, schedule], ...], "logs": [entry, ...]}`.
// Schedules are stored as ordered pairs and the log newest first.

use crate::errors::StorageError;
use crate::models::{IntakeLogEntry, MedicationSchedule};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

#[derive(Debug, Default, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub schedules: Vec<(String, MedicationSchedule)>,
    #[serde(default)]
    pub logs: Vec<IntakeLogEntry>,
}

#[derive(Serialize)]
struct PersistedStateRef<'a> {
    schedules: Vec<(&'a str, &'a MedicationSchedule)>,
    logs: &'a VecDeque<IntakeLogEntry>,
}

pub fn encode(
    schedules: &BTreeMap<String, MedicationSchedule>,
    logs: &VecDeque<IntakeLogEntry>,
) -> Result<String, StorageError> {
    let state = PersistedStateRef {
        schedules: schedules.iter().map(|(id, s)| (id.as_str(), s)).collect(),
        logs,
    };
    Ok(serde_json::to_string(&state)?)
}

pub fn decode(json: &str) -> Result<PersistedState, StorageError> {
    Ok(serde_json::from_str(json)?)
}
