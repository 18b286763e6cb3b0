use crate::entry::ScheduleEntry;
use std::fmt;

#[derive(Debug, Clone)]
pub struct EntryValidationError {
    message: String,
}

impl EntryValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EntryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EntryValidationError {}

pub fn validate_entry(entry: &ScheduleEntry) -> Result<(), EntryValidationError> {
    if entry.course_code.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry on '{}' at {} has an empty course code",
            entry.day, entry.start_time
        )));
    }
    if entry.normalized_code.trim().is_empty() {
        return Err(EntryValidationError::new(format!(
            "entry '{}' has an empty normalized code",
            entry.course_code
        )));
    }
    if entry.end_time <= entry.start_time {
        return Err(EntryValidationError::new(format!(
            "entry '{}' on '{}' ends at {} which is not after its start {}",
            entry.course_code, entry.day, entry.end_time, entry.start_time
        )));
    }
    Ok(())
}

pub fn validate_entry_collection(entries: &[ScheduleEntry]) -> Result<(), EntryValidationError> {
    for (idx, entry) in entries.iter().enumerate() {
        validate_entry(entry)
            .map_err(|err| EntryValidationError::new(format!("entry #{idx}: {err}")))?;
    }
    Ok(())
}
