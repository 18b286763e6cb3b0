use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimetableType {
    #[default]
    Teaching,
    Exam,
    Personal,
    Event,
    Other,
}

impl TimetableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimetableType::Teaching => "teaching",
            TimetableType::Exam => "exam",
            TimetableType::Personal => "personal",
            TimetableType::Event => "event",
            TimetableType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimetableType::Teaching => "Teaching Schedule",
            TimetableType::Exam => "Exam Schedule",
            TimetableType::Personal => "Personal Schedule",
            TimetableType::Event => "Event Schedule",
            TimetableType::Other => "Other",
        }
    }

    pub fn is_exam(&self) -> bool {
        matches!(self, TimetableType::Exam)
    }
}

impl fmt::Display for TimetableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimetableType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "teaching" => Ok(TimetableType::Teaching),
            "exam" => Ok(TimetableType::Exam),
            "personal" => Ok(TimetableType::Personal),
            "event" => Ok(TimetableType::Event),
            "other" => Ok(TimetableType::Other),
            other => Err(format!("unknown timetable type '{other}'")),
        }
    }
}

/// Processing state of an uploaded master timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceStatus {
    #[default]
    Processing,
    Completed,
    Failed,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Processing => "PROCESSING",
            SourceStatus::Completed => "COMPLETED",
            SourceStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for SourceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PROCESSING" => Ok(SourceStatus::Processing),
            "COMPLETED" => Ok(SourceStatus::Completed),
            "FAILED" => Ok(SourceStatus::Failed),
            other => Err(format!("unknown source status '{other}'")),
        }
    }
}

/// A master timetable: the data source students select their courses from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableSource {
    pub id: i64,
    pub academic_year: String,
    pub semester: String,
    pub display_name: String,
    #[serde(default)]
    pub timetable_type: TimetableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: SourceStatus,
    #[serde(default)]
    pub events_parsed: bool,
    #[serde(default)]
    pub total_events: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering a new source; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimetableSource {
    pub academic_year: String,
    pub semester: String,
    pub display_name: String,
    #[serde(default)]
    pub timetable_type: TimetableType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewTimetableSource {
    pub fn new(display_name: impl Into<String>, timetable_type: TimetableType) -> Self {
        Self {
            academic_year: String::new(),
            semester: String::new(),
            display_name: display_name.into(),
            timetable_type,
            description: None,
        }
    }

    pub fn into_source(self, id: i64, created_at: DateTime<Utc>) -> TimetableSource {
        TimetableSource {
            id,
            academic_year: self.academic_year,
            semester: self.semester,
            display_name: self.display_name,
            timetable_type: self.timetable_type,
            description: self.description,
            status: SourceStatus::Processing,
            events_parsed: false,
            total_events: 0,
            created_at,
        }
    }
}
