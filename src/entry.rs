use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of timetabled event. Drives per-event colors in templates that color by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Lecture,
    Lab,
    Tutorial,
    Exam,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Lecture,
        EventType::Lab,
        EventType::Tutorial,
        EventType::Exam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Lecture => "lecture",
            EventType::Lab => "lab",
            EventType::Tutorial => "tutorial",
            EventType::Exam => "exam",
        }
    }

    /// Position in [`EventType::ALL`]; stable across releases.
    pub fn index(&self) -> usize {
        match self {
            EventType::Lecture => 0,
            EventType::Lab => 1,
            EventType::Tutorial => 2,
            EventType::Exam => 3,
        }
    }

    /// Guess the event type from the free-form details column of a timetable row.
    pub fn infer(details: Option<&str>, is_exam_timetable: bool) -> Self {
        if is_exam_timetable {
            return EventType::Exam;
        }
        let Some(details) = details else {
            return EventType::Lecture;
        };
        let lowered = details.to_ascii_lowercase();
        if lowered.contains("lab") || lowered.contains("practical") {
            EventType::Lab
        } else if lowered.contains("tut") {
            EventType::Tutorial
        } else if lowered.contains("exam") {
            EventType::Exam
        } else {
            EventType::Lecture
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lecture" | "lec" => Ok(EventType::Lecture),
            "lab" | "laboratory" | "practical" => Ok(EventType::Lab),
            "tutorial" | "tut" => Ok(EventType::Tutorial),
            "exam" | "examination" => Ok(EventType::Exam),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

/// One timetabled event as stored for a timetable source.
///
/// `day` is kept exactly as stored; it only becomes a [`Weekday`] when the
/// entry is grouped for rendering, where unparseable values are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub course_code: String,
    pub normalized_code: String,
    pub event_type: EventType,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScheduleEntry {
    pub fn new(
        course_code: impl Into<String>,
        event_type: EventType,
        day: impl Into<String>,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        let course_code = course_code.into();
        let normalized_code = crate::course_code::normalize_course_code(&course_code);
        Self {
            course_code,
            normalized_code,
            event_type,
            day: day.into(),
            start_time,
            end_time,
            location: String::new(),
            lecturer: None,
            details: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_lecturer(mut self, lecturer: impl Into<String>) -> Self {
        self.lecturer = Some(lecturer.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn weekday(&self) -> Option<Weekday> {
        parse_weekday(&self.day)
    }
}

/// Canonical academic week ordering used for grouping.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Accepts full English day names and three letter abbreviations, any case.
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let lowered = value.trim().to_ascii_lowercase();
    WEEK.into_iter().find(|day| {
        let name = weekday_name(*day).to_ascii_lowercase();
        lowered == name || (lowered.len() == 3 && name.starts_with(&lowered))
    })
}

/// Title-case a day string the way the importer stores it ("MONDAY" -> "Monday").
pub fn title_case_day(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}
