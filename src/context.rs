//! Render context: the data handed to a template.
//!
//! Built fresh for each request from a slice of schedule entries. Grouping
//! follows the canonical Monday..Sunday week, Monday to Friday always present
//! and weekend days only when they hold entries. Entries whose day does not
//! name a weekday are dropped and counted.

use chrono::{NaiveTime, Timelike, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::entry::{EventType, ScheduleEntry, WEEK, weekday_name};
use crate::palette::{ColorStrategy, Theme};
use crate::registry::TemplateKind;
use crate::source::{TimetableSource, TimetableType};

pub const GENERATOR: &str = "Timeli";

/// Source metadata shown in document headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub display_name: String,
    pub timetable_type: TimetableType,
    pub academic_year: String,
    pub semester: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SourceInfo {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            id: None,
            display_name: display_name.into(),
            timetable_type: TimetableType::Teaching,
            academic_year: String::new(),
            semester: String::new(),
            description: None,
        }
    }
}

impl From<&TimetableSource> for SourceInfo {
    fn from(source: &TimetableSource) -> Self {
        Self {
            id: Some(source.id),
            display_name: source.display_name.clone(),
            timetable_type: source.timetable_type,
            academic_year: source.academic_year.clone(),
            semester: source.semester.clone(),
            description: source.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryView {
    pub course_code: String,
    pub normalized_code: String,
    pub event_type: EventType,
    pub day: &'static str,
    pub start_time: String,
    pub end_time: String,
    pub time_range: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lecturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_level: Option<String>,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderContext {
    pub template: &'static str,
    pub template_path: &'static str,
    pub source_name: String,
    pub source: SourceInfo,
    pub theme: Theme,
    pub color_strategy: ColorStrategy,
    pub days_of_week: Vec<&'static str>,
    pub schedule: BTreeMap<&'static str, Vec<EntryView>>,
    pub day_colors: BTreeMap<&'static str, &'static str>,
    /// Legend: event type or day name -> color, depending on the strategy.
    pub colors: BTreeMap<String, &'static str>,
    pub event_count: usize,
    pub dropped_entries: usize,
    pub generator: &'static str,
}

impl RenderContext {
    pub fn kind(&self) -> TemplateKind {
        TemplateKind::resolve(Some(self.template))
    }

    pub fn entries_for(&self, day: &str) -> &[EntryView] {
        self.schedule.get(day).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Keeps only entries whose normalized code is in `codes`.
pub fn select_entries(entries: &[ScheduleEntry], codes: &[String]) -> Vec<ScheduleEntry> {
    let wanted: HashSet<&str> = codes.iter().map(String::as_str).collect();
    entries
        .iter()
        .filter(|entry| wanted.contains(entry.normalized_code.as_str()))
        .cloned()
        .collect()
}

pub fn build_context(
    entries: &[ScheduleEntry],
    source: SourceInfo,
    template: TemplateKind,
) -> RenderContext {
    let scheme = template.color_scheme();
    let mut grouped: HashMap<Weekday, Vec<&ScheduleEntry>> = HashMap::new();
    let mut dropped = 0usize;

    for entry in entries {
        match entry.weekday() {
            Some(day) => grouped.entry(day).or_default().push(entry),
            None => {
                dropped += 1;
                tracing::warn!(
                    course = %entry.course_code,
                    day = %entry.day,
                    "dropping schedule entry with unrecognised day"
                );
            }
        }
    }

    let days: Vec<Weekday> = WEEK
        .into_iter()
        .filter(|day| day.num_days_from_monday() < 5 || grouped.contains_key(day))
        .collect();

    let mut schedule = BTreeMap::new();
    let mut day_colors = BTreeMap::new();
    let mut colors = BTreeMap::new();
    let mut event_count = 0usize;

    for day in &days {
        let name = weekday_name(*day);
        let mut day_entries = grouped.remove(day).unwrap_or_default();
        day_entries.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.end_time.cmp(&b.end_time))
                .then_with(|| a.course_code.cmp(&b.course_code))
        });

        let views: Vec<EntryView> = day_entries
            .into_iter()
            .map(|entry| {
                let color = scheme.entry_color(*day, entry.event_type);
                let legend_key = match scheme.strategy {
                    ColorStrategy::ByDay => name.to_string(),
                    ColorStrategy::ByEventType => entry.event_type.as_str().to_string(),
                };
                colors.insert(legend_key, color);
                entry_view(entry, name, color)
            })
            .collect();

        event_count += views.len();
        day_colors.insert(name, scheme.day_color(*day));
        schedule.insert(name, views);
    }

    RenderContext {
        template: template.key(),
        template_path: template.resource_path(),
        source_name: source.display_name.clone(),
        theme: Theme::for_timetable(source.timetable_type),
        source,
        color_strategy: scheme.strategy,
        days_of_week: days.iter().map(|d| weekday_name(*d)).collect(),
        schedule,
        day_colors,
        colors,
        event_count,
        dropped_entries: dropped,
        generator: GENERATOR,
    }
}

fn entry_view(entry: &ScheduleEntry, day: &'static str, color: &'static str) -> EntryView {
    let (exam_level, exam_date) = match entry.event_type {
        EventType::Exam => split_exam_details(entry.details.as_deref()),
        _ => (None, None),
    };
    EntryView {
        course_code: entry.course_code.clone(),
        normalized_code: entry.normalized_code.clone(),
        event_type: entry.event_type,
        day,
        start_time: entry.start_time.format("%H:%M").to_string(),
        end_time: entry.end_time.format("%H:%M").to_string(),
        time_range: format!(
            "{} - {}",
            short_time(entry.start_time),
            short_time(entry.end_time)
        ),
        location: entry.location.clone(),
        lecturer: entry.lecturer.clone().filter(|l| !l.trim().is_empty()),
        details: entry.details.clone().filter(|d| !d.trim().is_empty()),
        exam_date,
        exam_level,
        color,
    }
}

fn short_time(time: NaiveTime) -> String {
    format!("{}:{:02}", time.hour(), time.minute())
}

/// Exam rows carry `"Level: <level>, Date: <date>"` in their details.
pub fn split_exam_details(details: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(details) = details else {
        return (None, None);
    };
    let level = details.split_once("Level: ").and_then(|(_, rest)| {
        let level = rest.split(',').next().unwrap_or_default().trim();
        (!level.is_empty()).then(|| level.to_string())
    });
    let date = details.split_once("Date: ").and_then(|(_, rest)| {
        let date = rest.trim();
        (!date.is_empty()).then(|| date.to_string())
    });
    (level, date)
}
