use chrono::Weekday;
use serde::Serialize;

use crate::entry::EventType;
use crate::registry::TemplateKind;
use crate::source::TimetableType;

/// What an entry's color is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorStrategy {
    ByDay,
    ByEventType,
}

/// Fixed per-template palette. Lookups are pure functions of the index, so
/// re-rendering the same data yields the same colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub strategy: ColorStrategy,
    pub palette: &'static [&'static str],
    pub day_accents: &'static [&'static str],
}

const GRID_TYPES: &[&str] = &["#2563eb", "#16a34a", "#d97706", "#dc2626"];
const GRID_DAYS: &[&str] = &["#f8f9fa"];

const MINIMALIST_DAYS: &[&str] = &[
    "#111827", "#374151", "#4b5563", "#6b7280", "#9ca3af", "#d1d5db", "#e5e7eb",
];

const COLORFUL_DAYS: &[&str] = &[
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#06b6d4", "#6366f1", "#d946ef",
];

const ACADEMIC_TYPES: &[&str] = &["#1e3a8a", "#065f46", "#78350f", "#7f1d1d"];
const ACADEMIC_DAYS: &[&str] = &["#f5f5f4", "#e7e5e4"];

const MODERN_TYPES: &[&str] = &["#3b82f6", "#22c55e", "#f59e0b", "#ef4444"];
const MODERN_DAYS: &[&str] = &["#334155", "#475569"];

const COMPACT_DAYS: &[&str] = &[
    "#dbeafe", "#dcfce7", "#fef9c3", "#fee2e2", "#ede9fe", "#cffafe", "#fce7f3",
];

impl ColorScheme {
    pub fn for_template(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Grid => Self {
                strategy: ColorStrategy::ByEventType,
                palette: GRID_TYPES,
                day_accents: GRID_DAYS,
            },
            TemplateKind::Minimalist => Self {
                strategy: ColorStrategy::ByDay,
                palette: MINIMALIST_DAYS,
                day_accents: MINIMALIST_DAYS,
            },
            TemplateKind::Colorful => Self {
                strategy: ColorStrategy::ByDay,
                palette: COLORFUL_DAYS,
                day_accents: COLORFUL_DAYS,
            },
            TemplateKind::Academic => Self {
                strategy: ColorStrategy::ByEventType,
                palette: ACADEMIC_TYPES,
                day_accents: ACADEMIC_DAYS,
            },
            TemplateKind::ModernCard => Self {
                strategy: ColorStrategy::ByEventType,
                palette: MODERN_TYPES,
                day_accents: MODERN_DAYS,
            },
            TemplateKind::Compact => Self {
                strategy: ColorStrategy::ByDay,
                palette: COMPACT_DAYS,
                day_accents: COMPACT_DAYS,
            },
        }
    }

    pub fn entry_color(&self, day: Weekday, event_type: EventType) -> &'static str {
        match self.strategy {
            ColorStrategy::ByDay => pick(self.palette, day.num_days_from_monday() as usize),
            ColorStrategy::ByEventType => pick(self.palette, event_type.index()),
        }
    }

    pub fn day_color(&self, day: Weekday) -> &'static str {
        pick(self.day_accents, day.num_days_from_monday() as usize)
    }
}

fn pick(palette: &'static [&'static str], index: usize) -> &'static str {
    if palette.is_empty() {
        return "#000000";
    }
    palette[index % palette.len()]
}

/// Page-level colors and heading, chosen by timetable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub background: &'static str,
    pub header: &'static str,
    pub card_background: &'static str,
    pub card_border: &'static str,
    pub heading: &'static str,
}

impl Theme {
    pub fn for_timetable(timetable_type: TimetableType) -> Self {
        if timetable_type.is_exam() {
            Self {
                background: "#fef3f2",
                header: "#dc2626",
                card_background: "#fee2e2",
                card_border: "#dc2626",
                heading: "Exam Schedule",
            }
        } else {
            Self {
                background: "#fafafa",
                header: "#1e293b",
                card_background: "#dbeafe",
                card_border: "#2563eb",
                heading: "Class Schedule",
            }
        }
    }
}
