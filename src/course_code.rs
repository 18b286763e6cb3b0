//! Course code parsing and normalization.
//!
//! Master timetables and student input spell codes inconsistently
//! (`ACT 404`, `act404`, `ACT404 Lec 1`). Everything is matched on the
//! normalized `"<DEPT> <NUM>"` form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static COURSE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z]{3,4})\s?(\d{3})").expect("course code pattern is valid")
});

static LIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\n\r]+").expect("separator pattern is valid"));

/// A course string split into the code and whatever follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCourse {
    pub display_code: String,
    pub normalized_code: String,
    pub details: String,
}

pub fn normalize_course_code(code: &str) -> String {
    let clean = code.trim().to_uppercase();
    if clean.is_empty() {
        return String::new();
    }
    match COURSE_CODE.captures(&clean) {
        Some(caps) => format!("{} {}", &caps[1], &caps[2]),
        None => clean.replace(' ', ""),
    }
}

/// Finds a course code inside a timetable cell such as `"ENV324 Lab 2"`.
pub fn parse_course_string(course: &str) -> ParsedCourse {
    let upper = course.to_uppercase();
    if let Some(caps) = COURSE_CODE.captures(&upper) {
        let code = format!("{} {}", &caps[1], &caps[2]);
        // Offsets from the upper-cased copy are only valid on the original for ASCII input.
        let details = match caps.get(0) {
            Some(m) if course.is_char_boundary(m.end()) && upper.len() == course.len() => {
                course[m.end()..].trim().to_string()
            }
            Some(m) => upper[m.end()..].trim().to_string(),
            None => String::new(),
        };
        return ParsedCourse {
            display_code: code.clone(),
            normalized_code: code,
            details,
        };
    }
    ParsedCourse {
        display_code: course.to_string(),
        normalized_code: course.replace(' ', ""),
        details: String::new(),
    }
}

/// Splits user input into a sorted, de-duplicated set of normalized codes.
pub fn parse_course_codes(input: &str) -> Vec<String> {
    let mut codes = BTreeSet::new();
    for token in LIST_SEPARATOR.split(input) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let upper = token.to_uppercase();
        let mut matched = false;
        for caps in COURSE_CODE.captures_iter(&upper) {
            codes.insert(format!("{} {}", &caps[1], &caps[2]));
            matched = true;
        }
        if !matched {
            let normalized = normalize_course_code(token);
            if !normalized.is_empty() {
                codes.insert(normalized);
            }
        }
    }
    codes.into_iter().collect()
}
