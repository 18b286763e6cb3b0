use chrono::NaiveTime;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use timeli::persistence::import::{
    ExamTimetable, TeachingRecord, parse_clock, parse_exam_time, parse_time_range,
};
use timeli::persistence::{
    ingest_timetable_file, load_timetable_file, parse_exam_timetable, parse_teaching_csv,
    parse_teaching_timetable,
};
use timeli::{
    EventType, MemoryTimetableStore, NewTimetableSource, PersistenceError, SourceStatus,
    TimetableStore, TimetableType,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn record(day: &str, time: &str, course: &str, venue: &str, instructors: &str) -> TeachingRecord {
    TeachingRecord {
        day: day.into(),
        time: time.into(),
        course: course.into(),
        venue: venue.into(),
        instructors: instructors.into(),
    }
}

fn write_temp(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn parses_clock_formats() {
    assert_eq!(parse_clock("7:00a"), Some(t(7, 0)));
    assert_eq!(parse_clock("7:00AM"), Some(t(7, 0)));
    assert_eq!(parse_clock("12:30p"), Some(t(12, 30)));
    assert_eq!(parse_clock("12:00a"), Some(t(0, 0)));
    assert_eq!(parse_clock("9:00 pm"), Some(t(21, 0)));
    assert_eq!(parse_clock("14:30"), Some(t(14, 30)));
    assert_eq!(parse_clock("13:00pm"), None);
    assert_eq!(parse_clock("noon"), None);
}

#[test]
fn parses_time_ranges() {
    assert_eq!(parse_time_range("7:00a - 9:55a"), Some((t(7, 0), t(9, 55))));
    assert_eq!(
        parse_time_range("1:00PM - 2:55PM"),
        Some((t(13, 0), t(14, 55)))
    );
    assert_eq!(parse_time_range("TBA"), None);
}

#[test]
fn exam_sessions_last_three_hours() {
    assert_eq!(parse_exam_time("9:00am"), Some((t(9, 0), t(12, 0))));
    assert_eq!(parse_exam_time("1:30 PM"), Some((t(13, 30), t(16, 30))));
    assert_eq!(parse_exam_time("9:00"), None);
    assert_eq!(parse_exam_time("10:00pm"), None);
}

#[test]
fn teaching_rows_become_entries_and_bad_rows_are_skipped() {
    let records = vec![
        record("MONDAY", "7:00a - 9:55a", "ACT 404 Lec 1", "Great Hall", "Dr. Mensah"),
        record("Wednesday", "10:30a - 12:25p", "csc201 Lab 2", "Computer Lab 2", ""),
        record("Thursday", "8:00a - 9:00a", "MATH 152 Tut B", "Room 7", " "),
        record("Friday", "whenever", "ACT 404", "Great Hall", ""),
        record("Friday", "8:00a - 9:00a", "   ", "Great Hall", ""),
    ];
    let outcome = parse_teaching_timetable(&records);
    assert_eq!(outcome.entries.len(), 3);
    assert_eq!(outcome.skipped, 2);

    let lecture = &outcome.entries[0];
    assert_eq!(lecture.day, "Monday");
    assert_eq!(lecture.course_code, "ACT 404");
    assert_eq!(lecture.normalized_code, "ACT 404");
    assert_eq!(lecture.event_type, EventType::Lecture);
    assert_eq!(lecture.location, "Great Hall");
    assert_eq!(lecture.lecturer.as_deref(), Some("Dr. Mensah"));
    assert_eq!(lecture.details.as_deref(), Some("Lec 1"));

    let lab = &outcome.entries[1];
    assert_eq!(lab.normalized_code, "CSC 201");
    assert_eq!(lab.event_type, EventType::Lab);
    assert_eq!(lab.start_time, t(10, 30));
    assert_eq!(lab.end_time, t(12, 25));
    assert_eq!(lab.lecturer, None);

    assert_eq!(outcome.entries[2].event_type, EventType::Tutorial);
}

#[test]
fn exam_timetable_expands_every_course() {
    let timetable: ExamTimetable = serde_json::from_value(json!({
        "schedule": [{
            "days": [{
                "day": "TUESDAY",
                "date": "2025-05-06",
                "sessions": [
                    {
                        "time": "9:00am",
                        "exams": [{"level": "400", "courses": ["ACT 404", "ECON 401", " "]}]
                    },
                    {
                        "time": "TBA",
                        "exams": [{"level": "100", "courses": ["MATH 152"]}]
                    }
                ]
            }]
        }]
    }))
    .unwrap();

    let outcome = parse_exam_timetable(&timetable);
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.skipped, 1);
    let first = &outcome.entries[0];
    assert_eq!(first.day, "Tuesday");
    assert_eq!(first.event_type, EventType::Exam);
    assert_eq!(first.start_time, t(9, 0));
    assert_eq!(first.end_time, t(12, 0));
    assert_eq!(first.details.as_deref(), Some("Level: 400, Date: 2025-05-06"));
    assert_eq!(outcome.entries[1].normalized_code, "ECON 401");
}

#[test]
fn reads_teaching_csv() {
    let csv = "Day,Time,Course,Venue,Instructor(s)\n\
               Monday,7:00a - 9:55a,ACT 404,Great Hall,Dr. Mensah\n\
               Tuesday,bad,CSC 201,Lab,\n";
    let outcome = parse_teaching_csv(csv.as_bytes()).unwrap();
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.entries[0].lecturer.as_deref(), Some("Dr. Mensah"));
}

#[test]
fn loads_files_by_extension_and_type() {
    let json_file = write_temp(
        r#"[{"Day": "Monday", "Time": "7:00a - 9:55a", "Course": "ACT 404", "Venue": "Hall", "Instructor(s)": ""}]"#,
        ".json",
    );
    let outcome = load_timetable_file(json_file.path(), TimetableType::Teaching).unwrap();
    assert_eq!(outcome.entries.len(), 1);

    let csv_file = write_temp(
        "Day,Time,Course,Venue,Instructor(s)\nFriday,1:00p - 2:55p,CSC 201,Lab,\n",
        ".csv",
    );
    let outcome = load_timetable_file(csv_file.path(), TimetableType::Teaching).unwrap();
    assert_eq!(outcome.entries[0].day, "Friday");

    let exam_file = write_temp(
        r#"{"schedule": [{"days": [{"day": "Monday", "date": "5 May", "sessions": [{"time": "1:00pm", "exams": [{"level": "200", "courses": ["CSC 201"]}]}]}]}]}"#,
        ".json",
    );
    let outcome = load_timetable_file(exam_file.path(), TimetableType::Exam).unwrap();
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].event_type, EventType::Exam);
}

#[test]
fn non_list_teaching_json_is_invalid() {
    let file = write_temp(r#"{"rows": []}"#, ".json");
    let err = load_timetable_file(file.path(), TimetableType::Teaching).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn ingest_marks_source_completed() {
    let store = MemoryTimetableStore::new();
    let source = store
        .insert_source(NewTimetableSource::new("Teaching", TimetableType::Teaching))
        .unwrap();
    let file = write_temp(
        r#"[
            {"Day": "Monday", "Time": "7:00a - 9:55a", "Course": "ACT 404", "Venue": "Hall", "Instructor(s)": ""},
            {"Day": "Tuesday", "Time": "7:00a - 9:55a", "Course": "CSC 201 Lab", "Venue": "Lab", "Instructor(s)": ""},
            {"Day": "Tuesday", "Time": "later", "Course": "CSC 201", "Venue": "Lab", "Instructor(s)": ""}
        ]"#,
        ".json",
    );

    let outcome = ingest_timetable_file(&store, source.id, file.path()).unwrap();
    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.skipped, 1);

    let stored = store.find_source(source.id).unwrap().unwrap();
    assert_eq!(stored.status, SourceStatus::Completed);
    assert!(stored.events_parsed);
    assert_eq!(stored.total_events, 2);
    assert_eq!(store.events_for_source(source.id).unwrap().len(), 2);
}

#[test]
fn ingest_failure_marks_source_failed() {
    let store = MemoryTimetableStore::new();
    let source = store
        .insert_source(NewTimetableSource::new("Broken", TimetableType::Teaching))
        .unwrap();
    let file = write_temp("this is not json", ".json");

    let err = ingest_timetable_file(&store, source.id, file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::Serialization(_)));
    let stored = store.find_source(source.id).unwrap().unwrap();
    assert_eq!(stored.status, SourceStatus::Failed);
    assert!(store.events_for_source(source.id).unwrap().is_empty());
}

#[test]
fn ingest_requires_an_existing_source() {
    let store = MemoryTimetableStore::new();
    let file = write_temp("[]", ".json");
    let err = ingest_timetable_file(&store, 42, file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::SourceNotFound(42)));
}

#[derive(Clone, Default)]
struct CapturedLogs(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn late_exam_sessions_are_skipped_with_a_warning() {
    let timetable: ExamTimetable = serde_json::from_value(json!({
        "schedule": [{"days": [{"day": "friday", "date": "9 May", "sessions": [
            {"time": "9:00am", "exams": [{"level": "100", "courses": ["MATH 152"]}]},
            {"time": "10:00pm", "exams": [{"level": "300", "courses": ["ACT 404"]}]}
        ]}]}]
    }))
    .unwrap();

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let outcome =
        tracing::subscriber::with_default(subscriber, || parse_exam_timetable(&timetable));

    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.entries[0].course_code, "MATH 152");
    assert_eq!(outcome.skipped, 1);

    let output = String::from_utf8(logs.0.lock().clone()).unwrap();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("10:00pm"), "{output}");
    assert!(output.contains("Friday"), "{output}");
}
