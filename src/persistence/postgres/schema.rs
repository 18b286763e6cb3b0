diesel::table! {
    timetable_sources (id) {
        id -> Int8,
        academic_year -> Text,
        semester -> Text,
        display_name -> Text,
        timetable_type -> Text,
        description -> Nullable<Text>,
        status -> Text,
        events_parsed -> Bool,
        total_events -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    timetable_events (id) {
        id -> Int8,
        source_id -> Int8,
        day -> Text,
        start_time -> Time,
        end_time -> Time,
        location -> Text,
        course_code -> Text,
        normalized_code -> Text,
        event_type -> Text,
        details -> Nullable<Text>,
        lecturer -> Nullable<Text>,
    }
}

diesel::joinable!(timetable_events -> timetable_sources (source_id));

diesel::allow_tables_to_appear_in_same_query!(timetable_events, timetable_sources);
