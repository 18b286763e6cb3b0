use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use timeli::context::{SourceInfo, build_context, select_entries};
use timeli::persistence::{ingest_timetable_file, load_fixture_file, open_store};
use timeli::{
    AppConfig, DocumentFormat, NewTimetableSource, SourceStatus, TemplateKind, TemplateRegistry,
    TimetableRenderer, TimetableSource, TimetableStore, TimetableType, logging,
    parse_course_codes,
};

enum Outcome {
    Done(bool),
    Quit,
}

fn format_row<'a>(widths: &[usize], cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for (ci, cell) in cells.enumerate() {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}

fn render_text_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    // Compute column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if cell.len() > widths[ci] {
                widths[ci] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format_row(&widths, headers.iter().copied()));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&format_row(&widths, row.iter().map(String::as_str)));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn render_sources(sources: &[TimetableSource]) -> String {
    let rows: Vec<Vec<String>> = sources
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.timetable_type.to_string(),
                s.status.as_str().to_string(),
                s.total_events.to_string(),
                s.academic_year.clone(),
                s.semester.clone(),
                s.display_name.clone(),
            ]
        })
        .collect();
    render_text_table(
        &["id", "type", "status", "events", "year", "semester", "name"],
        &rows,
    )
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  migrate                            Create or update the database schema\n  loaddata <path>                    Load a fixture file (Django dumpdata JSON)\n  sources                            List timetable sources\n  show <id>                          Show one source and its events per day\n  import <type> <year> <semester> <path> <name...>\n                                     Register a source and parse its master timetable\n  reparse <id> <path>                Replace a source's events from a new file\n  delete <id>                        Delete a source and its events\n  templates                          List document templates\n  render <id> <codes...> <template> <out_path>\n                                     Render selected courses to .pdf, .jpg or .html;\n                                     separate several codes with commas (ACT 404,CSC 201)\n  quit|exit                          Exit"
    );
}

fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}

fn format_for_path(path: &Path) -> Option<DocumentFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(DocumentFormat::Pdf),
        "jpg" | "jpeg" => Some(DocumentFormat::Jpg),
        "html" | "htm" => Some(DocumentFormat::Html),
        _ => None,
    }
}

fn show_source(store: &dyn TimetableStore, id: i64) -> anyhow::Result<bool> {
    let Some(source) = store.find_source(id)? else {
        println!("Source {id} not found.");
        return Ok(false);
    };
    println!("{}", render_sources(std::slice::from_ref(&source)));
    if let Some(description) = &source.description {
        println!("{description}");
    }
    let events = store.events_for_source(id)?;
    let mut per_day: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &events {
        *per_day.entry(event.day.as_str()).or_default() += 1;
    }
    let rows: Vec<Vec<String>> = per_day
        .into_iter()
        .map(|(day, count)| vec![day.to_string(), count.to_string()])
        .collect();
    println!("{}", render_text_table(&["day", "events"], &rows));
    Ok(true)
}

fn import_source(
    store: &dyn TimetableStore,
    timetable_type: &str,
    year: &str,
    semester: &str,
    path: &str,
    name: &str,
) -> anyhow::Result<bool> {
    let timetable_type = match TimetableType::from_str(timetable_type) {
        Ok(t) => t,
        Err(e) => {
            println!("{e}");
            return Ok(false);
        }
    };
    let mut new_source = NewTimetableSource::new(name, timetable_type);
    new_source.academic_year = year.to_string();
    new_source.semester = semester.to_string();
    let source = store.insert_source(new_source)?;
    match ingest_timetable_file(store, source.id, path) {
        Ok(outcome) => {
            println!(
                "Imported source {}: {} event(s), {} row(s) skipped.",
                source.id,
                outcome.entries.len(),
                outcome.skipped
            );
            Ok(true)
        }
        Err(e) => {
            println!("Error importing {path}: {e}");
            println!("Source {} marked FAILED.", source.id);
            Ok(false)
        }
    }
}

fn reparse_source(store: &dyn TimetableStore, id: i64, path: &str) -> anyhow::Result<bool> {
    if store.find_source(id)?.is_none() {
        println!("Source {id} not found.");
        return Ok(false);
    }
    store.set_status(id, SourceStatus::Processing)?;
    match ingest_timetable_file(store, id, path) {
        Ok(outcome) => {
            println!(
                "Reparsed source {id}: {} event(s), {} row(s) skipped.",
                outcome.entries.len(),
                outcome.skipped
            );
            Ok(true)
        }
        Err(e) => {
            println!("Error reparsing source {id}: {e}");
            Ok(false)
        }
    }
}

fn render_to_file(
    store: &dyn TimetableStore,
    config: &AppConfig,
    id: i64,
    codes: &str,
    template: &str,
    out_path: &str,
) -> anyhow::Result<bool> {
    let out = Path::new(out_path);
    let Some(format) = format_for_path(out) else {
        println!("Output path must end in .pdf, .jpg or .html");
        return Ok(false);
    };
    let codes = parse_course_codes(codes);
    if codes.is_empty() {
        println!("At least one course code is required.");
        return Ok(false);
    }
    let Some(source) = store.find_source(id)? else {
        println!("Source {id} not found.");
        return Ok(false);
    };

    let renderer = TimetableRenderer::new(&config.render_config(), Arc::new(config.converter()))
        .context("loading timetable templates")?;
    let kind = TemplateKind::resolve(Some(template));
    let events = store.events_for_source(id)?;
    let context = build_context(
        &select_entries(&events, &codes),
        SourceInfo::from(&source),
        kind,
    );
    match renderer.render_document(&context, format) {
        Ok(document) => {
            fs::write(out, &document.bytes)
                .with_context(|| format!("writing {}", out.display()))?;
            println!(
                "Rendered {} event(s) with template '{}' to {}.",
                context.event_count,
                kind,
                out.display()
            );
            Ok(true)
        }
        Err(e) => {
            println!("Error rendering timetable: {e}");
            Ok(false)
        }
    }
}

fn run_command(
    store: &dyn TimetableStore,
    config: &AppConfig,
    parts: &[&str],
) -> anyhow::Result<Outcome> {
    let Some((&cmd, args)) = parts.split_first() else {
        return Ok(Outcome::Done(true));
    };

    let ok = match cmd {
        "help" => {
            print_help();
            true
        }
        "quit" | "exit" => return Ok(Outcome::Quit),
        "migrate" => {
            // Opening the store already applied the schema.
            println!(
                "Database schema is up to date ({}: {}).",
                config.database.backend(),
                config.database
            );
            true
        }
        "loaddata" => match args.first() {
            Some(path) => match load_fixture_file(store, path) {
                Ok(summary) => {
                    println!(
                        "Installed {} source(s) and {} event(s) from {path} ({} record(s) skipped).",
                        summary.sources, summary.events, summary.skipped
                    );
                    true
                }
                Err(e) => {
                    println!("Error loading fixture: {e}");
                    false
                }
            },
            None => {
                println!("Usage: loaddata <path>");
                false
            }
        },
        "sources" => {
            let sources = store.list_sources(None)?;
            if sources.is_empty() {
                println!("No timetable sources.");
            } else {
                println!("{}", render_sources(&sources));
            }
            true
        }
        "show" => match parse_id(args.first().copied()) {
            Some(id) => show_source(store, id)?,
            None => {
                println!("Usage: show <id>");
                false
            }
        },
        "import" => match args {
            [timetable_type, year, semester, path, name @ ..] if !name.is_empty() => {
                import_source(store, timetable_type, year, semester, path, &name.join(" "))?
            }
            _ => {
                println!("Usage: import <type> <year> <semester> <path> <name...>");
                false
            }
        },
        "reparse" => match (parse_id(args.first().copied()), args.get(1)) {
            (Some(id), Some(path)) => reparse_source(store, id, path)?,
            _ => {
                println!("Usage: reparse <id> <path>");
                false
            }
        },
        "delete" => match parse_id(args.first().copied()) {
            Some(id) => {
                if store.delete_source(id)? {
                    println!("Deleted source {id}.");
                    true
                } else {
                    println!("Source {id} not found.");
                    false
                }
            }
            None => {
                println!("Usage: delete <id>");
                false
            }
        },
        "templates" => {
            let registry = TemplateRegistry::new();
            let rows: Vec<Vec<String>> = registry
                .descriptors()
                .iter()
                .map(|d| {
                    vec![
                        d.key.to_string(),
                        d.aliases.join(","),
                        d.path.to_string(),
                        d.title.to_string(),
                    ]
                })
                .collect();
            println!(
                "{}",
                render_text_table(&["key", "aliases", "path", "title"], &rows)
            );
            true
        }
        "render" => match args {
            // Codes may be split across words, as in `render 1 ACT 404 grid out.pdf`.
            [id, codes @ .., template, out_path] if !codes.is_empty() => match parse_id(Some(*id)) {
                Some(id) => {
                    render_to_file(store, config, id, &codes.join(" "), template, out_path)?
                }
                None => {
                    println!("Invalid id");
                    false
                }
            },
            _ => {
                println!("Usage: render <id> <codes...> <template> <out_path>");
                false
            }
        },
        _ => {
            println!("Unknown command. Type 'help'.");
            false
        }
    };
    Ok(Outcome::Done(ok))
}

fn run() -> anyhow::Result<ExitCode> {
    logging::init_tracing();
    let config = AppConfig::from_env()?;
    let store = open_store(&config.database)
        .with_context(|| format!("opening database {}", config.database))?;

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if !argv.is_empty() {
        let parts: Vec<&str> = argv.iter().map(String::as_str).collect();
        let ok = match run_command(store.as_ref(), &config, &parts)? {
            Outcome::Done(ok) => ok,
            Outcome::Quit => true,
        };
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    println!("Timeli admin (CLI) - type 'help' for commands\n");
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }
        match run_command(store.as_ref(), &config, &parts) {
            Ok(Outcome::Quit) => break,
            Ok(Outcome::Done(_)) => {}
            Err(e) => println!("Error: {e:#}"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
