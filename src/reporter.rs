//! Reporter Module: Trait-based output for Human (CLI) and Machine (JSON) formats
//!
//! ## Architecture
//!
//! - `Reporter` trait defines the event callbacks
//! - `JsonReporter` outputs NDJSON to stdout (for --format=json)
//! - `HumanReporter` outputs human-readable text to stderr
//! - `report_map` walks a map in key order and feeds a reporter
//!
//! ## Stdout Purity
//!
//! When JsonReporter is active, ONLY valid JSON goes to stdout.
//! All other output (logs, errors, debug) must go to stderr.

use crate::map::StrMap;
use serde::Serialize;
use tracing::error;

/// Machine-readable events for JSON output
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MachineEvent<'a> {
    /// Emitted before the first entry of a section
    DumpStart { section: &'a str, count: usize },
    /// One map entry
    Entry { key: &'a str, value: &'a str },
    /// Emitted after the last entry of a section
    DumpFinished { section: &'a str, count: usize },
    /// Emitted on fatal error
    Error { message: &'a str },
}

/// Reporter trait for output abstraction
pub trait Reporter {
    /// Called before a section is dumped
    fn on_dump_start(&mut self, section: &str, count: usize);

    /// Called once per entry, in key order
    fn on_entry(&mut self, key: &str, value: &str);

    /// Called after the last entry of a section
    fn on_dump_finished(&mut self, section: &str, count: usize);

    /// Called on fatal error
    fn on_error(&mut self, message: &str);
}

/// Dump every entry of `map` through `reporter` in key order
pub fn report_map<V: AsRef<str>>(section: &str, map: &StrMap<'_, V>, reporter: &mut dyn Reporter) {
    reporter.on_dump_start(section, map.len());
    let end = map.end();
    let mut cursor = map.begin();
    while cursor != end {
        reporter.on_entry(cursor.key(), cursor.value().as_ref());
        cursor = cursor.advance();
    }
    reporter.on_dump_finished(section, map.len());
}

/// JSON Reporter - outputs NDJSON to stdout
pub struct JsonReporter;

impl JsonReporter {
    fn emit(&self, event: &MachineEvent<'_>) {
        // ONLY JsonReporter touches stdout
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize event: {}", e),
        }
    }
}

impl Reporter for JsonReporter {
    fn on_dump_start(&mut self, section: &str, count: usize) {
        self.emit(&MachineEvent::DumpStart { section, count });
    }

    fn on_entry(&mut self, key: &str, value: &str) {
        self.emit(&MachineEvent::Entry { key, value });
    }

    fn on_dump_finished(&mut self, section: &str, count: usize) {
        self.emit(&MachineEvent::DumpFinished { section, count });
    }

    fn on_error(&mut self, message: &str) {
        self.emit(&MachineEvent::Error { message });
    }
}

/// Render `key = value`, with continuation lines aligned under the key
fn entry_lines(key: &str, value: &str) -> Vec<String> {
    let width = key.chars().count();
    let mut lines = value.lines();
    let mut rendered = vec![format!("  {} = {}", key, lines.next().unwrap_or(""))];
    for line in lines {
        rendered.push(format!("  {:width$}   {}", "", line, width = width));
    }
    rendered
}

/// Human Reporter - outputs readable text to stderr
pub struct HumanReporter;

impl Reporter for HumanReporter {
    fn on_dump_start(&mut self, section: &str, count: usize) {
        eprintln!("[tach] {} ({} entries)", section, count);
    }

    fn on_entry(&mut self, key: &str, value: &str) {
        for line in entry_lines(key, value) {
            eprintln!("{}", line);
        }
    }

    fn on_dump_finished(&mut self, _section: &str, _count: usize) {
        eprintln!();
    }

    fn on_error(&mut self, message: &str) {
        eprintln!("[tach] FATAL ERROR: {}", message);
    }
}

// =============================================================================
// MultiReporter
// =============================================================================

/// MultiReporter - broadcasts events to multiple reporters
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for MultiReporter {
    fn on_dump_start(&mut self, section: &str, count: usize) {
        for r in &mut self.reporters {
            r.on_dump_start(section, count);
        }
    }

    fn on_entry(&mut self, key: &str, value: &str) {
        for r in &mut self.reporters {
            r.on_entry(key, value);
        }
    }

    fn on_dump_finished(&mut self, section: &str, count: usize) {
        for r in &mut self.reporters {
            r.on_dump_finished(section, count);
        }
    }

    fn on_error(&mut self, message: &str) {
        for r in &mut self.reporters {
            r.on_error(message);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
