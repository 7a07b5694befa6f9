//! `log` backend speaking the host's plugin log protocol.
//!
//! The host reads plugin stderr line by line. A line framed as
//! `\x01<level>\x02<message>` is attributed to that level; `p` carries a
//! progress fraction for the running task.

use std::io::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

const START: char = '\u{1}';
const SEPARATOR: char = '\u{2}';

struct PluginLogger {
    level: LevelFilter,
}

impl Log for PluginLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let text = encode(level_char(record.level()), &record.args().to_string());
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    log::set_boxed_logger(Box::new(PluginLogger { level }))
        .map_err(|err| anyhow::anyhow!("plugin logger already installed: {err}"))?;
    log::set_max_level(level);
    Ok(())
}

/// Reports task progress in `[0, 1]`.
pub fn report_progress(fraction: f64) {
    let mut stderr = io::stderr().lock();
    let _ = stderr.write_all(progress_line(fraction).as_bytes());
    let _ = stderr.flush();
}

pub fn progress_line(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    encode('p', &fraction.to_string())
}

fn level_char(level: Level) -> char {
    match level {
        Level::Trace => 't',
        Level::Debug => 'd',
        Level::Info => 'i',
        Level::Warn => 'w',
        Level::Error => 'e',
    }
}

/// Every physical line gets its own frame so multi-line messages keep their
/// level.
fn encode(level: char, message: &str) -> String {
    let mut out = String::new();
    for line in message.lines() {
        out.push(START);
        out.push(level);
        out.push(SEPARATOR);
        out.push_str(line);
        out.push('\n');
    }
    if out.is_empty() {
        out.push(START);
        out.push(level);
        out.push(SEPARATOR);
        out.push('\n');
    }
    out
}
