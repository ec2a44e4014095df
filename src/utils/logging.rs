//! Structured logging with redaction
//!
//! Entries go through the `log` facade; the embedding application installs
//! the logger. Field values are redacted by key before rendering: key
//! material is hidden entirely, addresses and hashes are shortened.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Warn => log::Level::Warn,
        }
    }
}

/// One message plus `key=value` fields
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub target: &'static str,
    pub message: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: &'static str, message: &'static str) -> Self {
        Self {
            level,
            target,
            message,
            fields: Vec::new(),
        }
    }

    /// Whether an entry at `level` would reach the logger at all
    pub fn enabled(level: LogLevel, target: &'static str) -> bool {
        log::log_enabled!(target: target, log::Level::from(level))
    }

    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = redact_for_key(key, &value.to_string());
        self.fields.push((key, value));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from(self.message);
        for (i, (key, value)) in self.fields.iter().enumerate() {
            out.push_str(if i == 0 { " | " } else { " " });
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    pub fn log(self) {
        log::log!(target: self.target, self.level.into(), "{}", self.render());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redaction {
    Full,
    Address,
    Hash,
    None,
}

fn classify(key: &str) -> Redaction {
    let key = key.to_ascii_lowercase();
    if ["private_key", "secret", "signing_key"].iter().any(|k| key.contains(k)) {
        return Redaction::Full;
    }
    let address_keys = ["address", "fee_payer", "sender", "from", "to"];
    if address_keys
        .iter()
        .any(|k| key == *k || key.ends_with(&format!("_{}", k)))
    {
        return Redaction::Address;
    }
    if key == "hash" || key.ends_with("_hash") {
        return Redaction::Hash;
    }
    Redaction::None
}

fn redact_for_key(key: &str, value: &str) -> String {
    match classify(key) {
        Redaction::Full => redact_value(value),
        Redaction::Address => shorten(value, 8, 4),
        Redaction::Hash => shorten(value, 12, 6),
        Redaction::None => value.to_string(),
    }
}

fn redact_value(value: &str) -> String {
    match value.len() {
        0 => "[EMPTY]".to_string(),
        1..=4 => "[REDACTED]".to_string(),
        len => format!("[REDACTED:{}chars]", len),
    }
}

/// Keep `head` leading and `tail` trailing characters of a hex value
fn shorten(value: &str, head: usize, tail: usize) -> String {
    let value = value.trim();
    if value.len() <= head + tail + 3 || !value.is_ascii() {
        return value.to_string();
    }
    format!("{}...{}", &value[..head], &value[value.len() - tail..])
}

/// Build and emit an entry; fields are only rendered when the level is enabled.
#[doc(hidden)]
#[macro_export]
macro_rules! log_event {
    ($level:ident, $target:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        if $crate::utils::logging::LogEntry::enabled($crate::utils::logging::LogLevel::$level, $target) {
            $crate::utils::logging::LogEntry::new($crate::utils::logging::LogLevel::$level, $target, $msg)
                $(.field(stringify!($key), &$value))*
                .log()
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_event!(Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_event!(Warn, $($arg)*) };
}
