//! Progress logging for pipeline stages.
//!
//! Stages report through a small leveled vocabulary (info, success,
//! warning, error) with optional indentation for nested detail. Entries
//! are emitted as `tracing` events carrying the stage name, so the
//! subscriber installed by the binary decides formatting and filtering.

use tracing::{error, info, warn};

/// Log level for stage progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single progress entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth under the current stage line
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into(), indent: 0 }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into(), indent: 0 }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into(), indent: 0 }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Message with level marker and indentation applied.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠ ",
            LogLevel::Error => "✗ ",
        };
        format!("{}{}{}", "   ".repeat(self.indent as usize), prefix, self.message)
    }
}

/// Emit an entry for `stage`.
pub fn emit(stage: &str, entry: &LogEntry) {
    let line = entry.render();
    match entry.level {
        LogLevel::Info | LogLevel::Success => info!(stage = stage, "{}", line),
        LogLevel::Warning => warn!(stage = stage, "{}", line),
        LogLevel::Error => error!(stage = stage, "{}", line),
    }
}

pub fn log_info(stage: &str, msg: impl Into<String>) {
    emit(stage, &LogEntry::info(msg));
}

pub fn log_success(stage: &str, msg: impl Into<String>) {
    emit(stage, &LogEntry::success(msg));
}

pub fn log_warning(stage: &str, msg: impl Into<String>) {
    emit(stage, &LogEntry::warning(msg));
}

pub fn log_error(stage: &str, msg: impl Into<String>) {
    emit(stage, &LogEntry::error(msg));
}

pub fn log_info_indent(stage: &str, msg: impl Into<String>, indent: u8) {
    emit(stage, &LogEntry::info(msg).with_indent(indent));
}
