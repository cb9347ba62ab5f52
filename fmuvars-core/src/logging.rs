//! Protocol-level log messages.
//!
//! Besides the `log` facade used for engine diagnostics, a model instance keeps a
//! queue of messages for its host. Each message has a [`Status`] and a category;
//! the categories a model declares are listed in its description so that hosts can
//! filter them.
//!
//! Every queued message is mirrored to the `log` facade.

use crate::errors::FmuError;
use log::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a host-facing call, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Ok,
    Warning,
    Discard,
    Error,
    Fatal,
}

impl Status {
    /// Default log category for messages with this status.
    pub fn category(&self) -> String {
        format!("logStatus{}", self)
    }

    fn level(&self, debug: bool) -> Level {
        match self {
            Status::Ok if debug => Level::Debug,
            Status::Ok => Level::Info,
            Status::Warning | Status::Discard => Level::Warn,
            Status::Error | Status::Fatal => Level::Error,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "Ok",
            Status::Warning => "Warning",
            Status::Discard => "Discard",
            Status::Error => "Error",
            Status::Fatal => "Fatal",
        };
        f.write_str(name)
    }
}

impl From<&FmuError> for Status {
    fn from(value: &FmuError) -> Self {
        if value.is_fatal() {
            Status::Fatal
        } else {
            Status::Error
        }
    }
}

pub const LOG_ALL: &str = "logAll";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub status: Status,
    pub category: String,
    pub message: String,
    pub debug: bool,
}

/// Declared log categories and the queue of pending messages.
#[derive(Debug, Clone)]
pub struct Logger {
    categories: Vec<(String, String)>,
    queue: Vec<LogMessage>,
}

impl Default for Logger {
    fn default() -> Self {
        let categories = [
            ("logStatusWarning", "Log messages with fmi3Warning status."),
            ("logStatusDiscard", "Log messages with fmi3Discard status."),
            ("logStatusError", "Log messages with fmi3Error status."),
            ("logStatusFatal", "Log messages with fmi3Fatal status."),
            (LOG_ALL, "Log all messages."),
        ]
        .into_iter()
        .map(|(name, description)| (name.to_string(), description.to_string()))
        .collect();
        Self {
            categories,
            queue: vec![],
        }
    }
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared categories as (name, description), in declaration order.
    pub fn categories(&self) -> &[(String, String)] {
        &self.categories
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.iter().any(|(n, _)| n == name)
    }

    /// Declare a category, replacing the description of an existing one.
    pub fn add_category(&mut self, name: impl Into<String>, description: impl Into<String>) {
        let name = name.into();
        let description = description.into();
        match self.categories.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = description,
            None => self.categories.push((name, description)),
        }
    }

    /// Queue a message.
    ///
    /// Without an explicit category the category is derived from the status,
    /// falling back to `logAll` when that category is not declared.
    pub fn log(
        &mut self,
        message: impl Into<String>,
        status: Status,
        category: Option<&str>,
        debug: bool,
    ) {
        let category = match category {
            Some(category) => category.to_string(),
            None => {
                let derived = status.category();
                if self.has_category(&derived) {
                    derived
                } else {
                    LOG_ALL.to_string()
                }
            }
        };
        let message = message.into();
        log::log!(status.level(debug), "[{}] {}", category, message);
        self.queue.push(LogMessage {
            status,
            category,
            message,
            debug,
        });
    }

    /// Messages queued since the last drain.
    pub fn pending(&self) -> &[LogMessage] {
        &self.queue
    }

    pub fn drain(&mut self) -> Vec<LogMessage> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_status() {
        let mut logger = Logger::new();
        logger.log("careful", Status::Warning, None, false);
        logger.log("fine", Status::Ok, None, false);
        logger.log("custom", Status::Ok, Some("logEvents"), true);

        let categories: Vec<&str> = logger
            .pending()
            .iter()
            .map(|m| m.category.as_str())
            .collect();
        assert_eq!(categories, vec!["logStatusWarning", "logAll", "logEvents"]);
        assert!(logger.pending()[2].debug);
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut logger = Logger::new();
        logger.log("boom", Status::Fatal, None, false);
        let drained = logger.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].status, Status::Fatal);
        assert!(logger.pending().is_empty());
    }

    #[test]
    fn test_add_category() {
        let mut logger = Logger::new();
        assert_eq!(logger.categories().len(), 5);
        logger.add_category("logStatusOk", "Log messages with fmi3OK status.");
        logger.log("fine", Status::Ok, None, false);
        assert_eq!(logger.pending()[0].category, "logStatusOk");
        logger.add_category("logAll", "Everything");
        assert_eq!(logger.categories().len(), 6);
    }

    #[test]
    fn test_status_from_error() {
        assert_eq!(
            Status::from(&FmuError::DuplicateType("T".to_string())),
            Status::Fatal
        );
        assert_eq!(Status::from(&FmuError::UnknownReference(3)), Status::Error);
        assert!(Status::Warning < Status::Error);
    }
}
