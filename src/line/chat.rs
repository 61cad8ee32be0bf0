//! Chat command handler.
//!
//! Answers the status command with a one-line summary of the current
//! reports. The answer is deliberately coarser than the web verdict: it only
//! checks that enough reports say flooded, then names the majority category
//! using the same tally and tie-break as the consensus engine.

use crate::analysis::consensus::majority_category;
use crate::categories::CategoryTable;
use crate::model::Report;

/// "Flooding 🌊 " prefix.
pub const REPLY_FLOODED_PREFIX: &str = "นํ้าท่วม 🌊 ";
/// "No water level data".
pub const REPLY_NO_LEVEL: &str = "ไม่มีข้อมูลระดับนํ้า";
/// "Not flooded".
pub const REPLY_NOT_FLOODED: &str = "น้ำไม่ท่วม";

pub struct ChatCommandHandler {
    status_command: String,
    min_flooded: usize,
    table: CategoryTable,
}

impl ChatCommandHandler {
    pub fn new(status_command: &str, min_flooded: usize, table: CategoryTable) -> Self {
        ChatCommandHandler {
            status_command: status_command.to_string(),
            min_flooded,
            table,
        }
    }

    pub fn is_status_command(&self, text: &str) -> bool {
        text.trim() == self.status_command
    }

    /// Returns the reply for `text`, or `None` when it is not a command.
    ///
    /// `load_reports` is only called for a recognized command.
    pub fn handle<F>(&self, text: &str, load_reports: F) -> Option<String>
    where
        F: FnOnce() -> Vec<Report>,
    {
        if !self.is_status_command(text) {
            return None;
        }
        Some(self.status_reply(&load_reports()))
    }

    pub fn status_reply(&self, reports: &[Report]) -> String {
        let flooded_count = reports.iter().filter(|r| r.flooded).count();
        if flooded_count < self.min_flooded {
            return REPLY_NOT_FLOODED.to_string();
        }

        let level = majority_category(reports)
            .and_then(|m| self.table.find(m.key))
            .map(|category| category.chat_label.as_str())
            .unwrap_or(REPLY_NO_LEVEL);

        format!("{}{}", REPLY_FLOODED_PREFIX, level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STATUS_COMMAND;

    fn handler() -> ChatCommandHandler {
        ChatCommandHandler::new(DEFAULT_STATUS_COMMAND, 3, CategoryTable::default())
    }

    #[test]
    fn test_other_text_gets_no_reply_and_skips_store() {
        let reply = handler().handle("hello", || panic!("store must not be read"));
        assert!(reply.is_none());
    }

    #[test]
    fn test_command_with_surrounding_whitespace_is_recognized() {
        let command = format!(" {}\n", DEFAULT_STATUS_COMMAND);
        assert!(handler().is_status_command(&command));
    }

    #[test]
    fn test_fewer_than_three_flooded_is_not_flooded() {
        let reports = vec![
            Report::flooded(Some("car")),
            Report::flooded(Some("car")),
            Report::dry(),
        ];
        let reply = handler().handle(DEFAULT_STATUS_COMMAND, || reports);
        assert_eq!(reply.as_deref(), Some(REPLY_NOT_FLOODED));
    }

    #[test]
    fn test_flooded_with_majority_category_names_localized_label() {
        // Flooded count is an absolute check: dry reports do not veto it.
        let mut reports = vec![
            Report::flooded(Some("motorcycle")),
            Report::flooded(Some("motorcycle")),
            Report::flooded(Some("car")),
        ];
        reports.extend((0..10).map(|_| Report::dry()));
        let reply = handler().status_reply(&reports);
        let expected = format!("{}{}", REPLY_FLOODED_PREFIX, "รถจักรยานยนต์ผ่านไม่ได้");
        assert_eq!(reply, expected);
    }

    #[test]
    fn test_flooded_without_categories_says_no_level_data() {
        let reports: Vec<Report> = (0..3).map(|_| Report::flooded(None)).collect();
        let reply = handler().status_reply(&reports);
        assert_eq!(reply, format!("{}{}", REPLY_FLOODED_PREFIX, REPLY_NO_LEVEL));
    }

    #[test]
    fn test_unknown_majority_category_says_no_level_data() {
        let reports: Vec<Report> = (0..3).map(|_| Report::flooded(Some("boat"))).collect();
        let reply = handler().status_reply(&reports);
        assert!(reply.ends_with(REPLY_NO_LEVEL));
    }

    #[test]
    fn test_tie_uses_engine_tie_break() {
        let reports = vec![
            Report::flooded(Some("walkable")),
            Report::flooded(Some("car")),
            Report::flooded(Some("car")),
            Report::flooded(Some("walkable")),
        ];
        let reply = handler().status_reply(&reports);
        let walkable = CategoryTable::default()
            .find("walkable")
            .map(|c| c.chat_label.clone())
            .expect("walkable is built in");
        assert!(reply.ends_with(&walkable));
    }
}
