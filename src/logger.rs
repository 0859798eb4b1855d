use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::diff::diff_json;

pub enum MessageLogMode {
    Full,
    /// First feedback body in full, then only the paths that changed.
    Diffed,
}

pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_feedback: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            mode,
            file,
            previous_feedback: None,
        })
    }

    pub fn log_command(&mut self, action: &str, topic: &str, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "topic": topic,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_feedback(&mut self, outcome: &str, body: &Value) {
        match self.mode {
            MessageLogMode::Full => {
                let entry = json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "state",
                    "outcome": outcome,
                    "body": body,
                });
                self.write_line(&entry);
            }
            MessageLogMode::Diffed => {
                let entry = match self.previous_feedback.replace(body.clone()) {
                    None => json!({
                        "ts": Utc::now().to_rfc3339(),
                        "dir": "state",
                        "outcome": outcome,
                        "full": true,
                        "body": body,
                    }),
                    Some(prev) => {
                        let mut changes = Vec::new();
                        diff_json(&prev, body, "", &mut changes);

                        let change_entries: Vec<Value> = changes
                            .iter()
                            .map(|(path, old, new)| {
                                json!({ "path": path, "old": old, "new": new })
                            })
                            .collect();

                        json!({
                            "ts": Utc::now().to_rfc3339(),
                            "dir": "state",
                            "outcome": outcome,
                            "changes": change_entries,
                        })
                    }
                };
                self.write_line(&entry);
            }
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
