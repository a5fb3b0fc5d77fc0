use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    classify::MediaKind,
    domain::{MessageId, RunSummary},
    errors::Error,
    Result,
};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for the run log).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Run Event Log ==============

const RUN_LOG_MAX_TEXT: usize = 500;

/// One line of the append-only run log: an item outcome or the final summary.
#[derive(Clone, Debug, Serialize)]
pub struct RunEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errored: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl RunEvent {
    fn base(event: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            message_id: None,
            file: None,
            kind: None,
            error: None,
            downloaded: None,
            skipped: None,
            errored: None,
            output_dir: None,
        }
    }

    pub fn downloaded(message_id: MessageId, file: &str, kind: MediaKind) -> Self {
        Self {
            message_id: Some(message_id),
            file: Some(file.to_string()),
            kind: Some(kind.as_str().to_string()),
            ..Self::base("downloaded")
        }
    }

    pub fn skipped(message_id: MessageId) -> Self {
        Self {
            message_id: Some(message_id),
            ..Self::base("skipped")
        }
    }

    pub fn failed(message_id: MessageId, error: &str) -> Self {
        Self {
            message_id: Some(message_id),
            error: Some(error.to_string()),
            ..Self::base("error")
        }
    }

    pub fn summary(summary: &RunSummary) -> Self {
        Self {
            downloaded: Some(summary.downloaded),
            skipped: Some(summary.skipped),
            errored: Some(summary.errored),
            output_dir: Some(summary.output_dir.clone()),
            ..Self::base("summary")
        }
    }
}

/// Append-only log of run events, one per processed item plus the summary.
///
/// Observability only; nothing ever reads this back to resume a run.
#[derive(Clone, Debug)]
pub struct RunLog {
    path: PathBuf,
    json: bool,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: RunEvent) -> Result<()> {
        // Error text can embed whole server responses; cap it.
        if let Some(s) = &event.error {
            event.error = Some(truncate_text(s, RUN_LOG_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let mut out = String::new();
        out.push('\n');
        out.push_str(&"=".repeat(60));

        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::External("run event is not a JSON object".to_string()));
        };
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            out.push_str(&json_value_to_display(v));
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

fn json_value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "<unprintable>".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(RUN_LOG_MAX_TEXT + 10);
        let t = truncate_text(&s, RUN_LOG_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert!(t.len() >= RUN_LOG_MAX_TEXT);
    }

    #[test]
    fn run_log_truncates_error_text() {
        let log = RunLog::new(tmp_file("tgrab-runlog-test"), true);
        let error = "x".repeat(RUN_LOG_MAX_TEXT + 50);
        log.write(RunEvent::failed(MessageId(3), &error)).unwrap();
        let written = std::fs::read_to_string(log.path()).unwrap();
        assert!(written.contains("..."));
        assert!(!written.contains(&error));
    }

    #[test]
    fn run_log_writes_one_json_line_per_event() {
        let log = RunLog::new(tmp_file("tgrab-runlog-json-test"), true);
        log.write(RunEvent::downloaded(
            MessageId(1),
            "photo_20240309_143005_1.jpg",
            MediaKind::Photo,
        ))
        .unwrap();
        log.write(RunEvent::skipped(MessageId(2))).unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }

    #[test]
    fn summary_event_carries_all_counters() {
        let mut summary = RunSummary::new("/tmp/out");
        summary.downloaded = 3;
        summary.skipped = 1;
        let ev = RunEvent::summary(&summary);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["downloaded"], 3);
        assert_eq!(v["skipped"], 1);
        assert_eq!(v["errored"], 0);
    }
}
