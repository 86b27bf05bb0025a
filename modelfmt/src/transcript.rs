//! Host chat records and the JSONL chat export loader.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Generation metadata the host attaches to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// One entry of the host's in-memory transcript. Read-only to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_user: bool,
    #[serde(default)]
    pub mes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<MessageExtra>,
}

impl MessageRecord {
    pub fn ai(name: &str, mes: &str, api: Option<&str>, model: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            is_user: false,
            mes: mes.to_string(),
            extra: Some(MessageExtra {
                api: api.map(String::from),
                model: model.map(String::from),
            }),
        }
    }

    pub fn user(name: &str, mes: &str) -> Self {
        Self {
            name: name.to_string(),
            is_user: true,
            mes: mes.to_string(),
            extra: None,
        }
    }

    /// `"<api> - <model>"`, or just the model when no api is recorded.
    /// None without a model.
    pub fn raw_identifier(&self) -> Option<String> {
        let extra = self.extra.as_ref()?;
        let model = non_blank(extra.model.as_deref())?;
        Some(match non_blank(extra.api.as_deref()) {
            Some(api) => format!("{} - {}", api, model),
            None => model.to_string(),
        })
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a chat export from disk. See [`parse_jsonl`].
pub fn load_jsonl(path: &Path) -> Result<Vec<MessageRecord>, TranscriptError> {
    let content = fs::read_to_string(path).map_err(|source| TranscriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_jsonl(&content)
}

/// One JSON object per line. Lines without a `mes` field (the chat header)
/// and blank lines are skipped.
pub fn parse_jsonl(content: &str) -> Result<Vec<MessageRecord>, TranscriptError> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .map_err(|source| TranscriptError::Json { line: i + 1, source })?;
        if value.get("mes").is_none() {
            continue;
        }
        let record = serde_json::from_value(value)
            .map_err(|source| TranscriptError::Json { line: i + 1, source })?;
        records.push(record);
    }
    Ok(records)
}
