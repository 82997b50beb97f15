//! Open-in-editor round trip
//!
//! The preview asks the server to open a source location; the server answers
//! with a response echoing the request payload plus an `error` field.

use crate::channel::{ChannelEvent, ServerChannel, OPEN_IN_EDITOR_REQUEST, OPEN_IN_EDITOR_RESPONSE};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use storyloom_common::normalize_path;

pub trait EditorLauncher: Send + Sync {
    fn open(&self, file: &Path, line: Option<u64>, column: Option<u64>) -> Result<(), String>;
}

/// Spawns an external editor command
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: String,
}

impl CommandLauncher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Configured command, then `$EDITOR`, then `code`
    pub fn resolve(configured: Option<&str>) -> Self {
        let command = configured
            .map(str::to_string)
            .or_else(|| std::env::var("EDITOR").ok().filter(|value| !value.trim().is_empty()))
            .unwrap_or_else(|| "code".to_string());
        Self::new(command)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Program and arguments used to open `file`
    pub fn arguments(&self, file: &Path, line: Option<u64>, column: Option<u64>) -> Option<(String, Vec<String>)> {
        let mut parts = self.command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        let mut args: Vec<String> = parts.collect();

        let name = Path::new(&program)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&program)
            .to_string();

        match name.as_str() {
            "code" | "code-insiders" | "codium" | "cursor" => {
                let mut location = file.display().to_string();
                if let Some(line) = line {
                    location.push_str(&format!(":{line}"));
                    if let Some(column) = column {
                        location.push_str(&format!(":{column}"));
                    }
                }
                args.push("--goto".to_string());
                args.push(location);
            }
            "vim" | "nvim" | "vi" | "nano" | "emacs" => {
                if let Some(line) = line {
                    args.push(format!("+{line}"));
                }
                args.push(file.display().to_string());
            }
            _ => args.push(file.display().to_string()),
        }

        Some((program, args))
    }
}

impl EditorLauncher for CommandLauncher {
    fn open(&self, file: &Path, line: Option<u64>, column: Option<u64>) -> Result<(), String> {
        let (program, args) = self
            .arguments(file, line, column)
            .ok_or_else(|| "no editor command configured".to_string())?;

        tracing::info!(editor = %program, file = %file.display(), "opening in editor");
        Command::new(&program)
            .args(&args)
            .spawn()
            .map(|_| ())
            .map_err(|error| format!("failed to launch {program}: {error}"))
    }
}

/// Answer `openInEditorRequest` events on `channel`
pub fn register_open_in_editor(channel: &ServerChannel, root: PathBuf, launcher: Arc<dyn EditorLauncher>) {
    channel.on(OPEN_IN_EDITOR_REQUEST, move |channel, event| {
        let result = match event.payload.get("file").and_then(Value::as_str) {
            Some(file) => {
                let path = resolve_file(&root, file);
                let line = event.payload.get("line").and_then(Value::as_u64);
                let column = event.payload.get("column").and_then(Value::as_u64);
                launcher.open(&path, line, column)
            }
            None => Err("missing file".to_string()),
        };

        if let Err(error) = &result {
            tracing::warn!(%error, "open in editor failed");
        }

        let mut payload = match &event.payload {
            Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        payload.insert(
            "error".to_string(),
            result.err().map(Value::String).unwrap_or(Value::Null),
        );
        channel.emit(ChannelEvent::new(OPEN_IN_EDITOR_RESPONSE, Value::Object(payload)));
    });
}

/// Import paths and relative paths resolve against the project root
fn resolve_file(root: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        normalize_path(&root.join(path))
    }
}
