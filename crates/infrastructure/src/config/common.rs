//! Shared config error type and file-permission hygiene.

use std::path::Path;

use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

pub(super) fn validation(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Warn when a sensitive file is readable by group or other (Unix only).
pub fn warn_if_world_readable(path: &Path, what: &str) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode & 0o037 != 0 {
                warn!(path = %path.display(), mode = format!("{mode:o}"), "{what} is too permissive");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (path, what);
    }
}
