use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("duplicate action id in catalog: {0}")]
    DuplicateAction(String),

    #[error("invalid action '{id}': {reason}")]
    InvalidAction { id: String, reason: String },

    #[error("action already running: {0}")]
    AlreadyRunning(String),

    /// The operation completed but reported `success: false`.
    #[error("action '{id}' failed: {message}")]
    ExecutionFailure { id: String, message: String },

    /// The operation could not produce a result at all.
    #[error("action '{id}' raised an error: {message}")]
    ExecutionException { id: String, message: String },

    #[error("invalid {kind} '{value}'")]
    InvalidParameter { kind: &'static str, value: String },

    #[error("failed to spawn '{program}': {reason}")]
    CommandSpawnFailed { program: String, reason: String },

    #[error("'{program}' exited with {}: {output}", exit_label(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("metrics unavailable: {0}")]
    Metrics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_mentions_exit_code() {
        let err = CoreError::CommandFailed {
            program: "powercfg".into(),
            code: Some(5),
            output: "access denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "'powercfg' exited with status 5: access denied"
        );
    }

    #[test]
    fn command_failed_without_code_is_signal() {
        let err = CoreError::CommandFailed {
            program: "defrag".into(),
            code: None,
            output: String::new(),
        };
        assert!(err.to_string().contains("a signal"));
    }
}
