pub mod config;
pub mod doctor;
pub mod migrate;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload =
            CommandOutcome { command, status: "ok", error_class: None, message: message.into() };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload(payload: &CommandOutcome<'_>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(payload.command),
            escape_json(&error.to_string())
        )
    })
}

pub(crate) fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Single-threaded runtime for the blocking command entry points.
pub(crate) fn current_thread_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread().enable_all().build()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::CommandResult;

    #[test]
    fn failure_payload_carries_error_class_and_code() {
        let result = CommandResult::failure("migrate", "db_connectivity", "refused \"here\"", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 4);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "db_connectivity");
        assert_eq!(payload["message"], "refused \"here\"");
    }

    #[test]
    fn success_payload_has_null_error_class() {
        let payload: Value =
            serde_json::from_str(&CommandResult::success("migrate", "done").output).expect("json");
        assert_eq!(payload["error_class"], Value::Null);
    }
}
