pub mod config;
pub mod doctor;
pub mod lookup;

use serde::Serialize;

/// Output and process exit code of one CLI command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct FailurePayload<'a> {
    command: &'a str,
    status: &'static str,
    error_class: &'a str,
    message: &'a str,
}

impl CommandResult {
    pub fn new(exit_code: u8, output: String) -> Self {
        Self { exit_code, output }
    }

    pub fn ok(output: String) -> Self {
        Self::new(0, output)
    }

    /// Failures are always JSON so scripts can branch on `error_class`.
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl AsRef<str>,
        exit_code: u8,
    ) -> Self {
        let payload =
            FailurePayload { command, status: "error", error_class, message: message.as_ref() };
        Self::new(exit_code, to_json(command, &payload, false))
    }
}

/// Serializes a command payload, falling back to a hand-built error object
/// so the output stays parseable.
pub(crate) fn to_json<T: Serialize>(command: &str, payload: &T, pretty: bool) -> String {
    let serialized =
        if pretty { serde_json::to_string_pretty(payload) } else { serde_json::to_string(payload) };

    serialized.unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(command),
            escape_json(&error.to_string())
        )
    })
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
