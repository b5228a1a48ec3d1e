//! Shared helpers for command handlers.

use std::io::IsTerminal;

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so the caller must pass `--yes`.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a `--context` argument; it must be a JSON object.
pub fn parse_json_object(field: &str, raw: &str) -> Result<serde_json::Value, CliError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })?;
    if !value.is_object() {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "expected a JSON object".into(),
        });
    }
    Ok(value)
}

/// Short local timestamp for table cells.
pub fn timestamp(ts: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_must_be_object() {
        assert!(parse_json_object("context", r#"{"cam": 1}"#).is_ok());
        assert!(matches!(
            parse_json_object("context", "[1, 2]"),
            Err(CliError::Validation { .. })
        ));
        assert!(parse_json_object("context", "{nope").is_err());
    }

    #[test]
    fn confirm_with_yes_skips_prompt() {
        assert!(matches!(confirm("Delete?", "delete", true), Ok(true)));
    }
}
