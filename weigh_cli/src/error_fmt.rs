//! Human-readable error descriptions and structured JSON error formatting.

use weigh_core::{BuildError, CoreError};

/// Map an eyre::Report to a human-readable explanation with likely causes
/// and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingTransport => {
                "What happened: No transport was provided to the coordinator.\nLikely causes: The serial link failed to initialize or was not wired into the builder.\nHow to fix: Ensure the link is created successfully and passed to the builder.".to_string()
            }
            BuildError::MissingStore => {
                "What happened: No weighing store was provided.\nLikely causes: The journal failed to open or was not wired into the builder.\nHow to fix: Check the journal path and permissions, then retry.".to_string()
            }
            BuildError::MissingOperator => {
                "What happened: No operator is set.\nLikely causes: The CLI did not pass --operator.\nHow to fix: Provide the operator name (e.g., `weigh watch --operator petrov ...`); every recorded weighing carries it.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::ConfigNotFound { operator, name } => format!(
                "What happened: Saved configuration '{name}' was not found for operator '{operator}'.\nLikely causes: Wrong --link-name, wrong roster file, or the entry belongs to another operator.\nHow to fix: Check the roster CSV (operator,name,port,baud,protocol) and the spelling of both names."
            ),
            CoreError::Timeout => {
                "What happened: The scale link timed out.\nLikely causes: Indicator powered off, cable unplugged, or wrong port.\nHow to fix: Verify the device and port, then reconnect.".to_string()
            }
            CoreError::Link(msg) => format!(
                "What happened: Serial link failure ({msg}).\nLikely causes: Wrong port name, port in use by another program, or missing permissions (dialout group on Linux).\nHow to fix: Run `weigh ports` to list devices, free or fix the port, then retry."
            ),
            CoreError::Storage(msg) => format!(
                "What happened: A weighing could not be persisted ({msg}).\nLikely causes: Journal file unwritable or disk full.\nHow to fix: Check the journal path and free space. The weighing was NOT saved."
            ),
            CoreError::State(msg) => format!(
                "What happened: {msg}.\nHow to fix: Re-run with --log-level=debug for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("permission denied") && (lower.contains("tty") || lower.contains("com")) {
        return "What happened: No permission to open the serial device.\nLikely causes: The user is not in the dialout/uucp group.\nHow to fix: Add the user to the group (e.g., `usermod -a -G dialout $USER`) and log in again.".to_string();
    }

    if lower.contains("roster csv must have headers") {
        return "Invalid headers in roster CSV. Expected 'operator,name,port,baud,protocol'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; unknown errors return 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::ConfigNotFound { .. } => 2,
            CoreError::Link(_) | CoreError::Timeout => 3,
            CoreError::Storage(_) => 4,
            CoreError::State(_) => 1,
        };
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let kind = if let Some(ce) = err.downcast_ref::<CoreError>() {
        match ce {
            CoreError::ConfigNotFound { .. } => "config_not_found",
            CoreError::Link(_) => "link",
            CoreError::Timeout => "timeout",
            CoreError::Storage(_) => "storage",
            CoreError::State(_) => "state",
        }
    } else if err.downcast_ref::<BuildError>().is_some() {
        "build"
    } else {
        "other"
    };

    json!({
        "ok": false,
        "error": kind,
        "message": err.to_string(),
        "detail": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_maps_to_exit_code_2() {
        let err = eyre::Report::new(CoreError::ConfigNotFound {
            operator: "petrov".to_string(),
            name: "Main gate".to_string(),
        });
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("Main gate"));
    }

    #[test]
    fn json_errors_carry_a_stable_kind() {
        let err = eyre::Report::new(CoreError::Storage("disk full".to_string()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["error"], "storage");
        assert_eq!(v["ok"], false);
    }
}
