//! Human-readable error descriptions and structured JSON error formatting.

use centerout_config::ParamError;
use centerout_core::error::CoreError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Params(pe) => describe_param_error(pe),
            CoreError::TargetOutOfRange { index, n_targets } => format!(
                "What happened: Target index {index} is out of range for {n_targets} targets.\nLikely causes: The target file was written for a different N Targets.\nHow to fix: Keep every index below N Targets, or raise N Targets in the parameter file."
            ),
            CoreError::EmptySequence => {
                "What happened: The target sequence is empty.\nLikely causes: The target file has no indices.\nHow to fix: Put one target index per line.".to_string()
            }
            CoreError::Source(msg) => format!(
                "What happened: A source could not be read ({msg}).\nLikely causes: Wrong path or malformed file.\nHow to fix: Check --params/--targets or [sources] in the settings file."
            ),
            CoreError::Event(msg) => format!(
                "What happened: Malformed event ({msg}).\nHow to fix: Send one JSON object per line with an \"event\" field."
            ),
            CoreError::Disconnected => {
                "What happened: The controller stopped unexpectedly.\nHow to fix: Re-run with --log-level=debug for details.".to_string()
            }
        };
    }

    if let Some(pe) = err.downcast_ref::<ParamError>() {
        return describe_param_error(pe);
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("no parameter source") || lower.contains("no target source") {
        return format!(
            "What happened: {msg}.\nHow to fix: Pass --params and --targets, or set them under [sources] in the settings file."
        );
    }

    if lower.contains("canvas.") || lower.contains("timing.") || lower.contains("logging.") {
        return format!(
            "What happened: Invalid settings ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the settings file and try again."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn describe_param_error(pe: &ParamError) -> String {
    match pe {
        ParamError::Missing(key) => format!(
            "What happened: Parameter {key:?} is missing.\nLikely causes: The parameter file is incomplete or the key is misspelled.\nHow to fix: Add a `{key}<TAB>value<TAB>float` line."
        ),
        ParamError::WrongType(key) => format!(
            "What happened: Parameter {key:?} is not numeric.\nLikely causes: Its type tag is `None` or `bool`.\nHow to fix: Tag the record `float`."
        ),
        other => format!(
            "What happened: {other}.\nHow to fix: Correct the parameter file; records are `key<TAB>value<TAB>type`."
        ),
    }
}

/// Stable exit codes: 3 for invalid parameters or targets, 4 for unreadable
/// sources, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(ce) = err.downcast_ref::<CoreError>() {
        return match ce {
            CoreError::Params(_) | CoreError::TargetOutOfRange { .. } | CoreError::EmptySequence => 3,
            CoreError::Source(_) => 4,
            CoreError::Event(_) | CoreError::Disconnected => 1,
        };
    }
    if err.downcast_ref::<ParamError>().is_some() {
        return 3;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = match err.downcast_ref::<CoreError>() {
        Some(CoreError::Params(_)) => "InvalidParams",
        Some(CoreError::TargetOutOfRange { .. } | CoreError::EmptySequence) => "InvalidTargets",
        Some(CoreError::Source(_)) => "Source",
        Some(_) | None => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
