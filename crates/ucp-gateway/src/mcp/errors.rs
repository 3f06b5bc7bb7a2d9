//! Maps internal failures to MCP `ErrorData`. The only place in the gateway
//! that constructs raw JSON-RPC error codes (§7/§10.2).

use rmcp::model::ErrorCode;
use rmcp::ErrorData;
use serde_json::json;
use ucp_core::ToolSchema;

const BREAKER_OPEN: ErrorCode = ErrorCode(-32001);
const TOOL_CALL_FAILED: ErrorCode = ErrorCode(-32002);
const TOOL_NOT_FOUND: ErrorCode = ErrorCode(-32003);
const NO_TOOLS_AVAILABLE: ErrorCode = ErrorCode(-32004);
const NO_SERVER: ErrorCode = ErrorCode(-32005);
const INVALID_ARGUMENTS: ErrorCode = ErrorCode(-32006);

pub fn breaker_open(server: &str, retry_after_secs: u64) -> ErrorData {
    ErrorData::new(
        BREAKER_OPEN,
        format!("server '{server}' is temporarily unavailable, retry after {retry_after_secs}s"),
        Some(json!({
            "code": "breaker_open",
            "server": server,
            "retry_after_secs": retry_after_secs,
        })),
    )
}

/// Self-correction body per §7: attempted tool name and arguments, a
/// one-line cause, the tool's description, its parameter names, and up to
/// three nearest-match tool names.
pub fn tool_call_failed(
    tool_name: &str,
    arguments: &serde_json::Value,
    cause: &str,
    schema: Option<&ToolSchema>,
    known_tools: &[String],
) -> ErrorData {
    let (description, parameters) = describe(schema);
    ErrorData::new(
        TOOL_CALL_FAILED,
        format!("call to '{tool_name}' failed: {cause}"),
        Some(json!({
            "code": "tool_call_failed",
            "tool": tool_name,
            "arguments": arguments,
            "cause": cause,
            "description": description,
            "parameters": parameters,
            "suggestions": nearest_matches(tool_name, known_tools),
        })),
    )
}

pub fn tool_not_found(tool_name: &str, known_tools: &[String]) -> ErrorData {
    ErrorData::new(
        TOOL_NOT_FOUND,
        format!("unknown tool '{tool_name}'"),
        Some(json!({
            "code": "tool_not_found",
            "tool": tool_name,
            "suggestions": nearest_matches(tool_name, known_tools),
        })),
    )
}

pub fn no_tools_available() -> ErrorData {
    ErrorData::new(
        NO_TOOLS_AVAILABLE,
        "no tools are currently indexed or reachable".to_string(),
        Some(json!({ "code": "no_tools_available" })),
    )
}

pub fn no_server(server: &str) -> ErrorData {
    ErrorData::new(
        NO_SERVER,
        format!("server '{server}' has no live connection"),
        Some(json!({ "code": "no_server", "server": server })),
    )
}

/// Wraps an argument-validation failure with the same self-correction shape
/// as a downstream `tool_call_failed`, so the model gets tool description
/// and parameter names either way.
pub fn invalid_arguments(tool_name: &str, schema: &ToolSchema, message: String, data: serde_json::Value) -> ErrorData {
    let (description, parameters) = describe(Some(schema));
    ErrorData::new(
        INVALID_ARGUMENTS,
        format!("invalid arguments for '{tool_name}': {message}"),
        Some(json!({
            "code": "invalid_arguments",
            "tool": tool_name,
            "description": description,
            "parameters": parameters,
            "violations": data,
        })),
    )
}

fn describe(schema: Option<&ToolSchema>) -> (String, Vec<String>) {
    match schema {
        Some(schema) => {
            let parameters = schema
                .input_schema
                .get("properties")
                .and_then(|v| v.as_object())
                .map(|props| props.keys().cloned().collect())
                .unwrap_or_default();
            (schema.description.clone(), parameters)
        }
        None => (String::new(), Vec::new()),
    }
}

/// Up to three nearest-match tool names by Jaro similarity (threshold 0.7),
/// matching the suggestion behavior used for invalid downstream parameters.
pub fn nearest_matches(unknown: &str, known: &[String]) -> Vec<String> {
    let mut candidates: Vec<(f64, &String)> = known
        .iter()
        .map(|name| (strsim::jaro(unknown, name), name))
        .filter(|(score, _)| *score > 0.7)
        .collect();
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().take(3).map(|(_, name)| name.clone()).collect()
}

/// Validates call arguments against the advertised schema before the call
/// reaches the downstream server: unknown parameters (with suggestions),
/// missing required parameters, and JSON Schema constraint violations.
pub fn validate_arguments(
    tool_name: &str,
    schema: &ToolSchema,
    arguments: &serde_json::Value,
) -> Result<(), ErrorData> {
    let props = schema
        .input_schema
        .get("properties")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    let required: Vec<String> = schema
        .input_schema
        .get("required")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let valid_params: Vec<String> = props.keys().cloned().collect();

    let args_obj = arguments.as_object().cloned().unwrap_or_default();
    let mut violations: Vec<serde_json::Value> = Vec::new();

    for key in args_obj.keys() {
        if props.contains_key(key) {
            continue;
        }
        violations.push(json!({
            "type": "invalid-parameter",
            "parameter": key,
            "suggestions": nearest_matches(key, &valid_params),
            "validParameters": valid_params,
        }));
    }

    for name in &required {
        if !args_obj.contains_key(name) {
            violations.push(json!({ "type": "missing-required-parameter", "parameter": name }));
        }
    }

    if let Ok(compiled) = jsonschema::validator_for(&schema.input_schema) {
        for error in compiled.iter_errors(arguments) {
            if matches!(error.kind(), jsonschema::error::ValidationErrorKind::Required { .. }) {
                continue;
            }
            violations.push(json!({
                "type": "constraint-violation",
                "message": error.to_string(),
                "instancePath": error.instance_path().to_string(),
            }));
        }
    }

    if violations.is_empty() {
        return Ok(());
    }

    let message = violations
        .iter()
        .find(|v| v.get("type").and_then(|t| t.as_str()) == Some("invalid-parameter"))
        .map(|v| {
            let parameter = v.get("parameter").and_then(|v| v.as_str()).unwrap_or("?");
            let suggestion = v
                .get("suggestions")
                .and_then(|v| v.as_array())
                .and_then(|arr| arr.first())
                .and_then(|v| v.as_str());
            match suggestion {
                Some(s) => format!("unknown parameter '{parameter}' (did you mean '{s}'?)"),
                None => format!("unknown parameter '{parameter}'"),
            }
        })
        .unwrap_or_else(|| format!("validation failed with {} error(s)", violations.len()));

    Err(invalid_arguments(tool_name, schema, message, json!(violations)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn schema() -> ToolSchema {
        ToolSchema::new(
            "gh",
            "delete_issue",
            "Delete an issue by number",
            json!({
                "type": "object",
                "properties": {
                    "repo": { "type": "string" },
                    "number": { "type": "integer" },
                },
                "required": ["repo", "number"],
            }),
            BTreeSet::new(),
        )
    }

    #[test]
    fn nearest_matches_finds_typo() {
        let known = vec!["gh.delete_issue".to_string(), "gh.close_issue".to_string()];
        let matches = nearest_matches("gh.delet_issue", &known);
        assert_eq!(matches.first().map(String::as_str), Some("gh.delete_issue"));
    }

    #[test]
    fn nearest_matches_empty_when_nothing_close() {
        let known = vec!["gh.delete_issue".to_string()];
        assert!(nearest_matches("totally_unrelated_name", &known).is_empty());
    }

    #[test]
    fn validate_arguments_accepts_well_formed_call() {
        let schema = schema();
        let args = json!({ "repo": "acme/widgets", "number": 42 });
        assert!(validate_arguments("gh.delete_issue", &schema, &args).is_ok());
    }

    #[test]
    fn validate_arguments_flags_unknown_parameter_with_suggestion() {
        let schema = schema();
        let args = json!({ "repo": "acme/widgets", "numbr": 42 });
        let err = validate_arguments("gh.delete_issue", &schema, &args).unwrap_err();
        assert!(err.message.contains("unknown parameter 'numbr'"));
        assert!(err.message.contains("did you mean 'number'"));
    }

    #[test]
    fn validate_arguments_flags_missing_required_parameter() {
        let schema = schema();
        let args = json!({ "repo": "acme/widgets" });
        let err = validate_arguments("gh.delete_issue", &schema, &args).unwrap_err();
        let data = err.data.expect("invalid_arguments always attaches data");
        let violations = data["violations"].as_array().expect("violations array");
        assert!(violations.iter().any(|v| v["type"] == "missing-required-parameter"
            && v["parameter"] == "number"));
    }

    #[test]
    fn validate_arguments_flags_constraint_violation() {
        let schema = schema();
        let args = json!({ "repo": "acme/widgets", "number": "not-a-number" });
        let err = validate_arguments("gh.delete_issue", &schema, &args).unwrap_err();
        let data = err.data.expect("invalid_arguments always attaches data");
        let violations = data["violations"].as_array().expect("violations array");
        assert!(violations.iter().any(|v| v["type"] == "constraint-violation"));
    }

    #[test]
    fn tool_call_failed_includes_self_correction_body() {
        let schema = schema();
        let known = vec!["gh.delete_issue".to_string()];
        let err = tool_call_failed(
            "gh.delete_issue",
            &json!({ "repo": "acme/widgets", "number": 42 }),
            "connection reset",
            Some(&schema),
            &known,
        );
        let data = err.data.expect("tool_call_failed always attaches data");
        assert_eq!(data["description"], "Delete an issue by number");
        assert_eq!(data["parameters"], json!(["number", "repo"]));
    }
}
