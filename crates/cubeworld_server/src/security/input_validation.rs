//! Input validation for client frames.

use super::SecurityError;
use crate::config::SecurityConfig;
use serde_json::Value;

/// Validates a JSON message against the configured limits.
///
/// Runs before routing, so an oversized or hostile frame never reaches the
/// coordinator.
pub fn validate_json_message(message: &[u8], config: &SecurityConfig) -> Result<(), SecurityError> {
    if message.len() > config.max_message_size {
        return Err(SecurityError::MessageTooLarge(message.len()));
    }

    let json: Value = serde_json::from_slice(message)
        .map_err(|e| SecurityError::InvalidMessageFormat(e.to_string()))?;

    validate_json_value(&json, 0, config)
}

/// Recursively validates a JSON value
fn validate_json_value(value: &Value, depth: usize, config: &SecurityConfig) -> Result<(), SecurityError> {
    if depth > config.max_json_depth {
        return Err(SecurityError::InvalidMessageFormat(
            "JSON nesting too deep".to_string(),
        ));
    }

    match value {
        Value::String(s) => {
            if s.len() > config.max_string_length {
                return Err(SecurityError::InvalidMessageFormat(format!(
                    "String too long: {} characters",
                    s.len()
                )));
            }
            validate_string_content(s)?;
        }
        Value::Array(arr) => {
            if arr.len() > config.max_collection_size {
                return Err(SecurityError::InvalidMessageFormat(format!(
                    "Array too large: {} elements",
                    arr.len()
                )));
            }
            for item in arr {
                validate_json_value(item, depth + 1, config)?;
            }
        }
        Value::Object(obj) => {
            if obj.len() > config.max_collection_size {
                return Err(SecurityError::InvalidMessageFormat(format!(
                    "Object too large: {} keys",
                    obj.len()
                )));
            }
            for (key, val) in obj {
                if key.len() > config.max_string_length {
                    return Err(SecurityError::InvalidMessageFormat(format!(
                        "Object key too long: {} characters",
                        key.len()
                    )));
                }
                validate_string_content(key)?;
                validate_json_value(val, depth + 1, config)?;
            }
        }
        Value::Number(_) | Value::Bool(_) | Value::Null => {}
    }

    Ok(())
}

/// Rejects strings carrying null bytes or control characters.
///
/// Display names and object ids are echoed to every other member, so nothing
/// that could garble another client's rendering is let through.
fn validate_string_content(s: &str) -> Result<(), SecurityError> {
    if s.chars().any(char::is_control) {
        return Err(SecurityError::MaliciousContent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(json: &str) -> Result<(), SecurityError> {
        validate_json_message(json.as_bytes(), &SecurityConfig::default())
    }

    #[test]
    fn test_validate_world_requests() {
        assert!(validate(r#"{"namespace":"world","event":"join","data":{"name":"alice"}}"#).is_ok());
        assert!(validate(
            r#"{"namespace":"world","event":"place_object","data":{"channel_id":"1b4e28ba-2fa1-11d2-883f-0016d3cca427","object":{"id":"c1","position":{"x":1.5,"y":0.5,"z":-3},"color":{"r":1,"g":0,"b":0}},"name":"alice"}}"#
        )
        .is_ok());
    }

    #[test]
    fn test_reject_oversized_message() {
        let config = SecurityConfig {
            max_message_size: 32,
            ..SecurityConfig::default()
        };
        let json = format!(r#"{{"data": "{}"}}"#, "x".repeat(64));
        assert!(matches!(
            validate_json_message(json.as_bytes(), &config),
            Err(SecurityError::MessageTooLarge(_))
        ));
    }

    #[test]
    fn test_reject_long_strings_and_deep_nesting() {
        let json = format!(r#"{{"name": "{}"}}"#, "x".repeat(1000));
        assert!(validate(&json).is_err());

        let mut json = String::new();
        for _ in 0..15 {
            json.push_str(r#"{"nested": "#);
        }
        json.push_str("true");
        for _ in 0..15 {
            json.push('}');
        }
        assert!(validate(&json).is_err());
    }

    #[test]
    fn test_reject_control_characters() {
        assert!(matches!(
            validate(r#"{"name": "ali\u0000ce"}"#),
            Err(SecurityError::MaliciousContent)
        ));
        assert!(validate(r#"{"name": "ali\nce"}"#).is_err());
    }

    #[test]
    fn test_reject_invalid_json() {
        assert!(matches!(
            validate("{not json"),
            Err(SecurityError::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_custom_config_validation() {
        let config = SecurityConfig {
            max_string_length: 5,
            max_collection_size: 2,
            max_json_depth: 2,
            ..SecurityConfig::default()
        };

        let json = br#"{"key": "toolong"}"#;
        assert!(validate_json_message(json, &config).is_err());

        let json = br#"{"key": "ok"}"#;
        assert!(validate_json_message(json, &config).is_ok());

        let json = br#"{"a": 1, "b": 2, "c": 3}"#;
        assert!(validate_json_message(json, &config).is_err());
    }
}
