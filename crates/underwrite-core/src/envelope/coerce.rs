//! Defensive coercion of loosely typed JSON values.
//!
//! Agents report numbers as JSON numbers or as strings. Anything that does not
//! coerce cleanly to a finite value is treated as absent.

use serde_json::Value;

/// Coerce a JSON number or numeric string to a finite `f64`.
pub fn to_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    number.is_finite().then_some(number)
}

/// Borrow a JSON string.
pub fn to_text(value: &Value) -> Option<&str> {
    value.as_str()
}

/// Render every element of a JSON array as text.
///
/// Strings are kept verbatim; other elements use their JSON form.
pub fn to_text_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
    )
}

/// Human-readable JSON kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(to_f64(&json!(8000)), Some(8000.0));
        assert_eq!(to_f64(&json!(0.41)), Some(0.41));
        assert_eq!(to_f64(&json!(" 6.5 ")), Some(6.5));
        assert_eq!(to_f64(&json!("360")), Some(360.0));
    }

    #[test]
    fn test_uncoercible_values_are_absent() {
        assert_eq!(to_f64(&json!("n/a")), None);
        assert_eq!(to_f64(&json!(null)), None);
        assert_eq!(to_f64(&json!(true)), None);
        assert_eq!(to_f64(&json!([1])), None);
        assert_eq!(to_f64(&json!("NaN")), None);
        assert_eq!(to_f64(&json!("inf")), None);
    }

    #[test]
    fn test_text_list() {
        let list = to_text_list(&json!(["High DTI", 3, {"k": "v"}])).unwrap();
        assert_eq!(list, vec!["High DTI", "3", r#"{"k":"v"}"#]);
        assert!(to_text_list(&json!("High DTI")).is_none());
    }
}
