use serde::{Deserialize, Serialize};

/// A method call marshaled across the transport.
///
/// Arguments are positional: `argument_types[i]` names the concrete runtime
/// type that produced `arguments[i]`, and both align with the target method's
/// declared parameter at position `i`. There is no named-argument binding.
///
/// An empty string in `arguments` means "no value supplied" for that
/// position, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteMethodCall {
    pub type_name: String,
    pub method_name: String,
    pub argument_types: Vec<String>,
    pub arguments: Vec<String>,
}

/// Outcome of a remote method invocation.
///
/// Exactly one of `return_value` / `error_message` is meaningful depending
/// on `success`. A `None` return value on success means the method returned
/// nothing (void).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteMethodResult {
    pub success: bool,
    pub return_value: Option<String>,
    pub error_message: Option<String>,
}

impl RemoteMethodResult {
    /// Creates a successful result carrying an optional serialized value.
    pub fn success(return_value: Option<String>) -> Self {
        RemoteMethodResult {
            success: true,
            return_value,
            error_message: None,
        }
    }

    /// Creates a failed result with a human-readable message identifying
    /// the failing phase.
    pub fn failure(error_message: impl Into<String>) -> Self {
        RemoteMethodResult {
            success: false,
            return_value: None,
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call_round_trip() {
        let call = RemoteMethodCall {
            type_name: "demo::TaskService".to_string(),
            method_name: "submit".to_string(),
            argument_types: vec!["demo::TaskRequest".to_string(), "i64".to_string()],
            arguments: vec![r#"{"name":"build"}"#.to_string(), "7".to_string()],
        };

        let json = serde_json::to_string(&call).unwrap();
        let decoded: RemoteMethodCall = serde_json::from_str(&json).unwrap();
        assert_eq!(call, decoded);
    }

    #[test]
    fn test_method_result_round_trip() {
        let result = RemoteMethodResult::success(Some(r#"{"ok":true}"#.to_string()));
        let json = serde_json::to_string(&result).unwrap();
        let decoded: RemoteMethodResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, decoded);
    }

    #[test]
    fn test_failure_carries_message_only() {
        let result = RemoteMethodResult::failure("Component demo::Missing not found");
        assert!(!result.success);
        assert!(result.return_value.is_none());
        assert_eq!(
            result.error_message.as_deref(),
            Some("Component demo::Missing not found")
        );
    }
}
