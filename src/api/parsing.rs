use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::errors::BridgeError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(Value::as_str)
}

/// Header lookup that tolerates any casing (API Gateway lowercases them).
pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(Value::as_str) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// Raw request body, decoded when the proxy marked it base64.
///
/// # Errors
///
/// [`BridgeError::ParseError`] when the body is missing, not a string, or not
/// valid base64/UTF-8.
pub fn extract_body(payload: &Value) -> Result<String, BridgeError> {
    let body = payload
        .get("body")
        .ok_or_else(|| BridgeError::ParseError("Missing body".to_string()))?
        .as_str()
        .ok_or_else(|| BridgeError::ParseError("Invalid body format".to_string()))?;

    let is_base64 = payload
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !is_base64 {
        return Ok(body.to_string());
    }

    let bytes = STANDARD
        .decode(body)
        .map_err(|e| BridgeError::ParseError(format!("Invalid base64 body: {e}")))?;
    String::from_utf8(bytes).map_err(|e| BridgeError::ParseError(format!("Body is not UTF-8: {e}")))
}
