//! Request body encoding.
//!
//! A call body is a JSON object. By default it is form-encoded; the reserved
//! keys `__json__` and `__xml__` switch the request to a JSON or XML payload
//! built from that key's value alone.

use serde_json::{Map, Value};

/// Request payload supplied by callers.
pub type Body = Map<String, Value>;

/// Reserved key: send the value JSON-serialized.
pub const JSON_KEY: &str = "__json__";

/// Reserved key: send the value, which must be a string, as raw XML.
pub const XML_KEY: &str = "__xml__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    FormUrlEncoded,
    Json,
    Xml,
}

impl ContentType {
    /// Pick the payload kind for `body`. `__json__` wins over `__xml__`.
    pub fn detect(body: &Body) -> Self {
        if body.contains_key(JSON_KEY) {
            ContentType::Json
        } else if body.contains_key(XML_KEY) {
            ContentType::Xml
        } else {
            ContentType::FormUrlEncoded
        }
    }

    pub fn header_value(self) -> &'static str {
        match self {
            ContentType::FormUrlEncoded => "application/x-www-form-urlencoded; charset=utf-8",
            ContentType::Json => "application/json; charset=utf-8",
            ContentType::Xml => "application/xml; charset=utf-8",
        }
    }
}

/// Encode `body` as the payload for `kind`.
pub fn encode(body: &Body, kind: ContentType) -> String {
    match kind {
        ContentType::Json => body.get(JSON_KEY).map(Value::to_string).unwrap_or_default(),
        ContentType::Xml => match body.get(XML_KEY) {
            Some(Value::String(xml)) => xml.clone(),
            _ => String::new(),
        },
        ContentType::FormUrlEncoded => {
            let mut keys: Vec<&String> = body.keys().collect();
            keys.sort();
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            for key in keys {
                form.append_pair(key, &form_value(&body[key.as_str()]));
            }
            form.finish()
        }
    }
}

/// Stringify one form field.
pub fn form_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
