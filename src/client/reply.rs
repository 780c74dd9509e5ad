//! Result sinks for outbound calls.
//!
//! A reply decides how the response body is decoded and whether failure
//! fields can be filled in. Structured replies with an application code
//! implement [`Classifiable`]; raw bodies go into `Vec<u8>`; typed replies
//! without a code use [`Json`]; `()` discards the body.

use serde::de::DeserializeOwned;

/// Destination of a decoded response.
pub trait Reply: Send {
    /// Decode the 2xx response body into `self`.
    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error>;

    /// Non-zero application code and message carried by the decoded reply.
    fn app_error(&self) -> Option<(i64, String)> {
        None
    }

    /// Record a failure on the reply. No-op for replies without code fields.
    fn set_failure(&mut self, _code: i64, _message: &str) {}
}

/// A JSON reply with an integer status code and a message.
pub trait Classifiable: DeserializeOwned + Send {
    fn code(&self) -> i64;

    fn message(&self) -> &str;

    fn set_failure(&mut self, code: i64, message: &str);
}

impl<T: Classifiable> Reply for T {
    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        *self = serde_json::from_slice(body)?;
        Ok(())
    }

    fn app_error(&self) -> Option<(i64, String)> {
        let code = Classifiable::code(self);
        (code != 0).then(|| (code, Classifiable::message(self).to_string()))
    }

    fn set_failure(&mut self, code: i64, message: &str) {
        Classifiable::set_failure(self, code, message);
    }
}

impl Reply for Vec<u8> {
    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        self.clear();
        self.extend_from_slice(body);
        Ok(())
    }
}

impl Reply for () {
    fn decode(&mut self, _body: &[u8]) -> Result<(), serde_json::Error> {
        Ok(())
    }
}

/// A typed JSON reply that has no code fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub Option<T>);

impl<T> Json<T> {
    pub fn new() -> Self {
        Json(None)
    }

    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T: DeserializeOwned + Send> Reply for Json<T> {
    fn decode(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        self.0 = Some(serde_json::from_slice(body)?);
        Ok(())
    }
}

/// The common `{code, message, data}` envelope.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T: DeserializeOwned + Send> Classifiable for Envelope<T> {
    fn code(&self) -> i64 {
        self.code
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn set_failure(&mut self, code: i64, message: &str) {
        self.code = code;
        self.message = message.to_string();
    }
}
