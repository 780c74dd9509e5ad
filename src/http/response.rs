//! Response envelope.
//!
//! Every JSON endpoint answers `{code, message, data}` with HTTP 200; failures
//! are carried in `code`.

use axum::Json;
use serde::Serialize;

use crate::client::CallError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            code: 0,
            message: "ok".to_string(),
            data: Some(data),
        })
    }

    pub fn from_error(err: &CallError) -> Json<Self> {
        Json(Self {
            code: err.code(),
            message: err.message(),
            data: None,
        })
    }
}
