use axum::{
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};

use super::error::DriverError;

/// Error body the engine expects from a failed plugin call.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrResponse {
    #[serde(rename = "Err")]
    pub err: String,
}

impl IntoResponse for DriverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Plugin call failed ({status}): {self:?}");
        }

        (status, Json(ErrResponse { err: self.to_string() })).into_response()
    }
}
