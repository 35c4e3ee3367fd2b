//! HTTP rendering of broker errors.

// crates.io
use axum::{
	Json,
	response::{IntoResponse, Response},
};
// self
use crate::{_prelude::*, error::KeyError};

/// JSON body carried by every non-success response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	/// Human-readable failure description.
	pub message: String,
}

impl Error {
	/// Status code returned to broker callers.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Validation { .. } => StatusCode::BAD_REQUEST,
			Self::Authorization { .. } => StatusCode::FORBIDDEN,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Message safe to return to callers.
	///
	/// Signing failures and the broker's own permission problems stay in the logs.
	pub fn public_message(&self) -> String {
		match self {
			Self::Forbidden { .. } => "Membership could not be verified.".into(),
			Self::Key(KeyError::Format { .. } | KeyError::Type { .. }) =>
				"Signing key is unusable.".into(),
			Self::Key(KeyError::Signing { .. }) =>
				"Application assertion could not be signed.".into(),
			_ => self.to_string(),
		}
	}
}
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = self.status_code();

		if status.is_server_error() {
			tracing::error!(status = status.as_u16(), "Request failed: {self}");
		} else {
			tracing::info!(status = status.as_u16(), "Request rejected: {self}");
		}

		(status, Json(ErrorBody { message: self.public_message() })).into_response()
	}
}
