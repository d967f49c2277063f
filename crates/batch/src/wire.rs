//! Backend-agnostic request and response shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One item of a request batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	/// Operation tag, e.g. `income_tax`.
	pub operation: String,
	/// Positional arguments.
	#[serde(default)]
	pub args: Vec<Value>,
}

impl Request {
	/// Creates a request.
	pub fn new(operation: impl Into<String>, args: Vec<Value>) -> Self {
		Self {
			operation: operation.into(),
			args,
		}
	}
}

/// One item of a response batch: `{"result": ..}` or `{"error": ".."}`.
///
/// An `error` field wins when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
	/// The operation failed.
	Error {
		/// Human readable failure.
		error: String,
	},
	/// The operation produced a value.
	Result {
		/// Produced value.
		result: Value,
	},
}

impl Response {
	/// Successful response.
	pub fn ok(result: impl Into<Value>) -> Self {
		Self::Result { result: result.into() }
	}

	/// Failed response.
	pub fn err(error: impl Into<String>) -> Self {
		Self::Error { error: error.into() }
	}

	/// Converts into a plain result.
	pub fn into_result(self) -> Result<Value, String> {
		match self {
			Self::Result { result } => Ok(result),
			Self::Error { error } => Err(error),
		}
	}
}
