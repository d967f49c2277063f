use std::io;
use std::path::PathBuf;

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Rate table and evaluation errors.
///
/// Evaluation variants are reported back to callers as per-item error
/// messages, so their display text is the user facing wording.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// No such operation.
	#[error("Operation not supported: {0}")]
	UnsupportedOperation(String),
	/// Wrong number of arguments.
	#[error("{operation} expects {min}..={max} arguments, got {got}")]
	Arity {
		/// Operation name.
		operation: &'static str,
		/// Minimum accepted.
		min: usize,
		/// Maximum accepted.
		max: usize,
		/// Received.
		got: usize,
	},
	/// An argument had the wrong shape.
	#[error("{operation}: argument {index} must be {expected}")]
	InvalidArgument {
		/// Operation name.
		operation: &'static str,
		/// Zero-based position.
		index: usize,
		/// Expected shape.
		expected: &'static str,
	},
	/// Division with a zero divisor.
	#[error("division by zero")]
	DivisionByZero,
	/// Result cannot be represented as a JSON number.
	#[error("{0}: result is not a finite number")]
	NotFinite(&'static str),
	/// No table for the requested year.
	#[error("no rate table for year {0}")]
	UnknownYear(String),
	/// A year argument could not be understood.
	#[error("invalid financial year {0:?}, expected e.g. \"2024-25\" or 2025")]
	InvalidYear(String),
	/// A table is internally inconsistent.
	#[error("invalid rate table for {year}: {reason}")]
	InvalidTable {
		/// Offending year.
		year: String,
		/// What is wrong.
		reason: String,
	},
	/// Table file could not be parsed.
	#[error("rate table parse error: {0}")]
	Parse(#[from] toml::de::Error),
	/// Table file could not be read.
	#[error("failed to read {path}: {source}")]
	Io {
		/// File that failed.
		path: PathBuf,
		/// Underlying error.
		source: io::Error,
	},
}
