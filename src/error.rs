//! Crate-wide error type.

use crate::codec::DecodeError;
use thiserror::Error;

/// Errors reported by vectors, the patcher and event dispatch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// Raised by checked vector access.
	#[error("index {index} out of range for vector of length {len}")]
	IndexOutOfRange { index: isize, len: usize },

	/// A child path didn't resolve to a node of the live tree.
	#[error("no live node at path {path:?}")]
	NoSuchNode { path: Vec<usize> },

	/// An event payload didn't match the handler's decoder.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
