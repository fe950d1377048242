//! Persistent RRB-tree vectors and a keyed virtual DOM differ and patcher.
//!
//! [`Vector`] is an immutable sequence with cheap updates, slicing and concatenation.
//!
//! [`VNode`] trees describe a view. [`diff`] compares two of them and returns a list of [`Patch`]es,
//! which a [`Patcher`] applies to a [`LiveNode`] tree. [`Program`] ties these together with a model and a message queue.

#![doc(html_root_url = "https://docs.rs/heartwood/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod codec;
pub mod diff;
mod error;
pub mod facts;
pub mod live;
pub mod load;
pub mod patch;
pub mod patcher;
pub mod program;
mod rc_hash_map;
pub mod vector;
pub mod vnode;

pub use codec::{DecodeError, Decoder, Handler};
pub use diff::diff;
pub use error::{Error, Result};
pub use facts::{Fact, Facts};
pub use live::{Document, EventNode, LiveNode};
pub use patch::{Patch, PatchKind};
pub use patcher::{Config, Patcher};
pub use program::Program;
pub use vector::Vector;
pub use vnode::{Message, TaggerFn, VNode};
