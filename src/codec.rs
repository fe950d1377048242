//! JSON decoders with structural equality.
//!
//! Event handlers carry a [`Decoder`] instead of an opaque closure, so that two renders of the same view
//! produce handlers that compare equal and don't cause listener churn while diffing.
//! Closures embedded via [`Decoder::Map`] are compared by identity.

use crate::vnode::Message;
use core::fmt::{self, Debug, Formatter};
use serde_json::{Map, Value};
use std::rc::Rc;
use thiserror::Error;

/// Why a [`Decoder`] rejected a value.
///
/// Only the JSON *kind* of offending values is recorded, never their content.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum DecodeError {
	#[error("expected {expected}, found {found}")]
	Expecting { expected: &'static str, found: &'static str },

	#[error("in field {0:?}: {1}")]
	Field(String, Box<DecodeError>),

	#[error("at index {0}: {1}")]
	Index(usize, Box<DecodeError>),

	#[error("{0}")]
	Failure(String),

	#[error("none of {} alternatives matched", .0.len())]
	OneOf(Vec<DecodeError>),
}

/// A function combining decoded values, compared by identity.
#[derive(Clone)]
pub struct MapFn(Rc<dyn Fn(Vec<Value>) -> Value>);

impl MapFn {
	pub fn new(f: impl Fn(Vec<Value>) -> Value + 'static) -> Self {
		Self(Rc::new(f))
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl PartialEq for MapFn {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Debug for MapFn {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "MapFn({:p})", Rc::as_ptr(&self.0) as *const ())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoder {
	/// Accepts anything.
	Value,
	Bool,
	Int,
	Float,
	String,
	/// Accepts `null`, producing the given value.
	Null(Value),
	Field(String, Box<Decoder>),
	Index(usize, Box<Decoder>),
	List(Box<Decoder>),
	Succeed(Value),
	Fail(String),
	OneOf(Vec<Decoder>),
	/// Runs all decoders on the same input and combines their results.
	Map(MapFn, Vec<Decoder>),
}

impl Decoder {
	pub fn field(name: impl Into<String>, decoder: Decoder) -> Self {
		Self::Field(name.into(), Box::new(decoder))
	}

	/// Nested [`Decoder::Field`]s.
	pub fn at<'a>(path: impl IntoIterator<Item = &'a str>, decoder: Decoder) -> Self {
		let path: Vec<_> = path.into_iter().collect();
		path.into_iter().rev().fold(decoder, |decoder, name| Self::field(name, decoder))
	}

	#[must_use]
	pub fn index(index: usize, decoder: Decoder) -> Self {
		Self::Index(index, Box::new(decoder))
	}

	#[must_use]
	pub fn list(decoder: Decoder) -> Self {
		Self::List(Box::new(decoder))
	}

	pub fn succeed(value: impl Into<Value>) -> Self {
		Self::Succeed(value.into())
	}

	#[must_use]
	pub fn map(f: &MapFn, decoders: Vec<Decoder>) -> Self {
		Self::Map(f.clone(), decoders)
	}

	/// Decodes `value`.
	///
	/// # Errors
	///
	/// Iff `value` doesn't have the expected shape.
	pub fn decode(&self, value: &Value) -> Result<Value, DecodeError> {
		match self {
			Decoder::Value => Ok(value.clone()),
			Decoder::Bool => value.as_bool().map(Value::from).ok_or_else(|| expecting("a BOOL", value)),
			Decoder::Int => value.as_i64().map(Value::from).ok_or_else(|| expecting("an INT", value)),
			Decoder::Float => value.as_f64().map(Value::from).ok_or_else(|| expecting("a FLOAT", value)),
			Decoder::String => match value {
				Value::String(_) => Ok(value.clone()),
				_ => Err(expecting("a STRING", value)),
			},
			Decoder::Null(result) => match value {
				Value::Null => Ok(result.clone()),
				_ => Err(expecting("null", value)),
			},
			Decoder::Field(name, decoder) => match value {
				Value::Object(object) => match object.get(name) {
					Some(field) => decoder.decode(field).map_err(|error| DecodeError::Field(name.clone(), Box::new(error))),
					None => Err(DecodeError::Field(
						name.clone(),
						Box::new(DecodeError::Expecting {
							expected: "a present field",
							found: "nothing",
						}),
					)),
				},
				_ => Err(expecting("an OBJECT", value)),
			},
			Decoder::Index(index, decoder) => match value {
				Value::Array(array) => match array.get(*index) {
					Some(item) => decoder.decode(item).map_err(|error| DecodeError::Index(*index, Box::new(error))),
					None => Err(DecodeError::Index(
						*index,
						Box::new(DecodeError::Expecting {
							expected: "an element",
							found: "the end of the array",
						}),
					)),
				},
				_ => Err(expecting("an ARRAY", value)),
			},
			Decoder::List(decoder) => match value {
				Value::Array(array) => array
					.iter()
					.enumerate()
					.map(|(i, item)| decoder.decode(item).map_err(|error| DecodeError::Index(i, Box::new(error))))
					.collect::<Result<Vec<_>, _>>()
					.map(Value::Array),
				_ => Err(expecting("a LIST", value)),
			},
			Decoder::Succeed(result) => Ok(result.clone()),
			Decoder::Fail(message) => Err(DecodeError::Failure(message.clone())),
			Decoder::OneOf(decoders) => {
				let mut errors = Vec::with_capacity(decoders.len());
				for decoder in decoders {
					match decoder.decode(value) {
						Ok(result) => return Ok(result),
						Err(error) => errors.push(error),
					}
				}
				Err(DecodeError::OneOf(errors))
			}
			Decoder::Map(f, decoders) => {
				let values = decoders.iter().map(|decoder| decoder.decode(value)).collect::<Result<Vec<_>, _>>()?;
				Ok((f.0)(values))
			}
		}
	}
}

fn expecting(expected: &'static str, found: &Value) -> DecodeError {
	DecodeError::Expecting {
		expected,
		found: kind_of(found),
	}
}

fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a BOOL",
		Value::Number(_) => "a NUMBER",
		Value::String(_) => "a STRING",
		Value::Array(_) => "an ARRAY",
		Value::Object(_) => "an OBJECT",
	}
}

/// An event handler: how to turn an event payload into a message, and whether that may stop the event.
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
	/// Decodes to a message.
	Normal(Decoder),
	/// Decodes to `[message, stop_propagation]`.
	MayStopPropagation(Decoder),
	/// Decodes to `[message, prevent_default]`.
	MayPreventDefault(Decoder),
	/// Decodes to `{ "message": …, "stopPropagation": bool, "preventDefault": bool }`.
	Custom(Decoder),
}

/// The result of running a [`Handler`] on an event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
	pub message: Message,
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

impl Handler {
	#[must_use]
	pub fn decoder(&self) -> &Decoder {
		match self {
			Handler::Normal(decoder) | Handler::MayStopPropagation(decoder) | Handler::MayPreventDefault(decoder) | Handler::Custom(decoder) => decoder,
		}
	}

	/// Decodes `payload` and interprets the result according to this handler's kind.
	///
	/// # Errors
	///
	/// Iff the decoder fails or doesn't produce the shape this handler kind requires.
	pub fn run(&self, payload: &Value) -> Result<HandlerOutcome, DecodeError> {
		let decoded = self.decoder().decode(payload)?;
		match self {
			Handler::Normal(_) => Ok(HandlerOutcome {
				message: decoded,
				stop_propagation: false,
				prevent_default: false,
			}),
			Handler::MayStopPropagation(_) => {
				let (message, stop_propagation) = flagged(decoded)?;
				Ok(HandlerOutcome {
					message,
					stop_propagation,
					prevent_default: false,
				})
			}
			Handler::MayPreventDefault(_) => {
				let (message, prevent_default) = flagged(decoded)?;
				Ok(HandlerOutcome {
					message,
					stop_propagation: false,
					prevent_default,
				})
			}
			Handler::Custom(_) => match decoded {
				Value::Object(mut object) => Ok(HandlerOutcome {
					message: object.remove("message").ok_or_else(|| missing("message"))?,
					stop_propagation: flag(&object, "stopPropagation")?,
					prevent_default: flag(&object, "preventDefault")?,
				}),
				other => Err(expecting("an OBJECT", &other)),
			},
		}
	}
}

fn flagged(decoded: Value) -> Result<(Message, bool), DecodeError> {
	match decoded {
		Value::Array(mut pair) if pair.len() == 2 => {
			let flag = pair.pop().and_then(|flag| flag.as_bool()).ok_or_else(|| DecodeError::Index(
				1,
				Box::new(DecodeError::Expecting {
					expected: "a BOOL",
					found: "something else",
				}),
			))?;
			Ok((pair.pop().unwrap_or(Value::Null), flag))
		}
		other => Err(expecting("a [message, BOOL] pair", &other)),
	}
}

fn flag(object: &Map<String, Value>, name: &str) -> Result<bool, DecodeError> {
	match object.get(name) {
		Some(value) => value.as_bool().ok_or_else(|| DecodeError::Field(name.to_owned(), Box::new(expecting("a BOOL", value)))),
		None => Err(missing(name)),
	}
}

fn missing(name: &str) -> DecodeError {
	DecodeError::Field(
		name.to_owned(),
		Box::new(DecodeError::Expecting {
			expected: "a present field",
			found: "nothing",
		}),
	)
}
