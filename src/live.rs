//! An in-memory output tree standing in for a browser DOM.

use crate::{
	codec::{DecodeError, Handler},
	facts::NsAttribute,
	vnode::{Message, TaggerFn},
	Error, Result,
};
use core::{cell::Cell, cell::RefCell, fmt::Write};
use serde_json::Value;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{instrument, trace, warn};

/// Receives messages that reach the top of the event node chain.
pub type Sender = Rc<dyn Fn(Message)>;

/// Where messages from a listener go: through zero or more tagger chains, then to a [`Sender`].
pub enum EventNode {
	Root(Sender),
	Tagged { taggers: RefCell<Vec<TaggerFn>>, parent: Rc<EventNode> },
}

impl EventNode {
	pub fn root(sender: impl Fn(Message) + 'static) -> Rc<Self> {
		Rc::new(Self::Root(Rc::new(sender)))
	}

	/// Applies this node's taggers, innermost first, then passes the message on.
	pub fn deliver(&self, message: Message) {
		match self {
			EventNode::Root(sender) => sender(message),
			EventNode::Tagged { taggers, parent } => {
				let message = taggers.borrow().iter().rev().fold(message, |message, tagger| tagger.call(message));
				parent.deliver(message);
			}
		}
	}
}

/// An installed event listener.
#[derive(Clone)]
pub struct Listener {
	pub handler: Handler,
	pub event_node: Rc<EventNode>,
}

/// Creates live nodes with process-unique ids within this document.
#[derive(Debug, Default)]
pub struct Document {
	next_id: Cell<u64>,
}

impl Document {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn next_id(&self) -> u64 {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		id
	}

	pub fn create_text_node(&self, text: impl Into<String>) -> LiveNode {
		LiveNode {
			id: self.next_id(),
			kind: LiveKind::Text(text.into()),
			event_nodes: Vec::new(),
		}
	}

	pub fn create_element(&self, tag: impl Into<String>) -> LiveNode {
		self.create_element_in(None, tag.into())
	}

	pub fn create_element_ns(&self, namespace: impl Into<String>, tag: impl Into<String>) -> LiveNode {
		self.create_element_in(Some(namespace.into()), tag.into())
	}

	fn create_element_in(&self, namespace: Option<String>, tag: String) -> LiveNode {
		LiveNode {
			id: self.next_id(),
			kind: LiveKind::Element(LiveElement {
				tag,
				namespace,
				..LiveElement::default()
			}),
			event_nodes: Vec::new(),
		}
	}
}

pub struct LiveNode {
	id: u64,
	pub kind: LiveKind,
	/// Event nodes of the tagger chains rendered onto this node, outermost first.
	pub(crate) event_nodes: Vec<Rc<EventNode>>,
}

pub enum LiveKind {
	Text(String),
	Element(LiveElement),
}

#[derive(Default)]
pub struct LiveElement {
	pub tag: String,
	pub namespace: Option<String>,
	pub attributes: BTreeMap<String, String>,
	pub attributes_ns: BTreeMap<String, NsAttribute>,
	pub styles: BTreeMap<String, String>,
	pub properties: BTreeMap<String, Value>,
	pub listeners: BTreeMap<String, Listener>,
	pub children: Vec<LiveNode>,
}

/// What happened while dispatching an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
	/// Number of listeners that produced a message.
	pub delivered: usize,
	pub propagation_stopped: bool,
	pub default_prevented: bool,
}

impl LiveNode {
	/// Unique within the creating [`Document`]. Stays the same while a node is moved or updated in place.
	#[must_use]
	pub fn id(&self) -> u64 {
		self.id
	}

	#[must_use]
	pub fn text(&self) -> Option<&str> {
		match &self.kind {
			LiveKind::Text(text) => Some(text),
			LiveKind::Element(_) => None,
		}
	}

	#[must_use]
	pub fn element(&self) -> Option<&LiveElement> {
		match &self.kind {
			LiveKind::Element(element) => Some(element),
			LiveKind::Text(_) => None,
		}
	}

	pub fn element_mut(&mut self) -> Option<&mut LiveElement> {
		match &mut self.kind {
			LiveKind::Element(element) => Some(element),
			LiveKind::Text(_) => None,
		}
	}

	#[must_use]
	pub fn children(&self) -> &[LiveNode] {
		self.element().map_or(&[], |element| &element.children)
	}

	/// Follows child indices from this node.
	///
	/// # Errors
	///
	/// [`Error::NoSuchNode`] iff `path` leaves the tree.
	pub fn at(&self, path: &[usize]) -> Result<&LiveNode> {
		let mut node = self;
		for &i in path {
			node = node.children().get(i).ok_or_else(|| Error::NoSuchNode { path: path.to_vec() })?;
		}
		Ok(node)
	}

	/// Deterministic markup for this subtree.
	///
	/// Attributes, namespaced attributes, properties (as `.name=JSON`) and listeners (as `on:name`) are listed in
	/// that order, each sorted by name, followed by a `style` attribute if there are styles.
	#[must_use]
	pub fn outer_html(&self) -> String {
		let mut html = String::new();
		self.write_html(&mut html);
		html
	}

	fn write_html(&self, html: &mut String) {
		match &self.kind {
			LiveKind::Text(text) => escape(html, text),
			LiveKind::Element(element) => {
				html.push('<');
				html.push_str(&element.tag);
				for (key, value) in &element.attributes {
					write_attribute(html, key, value);
				}
				for (key, NsAttribute { namespace, value }) in &element.attributes_ns {
					write_attribute(html, &format!("{{{}}}{}", namespace, key), value);
				}
				for (key, value) in &element.properties {
					write_attribute(html, &format!(".{}", key), &value.to_string());
				}
				for key in element.listeners.keys() {
					html.push_str(" on:");
					html.push_str(key);
				}
				if !element.styles.is_empty() {
					let mut style = String::new();
					for (key, value) in &element.styles {
						// Infallible for `String`.
						let _ = write!(style, "{}: {};", key, value);
					}
					write_attribute(html, "style", &style);
				}
				html.push('>');
				for child in &element.children {
					child.write_html(html);
				}
				html.push_str("</");
				html.push_str(&element.tag);
				html.push('>');
			}
		}
	}

	/// Fires event `name` at the node at `path`, bubbling up to this node.
	///
	/// Each listener decodes `payload` with its handler and forwards the message through its event node chain.
	/// Listeners whose decoder fails are skipped.
	///
	/// # Errors
	///
	/// [`Error::NoSuchNode`] iff `path` leaves the tree.
	/// [`Error::Decode`] iff no listener delivered a message and at least one failed to decode `payload`.
	#[instrument(skip(self, payload))]
	pub fn dispatch_event(&self, path: &[usize], name: &str, payload: &Value) -> Result<EventOutcome> {
		let mut chain = vec![self];
		let mut node = self;
		for &i in path {
			node = node.children().get(i).ok_or_else(|| Error::NoSuchNode { path: path.to_vec() })?;
			chain.push(node);
		}

		let mut outcome = EventOutcome::default();
		let mut failure: Option<DecodeError> = None;
		for node in chain.into_iter().rev() {
			let listener = match node.element().and_then(|element| element.listeners.get(name)) {
				Some(listener) => listener,
				None => continue,
			};

			match listener.handler.run(payload) {
				Ok(handled) => {
					trace!(node = node.id, "Delivering message.");
					listener.event_node.deliver(handled.message);
					outcome.delivered += 1;
					outcome.default_prevented |= handled.prevent_default;
					if handled.stop_propagation {
						outcome.propagation_stopped = true;
						break;
					}
				}
				Err(error) => {
					warn!(node = node.id, "Event payload didn't decode: {}", error);
					failure = Some(error);
				}
			}
		}

		match failure {
			Some(error) if outcome.delivered == 0 => Err(error.into()),
			_ => Ok(outcome),
		}
	}

	/// Calls `f` with the name of each listener in this subtree.
	pub(crate) fn for_each_listener(&self, f: &mut impl FnMut(&str)) {
		if let LiveKind::Element(element) = &self.kind {
			element.listeners.keys().for_each(|name| f(name));
			element.children.iter().for_each(|child| child.for_each_listener(f));
		}
	}
}

fn write_attribute(html: &mut String, key: &str, value: &str) {
	html.push(' ');
	html.push_str(key);
	html.push_str("=\"");
	escape(html, value);
	html.push('"');
}

fn escape(html: &mut String, text: &str) {
	for c in text.chars() {
		match c {
			'&' => html.push_str("&amp;"),
			'<' => html.push_str("&lt;"),
			'>' => html.push_str("&gt;"),
			'"' => html.push_str("&quot;"),
			c => html.push(c),
		}
	}
}
