//! The virtual tree.
//!
//! [`VNode`]s are cheap to clone and compared by reference first, so unchanged parts of a view can be reused
//! between renders to skip diffing them entirely.

use crate::{
	facts::{Fact, Facts},
	live::{Document, LiveNode},
};
use core::{
	fmt::{self, Debug, Formatter},
	ops::Deref,
};
use once_cell::unsync::OnceCell;
use serde_json::Value;
use std::rc::Rc;

/// Messages are carried as plain JSON values.
pub type Message = Value;

/// Wraps messages coming out of a subtree. Compared by identity.
#[derive(Clone)]
pub struct TaggerFn(Rc<dyn Fn(Message) -> Message>);

impl TaggerFn {
	pub fn new(f: impl Fn(Message) -> Message + 'static) -> Self {
		Self(Rc::new(f))
	}

	#[must_use]
	pub fn call(&self, message: Message) -> Message {
		(self.0)(message)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for TaggerFn {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "TaggerFn({:p})", Rc::as_ptr(&self.0) as *const ())
	}
}

/// Renders a lazy subtree from its arguments. Compared by identity.
#[derive(Clone)]
pub struct RenderFn(Rc<dyn Fn(&[Value]) -> VNode>);

impl RenderFn {
	pub fn new(f: impl Fn(&[Value]) -> VNode + 'static) -> Self {
		Self(Rc::new(f))
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for RenderFn {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "RenderFn({:p})", Rc::as_ptr(&self.0) as *const ())
	}
}

/// Mutates a custom node's live output in place.
pub type CustomPatch = Rc<dyn Fn(&mut LiveNode, &Document)>;

/// An opaque, externally managed node. Implementations are compared by identity.
pub trait Widget {
	fn render(&self, model: &Value, document: &Document) -> LiveNode;

	/// Returns a patch turning the output for `old` into the output for `new`, if they differ.
	fn diff(&self, old: &Value, new: &Value) -> Option<CustomPatch>;
}

pub enum Node {
	Text(String),
	Element {
		tag: String,
		namespace: Option<String>,
		facts: Facts,
		children: Vec<VNode>,
		descendants: usize,
	},
	Keyed {
		tag: String,
		namespace: Option<String>,
		facts: Facts,
		children: Vec<(String, VNode)>,
		descendants: usize,
	},
	Tagger {
		tagger: TaggerFn,
		inner: VNode,
		descendants: usize,
	},
	Thunk {
		render: RenderFn,
		args: Vec<Value>,
		cached: OnceCell<VNode>,
	},
	Custom {
		facts: Facts,
		model: Value,
		widget: Rc<dyn Widget>,
	},
}

/// A shared handle to an immutable virtual node.
#[derive(Clone)]
pub struct VNode(Rc<Node>);

impl Deref for VNode {
	type Target = Node;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

fn count<'a>(children: impl Iterator<Item = &'a VNode>) -> usize {
	children.map(|child| child.descendants() + 1).sum()
}

impl VNode {
	pub fn text(text: impl Into<String>) -> Self {
		Self(Rc::new(Node::Text(text.into())))
	}

	pub fn element(tag: impl Into<String>, facts: impl IntoIterator<Item = Fact>, children: impl IntoIterator<Item = VNode>) -> Self {
		Self::element_in(None, tag.into(), facts, children)
	}

	pub fn element_ns(namespace: impl Into<String>, tag: impl Into<String>, facts: impl IntoIterator<Item = Fact>, children: impl IntoIterator<Item = VNode>) -> Self {
		Self::element_in(Some(namespace.into()), tag.into(), facts, children)
	}

	fn element_in(namespace: Option<String>, tag: String, facts: impl IntoIterator<Item = Fact>, children: impl IntoIterator<Item = VNode>) -> Self {
		let children: Vec<_> = children.into_iter().collect();
		Self(Rc::new(Node::Element {
			tag,
			namespace,
			facts: Facts::organize(facts),
			descendants: count(children.iter()),
			children,
		}))
	}

	/// An element whose children are reconciled by key.
	pub fn keyed<K: Into<String>>(tag: impl Into<String>, facts: impl IntoIterator<Item = Fact>, children: impl IntoIterator<Item = (K, VNode)>) -> Self {
		Self::keyed_in(None, tag.into(), facts, children)
	}

	pub fn keyed_ns<K: Into<String>>(
		namespace: impl Into<String>,
		tag: impl Into<String>,
		facts: impl IntoIterator<Item = Fact>,
		children: impl IntoIterator<Item = (K, VNode)>,
	) -> Self {
		Self::keyed_in(Some(namespace.into()), tag.into(), facts, children)
	}

	fn keyed_in<K: Into<String>>(namespace: Option<String>, tag: String, facts: impl IntoIterator<Item = Fact>, children: impl IntoIterator<Item = (K, VNode)>) -> Self {
		let children: Vec<_> = children.into_iter().map(|(key, child)| (key.into(), child)).collect();
		Self(Rc::new(Node::Keyed {
			tag,
			namespace,
			facts: Facts::organize(facts),
			descendants: count(children.iter().map(|(_, child)| child)),
			children,
		}))
	}

	/// Routes messages from `inner` through `tagger`.
	#[must_use]
	pub fn tagged(tagger: &TaggerFn, inner: VNode) -> Self {
		Self(Rc::new(Node::Tagger {
			tagger: tagger.clone(),
			descendants: inner.descendants() + 1,
			inner,
		}))
	}

	/// A subtree that's only rendered again if `render` or `args` change.
	#[must_use]
	pub fn lazy(render: &RenderFn, args: Vec<Value>) -> Self {
		Self(Rc::new(Node::Thunk {
			render: render.clone(),
			args,
			cached: OnceCell::new(),
		}))
	}

	pub fn custom(facts: impl IntoIterator<Item = Fact>, model: Value, widget: Rc<dyn Widget>) -> Self {
		Self(Rc::new(Node::Custom {
			facts: Facts::organize(facts),
			model,
			widget,
		}))
	}

	/// Number of nodes below this one in pre-order. Thunks and custom nodes count as leaves.
	#[must_use]
	pub fn descendants(&self) -> usize {
		match &*self.0 {
			Node::Element { descendants, .. } | Node::Keyed { descendants, .. } | Node::Tagger { descendants, .. } => *descendants,
			Node::Text(_) | Node::Thunk { .. } | Node::Custom { .. } => 0,
		}
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Evaluates a thunk, at most once. Returns [`None`] for other nodes.
	#[must_use]
	pub fn force(&self) -> Option<&VNode> {
		match &*self.0 {
			Node::Thunk { render, args, cached } => Some(cached.get_or_init(|| (render.0)(args.as_slice()))),
			_ => None,
		}
	}

	/// The thunk's cached content, if it has been evaluated.
	#[must_use]
	pub fn cached(&self) -> Option<&VNode> {
		match &*self.0 {
			Node::Thunk { cached, .. } => cached.get(),
			_ => None,
		}
	}

	/// Strips a tagger chain, returning its taggers outermost first and the first non-tagger node.
	#[must_use]
	pub fn unwrap_taggers(&self) -> (Vec<&TaggerFn>, &VNode) {
		let mut taggers = Vec::new();
		let mut node = self;
		while let Node::Tagger { tagger, inner, .. } = &**node {
			taggers.push(tagger);
			node = inner;
		}
		(taggers, node)
	}

	/// Converts a keyed element into a plain one with the same children.
	#[must_use]
	pub fn dekey(&self) -> Self {
		match &*self.0 {
			Node::Keyed {
				tag,
				namespace,
				facts,
				children,
				descendants,
			} => Self(Rc::new(Node::Element {
				tag: tag.clone(),
				namespace: namespace.clone(),
				facts: facts.clone(),
				children: children.iter().map(|(_, child)| child.clone()).collect(),
				descendants: *descendants,
			})),
			_ => self.clone(),
		}
	}
}

impl Debug for VNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &*self.0 {
			Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Node::Element { tag, namespace, facts, children, .. } => f
				.debug_struct("Element")
				.field("tag", tag)
				.field("namespace", namespace)
				.field("facts", facts)
				.field("children", children)
				.finish(),
			Node::Keyed { tag, namespace, facts, children, .. } => f
				.debug_struct("Keyed")
				.field("tag", tag)
				.field("namespace", namespace)
				.field("facts", facts)
				.field("children", children)
				.finish(),
			Node::Tagger { tagger, inner, .. } => f.debug_struct("Tagger").field("tagger", tagger).field("inner", inner).finish(),
			Node::Thunk { render, args, cached } => f
				.debug_struct("Thunk")
				.field("render", render)
				.field("args", args)
				.field("forced", &cached.get().is_some())
				.finish(),
			Node::Custom { facts, model, widget } => f
				.debug_struct("Custom")
				.field("facts", facts)
				.field("model", model)
				.field("widget", &(Rc::as_ptr(widget) as *const ()))
				.finish(),
		}
	}
}
