//! Renders virtual trees into live trees and applies patch lists to them.

use crate::{
	facts::FactsDiff,
	live::{Document, EventNode, LiveKind, LiveNode, Listener},
	patch::{is_ordered, InsertEntry, Move, Patch, PatchKind, Reorder},
	rc_hash_map::RcHashMap,
	vnode::{Node, VNode},
};
use core::{cell::RefCell, mem};
use hashbrown::HashMap;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Patcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// How deep rendering and patching may recurse. Anything below is left out, with an error logged.
	pub depth_limit: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self { depth_limit: 1024 }
	}
}

/// Applies virtual trees to live trees created by its [`Document`], keeping count of installed listeners.
pub struct Patcher {
	document: Document,
	listeners: RcHashMap<String, u32, ()>,
	config: Config,
}

impl Default for Patcher {
	fn default() -> Self {
		Self::new(Config::default())
	}
}

/// Position in a patch list during the tree walk.
struct Cursor<'a> {
	patches: &'a [Patch],
	next: usize,
}

impl<'a> Cursor<'a> {
	fn new(patches: &'a [Patch]) -> Self {
		Self { patches, next: 0 }
	}

	fn peek_at(&self, index: usize) -> Option<&'a Patch> {
		self.patches.get(self.next).filter(|patch| patch.index == index)
	}

	fn next_at(&mut self, index: usize) -> Option<&'a Patch> {
		let patch = self.peek_at(index)?;
		self.next += 1;
		Some(patch)
	}

	/// Whether a pending patch targets an index up to `high`.
	fn has_through(&self, high: usize) -> bool {
		self.patches.get(self.next).map_or(false, |patch| patch.index <= high)
	}

	fn skip_through(&mut self, high: usize) {
		while self.has_through(high) {
			self.next += 1;
		}
	}

	fn skip_before(&mut self, index: usize) {
		let start = self.next;
		while self.patches.get(self.next).map_or(false, |patch| patch.index < index) {
			self.next += 1;
		}
		if self.next > start {
			error!("Skipped {} patch(es) that didn't match the tree walk.", self.next - start);
		}
	}

	fn remaining(&self) -> usize {
		self.patches.len() - self.next
	}
}

impl Patcher {
	#[must_use]
	pub fn new(config: Config) -> Self {
		Self {
			document: Document::new(),
			listeners: RcHashMap::new(),
			config,
		}
	}

	/// The document all live nodes of this patcher are created with.
	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// How many live listeners for `event` this patcher has installed and not removed since.
	#[must_use]
	pub fn listener_count(&self, event: &str) -> u32 {
		self.listeners.count(event)
	}

	/// Creates a live tree for `vnode`. Messages from its listeners are delivered to `scope`.
	#[instrument(skip(self, vnode, scope))]
	pub fn render(&mut self, vnode: &VNode, scope: &Rc<EventNode>) -> LiveNode {
		self.render_help(vnode, scope, self.config.depth_limit)
	}

	fn render_help(&mut self, vnode: &VNode, scope: &Rc<EventNode>, depth_limit: usize) -> LiveNode {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return self.document.create_text_node("");
		}

		match &**vnode {
			Node::Text(text) => self.document.create_text_node(text.clone()),
			Node::Element {
				tag,
				namespace,
				facts,
				children,
				..
			} => {
				let mut live = self.create_element(namespace.as_deref(), tag);
				self.apply_facts(&mut live, &facts.as_diff(), scope);
				let rendered = children.iter().map(|child| self.render_help(child, scope, depth_limit - 1)).collect();
				if let Some(element) = live.element_mut() {
					element.children = rendered;
				}
				live
			}
			Node::Keyed {
				tag,
				namespace,
				facts,
				children,
				..
			} => {
				let mut live = self.create_element(namespace.as_deref(), tag);
				self.apply_facts(&mut live, &facts.as_diff(), scope);
				let rendered = children.iter().map(|(_, child)| self.render_help(child, scope, depth_limit - 1)).collect();
				if let Some(element) = live.element_mut() {
					element.children = rendered;
				}
				live
			}
			Node::Tagger { .. } => {
				let (taggers, inner) = vnode.unwrap_taggers();
				let event_node = Rc::new(EventNode::Tagged {
					taggers: RefCell::new(taggers.into_iter().cloned().collect()),
					parent: Rc::clone(scope),
				});
				let mut live = self.render_help(inner, &event_node, depth_limit - 1);
				live.event_nodes.insert(0, event_node);
				live
			}
			Node::Thunk { .. } => match vnode.force() {
				Some(inner) => self.render_help(inner, scope, depth_limit - 1),
				None => self.document.create_text_node(""),
			},
			Node::Custom { facts, model, widget } => {
				let mut live = widget.render(model, &self.document);
				if !facts.is_empty() {
					self.apply_facts(&mut live, &facts.as_diff(), scope);
				}
				live
			}
		}
	}

	fn create_element(&self, namespace: Option<&str>, tag: &str) -> LiveNode {
		match namespace {
			Some(namespace) => self.document.create_element_ns(namespace, tag),
			None => self.document.create_element(tag),
		}
	}

	/// Applies `patches` from [`diff(old, …)`](`crate::diff::diff`) to `live`, which must have been rendered from `old`.
	///
	/// `scope` must be the event node `live` was rendered with.
	#[instrument(skip(self, live, old, patches, scope), fields(patches = patches.len()))]
	pub fn apply_patches(&mut self, live: &mut LiveNode, old: &VNode, patches: &[Patch], scope: &Rc<EventNode>) {
		if patches.is_empty() {
			return trace!("Nothing to patch.");
		}
		debug_assert!(is_ordered(patches));

		let mut cursor = Cursor::new(patches);
		self.patch_node(live, old, 0, &mut cursor, scope, 0, self.config.depth_limit);
		if cursor.remaining() > 0 {
			error!("{} patch(es) didn't match the tree and were ignored.", cursor.remaining());
		}

		{
			let drain = self.listeners.drain_weak();
			if STATIC_MAX_LEVEL >= Level::TRACE {
				trace!("Dropped {} unused event name(s).", drain.count());
			}
		}
		info!("Event listener names/cached capacity: {}/{}", self.listeners.len(), self.listeners.capacity());
	}

	/// Walks `live` and `vnode` together, applying patches at pre-order `index` and below.
	///
	/// `tagger_depth` counts the tagger chains already entered on this live node.
	#[allow(clippy::too_many_arguments)]
	fn patch_node(&mut self, live: &mut LiveNode, vnode: &VNode, index: usize, cursor: &mut Cursor<'_>, scope: &Rc<EventNode>, tagger_depth: usize, depth_limit: usize) {
		let high = index + vnode.descendants();
		if depth_limit == 0 {
			cursor.skip_through(high);
			return error!("Depth limit reached");
		}
		cursor.skip_before(index);

		while let Some(patch) = cursor.next_at(index) {
			match &patch.kind {
				PatchKind::Redraw(new) => {
					trace!(index, "Redrawing.");
					self.redraw(live, new, scope, tagger_depth, depth_limit);
					return cursor.skip_through(high);
				}
				PatchKind::UpdateFacts(diff) => self.apply_facts(live, diff, scope),
				PatchKind::UpdateText(text) => {
					if let LiveKind::Text(current) = &mut live.kind {
						#[cfg(feature = "dangerous-logging")]
						trace!(index, old = current.as_str(), new = text.as_str(), "Updating text.");
						*current = text.clone();
					} else {
						error!("Expected a text node but found an element; Recreating the node.");
						self.redraw(live, &VNode::text(text.clone()), scope, tagger_depth, depth_limit);
					}
				}
				PatchKind::DescendIntoThunk(nested) => match vnode.force() {
					Some(inner) => {
						let span = trace_span!("Patching lazy subtree", index);
						let _enter = span.enter();
						let mut nested_cursor = Cursor::new(nested);
						self.patch_node(live, inner, 0, &mut nested_cursor, scope, tagger_depth, depth_limit - 1);
						if nested_cursor.remaining() > 0 {
							error!("{} nested patch(es) didn't match the lazy subtree.", nested_cursor.remaining());
						}
					}
					None => error!("Expected a lazy node at index {}.", index),
				},
				PatchKind::RetagTagger(taggers) => match live.event_nodes.get(tagger_depth).map(|event_node| &**event_node) {
					Some(EventNode::Tagged { taggers: current, .. }) => *current.borrow_mut() = taggers.clone(),
					_ => error!("Missing event node for the tagger at index {}.", index),
				},
				PatchKind::RemoveTrailingChildren { from, count } => match live.element_mut() {
					Some(element) => {
						let at = (*from).min(element.children.len());
						let removed = element.children.split_off(at);
						if removed.len() != *count {
							warn!("Expected to remove {} trailing child(ren) but found {}.", count, removed.len());
						}
						for child in &removed {
							self.release(child);
						}
					}
					None => error!("Expected an element to remove children from at index {}.", index),
				},
				PatchKind::AppendChildren(new) => {
					let rendered: Vec<_> = new.iter().map(|child| self.render_help(child, scope, depth_limit - 1)).collect();
					match live.element_mut() {
						Some(element) => element.children.extend(rendered),
						None => {
							error!("Expected an element to append children to at index {}.", index);
							rendered.iter().for_each(|child| self.release(child));
						}
					}
				}
				PatchKind::ReorderKeyedChildren(reorder) => self.reorder(live, vnode, index, reorder, scope, depth_limit),
				PatchKind::Custom(custom) => custom(&mut *live, &self.document),
				PatchKind::RemoveChild(_) => error!("Unexpected child removal outside of a keyed reorder at index {}.", index),
			}
		}

		if !cursor.has_through(high) {
			return;
		}

		match &**vnode {
			Node::Tagger { .. } => {
				let (taggers, inner) = vnode.unwrap_taggers();
				match live.event_nodes.get(tagger_depth).cloned() {
					Some(event_node) => self.patch_node(live, inner, index + taggers.len(), cursor, &event_node, tagger_depth + 1, depth_limit - 1),
					None => {
						error!("Missing event node for the tagger at index {}.", index);
						cursor.skip_through(high);
					}
				}
			}
			Node::Element { children, .. } => self.patch_children(live, children.iter(), index, high, cursor, scope, depth_limit),
			Node::Keyed { children, .. } => self.patch_children(live, children.iter().map(|(_, child)| child), index, high, cursor, scope, depth_limit),
			Node::Text(_) | Node::Thunk { .. } | Node::Custom { .. } => {
				error!("Unexpected patches below a leaf at index {}.", index);
				cursor.skip_through(high);
			}
		}
	}

	#[allow(clippy::too_many_arguments)]
	fn patch_children<'v>(
		&mut self,
		live: &mut LiveNode,
		children: impl Iterator<Item = &'v VNode>,
		index: usize,
		high: usize,
		cursor: &mut Cursor<'_>,
		scope: &Rc<EventNode>,
		depth_limit: usize,
	) {
		let element = match live.element_mut() {
			Some(element) => element,
			None => {
				error!("Expected an element with children at index {}.", index);
				return cursor.skip_through(high);
			}
		};

		let mut low = index;
		for (i, child) in children.enumerate() {
			low += 1;
			let child_high = low + child.descendants();
			if cursor.has_through(child_high) {
				match element.children.get_mut(i) {
					Some(live_child) => self.patch_node(live_child, child, low, cursor, scope, 0, depth_limit - 1),
					None => {
						error!("Expected a child beyond the end of the live child list.");
						cursor.skip_through(child_high);
					}
				}
			}
			if !cursor.has_through(high) {
				break;
			}
			low = child_high;
		}
	}

	fn redraw(&mut self, live: &mut LiveNode, new: &VNode, scope: &Rc<EventNode>, tagger_depth: usize, depth_limit: usize) {
		let mut fresh = self.render_help(new, scope, depth_limit);
		let mut event_nodes: Vec<_> = live.event_nodes.iter().take(tagger_depth).cloned().collect();
		event_nodes.append(&mut fresh.event_nodes);
		fresh.event_nodes = event_nodes;
		self.release(live);
		*live = fresh;
	}

	#[allow(clippy::too_many_arguments)]
	fn reorder(&mut self, live: &mut LiveNode, vnode: &VNode, index: usize, reorder: &Reorder, scope: &Rc<EventNode>, depth_limit: usize) {
		let kids = match &**vnode {
			Node::Keyed { children, .. } => children,
			_ => return error!("Expected a keyed element to reorder at index {}.", index),
		};
		let element = match live.element_mut() {
			Some(element) => element,
			None => return error!("Expected an element to reorder at index {}.", index),
		};

		let span = trace_span!("Reordering keyed children", index, inserts = reorder.inserts.len(), trailing = reorder.trailing_inserts.len());
		let _enter = span.enter();

		let old_children = mem::take(&mut element.children);
		if old_children.len() != kids.len() {
			error!("Expected {} keyed children but found {}.", kids.len(), old_children.len());
		}
		let mut old_children = old_children.into_iter();
		let mut kept = Vec::with_capacity(kids.len());
		let mut moved = HashMap::new();
		let mut cursor = Cursor::new(&reorder.patches);

		let mut low = index;
		for (_, kid) in kids {
			low += 1;
			let high = low + kid.descendants();
			let mut live_kid = match old_children.next() {
				Some(live_kid) => live_kid,
				None => {
					cursor.skip_through(high);
					low = high;
					continue;
				}
			};

			match cursor.peek_at(low).map(|patch| &patch.kind) {
				Some(PatchKind::RemoveChild(removal)) => {
					cursor.next += 1;
					match removal {
						None => self.release(&live_kid),
						Some(Move { id, patches }) => {
							let mut nested = Cursor::new(patches);
							self.patch_node(&mut live_kid, kid, low, &mut nested, scope, 0, depth_limit - 1);
							moved.insert(*id, live_kid);
						}
					}
				}
				_ => {
					if cursor.has_through(high) {
						self.patch_node(&mut live_kid, kid, low, &mut cursor, scope, 0, depth_limit - 1);
					}
					kept.push(live_kid);
				}
			}
			low = high;
		}
		kept.extend(old_children);

		for insert in &reorder.inserts {
			if let Some(node) = self.insert_entry(&insert.entry, &mut moved, scope, depth_limit) {
				let at = insert.index.min(kept.len());
				kept.insert(at, node);
			}
		}
		for entry in &reorder.trailing_inserts {
			if let Some(node) = self.insert_entry(entry, &mut moved, scope, depth_limit) {
				kept.push(node);
			}
		}

		if !moved.is_empty() {
			error!("{} moved node(s) were never inserted again.", moved.len());
			for node in moved.values() {
				self.release(node);
			}
		}
		element.children = kept;
	}

	fn insert_entry(&mut self, entry: &InsertEntry, moved: &mut HashMap<usize, LiveNode>, scope: &Rc<EventNode>, depth_limit: usize) -> Option<LiveNode> {
		match entry {
			InsertEntry::Render(vnode) => Some(self.render_help(vnode, scope, depth_limit - 1)),
			InsertEntry::Move(id) => {
				let node = moved.remove(id);
				if node.is_none() {
					error!("Missing moved node {}.", id);
				}
				node
			}
		}
	}

	fn apply_facts(&mut self, live: &mut LiveNode, diff: &FactsDiff, scope: &Rc<EventNode>) {
		let element = match live.element_mut() {
			Some(element) => element,
			None => return error!("Expected an element to update facts on but found a text node."),
		};

		apply_category(&mut element.properties, &diff.properties);
		apply_category(&mut element.attributes, &diff.attributes);
		apply_category(&mut element.attributes_ns, &diff.attributes_ns);
		apply_category(&mut element.styles, &diff.styles);

		for (name, handler) in &diff.events {
			match handler {
				Some(handler) => {
					let previous = element.listeners.insert(
						name.clone(),
						Listener {
							handler: handler.clone(),
							event_node: Rc::clone(scope),
						},
					);
					if previous.is_none() {
						self.listen(name);
					}
				}
				None => {
					if element.listeners.remove(name).is_some() {
						self.unlisten(name);
					}
				}
			}
		}
	}

	fn listen(&mut self, name: &str) {
		if self.listeners.increment_or_insert_with(name.to_owned(), || ()).is_err() {
			error!("Listener count saturated for an event name.");
		}
	}

	fn unlisten(&mut self, name: &str) {
		match self.listeners.weak_decrement(name) {
			Ok(Some(())) => (),
			Ok(None) => warn!("Removed a listener that wasn't counted."),
			Err(_) => error!("Listener count underflowed for an event name."),
		}
	}

	/// Uncounts all listeners in a removed subtree.
	fn release(&mut self, live: &LiveNode) {
		live.for_each_listener(&mut |name| self.unlisten(name));
	}
}

fn apply_category<V: Clone>(target: &mut BTreeMap<String, V>, diff: &BTreeMap<String, Option<V>>) {
	for (key, value) in diff {
		match value {
			Some(value) => {
				target.insert(key.clone(), value.clone());
			}
			None => {
				target.remove(key);
			}
		}
	}
}
