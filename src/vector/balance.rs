//! Concatenation and slicing of RRB-trees.
//!
//! Appending merges the right spine of the left tree with the left spine of the right tree, one height at a time.
//! At each height, the two boundary nodes are only rebalanced ([`shuffle`]) if leaving them as they are would cost
//! more than `tolerance` extra search steps ([`calc_to_remove`]).

use super::node::{Node, M};
use core::{cmp::Ordering, mem};
use std::sync::Arc;
use tracing::trace;

/// Counts the slots that could be saved by packing the grandchildren of `a` and `b` as tightly as possible.
pub(crate) fn calc_to_remove<T>(a: &Node<T>, b: &Node<T>) -> usize {
	let sub_lengths: usize = a.children().iter().chain(b.children()).map(|child| child.slots()).sum();
	let slots = a.slots() + b.slots();
	if sub_lengths == 0 {
		return slots;
	}
	slots.saturating_sub((sub_lengths - 1) / M + 1)
}

pub(crate) fn append<T: Clone>(a: &Arc<Node<T>>, b: &Arc<Node<T>>, tolerance: usize) -> Arc<Node<T>> {
	if a.slots() == 0 {
		return Arc::clone(b);
	}
	if b.slots() == 0 {
		return Arc::clone(a);
	}

	let (left, right) = append_nodes(Arc::clone(a), Arc::clone(b), tolerance);

	// Both halves may fit into a single node.
	if left.slots() + right.slots() <= M {
		if left.slots() == 0 {
			return right;
		}
		if right.slots() == 0 {
			return left;
		}
		let mut merged = Arc::try_unwrap(left).unwrap_or_else(|shared| (*shared).clone());
		merged.extend_from(&right, 0, right.slots());
		return Arc::new(merged);
	}

	Arc::new(Node::siblise(left, right))
}

/// Merges the facing spines of `a` and `b`.
///
/// Returns two nodes of equal height that together hold all elements in order. One of them may be empty.
pub(crate) fn append_nodes<T: Clone>(a: Arc<Node<T>>, b: Arc<Node<T>>, tolerance: usize) -> (Arc<Node<T>>, Arc<Node<T>>) {
	if a.height() == 0 && b.height() == 0 {
		return (a, b);
	}

	let (a, b) = if a.height() != 1 || b.height() != 1 {
		match a.height().cmp(&b.height()) {
			Ordering::Equal => {
				let (left, right) = append_nodes(last_child(&a), first_child(&b), tolerance);
				let mut a = (*a).clone();
				let mut b = (*b).clone();
				a.replace_last(left);
				b.replace_first(right);
				(a, b)
			}
			Ordering::Greater => {
				let (left, right) = append_nodes(last_child(&a), b, tolerance);
				let mut a = (*a).clone();
				a.replace_last(left);
				(a, Node::wrap(right))
			}
			Ordering::Less => {
				let (left, right) = append_nodes(a, first_child(&b), tolerance);
				let mut b = (*b).clone();
				// Whichever half is non-empty and closer to `b` stays in it.
				let a = if left.slots() == 0 {
					b.replace_first(left);
					Node::wrap(right)
				} else {
					b.replace_first(right);
					Node::wrap(left)
				};
				(a, b)
			}
		}
	} else {
		((*a).clone(), (*b).clone())
	};

	if a.slots() == 0 || b.slots() == 0 {
		return (Arc::new(a), Arc::new(b));
	}

	let to_remove = calc_to_remove(&a, &b);
	if to_remove <= tolerance {
		return (Arc::new(a), Arc::new(b));
	}

	trace!(height = a.height(), to_remove, "Shuffling boundary nodes.");
	let (a, b) = shuffle(&a, &b, to_remove);
	(Arc::new(a), Arc::new(b))
}

/// Packs the grandchildren of `a` and `b` left to right into full slots until `to_remove` slots are saved,
/// then moves the remaining slots over unchanged.
///
/// Returns the new left node (at most `M` slots) and the overflow as the right node, which may be empty.
pub(crate) fn shuffle<T: Clone>(a: &Node<T>, b: &Node<T>, to_remove: usize) -> (Node<T>, Node<T>) {
	let height = a.height();
	debug_assert!(height > 0);
	debug_assert_eq!(height, b.height());

	let children: Vec<&Arc<Node<T>>> = a.children().iter().chain(b.children()).collect();
	let total = children.len();
	let mut packed: Vec<Arc<Node<T>>> = Vec::with_capacity(total);

	// Full slots at the front are kept as they are.
	let mut read = 0;
	while read < total && children[read].slots() == M {
		packed.push(Arc::clone(children[read]));
		read += 1;
	}

	let mut slot = Node::empty_at(height - 1);
	let mut from = 0;
	while read < total && saved(read, packed.len(), slot.slots()) < to_remove {
		let source = children[read];
		let take = (M - slot.slots()).min(source.slots() - from);
		slot.extend_from(source, from, from + take);
		from += take;

		if from == source.slots() {
			read += 1;
			from = 0;
		}

		if slot.slots() == M {
			packed.push(Arc::new(mem::replace(&mut slot, Node::empty_at(height - 1))));
		}
	}

	// A partially consumed source only remains right after a full slot was written, so its rest fits.
	if from > 0 {
		let source = children[read];
		slot.extend_from(source, from, source.slots());
		read += 1;
	}
	if slot.slots() > 0 {
		packed.push(Arc::new(slot));
	}

	packed.extend(children[read..].iter().map(|child| Arc::clone(child)));

	let overflow = if packed.len() > M { packed.split_off(M) } else { Vec::new() };
	(Node::from_children(height, packed), Node::from_children(height, overflow))
}

/// Slots saved so far, not counting a partially filled pending slot as written yet.
fn saved(read: usize, written: usize, pending: usize) -> usize {
	let written = written + usize::from(pending > 0);
	read.saturating_sub(written)
}

/// Keeps the first `to` elements.
pub(crate) fn slice_right<T: Clone>(node: &Arc<Node<T>>, to: usize) -> Arc<Node<T>> {
	if to >= node.len() {
		return Arc::clone(node);
	}

	match &**node {
		Node::Leaf(items) => Arc::new(Node::Leaf(items[..to].to_vec())),
		Node::Branch { height, children, .. } => {
			let right = node.slot_for(to);
			let sliced = slice_right(&children[right], to - node.offset_of(right));

			let mut kept = children[..right].to_vec();
			if sliced.slots() > 0 {
				kept.push(sliced);
			}
			Arc::new(Node::from_children(*height, kept))
		}
	}
}

/// Drops the first `from` elements.
pub(crate) fn slice_left<T: Clone>(node: &Arc<Node<T>>, from: usize) -> Arc<Node<T>> {
	if from == 0 {
		return Arc::clone(node);
	}
	if from >= node.len() {
		return Arc::new(Node::empty_at(node.height()));
	}

	match &**node {
		Node::Leaf(items) => Arc::new(Node::Leaf(items[from..].to_vec())),
		Node::Branch { height, children, .. } => {
			let left = node.slot_for(from);
			let sliced = slice_left(&children[left], from - node.offset_of(left));

			let mut kept = Vec::with_capacity(children.len() - left);
			if sliced.slots() > 0 {
				kept.push(sliced);
			}
			kept.extend(children[left + 1..].iter().cloned());
			Arc::new(Node::from_children(*height, kept))
		}
	}
}

// Only called on branches above height 0 of non-empty trees, and appended or sliced trees never keep empty children.
fn last_child<T>(node: &Arc<Node<T>>) -> Arc<Node<T>> {
	Arc::clone(node.children().last().expect("non-empty branch"))
}

fn first_child<T>(node: &Arc<Node<T>>) -> Arc<Node<T>> {
	Arc::clone(node.children().first().expect("non-empty branch"))
}
