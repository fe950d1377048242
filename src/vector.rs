//! A persistent vector backed by a Relaxed Radix Balanced tree.
//!
//! Every operation returns a new [`Vector`] and leaves its input untouched.
//! Unchanged subtrees are shared between versions via [`Arc`], so vectors are cheap to clone,
//! can be read from several threads at once and only copy the path they touch.
//!
//! ```
//! use heartwood::Vector;
//!
//! let a: Vector<u32> = (0..100).collect();
//! let b = a.push(100).set(0, 1000);
//!
//! assert_eq!(a[0], 0);
//! assert_eq!(b[0], 1000);
//! assert_eq!(b.len(), 101);
//! assert_eq!(a.append(&b).slice(-3, -1).to_vec(), vec![98, 99]);
//! ```

mod balance;
mod iter;
mod node;

pub use iter::Iter;

use crate::Error;
use core::{
	fmt::{self, Debug, Formatter},
	iter::FromIterator,
	mem,
	ops::Index,
};
use node::{Node, M};
use std::sync::Arc;
use tracing::{instrument, trace};

/// How many extra search steps a concatenation may leave behind before the boundary nodes are rebalanced.
pub const DEFAULT_TOLERANCE: usize = 2;

/// An immutable, indexable sequence with cheap persistent updates and O(log n) concatenation.
pub struct Vector<T> {
	root: Arc<Node<T>>,
}

impl<T> Clone for Vector<T> {
	fn clone(&self) -> Self {
		Self {
			root: Arc::clone(&self.root),
		}
	}
}

impl<T> Default for Vector<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Vector<T> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			root: Arc::new(Node::empty_at(0)),
		}
	}

	/// Normalises a root produced by slicing: empty branches become an empty leaf and single-child roots are
	/// replaced by their child.
	fn from_root(mut root: Arc<Node<T>>) -> Self {
		loop {
			let only = match &*root {
				Node::Branch { children, .. } if children.len() == 1 => Arc::clone(&children[0]),
				Node::Branch { children, .. } if children.is_empty() => return Self::new(),
				_ => break,
			};
			root = only;
		}
		Self { root }
	}

	/// O(1).
	#[must_use]
	pub fn len(&self) -> usize {
		self.root.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Height of the underlying tree. A vector of at most 32 elements has height 0.
	#[must_use]
	pub fn height(&self) -> usize {
		self.root.height()
	}

	/// Returns the element at `index`, or [`None`] if it's out of range.
	#[must_use]
	pub fn get(&self, index: usize) -> Option<&T> {
		if index < self.len() {
			Some(self.root.get(index))
		} else {
			None
		}
	}

	/// Returns the element at `index`.
	///
	/// # Errors
	///
	/// [`Error::IndexOutOfRange`] iff `index` is negative or not less than [`Vector::len`].
	#[allow(clippy::cast_sign_loss)]
	pub fn try_get(&self, index: isize) -> Result<&T, Error> {
		if index >= 0 && (index as usize) < self.len() {
			Ok(self.root.get(index as usize))
		} else {
			Err(Error::IndexOutOfRange { index, len: self.len() })
		}
	}

	pub fn iter(&self) -> Iter<'_, T> {
		Iter::new(&self.root)
	}

	/// Reduces from the left.
	pub fn foldl<B, F: FnMut(B, &T) -> B>(&self, init: B, mut f: F) -> B {
		self.root.foldl(init, &mut f)
	}

	/// Reduces from the right.
	pub fn foldr<B, F: FnMut(&T, B) -> B>(&self, init: B, mut f: F) -> B {
		self.root.foldr(init, &mut f)
	}

	/// Maps each element, keeping the tree's shape.
	#[must_use]
	pub fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> Vector<U> {
		Vector {
			root: Arc::new(self.root.map(0, &mut |_, item| f(item))),
		}
	}

	/// Like [`Vector::map`], but also passes each element's index.
	#[must_use]
	pub fn indexed_map<U, F: FnMut(usize, &T) -> U>(&self, mut f: F) -> Vector<U> {
		Vector {
			root: Arc::new(self.root.map(0, &mut f)),
		}
	}

	pub fn for_each<F: FnMut(&T)>(&self, mut f: F) {
		self.root.for_each(&mut f);
	}

	/// Whether both vectors share the same root.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.root, &other.root)
	}
}

impl<T: Clone> Vector<T> {
	/// Creates a vector of `len` elements by calling `f` with each index.
	pub fn from_fn<F: FnMut(usize) -> T>(len: usize, f: F) -> Self {
		(0..len).map(f).collect()
	}

	pub fn repeat(len: usize, value: &T) -> Self {
		Self::from_fn(len, |_| value.clone())
	}

	/// Replaces the element at `index`. Out of range indices return the vector unchanged.
	#[must_use]
	pub fn set(&self, index: usize, value: T) -> Self {
		if index >= self.len() {
			return self.clone();
		}
		Self {
			root: Arc::new(self.root.set(index, value)),
		}
	}

	/// Appends one element.
	#[must_use]
	pub fn push(&self, value: T) -> Self {
		match self.root.push(value) {
			Ok(root) => Self { root: Arc::new(root) },
			Err(value) => {
				trace!(height = self.height() + 1, "Growing vector.");
				let spine = Node::single(value, self.height());
				Self {
					root: Arc::new(Node::siblise(Arc::clone(&self.root), Arc::new(spine))),
				}
			}
		}
	}

	/// Returns the elements in `from..to`.
	///
	/// Negative indices count from the end. Both bounds are clamped into `0..=len()`,
	/// so an empty range yields an empty vector.
	#[must_use]
	pub fn slice(&self, from: isize, to: isize) -> Self {
		let from = self.normalize(from);
		let to = self.normalize(to);
		if from >= to {
			return Self::new();
		}
		Self::from_root(balance::slice_left(&balance::slice_right(&self.root, to), from))
	}

	#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
	fn normalize(&self, index: isize) -> usize {
		let len = self.len() as isize;
		let index = if index < 0 { index + len } else { index };
		index.max(0).min(len) as usize
	}

	/// Concatenates two vectors in O(log n), using [`DEFAULT_TOLERANCE`].
	#[must_use]
	pub fn append(&self, other: &Self) -> Self {
		self.append_with_tolerance(other, DEFAULT_TOLERANCE)
	}

	/// Concatenates two vectors, rebalancing the boundary nodes only where more than `tolerance` slots could be saved.
	///
	/// Lower tolerances keep lookups faster at the expense of more copying during concatenation.
	#[must_use]
	#[instrument(skip(self, other), fields(left = self.len(), right = other.len()))]
	pub fn append_with_tolerance(&self, other: &Self, tolerance: usize) -> Self {
		Self {
			root: balance::append(&self.root, &other.root, tolerance),
		}
	}

	/// Keeps the elements for which `predicate` returns `true`.
	#[must_use]
	pub fn filter<F: FnMut(&T) -> bool>(&self, mut predicate: F) -> Self {
		self.iter().filter(|item| predicate(item)).cloned().collect()
	}

	#[must_use]
	pub fn to_vec(&self) -> Vec<T> {
		self.iter().cloned().collect()
	}
}

impl<T> Index<usize> for Vector<T> {
	type Output = T;

	/// # Panics
	///
	/// With [`Error::IndexOutOfRange`]'s message iff `index` is out of range.
	fn index(&self, index: usize) -> &Self::Output {
		match self.get(index) {
			Some(item) => item,
			#[allow(clippy::cast_possible_wrap)]
			None => panic!("{}", Error::IndexOutOfRange { index: index as isize, len: self.len() }),
		}
	}
}

impl<T: Clone> FromIterator<T> for Vector<T> {
	/// Packs elements into full leaves and pushes each completed node one level up,
	/// which yields a tree where only the right spine may be partially filled.
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		// `levels[h]` is the node of height `h + 1` currently being filled.
		let mut levels: Vec<Node<T>> = Vec::new();
		let mut leaf = Vec::with_capacity(M);
		for item in iter {
			leaf.push(item);
			if leaf.len() == M {
				push_up(&mut levels, Node::Leaf(mem::replace(&mut leaf, Vec::with_capacity(M))));
			}
		}
		if !leaf.is_empty() {
			push_up(&mut levels, Node::Leaf(leaf));
		}

		let mut h = 0;
		while h + 1 < levels.len() {
			if levels[h].slots() > 0 {
				let node = mem::replace(&mut levels[h], Node::empty_at(h + 1));
				push_up(&mut levels, node);
			}
			h += 1;
		}

		match levels.pop() {
			Some(head) => Self::from_root(Arc::new(head)),
			None => Self::new(),
		}
	}
}

fn push_up<T>(levels: &mut Vec<Node<T>>, node: Node<T>) {
	let h = node.height();
	if levels.len() == h {
		levels.push(Node::empty_at(h + 1));
	}
	levels[h].push_child(Arc::new(node));
	if levels[h].slots() == M {
		let full = mem::replace(&mut levels[h], Node::empty_at(h + 1));
		push_up(levels, full);
	}
}

impl<'a, T> IntoIterator for &'a Vector<T> {
	type Item = &'a T;
	type IntoIter = Iter<'a, T>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<T: PartialEq> PartialEq for Vector<T> {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
	}
}

impl<T: Eq> Eq for Vector<T> {}

impl<T: Debug> Debug for Vector<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.iter()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::{
		balance::{append_nodes, calc_to_remove},
		node::{Node, M},
		Vector, DEFAULT_TOLERANCE,
	};
	use proptest::prelude::*;
	use std::sync::Arc;

	fn check_invariants<T>(node: &Node<T>) {
		match node {
			Node::Leaf(items) => assert!(items.len() <= M),
			Node::Branch { height, children, lengths } => {
				assert!(children.len() <= M);
				assert_eq!(children.len(), lengths.len());
				let mut total = 0;
				for (child, &length) in children.iter().zip(lengths) {
					assert_eq!(child.height() + 1, *height);
					assert!(child.len() > 0, "empty child");
					total += child.len();
					assert_eq!(total, length);
					check_invariants(child);
				}
			}
		}
	}

	fn sliced(len: usize, cut: usize) -> Vector<usize> {
		#[allow(clippy::cast_possible_wrap)]
		let cut = cut as isize;
		(0..len).collect::<Vector<_>>().slice(cut, -cut)
	}

	#[test]
	fn from_iter_packs_leaves() {
		let vector: Vector<usize> = (0..M * M + 1).collect();
		check_invariants(&vector.root);
		assert_eq!(vector.height(), 2);
		assert_eq!(vector.root.slots(), 2);
	}

	#[test]
	fn push_grows_height() {
		let mut vector = Vector::new();
		for i in 0..=M {
			vector = vector.push(i);
		}
		assert_eq!(vector.height(), 1);
		check_invariants(&vector.root);
	}

	#[test]
	fn shuffle_packs_underfull_leaves() {
		// Many tiny appends leave mostly underfull leaves behind, unless they're shuffled.
		let mut vector = Vector::new();
		for i in 0..2000 {
			vector = vector.append(&Vector::from_fn(3, |j| i * 3 + j));
		}
		check_invariants(&vector.root);
		assert_eq!(vector.to_vec(), (0..6000).collect::<Vec<_>>());
		assert!(vector.height() <= 3);
	}

	proptest! {
		#[test]
		fn boundary_pair_is_balanced(
			a_len in 1_usize..3000,
			a_cut in 0_usize..40,
			b_len in 1_usize..3000,
			b_cut in 0_usize..40,
			tolerance in 0_usize..4,
		) {
			let a = sliced(a_len + 2 * a_cut, a_cut);
			let b = sliced(b_len + 2 * b_cut, b_cut);
			let (left, right) = append_nodes(Arc::clone(&a.root), Arc::clone(&b.root), tolerance);
			prop_assert_eq!(left.height(), right.height());
			if left.height() > 0 && left.slots() > 0 && right.slots() > 0 {
				prop_assert!(calc_to_remove(&left, &right) <= tolerance);
			}
		}

		#[test]
		fn appended_tree_is_well_formed(
			parts in prop::collection::vec((1_usize..700, 0_usize..20), 1..8),
		) {
			let mut vector = Vector::new();
			let mut expected = Vec::new();
			for (len, cut) in parts {
				let part = sliced(len + 2 * cut, cut);
				expected.extend(part.iter().copied());
				vector = vector.append(&part);
				check_invariants(&vector.root);
			}
			prop_assert_eq!(vector.to_vec(), expected);
		}

		#[test]
		fn slices_are_well_formed(len in 0_usize..3000, from in -3000_isize..3000, to in -3000_isize..3000) {
			let vector: Vector<usize> = (0..len).collect();
			let sliced = vector.slice(from, to).append(&vector).slice(from, to);
			check_invariants(&sliced.root);
		}
	}

	#[test]
	fn default_tolerance() {
		assert_eq!(DEFAULT_TOLERANCE, 2);
	}
}
