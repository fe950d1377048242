use std::sync::Arc;

pub(crate) const BITS: usize = 5;
/// Branching factor.
pub(crate) const M: usize = 1 << BITS;

/// A node of the RRB-tree.
///
/// Nodes are never mutated once they are reachable from a [`Vector`](`super::Vector`) root.
/// All "mutations" in this module operate on fresh copies.
#[derive(Clone)]
pub(crate) enum Node<T> {
	Leaf(Vec<T>),
	Branch {
		height: usize,
		children: Vec<Arc<Node<T>>>,
		/// Cumulative element counts: `lengths[i]` is the number of elements in `children[..=i]`.
		lengths: Vec<usize>,
	},
}

impl<T> Node<T> {
	pub(crate) fn empty_at(height: usize) -> Self {
		if height == 0 {
			Node::Leaf(Vec::new())
		} else {
			Node::Branch {
				height,
				children: Vec::new(),
				lengths: Vec::new(),
			}
		}
	}

	pub(crate) fn height(&self) -> usize {
		match self {
			Node::Leaf(_) => 0,
			Node::Branch { height, .. } => *height,
		}
	}

	pub(crate) fn len(&self) -> usize {
		match self {
			Node::Leaf(items) => items.len(),
			Node::Branch { lengths, .. } => lengths.last().copied().unwrap_or(0),
		}
	}

	/// Number of occupied entries in this node's table.
	pub(crate) fn slots(&self) -> usize {
		match self {
			Node::Leaf(items) => items.len(),
			Node::Branch { children, .. } => children.len(),
		}
	}

	pub(crate) fn children(&self) -> &[Arc<Node<T>>] {
		match self {
			Node::Leaf(_) => &[],
			Node::Branch { children, .. } => children,
		}
	}

	/// Builds a branch at `height` from `children`, computing the length table.
	pub(crate) fn from_children(height: usize, children: Vec<Arc<Node<T>>>) -> Self {
		debug_assert!(height > 0);
		debug_assert!(children.iter().all(|child| child.height() + 1 == height));
		let mut total = 0;
		let lengths = children
			.iter()
			.map(|child| {
				total += child.len();
				total
			})
			.collect();
		Node::Branch { height, children, lengths }
	}

	/// A minimal right spine of `height` containing only `value`.
	pub(crate) fn single(value: T, height: usize) -> Self {
		if height == 0 {
			Node::Leaf(vec![value])
		} else {
			Node::Branch {
				height,
				children: vec![Arc::new(Node::single(value, height - 1))],
				lengths: vec![1],
			}
		}
	}

	/// Wraps `child` in a parent one level higher. An empty child yields an empty parent.
	pub(crate) fn wrap(child: Arc<Node<T>>) -> Self {
		let height = child.height() + 1;
		if child.slots() == 0 {
			Node::empty_at(height)
		} else {
			Node::Branch {
				height,
				lengths: vec![child.len()],
				children: vec![child],
			}
		}
	}

	/// Makes two equally tall trees siblings under a new root.
	pub(crate) fn siblise(a: Arc<Node<T>>, b: Arc<Node<T>>) -> Self {
		debug_assert_eq!(a.height(), b.height());
		Node::Branch {
			height: a.height() + 1,
			lengths: vec![a.len(), a.len() + b.len()],
			children: vec![a, b],
		}
	}

	/// Finds the child containing element `i` of this branch.
	///
	/// The radix guess `i >> (BITS * height)` never overshoots, since no child holds more than `M^height` elements.
	/// Relaxed children may hold fewer, which the forward scan corrects.
	pub(crate) fn slot_for(&self, i: usize) -> usize {
		match self {
			Node::Leaf(_) => i,
			Node::Branch { height, lengths, .. } => {
				#[allow(clippy::cast_possible_truncation)]
				let mut slot = i.checked_shr((BITS * height) as u32).unwrap_or(0);
				while lengths[slot] <= i {
					slot += 1;
				}
				slot
			}
		}
	}

	/// Offset of the first element of `children[slot]`.
	pub(crate) fn offset_of(&self, slot: usize) -> usize {
		match self {
			Node::Branch { lengths, .. } if slot > 0 => lengths[slot - 1],
			_ => 0,
		}
	}

	/// Unchecked lookup, `i` must be less than [`Node::len`].
	pub(crate) fn get(&self, mut i: usize) -> &T {
		let mut node = self;
		loop {
			match node {
				Node::Leaf(items) => return &items[i],
				Node::Branch { children, .. } => {
					let slot = node.slot_for(i);
					i -= node.offset_of(slot);
					node = &children[slot];
				}
			}
		}
	}

	pub(crate) fn push_child(&mut self, child: Arc<Node<T>>) {
		match self {
			Node::Leaf(_) => unreachable!("leaves have no children"),
			Node::Branch { children, lengths, .. } => {
				lengths.push(lengths.last().copied().unwrap_or(0) + child.len());
				children.push(child);
			}
		}
	}

	/// Replaces the right-most child. An empty `child` removes the slot instead.
	pub(crate) fn replace_last(&mut self, child: Arc<Node<T>>) {
		if let Node::Branch { children, lengths, .. } = self {
			children.pop();
			lengths.pop();
			if child.slots() > 0 {
				self.push_child(child);
			}
		}
	}

	/// Replaces the left-most child. An empty `child` removes the slot instead.
	pub(crate) fn replace_first(&mut self, child: Arc<Node<T>>) {
		if let Node::Branch { height, children, .. } = self {
			let mut rest = if child.slots() > 0 { vec![child] } else { Vec::new() };
			rest.extend(children.drain(..).skip(1));
			*self = Node::from_children(*height, rest);
		}
	}

	pub(crate) fn for_each<F: FnMut(&T)>(&self, f: &mut F) {
		match self {
			Node::Leaf(items) => items.iter().for_each(|item| f(item)),
			Node::Branch { children, .. } => children.iter().for_each(|child| child.for_each(f)),
		}
	}

	pub(crate) fn foldl<B, F: FnMut(B, &T) -> B>(&self, mut acc: B, f: &mut F) -> B {
		match self {
			Node::Leaf(items) => {
				for item in items {
					acc = f(acc, item);
				}
				acc
			}
			Node::Branch { children, .. } => {
				for child in children {
					acc = child.foldl(acc, f);
				}
				acc
			}
		}
	}

	pub(crate) fn foldr<B, F: FnMut(&T, B) -> B>(&self, mut acc: B, f: &mut F) -> B {
		match self {
			Node::Leaf(items) => {
				for item in items.iter().rev() {
					acc = f(item, acc);
				}
				acc
			}
			Node::Branch { children, .. } => {
				for child in children.iter().rev() {
					acc = child.foldr(acc, f);
				}
				acc
			}
		}
	}

	/// Maps every element while keeping the tree's shape, including its length tables.
	pub(crate) fn map<U, F: FnMut(usize, &T) -> U>(&self, from: usize, f: &mut F) -> Node<U> {
		match self {
			Node::Leaf(items) => Node::Leaf(items.iter().enumerate().map(|(i, item)| f(from + i, item)).collect()),
			Node::Branch { height, children, lengths } => Node::Branch {
				height: *height,
				children: children
					.iter()
					.enumerate()
					.map(|(slot, child)| Arc::new(child.map(from + self.offset_of(slot), f)))
					.collect(),
				lengths: lengths.clone(),
			},
		}
	}
}

impl<T: Clone> Node<T> {
	/// Appends the entries `source[from..to]` to this node's table.
	///
	/// Both nodes must have the same height.
	pub(crate) fn extend_from(&mut self, source: &Node<T>, from: usize, to: usize) {
		match (self, source) {
			(Node::Leaf(items), Node::Leaf(source)) => items.extend_from_slice(&source[from..to]),
			(this @ Node::Branch { .. }, Node::Branch { children, .. }) => {
				for child in &children[from..to] {
					this.push_child(Arc::clone(child));
				}
			}
			_ => unreachable!("height mismatch while moving slots"),
		}
	}

	/// Path-copying update of element `i`, which must be in range.
	pub(crate) fn set(&self, i: usize, value: T) -> Node<T> {
		match self {
			Node::Leaf(items) => {
				let mut items = items.clone();
				items[i] = value;
				Node::Leaf(items)
			}
			Node::Branch { height, children, lengths } => {
				let slot = self.slot_for(i);
				let updated = children[slot].set(i - self.offset_of(slot), value);
				let mut children = children.clone();
				children[slot] = Arc::new(updated);
				Node::Branch {
					height: *height,
					children,
					lengths: lengths.clone(),
				}
			}
		}
	}

	/// Pushes into the right-most leaf with spare capacity, or into a new minimal right spine
	/// below the lowest non-full node. Hands `value` back if the whole right spine is full.
	pub(crate) fn push(&self, value: T) -> Result<Node<T>, T> {
		match self {
			Node::Leaf(items) => {
				if items.len() < M {
					let mut items = items.clone();
					items.push(value);
					Ok(Node::Leaf(items))
				} else {
					Err(value)
				}
			}
			Node::Branch { height, children, .. } => {
				let value = match children.last() {
					Some(last) => match last.push(value) {
						Ok(pushed) => {
							let mut copy = self.clone();
							copy.replace_last(Arc::new(pushed));
							return Ok(copy);
						}
						Err(value) => value,
					},
					None => value,
				};

				if children.len() < M {
					let mut copy = self.clone();
					copy.push_child(Arc::new(Node::single(value, height - 1)));
					Ok(copy)
				} else {
					Err(value)
				}
			}
		}
	}
}
