use super::node::Node;
use core::iter::FusedIterator;

/// Borrowing in-order iterator over a [`Vector`](`super::Vector`).
pub struct Iter<'a, T> {
	stack: Vec<(&'a Node<T>, usize)>,
	remaining: usize,
}

impl<'a, T> Iter<'a, T> {
	pub(crate) fn new(root: &'a Node<T>) -> Self {
		Self {
			stack: vec![(root, 0)],
			remaining: root.len(),
		}
	}
}

impl<'a, T> Iterator for Iter<'a, T> {
	type Item = &'a T;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			let top = self.stack.last_mut()?;
			let node: &'a Node<T> = top.0;
			match node {
				Node::Leaf(items) => {
					if let Some(item) = items.get(top.1) {
						top.1 += 1;
						self.remaining -= 1;
						return Some(item);
					}
					self.stack.pop();
				}
				Node::Branch { children, .. } => {
					if let Some(child) = children.get(top.1) {
						top.1 += 1;
						let child: &'a Node<T> = child;
						self.stack.push((child, 0));
					} else {
						self.stack.pop();
					}
				}
			}
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(self.remaining, Some(self.remaining))
	}
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}
