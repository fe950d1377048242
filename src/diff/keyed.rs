//! Keyed child reconciliation.
//!
//! Both child lists are walked in lockstep, looking one entry ahead on each side to recognise a swap, an insertion,
//! a removal or a replacement. Anything more involved stops the walk: the rest of the old list is removed and the rest
//! of the new list is appended. A removal and an insertion of the same key become a move, which keeps the live node.

use super::{diff_help, push};
use crate::{
	patch::{Insert, InsertEntry, Move, Patch, PatchKind, Reorder},
	vnode::VNode,
};
use hashbrown::HashMap;
use tracing::{trace, warn};

/// Appended to a key that was already seen, so that duplicates are reconciled as distinct entries.
const DUPLICATE_MARKER: char = '\u{0}';

enum Slot {
	Positional(usize),
	Trailing(usize),
}

enum Change {
	Inserted { vnode: VNode, slot: Slot },
	Removed { vnode: VNode, index: usize, patch: usize },
	Moved,
}

#[derive(Default)]
struct Reconciler {
	changes: HashMap<String, Change>,
	local: Vec<Patch>,
	inserts: Vec<Insert>,
	trailing: Vec<InsertEntry>,
	moves: usize,
}

impl Reconciler {
	fn next_move(&mut self) -> usize {
		self.moves += 1;
		self.moves - 1
	}

	fn push_insert(&mut self, y_index: Option<usize>, entry: InsertEntry) -> Slot {
		match y_index {
			Some(index) => {
				self.inserts.push(Insert { index, entry });
				Slot::Positional(self.inserts.len() - 1)
			}
			None => {
				self.trailing.push(entry);
				Slot::Trailing(self.trailing.len() - 1)
			}
		}
	}

	/// Records that `vnode` appears under `key` at `y_index` of the new list ([`None`] for the tail).
	fn insert_node(&mut self, key: &str, vnode: &VNode, y_index: Option<usize>) {
		let mut key = key.to_owned();
		loop {
			match self.changes.remove(&key) {
				None => {
					let slot = self.push_insert(y_index, InsertEntry::Render(vnode.clone()));
					self.changes.insert(key, Change::Inserted { vnode: vnode.clone(), slot });
					return;
				}
				Some(Change::Removed { vnode: old, index, patch }) => {
					let id = self.next_move();
					self.push_insert(y_index, InsertEntry::Move(id));
					let mut patches = Vec::new();
					diff_help(&old, vnode, &mut patches, index);
					self.local[patch].kind = PatchKind::RemoveChild(Some(Move { id, patches }));
					self.changes.insert(key, Change::Moved);
					return;
				}
				Some(other) => {
					self.changes.insert(key.clone(), other);
					duplicate(&key);
					key.push(DUPLICATE_MARKER);
				}
			}
		}
	}

	/// Records that the old child `vnode` under `key`, at pre-order `index`, is gone from its position.
	fn remove_node(&mut self, key: &str, vnode: &VNode, index: usize) {
		let mut key = key.to_owned();
		loop {
			match self.changes.remove(&key) {
				None => {
					let patch = self.local.len();
					push(&mut self.local, index, PatchKind::RemoveChild(None));
					self.changes.insert(
						key,
						Change::Removed {
							vnode: vnode.clone(),
							index,
							patch,
						},
					);
					return;
				}
				Some(Change::Inserted { vnode: new, slot }) => {
					let id = self.next_move();
					let mut patches = Vec::new();
					diff_help(vnode, &new, &mut patches, index);
					push(&mut self.local, index, PatchKind::RemoveChild(Some(Move { id, patches })));
					match slot {
						Slot::Positional(i) => self.inserts[i].entry = InsertEntry::Move(id),
						Slot::Trailing(i) => self.trailing[i] = InsertEntry::Move(id),
					}
					self.changes.insert(key, Change::Moved);
					return;
				}
				Some(other) => {
					self.changes.insert(key.clone(), other);
					duplicate(&key);
					key.push(DUPLICATE_MARKER);
				}
			}
		}
	}
}

fn duplicate(key: &str) {
	#[cfg(feature = "dangerous-logging")]
	warn!(key, "Duplicate key. Treating it as a distinct entry.");
	#[cfg(not(feature = "dangerous-logging"))]
	{
		let _ = key;
		warn!("Duplicate key. Treating it as a distinct entry.");
	}
}

#[allow(clippy::too_many_lines)]
pub(super) fn diff_keyed_kids(x_kids: &[(String, VNode)], y_kids: &[(String, VNode)], patches: &mut Vec<Patch>, root_index: usize) {
	let mut r = Reconciler::default();
	let (x_len, y_len) = (x_kids.len(), y_kids.len());
	let (mut x_index, mut y_index) = (0, 0);
	let mut index = root_index;

	while x_index < x_len && y_index < y_len {
		let (x_key, x_node) = &x_kids[x_index];
		let (y_key, y_node) = &y_kids[y_index];

		if x_key == y_key {
			index += 1;
			diff_help(x_node, y_node, &mut r.local, index);
			index += x_node.descendants();

			x_index += 1;
			y_index += 1;
			continue;
		}

		let x_next = x_kids.get(x_index + 1);
		let y_next = y_kids.get(y_index + 1);
		let old_match = x_next.map_or(false, |(x_next_key, _)| x_next_key == y_key);
		let new_match = y_next.map_or(false, |(y_next_key, _)| y_next_key == x_key);

		match (x_next, y_next) {
			// Swap.
			(Some((x_next_key, x_next_node)), Some((_, y_next_node))) if old_match && new_match => {
				index += 1;
				diff_help(x_node, y_next_node, &mut r.local, index);
				r.insert_node(y_key, y_node, Some(y_index));
				index += x_node.descendants();

				index += 1;
				r.remove_node(x_next_key, x_next_node, index);
				index += x_next_node.descendants();

				x_index += 2;
				y_index += 2;
			}

			// Insertion.
			(_, Some((_, y_next_node))) if new_match => {
				index += 1;
				r.insert_node(y_key, y_node, Some(y_index));
				diff_help(x_node, y_next_node, &mut r.local, index);
				index += x_node.descendants();

				x_index += 1;
				y_index += 2;
			}

			// Removal.
			(Some((_, x_next_node)), _) if old_match => {
				index += 1;
				r.remove_node(x_key, x_node, index);
				index += x_node.descendants();

				index += 1;
				diff_help(x_next_node, y_node, &mut r.local, index);
				index += x_next_node.descendants();

				x_index += 2;
				y_index += 1;
			}

			// Replacement.
			(Some((x_next_key, x_next_node)), Some((y_next_key, y_next_node))) if x_next_key == y_next_key => {
				index += 1;
				r.remove_node(x_key, x_node, index);
				r.insert_node(y_key, y_node, Some(y_index));
				index += x_node.descendants();

				index += 1;
				diff_help(x_next_node, y_next_node, &mut r.local, index);
				index += x_next_node.descendants();

				x_index += 2;
				y_index += 2;
			}

			_ => {
				trace!(x_index, y_index, "No local match. Falling back to removal and insertion.");
				break;
			}
		}
	}

	for (x_key, x_node) in &x_kids[x_index..] {
		index += 1;
		r.remove_node(x_key, x_node, index);
		index += x_node.descendants();
	}

	for (y_key, y_node) in &y_kids[y_index..] {
		r.insert_node(y_key, y_node, None);
	}

	if !r.local.is_empty() || !r.inserts.is_empty() || !r.trailing.is_empty() {
		push(
			patches,
			root_index,
			PatchKind::ReorderKeyedChildren(Reorder {
				patches: r.local,
				inserts: r.inserts,
				trailing_inserts: r.trailing,
			}),
		);
	}
}
