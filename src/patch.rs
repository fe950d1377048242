//! Patches produced by [`diff`](`crate::diff::diff`) and consumed by the [`Patcher`](`crate::patcher::Patcher`).

use crate::{
	facts::FactsDiff,
	vnode::{CustomPatch, TaggerFn, VNode},
};
use core::fmt::{self, Debug, Formatter};

/// A change to the node at pre-order `index` of the old tree.
///
/// Taggers count as nodes. Thunks and custom nodes are leaves; changes inside a thunk are nested in
/// [`PatchKind::DescendIntoThunk`] with indices relative to the thunk's content.
#[derive(Debug, Clone)]
pub struct Patch {
	pub index: usize,
	pub kind: PatchKind,
}

#[derive(Clone)]
pub enum PatchKind {
	/// Replace the node with a fresh render.
	Redraw(VNode),
	UpdateFacts(FactsDiff),
	UpdateText(String),
	DescendIntoThunk(Vec<Patch>),
	/// New tagger chain, outermost first.
	RetagTagger(Vec<TaggerFn>),
	RemoveTrailingChildren { from: usize, count: usize },
	AppendChildren(Vec<VNode>),
	/// Only valid inside a [`Reorder`]. A [`Move`] keeps the live node for a later [`InsertEntry::Move`].
	RemoveChild(Option<Move>),
	ReorderKeyedChildren(Reorder),
	Custom(CustomPatch),
}

impl Debug for PatchKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			PatchKind::Redraw(vnode) => f.debug_tuple("Redraw").field(vnode).finish(),
			PatchKind::UpdateFacts(diff) => f.debug_tuple("UpdateFacts").field(diff).finish(),
			PatchKind::UpdateText(text) => f.debug_tuple("UpdateText").field(text).finish(),
			PatchKind::DescendIntoThunk(patches) => f.debug_tuple("DescendIntoThunk").field(patches).finish(),
			PatchKind::RetagTagger(taggers) => f.debug_tuple("RetagTagger").field(taggers).finish(),
			PatchKind::RemoveTrailingChildren { from, count } => f.debug_struct("RemoveTrailingChildren").field("from", from).field("count", count).finish(),
			PatchKind::AppendChildren(children) => f.debug_tuple("AppendChildren").field(children).finish(),
			PatchKind::RemoveChild(moved) => f.debug_tuple("RemoveChild").field(moved).finish(),
			PatchKind::ReorderKeyedChildren(reorder) => f.debug_tuple("ReorderKeyedChildren").field(reorder).finish(),
			PatchKind::Custom(_) => f.write_str("Custom(..)"),
		}
	}
}

/// The removal half of a keyed move.
#[derive(Debug, Clone)]
pub struct Move {
	/// Matches an [`InsertEntry::Move`] in the same [`Reorder`].
	pub id: usize,
	/// Changes to the moved node, with absolute indices based on its old position.
	pub patches: Vec<Patch>,
}

/// Keyed reconciliation of one element's children.
#[derive(Debug, Clone, Default)]
pub struct Reorder {
	/// Changes to old children in place, and their removals, in old pre-order.
	pub patches: Vec<Patch>,
	/// Insertions by index in the new child list, ascending.
	pub inserts: Vec<Insert>,
	/// Appended after all other children, in order.
	pub trailing_inserts: Vec<InsertEntry>,
}

#[derive(Debug, Clone)]
pub struct Insert {
	pub index: usize,
	pub entry: InsertEntry,
}

#[derive(Debug, Clone)]
pub enum InsertEntry {
	Render(VNode),
	Move(usize),
}

/// Checks that patch indices never decrease, including within nested lists.
#[must_use]
pub fn is_ordered(patches: &[Patch]) -> bool {
	patches.windows(2).all(|pair| pair[0].index <= pair[1].index)
		&& patches.iter().all(|patch| match &patch.kind {
			PatchKind::DescendIntoThunk(nested) => is_ordered(nested),
			PatchKind::RemoveChild(Some(moved)) => is_ordered(&moved.patches),
			PatchKind::ReorderKeyedChildren(reorder) => {
				is_ordered(&reorder.patches) && reorder.inserts.windows(2).all(|pair| pair[0].index <= pair[1].index)
			}
			_ => true,
		})
}
