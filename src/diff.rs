//! Computes patch lists between two virtual trees.

mod keyed;

use crate::{
	facts::diff_facts,
	patch::{Patch, PatchKind},
	vnode::{Node, VNode},
};
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// Returns the patches that turn the live rendering of `old` into one of `new`.
///
/// Indices are pre-order positions in `old` and never decrease along the list.
/// Diffing a tree against itself (or an equal tree) yields no patches.
#[must_use]
#[instrument(skip(old, new))]
pub fn diff(old: &VNode, new: &VNode) -> Vec<Patch> {
	let mut patches = Vec::new();
	diff_help(old, new, &mut patches, 0);
	trace!(count = patches.len(), "Diff complete.");
	patches
}

fn push(patches: &mut Vec<Patch>, index: usize, kind: PatchKind) {
	patches.push(Patch { index, kind });
}

pub(crate) fn diff_help(x: &VNode, y: &VNode, patches: &mut Vec<Patch>, index: usize) {
	if x.ptr_eq(y) {
		return;
	}

	let dekeyed;
	let y = match (&**x, &**y) {
		(Node::Element { .. }, Node::Keyed { .. }) => {
			dekeyed = y.dekey();
			&dekeyed
		}
		_ => y,
	};

	match (&**x, &**y) {
		(Node::Text(a), Node::Text(b)) => {
			if a != b {
				push(patches, index, PatchKind::UpdateText(b.clone()));
			}
		}

		(Node::Thunk { render: x_render, args: x_args, .. }, Node::Thunk { render: y_render, args: y_args, cached }) => {
			if x_render.ptr_eq(y_render) && x_args == y_args {
				trace!(index, "Reusing lazy subtree.");
				if let Some(previous) = x.cached() {
					// Fails iff `y` was forced already.
					let _ = cached.set(previous.clone());
				}
				return;
			}

			let span = trace_span!("Diffing lazy subtree", index);
			let _enter = span.enter();
			if let (Some(x_inner), Some(y_inner)) = (x.force(), y.force()) {
				let mut nested = Vec::new();
				diff_help(x_inner, y_inner, &mut nested, 0);
				if !nested.is_empty() {
					push(patches, index, PatchKind::DescendIntoThunk(nested));
				}
			}
		}

		(Node::Tagger { .. }, Node::Tagger { .. }) => {
			let (x_taggers, x_inner) = x.unwrap_taggers();
			let (y_taggers, y_inner) = y.unwrap_taggers();

			if x_taggers.len() != y_taggers.len() {
				trace!(index, old = x_taggers.len(), new = y_taggers.len(), "Tagger chain length changed.");
				return push(patches, index, PatchKind::Redraw(y.clone()));
			}

			if !x_taggers.iter().zip(&y_taggers).all(|(a, b)| a.ptr_eq(b)) {
				push(patches, index, PatchKind::RetagTagger(y_taggers.iter().map(|&tagger| tagger.clone()).collect()));
			}

			diff_help(x_inner, y_inner, patches, index + x_taggers.len());
		}

		(
			Node::Element {
				tag: x_tag,
				namespace: x_namespace,
				facts: x_facts,
				children: x_children,
				..
			},
			Node::Element {
				tag: y_tag,
				namespace: y_namespace,
				facts: y_facts,
				children: y_children,
				..
			},
		) => {
			if x_tag != y_tag || x_namespace != y_namespace {
				return push(patches, index, PatchKind::Redraw(y.clone()));
			}

			let span = trace_span!("Diffing element", tag = x_tag.as_str(), index);
			let _enter = span.enter();

			if let Some(facts_diff) = diff_facts(x_facts, y_facts) {
				push(patches, index, PatchKind::UpdateFacts(facts_diff));
			}
			diff_kids(x_children, y_children, patches, index);
		}

		(
			Node::Keyed {
				tag: x_tag,
				namespace: x_namespace,
				facts: x_facts,
				children: x_children,
				..
			},
			Node::Keyed {
				tag: y_tag,
				namespace: y_namespace,
				facts: y_facts,
				children: y_children,
				..
			},
		) => {
			if x_tag != y_tag || x_namespace != y_namespace {
				return push(patches, index, PatchKind::Redraw(y.clone()));
			}

			let span = trace_span!("Diffing keyed element", tag = x_tag.as_str(), index);
			let _enter = span.enter();

			if let Some(facts_diff) = diff_facts(x_facts, y_facts) {
				push(patches, index, PatchKind::UpdateFacts(facts_diff));
			}
			keyed::diff_keyed_kids(x_children, y_children, patches, index);
		}

		(
			Node::Custom {
				facts: x_facts,
				model: x_model,
				widget: x_widget,
			},
			Node::Custom {
				facts: y_facts,
				model: y_model,
				widget: y_widget,
			},
		) => {
			if !same_widget(x_widget, y_widget) {
				return push(patches, index, PatchKind::Redraw(y.clone()));
			}

			if let Some(facts_diff) = diff_facts(x_facts, y_facts) {
				push(patches, index, PatchKind::UpdateFacts(facts_diff));
			}
			if let Some(patch) = y_widget.diff(x_model, y_model) {
				push(patches, index, PatchKind::Custom(patch));
			}
		}

		_ => {
			trace!(index, "Node kind changed.");
			push(patches, index, PatchKind::Redraw(y.clone()));
		}
	}
}

fn same_widget<A: ?Sized, B: ?Sized>(a: &Rc<A>, b: &Rc<B>) -> bool {
	Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

fn diff_kids(x_kids: &[VNode], y_kids: &[VNode], patches: &mut Vec<Patch>, root_index: usize) {
	let (x_len, y_len) = (x_kids.len(), y_kids.len());

	if x_len > y_len {
		push(
			patches,
			root_index,
			PatchKind::RemoveTrailingChildren {
				from: y_len,
				count: x_len - y_len,
			},
		);
	} else if x_len < y_len {
		push(patches, root_index, PatchKind::AppendChildren(y_kids[x_len..].to_vec()));
	}

	let mut index = root_index;
	for (x_kid, y_kid) in x_kids.iter().zip(y_kids) {
		index += 1;
		diff_help(x_kid, y_kid, patches, index);
		index += x_kid.descendants();
	}
}
