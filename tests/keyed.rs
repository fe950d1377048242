use heartwood::{
	diff,
	patch::{InsertEntry, Reorder},
	EventNode, LiveNode, PatchKind, Patcher, VNode,
};
use std::rc::Rc;

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

fn list(keys: &[&str]) -> VNode {
	VNode::keyed("ul", None, keys.iter().map(|&key| (key, VNode::element("li", None, vec![VNode::text(key)]))))
}

fn reorder_of(patches: &[heartwood::Patch]) -> &Reorder {
	assert_eq!(patches.len(), 1, "{:?}", patches);
	match &patches[0].kind {
		PatchKind::ReorderKeyedChildren(reorder) => reorder,
		other => panic!("unexpected patch: {:?}", other),
	}
}

fn ids(live: &LiveNode) -> Vec<u64> {
	live.children().iter().map(LiveNode::id).collect()
}

fn texts(live: &LiveNode) -> Vec<String> {
	live.children().iter().map(|child| child.children()[0].text().unwrap().to_owned()).collect()
}

/// Renders `old`, patches it to `new` and checks the result against a fresh render.
fn patch(old: &VNode, new: &VNode) -> LiveNode {
	let mut patcher = Patcher::default();
	let root = EventNode::root(|_| ());
	let mut live = patcher.render(old, &root);
	patcher.apply_patches(&mut live, old, &diff(old, new), &root);
	assert_eq!(live.outer_html(), patcher.render(new, &root).outer_html());
	live
}

#[test]
fn swap_moves_one_node() {
	init_logging();
	let old = list(&["A", "B", "C"]);
	let new = list(&["B", "A", "C"]);

	let patches = diff(&old, &new);
	let reorder = reorder_of(&patches);
	assert_eq!(reorder.patches.len(), 1);
	assert!(matches!(reorder.patches[0].kind, PatchKind::RemoveChild(Some(_))));
	assert_eq!(reorder.inserts.len(), 1);
	assert_eq!(reorder.inserts[0].index, 0);
	assert!(matches!(reorder.inserts[0].entry, InsertEntry::Move(_)));
	assert!(reorder.trailing_inserts.is_empty());

	let mut patcher = Patcher::default();
	let root = EventNode::root(|_| ());
	let mut live = patcher.render(&old, &root);
	let [a, b, c] = match ids(&live)[..] {
		[a, b, c] => [a, b, c],
		_ => unreachable!(),
	};
	patcher.apply_patches(&mut live, &old, &patches, &root);
	assert_eq!(texts(&live), vec!["B", "A", "C"]);
	assert_eq!(ids(&live), vec![b, a, c]);
}

#[test]
fn insertion_keeps_neighbours() {
	init_logging();
	let old = list(&["A", "C"]);
	let new = list(&["A", "B", "C"]);

	let patches = diff(&old, &new);
	let reorder = reorder_of(&patches);
	assert!(reorder.patches.is_empty());
	assert_eq!(reorder.inserts.len(), 1);
	assert_eq!(reorder.inserts[0].index, 1);
	assert!(matches!(reorder.inserts[0].entry, InsertEntry::Render(_)));

	let mut patcher = Patcher::default();
	let root = EventNode::root(|_| ());
	let mut live = patcher.render(&old, &root);
	let before = ids(&live);
	patcher.apply_patches(&mut live, &old, &patches, &root);
	assert_eq!(texts(&live), vec!["A", "B", "C"]);
	let after = ids(&live);
	assert_eq!((after[0], after[2]), (before[0], before[1]));
}

#[test]
fn removal_and_replacement() {
	init_logging();
	for (old, new) in &[
		(&["A", "B", "C"][..], &["A", "C"][..]),
		(&["A", "B", "C"][..], &["A", "X", "C"][..]),
		(&["A", "B"][..], &[][..]),
		(&[][..], &["A", "B"][..]),
	] {
		let live = patch(&list(old), &list(new));
		assert_eq!(texts(&live), new.to_vec());
	}
}

#[test]
fn fallback_moves_tail_nodes() {
	init_logging();
	let old = list(&["A", "B", "C", "D"]);
	let new = list(&["D", "C", "B", "A", "E"]);

	let mut patcher = Patcher::default();
	let root = EventNode::root(|_| ());
	let mut live = patcher.render(&old, &root);
	let before = ids(&live);
	let patches = diff(&old, &new);
	let reorder = reorder_of(&patches);
	assert_eq!(reorder.trailing_inserts.len(), 5);

	patcher.apply_patches(&mut live, &old, &patches, &root);
	assert_eq!(texts(&live), vec!["D", "C", "B", "A", "E"]);
	let after = ids(&live);
	assert_eq!(&after[..4], &[before[3], before[2], before[1], before[0]]);
}

#[test]
fn moved_nodes_are_patched() {
	init_logging();
	let old = VNode::keyed("ul", None, vec![("a", VNode::text("1")), ("b", VNode::text("2"))]);
	let new = VNode::keyed("ul", None, vec![("b", VNode::text("two")), ("a", VNode::text("1"))]);
	let live = patch(&old, &new);
	assert_eq!(live.outer_html(), "<ul>two1</ul>");
}

#[test]
fn duplicate_keys_are_distinct() {
	init_logging();
	let live = patch(&list(&["A", "A", "B"]), &list(&["B", "A", "A", "A"]));
	assert_eq!(texts(&live), vec!["B", "A", "A", "A"]);

	let old = list(&["A", "A", "B"]);
	let new = list(&["B"]);
	let patches = diff(&old, &new);
	let reorder = reorder_of(&patches);
	assert_eq!(reorder.patches.len(), 3);
	assert_eq!(reorder.patches.iter().filter(|patch| matches!(patch.kind, PatchKind::RemoveChild(None))).count(), 2);

	let mut patcher = Patcher::default();
	let root = EventNode::root(|_| ());
	let mut live = patcher.render(&old, &root);
	let b = ids(&live)[2];
	patcher.apply_patches(&mut live, &old, &patches, &root);
	assert_eq!(ids(&live), vec![b]);
}

#[test]
fn listeners_survive_moves() {
	use heartwood::{Decoder, Fact, Handler};
	use serde_json::json;
	use std::cell::RefCell;

	let received = Rc::new(RefCell::new(Vec::new()));
	let root = {
		let received = Rc::clone(&received);
		EventNode::root(move |message| received.borrow_mut().push(message))
	};
	let item = |key: &'static str| (key, VNode::element("li", vec![Fact::on("click", Handler::Normal(Decoder::succeed(key)))], vec![VNode::text(key)]));
	let old = VNode::keyed("ul", None, vec![item("A"), item("B"), item("C")]);
	let new = VNode::keyed("ul", None, vec![item("B"), item("A"), item("C")]);

	let mut patcher = Patcher::default();
	let mut live = patcher.render(&old, &root);
	assert_eq!(patcher.listener_count("click"), 3);
	patcher.apply_patches(&mut live, &old, &diff(&old, &new), &root);
	assert_eq!(patcher.listener_count("click"), 3);

	live.dispatch_event(&[0], "click", &json!({})).unwrap();
	assert_eq!(*received.borrow(), vec![json!("B")]);
}
