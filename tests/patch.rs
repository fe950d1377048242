use heartwood::{
	diff,
	live::{Document, LiveNode},
	patch::is_ordered,
	patcher::Config,
	vnode::{CustomPatch, RenderFn, Widget},
	Decoder, EventNode, Fact, Handler, Patcher, TaggerFn, VNode,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::rc::Rc;

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

struct Badge;
impl Widget for Badge {
	fn render(&self, model: &Value, document: &Document) -> LiveNode {
		let mut node = document.create_element("badge");
		if let Some(element) = node.element_mut() {
			element.attributes.insert("value".to_owned(), model.to_string());
		}
		node
	}

	fn diff(&self, old: &Value, new: &Value) -> Option<CustomPatch> {
		if old == new {
			return None;
		}
		let value = new.to_string();
		Some(Rc::new(move |live: &mut LiveNode, _: &Document| {
			if let Some(element) = live.element_mut() {
				element.attributes.insert("value".to_owned(), value.clone());
			}
		}))
	}
}

/// Plain data describing a view, so that proptest can generate and shrink it.
#[derive(Debug, Clone)]
enum Shape {
	Text(&'static str),
	Element { tag: &'static str, facts: Vec<(u8, u8)>, children: Vec<Shape> },
	Keyed { children: Vec<(u8, Shape)> },
	Tagged(usize, Box<Shape>),
	Lazy(u8),
	Custom(u8),
}

struct Kit {
	taggers: [TaggerFn; 2],
	render: RenderFn,
	widget: Rc<dyn Widget>,
}

impl Kit {
	fn new() -> Self {
		Self {
			taggers: [TaggerFn::new(|message| json!({ "first": message })), TaggerFn::new(|message| json!({ "second": message }))],
			render: RenderFn::new(|args| VNode::element("lazy", None, vec![VNode::text(args[0].to_string())])),
			widget: Rc::new(Badge),
		}
	}

	fn build(&self, shape: &Shape) -> VNode {
		match shape {
			Shape::Text(text) => VNode::text(*text),
			Shape::Element { tag, facts, children } => VNode::element(*tag, facts.iter().map(|&(key, value)| fact(key, value)), children.iter().map(|child| self.build(child))),
			Shape::Keyed { children } => VNode::keyed("ol", None, children.iter().map(|(key, child)| (key.to_string(), self.build(child)))),
			Shape::Tagged(tagger, inner) => VNode::tagged(&self.taggers[*tagger], self.build(inner)),
			Shape::Lazy(arg) => VNode::lazy(&self.render, vec![json!(arg)]),
			Shape::Custom(model) => VNode::custom(None, json!(model), Rc::clone(&self.widget)),
		}
	}
}

fn fact(key: u8, value: u8) -> Fact {
	match key {
		0 => Fact::attribute("title", value.to_string()),
		1 => Fact::style("color", value.to_string()),
		2 => Fact::property("value", value),
		_ => Fact::on("click", Handler::Normal(Decoder::succeed(value))),
	}
}

fn shape() -> impl Strategy<Value = Shape> {
	let leaf = prop_oneof![
		prop::sample::select(vec!["", "a", "b", "ab"]).prop_map(Shape::Text),
		(0_u8..3).prop_map(Shape::Lazy),
		(0_u8..3).prop_map(Shape::Custom),
	];
	leaf.prop_recursive(4, 48, 5, |inner| {
		prop_oneof![
			(
				prop::sample::select(vec!["div", "span", "p"]),
				prop::collection::vec((0_u8..4, 0_u8..3), 0..3),
				prop::collection::vec(inner.clone(), 0..5),
			)
				.prop_map(|(tag, facts, children)| Shape::Element { tag, facts, children }),
			prop::collection::vec((0_u8..6, inner.clone()), 0..6).prop_map(|children| Shape::Keyed { children }),
			(0_usize..2, inner).prop_map(|(tagger, inner)| Shape::Tagged(tagger, Box::new(inner))),
		]
	})
}

fn check(kit: &Kit, old: &Shape, new: &Shape) -> Result<(), TestCaseError> {
	let (old, new) = (kit.build(old), kit.build(new));
	let root = EventNode::root(|_| ());

	let mut patcher = Patcher::default();
	let mut live = patcher.render(&old, &root);
	let patches = diff(&old, &new);
	prop_assert!(is_ordered(&patches));
	patcher.apply_patches(&mut live, &old, &patches, &root);

	let mut fresh = Patcher::default();
	let expected = fresh.render(&new, &root);
	prop_assert_eq!(live.outer_html(), expected.outer_html());
	prop_assert_eq!(patcher.listener_count("click"), fresh.listener_count("click"));
	Ok(())
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(512))]

	#[test]
	fn patched_tree_matches_fresh_render(old in shape(), new in shape()) {
		init_logging();
		check(&Kit::new(), &old, &new)?;
	}

	#[test]
	fn patching_to_itself_changes_nothing(tree in shape()) {
		let kit = Kit::new();
		let (a, b) = (kit.build(&tree), kit.build(&tree));
		prop_assert!(diff(&a, &b).is_empty());
	}
}

#[test]
fn repeated_updates_stay_in_sync() {
	init_logging();
	let kit = Kit::new();
	let root = EventNode::root(|_| ());
	let mut patcher = Patcher::default();

	let steps = [
		Shape::Keyed {
			children: vec![(1, Shape::Text("a")), (2, Shape::Lazy(1)), (3, Shape::Custom(0))],
		},
		Shape::Keyed {
			children: vec![(3, Shape::Custom(1)), (1, Shape::Text("b")), (2, Shape::Lazy(1))],
		},
		Shape::Keyed {
			children: vec![(2, Shape::Lazy(2)), (4, Shape::Tagged(0, Box::new(Shape::Text("c"))))],
		},
		Shape::Element {
			tag: "div",
			facts: vec![(3, 1)],
			children: vec![Shape::Tagged(1, Box::new(Shape::Tagged(0, Box::new(Shape::Text("d")))))],
		},
	];

	let mut current = kit.build(&steps[0]);
	let mut live = patcher.render(&current, &root);
	for step in &steps[1..] {
		let next = kit.build(step);
		patcher.apply_patches(&mut live, &current, &diff(&current, &next), &root);
		assert_eq!(live.outer_html(), Patcher::default().render(&next, &root).outer_html());
		current = next;
	}
	assert_eq!(patcher.listener_count("click"), 1);
}

#[test]
fn depth_limit_truncates_rendering() {
	let mut patcher = Patcher::new(Config { depth_limit: 2 });
	let root = EventNode::root(|_| ());
	let tree = VNode::element("a", None, vec![VNode::element("b", None, vec![VNode::element("c", None, None)])]);
	assert_eq!(patcher.render(&tree, &root).outer_html(), "<a><b></b></a>");
}
