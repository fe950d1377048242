use heartwood::{
	diff,
	load::load_node,
	patcher::Config,
	Decoder, Error, EventNode, Fact, Handler, Message, Patcher, Program, TaggerFn, VNode,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

fn recorder() -> (Rc<RefCell<Vec<Message>>>, Rc<EventNode>) {
	let received = Rc::new(RefCell::new(Vec::new()));
	let root = {
		let received = Rc::clone(&received);
		EventNode::root(move |message| received.borrow_mut().push(message))
	};
	(received, root)
}

fn button(message: &str) -> VNode {
	VNode::element("button", vec![Fact::on("click", Handler::Normal(Decoder::succeed(message)))], vec![VNode::text("press")])
}

#[test]
fn messages_pass_through_taggers() {
	init_logging();
	let (received, root) = recorder();
	let outer = TaggerFn::new(|message| json!({ "outer": message }));
	let inner = TaggerFn::new(|message| json!({ "inner": message }));

	let view = VNode::element("div", None, vec![VNode::tagged(&outer, VNode::tagged(&inner, button("go")))]);
	let mut patcher = Patcher::default();
	let live = patcher.render(&view, &root);

	let outcome = live.dispatch_event(&[0], "click", &json!({})).unwrap();
	assert_eq!(outcome.delivered, 1);
	assert_eq!(*received.borrow(), vec![json!({ "outer": { "inner": "go" } })]);
}

#[test]
fn retagging_reroutes_existing_listeners() {
	init_logging();
	let (received, root) = recorder();
	let first = TaggerFn::new(|message| json!(["first", message]));
	let second = TaggerFn::new(|message| json!(["second", message]));

	let old = VNode::element("div", None, vec![VNode::tagged(&first, button("x"))]);
	let new = VNode::element("div", None, vec![VNode::tagged(&second, button("x"))]);

	let mut patcher = Patcher::default();
	let mut live = patcher.render(&old, &root);
	let button_id = live.at(&[0]).unwrap().id();
	patcher.apply_patches(&mut live, &old, &diff(&old, &new), &root);
	assert_eq!(live.at(&[0]).unwrap().id(), button_id);

	live.dispatch_event(&[0], "click", &json!(null)).unwrap();
	assert_eq!(*received.borrow(), vec![json!(["second", "x"])]);
}

#[test]
fn redraw_inside_tagger_keeps_routing() {
	let (received, root) = recorder();
	let tagger = TaggerFn::new(|message| json!({ "tagged": message }));

	let old = VNode::tagged(&tagger, VNode::text("loading"));
	let new = VNode::tagged(&tagger, button("ready"));

	let mut patcher = Patcher::default();
	let mut live = patcher.render(&old, &root);
	patcher.apply_patches(&mut live, &old, &diff(&old, &new), &root);
	live.dispatch_event(&[], "click", &json!(null)).unwrap();
	assert_eq!(*received.borrow(), vec![json!({ "tagged": "ready" })]);
}

#[test]
fn bubbling_stops_and_prevents() {
	init_logging();
	let (received, root) = recorder();
	let stop = Handler::MayStopPropagation(Decoder::field("stop", Decoder::Value));
	let view = VNode::element(
		"form",
		vec![Fact::on("click", Handler::Normal(Decoder::succeed("form")))],
		vec![VNode::element(
			"div",
			vec![Fact::on("click", stop)],
			vec![VNode::element("a", vec![Fact::on("click", Handler::MayPreventDefault(Decoder::succeed(json!(["link", true]))))], None)],
		)],
	);
	let mut patcher = Patcher::default();
	let live = patcher.render(&view, &root);

	let outcome = live.dispatch_event(&[0, 0], "click", &json!({ "stop": ["div", true] })).unwrap();
	assert!(outcome.propagation_stopped);
	assert!(outcome.default_prevented);
	assert_eq!(outcome.delivered, 2);
	assert_eq!(*received.borrow(), vec![json!("link"), json!("div")]);

	received.borrow_mut().clear();
	let outcome = live.dispatch_event(&[0, 0], "click", &json!({ "stop": ["div", false] })).unwrap();
	assert!(!outcome.propagation_stopped);
	assert_eq!(*received.borrow(), vec![json!("link"), json!("div"), json!("form")]);
}

#[test]
fn dispatch_errors() {
	let (received, root) = recorder();
	let view = VNode::element("input", vec![Fact::on("input", Handler::Normal(Decoder::at(vec!["target", "value"], Decoder::String)))], None);
	let mut patcher = Patcher::default();
	let live = patcher.render(&view, &root);

	assert!(matches!(live.dispatch_event(&[3], "input", &json!({})), Err(Error::NoSuchNode { path }) if path == vec![3]));
	assert!(matches!(live.dispatch_event(&[], "input", &json!({ "target": {} })), Err(Error::Decode(_))));
	assert_eq!(live.dispatch_event(&[], "input", &json!({ "target": { "value": "hi" } })).unwrap().delivered, 1);
	assert_eq!(live.dispatch_event(&[], "change", &json!({})).unwrap().delivered, 0);
	assert_eq!(*received.borrow(), vec![json!("hi")]);
}

#[test]
fn listener_counts_follow_facts() {
	let (_, root) = recorder();
	let with = |events: &[&str]| VNode::element("div", events.iter().map(|&name| Fact::on(name, Handler::Normal(Decoder::succeed(1)))), None);

	let mut patcher = Patcher::default();
	let old = with(&["click", "input"]);
	let mut live = patcher.render(&old, &root);
	assert_eq!((patcher.listener_count("click"), patcher.listener_count("input")), (1, 1));

	let new = with(&["click", "keydown"]);
	patcher.apply_patches(&mut live, &old, &diff(&old, &new), &root);
	assert_eq!((patcher.listener_count("click"), patcher.listener_count("input"), patcher.listener_count("keydown")), (1, 0, 1));
}

#[test]
fn dropped_event_names_are_counted_again() {
	let (_, root) = recorder();
	let with = |events: &[&str]| VNode::element("div", events.iter().map(|&name| Fact::on(name, Handler::Normal(Decoder::succeed(1)))), None);

	let mut patcher = Patcher::default();
	let first = with(&["click"]);
	let mut live = patcher.render(&first, &root);

	let second = with(&[]);
	patcher.apply_patches(&mut live, &first, &diff(&first, &second), &root);
	assert_eq!(patcher.listener_count("click"), 0);

	let third = with(&["click"]);
	patcher.apply_patches(&mut live, &second, &diff(&second, &third), &root);
	assert_eq!(patcher.listener_count("click"), 1);
	assert_eq!(live.outer_html(), "<div on:click></div>");
}

#[derive(Debug, Clone, PartialEq)]
struct Counter {
	count: i64,
}

fn counter_view(model: &Counter) -> VNode {
	VNode::element(
		"div",
		None,
		vec![
			VNode::text(model.count.to_string()),
			VNode::tagged(&TaggerFn::new(|message| json!({ "by": message })), button("1")),
		],
	)
}

fn counter_update(model: &Counter, message: Message) -> Counter {
	let by = message["by"].as_str().and_then(|by| by.parse().ok()).unwrap_or(0);
	Counter { count: model.count + by }
}

#[test]
fn program_batches_messages() {
	init_logging();
	let mut program = Program::new(Config::default(), Counter { count: 0 }, counter_update, counter_view);
	assert_eq!(program.live().outer_html(), "<div>0<button on:click>press</button></div>");

	program.dispatch_event(&[1], "click", &json!({})).unwrap();
	program.dispatch_event(&[1], "click", &json!({})).unwrap();
	program.send(json!({ "by": "5" }));
	let button_id = program.live().at(&[1]).unwrap().id();

	assert_eq!(program.run_pending(), 3);
	assert_eq!(program.model(), &Counter { count: 7 });
	assert_eq!(program.live().outer_html(), "<div>7<button on:click>press</button></div>");
	assert_eq!(program.live().at(&[1]).unwrap().id(), button_id);
	assert_eq!(program.run_pending(), 0);
}

#[test]
fn program_adopts_existing_tree() {
	init_logging();
	let (_, root) = recorder();
	let mut patcher = Patcher::default();
	let stale = VNode::element("div", vec![Fact::attribute("class", "old")], vec![VNode::text("41"), VNode::element("span", None, None)]);
	let live = patcher.render(&stale, &root);
	let root_id = live.id();
	assert_eq!(load_node(&live).descendants(), 2);

	let program = Program::adopt(patcher, live, Counter { count: 41 }, counter_update, counter_view);
	assert_eq!(program.live().id(), root_id);
	assert_eq!(program.live().outer_html(), "<div>41<button on:click>press</button></div>");
}
