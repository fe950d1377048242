//! Runs the update → view → diff → patch cycle for one application instance.

use crate::{
	diff::diff,
	live::{EventNode, EventOutcome, LiveNode},
	load::load_node,
	patcher::{Config, Patcher},
	vnode::{Message, VNode},
	Result,
};
use core::cell::RefCell;
use serde_json::Value;
use std::{collections::VecDeque, rc::Rc};
use tracing::{info, instrument, trace};

type Update<Model> = Box<dyn Fn(&Model, Message) -> Model>;
type View<Model> = Box<dyn Fn(&Model) -> VNode>;

/// Owns a model, its message queue, the current virtual tree and the live tree rendered from it.
///
/// Messages are only processed by [`Program::run_pending`], which patches the live tree once per batch.
pub struct Program<Model> {
	model: Model,
	update: Update<Model>,
	view: View<Model>,
	patcher: Patcher,
	queue: Rc<RefCell<VecDeque<Message>>>,
	root: Rc<EventNode>,
	current: VNode,
	live: LiveNode,
}

impl<Model> Program<Model> {
	/// Renders the initial view from scratch.
	pub fn new(config: Config, init: Model, update: impl Fn(&Model, Message) -> Model + 'static, view: impl Fn(&Model) -> VNode + 'static) -> Self {
		let mut patcher = Patcher::new(config);
		let (queue, root) = queue_and_root();
		let current = view(&init);
		let live = patcher.render(&current, &root);
		Self {
			model: init,
			update: Box::new(update),
			view: Box::new(view),
			patcher,
			queue,
			root,
			current,
			live,
		}
	}

	/// Takes over `live`, which must have been created with `patcher`'s document, and patches it to match the initial view.
	#[instrument(skip(patcher, live, init, update, view))]
	pub fn adopt(
		mut patcher: Patcher,
		mut live: LiveNode,
		init: Model,
		update: impl Fn(&Model, Message) -> Model + 'static,
		view: impl Fn(&Model) -> VNode + 'static,
	) -> Self {
		let (queue, root) = queue_and_root();
		let loaded = load_node(&live);
		let current = view(&init);
		let patches = diff(&loaded, &current);
		trace!(patches = patches.len(), "Adopting live tree.");
		patcher.apply_patches(&mut live, &loaded, &patches, &root);
		Self {
			model: init,
			update: Box::new(update),
			view: Box::new(view),
			patcher,
			queue,
			root,
			current,
			live,
		}
	}

	/// Queues `message` for the next [`Program::run_pending`].
	pub fn send(&self, message: Message) {
		self.queue.borrow_mut().push_back(message);
	}

	/// Fires an event at the live node at `path`. Resulting messages are queued.
	///
	/// # Errors
	///
	/// See [`LiveNode::dispatch_event`].
	pub fn dispatch_event(&self, path: &[usize], name: &str, payload: &Value) -> Result<EventOutcome> {
		self.live.dispatch_event(path, name, payload)
	}

	/// Processes all queued messages, then updates the live tree once. Returns the number of messages processed.
	#[instrument(skip(self))]
	pub fn run_pending(&mut self) -> usize {
		let mut processed = 0;
		loop {
			// The queue must not stay borrowed while `update` runs.
			let message = self.queue.borrow_mut().pop_front();
			match message {
				Some(message) => {
					self.model = (self.update)(&self.model, message);
					processed += 1;
				}
				None => break,
			}
		}
		if processed == 0 {
			return 0;
		}

		let next = (self.view)(&self.model);
		let patches = diff(&self.current, &next);
		self.patcher.apply_patches(&mut self.live, &self.current, &patches, &self.root);
		self.current = next;
		info!(messages = processed, patches = patches.len(), "Updated view.");
		processed
	}

	pub fn model(&self) -> &Model {
		&self.model
	}

	pub fn live(&self) -> &LiveNode {
		&self.live
	}

	/// The virtual tree the live tree currently matches.
	pub fn current(&self) -> &VNode {
		&self.current
	}

	pub fn patcher(&self) -> &Patcher {
		&self.patcher
	}
}

fn queue_and_root() -> (Rc<RefCell<VecDeque<Message>>>, Rc<EventNode>) {
	let queue = Rc::new(RefCell::new(VecDeque::new()));
	let root = {
		let queue = Rc::clone(&queue);
		EventNode::root(move |message| queue.borrow_mut().push_back(message))
	};
	(queue, root)
}
