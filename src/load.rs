//! Reconstructs virtual trees from existing live trees, so that they can be adopted and patched.
//!
//! Only structure, text, attributes, styles and properties are read back. Listeners are not.

use crate::{
	facts::{Fact, NsAttribute},
	live::{LiveElement, LiveKind, LiveNode},
	vnode::VNode,
};

pub fn load_node(live: &LiveNode) -> VNode {
	match &live.kind {
		LiveKind::Text(text) => VNode::text(text.clone()),
		LiveKind::Element(element) => load_element(element),
	}
}

pub fn load_element(element: &LiveElement) -> VNode {
	let children = load_child_nodes(&element.children);
	match &element.namespace {
		Some(namespace) => VNode::element_ns(namespace.clone(), element.tag.clone(), load_facts(element), children),
		None => VNode::element(element.tag.clone(), load_facts(element), children),
	}
}

pub fn load_child_nodes(children: &[LiveNode]) -> Vec<VNode> {
	children.iter().map(load_node).collect()
}

pub fn load_facts(element: &LiveElement) -> Vec<Fact> {
	let properties = element.properties.iter().map(|(key, value)| Fact::property(key.clone(), value.clone()));
	let attributes = element.attributes.iter().map(|(key, value)| Fact::attribute(key.clone(), value.clone()));
	let attributes_ns = element
		.attributes_ns
		.iter()
		.map(|(key, NsAttribute { namespace, value })| Fact::attribute_ns(namespace.clone(), key.clone(), value.clone()));
	let styles = element.styles.iter().map(|(key, value)| Fact::style(key.clone(), value.clone()));
	properties.chain(attributes).chain(attributes_ns).chain(styles).collect()
}
