//! Element facts: properties, attributes, namespaced attributes, styles and event handlers.

use crate::codec::Handler;
use serde_json::Value;
use std::collections::BTreeMap;

/// A single fact as written in a view, before organisation.
#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
	Property(String, Value),
	Attribute(String, String),
	AttributeNs { namespace: String, key: String, value: String },
	Style(String, String),
	Event(String, Handler),
}

impl Fact {
	pub fn property(key: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Property(key.into(), value.into())
	}

	pub fn attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Attribute(key.into(), value.into())
	}

	pub fn attribute_ns(namespace: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::AttributeNs {
			namespace: namespace.into(),
			key: key.into(),
			value: value.into(),
		}
	}

	pub fn style(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Style(key.into(), value.into())
	}

	pub fn on(event: impl Into<String>, handler: Handler) -> Self {
		Self::Event(event.into(), handler)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsAttribute {
	pub namespace: String,
	pub value: String,
}

/// Facts organised by category. Keys are unique within each category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
	pub properties: BTreeMap<String, Value>,
	pub attributes: BTreeMap<String, String>,
	pub attributes_ns: BTreeMap<String, NsAttribute>,
	pub styles: BTreeMap<String, String>,
	pub events: BTreeMap<String, Handler>,
}

impl Facts {
	/// Sorts `facts` into their categories.
	///
	/// Later facts replace earlier ones with the same key, except that `class` attributes and `className` properties
	/// are joined with spaces.
	pub fn organize(facts: impl IntoIterator<Item = Fact>) -> Self {
		let mut organized = Self::default();
		for fact in facts {
			match fact {
				Fact::Property(key, value) => {
					if key == "className" {
						if let (Some(Value::String(existing)), Value::String(added)) = (organized.properties.get_mut(&key), &value) {
							existing.push(' ');
							existing.push_str(added);
							continue;
						}
					}
					organized.properties.insert(key, value);
				}
				Fact::Attribute(key, value) => {
					if key == "class" {
						if let Some(existing) = organized.attributes.get_mut(&key) {
							existing.push(' ');
							existing.push_str(&value);
							continue;
						}
					}
					organized.attributes.insert(key, value);
				}
				Fact::AttributeNs { namespace, key, value } => {
					organized.attributes_ns.insert(key, NsAttribute { namespace, value });
				}
				Fact::Style(key, value) => {
					organized.styles.insert(key, value);
				}
				Fact::Event(key, handler) => {
					organized.events.insert(key, handler);
				}
			}
		}
		organized
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty() && self.attributes.is_empty() && self.attributes_ns.is_empty() && self.styles.is_empty() && self.events.is_empty()
	}

	/// Everything as additions, for rendering from scratch.
	#[must_use]
	pub fn as_diff(&self) -> FactsDiff {
		FactsDiff {
			properties: additions(&self.properties),
			attributes: additions(&self.attributes),
			attributes_ns: additions(&self.attributes_ns),
			styles: additions(&self.styles),
			events: additions(&self.events),
		}
	}
}

fn additions<V: Clone>(map: &BTreeMap<String, V>) -> BTreeMap<String, Option<V>> {
	map.iter().map(|(key, value)| (key.clone(), Some(value.clone()))).collect()
}

/// Changed facts. [`None`] removes a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactsDiff {
	pub properties: BTreeMap<String, Option<Value>>,
	pub attributes: BTreeMap<String, Option<String>>,
	pub attributes_ns: BTreeMap<String, Option<NsAttribute>>,
	pub styles: BTreeMap<String, Option<String>>,
	pub events: BTreeMap<String, Option<Handler>>,
}

impl FactsDiff {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.properties.is_empty() && self.attributes.is_empty() && self.attributes_ns.is_empty() && self.styles.is_empty() && self.events.is_empty()
	}
}

/// Compares two fact sets, or returns [`None`] if nothing changed.
///
/// Handlers compare by kind and decoder structure.
#[must_use]
pub fn diff_facts(old: &Facts, new: &Facts) -> Option<FactsDiff> {
	let diff = FactsDiff {
		properties: diff_category(&old.properties, &new.properties),
		attributes: diff_category(&old.attributes, &new.attributes),
		attributes_ns: diff_category(&old.attributes_ns, &new.attributes_ns),
		styles: diff_category(&old.styles, &new.styles),
		events: diff_category(&old.events, &new.events),
	};
	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}

fn diff_category<V: Clone + PartialEq>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> BTreeMap<String, Option<V>> {
	let removed = old.keys().filter(|key| !new.contains_key(*key)).map(|key| (key.clone(), None));
	let changed = new
		.iter()
		.filter(|(key, value)| old.get(*key) != Some(*value))
		.map(|(key, value)| (key.clone(), Some(value.clone())));
	removed.chain(changed).collect()
}
