//! Reference counts of live event listeners per event name.

use core::{
	borrow::Borrow,
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, DrainFilter, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map of counted values that can be decremented to zero without being removed right away.
///
/// Entries with a count of zero ("weak" entries) stay available for reuse until [`RcHashMap::drain_weak`] is called.
pub(crate) struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;
impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero + Copy,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero + Copy,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	pub fn increment_or_insert_with<F: FnOnce() -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let (_, v) = vacant.insert((C::one(), v()));
				Ok(v)
			}
		}
	}

	pub fn weak_decrement<Q: ?Sized>(&mut self, k: &Q) -> Result<Option<&mut V>, CountSaturatedError>
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// The current count for `k`, zero if absent.
	pub fn count<Q: ?Sized>(&self, k: &Q) -> C
	where
		K: Borrow<Q>,
		Q: Eq + Hash,
	{
		self.0.get(k).map_or_else(C::zero, |(c, _)| *c)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}

	/// Removes and yields all entries with a count of zero.
	pub fn drain_weak(&mut self) -> DrainWeak<'_, K, C, V> {
		DrainWeak(self.0.drain_filter(is_weak::<K, C, V> as fn(&K, &mut (C, V)) -> bool))
	}
}

fn is_weak<K, C: Zero, V>(_: &K, (c, _): &mut (C, V)) -> bool {
	c.is_zero()
}

pub(crate) struct DrainWeak<'a, K, C, V>(DrainFilter<'a, K, (C, V), fn(&K, &mut (C, V)) -> bool>);
impl<'a, K, C, V> Iterator for DrainWeak<'a, K, C, V> {
	type Item = (K, V);

	fn next(&mut self) -> Option<Self::Item> {
		self.0.next().map(|(k, (_, v))| (k, v))
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.0.size_hint()
	}
}

/// A count over- or underflowed.
#[derive(Debug)]
pub(crate) struct CountSaturatedError;

#[cfg(test)]
mod tests {
	use super::RcHashMap;

	#[test]
	fn weak_entries_drain() {
		let mut map = RcHashMap::<&str, u8, ()>::new();
		map.increment_or_insert_with("click", || ()).unwrap();
		map.increment_or_insert_with("click", || ()).unwrap();
		map.increment_or_insert_with("input", || ()).unwrap();
		map.weak_decrement("input").unwrap();
		map.weak_decrement("click").unwrap();

		assert_eq!(map.count("click"), 1);
		let drained: Vec<_> = map.drain_weak().map(|(k, ())| k).collect();
		assert_eq!(drained, vec!["input"]);
		assert_eq!(map.len(), 1);
		assert!(map.weak_decrement("input").unwrap().is_none());
	}

	#[test]
	fn default_is_empty() {
		let mut map = RcHashMap::<&str, u8, ()>::default();
		assert_eq!(map.len(), 0);
		assert_eq!(map.count("click"), 0);
		assert_eq!(map.drain_weak().count(), 0);
	}

	#[test]
	fn underflow_is_reported() {
		let mut map = RcHashMap::<&str, u8, ()>::new();
		map.increment_or_insert_with("click", || ()).unwrap();
		map.weak_decrement("click").unwrap();
		assert!(map.weak_decrement("click").is_err());
	}
}
