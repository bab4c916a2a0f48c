//! # ExpiringRegistry: ordered set with time-based eviction.
//!
//! Two indexes kept in lockstep:
//!
//! ```text
//! by_key:    BTreeMap<K, DtnTime>        membership, first expiry wins
//! by_expiry: BTreeSet<(DtnTime, K)>      eviction order (expiry asc, key asc)
//!
//! expire(now, quality, observer):
//!   quality <= min_quality      → Untrusted, nothing changes
//!   while first.expiry < now    → pop, version += 1, observer.on_expired(&entry)
//!   evicted > 0                 → observer.on_commit()
//! ```
//!
//! ## Rules
//! - `add` of a present key is a no-op (the first expiry is kept);
//! - entries leave only through `remove`, `expire` or `clear`;
//! - `version` moves once per effective mutation and once per evicted entry;
//! - the observer sees every evicted entry exactly once, in eviction order.
//!
//! The registry is a plain value; owners that share it wrap it in their own lock.

use std::collections::{BTreeMap, BTreeSet};

use crate::clock::{ClockQuality, DtnTime};
use crate::core::RegistryConfig;

/// A key with its expiry instant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry<K> {
    pub key: K,
    pub expiry: DtnTime,
}

/// Receives evictions from [`ExpiringRegistry::expire`].
///
/// Closures taking `&Entry<K>` implement it directly.
pub trait ExpiryObserver<K> {
    /// Called once per evicted entry, in eviction order.
    fn on_expired(&mut self, entry: &Entry<K>);

    /// Called once after a pass that evicted at least one entry.
    fn on_commit(&mut self) {}
}

impl<K, F> ExpiryObserver<K> for F
where
    F: FnMut(&Entry<K>),
{
    fn on_expired(&mut self, entry: &Entry<K>) {
        self(entry)
    }
}

/// Observer that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreExpired;

impl<K> ExpiryObserver<K> for IgnoreExpired {
    fn on_expired(&mut self, _entry: &Entry<K>) {}
}

/// Result of one [`ExpiringRegistry::expire`] pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// Clock quality too low; nothing was evaluated.
    Untrusted,
    /// This many entries were evicted (possibly zero).
    Evicted(usize),
}

impl ExpireOutcome {
    /// Number of evicted entries (zero when untrusted).
    pub fn evicted(self) -> usize {
        match self {
            ExpireOutcome::Untrusted => 0,
            ExpireOutcome::Evicted(n) => n,
        }
    }
}

/// Set of keys, each with an expiry, evicted in expiry order.
///
/// # Example
/// ```
/// use dtn_core::{ClockQuality, DtnTime, Entry, ExpiringRegistry};
///
/// let mut reg = ExpiringRegistry::new();
/// reg.add("a", DtnTime::from_secs(100));
/// reg.add("b", DtnTime::from_secs(50));
/// reg.add("c", DtnTime::from_secs(150));
///
/// let mut gone = Vec::new();
/// reg.expire(DtnTime::from_secs(120), ClockQuality::TRUSTED, &mut |e: &Entry<&str>| {
///     gone.push(e.key.to_string())
/// });
/// assert_eq!(gone, ["b", "a"]);
/// assert!(reg.contains(&"c"));
/// ```
#[derive(Clone, Debug)]
pub struct ExpiringRegistry<K> {
    by_key: BTreeMap<K, DtnTime>,
    by_expiry: BTreeSet<(DtnTime, K)>,
    version: u64,
    min_quality: f64,
}

impl<K: Ord + Clone> Default for ExpiringRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone> ExpiringRegistry<K> {
    /// Empty registry that evicts with any clock quality above zero.
    pub fn new() -> Self {
        Self {
            by_key: BTreeMap::new(),
            by_expiry: BTreeSet::new(),
            version: 0,
            min_quality: 0.0,
        }
    }

    /// Empty registry using `cfg.min_quality`.
    pub fn from_config(cfg: &RegistryConfig) -> Self {
        Self::new().with_min_quality(cfg.min_quality)
    }

    /// `expire` evicts only when clock quality is strictly above `min_quality`.
    #[inline]
    pub fn with_min_quality(mut self, min_quality: f64) -> Self {
        self.min_quality = min_quality;
        self
    }

    /// Inserts `key`. Returns `false` (and keeps the first expiry) if already present.
    pub fn add(&mut self, key: K, expiry: DtnTime) -> bool {
        if self.by_key.contains_key(&key) {
            return false;
        }
        self.by_expiry.insert((expiry, key.clone()));
        self.by_key.insert(key, expiry);
        self.version += 1;
        true
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(expiry) = self.by_key.remove(key) else {
            return false;
        };
        self.by_expiry.remove(&(expiry, key.clone()));
        self.version += 1;
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn expiry_of(&self, key: &K) -> Option<DtnTime> {
        self.by_key.get(key).copied()
    }

    /// Earliest expiry currently held.
    pub fn next_expiry(&self) -> Option<DtnTime> {
        self.by_expiry.first().map(|(t, _)| *t)
    }

    /// Evicts every entry with `expiry < now`, oldest first.
    ///
    /// Does nothing and returns [`ExpireOutcome::Untrusted`] unless
    /// `quality` exceeds the configured minimum.
    pub fn expire<O>(&mut self, now: DtnTime, quality: ClockQuality, observer: &mut O) -> ExpireOutcome
    where
        O: ExpiryObserver<K> + ?Sized,
    {
        if !quality.exceeds(self.min_quality) {
            return ExpireOutcome::Untrusted;
        }

        let mut evicted = 0;
        while let Some((expiry, _)) = self.by_expiry.first() {
            if *expiry >= now {
                break;
            }
            let Some((expiry, key)) = self.by_expiry.pop_first() else {
                break;
            };
            self.by_key.remove(&key);
            self.version += 1;
            evicted += 1;
            observer.on_expired(&Entry { key, expiry });
        }

        if evicted > 0 {
            observer.on_commit();
        }
        ExpireOutcome::Evicted(evicted)
    }

    /// Removes everything without notifying anyone.
    pub fn clear(&mut self) {
        if self.by_key.is_empty() {
            return;
        }
        self.by_key.clear();
        self.by_expiry.clear();
        self.version += 1;
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Mutation counter, for cheap change detection.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Entries in eviction order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, DtnTime)> + '_ {
        self.by_expiry.iter().map(|(t, k)| (k, *t))
    }

    /// Keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.by_key.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(secs: u64) -> DtnTime {
        DtnTime::from_secs(secs)
    }

    #[derive(Default)]
    struct Recording {
        expired: Vec<(u32, u64)>,
        commits: usize,
    }

    impl ExpiryObserver<u32> for Recording {
        fn on_expired(&mut self, entry: &Entry<u32>) {
            self.expired.push((entry.key, entry.expiry.as_secs()));
        }

        fn on_commit(&mut self) {
            self.commits += 1;
        }
    }

    #[test]
    fn evicts_strictly_older_entries_in_expiry_order() {
        let mut reg = ExpiringRegistry::new();
        reg.add(1u32, t(100));
        reg.add(2, t(50));
        reg.add(3, t(150));

        let mut obs = Recording::default();
        let outcome = reg.expire(t(120), ClockQuality::TRUSTED, &mut obs);

        assert_eq!(outcome, ExpireOutcome::Evicted(2));
        assert_eq!(obs.expired, vec![(2, 50), (1, 100)]);
        assert_eq!(obs.commits, 1);
        assert_eq!(reg.keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn successive_passes_report_each_entry_once() {
        let mut reg = ExpiringRegistry::new();
        reg.add('A', t(100));
        reg.add('B', t(50));
        reg.add('C', t(150));

        let mut seen = Vec::new();
        let first = reg.expire(t(60), ClockQuality::TRUSTED, &mut |e: &Entry<char>| seen.push(e.key));
        assert_eq!(first, ExpireOutcome::Evicted(1));
        assert_eq!(seen, vec!['B']);
        assert_eq!(reg.len(), 2);

        let second = reg.expire(t(200), ClockQuality::TRUSTED, &mut |e: &Entry<char>| seen.push(e.key));
        assert_eq!(second, ExpireOutcome::Evicted(2));
        assert_eq!(seen, vec!['B', 'A', 'C']);
        assert!(reg.is_empty());

        let again = reg.expire(t(300), ClockQuality::TRUSTED, &mut |e: &Entry<char>| seen.push(e.key));
        assert_eq!(again, ExpireOutcome::Evicted(0));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn entry_expiring_exactly_now_survives() {
        let mut reg = ExpiringRegistry::new();
        reg.add(1u32, t(100));
        let outcome = reg.expire(t(100), ClockQuality::TRUSTED, &mut IgnoreExpired);
        assert_eq!(outcome, ExpireOutcome::Evicted(0));
        assert!(reg.contains(&1));
    }

    #[test]
    fn untrusted_clock_is_a_no_op() {
        let mut reg = ExpiringRegistry::new();
        reg.add(1u32, t(10));
        let before = reg.version();

        let mut obs = Recording::default();
        let outcome = reg.expire(t(1000), ClockQuality::UNTRUSTED, &mut obs);

        assert_eq!(outcome, ExpireOutcome::Untrusted);
        assert_eq!(outcome.evicted(), 0);
        assert!(obs.expired.is_empty());
        assert_eq!(obs.commits, 0);
        assert_eq!(reg.version(), before);
        assert!(reg.contains(&1));
    }

    #[test]
    fn min_quality_threshold_is_exclusive() {
        let mut reg = ExpiringRegistry::new().with_min_quality(0.5);
        reg.add(1u32, t(10));
        assert_eq!(
            reg.expire(t(20), ClockQuality::new(0.5), &mut IgnoreExpired),
            ExpireOutcome::Untrusted
        );
        assert_eq!(
            reg.expire(t(20), ClockQuality::new(0.6), &mut IgnoreExpired),
            ExpireOutcome::Evicted(1)
        );
    }

    #[test]
    fn no_commit_without_evictions() {
        let mut reg: ExpiringRegistry<u32> = ExpiringRegistry::new();
        let mut obs = Recording::default();
        reg.expire(t(5), ClockQuality::TRUSTED, &mut obs);
        assert_eq!(obs.commits, 0);
    }

    #[test]
    fn duplicate_add_keeps_first_expiry() {
        let mut reg = ExpiringRegistry::new();
        assert!(reg.add(7u32, t(100)));
        assert!(!reg.add(7, t(500)));
        assert_eq!(reg.expiry_of(&7), Some(t(100)));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.version(), 1);
    }

    #[test]
    fn version_counts_effective_mutations_only() {
        let mut reg = ExpiringRegistry::new();
        reg.add(1u32, t(10));
        reg.add(2, t(20));
        reg.add(3, t(30));
        assert_eq!(reg.version(), 3);

        assert!(!reg.remove(&9));
        assert_eq!(reg.version(), 3);
        assert!(reg.remove(&3));
        assert_eq!(reg.version(), 4);

        reg.expire(t(25), ClockQuality::TRUSTED, &mut IgnoreExpired);
        assert_eq!(reg.version(), 6);

        reg.clear();
        assert_eq!(reg.version(), 6, "clear of an empty registry is a no-op");
        reg.add(4, t(40));
        reg.clear();
        assert_eq!(reg.version(), 8);
        assert!(reg.is_empty());
    }

    #[test]
    fn equal_expiries_break_ties_by_key() {
        let mut reg = ExpiringRegistry::new();
        reg.add(30u32, t(10));
        reg.add(10, t(10));
        reg.add(20, t(10));

        let mut order = Vec::new();
        reg.expire(t(11), ClockQuality::TRUSTED, &mut |e: &Entry<u32>| order.push(e.key));
        assert_eq!(order, vec![10, 20, 30]);
    }

    #[test]
    fn iter_follows_expiry_and_keys_follow_key_order() {
        let mut reg = ExpiringRegistry::new();
        reg.add("b", t(1));
        reg.add("a", t(2));
        assert_eq!(reg.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(reg.keys().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(reg.next_expiry(), Some(t(1)));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Add(u8, u16),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<u8>(), any::<u16>()).prop_map(|(k, e)| Op::Add(k, e)),
            any::<u8>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #[test]
        fn membership_matches_a_map_model(ops in prop::collection::vec(op(), 0..200)) {
            let mut reg = ExpiringRegistry::new();
            let mut model = std::collections::BTreeMap::new();

            for op in ops {
                match op {
                    Op::Add(k, e) => {
                        let fresh = !model.contains_key(&k);
                        model.entry(k).or_insert(e);
                        prop_assert_eq!(reg.add(k, t(u64::from(e))), fresh);
                    }
                    Op::Remove(k) => {
                        prop_assert_eq!(reg.remove(&k), model.remove(&k).is_some());
                    }
                }
            }

            prop_assert_eq!(reg.len(), model.len());
            for (k, e) in &model {
                prop_assert_eq!(reg.expiry_of(k), Some(t(u64::from(*e))));
            }
        }

        #[test]
        fn expire_partitions_on_now(
            entries in prop::collection::btree_map(any::<u16>(), 0u64..1000, 0..100),
            now in 0u64..1000,
        ) {
            let mut reg = ExpiringRegistry::new();
            for (k, e) in &entries {
                reg.add(*k, t(*e));
            }

            let mut seen = Vec::new();
            let outcome = reg.expire(t(now), ClockQuality::TRUSTED, &mut |e: &Entry<u16>| {
                seen.push((e.expiry, e.key))
            });

            let expected: Vec<_> = entries.iter().filter(|(_, e)| **e < now).collect();
            prop_assert_eq!(outcome, ExpireOutcome::Evicted(expected.len()));
            prop_assert!(seen.windows(2).all(|w| w[0] < w[1]), "eviction order");
            let mut unique = seen.clone();
            unique.dedup();
            prop_assert_eq!(unique.len(), seen.len());

            for (k, e) in &entries {
                prop_assert_eq!(reg.contains(k), *e >= now);
            }
        }

        #[test]
        fn rising_now_reports_each_entry_exactly_once(
            entries in prop::collection::btree_map(any::<u16>(), 0u64..1000, 0..100),
            mut nows in prop::collection::vec(0u64..1100, 1..20),
        ) {
            nows.sort_unstable();
            let mut reg = ExpiringRegistry::new();
            for (k, e) in &entries {
                reg.add(*k, t(*e));
            }

            let mut reported = Vec::new();
            let mut total = 0;
            for now in &nows {
                let outcome = reg.expire(t(*now), ClockQuality::TRUSTED, &mut |e: &Entry<u16>| {
                    reported.push((e.key, e.expiry, t(*now)))
                });
                total += outcome.evicted();
            }

            let mut seen = std::collections::BTreeMap::<u16, usize>::new();
            for (key, expiry, at) in &reported {
                prop_assert!(expiry < at);
                *seen.entry(*key).or_default() += 1;
            }
            let last = nows[nows.len() - 1];
            prop_assert!(seen.values().all(|n| *n == 1));
            prop_assert_eq!(total, reported.len());
            for (k, e) in &entries {
                prop_assert_eq!(seen.contains_key(k), *e < last);
                prop_assert_eq!(reg.contains(k), *e >= last);
            }
        }
    }
}
