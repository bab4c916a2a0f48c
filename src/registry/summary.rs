//! # Summary vector and BundleSummary.
//!
//! [`SummaryVector`] is a counting Bloom filter over bundle ids, the compact
//! form nodes exchange to find out which bundles a peer is missing.
//! [`BundleSummary`] keeps one in lockstep with a [`BundleList`]: every add,
//! remove, eviction and clear updates both in the same call, so the filter
//! never reports a bundle the list dropped without also having had it.
//!
//! ```text
//! add(b)     → list.add_bundle(b)   && vector.insert(b.id)
//! remove(id) → list.remove(id)      && vector.remove(id)
//! expire(..) → list.expire(.., |e| { vector.remove(e.key); observer.on_expired(e) })
//! clear()    → list.clear()          ; vector.clear()
//! ```
//!
//! Counters are 4 bits wide and saturate; a saturated counter is never
//! decremented, which can only cause false positives.
//!
//! ## Hashing
//! Counter positions come from 64-bit FNV-1a (offset basis `0xcbf29ce484222325`,
//! prime `0x100000001b3`) over the bytes a key's [`Hash`] impl writes, with
//! integers fed little-endian. The result depends only on the key, never on the
//! platform or toolchain, so filters built on different nodes agree.

use std::hash::{Hash, Hasher};

use super::bundle::{BundleId, BundleList, MetaBundle};
use super::expiring::{Entry, ExpireOutcome, ExpiryObserver};
use crate::clock::{ClockQuality, DtnTime};
use crate::core::RegistryConfig;

const COUNTER_MAX: u8 = 0x0f;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a with fixed-width little-endian integer encoding.
#[derive(Clone, Copy, Debug)]
struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(FNV_OFFSET)
    }
}

impl Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for b in bytes {
            self.0 ^= u64::from(*b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write(&i.to_le_bytes());
    }

    // Same bytes on 32- and 64-bit targets.
    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }
}

/// Counting Bloom filter.
///
/// Positions are derived with a fixed FNV-1a hash (see the module docs), so
/// a vector received from a peer with the same `bits` and `hashes` can be
/// queried directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryVector {
    counters: Vec<u8>,
    hashes: u32,
    items: usize,
}

impl SummaryVector {
    /// `bits` counters probed by `hashes` hash functions (both at least 1).
    pub fn new(bits: usize, hashes: u32) -> Self {
        Self {
            counters: vec![0; bits.max(1)],
            hashes: hashes.max(1),
            items: 0,
        }
    }

    pub fn from_config(cfg: &RegistryConfig) -> Self {
        Self::new(cfg.summary_bits, cfg.summary_hashes)
    }

    pub fn insert<K: Hash + ?Sized>(&mut self, key: &K) {
        for idx in self.indexes(key) {
            let c = &mut self.counters[idx];
            if *c < COUNTER_MAX {
                *c += 1;
            }
        }
        self.items += 1;
    }

    /// Undoes one `insert` of `key`. Removing a key that was never inserted
    /// corrupts the filter; callers only remove what they added.
    pub fn remove<K: Hash + ?Sized>(&mut self, key: &K) {
        for idx in self.indexes(key) {
            let c = &mut self.counters[idx];
            if *c > 0 && *c < COUNTER_MAX {
                *c -= 1;
            }
        }
        self.items = self.items.saturating_sub(1);
    }

    /// False means definitely absent; true means probably present.
    pub fn might_contain<K: Hash + ?Sized>(&self, key: &K) -> bool {
        self.indexes(key).all(|idx| self.counters[idx] > 0)
    }

    pub fn clear(&mut self) {
        self.counters.fill(0);
        self.items = 0;
    }

    /// Number of keys currently inserted.
    pub fn len(&self) -> usize {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Number of counters.
    pub fn bits(&self) -> usize {
        self.counters.len()
    }

    pub fn hashes(&self) -> u32 {
        self.hashes
    }

    /// Double hashing: `h1 + i * h2` for `i` in `0..hashes`.
    fn indexes<K: Hash + ?Sized>(&self, key: &K) -> impl Iterator<Item = usize> + use<K> {
        let mut hasher = Fnv1a::default();
        key.hash(&mut hasher);
        let h = hasher.finish();
        let h1 = h & 0xffff_ffff;
        let h2 = (h >> 32) | 1;
        let len = self.counters.len() as u64;
        (0..u64::from(self.hashes)).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % len) as usize)
    }
}

/// A [`BundleList`] with a [`SummaryVector`] kept in sync.
#[derive(Clone, Debug)]
pub struct BundleSummary {
    list: BundleList,
    vector: SummaryVector,
}

impl Default for BundleSummary {
    fn default() -> Self {
        Self::new(&RegistryConfig::default())
    }
}

impl BundleSummary {
    pub fn new(cfg: &RegistryConfig) -> Self {
        Self {
            list: BundleList::from_config(cfg),
            vector: SummaryVector::from_config(cfg),
        }
    }

    /// Adds `bundle` with its quality-adjusted expiry. No-op if known.
    pub fn add(&mut self, bundle: &MetaBundle, quality: ClockQuality) -> bool {
        self.add_with_expiry(bundle.id.clone(), bundle.expire_time(quality))
    }

    /// Adds `id` with an explicit expiry. No-op if known.
    pub fn add_with_expiry(&mut self, id: BundleId, expiry: DtnTime) -> bool {
        if self.list.contains(&id) {
            return false;
        }
        self.vector.insert(&id);
        self.list.add(id, expiry)
    }

    pub fn remove(&mut self, id: &BundleId) -> bool {
        if !self.list.remove(id) {
            return false;
        }
        self.vector.remove(id);
        true
    }

    /// Exact membership.
    pub fn contains(&self, id: &BundleId) -> bool {
        self.list.contains(id)
    }

    /// Filter membership (no false negatives).
    pub fn might_contain(&self, id: &BundleId) -> bool {
        self.vector.might_contain(id)
    }

    /// Evicts like [`BundleList::expire`], dropping evicted ids from the filter first.
    pub fn expire<O>(&mut self, now: DtnTime, quality: ClockQuality, observer: &mut O) -> ExpireOutcome
    where
        O: ExpiryObserver<BundleId> + ?Sized,
    {
        let mut sync = InSync {
            vector: &mut self.vector,
            inner: observer,
        };
        self.list.expire(now, quality, &mut sync)
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.vector.clear();
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.list.version()
    }

    /// Bundles in the list the `peer` filter does not report, in key order.
    ///
    /// A false positive in `peer` hides a bundle the peer lacks; nothing the
    /// peer actually holds is ever returned.
    pub fn not_in(&self, peer: &SummaryVector) -> Vec<BundleId> {
        self.list.keys().filter(|id| !peer.might_contain(*id)).cloned().collect()
    }

    /// Snapshot of the filter, for sending to peers.
    pub fn summary(&self) -> SummaryVector {
        self.vector.clone()
    }

    /// The underlying list.
    pub fn list(&self) -> &BundleList {
        &self.list
    }
}

struct InSync<'a, O: ?Sized> {
    vector: &'a mut SummaryVector,
    inner: &'a mut O,
}

impl<O> ExpiryObserver<BundleId> for InSync<'_, O>
where
    O: ExpiryObserver<BundleId> + ?Sized,
{
    fn on_expired(&mut self, entry: &Entry<BundleId>) {
        self.vector.remove(&entry.key);
        self.inner.on_expired(entry);
    }

    fn on_commit(&mut self) {
        self.inner.on_commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IgnoreExpired;
    use proptest::prelude::*;

    fn id(seq: u64) -> BundleId {
        BundleId::new("dtn://node", DtnTime::from_secs(1000), seq)
    }

    fn small() -> RegistryConfig {
        RegistryConfig {
            summary_bits: 256,
            summary_hashes: 3,
            ..RegistryConfig::default()
        }
    }

    #[test]
    fn add_and_remove_update_both_views() {
        let mut s = BundleSummary::new(&small());
        let b = MetaBundle::new(id(1), 60);

        assert!(s.add(&b, ClockQuality::TRUSTED));
        assert!(!s.add(&b, ClockQuality::TRUSTED));
        assert!(s.contains(&b.id));
        assert!(s.might_contain(&b.id));
        assert_eq!(s.summary().len(), 1);

        assert!(s.remove(&b.id));
        assert!(!s.remove(&b.id));
        assert!(!s.contains(&b.id));
        assert!(!s.might_contain(&b.id));
        assert!(s.summary().is_empty());
    }

    #[test]
    fn expire_drops_from_filter_and_notifies() {
        let mut s = BundleSummary::new(&small());
        s.add_with_expiry(id(1), DtnTime::from_secs(100));
        s.add_with_expiry(id(2), DtnTime::from_secs(200));

        let mut gone = Vec::new();
        let outcome = s.expire(DtnTime::from_secs(150), ClockQuality::TRUSTED, &mut |e: &Entry<BundleId>| {
            gone.push(e.key.sequence)
        });

        assert_eq!(outcome, ExpireOutcome::Evicted(1));
        assert_eq!(gone, vec![1]);
        assert!(!s.might_contain(&id(1)));
        assert!(s.might_contain(&id(2)));
        assert_eq!(s.version(), 3);
    }

    #[test]
    fn untrusted_expire_leaves_filter_alone() {
        let mut s = BundleSummary::new(&small());
        s.add_with_expiry(id(1), DtnTime::from_secs(1));
        let before = s.summary();
        assert_eq!(
            s.expire(DtnTime::from_secs(10), ClockQuality::UNTRUSTED, &mut IgnoreExpired),
            ExpireOutcome::Untrusted
        );
        assert_eq!(s.summary(), before);
    }

    #[test]
    fn clear_resets_everything() {
        let mut s = BundleSummary::new(&small());
        s.add_with_expiry(id(1), DtnTime::from_secs(1));
        s.clear();
        assert!(s.is_empty());
        assert!(s.summary().is_empty());
        assert!(!s.might_contain(&id(1)));
    }

    #[test]
    fn saturated_counters_never_drop() {
        // One counter, one hash: every key lands on the same slot.
        let mut v = SummaryVector::new(1, 1);
        for k in 0..20u32 {
            v.insert(&k);
        }
        for k in 0..19u32 {
            v.remove(&k);
        }
        assert!(v.might_contain(&19u32));
    }

    #[test]
    fn snapshot_answers_for_peers() {
        let mut s = BundleSummary::new(&small());
        s.add_with_expiry(id(7), DtnTime::from_secs(500));
        let snapshot = s.summary();
        s.remove(&id(7));

        assert!(snapshot.might_contain(&id(7)));
        assert_eq!(snapshot.bits(), 256);
        assert_eq!(snapshot.hashes(), 3);
    }

    #[test]
    fn fnv1a_matches_reference_values() {
        let digest = |bytes: &[u8]| {
            let mut h = Fnv1a::default();
            h.write(bytes);
            h.finish()
        };
        assert_eq!(digest(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(digest(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(digest(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn counter_positions_are_pinned() {
        let v = SummaryVector::new(256, 3);
        assert_eq!(v.indexes(&42u64).collect::<Vec<_>>(), vec![239, 90, 197]);
    }

    #[test]
    fn not_in_lists_what_the_peer_lacks() {
        let mut ours = BundleSummary::new(&small());
        let mut theirs = BundleSummary::new(&small());
        for seq in 0..10 {
            ours.add_with_expiry(id(seq), DtnTime::from_secs(500));
        }
        for seq in 0..5 {
            theirs.add_with_expiry(id(seq), DtnTime::from_secs(500));
        }

        let missing = ours.not_in(&theirs.summary());
        // Held by the peer: never reported.
        assert!(missing.iter().all(|id| id.sequence >= 5));
        // Not held: reported unless the peer filter has a false positive.
        for id in &missing {
            assert!(!theirs.summary().might_contain(id));
        }
        let hidden = (5..10).filter(|seq| !missing.contains(&id(*seq))).count();
        assert!(hidden <= 1, "{hidden} false positives in a nearly empty filter");
    }

    #[test]
    fn not_in_empty_peer_returns_everything() {
        let mut ours = BundleSummary::new(&small());
        for seq in [3, 1, 2] {
            ours.add_with_expiry(id(seq), DtnTime::from_secs(500));
        }
        let peer = SummaryVector::from_config(&small());
        assert_eq!(ours.not_in(&peer), vec![id(1), id(2), id(3)]);
        assert!(ours.not_in(&ours.summary()).is_empty());
    }

    proptest! {
        #[test]
        fn not_in_never_reports_held_bundles(
            shared in prop::collection::btree_set(0u64..1000, 0..100),
            ours_only in prop::collection::btree_set(1000u64..2000, 0..100),
        ) {
            let mut ours = BundleSummary::new(&small());
            let mut theirs = BundleSummary::new(&small());
            for seq in &shared {
                ours.add_with_expiry(id(*seq), DtnTime::from_secs(*seq));
                theirs.add_with_expiry(id(*seq), DtnTime::from_secs(*seq));
            }
            for seq in &ours_only {
                ours.add_with_expiry(id(*seq), DtnTime::from_secs(*seq));
            }

            let peer = theirs.summary();
            let missing = ours.not_in(&peer);
            for id in &missing {
                prop_assert!(ours_only.contains(&id.sequence));
            }
            for seq in &ours_only {
                prop_assert!(missing.contains(&id(*seq)) || peer.might_contain(&id(*seq)));
            }
        }

        #[test]
        fn no_false_negatives(
            keep in prop::collection::btree_set(0u64..5000, 0..200),
            drop in prop::collection::btree_set(5000u64..10000, 0..200),
        ) {
            let mut s = BundleSummary::new(&small());
            for seq in keep.iter().chain(drop.iter()) {
                s.add_with_expiry(id(*seq), DtnTime::from_secs(*seq));
            }
            for seq in &drop {
                s.remove(&id(*seq));
            }
            for seq in &keep {
                prop_assert!(s.might_contain(&id(*seq)));
                prop_assert!(s.contains(&id(*seq)));
            }
            prop_assert_eq!(s.summary().len(), keep.len());
        }
    }
}
