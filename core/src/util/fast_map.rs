pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;

/// Pairs of node addresses already visited by a lock-step graph walk.
pub type VisitedPairs = FastHashSet<(usize, usize)>;

#[inline]
pub fn fast_hash_set_new<K>() -> FastHashSet<K> {
    rustc_hash::FxHashSet::default()
}
