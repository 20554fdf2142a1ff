//! A fully generalized combine of two maps, parameterized by three
//! pluggable strategies: what to do with keys present only in the
//! left map, only in the right map, and in both. The common
//! specializations (keep as is, drop entirely, map, filter) are plain
//! values of [`WhenMissing`] with whole subtree fast paths, no trait
//! hierarchy required. Strategies are `FnMut`, so effectful walks
//! (counting, collecting, failing via captured state) need no
//! separate entry point.
//!
//! The set algebra operations are special cases:
//! `union_with_key(f)` is `merge(preserve, preserve, f)`,
//! `intersection_with_key(f)` is `merge(discard, discard, f)`, and
//! `difference_with(f)` is `merge(preserve, discard, f)`.

use crate::tree::Tree;
use std::cmp::Ord;

/// Strategy applied to every entry whose key occurs in only one of
/// the two maps being merged.
pub enum WhenMissing<F> {
    /// keep every such entry unchanged. Entire subtrees are reused
    /// without being walked.
    Preserve,
    /// drop every such entry. Entire subtrees are skipped without
    /// being walked.
    Discard,
    /// run the strategy on each entry in ascending key order,
    /// keeping the entry when it returns `Some`
    Each(F),
}

/// The `fn` type used by [`preserve`] and [`discard`] so that the
/// strategy type parameter is inferrable when no closure is supplied.
pub type MissingFn<K, V> = fn(&K, &V) -> Option<V>;

/// Keep entries unique to one side unchanged.
pub fn preserve<K, V>() -> WhenMissing<MissingFn<K, V>> {
    WhenMissing::Preserve
}

/// Drop entries unique to one side.
pub fn discard<K, V>() -> WhenMissing<MissingFn<K, V>> {
    WhenMissing::Discard
}

/// Rewrite the value of every entry unique to one side.
pub fn map_missing<K, V, F>(mut f: F) -> WhenMissing<impl FnMut(&K, &V) -> Option<V>>
where
    F: FnMut(&K, &V) -> V,
{
    WhenMissing::Each(move |k: &K, v: &V| Some(f(k, v)))
}

/// Keep, rewrite, or drop every entry unique to one side.
pub fn filter_missing<K, V, F>(f: F) -> WhenMissing<F>
where
    F: FnMut(&K, &V) -> Option<V>,
{
    WhenMissing::Each(f)
}

// the strategy over a whole subtree known to be unique to one side
fn apply_missing<K, V, F>(strat: &mut WhenMissing<F>, t: &Tree<K, V>) -> Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
    F: FnMut(&K, &V) -> Option<V>,
{
    match strat {
        WhenMissing::Preserve => t.clone(),
        WhenMissing::Discard => Tree::Empty,
        WhenMissing::Each(f) => t.filter_map(f),
    }
}

// walk both trees simultaneously in ascending key order: take the
// root of the left operand as pivot, split the right operand on it,
// recurse, and reassemble with link/link2. Subtrees unique to one
// side go to apply_missing whole.
pub(crate) fn merge_trees<K, V, F0, F1, F2>(
    t0: &Tree<K, V>,
    t1: &Tree<K, V>,
    missing_left: &mut WhenMissing<F0>,
    missing_right: &mut WhenMissing<F1>,
    matched: &mut F2,
) -> Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
    F0: FnMut(&K, &V) -> Option<V>,
    F1: FnMut(&K, &V) -> Option<V>,
    F2: FnMut(&K, &V, &V) -> Option<V>,
{
    match (t0, t1) {
        (Tree::Empty, _) => apply_missing(missing_right, t1),
        (_, Tree::Empty) => apply_missing(missing_left, t0),
        (Tree::Node(n0), _) => {
            let (l1, found, r1) = t1.split_lookup(&n0.key);
            let l = merge_trees(&n0.left, &l1, missing_left, missing_right, matched);
            let kv = match found {
                Some(v1) => matched(&n0.key, &n0.val, &v1),
                None => match missing_left {
                    WhenMissing::Preserve => Some(n0.val.clone()),
                    WhenMissing::Discard => None,
                    WhenMissing::Each(f) => f(&n0.key, &n0.val),
                },
            };
            let r = merge_trees(&n0.right, &r1, missing_left, missing_right, matched);
            match kv {
                Some(v) => Tree::link(n0.key.clone(), v, &l, &r),
                None => Tree::link2(&l, &r),
            }
        }
    }
}
