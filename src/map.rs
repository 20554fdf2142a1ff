use crate::iter::{Iter, Keys, Values};
use crate::merge::{self, WhenMissing};
use crate::set::Set;
use crate::tree::{Builder, Tree};
use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    iter::FromIterator,
    ops::{Bound, Index},
};

/// A persistent ordered map backed by a weight balanced tree.
///
/// Every operation that changes the map returns a new map and leaves
/// the original untouched. The two maps share every subtree that the
/// operation did not change, so an update costs O(log N) time and
/// space rather than a copy of the whole structure. Because nothing
/// is ever written in place, any number of threads can read a map, or
/// maps derived from it, with zero synchronization.
///
/// Clone is a fundamental operation here. Keys and values are cloned
/// along the rebuilt path of every update, so if your key and value
/// types are cheap to clone (e.g. ints, or Arc wrapped data) updates
/// will be fast.
///
/// # Examples
/// ```
/// use wbmap::map::Map;
///
/// let m = Map::new()
///     .insert(1, "a").0
///     .insert(2, "b").0
///     .insert(3, "c").0;
///
/// assert_eq!(m.get(&1), Some(&"a"));
/// assert_eq!(m.get(&4), None);
///
/// let (m2, prev) = m.remove(&1);
/// assert_eq!(prev, Some("a"));
/// assert_eq!(m2.get(&1), None);
/// // the original version is unchanged
/// assert_eq!(m.get(&1), Some(&"a"));
/// ```
#[derive(Clone)]
pub struct Map<K: Ord + Clone, V: Clone> {
    pub(crate) root: Tree<K, V>,
}

impl<K, V> Default for Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Map<K, V> {
        Map::new()
    }
}

impl<K, V> Hash for Map<K, V>
where
    K: Hash + Ord + Clone,
    V: Hash + Clone,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state)
    }
}

impl<K, V> PartialEq for Map<K, V>
where
    K: PartialEq + Ord + Clone,
    V: PartialEq + Clone,
{
    fn eq(&self, other: &Map<K, V>) -> bool {
        self.root == other.root
    }
}

impl<K, V> Eq for Map<K, V>
where
    K: Eq + Ord + Clone,
    V: Eq + Clone,
{
}

impl<K, V> PartialOrd for Map<K, V>
where
    K: Ord + Clone,
    V: PartialOrd + Clone,
{
    fn partial_cmp(&self, other: &Map<K, V>) -> Option<Ordering> {
        self.root.partial_cmp(&other.root)
    }
}

impl<K, V> Ord for Map<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn cmp(&self, other: &Map<K, V>) -> Ordering {
        self.root.cmp(&other.root)
    }
}

impl<K, V> Debug for Map<K, V>
where
    K: Debug + Ord + Clone,
    V: Debug + Clone,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.root.fmt(f)
    }
}

impl<'a, Q, K, V> Index<&'a Q> for Map<K, V>
where
    Q: ?Sized + Ord,
    K: Ord + Clone + Borrow<Q>,
    V: Clone,
{
    type Output = V;
    fn index(&self, k: &Q) -> &V {
        self.get(k).expect("element not found for key")
    }
}

impl<K, V> FromIterator<(K, V)> for Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut b = Builder::new();
        for (k, v) in iter {
            b.push(k, v, &mut |_, _, v| v)
        }
        Map { root: b.finish() }
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V>
where
    K: 'a + Borrow<K> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.root.into_iter()
    }
}

impl<K, V> Map<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    /// Create a new empty map
    pub fn new() -> Self {
        Map { root: Tree::new() }
    }

    /// get the number of elements in the map. O(1)
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Build a map from a sequence of pairs that is already sorted in
    /// strictly ascending key order. This is the same amortized O(n)
    /// construction `collect` uses while the input cooperates, named
    /// for callers who want to state the expectation. The later of
    /// two equal keys wins, and out of order input merely loses the
    /// fast path, the result is still correct.
    pub fn from_sorted_iter<E: IntoIterator<Item = (K, V)>>(elts: E) -> Self {
        elts.into_iter().collect()
    }

    /// Build a map from a sequence of pairs promised to be strictly
    /// ascending in key, with no duplicates. No comparisons are
    /// performed. If the promise is violated the resulting map is
    /// unspecified (though well formed and memory safe): this is a
    /// documented precondition, not a checked error.
    pub fn from_distinct_sorted_iter<E: IntoIterator<Item = (K, V)>>(elts: E) -> Self {
        let mut b = Builder::new();
        for (k, v) in elts {
            b.push_unchecked(k, v)
        }
        Map { root: b.finish() }
    }

    /// Build a map from a sequence of pairs, combining the values of
    /// duplicate keys with f. f is given the key, the value already
    /// stored, and the incoming value.
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m = Map::from_iter_with(
    ///     vec![(1, 1), (2, 1), (1, 10)],
    ///     |_, cur, new| cur + new
    /// );
    /// assert_eq!(m.get(&1), Some(&11));
    /// assert_eq!(m.get(&2), Some(&1));
    /// ```
    pub fn from_iter_with<E, F>(elts: E, mut f: F) -> Self
    where
        E: IntoIterator<Item = (K, V)>,
        F: FnMut(&K, V, V) -> V,
    {
        let mut b = Builder::new();
        for (k, v) in elts {
            b.push(k, v, &mut f)
        }
        Map { root: b.finish() }
    }

    /// return a new map with (k, v) inserted into it, and the value
    /// previously bound to k, if any. O(log N)
    pub fn insert(&self, k: K, v: V) -> (Self, Option<V>) {
        let (root, prev) = self.root.insert(k, v);
        (Map { root }, prev)
    }

    /// return a new map with k bound to f(current, v) if k was
    /// already bound to current, and to v otherwise. The
    /// insert-or-modify in one traversal. O(log N)
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m: Map<&str, u32> = Map::new();
    /// let m = m.insert_with("k", 1, |cur, new| cur + new);
    /// let m = m.insert_with("k", 10, |cur, new| cur + new);
    /// assert_eq!(m.get("k"), Some(&11));
    /// ```
    pub fn insert_with<F>(&self, k: K, v: V, mut f: F) -> Self
    where
        F: FnMut(&V, V) -> V,
    {
        let root = self.root.insert_combine(k, v, &mut |_, cur, new| f(cur, new));
        Map { root }
    }

    /// as insert_with, but f also sees the key
    pub fn insert_with_key<F>(&self, k: K, v: V, mut f: F) -> Self
    where
        F: FnMut(&K, &V, V) -> V,
    {
        let root = self.root.insert_combine(k, v, &mut f);
        Map { root }
    }

    /// return a new map with the binding for k removed, and the value
    /// that was bound to it, if any. Removing a key that isn't
    /// present returns a map equal to the input (and in fact sharing
    /// its entire representation). O(log N)
    pub fn remove<Q>(&self, k: &Q) -> (Self, Option<V>)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (root, prev) = self.root.remove(k);
        (Map { root }, prev)
    }

    /// return a new map with the value under k replaced by f of the
    /// current value. If k is not present the map is returned
    /// unchanged. O(log N)
    pub fn adjust<Q, F>(&self, k: &Q, f: F) -> Self
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&V) -> V,
    {
        let root = self.root.adjust(k, |_, v| f(v));
        Map { root }
    }

    /// as adjust, but f also sees the key
    pub fn adjust_with_key<Q, F>(&self, k: &Q, f: F) -> Self
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&K, &V) -> V,
    {
        let root = self.root.adjust(k, f);
        Map { root }
    }

    /// return a new map with the binding for k replaced by the result
    /// of f, removed if f returns None, and the previous value. If k
    /// is not present the map is returned unchanged. O(log N)
    pub fn update<Q, F>(&self, k: &Q, f: F) -> (Self, Option<V>)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        let (root, prev) = self.root.update(k, f);
        (Map { root }, prev)
    }

    /// The general single key edit: f observes the current binding of
    /// k (None when absent) and decides the new one (None to remove
    /// or leave absent). Insert, delete, replace and lookup are all
    /// special cases, and only one traversal is made. O(log N)
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m: Map<i32, i32> = vec![(1, 10)].into_iter().collect();
    /// let m = m.alter(1, |v| v.map(|v| v + 1)); // modify
    /// let m = m.alter(2, |_| Some(0));          // insert
    /// let m = m.alter(1, |_| None);             // delete
    /// assert_eq!(m.get(&1), None);
    /// assert_eq!(m.get(&2), Some(&0));
    /// ```
    pub fn alter<F>(&self, k: K, f: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let root = self.root.alter(k, f);
        Map { root }
    }

    /// as alter, but f additionally returns a value of the caller's
    /// choosing which is passed back out. This lets a caller observe
    /// and edit a key in one traversal, e.g. a cache returning the
    /// evicted value, without a separate get. For a side effect free
    /// f, `m.alter_f(k, f).0.get(&k)` holds whatever value f decided
    /// for `m.get(&k)`.
    pub fn alter_f<F, R>(&self, k: K, f: F) -> (Self, R)
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        let (root, r) = self.root.alter_f(k, f);
        (Map { root }, r)
    }

    /// lookup the value bound to k. O(log N) time, constant space.
    pub fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get(k)
    }

    /// lookup the key stored for k (useful when K carries data its
    /// ordering ignores). O(log N)
    pub fn get_key<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_key(k)
    }

    /// lookup both the stored key and the value bound to k. O(log N)
    pub fn get_full<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_full(k)
    }

    /// lookup the value bound to k, or return default if k is not
    /// present. O(log N)
    pub fn get_or<'a, Q>(&'a self, k: &Q, default: &'a V) -> &'a V
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get(k).unwrap_or(default)
    }

    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get(k).is_some()
    }

    /// the greatest entry with key strictly less than k. O(log N)
    pub fn get_lt<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_below(k, false)
    }

    /// the greatest entry with key less than or equal to k. O(log N)
    pub fn get_le<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_below(k, true)
    }

    /// the least entry with key strictly greater than k. O(log N)
    pub fn get_gt<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_above(k, false)
    }

    /// the least entry with key greater than or equal to k. O(log N)
    pub fn get_ge<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.get_above(k, true)
    }

    /// the entry with the least key. O(log N)
    pub fn first(&self) -> Option<(&K, &V)> {
        self.root.min_elt()
    }

    /// the entry with the greatest key. O(log N)
    pub fn last(&self) -> Option<(&K, &V)> {
        self.root.max_elt()
    }

    /// the entry with the least key, and the map without it. O(log N)
    pub fn pop_first(&self) -> Option<(K, V, Self)> {
        self.root.pop_min().map(|(k, v, root)| (k, v, Map { root }))
    }

    /// the entry with the greatest key, and the map without it. O(log N)
    pub fn pop_last(&self) -> Option<(K, V, Self)> {
        self.root.pop_max().map(|(k, v, root)| (k, v, Map { root }))
    }

    /// the entry of rank i in ascending key order, the persistent
    /// tree analogue of array indexing. O(log N)
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m: Map<i32, &str> = vec![(5, "a"), (3, "b")].into_iter().collect();
    /// assert_eq!(m.get_index(0), Some((&3, &"b")));
    /// assert_eq!(m.get_index(1), Some((&5, &"a")));
    /// assert_eq!(m.get_index(2), None);
    /// ```
    pub fn get_index(&self, i: usize) -> Option<(&K, &V)> {
        self.root.get_index(i)
    }

    /// the rank of k in ascending key order, if k is present. O(log N)
    pub fn index_of<Q>(&self, k: &Q) -> Option<usize>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.root.index_of(k)
    }

    /// as get_index, but panics when i is out of range. O(log N)
    pub fn nth(&self, i: usize) -> (&K, &V) {
        match self.root.get_index(i) {
            Some(kv) => kv,
            None => panic!("nth: index out of bounds"),
        }
    }

    /// as index_of, but panics when k is absent. O(log N)
    pub fn rank<Q>(&self, k: &Q) -> usize
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        match self.root.index_of(k) {
            Some(i) => i,
            None => panic!("rank: key not found"),
        }
    }

    /// the first n entries in ascending key order. If n >= len the
    /// whole map is returned. O(log N)
    pub fn take(&self, n: usize) -> Self {
        Map { root: self.root.take(n) }
    }

    /// the map without its first n entries. O(log N)
    pub fn skip(&self, n: usize) -> Self {
        Map { root: self.root.skip(n) }
    }

    /// the first n entries, and the rest. O(log N)
    pub fn split_at(&self, n: usize) -> (Self, Self) {
        let (l, r) = self.root.split_at(n);
        (Map { root: l }, Map { root: r })
    }

    /// replace the value of the entry of rank i with f of it.
    /// Panics if i is out of range, use get_index to stay total.
    /// O(log N)
    pub fn update_index<F>(&self, i: usize, f: F) -> Self
    where
        F: FnOnce(&K, &V) -> V,
    {
        Map { root: self.root.update_index(i, f) }
    }

    /// remove and return the entry of rank i. Panics if i is out of
    /// range. O(log N)
    pub fn remove_index(&self, i: usize) -> (Self, (K, V)) {
        let (root, kv) = self.root.remove_index(i);
        (Map { root }, kv)
    }

    /// partition the map into entries with keys less than k and
    /// entries with keys greater than k. The binding of k itself, if
    /// any, is in neither. O(log N)
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m: Map<i32, &str> = vec![(5, "a"), (3, "b")].into_iter().collect();
    /// let (lo, hi) = m.split(&4);
    /// assert_eq!(lo.get(&3), Some(&"b"));
    /// assert_eq!(lo.len(), 1);
    /// assert_eq!(hi.get(&5), Some(&"a"));
    /// assert_eq!(hi.len(), 1);
    /// ```
    pub fn split<Q>(&self, k: &Q) -> (Self, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (l, r) = self.root.split(k);
        (Map { root: l }, Map { root: r })
    }

    /// as split, additionally reporting the value bound to k, saving
    /// a second traversal. O(log N)
    pub fn split_lookup<Q>(&self, k: &Q) -> (Self, Option<V>, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (l, v, r) = self.root.split_lookup(k);
        (Map { root: l }, v, Map { root: r })
    }

    /// as split, additionally reporting whether k was present
    pub fn split_member<Q>(&self, k: &Q) -> (Self, bool, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (l, v, r) = self.root.split_lookup(k);
        (Map { root: l }, v.is_some(), Map { root: r })
    }

    /// the left biased union: on keys present in both maps the value
    /// from self wins. O(m log(n/m + 1)) for maps of size m <= n,
    /// asymptotically optimal. `m.union(&Map::new())` returns (a map
    /// sharing all the structure of) m.
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m0: Map<i32, &str> = vec![(5, "a"), (3, "b")].into_iter().collect();
    /// let m1: Map<i32, &str> = vec![(5, "A"), (7, "C")].into_iter().collect();
    /// let u = m0.union(&m1);
    /// assert_eq!(u.get(&3), Some(&"b"));
    /// assert_eq!(u.get(&5), Some(&"a"));
    /// assert_eq!(u.get(&7), Some(&"C"));
    /// ```
    pub fn union(&self, other: &Self) -> Self {
        Map { root: Tree::union(&self.root, &other.root) }
    }

    /// union combining the values of keys present in both maps with f
    pub fn union_with<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&V, &V) -> V,
    {
        let root = Tree::union_with(&self.root, &other.root, &mut |_, v0, v1| f(v0, v1));
        Map { root }
    }

    /// as union_with, but f also sees the key
    pub fn union_with_key<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
    {
        let root = Tree::union_with(&self.root, &other.root, &mut f);
        Map { root }
    }

    /// the map of keys present in both self and other, keeping the
    /// values from self. Same bound as union.
    pub fn intersection(&self, other: &Self) -> Self {
        Map { root: Tree::intersection(&self.root, &other.root) }
    }

    /// intersection combining the two values with f
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    ///
    /// let m0: Map<i32, String> = vec![(5, "a".into()), (3, "b".into())].into_iter().collect();
    /// let m1: Map<i32, String> = vec![(5, "A".into()), (7, "C".into())].into_iter().collect();
    /// let i = m0.intersection_with(&m1, |a, b| format!("{}{}", a, b));
    /// assert_eq!(i.len(), 1);
    /// assert_eq!(i.get(&5), Some(&"aA".into()));
    /// ```
    pub fn intersection_with<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&V, &V) -> V,
    {
        let root = Tree::intersection_with(&self.root, &other.root, &mut |_, v0, v1| f(v0, v1));
        Map { root }
    }

    /// as intersection_with, but f also sees the key
    pub fn intersection_with_key<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
    {
        let root = Tree::intersection_with(&self.root, &other.root, &mut f);
        Map { root }
    }

    /// the map of entries of self whose keys are not present in
    /// other. Same bound as union.
    pub fn difference(&self, other: &Self) -> Self {
        Map { root: Tree::difference(&self.root, &other.root) }
    }

    /// difference where f decides the fate of keys present in both:
    /// None removes the entry, Some(v) keeps it with value v
    pub fn difference_with<F>(&self, other: &Self, mut f: F) -> Self
    where
        F: FnMut(&K, &V, &V) -> Option<V>,
    {
        let root = Tree::difference_with(&self.root, &other.root, &mut f);
        Map { root }
    }

    /// the map of entries whose keys are present in exactly one of
    /// self and other. Same bound as union.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        Map { root: Tree::symmetric_difference(&self.root, &other.root) }
    }

    /// true when self and other share no key. Short circuits on the
    /// first shared key.
    pub fn disjoint(&self, other: &Self) -> bool {
        Tree::disjoint(&self.root, &other.root)
    }

    /// true when every entry of self is present in other with an
    /// equal value
    pub fn is_submap(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        Tree::is_submap_by(&self.root, &other.root, &mut |v0, v1| v0 == v1)
    }

    /// true when every key of self is present in other and f accepts
    /// the two values
    pub fn is_submap_by<F>(&self, other: &Self, mut f: F) -> bool
    where
        F: FnMut(&V, &V) -> bool,
    {
        Tree::is_submap_by(&self.root, &other.root, &mut f)
    }

    /// The fully generalized two map combine, of which the set
    /// algebra operations are special cases. missing_left handles
    /// keys present only in self, missing_right keys present only in
    /// other, and matched is given the key and both values for keys
    /// present in both, returning the value to keep, if any.
    /// Strategies run in ascending key order.
    ///
    /// # Examples
    /// ```
    /// use wbmap::map::Map;
    /// use wbmap::merge::{discard, preserve};
    ///
    /// let m0: Map<i32, i32> = vec![(1, 1), (2, 2)].into_iter().collect();
    /// let m1: Map<i32, i32> = vec![(2, 20), (3, 30)].into_iter().collect();
    ///
    /// // keys on either side kept, matched keys summed: an additive union
    /// let u = m0.merge(&m1, preserve(), preserve(), |_, a, b| Some(a + b));
    /// assert_eq!(u, vec![(1, 1), (2, 22), (3, 30)].into_iter().collect());
    ///
    /// // drop both unique sides: an intersection
    /// let i = m0.merge(&m1, discard(), discard(), |_, a, b| Some(a * b));
    /// assert_eq!(i, vec![(2, 40)].into_iter().collect());
    /// ```
    pub fn merge<F0, F1, F2>(
        &self,
        other: &Self,
        mut missing_left: WhenMissing<F0>,
        mut missing_right: WhenMissing<F1>,
        mut matched: F2,
    ) -> Self
    where
        F0: FnMut(&K, &V) -> Option<V>,
        F1: FnMut(&K, &V) -> Option<V>,
        F2: FnMut(&K, &V, &V) -> Option<V>,
    {
        let root = merge::merge_trees(
            &self.root,
            &other.root,
            &mut missing_left,
            &mut missing_right,
            &mut matched,
        );
        Map { root }
    }

    /// a map of the same shape with every value replaced by f of the
    /// entry. O(N)
    pub fn map_values<W, F>(&self, mut f: F) -> Map<K, W>
    where
        W: Clone,
        F: FnMut(&K, &V) -> W,
    {
        Map { root: self.root.map_vals(&mut f) }
    }

    /// the entries f accepts. O(N)
    pub fn filter<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
    {
        Map { root: self.root.filter(&mut f) }
    }

    /// keep the entries for which f returns Some, with the returned
    /// value. O(N)
    pub fn filter_map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&K, &V) -> Option<V>,
    {
        Map { root: self.root.filter_map(&mut f) }
    }

    /// the entries f accepts, and the entries it rejects. O(N)
    pub fn partition<F>(&self, mut f: F) -> (Self, Self)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let (t, f_) = self.root.partition(&mut f);
        (Map { root: t }, Map { root: f_ })
    }

    /// the set of keys of the map. O(N), and the tree shape is reused
    /// directly, no rebalancing happens.
    pub fn key_set(&self) -> Set<K> {
        Set(self.root.map_vals(&mut |_, _| ()))
    }

    /// iterate over all the entries in the map in ascending key
    /// order. The iterator is double ended, reverse it for descending
    /// order.
    pub fn iter(&self) -> Iter<K, K, V> {
        self.into_iter()
    }

    /// iterate over the keys in ascending order
    pub fn keys(&self) -> Keys<K, V> {
        Keys(self.into_iter())
    }

    /// iterate over the values in ascending key order
    pub fn values(&self) -> Values<K, V> {
        Values(self.into_iter())
    }

    /// iterate over the subset of entries within the given bounds.
    /// O(log N + M) time, constant space, M the number of elements
    /// examined. If lbound >= ubound the iterator is empty.
    pub fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> Iter<'a, Q, K, V>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        Iter::new(&self.root, lbound, ubound)
    }
}

impl<K, V> Map<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) {
        self.root.invariant()
    }
}
