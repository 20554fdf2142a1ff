use crate::iter::{Iter, Keys};
use crate::map::Map;
use crate::tree::Tree;
use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    iter::FromIterator,
    ops::Bound,
};

/// A persistent ordered set of keys, sharing its node shape with
/// [`Map`](crate::map::Map). All the balance logic lives in the tree
/// both wrap, the set stores a unit value under every key.
///
/// # Examples
/// ```
/// use wbmap::set::Set;
///
/// let s = Set::new()
///     .insert(1).0
///     .insert(2).0
///     .insert(3).0;
///
/// assert!(s.contains(&2));
/// assert!(!s.contains(&4));
/// assert_eq!(s.iter().cloned().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
#[derive(Clone)]
pub struct Set<K: Ord + Clone>(pub(crate) Tree<K, ()>);

impl<K> Default for Set<K>
where
    K: Ord + Clone,
{
    fn default() -> Set<K> {
        Set::new()
    }
}

impl<K> Hash for Set<K>
where
    K: Hash + Ord + Clone,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<K> PartialEq for Set<K>
where
    K: PartialEq + Ord + Clone,
{
    fn eq(&self, other: &Set<K>) -> bool {
        self.0 == other.0
    }
}

impl<K> Eq for Set<K> where K: Eq + Ord + Clone {}

impl<K> PartialOrd for Set<K>
where
    K: Ord + Clone,
{
    fn partial_cmp(&self, other: &Set<K>) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K> Ord for Set<K>
where
    K: Ord + Clone,
{
    fn cmp(&self, other: &Set<K>) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K> Debug for Set<K>
where
    K: Debug + Ord + Clone,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K> FromIterator<K> for Set<K>
where
    K: Ord + Clone,
{
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let m: Map<K, ()> = iter.into_iter().map(|k| (k, ())).collect();
        Set(m.root)
    }
}

impl<'a, K> IntoIterator for &'a Set<K>
where
    K: 'a + Borrow<K> + Ord + Clone,
{
    type Item = &'a K;
    type IntoIter = Keys<'a, K, ()>;
    fn into_iter(self) -> Self::IntoIter {
        Keys(self.0.into_iter())
    }
}

impl<K> Set<K>
where
    K: Ord + Clone,
{
    /// Create a new empty set
    pub fn new() -> Self {
        Set(Tree::new())
    }

    /// get the number of elements in the set. O(1)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// return a new set with k in it, and whether k was newly added.
    /// O(log N)
    pub fn insert(&self, k: K) -> (Self, bool) {
        let (root, prev) = self.0.insert(k, ());
        (Set(root), prev.is_none())
    }

    /// return a new set with k removed, and whether it was present.
    /// Removing an absent element returns a set sharing the entire
    /// input representation. O(log N)
    pub fn remove<Q>(&self, k: &Q) -> (Self, bool)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (root, prev) = self.0.remove(k);
        (Set(root), prev.is_some())
    }

    pub fn contains<Q>(&self, k: &Q) -> bool
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get(k).is_some()
    }

    /// the stored element equal to k, if any. O(log N)
    pub fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get_key(k)
    }

    /// the least element. O(log N)
    pub fn first(&self) -> Option<&K> {
        self.0.min_elt().map(|(k, _)| k)
    }

    /// the greatest element. O(log N)
    pub fn last(&self) -> Option<&K> {
        self.0.max_elt().map(|(k, _)| k)
    }

    /// the element of rank i in ascending order. O(log N)
    pub fn get_index(&self, i: usize) -> Option<&K> {
        self.0.get_index(i).map(|(k, _)| k)
    }

    /// the rank of k in ascending order, if present. O(log N)
    pub fn index_of<Q>(&self, k: &Q) -> Option<usize>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.index_of(k)
    }

    /// partition into elements less than and greater than k,
    /// reporting whether k itself was present. O(log N)
    pub fn split<Q>(&self, k: &Q) -> (Self, bool, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (l, v, r) = self.0.split_lookup(k);
        (Set(l), v.is_some(), Set(r))
    }

    /// the union of self and other, reusing whole subtrees of either
    /// operand where possible. O(m log(n/m + 1)) for sets of size
    /// m <= n.
    pub fn union(&self, other: &Self) -> Self {
        Set(Tree::union(&self.0, &other.0))
    }

    /// the elements present in both self and other. Same bound as
    /// union.
    pub fn intersection(&self, other: &Self) -> Self {
        Set(Tree::intersection(&self.0, &other.0))
    }

    /// the elements of self not present in other. Same bound as
    /// union.
    pub fn difference(&self, other: &Self) -> Self {
        Set(Tree::difference(&self.0, &other.0))
    }

    /// the elements present in exactly one of self and other. Same
    /// bound as union.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        Set(Tree::symmetric_difference(&self.0, &other.0))
    }

    /// true when self and other share no element
    pub fn disjoint(&self, other: &Self) -> bool {
        Tree::disjoint(&self.0, &other.0)
    }

    /// true when every element of self is in other
    pub fn is_subset(&self, other: &Self) -> bool {
        Tree::is_submap_by(&self.0, &other.0, &mut |_, _| true)
    }

    /// build a map binding every element of the set to f of it. O(N),
    /// the tree shape is reused directly, no rebalancing happens.
    ///
    /// # Examples
    /// ```
    /// use wbmap::set::Set;
    ///
    /// let s: Set<i32> = vec![1, 2, 3].into_iter().collect();
    /// let m = s.to_map(|k| k * 10);
    /// assert_eq!(m.get(&2), Some(&20));
    /// ```
    pub fn to_map<V, F>(&self, mut f: F) -> Map<K, V>
    where
        V: Clone,
        F: FnMut(&K) -> V,
    {
        Map { root: self.0.map_vals(&mut |k, _| f(k)) }
    }

    /// iterate in ascending order. Double ended.
    pub fn iter(&self) -> Keys<K, ()> {
        self.into_iter()
    }

    /// iterate over the elements within the given bounds in
    /// ascending order
    pub fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> SetRange<'a, Q, K>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        SetRange(Iter::new(&self.0, lbound, ubound))
    }
}

/// Iterator over a range of elements of a set in ascending order.
pub struct SetRange<'a, Q, K>(Iter<'a, Q, K, ()>)
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone;

impl<'a, Q, K> Iterator for SetRange<'a, Q, K>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
{
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
}

impl<'a, Q, K> DoubleEndedIterator for SetRange<'a, Q, K>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<K> Set<K>
where
    K: Ord + Clone + Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) {
        self.0.invariant()
    }
}
