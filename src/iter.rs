use crate::tree::{Node, Tree, MAX_DEPTH};
use arrayvec::ArrayVec;
use std::{borrow::Borrow, cmp::Ord, ops::Bound};

/// Double ended iterator over a tree in key order, optionally
/// restricted to a range of keys. Runs in O(log N + M) time and
/// constant space, N the number of elements in the tree, M the number
/// examined.
pub struct Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    lbound: Bound<Q>,
    ubound: Bound<Q>,
    // nodes whose entry is still to be yielded, left spine order
    stack: ArrayVec<&'a Node<K, V>, MAX_DEPTH>,
    stack_rev: ArrayVec<&'a Node<K, V>, MAX_DEPTH>,
    front: Option<&'a K>,
    back: Option<&'a K>,
}

impl<'a, Q, K, V> Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    pub(crate) fn new(t: &'a Tree<K, V>, lbound: Bound<Q>, ubound: Bound<Q>) -> Self {
        let mut iter = Iter {
            lbound,
            ubound,
            stack: ArrayVec::new(),
            stack_rev: ArrayVec::new(),
            front: None,
            back: None,
        };
        iter.push_left(t);
        iter.push_right(t);
        iter
    }

    fn above_lbound(&self, k: &K) -> bool {
        match &self.lbound {
            Bound::Unbounded => true,
            Bound::Included(bound) => k.borrow() >= bound,
            Bound::Excluded(bound) => k.borrow() > bound,
        }
    }

    fn below_ubound(&self, k: &K) -> bool {
        match &self.ubound {
            Bound::Unbounded => true,
            Bound::Included(bound) => k.borrow() <= bound,
            Bound::Excluded(bound) => k.borrow() < bound,
        }
    }

    // descend to the first in bounds key, stacking the nodes still
    // owed. Nodes below the lower bound are skipped, not stacked.
    fn push_left(&mut self, t: &'a Tree<K, V>) {
        let mut t = t;
        loop {
            match t {
                Tree::Empty => break,
                Tree::Node(n) => {
                    if self.above_lbound(&n.key) {
                        self.stack.push(n);
                        t = &n.left
                    } else {
                        t = &n.right
                    }
                }
            }
        }
    }

    fn push_right(&mut self, t: &'a Tree<K, V>) {
        let mut t = t;
        loop {
            match t {
                Tree::Empty => break,
                Tree::Node(n) => {
                    if self.below_ubound(&n.key) {
                        self.stack_rev.push(n);
                        t = &n.right
                    } else {
                        t = &n.left
                    }
                }
            }
        }
    }

    fn finished(&mut self) {
        self.stack.clear();
        self.stack_rev.clear();
    }
}

impl<'a, Q, K, V> Iterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        // everything stacked is already above the lower bound
        if !self.below_ubound(&n.key) {
            self.finished();
            return None;
        }
        if let Some(back) = self.back {
            if n.key >= *back {
                self.finished();
                return None;
            }
        }
        let right = &n.right;
        // borrow of self.stack via n ends here
        let mut t = right;
        loop {
            match t {
                Tree::Empty => break,
                Tree::Node(c) => {
                    self.stack.push(c);
                    t = &c.left
                }
            }
        }
        self.front = Some(&n.key);
        Some((&n.key, &n.val))
    }
}

impl<'a, Q, K, V> DoubleEndedIterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Borrow<Q> + Ord + Clone,
    V: 'a + Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let n = self.stack_rev.pop()?;
        if !self.above_lbound(&n.key) {
            self.finished();
            return None;
        }
        if let Some(front) = self.front {
            if n.key <= *front {
                self.finished();
                return None;
            }
        }
        let mut t = &n.left;
        loop {
            match t {
                Tree::Empty => break,
                Tree::Node(c) => {
                    self.stack_rev.push(c);
                    t = &c.right
                }
            }
        }
        self.back = Some(&n.key);
        Some((&n.key, &n.val))
    }
}

impl<'a, K, V> IntoIterator for &'a Tree<K, V>
where
    K: 'a + Borrow<K> + Ord + Clone,
    V: 'a + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        Iter::new(self, Bound::Unbounded, Bound::Unbounded)
    }
}

/// Iterator over the keys of a map in ascending order.
pub struct Keys<'a, K, V>(pub(crate) Iter<'a, K, K, V>)
where
    K: 'a + Ord + Clone,
    V: 'a + Clone;

impl<'a, K, V> Iterator for Keys<'a, K, V>
where
    K: 'a + Ord + Clone,
    V: 'a + Clone,
{
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V>
where
    K: 'a + Ord + Clone,
    V: 'a + Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

/// Iterator over the values of a map in ascending key order.
pub struct Values<'a, K, V>(pub(crate) Iter<'a, K, K, V>)
where
    K: 'a + Ord + Clone,
    V: 'a + Clone;

impl<'a, K, V> Iterator for Values<'a, K, V>
where
    K: 'a + Ord + Clone,
    V: 'a + Clone,
{
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V>
where
    K: 'a + Ord + Clone,
    V: 'a + Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
