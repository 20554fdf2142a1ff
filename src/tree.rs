use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    mem,
    sync::Arc,
};

/// Weight balance factor. A node is balanced when neither child holds
/// more than DELTA times as many elements as its sibling (trees of two
/// or fewer elements are exempt). Tuned empirically along with RATIO,
/// see Hirai and Yamamoto, "Balancing weight-balanced trees".
pub(crate) const DELTA: usize = 3;

/// Rotation selector. A single rotation is used while the inner
/// grandchild holds less than RATIO times the elements of the outer
/// one, otherwise a double rotation is needed.
pub(crate) const RATIO: usize = 2;

/// With DELTA = 3 every step down the tree sheds at least a quarter of
/// the elements, so the depth is bounded by log(n) base 4/3, about
/// 2.41 * log2(n). 156 levels covers any tree addressable on a 64 bit
/// machine.
pub(crate) const MAX_DEPTH: usize = 156;

/// Capacity of the direction bit path recorded by alter_f.
pub(crate) const PATH_BITS: u32 = u64::BITS;

/// Largest tree size for which a root to leaf path is guaranteed to
/// fit in PATH_BITS direction bits. log2(2^26) / log2(4/3) + 1 < 64.
/// Bigger trees fall back to the recursive alter, which has no depth
/// limit.
pub(crate) const BOUNDED_PATH_MAX_SIZE: usize = 1 << 26;

#[derive(Clone, Debug)]
pub(crate) struct Node<K: Ord + Clone, V: Clone> {
    pub(crate) size: usize,
    pub(crate) key: K,
    pub(crate) val: V,
    pub(crate) left: Tree<K, V>,
    pub(crate) right: Tree<K, V>,
}

#[derive(Clone)]
pub(crate) enum Tree<K: Ord + Clone, V: Clone> {
    Empty,
    Node(Arc<Node<K, V>>),
}

impl<K, V> Default for Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    fn default() -> Tree<K, V> {
        Tree::Empty
    }
}

impl<K, V> Hash for Tree<K, V>
where
    K: Hash + Ord + Clone,
    V: Hash + Clone,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        for elt in self {
            elt.hash(state)
        }
    }
}

impl<K, V> PartialEq for Tree<K, V>
where
    K: PartialEq + Ord + Clone,
    V: PartialEq + Clone,
{
    fn eq(&self, other: &Tree<K, V>) -> bool {
        self.len() == other.len() && self.into_iter().zip(other).all(|(e0, e1)| e0 == e1)
    }
}

impl<K, V> Eq for Tree<K, V>
where
    K: Eq + Ord + Clone,
    V: Eq + Clone,
{
}

impl<K, V> PartialOrd for Tree<K, V>
where
    K: Ord + Clone,
    V: PartialOrd + Clone,
{
    fn partial_cmp(&self, other: &Tree<K, V>) -> Option<Ordering> {
        self.into_iter().partial_cmp(other.into_iter())
    }
}

impl<K, V> Ord for Tree<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    fn cmp(&self, other: &Tree<K, V>) -> Ordering {
        self.into_iter().cmp(other.into_iter())
    }
}

impl<K, V> Debug for Tree<K, V>
where
    K: Debug + Ord + Clone,
    V: Debug + Clone,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.into_iter()).finish()
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Tree::Empty
    }

    pub(crate) fn singleton(k: K, v: V) -> Self {
        Tree::create(k, v, &Tree::Empty, &Tree::Empty)
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Node(n) => n.size,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Tree::Empty => true,
            Tree::Node(..) => false,
        }
    }

    // the two trees are the same allocation. Advisory only, used to
    // skip rebuilding when a result is provably identical to an
    // operand, never to decide a visible outcome.
    pub(crate) fn same(t0: &Tree<K, V>, t1: &Tree<K, V>) -> bool {
        match (t0, t1) {
            (Tree::Empty, Tree::Empty) => true,
            (Tree::Node(n0), Tree::Node(n1)) => Arc::ptr_eq(n0, n1),
            (_, _) => false,
        }
    }

    fn create(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        Tree::Node(Arc::new(Node {
            size: 1 + l.len() + r.len(),
            key: k,
            val: v,
            left: l.clone(),
            right: r.clone(),
        }))
    }

    /*
     * balance engine
     */

    // restore the invariant when l may have gained or r may have lost
    // one element. O(1)
    fn balance_l(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        let (sl, sr) = (l.len(), r.len());
        if sl + sr <= 1 || sl <= DELTA * sr {
            Tree::create(k, v, l, r)
        } else {
            Tree::rotate_r(k, v, l, r)
        }
    }

    // mirror of balance_l
    fn balance_r(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        let (sl, sr) = (l.len(), r.len());
        if sl + sr <= 1 || sr <= DELTA * sl {
            Tree::create(k, v, l, r)
        } else {
            Tree::rotate_l(k, v, l, r)
        }
    }

    // restore the invariant when either side may have changed by one
    // element
    fn balance(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        let (sl, sr) = (l.len(), r.len());
        if sl + sr <= 1 {
            Tree::create(k, v, l, r)
        } else if sl > DELTA * sr {
            Tree::rotate_r(k, v, l, r)
        } else if sr > DELTA * sl {
            Tree::rotate_l(k, v, l, r)
        } else {
            Tree::create(k, v, l, r)
        }
    }

    fn rotate_r(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        let ln = match l {
            Tree::Node(n) => n,
            Tree::Empty => panic!("rotate_r: mis-sized subtrees"),
        };
        if ln.right.len() < RATIO * ln.left.len() {
            Tree::create(
                ln.key.clone(),
                ln.val.clone(),
                &ln.left,
                &Tree::create(k, v, &ln.right, r),
            )
        } else {
            let lrn = match &ln.right {
                Tree::Node(n) => n,
                Tree::Empty => panic!("rotate_r: mis-sized subtrees"),
            };
            Tree::create(
                lrn.key.clone(),
                lrn.val.clone(),
                &Tree::create(ln.key.clone(), ln.val.clone(), &ln.left, &lrn.left),
                &Tree::create(k, v, &lrn.right, r),
            )
        }
    }

    fn rotate_l(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        let rn = match r {
            Tree::Node(n) => n,
            Tree::Empty => panic!("rotate_l: mis-sized subtrees"),
        };
        if rn.left.len() < RATIO * rn.right.len() {
            Tree::create(
                rn.key.clone(),
                rn.val.clone(),
                &Tree::create(k, v, l, &rn.left),
                &rn.right,
            )
        } else {
            let rln = match &rn.left {
                Tree::Node(n) => n,
                Tree::Empty => panic!("rotate_l: mis-sized subtrees"),
            };
            Tree::create(
                rln.key.clone(),
                rln.val.clone(),
                &Tree::create(k, v, l, &rln.left),
                &Tree::create(rn.key.clone(), rn.val.clone(), &rln.right, &rn.right),
            )
        }
    }

    /*
     * link and glue engine
     */

    fn insert_min(&self, k: K, v: V) -> Self {
        match self {
            Tree::Empty => Tree::singleton(k, v),
            Tree::Node(n) => Tree::balance_l(
                n.key.clone(),
                n.val.clone(),
                &n.left.insert_min(k, v),
                &n.right,
            ),
        }
    }

    fn insert_max(&self, k: K, v: V) -> Self {
        match self {
            Tree::Empty => Tree::singleton(k, v),
            Tree::Node(n) => Tree::balance_r(
                n.key.clone(),
                n.val.clone(),
                &n.left,
                &n.right.insert_max(k, v),
            ),
        }
    }

    // build a balanced tree from two balanced trees of arbitrary
    // relative size and a key separating them (all keys in l < k <
    // all keys in r). O(log(max(|l|, |r|) / min(|l|, |r|) + 1))
    pub(crate) fn link(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (Tree::Empty, _) => r.insert_min(k, v),
            (_, Tree::Empty) => l.insert_max(k, v),
            (Tree::Node(ln), Tree::Node(rn)) => {
                if DELTA * ln.size < rn.size {
                    Tree::balance_l(
                        rn.key.clone(),
                        rn.val.clone(),
                        &Tree::link(k, v, l, &rn.left),
                        &rn.right,
                    )
                } else if DELTA * rn.size < ln.size {
                    Tree::balance_r(
                        ln.key.clone(),
                        ln.val.clone(),
                        &ln.left,
                        &Tree::link(k, v, &ln.right, r),
                    )
                } else {
                    Tree::create(k, v, l, r)
                }
            }
        }
    }

    // link for the case where only l may be oversized relative to r
    fn link_l(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (Tree::Empty, _) => r.insert_min(k, v),
            (_, Tree::Empty) => l.insert_max(k, v),
            (Tree::Node(ln), Tree::Node(rn)) => {
                if DELTA * rn.size < ln.size {
                    Tree::balance_r(
                        ln.key.clone(),
                        ln.val.clone(),
                        &ln.left,
                        &Tree::link_l(k, v, &ln.right, r),
                    )
                } else {
                    Tree::create(k, v, l, r)
                }
            }
        }
    }

    // link for the case where only r may be oversized relative to l
    fn link_r(k: K, v: V, l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (Tree::Empty, _) => r.insert_min(k, v),
            (_, Tree::Empty) => l.insert_max(k, v),
            (Tree::Node(ln), Tree::Node(rn)) => {
                if DELTA * ln.size < rn.size {
                    Tree::balance_l(
                        rn.key.clone(),
                        rn.val.clone(),
                        &Tree::link_r(k, v, l, &rn.left),
                        &rn.right,
                    )
                } else {
                    Tree::create(k, v, l, r)
                }
            }
        }
    }

    fn min_view(n: &Node<K, V>) -> (K, V, Tree<K, V>) {
        match &n.left {
            Tree::Empty => (n.key.clone(), n.val.clone(), n.right.clone()),
            Tree::Node(ln) => {
                let (k, v, l) = Tree::min_view(ln);
                (k, v, Tree::balance_r(n.key.clone(), n.val.clone(), &l, &n.right))
            }
        }
    }

    fn max_view(n: &Node<K, V>) -> (K, V, Tree<K, V>) {
        match &n.right {
            Tree::Empty => (n.key.clone(), n.val.clone(), n.left.clone()),
            Tree::Node(rn) => {
                let (k, v, r) = Tree::max_view(rn);
                (k, v, Tree::balance_l(n.key.clone(), n.val.clone(), &n.left, &r))
            }
        }
    }

    // merge two trees already balanced with respect to each other,
    // with no separating key. The extreme element of the larger side
    // becomes the new root. Used when a key is deleted from the
    // middle of a tree. O(log n)
    pub(crate) fn glue(l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (Tree::Empty, _) => r.clone(),
            (_, Tree::Empty) => l.clone(),
            (Tree::Node(ln), Tree::Node(rn)) => {
                if ln.size > rn.size {
                    let (k, v, l) = Tree::max_view(ln);
                    Tree::balance_r(k, v, &l, r)
                } else {
                    let (k, v, r) = Tree::min_view(rn);
                    Tree::balance_l(k, v, l, &r)
                }
            }
        }
    }

    // general merge of two trees with no separating key and no known
    // balance relationship
    pub(crate) fn link2(l: &Tree<K, V>, r: &Tree<K, V>) -> Self {
        match (l, r) {
            (Tree::Empty, _) => r.clone(),
            (_, Tree::Empty) => l.clone(),
            (Tree::Node(ln), Tree::Node(rn)) => {
                if DELTA * ln.size < rn.size {
                    Tree::balance_l(
                        rn.key.clone(),
                        rn.val.clone(),
                        &Tree::link2(l, &rn.left),
                        &rn.right,
                    )
                } else if DELTA * rn.size < ln.size {
                    Tree::balance_r(
                        ln.key.clone(),
                        ln.val.clone(),
                        &ln.left,
                        &Tree::link2(&ln.right, r),
                    )
                } else {
                    Tree::glue(l, r)
                }
            }
        }
    }

    /*
     * query engine
     */

    // structured as a loop so the optimizer can inline the closure
    // argument, which measures faster than the recursive version
    fn get_gen<'a, Q, F, R>(&'a self, k: &Q, f: F) -> Option<R>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&'a Node<K, V>) -> R,
        R: 'a,
    {
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => match k.cmp(n.key.borrow()) {
                    Ordering::Less => t = &n.left,
                    Ordering::Greater => t = &n.right,
                    Ordering::Equal => break Some(f(n)),
                },
            }
        }
    }

    pub(crate) fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| &n.val)
    }

    pub(crate) fn get_key<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| &n.key)
    }

    pub(crate) fn get_full<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |n| (&n.key, &n.val))
    }

    // largest entry with key < k (or <= k when inclusive), tracking
    // the best candidate seen on the way down
    pub(crate) fn get_below<'a, Q>(&'a self, k: &Q, inclusive: bool) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let mut best = None;
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break best,
                Tree::Node(n) => match k.cmp(n.key.borrow()) {
                    Ordering::Less => t = &n.left,
                    Ordering::Equal if inclusive => break Some((&n.key, &n.val)),
                    Ordering::Equal => t = &n.left,
                    Ordering::Greater => {
                        best = Some((&n.key, &n.val));
                        t = &n.right
                    }
                },
            }
        }
    }

    // mirror of get_below
    pub(crate) fn get_above<'a, Q>(&'a self, k: &Q, inclusive: bool) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let mut best = None;
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break best,
                Tree::Node(n) => match k.cmp(n.key.borrow()) {
                    Ordering::Greater => t = &n.right,
                    Ordering::Equal if inclusive => break Some((&n.key, &n.val)),
                    Ordering::Equal => t = &n.right,
                    Ordering::Less => {
                        best = Some((&n.key, &n.val));
                        t = &n.left
                    }
                },
            }
        }
    }

    pub(crate) fn min_elt(&self) -> Option<(&K, &V)> {
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => match &n.left {
                    Tree::Empty => break Some((&n.key, &n.val)),
                    Tree::Node(_) => t = &n.left,
                },
            }
        }
    }

    pub(crate) fn max_elt(&self) -> Option<(&K, &V)> {
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => match &n.right {
                    Tree::Empty => break Some((&n.key, &n.val)),
                    Tree::Node(_) => t = &n.right,
                },
            }
        }
    }

    pub(crate) fn pop_min(&self) -> Option<(K, V, Self)> {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => Some(Tree::min_view(n)),
        }
    }

    pub(crate) fn pop_max(&self) -> Option<(K, V, Self)> {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => Some(Tree::max_view(n)),
        }
    }

    /*
     * order statistics. The cached sizes give log(N) access by rank,
     * the persistent tree analogue of array indexing.
     */

    pub(crate) fn get_index(&self, mut i: usize) -> Option<(&K, &V)> {
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => {
                    let sl = n.left.len();
                    match i.cmp(&sl) {
                        Ordering::Less => t = &n.left,
                        Ordering::Equal => break Some((&n.key, &n.val)),
                        Ordering::Greater => {
                            i = i - sl - 1;
                            t = &n.right
                        }
                    }
                }
            }
        }
    }

    pub(crate) fn index_of<Q>(&self, k: &Q) -> Option<usize>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let mut t = self;
        let mut acc = 0;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => match k.cmp(n.key.borrow()) {
                    Ordering::Less => t = &n.left,
                    Ordering::Equal => break Some(acc + n.left.len()),
                    Ordering::Greater => {
                        acc += n.left.len() + 1;
                        t = &n.right
                    }
                },
            }
        }
    }

    pub(crate) fn take(&self, i: usize) -> Self {
        if i >= self.len() {
            return self.clone();
        }
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => {
                let sl = n.left.len();
                if i <= sl {
                    n.left.take(i)
                } else {
                    Tree::link_l(n.key.clone(), n.val.clone(), &n.left, &n.right.take(i - sl - 1))
                }
            }
        }
    }

    pub(crate) fn skip(&self, i: usize) -> Self {
        if i == 0 {
            return self.clone();
        }
        if i >= self.len() {
            return Tree::Empty;
        }
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => {
                let sl = n.left.len();
                if i <= sl {
                    Tree::link_r(n.key.clone(), n.val.clone(), &n.left.skip(i), &n.right)
                } else {
                    n.right.skip(i - sl - 1)
                }
            }
        }
    }

    pub(crate) fn split_at(&self, i: usize) -> (Self, Self) {
        if i == 0 {
            return (Tree::Empty, self.clone());
        }
        if i >= self.len() {
            return (self.clone(), Tree::Empty);
        }
        match self {
            Tree::Empty => (Tree::Empty, Tree::Empty),
            Tree::Node(n) => {
                let sl = n.left.len();
                if i <= sl {
                    let (l, r) = n.left.split_at(i);
                    (l, Tree::link_r(n.key.clone(), n.val.clone(), &r, &n.right))
                } else {
                    let (l, r) = n.right.split_at(i - sl - 1);
                    (Tree::link_l(n.key.clone(), n.val.clone(), &n.left, &l), r)
                }
            }
        }
    }

    pub(crate) fn update_index<F>(&self, i: usize, f: F) -> Self
    where
        F: FnOnce(&K, &V) -> V,
    {
        match self {
            Tree::Empty => panic!("update_index: index out of bounds"),
            Tree::Node(n) => {
                let sl = n.left.len();
                match i.cmp(&sl) {
                    Ordering::Less => Tree::create(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left.update_index(i, f),
                        &n.right,
                    ),
                    Ordering::Equal => {
                        let v = f(&n.key, &n.val);
                        Tree::create(n.key.clone(), v, &n.left, &n.right)
                    }
                    Ordering::Greater => Tree::create(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left,
                        &n.right.update_index(i - sl - 1, f),
                    ),
                }
            }
        }
    }

    pub(crate) fn remove_index(&self, i: usize) -> (Self, (K, V)) {
        match self {
            Tree::Empty => panic!("remove_index: index out of bounds"),
            Tree::Node(n) => {
                let sl = n.left.len();
                match i.cmp(&sl) {
                    Ordering::Less => {
                        let (l, kv) = n.left.remove_index(i);
                        (Tree::balance_r(n.key.clone(), n.val.clone(), &l, &n.right), kv)
                    }
                    Ordering::Equal => (
                        Tree::glue(&n.left, &n.right),
                        (n.key.clone(), n.val.clone()),
                    ),
                    Ordering::Greater => {
                        let (r, kv) = n.right.remove_index(i - sl - 1);
                        (Tree::balance_l(n.key.clone(), n.val.clone(), &n.left, &r), kv)
                    }
                }
            }
        }
    }

    /*
     * mutation engine
     */

    pub(crate) fn insert(&self, k: K, v: V) -> (Self, Option<V>) {
        match self {
            Tree::Empty => (Tree::singleton(k, v), None),
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => {
                    let (l, prev) = n.left.insert(k, v);
                    (Tree::balance_l(n.key.clone(), n.val.clone(), &l, &n.right), prev)
                }
                Ordering::Greater => {
                    let (r, prev) = n.right.insert(k, v);
                    (Tree::balance_r(n.key.clone(), n.val.clone(), &n.left, &r), prev)
                }
                Ordering::Equal => (
                    Tree::create(k, v, &n.left, &n.right),
                    Some(n.val.clone()),
                ),
            },
        }
    }

    // f is given the stored key, the current value, and the new
    // value, and decides what is stored
    pub(crate) fn insert_combine<F>(&self, k: K, v: V, f: &mut F) -> Self
    where
        F: FnMut(&K, &V, V) -> V,
    {
        match self {
            Tree::Empty => Tree::singleton(k, v),
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => Tree::balance_l(
                    n.key.clone(),
                    n.val.clone(),
                    &n.left.insert_combine(k, v, f),
                    &n.right,
                ),
                Ordering::Greater => Tree::balance_r(
                    n.key.clone(),
                    n.val.clone(),
                    &n.left,
                    &n.right.insert_combine(k, v, f),
                ),
                Ordering::Equal => {
                    let v = f(&n.key, &n.val, v);
                    Tree::create(k, v, &n.left, &n.right)
                }
            },
        }
    }

    // insert only if the key is absent, sharing the whole input when
    // it is present
    pub(crate) fn insert_if_absent(&self, k: K, v: V) -> Self {
        match self {
            Tree::Empty => Tree::singleton(k, v),
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => {
                    let l = n.left.insert_if_absent(k, v);
                    if Tree::same(&l, &n.left) {
                        self.clone()
                    } else {
                        Tree::balance_l(n.key.clone(), n.val.clone(), &l, &n.right)
                    }
                }
                Ordering::Greater => {
                    let r = n.right.insert_if_absent(k, v);
                    if Tree::same(&r, &n.right) {
                        self.clone()
                    } else {
                        Tree::balance_r(n.key.clone(), n.val.clone(), &n.left, &r)
                    }
                }
                Ordering::Equal => self.clone(),
            },
        }
    }

    pub(crate) fn remove<Q>(&self, k: &Q) -> (Self, Option<V>)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        match self {
            Tree::Empty => (Tree::Empty, None),
            Tree::Node(n) => match k.cmp(n.key.borrow()) {
                Ordering::Less => {
                    let (l, prev) = n.left.remove(k);
                    if prev.is_none() {
                        (self.clone(), None)
                    } else {
                        (Tree::balance_r(n.key.clone(), n.val.clone(), &l, &n.right), prev)
                    }
                }
                Ordering::Greater => {
                    let (r, prev) = n.right.remove(k);
                    if prev.is_none() {
                        (self.clone(), None)
                    } else {
                        (Tree::balance_l(n.key.clone(), n.val.clone(), &n.left, &r), prev)
                    }
                }
                Ordering::Equal => (Tree::glue(&n.left, &n.right), Some(n.val.clone())),
            },
        }
    }

    // modify the value under k if present, sharing the whole input
    // when it is absent. The shape of the tree cannot change.
    pub(crate) fn adjust<Q, F>(&self, k: &Q, f: F) -> Self
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&K, &V) -> V,
    {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => match k.cmp(n.key.borrow()) {
                Ordering::Less => {
                    let l = n.left.adjust(k, f);
                    if Tree::same(&l, &n.left) {
                        self.clone()
                    } else {
                        Tree::create(n.key.clone(), n.val.clone(), &l, &n.right)
                    }
                }
                Ordering::Greater => {
                    let r = n.right.adjust(k, f);
                    if Tree::same(&r, &n.right) {
                        self.clone()
                    } else {
                        Tree::create(n.key.clone(), n.val.clone(), &n.left, &r)
                    }
                }
                Ordering::Equal => {
                    let v = f(&n.key, &n.val);
                    Tree::create(n.key.clone(), v, &n.left, &n.right)
                }
            },
        }
    }

    // modify or delete the value under k, sharing the whole input
    // when it is absent. Returns the previous value.
    pub(crate) fn update<Q, F>(&self, k: &Q, f: F) -> (Self, Option<V>)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        match self {
            Tree::Empty => (Tree::Empty, None),
            Tree::Node(n) => match k.cmp(n.key.borrow()) {
                Ordering::Less => {
                    let (l, prev) = n.left.update(k, f);
                    if prev.is_none() {
                        (self.clone(), None)
                    } else {
                        (Tree::balance_r(n.key.clone(), n.val.clone(), &l, &n.right), prev)
                    }
                }
                Ordering::Greater => {
                    let (r, prev) = n.right.update(k, f);
                    if prev.is_none() {
                        (self.clone(), None)
                    } else {
                        (Tree::balance_l(n.key.clone(), n.val.clone(), &n.left, &r), prev)
                    }
                }
                Ordering::Equal => match f(&n.key, &n.val) {
                    Some(v) => (
                        Tree::create(n.key.clone(), v, &n.left, &n.right),
                        Some(n.val.clone()),
                    ),
                    None => (Tree::glue(&n.left, &n.right), Some(n.val.clone())),
                },
            },
        }
    }

    /*
     * path tracked key combinator. One traversal inspects the current
     * binding, runs an arbitrary caller strategy, and materializes
     * whatever the strategy decides (insert, delete, replace, leave
     * absent) by replaying recorded direction bits with no further
     * key comparisons.
     */

    pub(crate) fn alter<F>(&self, k: K, f: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        self.alter_f(k, |v| (f(v), ())).0
    }

    pub(crate) fn alter_f<F, R>(&self, k: K, f: F) -> (Self, R)
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        if self.len() > BOUNDED_PATH_MAX_SIZE {
            self.alter_f_unbounded(k, f)
        } else {
            self.alter_f_bounded(k, f)
        }
    }

    fn alter_f_bounded<F, R>(&self, k: K, f: F) -> (Self, R)
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        let mut path: u64 = 0;
        let mut depth: u32 = 0;
        let mut t = self;
        let found = loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(n) => match k.cmp(&n.key) {
                    Ordering::Equal => break Some(n),
                    Ordering::Less => {
                        debug_assert!(depth < PATH_BITS);
                        path <<= 1;
                        depth += 1;
                        t = &n.left
                    }
                    Ordering::Greater => {
                        debug_assert!(depth < PATH_BITS);
                        path = (path << 1) | 1;
                        depth += 1;
                        t = &n.right
                    }
                },
            }
        };
        match found {
            Some(n) => {
                let (res, out) = f(Some(&n.val));
                match res {
                    Some(v) => (self.replace_along(path, depth, k, v), out),
                    None => (self.remove_along(path, depth), out),
                }
            }
            None => {
                let (res, out) = f(None);
                match res {
                    Some(v) => (self.insert_along(path, depth, k, v), out),
                    None => (self.clone(), out),
                }
            }
        }
    }

    fn insert_along(&self, path: u64, depth: u32, k: K, v: V) -> Self {
        match self {
            Tree::Empty => Tree::singleton(k, v),
            Tree::Node(n) => {
                if (path >> (depth - 1)) & 1 == 0 {
                    Tree::balance_l(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left.insert_along(path, depth - 1, k, v),
                        &n.right,
                    )
                } else {
                    Tree::balance_r(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left,
                        &n.right.insert_along(path, depth - 1, k, v),
                    )
                }
            }
        }
    }

    fn remove_along(&self, path: u64, depth: u32) -> Self {
        match self {
            Tree::Empty => panic!("remove_along: stale path"),
            Tree::Node(n) => {
                if depth == 0 {
                    Tree::glue(&n.left, &n.right)
                } else if (path >> (depth - 1)) & 1 == 0 {
                    Tree::balance_r(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left.remove_along(path, depth - 1),
                        &n.right,
                    )
                } else {
                    Tree::balance_l(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left,
                        &n.right.remove_along(path, depth - 1),
                    )
                }
            }
        }
    }

    fn replace_along(&self, path: u64, depth: u32, k: K, v: V) -> Self {
        match self {
            Tree::Empty => panic!("replace_along: stale path"),
            Tree::Node(n) => {
                if depth == 0 {
                    Tree::create(k, v, &n.left, &n.right)
                } else if (path >> (depth - 1)) & 1 == 0 {
                    Tree::create(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left.replace_along(path, depth - 1, k, v),
                        &n.right,
                    )
                } else {
                    Tree::create(
                        n.key.clone(),
                        n.val.clone(),
                        &n.left,
                        &n.right.replace_along(path, depth - 1, k, v),
                    )
                }
            }
        }
    }

    // no depth limit, constant factor slower than the bit path. The
    // call stack threads the reconstruction instead of recorded bits.
    pub(crate) fn alter_f_unbounded<F, R>(&self, k: K, f: F) -> (Self, R)
    where
        F: FnOnce(Option<&V>) -> (Option<V>, R),
    {
        match self {
            Tree::Empty => {
                let (res, out) = f(None);
                match res {
                    Some(v) => (Tree::singleton(k, v), out),
                    None => (Tree::Empty, out),
                }
            }
            Tree::Node(n) => match k.cmp(&n.key) {
                Ordering::Less => {
                    let (l, out) = n.left.alter_f_unbounded(k, f);
                    (Tree::balance(n.key.clone(), n.val.clone(), &l, &n.right), out)
                }
                Ordering::Greater => {
                    let (r, out) = n.right.alter_f_unbounded(k, f);
                    (Tree::balance(n.key.clone(), n.val.clone(), &n.left, &r), out)
                }
                Ordering::Equal => {
                    let (res, out) = f(Some(&n.val));
                    match res {
                        Some(v) => (Tree::create(k, v, &n.left, &n.right), out),
                        None => (Tree::glue(&n.left, &n.right), out),
                    }
                }
            },
        }
    }

    /*
     * split and set algebra engine
     */

    // partition into keys < k and keys > k, reporting the binding of
    // k itself if present. O(log n)
    pub(crate) fn split_lookup<Q>(&self, k: &Q) -> (Self, Option<V>, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        match self {
            Tree::Empty => (Tree::Empty, None, Tree::Empty),
            Tree::Node(n) => match k.cmp(n.key.borrow()) {
                Ordering::Less => {
                    let (ll, v, lr) = n.left.split_lookup(k);
                    (ll, v, Tree::link_r(n.key.clone(), n.val.clone(), &lr, &n.right))
                }
                Ordering::Greater => {
                    let (rl, v, rr) = n.right.split_lookup(k);
                    (Tree::link_l(n.key.clone(), n.val.clone(), &n.left, &rl), v, rr)
                }
                Ordering::Equal => (n.left.clone(), Some(n.val.clone()), n.right.clone()),
            },
        }
    }

    pub(crate) fn split<Q>(&self, k: &Q) -> (Self, Self)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let (l, _, r) = self.split_lookup(k);
        (l, r)
    }

    // left biased union. O(m log(n/m + 1)) for maps of size m <= n
    pub(crate) fn union(t0: &Tree<K, V>, t1: &Tree<K, V>) -> Self {
        match (t0, t1) {
            (Tree::Empty, _) => t1.clone(),
            (_, Tree::Empty) => t0.clone(),
            (Tree::Node(n0), Tree::Node(n1)) => {
                if n0.size == 1 {
                    return t1.insert(n0.key.clone(), n0.val.clone()).0;
                }
                if n1.size == 1 {
                    return t0.insert_if_absent(n1.key.clone(), n1.val.clone());
                }
                let (l1, _, r1) = t1.split_lookup(&n0.key);
                let l = Tree::union(&n0.left, &l1);
                let r = Tree::union(&n0.right, &r1);
                if Tree::same(&l, &n0.left) && Tree::same(&r, &n0.right) {
                    t0.clone()
                } else {
                    Tree::link(n0.key.clone(), n0.val.clone(), &l, &r)
                }
            }
        }
    }

    pub(crate) fn union_with<F>(t0: &Tree<K, V>, t1: &Tree<K, V>, f: &mut F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
    {
        match (t0, t1) {
            (Tree::Empty, _) => t1.clone(),
            (_, Tree::Empty) => t0.clone(),
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                let l = Tree::union_with(&n0.left, &l1, f);
                let r = Tree::union_with(&n0.right, &r1, f);
                let v = match matched {
                    None => n0.val.clone(),
                    Some(v1) => f(&n0.key, &n0.val, &v1),
                };
                Tree::link(n0.key.clone(), v, &l, &r)
            }
        }
    }

    pub(crate) fn intersection(t0: &Tree<K, V>, t1: &Tree<K, V>) -> Self {
        match (t0, t1) {
            (Tree::Empty, _) | (_, Tree::Empty) => Tree::Empty,
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                let l = Tree::intersection(&n0.left, &l1);
                let r = Tree::intersection(&n0.right, &r1);
                match matched {
                    Some(_) => {
                        if Tree::same(&l, &n0.left) && Tree::same(&r, &n0.right) {
                            t0.clone()
                        } else {
                            Tree::link(n0.key.clone(), n0.val.clone(), &l, &r)
                        }
                    }
                    None => Tree::link2(&l, &r),
                }
            }
        }
    }

    pub(crate) fn intersection_with<F>(t0: &Tree<K, V>, t1: &Tree<K, V>, f: &mut F) -> Self
    where
        F: FnMut(&K, &V, &V) -> V,
    {
        match (t0, t1) {
            (Tree::Empty, _) | (_, Tree::Empty) => Tree::Empty,
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                let l = Tree::intersection_with(&n0.left, &l1, f);
                let r = Tree::intersection_with(&n0.right, &r1, f);
                match matched {
                    Some(v1) => {
                        let v = f(&n0.key, &n0.val, &v1);
                        Tree::link(n0.key.clone(), v, &l, &r)
                    }
                    None => Tree::link2(&l, &r),
                }
            }
        }
    }

    pub(crate) fn difference(t0: &Tree<K, V>, t1: &Tree<K, V>) -> Self {
        match (t0, t1) {
            (Tree::Empty, _) => Tree::Empty,
            (_, Tree::Empty) => t0.clone(),
            (_, Tree::Node(n1)) => {
                let (l0, _, r0) = t0.split_lookup(&n1.key);
                let l = Tree::difference(&l0, &n1.left);
                let r = Tree::difference(&r0, &n1.right);
                if l.len() + r.len() == t0.len() {
                    t0.clone()
                } else {
                    Tree::link2(&l, &r)
                }
            }
        }
    }

    pub(crate) fn difference_with<F>(t0: &Tree<K, V>, t1: &Tree<K, V>, f: &mut F) -> Self
    where
        F: FnMut(&K, &V, &V) -> Option<V>,
    {
        match (t0, t1) {
            (Tree::Empty, _) => Tree::Empty,
            (_, Tree::Empty) => t0.clone(),
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                let l = Tree::difference_with(&n0.left, &l1, f);
                let r = Tree::difference_with(&n0.right, &r1, f);
                match matched {
                    None => Tree::link(n0.key.clone(), n0.val.clone(), &l, &r),
                    Some(v1) => match f(&n0.key, &n0.val, &v1) {
                        Some(v) => Tree::link(n0.key.clone(), v, &l, &r),
                        None => Tree::link2(&l, &r),
                    },
                }
            }
        }
    }

    pub(crate) fn symmetric_difference(t0: &Tree<K, V>, t1: &Tree<K, V>) -> Self {
        match (t0, t1) {
            (Tree::Empty, _) => t1.clone(),
            (_, Tree::Empty) => t0.clone(),
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                let l = Tree::symmetric_difference(&n0.left, &l1);
                let r = Tree::symmetric_difference(&n0.right, &r1);
                match matched {
                    None => Tree::link(n0.key.clone(), n0.val.clone(), &l, &r),
                    Some(_) => Tree::link2(&l, &r),
                }
            }
        }
    }

    // true when no key is shared. Same split descent as the
    // operations above, but no result tree is built and the first
    // shared key short circuits.
    pub(crate) fn disjoint(t0: &Tree<K, V>, t1: &Tree<K, V>) -> bool {
        match (t0, t1) {
            (Tree::Empty, _) | (_, Tree::Empty) => true,
            (Tree::Node(n0), _) => {
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                matched.is_none()
                    && Tree::disjoint(&n0.left, &l1)
                    && Tree::disjoint(&n0.right, &r1)
            }
        }
    }

    pub(crate) fn is_submap_by<F>(t0: &Tree<K, V>, t1: &Tree<K, V>, f: &mut F) -> bool
    where
        F: FnMut(&V, &V) -> bool,
    {
        match (t0, t1) {
            (Tree::Empty, _) => true,
            (_, Tree::Empty) => false,
            (Tree::Node(n0), _) => {
                if n0.size > t1.len() {
                    return false;
                }
                let (l1, matched, r1) = t1.split_lookup(&n0.key);
                match matched {
                    None => false,
                    Some(v1) => {
                        f(&n0.val, &v1)
                            && Tree::is_submap_by(&n0.left, &l1, f)
                            && Tree::is_submap_by(&n0.right, &r1, f)
                    }
                }
            }
        }
    }

    /*
     * structure preserving and structure shrinking maps
     */

    // same shape, new values, no rebalancing required
    pub(crate) fn map_vals<W, F>(&self, f: &mut F) -> Tree<K, W>
    where
        W: Clone,
        F: FnMut(&K, &V) -> W,
    {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => {
                let left = n.left.map_vals(f);
                let val = f(&n.key, &n.val);
                let right = n.right.map_vals(f);
                Tree::Node(Arc::new(Node {
                    size: n.size,
                    key: n.key.clone(),
                    val,
                    left,
                    right,
                }))
            }
        }
    }

    pub(crate) fn filter<F>(&self, f: &mut F) -> Self
    where
        F: FnMut(&K, &V) -> bool,
    {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => {
                let l = n.left.filter(f);
                let keep = f(&n.key, &n.val);
                let r = n.right.filter(f);
                if keep {
                    if Tree::same(&l, &n.left) && Tree::same(&r, &n.right) {
                        self.clone()
                    } else {
                        Tree::link(n.key.clone(), n.val.clone(), &l, &r)
                    }
                } else {
                    Tree::link2(&l, &r)
                }
            }
        }
    }

    // f runs in ascending key order
    pub(crate) fn filter_map<F>(&self, f: &mut F) -> Self
    where
        F: FnMut(&K, &V) -> Option<V>,
    {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => {
                let l = n.left.filter_map(f);
                let v = f(&n.key, &n.val);
                let r = n.right.filter_map(f);
                match v {
                    Some(v) => Tree::link(n.key.clone(), v, &l, &r),
                    None => Tree::link2(&l, &r),
                }
            }
        }
    }

    pub(crate) fn partition<F>(&self, f: &mut F) -> (Self, Self)
    where
        F: FnMut(&K, &V) -> bool,
    {
        match self {
            Tree::Empty => (Tree::Empty, Tree::Empty),
            Tree::Node(n) => {
                let (lt, lf) = n.left.partition(f);
                let keep = f(&n.key, &n.val);
                let (rt, rf) = n.right.partition(f);
                if keep {
                    (
                        Tree::link(n.key.clone(), n.val.clone(), &lt, &rt),
                        Tree::link2(&lf, &rf),
                    )
                } else {
                    (
                        Tree::link2(&lt, &rt),
                        Tree::link(n.key.clone(), n.val.clone(), &lf, &rf),
                    )
                }
            }
        }
    }
}

/// One pass bulk construction. While the input keys arrive in strictly
/// ascending order a stack of perfectly sized subtrees is kept, shaped
/// like a skewed binary counter, giving O(n) total work. The first out
/// of order key collapses the stack into a valid tree and every
/// remaining pair falls back to ordinary O(log n) insertion. Work
/// already done is never discarded.
pub(crate) enum Builder<K: Ord + Clone, V: Clone> {
    Collecting {
        stack: Vec<Tree<K, V>>,
        pending: Option<(K, V)>,
    },
    Degraded(Tree<K, V>),
}

impl<K, V> Builder<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Builder::Collecting {
            stack: Vec::new(),
            pending: None,
        }
    }

    // combine is given the key, the value already stored, and the
    // incoming value. keep-last is |_, _, v| v
    pub(crate) fn push<F>(&mut self, k: K, v: V, combine: &mut F)
    where
        F: FnMut(&K, V, V) -> V,
    {
        match self {
            Builder::Degraded(t) => {
                *t = t.insert_combine(k, v, &mut |k, cur, new| combine(k, cur.clone(), new));
            }
            Builder::Collecting { stack, pending } => match pending {
                None => *pending = Some((k, v)),
                Some((pk, _)) => match k.cmp(pk) {
                    Ordering::Greater => {
                        let (pk, pv) = pending.take().unwrap();
                        Builder::push_tree(stack, Tree::singleton(pk, pv));
                        *pending = Some((k, v));
                    }
                    Ordering::Equal => {
                        let (pk, pv) = pending.take().unwrap();
                        let v = combine(&pk, pv, v);
                        *pending = Some((pk, v));
                    }
                    Ordering::Less => {
                        // the key may duplicate one deep in the
                        // stack, so the degraded insert must combine
                        // too
                        let t = Builder::collapse(mem::take(stack), pending.take());
                        let t =
                            t.insert_combine(k, v, &mut |k, cur, new| combine(k, cur.clone(), new));
                        *self = Builder::Degraded(t);
                    }
                },
            },
        }
    }

    // for input promised to be strictly ascending. No comparisons are
    // made, so a violation yields an unspecified (but memory safe)
    // result, exactly as documented on the callers.
    pub(crate) fn push_unchecked(&mut self, k: K, v: V) {
        match self {
            Builder::Degraded(t) => {
                let (t2, _) = t.insert(k, v);
                *t = t2;
            }
            Builder::Collecting { stack, pending } => {
                if let Some((pk, pv)) = pending.take() {
                    Builder::push_tree(stack, Tree::singleton(pk, pv));
                }
                *pending = Some((k, v));
            }
        }
    }

    pub(crate) fn finish(self) -> Tree<K, V> {
        match self {
            Builder::Degraded(t) => t,
            Builder::Collecting { stack, pending } => Builder::collapse(stack, pending),
        }
    }

    fn push_tree(stack: &mut Vec<Tree<K, V>>, t: Tree<K, V>) {
        let mut t = t;
        while let Some(top) = stack.last() {
            if top.len() == t.len() {
                let top = stack.pop().unwrap();
                t = Tree::link2(&top, &t);
            } else {
                break;
            }
        }
        stack.push(t);
    }

    fn collapse(mut stack: Vec<Tree<K, V>>, pending: Option<(K, V)>) -> Tree<K, V> {
        let mut acc = match pending {
            None => Tree::Empty,
            Some((k, v)) => Tree::singleton(k, v),
        };
        while let Some(t) = stack.pop() {
            acc = Tree::link2(&t, &acc);
        }
        acc
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) {
        fn check<K, V>(t: &Tree<K, V>, lower: Option<&K>, upper: Option<&K>) -> usize
        where
            K: Ord + Clone + Debug,
            V: Clone + Debug,
        {
            match t {
                Tree::Empty => 0,
                Tree::Node(n) => {
                    if let Some(lower) = lower {
                        if *lower >= n.key {
                            panic!("tree invariant violated: {:?} >= {:?}", lower, n.key)
                        }
                    }
                    if let Some(upper) = upper {
                        if *upper <= n.key {
                            panic!("tree invariant violated: {:?} <= {:?}", upper, n.key)
                        }
                    }
                    let sl = check(&n.left, lower, Some(&n.key));
                    let sr = check(&n.right, Some(&n.key), upper);
                    if n.size != 1 + sl + sr {
                        panic!("node size is wrong {} vs {}", n.size, 1 + sl + sr)
                    }
                    if sl + sr > 1 && (sl > DELTA * sr || sr > DELTA * sl) {
                        panic!("tree is unbalanced {} vs {}\n{:?}", sl, sr, t)
                    }
                    n.size
                }
            }
        }
        check(self, None, None);
    }
}
