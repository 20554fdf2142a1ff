use crate::map::Map;
use crate::merge::{discard, filter_missing, map_missing, preserve};
use crate::set::Set;
use rand::{thread_rng, Rng};
use std::collections::BTreeMap;
use std::ops::Bound;

const STRSIZE: usize = 10;
const SIZE: usize = 1000;

trait Rand: Sized {
    fn rand<R: Rng>(r: &mut R) -> Self;
}

impl Rand for String {
    fn rand<R: Rng>(r: &mut R) -> Self {
        let mut s = String::new();
        for _ in 0..STRSIZE {
            s.push(r.gen_range('a'..='z'))
        }
        s
    }
}

impl Rand for i32 {
    fn rand<R: Rng>(r: &mut R) -> Self {
        r.gen_range(-10_000..10_000)
    }
}

fn randvec<T: Rand>(len: usize) -> Vec<T> {
    let mut rng = thread_rng();
    (0..len).map(|_| T::rand(&mut rng)).collect()
}

fn insert_all<T: Rand + Ord + Clone + std::fmt::Debug>(v: &[T]) -> Map<T, T> {
    let mut m = Map::new();
    for k in v {
        m = m.insert(k.clone(), k.clone()).0;
        m.invariant();
    }
    m
}

fn model<T: Ord + Clone>(v: &[T]) -> BTreeMap<T, T> {
    v.iter().map(|k| (k.clone(), k.clone())).collect()
}

fn assert_matches_model<T: Ord + Clone + std::fmt::Debug>(m: &Map<T, T>, model: &BTreeMap<T, T>) {
    assert_eq!(m.len(), model.len());
    assert!(m
        .iter()
        .zip(model.iter())
        .all(|((k0, v0), (k1, v1))| k0 == k1 && v0 == v1));
}

#[test]
fn insert_seq_asc() {
    let m = insert_all(&(0..SIZE as i32).collect::<Vec<_>>());
    assert_eq!(m.len(), SIZE);
}

#[test]
fn insert_seq_desc() {
    let m = insert_all(&(0..SIZE as i32).rev().collect::<Vec<_>>());
    assert_eq!(m.len(), SIZE);
}

#[test]
fn insert_get_rand_int() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    for k in &v {
        assert_eq!(m.get(k), Some(k));
        assert_eq!(m.get_key(k), Some(k));
        assert_eq!(m.get_full(k), Some((k, k)));
    }
    assert_matches_model(&m, &model(&v));
}

#[test]
fn insert_get_rand_str() {
    let v = randvec::<String>(SIZE);
    let m = insert_all(&v);
    for k in &v {
        assert_eq!(m.get(k.as_str()), Some(k));
    }
    assert_matches_model(&m, &model(&v));
}

#[test]
fn insert_remove_rand() {
    let v = randvec::<i32>(SIZE);
    let mut m = Map::new();
    let mut reference = BTreeMap::new();
    for (i, k) in v.iter().enumerate() {
        m = m.insert(*k, *k).0;
        reference.insert(*k, *k);
        if i % 10 == 0 {
            let (m2, prev) = m.remove(k);
            assert_eq!(prev, Some(*k));
            m = m2;
            reference.remove(k);
            m.invariant();
            assert_eq!(m.get(k), None);
        }
    }
    assert_matches_model(&m, &reference);
}

#[test]
fn remove_absent_is_identity() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let absent = 20_000;
    let (m2, prev) = m.remove(&absent);
    assert_eq!(prev, None);
    assert_eq!(m, m2);
    let (s, was) = m.key_set().remove(&absent);
    assert!(!was);
    assert_eq!(s, m.key_set());
}

#[test]
fn insert_equal_value_is_equal() {
    let m = insert_all(&[5, 3, 8]);
    let (m2, prev) = m.insert(3, 3);
    assert_eq!(prev, Some(3));
    assert_eq!(m, m2);
}

#[test]
fn iter_ascending_and_descending() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let asc: Vec<i32> = m.keys().cloned().collect();
    let mut sorted = asc.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(asc, sorted);
    let desc: Vec<i32> = m.keys().rev().cloned().collect();
    let mut rev = sorted;
    rev.reverse();
    assert_eq!(desc, rev);
}

#[test]
fn double_ended_iter_meets_in_the_middle() {
    let m = insert_all(&(0..100i32).collect::<Vec<_>>());
    let mut iter = m.iter();
    let mut front = Vec::new();
    let mut back = Vec::new();
    loop {
        match iter.next() {
            None => break,
            Some((k, _)) => front.push(*k),
        }
        match iter.next_back() {
            None => break,
            Some((k, _)) => back.push(*k),
        }
    }
    back.reverse();
    front.extend(back);
    assert_eq!(front, (0..100i32).collect::<Vec<_>>());
}

#[test]
fn range_matches_model() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let reference = model(&v);
    let mut rng = thread_rng();
    for _ in 0..100 {
        let (a, b) = (i32::rand(&mut rng), i32::rand(&mut rng));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let got: Vec<i32> = m
            .range(Bound::Included(lo), Bound::Excluded(hi))
            .map(|(k, _)| *k)
            .collect();
        let expected: Vec<i32> = reference.range(lo..hi).map(|(k, _)| *k).collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn empty_range() {
    let m = insert_all(&(0..100i32).collect::<Vec<_>>());
    assert_eq!(m.range(Bound::Included(50), Bound::Included(40)).count(), 0);
}

#[test]
fn nearest_lookups() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let reference = model(&v);
    let mut rng = thread_rng();
    for _ in 0..200 {
        let k = i32::rand(&mut rng);
        let lt = reference.range(..k).next_back().map(|(k, _)| *k);
        let le = reference.range(..=k).next_back().map(|(k, _)| *k);
        let gt = reference
            .range((Bound::Excluded(k), Bound::Unbounded))
            .next()
            .map(|(k, _)| *k);
        let ge = reference.range(k..).next().map(|(k, _)| *k);
        assert_eq!(m.get_lt(&k).map(|(k, _)| *k), lt);
        assert_eq!(m.get_le(&k).map(|(k, _)| *k), le);
        assert_eq!(m.get_gt(&k).map(|(k, _)| *k), gt);
        assert_eq!(m.get_ge(&k).map(|(k, _)| *k), ge);
    }
}

#[test]
fn first_last_pop() {
    let v = randvec::<i32>(SIZE);
    let mut m = insert_all(&v);
    let mut keys: Vec<i32> = m.keys().cloned().collect();
    assert_eq!(m.first().map(|(k, _)| *k), keys.first().cloned());
    assert_eq!(m.last().map(|(k, _)| *k), keys.last().cloned());
    while let Some((k, _, rest)) = m.pop_first() {
        assert_eq!(k, keys.remove(0));
        rest.invariant();
        m = rest;
    }
    assert!(m.is_empty());
}

#[test]
fn rank_access() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let keys: Vec<i32> = m.keys().cloned().collect();
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(m.get_index(i).map(|(k, _)| *k), Some(*k));
        assert_eq!(m.index_of(k), Some(i));
        assert_eq!(m.nth(i).0, k);
        assert_eq!(m.rank(k), i);
    }
    assert_eq!(m.get_index(keys.len()), None);
    assert_eq!(m.index_of(&20_000), None);
}

#[test]
#[should_panic]
fn rank_of_absent_key() {
    let m = insert_all(&[1, 2, 3]);
    let _ = m.rank(&9);
}

#[test]
fn take_skip_split_at() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let keys: Vec<i32> = m.keys().cloned().collect();
    for &n in &[0, 1, 7, keys.len() / 2, keys.len(), keys.len() + 10] {
        let t = m.take(n);
        let s = m.skip(n);
        t.invariant();
        s.invariant();
        let cut = n.min(keys.len());
        assert_eq!(t.keys().cloned().collect::<Vec<_>>(), keys[..cut].to_vec());
        assert_eq!(s.keys().cloned().collect::<Vec<_>>(), keys[cut..].to_vec());
        let (l, r) = m.split_at(n);
        assert_eq!(l, t);
        assert_eq!(r, s);
    }
}

#[test]
fn update_and_remove_by_rank() {
    let m = insert_all(&[10, 20, 30]);
    let m2 = m.update_index(1, |_, v| v + 1);
    assert_eq!(m2.get(&20), Some(&21));
    let (m3, kv) = m2.remove_index(0);
    assert_eq!(kv, (10, 10));
    assert_eq!(m3.len(), 2);
    m3.invariant();
}

#[test]
#[should_panic]
fn remove_by_rank_out_of_range() {
    let m = insert_all(&[1, 2, 3]);
    let _ = m.remove_index(3);
}

#[test]
fn insert_with_combines() {
    let mut m: Map<i32, i32> = Map::new();
    for _ in 0..3 {
        m = m.insert_with(7, 1, |cur, new| cur + new);
    }
    assert_eq!(m.get(&7), Some(&3));
    let m = m.insert_with_key(7, 10, |k, cur, new| k + cur + new);
    assert_eq!(m.get(&7), Some(&20));
}

#[test]
fn adjust_and_update() {
    let m = insert_all(&[1, 2, 3]);
    let m2 = m.adjust(&2, |v| v * 10);
    assert_eq!(m2.get(&2), Some(&20));
    // absent key, map unchanged
    assert_eq!(m.adjust(&9, |v| v * 10), m);
    let (m3, prev) = m2.update(&2, |_, _| None);
    assert_eq!(prev, Some(20));
    assert_eq!(m3.get(&2), None);
    m3.invariant();
    let (m4, prev) = m3.update(&9, |_, v| Some(*v));
    assert_eq!(prev, None);
    assert_eq!(m4, m3);
}

// lookup(k, alter(k, f, m)) == f(lookup(k, m)) for an effect free f
#[test]
fn alter_agrees_with_lookup() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let mut rng = thread_rng();
    for _ in 0..200 {
        let k = i32::rand(&mut rng);
        let strategy: fn(Option<&i32>) -> Option<i32> = match rng.gen_range(0..4) {
            0 => |_| None,
            1 => |_| Some(42),
            2 => |v| v.cloned(),
            _ => |v| v.map(|v| v + 1),
        };
        let m2 = m.alter(k, strategy);
        m2.invariant();
        assert_eq!(m2.get(&k).cloned(), strategy(m.get(&k)));
        // untouched keys are untouched
        assert_eq!(m2.remove(&k).0, m.remove(&k).0);
    }
}

#[test]
fn alter_f_passes_the_result_out() {
    let m = insert_all(&[1, 2, 3]);
    let (m2, prev) = m.alter_f(2, |v| (None, v.cloned()));
    assert_eq!(prev, Some(2));
    assert_eq!(m2.get(&2), None);
    let (m3, prev) = m2.alter_f(9, |v| (Some(90), v.cloned()));
    assert_eq!(prev, None);
    assert_eq!(m3.get(&9), Some(&90));
}

// the recursive fallback taken above the bit path size cutoff must
// agree with the bit path implementation
#[test]
fn alter_unbounded_agrees_with_bounded() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let mut rng = thread_rng();
    for _ in 0..200 {
        let k = i32::rand(&mut rng);
        let (a, _) = m.root.alter_f(k, |v| (v.map(|v| v + 1), ()));
        let (b, _) = m.root.alter_f_unbounded(k, |v| (v.map(|v| v + 1), ()));
        a.invariant();
        b.invariant();
        assert!(a == b);
    }
}

fn union_model(a: &BTreeMap<i32, i32>, b: &BTreeMap<i32, i32>) -> BTreeMap<i32, i32> {
    let mut r = b.clone();
    for (k, v) in a {
        r.insert(*k, *v);
    }
    r
}

#[test]
fn union_matches_model() {
    let v0 = randvec::<i32>(SIZE);
    let v1 = randvec::<i32>(SIZE);
    let m0 = insert_all(&v0);
    let m1 = insert_all(&v1);
    let u = m0.union(&m1);
    u.invariant();
    assert_matches_model(&u, &union_model(&model(&v0), &model(&v1)));
}

#[test]
fn union_identity_and_bias() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    assert_eq!(m.union(&Map::new()), m);
    assert_eq!(Map::new().union(&m), m);
    let m0: Map<i32, &str> = vec![(5, "a"), (3, "b")].into_iter().collect();
    let m1: Map<i32, &str> = vec![(5, "A"), (7, "C")].into_iter().collect();
    let u = m0.union(&m1);
    assert_eq!(
        u,
        vec![(3, "b"), (5, "a"), (7, "C")].into_iter().collect()
    );
    // union is unionWith(first)
    assert_eq!(u, m0.union_with(&m1, |a, _| *a));
}

#[test]
fn intersection_matches_model() {
    let v0 = randvec::<i32>(SIZE);
    let v1 = randvec::<i32>(SIZE);
    let m0 = insert_all(&v0);
    let m1 = insert_all(&v1);
    let i = m0.intersection(&m1);
    i.invariant();
    let reference: BTreeMap<i32, i32> = model(&v0)
        .into_iter()
        .filter(|(k, _)| m1.contains_key(k))
        .collect();
    assert_matches_model(&i, &reference);
    assert!(i.is_submap(&m0));
}

#[test]
fn difference_matches_model() {
    let v0 = randvec::<i32>(SIZE);
    let v1 = randvec::<i32>(SIZE);
    let m0 = insert_all(&v0);
    let m1 = insert_all(&v1);
    let d = m0.difference(&m1);
    d.invariant();
    let reference: BTreeMap<i32, i32> = model(&v0)
        .into_iter()
        .filter(|(k, _)| !m1.contains_key(k))
        .collect();
    assert_matches_model(&d, &reference);
    assert!(d.disjoint(&m1));
    // delete of an absent key leaves the map equal to the input
    let m2: Map<i32, i32> = vec![(5, 10), (3, 30)].into_iter().collect();
    let only_absent: Map<i32, i32> = vec![(7, 70)].into_iter().collect();
    assert_eq!(m2.difference(&only_absent), m2);
}

#[test]
fn symmetric_difference_matches_model() {
    let v0 = randvec::<i32>(SIZE);
    let v1 = randvec::<i32>(SIZE);
    let m0 = insert_all(&v0);
    let m1 = insert_all(&v1);
    let s = m0.symmetric_difference(&m1);
    s.invariant();
    assert_eq!(s, m0.difference(&m1).union(&m1.difference(&m0)));
    assert!(s.disjoint(&m0.intersection(&m1)));
}

#[test]
fn split_partitions_exactly() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let mut rng = thread_rng();
    for _ in 0..100 {
        let k = i32::rand(&mut rng);
        let (lo, found, hi) = m.split_lookup(&k);
        lo.invariant();
        hi.invariant();
        assert!(lo.keys().all(|x| *x < k));
        assert!(hi.keys().all(|x| *x > k));
        assert_eq!(found.is_some(), m.contains_key(&k));
        assert_eq!(
            lo.len() + hi.len() + found.iter().count(),
            m.len()
        );
        let mut back = lo.union(&hi);
        if let Some(v) = found {
            back = back.insert(k, v).0;
        }
        assert_eq!(back, m);
    }
}

#[test]
fn merge_expresses_the_set_algebra() {
    let v0 = randvec::<i32>(SIZE / 2);
    let v1 = randvec::<i32>(SIZE / 2);
    let m0 = insert_all(&v0);
    let m1 = insert_all(&v1);
    let union = m0.merge(&m1, preserve(), preserve(), |k, a, b| {
        Some(k.wrapping_add(*a).wrapping_add(*b))
    });
    assert_eq!(
        union,
        m0.union_with_key(&m1, |k, a, b| k.wrapping_add(*a).wrapping_add(*b))
    );
    let inter = m0.merge(&m1, discard(), discard(), |k, a, b| {
        Some(k.wrapping_add(*a).wrapping_add(*b))
    });
    assert_eq!(
        inter,
        m0.intersection_with_key(&m1, |k, a, b| k.wrapping_add(*a).wrapping_add(*b))
    );
    let diff = m0.merge(&m1, preserve(), discard(), |_, a, b| {
        if a < b {
            None
        } else {
            Some(*a)
        }
    });
    assert_eq!(
        diff,
        m0.difference_with(&m1, |_, a, b| if a < b { None } else { Some(*a) })
    );
}

#[test]
fn merge_rewrites_the_unique_sides() {
    let m0: Map<i32, i32> = vec![(1, 10), (2, 20)].into_iter().collect();
    let m1: Map<i32, i32> = vec![(2, 200), (3, 30)].into_iter().collect();
    let r = m0.merge(
        &m1,
        map_missing(|_: &i32, v: &i32| v + 1),
        map_missing(|_: &i32, v: &i32| v - 1),
        |_, a, b| Some(a + b),
    );
    r.invariant();
    assert_eq!(r, vec![(1, 11), (2, 220), (3, 29)].into_iter().collect());
}

#[test]
fn merge_runs_in_ascending_key_order() {
    use std::cell::RefCell;
    let m0: Map<i32, i32> = vec![(1, 0), (4, 0), (6, 0)].into_iter().collect();
    let m1: Map<i32, i32> = vec![(2, 0), (4, 0), (9, 0)].into_iter().collect();
    // (key, source) pairs in the order the strategies ran
    let seen: RefCell<Vec<(i32, char)>> = RefCell::new(Vec::new());
    let r = m0.merge(
        &m1,
        filter_missing(|k: &i32, _: &i32| {
            seen.borrow_mut().push((*k, 'l'));
            Some(0)
        }),
        filter_missing(|k: &i32, _: &i32| {
            seen.borrow_mut().push((*k, 'r'));
            Some(0)
        }),
        |k, _, _| {
            seen.borrow_mut().push((*k, 'm'));
            Some(0)
        },
    );
    assert_eq!(r.len(), 5);
    let seen = seen.into_inner();
    let keys: Vec<i32> = seen.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![1, 2, 4, 6, 9]);
    let tags: Vec<char> = seen.iter().map(|(_, t)| *t).collect();
    assert_eq!(tags, vec!['l', 'r', 'm', 'l', 'r']);
}

#[test]
fn builder_equivalence() {
    let v = randvec::<i32>(SIZE);
    let collected: Map<i32, i32> = v.iter().map(|k| (*k, *k)).collect();
    collected.invariant();
    let folded = insert_all(&v);
    assert_eq!(collected, folded);
    let mut sorted: Vec<i32> = v.clone();
    sorted.sort();
    sorted.dedup();
    let asc: Map<i32, i32> = sorted.iter().map(|k| (*k, *k)).collect();
    asc.invariant();
    assert_eq!(asc, folded);
    let distinct = Map::from_distinct_sorted_iter(sorted.iter().map(|k| (*k, *k)));
    distinct.invariant();
    assert_eq!(distinct, folded);
    let sorted_named = Map::from_sorted_iter(sorted.iter().map(|k| (*k, *k)));
    assert_eq!(sorted_named, folded);
}

#[test]
fn builder_keeps_the_last_duplicate() {
    let m: Map<i32, i32> = vec![(1, 1), (2, 2), (2, 20), (3, 3)].into_iter().collect();
    assert_eq!(m.get(&2), Some(&20));
    // and after degrading too
    let m: Map<i32, i32> = vec![(5, 5), (1, 1), (5, 50)].into_iter().collect();
    assert_eq!(m.get(&5), Some(&50));
    m.invariant();
}

#[test]
fn builder_combines_duplicates() {
    let m = Map::from_iter_with(vec![(1, 1), (1, 10), (0, 5), (1, 100)], |_, cur, new| {
        cur + new
    });
    m.invariant();
    assert_eq!(m.get(&1), Some(&111));
    assert_eq!(m.get(&0), Some(&5));
}

#[test]
fn filter_map_partition() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let even = m.filter(|k, _| k % 2 == 0);
    even.invariant();
    assert!(even.keys().all(|k| k % 2 == 0));
    // keeping everything shares the input wholesale, observable only
    // as equality
    assert_eq!(m.filter(|_, _| true), m);
    let (e, o) = m.partition(|k, _| k % 2 == 0);
    e.invariant();
    o.invariant();
    assert_eq!(e, even);
    assert_eq!(e.union(&o), m);
    assert!(e.disjoint(&o));
    let doubled = m.map_values(|_, v| v * 2);
    assert_eq!(doubled.len(), m.len());
    assert!(doubled.iter().all(|(k, v)| *v == k * 2));
    let fm = m.filter_map(|k, v| if k % 3 == 0 { Some(v + 1) } else { None });
    fm.invariant();
    assert!(fm.keys().all(|k| k % 3 == 0));
}

#[test]
fn map_and_set_convert_both_ways() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let s = m.key_set();
    s.invariant();
    assert_eq!(s.len(), m.len());
    assert!(m.keys().all(|k| s.contains(k)));
    let m2 = s.to_map(|k| *k);
    m2.invariant();
    assert_eq!(m2, m);
}

#[test]
fn set_operations() {
    let v0 = randvec::<i32>(SIZE);
    let v1 = randvec::<i32>(SIZE);
    let s0: Set<i32> = v0.iter().cloned().collect();
    let s1: Set<i32> = v1.iter().cloned().collect();
    s0.invariant();
    let u = s0.union(&s1);
    u.invariant();
    assert!(s0.is_subset(&u) && s1.is_subset(&u));
    let i = s0.intersection(&s1);
    assert!(i.iter().all(|k| s0.contains(k) && s1.contains(k)));
    let d = s0.difference(&s1);
    assert!(d.disjoint(&s1));
    assert_eq!(d.union(&i), s0);
    let (lo, _, hi) = s0.split(&0);
    assert!(lo.iter().all(|k| *k < 0));
    assert!(hi.iter().all(|k| *k > 0));
    let mid: Vec<i32> = s0
        .range(Bound::Included(-100), Bound::Included(100))
        .cloned()
        .collect();
    assert!(mid.iter().all(|k| -100 <= *k && *k <= 100));
}

#[cfg(feature = "serde")]
#[test]
fn serde_round_trip() {
    let v = randvec::<i32>(SIZE);
    let m = insert_all(&v);
    let s = serde_json::to_string(&m).unwrap();
    let m2: Map<i32, i32> = serde_json::from_str(&s).unwrap();
    m2.invariant();
    assert_eq!(m, m2);
    let set: Set<i32> = v.iter().cloned().collect();
    let s = serde_json::to_string(&set).unwrap();
    let set2: Set<i32> = serde_json::from_str(&s).unwrap();
    assert_eq!(set, set2);
}
