use proptest::prelude::*;
use std::collections::BTreeMap;
use std::ops::Bound;
use wbmap::map::Map;
use wbmap::merge::{discard, preserve};
use wbmap::set::Set;

// keys drawn from a small range so that duplicates, overlaps between
// generated maps, and both hit and miss lookups all occur often
fn keys() -> impl Strategy<Value = Vec<i16>> {
    prop::collection::vec(-500i16..500, 0..400)
}

fn pairs() -> impl Strategy<Value = Vec<(i16, i32)>> {
    prop::collection::vec((-500i16..500, any::<i32>()), 0..400)
}

fn build(v: &[(i16, i32)]) -> (Map<i16, i32>, BTreeMap<i16, i32>) {
    let mut m = Map::new();
    let mut model = BTreeMap::new();
    for (k, val) in v {
        m = m.insert(*k, *val).0;
        model.insert(*k, *val);
    }
    (m, model)
}

fn same(m: &Map<i16, i32>, model: &BTreeMap<i16, i32>) -> bool {
    m.len() == model.len()
        && m.iter()
            .zip(model.iter())
            .all(|((k0, v0), (k1, v1))| k0 == k1 && v0 == v1)
}

proptest! {
    #[test]
    fn models_a_btreemap(v in pairs()) {
        let (m, model) = build(&v);
        prop_assert!(same(&m, &model));
        for (k, _) in &v {
            prop_assert_eq!(m.get(k), model.get(k));
        }
    }

    #[test]
    fn collect_equals_fold_insert(v in pairs()) {
        let (folded, _) = build(&v);
        let collected: Map<i16, i32> = v.iter().cloned().collect();
        prop_assert_eq!(&collected, &folded);
        // feeding the entries sorted takes the fast path and must
        // produce the same map
        let mut sorted = v.clone();
        sorted.sort_by_key(|(k, _)| *k);
        let from_sorted: Map<i16, i32> = sorted.into_iter().collect();
        prop_assert_eq!(&from_sorted, &folded);
    }

    #[test]
    fn remove_inverts_insert(v in pairs(), k in -500i16..500) {
        let (m, mut model) = build(&v);
        let (m2, prev) = m.remove(&k);
        prop_assert_eq!(prev, model.remove(&k));
        prop_assert!(same(&m2, &model));
        prop_assert_eq!(m2.get(&k), None);
        // and the original is untouched
        prop_assert_eq!(m.len(), m2.len() + prev.iter().count());
    }

    #[test]
    fn alter_observes_and_replaces(v in pairs(), k in -500i16..500, r in prop::option::of(any::<i32>())) {
        let (m, _) = build(&v);
        let before = m.get(&k).cloned();
        let (m2, seen) = m.alter_f(k, |cur| (r, cur.cloned()));
        prop_assert_eq!(seen, before);
        prop_assert_eq!(m2.get(&k).cloned(), r);
        prop_assert_eq!(m2.remove(&k).0, m.remove(&k).0);
    }

    #[test]
    fn union_is_left_biased(v0 in pairs(), v1 in pairs()) {
        let (m0, model0) = build(&v0);
        let (m1, mut model) = build(&v1);
        model.extend(model0);
        let u = m0.union(&m1);
        prop_assert!(same(&u, &model));
    }

    #[test]
    fn intersection_and_difference_partition(v0 in pairs(), v1 in pairs()) {
        let (m0, _) = build(&v0);
        let (m1, _) = build(&v1);
        let i = m0.intersection(&m1);
        let d = m0.difference(&m1);
        prop_assert!(i.disjoint(&d));
        prop_assert_eq!(i.union(&d), m0.clone());
        prop_assert!(i.is_submap(&m0));
        prop_assert!(d.keys().all(|k| !m1.contains_key(k)));
    }

    #[test]
    fn symmetric_difference_is_symmetric(v0 in pairs(), v1 in pairs()) {
        let (m0, _) = build(&v0);
        let (m1, _) = build(&v1);
        let s01 = m0.symmetric_difference(&m1);
        let s10 = m1.symmetric_difference(&m0);
        prop_assert_eq!(s01.key_set(), s10.key_set());
        prop_assert!(s01.disjoint(&m0.intersection(&m1)));
    }

    #[test]
    fn merge_generalizes_the_specializations(v0 in pairs(), v1 in pairs()) {
        let (m0, _) = build(&v0);
        let (m1, _) = build(&v1);
        let f = |_: &i16, a: &i32, b: &i32| a.wrapping_add(*b);
        let via_merge = m0.merge(&m1, preserve(), preserve(), |k, a, b| Some(f(k, a, b)));
        prop_assert_eq!(via_merge, m0.union_with_key(&m1, f));
        let via_merge = m0.merge(&m1, discard(), discard(), |k, a, b| Some(f(k, a, b)));
        prop_assert_eq!(via_merge, m0.intersection_with_key(&m1, f));
        let via_merge = m0.merge(&m1, preserve(), discard(), |_, _, _| None);
        prop_assert_eq!(via_merge, m0.difference(&m1));
    }

    #[test]
    fn split_reassembles(v in pairs(), k in -500i16..500) {
        let (m, _) = build(&v);
        let (lo, found, hi) = m.split_lookup(&k);
        prop_assert!(lo.keys().all(|x| *x < k));
        prop_assert!(hi.keys().all(|x| *x > k));
        prop_assert_eq!(found.is_some(), m.contains_key(&k));
        let mut back = lo.union(&hi);
        if let Some(v) = found {
            back = back.insert(k, v).0;
        }
        prop_assert_eq!(back, m);
    }

    #[test]
    fn rank_agrees_with_iteration(v in pairs(), n in 0usize..500) {
        let (m, _) = build(&v);
        let keys: Vec<i16> = m.keys().cloned().collect();
        for (i, k) in keys.iter().enumerate() {
            prop_assert_eq!(m.index_of(k), Some(i));
            prop_assert_eq!(m.get_index(i).map(|(k, _)| *k), Some(*k));
        }
        let cut = n.min(keys.len());
        let (l, r) = m.split_at(n);
        prop_assert_eq!(l.len(), cut);
        prop_assert_eq!(l.union(&r), m);
    }

    #[test]
    fn range_matches_model(v in pairs(), a in -600i16..600, b in -600i16..600) {
        let (m, model) = build(&v);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let got: Vec<i16> = m
            .range(Bound::Included(lo), Bound::Excluded(hi))
            .map(|(k, _)| *k)
            .collect();
        let expected: Vec<i16> = model.range(lo..hi).map(|(k, _)| *k).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn iteration_is_double_ended(v in pairs()) {
        let (m, _) = build(&v);
        let fwd: Vec<i16> = m.keys().cloned().collect();
        let mut bwd: Vec<i16> = m.keys().rev().cloned().collect();
        bwd.reverse();
        prop_assert_eq!(fwd, bwd);
    }

    #[test]
    fn nearest_lookups_match_model(v in pairs(), k in -600i16..600) {
        let (m, model) = build(&v);
        prop_assert_eq!(
            m.get_lt(&k).map(|(k, _)| *k),
            model.range(..k).next_back().map(|(k, _)| *k)
        );
        prop_assert_eq!(
            m.get_ge(&k).map(|(k, _)| *k),
            model.range(k..).next().map(|(k, _)| *k)
        );
    }

    #[test]
    fn filter_partition_agree(v in pairs()) {
        let (m, _) = build(&v);
        let (yes, no) = m.partition(|k, _| k % 2 == 0);
        prop_assert_eq!(&yes, &m.filter(|k, _| k % 2 == 0));
        prop_assert_eq!(&no, &m.filter(|k, _| k % 2 != 0));
        prop_assert!(yes.disjoint(&no));
        prop_assert_eq!(yes.union(&no), m);
    }

    #[test]
    fn set_algebra(v0 in keys(), v1 in keys()) {
        let s0: Set<i16> = v0.iter().cloned().collect();
        let s1: Set<i16> = v1.iter().cloned().collect();
        let u = s0.union(&s1);
        let i = s0.intersection(&s1);
        prop_assert!(s0.is_subset(&u));
        prop_assert!(i.is_subset(&s0) && i.is_subset(&s1));
        prop_assert_eq!(s0.difference(&s1).union(&i), s0.clone());
        prop_assert_eq!(u.len() + i.len(), s0.len() + s1.len());
    }

    #[test]
    fn set_and_map_views_agree(v in pairs()) {
        let (m, _) = build(&v);
        let s = m.key_set();
        prop_assert_eq!(s.len(), m.len());
        prop_assert!(m.keys().all(|k| s.contains(k)));
        let back = s.to_map(|k| *k as i32);
        prop_assert!(back.iter().all(|(k, v)| *v == *k as i32));
    }
}
