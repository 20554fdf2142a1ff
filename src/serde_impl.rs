//! Maps serialize as map entries and sets as sequences, both in
//! ascending key order, the canonical external representation.
//! Deserialization feeds the bulk builder, so reading back what was
//! written takes the amortized linear sorted path.

use crate::map::Map;
use crate::set::Set;
use crate::tree::Builder;
use serde::{
    de::{MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap, SerializeSeq},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{cmp::Ord, fmt, marker::PhantomData};

impl<K, V> Serialize for Map<K, V>
where
    K: Serialize + Ord + Clone,
    V: Serialize + Clone,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut m = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self {
            m.serialize_entry(k, v)?
        }
        m.end()
    }
}

struct MapVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for MapVisitor<K, V>
where
    K: Deserialize<'de> + Ord + Clone,
    V: Deserialize<'de> + Clone,
{
    type Value = Map<K, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut b = Builder::new();
        while let Some((k, v)) = access.next_entry()? {
            b.push(k, v, &mut |_, _, v| v)
        }
        Ok(Map { root: b.finish() })
    }
}

impl<'de, K, V> Deserialize<'de> for Map<K, V>
where
    K: Deserialize<'de> + Ord + Clone,
    V: Deserialize<'de> + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}

impl<K> Serialize for Set<K>
where
    K: Serialize + Ord + Clone,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_seq(Some(self.len()))?;
        for k in self {
            s.serialize_element(k)?
        }
        s.end()
    }
}

struct SetVisitor<K>(PhantomData<K>);

impl<'de, K> Visitor<'de> for SetVisitor<K>
where
    K: Deserialize<'de> + Ord + Clone,
{
    type Value = Set<K>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a sequence of set elements")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut b = Builder::new();
        while let Some(k) = access.next_element()? {
            b.push(k, (), &mut |_, _, v| v)
        }
        Ok(Set(b.finish()))
    }
}

impl<'de, K> Deserialize<'de> for Set<K>
where
    K: Deserialize<'de> + Ord + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(SetVisitor(PhantomData))
    }
}
