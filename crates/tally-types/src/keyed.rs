//! Serde support for entity maps as JSON arrays.
//!
//! Entities carry their own key, so a map is written as the list of its
//! values and rebuilt from each value's key on the way back in. A repeated
//! key is a decode error.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::entities::{Market, Position, Vault, VaultPosition};
use crate::ids::{Address, MarketId, PositionKey, VaultPositionKey};
use crate::rewards::{MarketRewards, PositionRewards, VaultPositionRewards, VaultRewards};

/// An entity that knows its own map key.
pub trait Keyed {
    type Key: Ord + fmt::Display;

    fn map_key(&self) -> Self::Key;
}

impl Keyed for Market {
    type Key = MarketId;

    fn map_key(&self) -> MarketId {
        self.id
    }
}

impl Keyed for Position {
    type Key = PositionKey;

    fn map_key(&self) -> PositionKey {
        self.key()
    }
}

impl Keyed for Vault {
    type Key = Address;

    fn map_key(&self) -> Address {
        self.id
    }
}

impl Keyed for VaultPosition {
    type Key = VaultPositionKey;

    fn map_key(&self) -> VaultPositionKey {
        self.key()
    }
}

impl Keyed for MarketRewards {
    type Key = MarketId;

    fn map_key(&self) -> MarketId {
        self.id
    }
}

impl Keyed for PositionRewards {
    type Key = PositionKey;

    fn map_key(&self) -> PositionKey {
        self.key()
    }
}

impl Keyed for VaultRewards {
    type Key = Address;

    fn map_key(&self) -> Address {
        self.id
    }
}

impl Keyed for VaultPositionRewards {
    type Key = VaultPositionKey;

    fn map_key(&self) -> VaultPositionKey {
        self.key()
    }
}

pub fn serialize<S, V>(
    map: &BTreeMap<V::Key, V>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Keyed + Serialize,
{
    serializer.collect_seq(map.values())
}

pub fn deserialize<'de, D, V>(deserializer: D) -> std::result::Result<BTreeMap<V::Key, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Keyed + Deserialize<'de>,
{
    struct EntityListVisitor<V>(PhantomData<V>);

    impl<'de, V> Visitor<'de> for EntityListVisitor<V>
    where
        V: Keyed + Deserialize<'de>,
    {
        type Value = BTreeMap<V::Key, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of entities")
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut map = BTreeMap::new();
            while let Some(entity) = seq.next_element::<V>()? {
                let key = entity.map_key();
                if map.contains_key(&key) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate entity {key}"
                    )));
                }
                map.insert(key, entity);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_seq(EntityListVisitor(PhantomData))
}
