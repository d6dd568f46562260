//! Identifiers for markets, accounts and composite position keys.
//!
//! Text form is `0x`-prefixed lowercase hex. Parsing accepts either case.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Result, TypesError};

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Byte length of this identifier.
            pub const LEN: usize = $len;

            /// Wrap raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Borrow the raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self> {
                parse_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_id!(
    /// A 20-byte account address (user, vault, token or the protocol itself).
    Address,
    20
);

hex_id!(
    /// A 32-byte market identifier.
    MarketId,
    32
);

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| TypesError::InvalidLength {
        expected: N,
        actual,
    })
}

/// Key of a market position: one per (market, user).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub market: MarketId,
    pub user: Address,
}

impl PositionKey {
    pub fn new(market: MarketId, user: Address) -> Self {
        Self { market, user }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.market, self.user)
    }
}

/// Key of a vault position: one per (vault, user).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VaultPositionKey {
    pub vault: Address,
    pub user: Address,
}

impl VaultPositionKey {
    pub fn new(vault: Address, user: Address) -> Self {
        Self { vault, user }
    }
}

impl fmt::Display for VaultPositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vault, self.user)
    }
}

/// Names a single entity of a snapshot, for errors and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Market(MarketId),
    Position(PositionKey),
    Vault(Address),
    VaultPosition(VaultPositionKey),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Market(id) => write!(f, "market {id}"),
            EntityRef::Position(key) => write!(f, "position {key}"),
            EntityRef::Vault(id) => write!(f, "vault {id}"),
            EntityRef::VaultPosition(key) => write!(f, "vault position {key}"),
        }
    }
}
