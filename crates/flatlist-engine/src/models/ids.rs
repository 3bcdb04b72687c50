use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identity of a logical list item. Every block belonging to the item
/// carries the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u128);

/// Identity of a single block in the sequence. Survives edits to the
/// block's content and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u128);

macro_rules! uuid_backed {
    ($name:ident) => {
        impl fmt::Display for $name {
            /// Low 32 bits in hex; enough to tell ids apart in logs and outlines.
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:x}", self.0 & 0xffff_ffff)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                Uuid::from_u128(self.0).serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Uuid::deserialize(deserializer).map(|uuid| $name(uuid.as_u128()))
            }
        }
    };
}

uuid_backed!(ItemId);
uuid_backed!(BlockId);

/// Source of fresh ids.
///
/// `Random` draws v4 UUIDs and is what documents use by default.
/// `Sequential` hands out 1, 2, 3, ... so tests and snapshots are
/// reproducible. Block and item ids share one counter, so a sequential
/// generator never repeats a number across the two kinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdGenerator {
    #[default]
    Random,
    Sequential { next: u128 },
}

impl IdGenerator {
    pub fn random() -> Self {
        IdGenerator::Random
    }

    /// Sequential generator whose first id is `start`.
    pub fn sequential(start: u128) -> Self {
        IdGenerator::Sequential { next: start }
    }

    fn next_raw(&mut self) -> u128 {
        match self {
            IdGenerator::Random => Uuid::new_v4().as_u128(),
            IdGenerator::Sequential { next } => {
                let id = *next;
                *next += 1;
                id
            }
        }
    }

    pub fn item_id(&mut self) -> ItemId {
        ItemId(self.next_raw())
    }

    pub fn block_id(&mut self) -> BlockId {
        BlockId(self.next_raw())
    }
}
