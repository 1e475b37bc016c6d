//! Payloads carried in block bodies.

use serde::{Deserialize, Serialize};

/// Data stored in the genesis block.
pub const GENESIS_DATA: &str = "Genesis Block";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisEntry {
    pub data: String,
}

/// A registered star together with the address that proved ownership of it.
///
/// `star` is kept as free-form JSON; registry clients conventionally send
/// `{"dec": .., "ra": .., "story": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarEntry {
    pub owner: String,
    pub star: serde_json::Value,
}

/// Everything a block body can decode to.
///
/// Serialized untagged so the stored JSON stays `{"data": ..}` for genesis and
/// `{"owner": .., "star": ..}` for registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockBody {
    Star(StarEntry),
    Genesis(GenesisEntry),
}

impl BlockBody {
    pub fn genesis() -> Self {
        BlockBody::Genesis(GenesisEntry {
            data: GENESIS_DATA.to_string(),
        })
    }

    pub fn star(owner: impl Into<String>, star: serde_json::Value) -> Self {
        BlockBody::Star(StarEntry {
            owner: owner.into(),
            star,
        })
    }

    pub fn into_star(self) -> Option<StarEntry> {
        match self {
            BlockBody::Star(entry) => Some(entry),
            BlockBody::Genesis(_) => None,
        }
    }
}
