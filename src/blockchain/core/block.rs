use crate::blockchain::core::entry::{BlockBody, StarEntry};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single ledger entry.
///
/// `hash`, `height`, `time` and `previous_block_hash` are assigned by
/// [`Blockchain`](crate::blockchain::Blockchain) when the block is appended and
/// never change afterwards. `body` is the hex encoding of the payload's JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub body: String,
    pub time: u64,
    pub previous_block_hash: Option<String>,
}

/// The hashed view of a block: identical field order to [`Block`], with the
/// hash slot blanked.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashPreimage<'a> {
    hash: &'a str,
    height: u64,
    body: &'a str,
    time: u64,
    previous_block_hash: Option<&'a str>,
}

impl Block {
    /// Creates an unsealed block holding `body`.
    pub fn new(body: &BlockBody) -> Result<Self, ChainError> {
        let json = serde_json::to_vec(body)?;
        Ok(Block {
            hash: String::new(),
            height: 0,
            body: hex::encode(json),
            time: 0,
            previous_block_hash: None,
        })
    }

    pub fn compute_hash(&self) -> String {
        let preimage = HashPreimage {
            hash: "",
            height: self.height,
            body: &self.body,
            time: self.time,
            previous_block_hash: self.previous_block_hash.as_deref(),
        };
        // Serializing plain strings and integers cannot fail.
        let bytes = serde_json::to_vec(&preimage).unwrap_or_default();
        hex::encode(Sha256::digest(bytes))
    }

    /// True when the stored hash matches the block's current content.
    pub fn validate(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Full decode of the body, `None` if it is not hex-encoded JSON of a known payload.
    pub fn payload(&self) -> Option<BlockBody> {
        let bytes = hex::decode(&self.body).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// The star registered in this block; `None` for genesis and for undecodable bodies.
    pub fn decode_body(&self) -> Option<StarEntry> {
        self.payload().and_then(BlockBody::into_star)
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}
