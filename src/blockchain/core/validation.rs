use crate::blockchain::core::block::Block;
use serde::Serialize;
use std::fmt;

/// A defect found while auditing the chain. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// Stored hash differs from the recomputed one.
    InvalidBlock { height: u64 },
    /// `previousBlockHash` does not point at the preceding block.
    HashMismatch { height: u64 },
    /// The first block claims a predecessor.
    GenesisHasPredecessor { height: u64 },
}

impl IntegrityViolation {
    pub fn height(&self) -> u64 {
        match self {
            IntegrityViolation::InvalidBlock { height }
            | IntegrityViolation::HashMismatch { height }
            | IntegrityViolation::GenesisHasPredecessor { height } => *height,
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::InvalidBlock { height } => {
                write!(f, "Error invalid block at height: {}", height)
            }
            IntegrityViolation::HashMismatch { height } => {
                write!(f, "Error hash mismatch for block at height: {}.", height)
            }
            IntegrityViolation::GenesisHasPredecessor { height } => {
                write!(f, "Error genesis block at height: {} has a previous hash", height)
            }
        }
    }
}

/// Walks every block, checking self-hashes and predecessor links.
///
/// Does not stop at the first defect: each block contributes at most one entry
/// per failed check, in chain order.
pub fn audit_blocks(blocks: &[Block]) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        if !block.validate() {
            violations.push(IntegrityViolation::InvalidBlock {
                height: block.height,
            });
        }

        match i.checked_sub(1).map(|prev| &blocks[prev]) {
            Some(previous) => {
                if block.previous_block_hash.as_deref() != Some(previous.hash.as_str()) {
                    violations.push(IntegrityViolation::HashMismatch {
                        height: block.height,
                    });
                }
            }
            None => {
                if block.previous_block_hash.is_some() {
                    violations.push(IntegrityViolation::GenesisHasPredecessor {
                        height: block.height,
                    });
                }
            }
        }
    }

    violations
}
