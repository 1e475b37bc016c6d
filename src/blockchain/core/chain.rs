use crate::blockchain::core::block::Block;
use crate::blockchain::core::challenge::Challenge;
use crate::blockchain::core::entry::{BlockBody, StarEntry};
use crate::blockchain::core::validation::{audit_blocks, IntegrityViolation};
use crate::config::LedgerConfig;
use crate::crypto::verify_message;
use crate::error::ChainError;
use tracing::{debug, info, warn};

/// Current Unix time in seconds.
pub fn current_time() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Source of Unix seconds for challenges and block timestamps.
pub type Clock = fn() -> u64;

/// The star registry ledger.
///
/// Appends take `&mut self`, so a single owner can never interleave two of
/// them. Share it behind `Arc<tokio::sync::RwLock<Blockchain>>`: writers hold
/// the lock for a whole registration, readers only need a read guard.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub(crate) blocks: Vec<Block>,
    config: LedgerConfig,
    clock: Clock,
}

impl Blockchain {
    /// Create a ledger with the default signing window, genesis included.
    pub fn new() -> Result<Self, ChainError> {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Result<Self, ChainError> {
        Self::with_clock(config, current_time)
    }

    /// Like [`Blockchain::with_config`], reading time from `clock` instead of
    /// the system clock. Every challenge and block timestamp comes from it.
    pub fn with_clock(config: LedgerConfig, clock: Clock) -> Result<Self, ChainError> {
        let mut blockchain = Blockchain {
            blocks: vec![],
            config,
            clock,
        };
        blockchain.initialize(clock())?;
        Ok(blockchain)
    }

    /// Unix seconds according to the ledger's clock.
    pub fn now(&self) -> u64 {
        (self.clock)()
    }

    fn initialize(&mut self, now: u64) -> Result<(), ChainError> {
        if !self.blocks.is_empty() {
            return Ok(());
        }
        let genesis = self.add_block(&BlockBody::genesis(), now)?;
        info!(hash = %genesis.hash, "genesis block created");
        Ok(())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Height of the last block.
    pub fn current_height(&self) -> u64 {
        self.blocks.last().map_or(0, |b| b.height)
    }

    /// The last appended block. Always present once the ledger is constructed.
    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Seal `body` into a new block at the tip of the chain.
    ///
    /// Block times never go backwards: a clock behind the tip is clamped to it.
    pub(crate) fn add_block(&mut self, body: &BlockBody, now: u64) -> Result<Block, ChainError> {
        let mut block = Block::new(body)?;

        let previous = self.blocks.last();
        block.height = previous.map_or(0, |b| b.height + 1);
        block.time = previous.map_or(now, |b| now.max(b.time));
        block.previous_block_hash = previous.map(|b| b.hash.clone());
        block.hash = block.compute_hash();

        self.blocks.push(block.clone());
        debug!(height = block.height, hash = %block.hash, "block appended");
        Ok(block)
    }

    /// Message the wallet at `address` has to sign to register a star.
    pub fn request_ownership_verification(&self, address: &str) -> String {
        self.request_ownership_verification_at(address, self.now())
    }

    pub(crate) fn request_ownership_verification_at(&self, address: &str, now: u64) -> String {
        Challenge::new(address, now).to_string()
    }

    /// Check a signed challenge without touching the chain.
    pub fn verify_submission(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<(), ChainError> {
        self.verify_submission_at(address, message, signature, self.now())
    }

    fn verify_submission_at(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        now: u64,
    ) -> Result<(), ChainError> {
        let challenge: Challenge = message.parse()?;

        let window_secs = self.config.challenge_window_secs;
        if challenge.age(now) > window_secs {
            return Err(ChainError::ExpiredChallenge {
                issued_at: challenge.issued_at,
                now,
                window_secs,
            });
        }

        if let Some(skew) = self.config.max_clock_skew_secs {
            if challenge.issued_at > now.saturating_add(skew) {
                return Err(ChainError::ChallengeFromFuture {
                    issued_at: challenge.issued_at,
                    now,
                });
            }
        }

        verify_message(address, message, signature)
    }

    /// Register `star` for `address` once the signed challenge checks out.
    pub fn submit_star(
        &mut self,
        address: &str,
        message: &str,
        signature: &str,
        star: serde_json::Value,
    ) -> Result<Block, ChainError> {
        self.submit_star_at(address, message, signature, star, self.now())
    }

    pub(crate) fn submit_star_at(
        &mut self,
        address: &str,
        message: &str,
        signature: &str,
        star: serde_json::Value,
        now: u64,
    ) -> Result<Block, ChainError> {
        if let Err(e) = self.verify_submission_at(address, message, signature, now) {
            warn!(address, error = %e, "star registration rejected");
            return Err(e);
        }

        let block = self.add_block(&BlockBody::star(address, star), now)?;
        info!(address, height = block.height, hash = %block.hash, "star registered");
        Ok(block)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == hash)
    }

    pub fn get_block_by_height(&self, height: u64) -> Option<&Block> {
        usize::try_from(height)
            .ok()
            .and_then(|index| self.blocks.get(index))
            .filter(|b| b.height == height)
    }

    /// Stars owned by `address`, in chain order.
    pub fn get_stars_by_wallet_address<'a>(
        &'a self,
        address: &'a str,
    ) -> impl Iterator<Item = StarEntry> + 'a {
        self.blocks
            .iter()
            .filter_map(Block::decode_body)
            .filter(move |entry| entry.owner == address)
    }

    /// Every integrity problem in the chain; empty when the chain is sound.
    pub fn audit(&self) -> Vec<IntegrityViolation> {
        audit_blocks(&self.blocks)
    }

    /// Human-readable form of [`Blockchain::audit`].
    pub fn validate_chain(&self) -> Vec<String> {
        self.audit().iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{KeyPair, Network};
    use serde_json::json;

    const NOW: u64 = 1_700_000_000;

    fn ledger() -> Blockchain {
        Blockchain::with_clock(LedgerConfig::default(), || NOW).unwrap()
    }

    fn signed_challenge(chain: &Blockchain, keypair: &KeyPair, issued_at: u64) -> (String, String, String) {
        let address = keypair.address(Network::Testnet);
        let message = chain.request_ownership_verification_at(&address, issued_at);
        let signature = keypair.sign_message(&message);
        (address, message, signature)
    }

    #[test]
    fn test_genesis_invariant() {
        let chain = ledger();
        assert_eq!(chain.len(), 1);
        let genesis = chain.get_block_by_height(0).unwrap();
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.time, NOW);
        assert!(genesis.previous_block_hash.is_none());
        assert!(genesis.validate());
        assert_eq!(genesis.payload(), Some(BlockBody::genesis()));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut chain = ledger();
        let genesis_hash = chain.blocks[0].hash.clone();
        chain.initialize(NOW + 10).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.blocks[0].hash, genesis_hash);
    }

    #[test]
    fn test_heights_and_links() {
        let mut chain = ledger();
        for i in 0..5 {
            chain
                .add_block(&BlockBody::star("a", json!({ "n": i })), NOW + i)
                .unwrap();
        }

        assert_eq!(chain.current_height(), 5);
        for (i, block) in chain.blocks().iter().enumerate() {
            assert_eq!(block.height, i as u64);
            assert!(block.validate());
            if i > 0 {
                assert_eq!(
                    block.previous_block_hash.as_deref(),
                    Some(chain.blocks[i - 1].hash.as_str())
                );
            }
        }
        assert!(chain.validate_chain().is_empty());
    }

    #[test]
    fn test_submit_star_links_to_genesis() {
        let mut chain = ledger();
        let keypair = KeyPair::generate();
        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW);

        let block = chain
            .submit_star_at(&address, &message, &signature, json!({ "story": "x" }), NOW + 1)
            .unwrap();

        assert_eq!(block.height, 1);
        assert_eq!(block.time, NOW + 1);
        assert_eq!(block.previous_block_hash, Some(chain.blocks[0].hash.clone()));
        assert_eq!(chain.latest_block(), Some(&block));
        assert_eq!(block.decode_body().unwrap().owner, address);
    }

    #[test]
    fn test_expiry_boundary() {
        let mut chain = ledger();
        let keypair = KeyPair::generate();
        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW);

        let err = chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW + 301)
            .unwrap_err();
        assert!(matches!(err, ChainError::ExpiredChallenge { issued_at: NOW, .. }));
        assert_eq!(chain.current_height(), 0);

        let block = chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW + 300)
            .unwrap();
        assert_eq!(block.height, 1);
    }

    #[test]
    fn test_custom_window() {
        let config = LedgerConfig {
            challenge_window_secs: 10,
            ..LedgerConfig::default()
        };
        let mut chain = Blockchain::with_clock(config, || NOW).unwrap();
        let keypair = KeyPair::generate();
        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW);

        let result = chain.submit_star_at(&address, &message, &signature, json!({}), NOW + 11);
        assert!(matches!(result, Err(ChainError::ExpiredChallenge { window_secs: 10, .. })));
    }

    #[test]
    fn test_future_challenge_is_lenient_by_default() {
        let mut chain = ledger();
        let keypair = KeyPair::generate();
        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW + 3600);

        assert!(chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW)
            .is_ok());
    }

    #[test]
    fn test_future_challenge_bounded_when_configured() {
        let config = LedgerConfig {
            max_clock_skew_secs: Some(30),
            ..LedgerConfig::default()
        };
        let mut chain = Blockchain::with_clock(config, || NOW).unwrap();
        let keypair = KeyPair::generate();

        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW + 31);
        let err = chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW)
            .unwrap_err();
        assert!(matches!(err, ChainError::ChallengeFromFuture { .. }));

        let (address, message, signature) = signed_challenge(&chain, &keypair, NOW + 30);
        assert!(chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW)
            .is_ok());
    }

    #[test]
    fn test_wrong_signature_leaves_chain_unchanged() {
        let mut chain = ledger();
        let owner = KeyPair::generate();
        let impostor = KeyPair::generate();
        let address = owner.address(Network::Testnet);
        let message = chain.request_ownership_verification_at(&address, NOW);
        let signature = impostor.sign_message(&message);

        let err = chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW)
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidSignature(_)));
        assert_eq!(chain.current_height(), 0);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_malformed_challenge_is_rejected() {
        let mut chain = ledger();
        let keypair = KeyPair::generate();
        let address = keypair.address(Network::Testnet);
        let message = format!("{}:soon:starRegistry", address);
        let signature = keypair.sign_message(&message);

        let err = chain
            .submit_star_at(&address, &message, &signature, json!({}), NOW)
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidChallenge(_)));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_injected_clock_drives_challenges_and_expiry() {
        let mut chain = ledger();
        assert_eq!(chain.now(), NOW);
        let keypair = KeyPair::generate();
        let address = keypair.address(Network::Testnet);

        let message = chain.request_ownership_verification(&address);
        assert_eq!(message, format!("{}:{}:starRegistry", address, NOW));
        let signature = keypair.sign_message(&message);
        let block = chain.submit_star(&address, &message, &signature, json!({})).unwrap();
        assert_eq!(block.time, NOW);

        let stale = chain.request_ownership_verification_at(&address, NOW - 301);
        let signature = keypair.sign_message(&stale);
        assert!(matches!(
            chain.verify_submission(&address, &stale, &signature),
            Err(ChainError::ExpiredChallenge { .. })
        ));
        let err = chain
            .submit_star(&address, &stale, &signature, json!({}))
            .unwrap_err();
        assert!(matches!(err, ChainError::ExpiredChallenge { now: NOW, .. }));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_block_time_never_goes_backwards() {
        let mut chain = ledger();
        let block = chain.add_block(&BlockBody::star("a", json!(1)), NOW - 50).unwrap();
        assert_eq!(block.time, NOW);
        assert!(block.validate());

        let block = chain.add_block(&BlockBody::star("a", json!(2)), NOW + 5).unwrap();
        assert_eq!(block.time, NOW + 5);
    }

    #[test]
    fn test_lookups() {
        let mut chain = ledger();
        let block = chain.add_block(&BlockBody::star("a", json!(1)), NOW).unwrap();

        assert_eq!(chain.get_block_by_hash(&block.hash), Some(&block));
        assert_eq!(chain.get_block_by_height(1), Some(&block));
        assert!(chain.get_block_by_hash("missing").is_none());
        assert!(chain.get_block_by_height(2).is_none());
        assert!(chain.get_block_by_height(u64::MAX).is_none());
    }

    #[test]
    fn test_stars_by_owner() {
        let mut chain = ledger();
        chain.add_block(&BlockBody::star("alice", json!({ "n": 1 })), NOW).unwrap();
        chain.add_block(&BlockBody::star("bob", json!({ "n": 2 })), NOW).unwrap();
        chain.add_block(&BlockBody::star("alice", json!({ "n": 3 })), NOW).unwrap();

        let stars: Vec<_> = chain.get_stars_by_wallet_address("alice").collect();
        assert_eq!(stars.len(), 2);
        assert_eq!(stars[0].star, json!({ "n": 1 }));
        assert_eq!(stars[1].star, json!({ "n": 3 }));

        assert_eq!(chain.get_stars_by_wallet_address("carol").count(), 0);
    }

    #[test]
    fn test_stars_by_owner_skips_undecodable_blocks() {
        let mut chain = ledger();
        chain.add_block(&BlockBody::star("alice", json!(1)), NOW).unwrap();
        chain.blocks[1].body = "garbage".to_string();
        chain.add_block(&BlockBody::star("alice", json!(2)), NOW).unwrap();

        let stars: Vec<_> = chain.get_stars_by_wallet_address("alice").collect();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].star, json!(2));
    }
}
