//! Cryptographic primitives for StarChain
//!
//! Ownership of a star entry is proven with a Bitcoin signed message: the
//! wallet signs the challenge with its secp256k1 key and the ledger recovers
//! the public key from the 65-byte compact signature, hashes it and compares
//! the result with the P2PKH address the caller claims.

use crate::error::ChainError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Prefix mixed into every signed message so a signature can never double as
/// a transaction signature.
const MESSAGE_MAGIC: &str = "Bitcoin Signed Message:\n";

/// Length of a serialized message signature: header byte plus compact (r, s).
pub const MESSAGE_SIGNATURE_SIZE: usize = 65;

/// Header bytes 27..=30 sign with an uncompressed key, 31..=34 with a compressed one.
const HEADER_BASE: u8 = 27;
const HEADER_COMPRESSED_FLAG: u8 = 4;

/// Which address prefix a key pair renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    /// Base58check version byte for pay-to-pubkey-hash addresses.
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn from_p2pkh_version(version: u8) -> Option<Self> {
        match version {
            0x00 => Some(Network::Mainnet),
            0x6f => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(ChainError::ConfigError(format!("Unknown network: {}", other))),
        }
    }
}

/// RIPEMD-160 of SHA-256, the hash committed to by a P2PKH address.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Renders serialized public key bytes (compressed or not) as a P2PKH address.
pub fn p2pkh_address(public_key_bytes: &[u8], network: Network) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_version());
    payload.extend_from_slice(&hash160(public_key_bytes));
    bs58::encode(payload).with_check().into_string()
}

/// Decodes a P2PKH address into its network and 20-byte public key hash.
pub fn decode_p2pkh_address(address: &str) -> Result<(Network, [u8; 20]), ChainError> {
    let payload = bs58::decode(address)
        .with_check(None)
        .into_vec()
        .map_err(|e| ChainError::CryptoError(format!("Invalid address encoding: {}", e)))?;

    if payload.len() != 21 {
        return Err(ChainError::CryptoError(format!(
            "Address payload must be 21 bytes, got {}",
            payload.len()
        )));
    }

    let network = Network::from_p2pkh_version(payload[0]).ok_or_else(|| {
        ChainError::CryptoError(format!("Unsupported address version: {:#04x}", payload[0]))
    })?;

    let mut pubkey_hash = [0u8; 20];
    pubkey_hash.copy_from_slice(&payload[1..]);
    Ok((network, pubkey_hash))
}

fn write_varint(buf: &mut Vec<u8>, n: usize) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&(n as u64).to_le_bytes());
        }
    }
}

/// Double SHA-256 of the magic-prefixed message, the digest that actually gets signed.
pub fn signed_message_digest(message: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(MESSAGE_MAGIC.len() + message.len() + 10);
    write_varint(&mut buf, MESSAGE_MAGIC.len());
    buf.extend_from_slice(MESSAGE_MAGIC.as_bytes());
    write_varint(&mut buf, message.len());
    buf.extend_from_slice(message.as_bytes());

    Sha256::digest(Sha256::digest(&buf)).into()
}

/// Verifies a base64 message signature against a P2PKH address.
///
/// Every failure, malformed input included, is reported as
/// [`ChainError::InvalidSignature`] with the reason attached.
pub fn verify_message(address: &str, message: &str, signature: &str) -> Result<(), ChainError> {
    let (network, expected_hash) = decode_p2pkh_address(address)
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;

    let sig_bytes = STANDARD
        .decode(signature.trim())
        .map_err(|e| ChainError::InvalidSignature(format!("Signature is not base64: {}", e)))?;

    if sig_bytes.len() != MESSAGE_SIGNATURE_SIZE {
        return Err(ChainError::InvalidSignature(format!(
            "Signature must be exactly {} bytes, got {}",
            MESSAGE_SIGNATURE_SIZE,
            sig_bytes.len()
        )));
    }

    let header = sig_bytes[0];
    if !(HEADER_BASE..HEADER_BASE + 8).contains(&header) {
        return Err(ChainError::InvalidSignature(format!(
            "Unsupported signature header byte: {}",
            header
        )));
    }
    let flags = header - HEADER_BASE;
    let compressed = flags & HEADER_COMPRESSED_FLAG != 0;
    let recovery_id = RecoveryId::from_i32(i32::from(flags & 0x03))
        .map_err(|e| ChainError::InvalidSignature(format!("Invalid recovery id: {}", e)))?;

    let recoverable = RecoverableSignature::from_compact(&sig_bytes[1..], recovery_id)
        .map_err(|e| ChainError::InvalidSignature(format!("Malformed signature: {}", e)))?;

    let digest = Message::from_digest(signed_message_digest(message));
    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&digest, &recoverable)
        .map_err(|_| ChainError::InvalidSignature("Public key recovery failed".to_string()))?;

    let recovered_hash = if compressed {
        hash160(&public_key.serialize())
    } else {
        hash160(&public_key.serialize_uncompressed())
    };

    if recovered_hash != expected_hash {
        return Err(ChainError::InvalidSignature(format!(
            "Signature does not match {} address {}",
            network, address
        )));
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(ChainError::CryptoError(format!(
                "Secret key must be {} bytes, got {}",
                SECRET_KEY_SIZE,
                bytes.len()
            )));
        }
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key bytes: {}", e)))?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// P2PKH address of the compressed public key.
    pub fn address(&self, network: Network) -> String {
        p2pkh_address(&self.public_key_bytes(), network)
    }

    /// Signs `message` the way wallets do for "sign message" and returns the
    /// base64 signature accepted by [`verify_message`].
    pub fn sign_message(&self, message: &str) -> String {
        let digest = Message::from_digest(signed_message_digest(message));
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&digest, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = [0u8; MESSAGE_SIGNATURE_SIZE];
        out[0] = HEADER_BASE + HEADER_COMPRESSED_FLAG + recovery_id.to_i32() as u8;
        out[1..].copy_from_slice(&compact);
        STANDARD.encode(out)
    }
}
