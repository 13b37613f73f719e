//! Farmer identities and address handling
//!
//! Addresses are Base58Check strings (25 bytes: version, 20-byte hash,
//! 4-byte checksum). A wallet reference is a Base58 encoded 32-byte secret
//! from which the authentication address is derived.
//!
//! The [`Identity`] used as the shard seed root is derived from the payout
//! address, so the same payout address produces the same shards everywhere.

use crate::error::{FarmError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Address version bytes accepted by [`PayoutAddress::parse`]
pub const ADDRESS_VERSIONS: [u8; 4] = [0x00, 0x05, 0x6f, 0xc4];

/// Version byte used for derived authentication addresses
const AUTH_ADDRESS_VERSION: u8 = 0x00;

const ADDRESS_LEN: usize = 25;
const WALLET_SECRET_LEN: usize = 32;

fn checksum(payload: &[u8]) -> [u8; 4] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// A validated payout (or authentication) address
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PayoutAddress(String);

impl PayoutAddress {
    /// Parse and validate a Base58Check address
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|_| FarmError::InvalidAddress(s.to_string()))?;

        if bytes.len() != ADDRESS_LEN {
            return Err(FarmError::InvalidAddress(s.to_string()));
        }
        if !ADDRESS_VERSIONS.contains(&bytes[0]) {
            return Err(FarmError::InvalidAddress(s.to_string()));
        }
        let (payload, check) = bytes.split_at(ADDRESS_LEN - 4);
        if checksum(payload) != check {
            return Err(FarmError::InvalidAddress(s.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Build an address from a version byte and a 20-byte key hash
    pub fn from_key_hash(version: u8, key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(ADDRESS_LEN);
        bytes.push(version);
        bytes.extend_from_slice(key_hash);
        let check = checksum(&bytes);
        bytes.extend_from_slice(&check);
        Self(bs58::encode(bytes).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PayoutAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayoutAddress({})", self.0)
    }
}

impl fmt::Display for PayoutAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to the wallet holding the farmer's authentication key
#[derive(Clone, PartialEq, Eq)]
pub struct WalletRef(String);

impl WalletRef {
    /// Generate a fresh wallet from the OS random source
    pub fn generate() -> Self {
        let mut secret = [0u8; WALLET_SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        Self(bs58::encode(secret).into_string())
    }

    /// Parse and validate a wallet reference
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let bytes = bs58::decode(trimmed)
            .into_vec()
            .map_err(|_| FarmError::InvalidWallet("not base58".to_string()))?;
        if bytes.len() != WALLET_SECRET_LEN {
            return Err(FarmError::InvalidWallet(format!(
                "expected {} byte secret, got {}",
                WALLET_SECRET_LEN,
                bytes.len()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Address the remote authority knows this farmer by
    pub fn auth_address(&self) -> PayoutAddress {
        let digest = Sha256::new()
            .chain_update(b"shardfarm auth key")
            .chain_update(self.0.as_bytes())
            .finalize();
        let mut key_hash = [0u8; 20];
        key_hash.copy_from_slice(&digest[..20]);
        PayoutAddress::from_key_hash(AUTH_ADDRESS_VERSION, &key_hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the secret.
impl fmt::Debug for WalletRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletRef(..)")
    }
}

/// Deterministic seed root for shard generation
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Identity of a farmer paid out to `address`
    pub fn from_address(address: &PayoutAddress) -> Self {
        Self(address.as_str().as_bytes().to_vec())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Identity({})", &hex[..hex.len().min(16)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known mainnet P2PKH address (genesis coinbase)
    const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

    #[test]
    fn test_parse_valid_address() {
        let addr = PayoutAddress::parse(GENESIS).unwrap();
        assert_eq!(addr.as_str(), GENESIS);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let mut bad = GENESIS.to_string();
        bad.pop();
        bad.push('b');
        assert!(matches!(
            PayoutAddress::parse(&bad),
            Err(FarmError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PayoutAddress::parse("invalid").is_err());
        assert!(PayoutAddress::parse("").is_err());
        assert!(PayoutAddress::parse("0OIl").is_err());
    }

    #[test]
    fn test_from_key_hash_roundtrip() {
        let addr = PayoutAddress::from_key_hash(0x00, &[7u8; 20]);
        assert!(addr.as_str().starts_with('1'));
        assert_eq!(PayoutAddress::parse(addr.as_str()).unwrap(), addr);
    }

    #[test]
    fn test_wallet_generate_and_parse() {
        let wallet = WalletRef::generate();
        let parsed = WalletRef::parse(wallet.as_str()).unwrap();
        assert_eq!(parsed, wallet);
        assert_ne!(WalletRef::generate(), wallet);

        assert!(matches!(
            WalletRef::parse(GENESIS),
            Err(FarmError::InvalidWallet(_))
        ));
    }

    #[test]
    fn test_auth_address_is_stable_and_valid() {
        let wallet = WalletRef::generate();
        let a = wallet.auth_address();
        let b = WalletRef::parse(wallet.as_str()).unwrap().auth_address();
        assert_eq!(a, b);
        assert!(PayoutAddress::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_wallet_debug_hides_secret() {
        let wallet = WalletRef::generate();
        assert_eq!(format!("{:?}", wallet), "WalletRef(..)");
    }

    #[test]
    fn test_identity_from_address() {
        let addr = PayoutAddress::parse(GENESIS).unwrap();
        assert_eq!(Identity::from_address(&addr).as_bytes(), GENESIS.as_bytes());
    }
}
