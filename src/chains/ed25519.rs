//! SLIP-0010 derivation over ed25519 (Solana, Sui)
//!
//! ed25519 has no public-key (non-hardened) child derivation, so every path
//! segment must be hardened.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{SigningKey, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use super::{Blockchain, ChainDeriver, DerivationPath, MasterSeed, WalletData};
use crate::error::DerivationError;

type HmacSha512 = Hmac<Sha512>;
type Blake2b256 = Blake2b<U32>;

const ED25519_CURVE_KEY: &[u8] = b"ed25519 seed";

/// Sui signature-scheme flag for ed25519 keys
pub const SUI_ED25519_FLAG: u8 = 0x00;

/// Address encoding for an ed25519 public key
pub trait Ed25519Encoder: Send + Sync {
    fn encode_address(&self, public_key: &VerifyingKey) -> String;

    fn export_private_key(&self, signing_key: &SigningKey) -> String {
        format!("0x{}", hex::encode(signing_key.to_bytes()))
    }
}

/// Base58 of the raw 32-byte public key
pub struct SolanaEncoder;

impl Ed25519Encoder for SolanaEncoder {
    fn encode_address(&self, public_key: &VerifyingKey) -> String {
        bitcoin::base58::encode(public_key.as_bytes())
    }

    /// Solana wallets import the 64-byte `secret || public` keypair in Base58
    fn export_private_key(&self, signing_key: &SigningKey) -> String {
        let keypair = Zeroizing::new(signing_key.to_keypair_bytes());
        bitcoin::base58::encode(keypair.as_slice())
    }
}

/// `0x` + hex(blake2b-256(flag || public key))
pub struct SuiEncoder;

impl Ed25519Encoder for SuiEncoder {
    fn encode_address(&self, public_key: &VerifyingKey) -> String {
        let mut hasher = Blake2b256::new();
        hasher.update([SUI_ED25519_FLAG]);
        hasher.update(public_key.as_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

/// SLIP-0010 master key and hardened child chain for ed25519
pub fn slip10_derive(
    seed: &[u8],
    path: &DerivationPath,
) -> Result<Zeroizing<[u8; 32]>, DerivationError> {
    if !path.is_fully_hardened() {
        return Err(DerivationError::PathParse(format!(
            "ed25519 requires hardened segments only: {}",
            path
        )));
    }

    let mut mac = HmacSha512::new_from_slice(ED25519_CURVE_KEY)
        .map_err(|e| DerivationError::LibraryFailure(e.to_string()))?;
    mac.update(seed);
    let mut digest = Zeroizing::new([0u8; 64]);
    digest.copy_from_slice(&mac.finalize().into_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    let mut chain_code = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest[..32]);
    chain_code.copy_from_slice(&digest[32..]);

    for segment in path.segments() {
        let mut mac = HmacSha512::new_from_slice(chain_code.as_slice())
            .map_err(|e| DerivationError::LibraryFailure(e.to_string()))?;
        mac.update(&[0x00]);
        mac.update(key.as_slice());
        mac.update(&segment.raw().to_be_bytes());
        digest.copy_from_slice(&mac.finalize().into_bytes());

        key.copy_from_slice(&digest[..32]);
        chain_code.copy_from_slice(&digest[32..]);
    }

    Ok(key)
}

pub struct Ed25519Deriver {
    blockchain: Blockchain,
    path: DerivationPath,
    encoder: Box<dyn Ed25519Encoder>,
}

impl Ed25519Deriver {
    pub fn new(
        blockchain: Blockchain,
        path: DerivationPath,
        encoder: Box<dyn Ed25519Encoder>,
    ) -> Result<Self, DerivationError> {
        if !path.is_fully_hardened() {
            return Err(DerivationError::PathParse(format!(
                "{} path must be fully hardened: {}",
                blockchain, path
            )));
        }
        Ok(Self {
            blockchain,
            path,
            encoder,
        })
    }
}

impl ChainDeriver for Ed25519Deriver {
    fn blockchain(&self) -> Blockchain {
        self.blockchain
    }

    fn path(&self) -> &DerivationPath {
        &self.path
    }

    fn derive_from(
        &self,
        seed: &MasterSeed,
        path: &DerivationPath,
    ) -> Result<WalletData, DerivationError> {
        let key = slip10_derive(seed.as_bytes(), path)?;
        let signing_key = SigningKey::from_bytes(&key);
        let verifying_key = signing_key.verifying_key();

        Ok(WalletData::new(
            self.blockchain,
            self.encoder.encode_address(&verifying_key),
            verifying_key.to_bytes().to_vec(),
            key.to_vec(),
            self.encoder.export_private_key(&signing_key),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slip10_vector_1_master_and_child() {
        // SLIP-0010 test vector 1 (ed25519)
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();

        let master = slip10_derive(&seed, &"m".parse().unwrap()).unwrap();
        assert_eq!(
            hex::encode(master.as_slice()),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );

        let child = slip10_derive(&seed, &"m/0'".parse().unwrap()).unwrap();
        assert_eq!(
            hex::encode(child.as_slice()),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn test_rejects_non_hardened_path() {
        let seed = [7u8; 64];
        let result = slip10_derive(&seed, &"m/44'/501'/0/0'".parse().unwrap());
        assert!(matches!(result, Err(DerivationError::PathParse(_))));

        let deriver = Ed25519Deriver::new(
            Blockchain::Solana,
            "m/44'/501'/0'/0".parse().unwrap(),
            Box::new(SolanaEncoder),
        );
        assert!(deriver.is_err());
    }

    #[test]
    fn test_solana_address_shape() {
        let seed = MasterSeed::from_bytes([42u8; 64]);
        let deriver = Ed25519Deriver::new(
            Blockchain::Solana,
            Blockchain::Solana.default_path().parse().unwrap(),
            Box::new(SolanaEncoder),
        )
        .unwrap();
        let wallet = deriver.derive(&seed).unwrap();

        assert!((32..=44).contains(&wallet.address.len()));
        let decoded = bitcoin::base58::decode(&wallet.address).unwrap();
        assert_eq!(decoded, wallet.public_key);

        let exported = bitcoin::base58::decode(wallet.export_private_key()).unwrap();
        assert_eq!(exported.len(), 64);
        assert_eq!(&exported[32..], wallet.public_key.as_slice());
    }

    #[test]
    fn test_sui_address_shape() {
        let seed = MasterSeed::from_bytes([3u8; 64]);
        let deriver = Ed25519Deriver::new(
            Blockchain::Sui,
            Blockchain::Sui.default_path().parse().unwrap(),
            Box::new(SuiEncoder),
        )
        .unwrap();
        let wallet = deriver.derive(&seed).unwrap();

        assert!(wallet.address.starts_with("0x"));
        assert_eq!(wallet.address.len(), 66);
        assert!(wallet.address[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }
}
