//! BIP-32 derivation over secp256k1
//!
//! One deriver type serves Ethereum, Polygon, Tron and Bitcoin; the chains
//! differ only in how the public key is encoded into an address.

use bitcoin::bip32::Xpriv;
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::{Address, Network, PrivateKey};
use sha3::{Digest, Keccak256};

use super::{Blockchain, ChainDeriver, DerivationPath, MasterSeed, WalletData};
use crate::error::DerivationError;

/// Tron mainnet address version byte
pub const TRON_ADDRESS_VERSION: u8 = 0x41;

/// Address encoding for a secp256k1 public key
pub trait Secp256k1Encoder: Send + Sync {
    fn encode_address(&self, public_key: &PublicKey) -> Result<String, DerivationError>;

    fn export_private_key(&self, secret: &SecretKey) -> String {
        hex::encode(secret.secret_bytes())
    }
}

/// Last 20 bytes of keccak-256 over the uncompressed key (without the 0x04 tag)
pub fn keccak_address_bytes(public_key: &PublicKey) -> [u8; 20] {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = Keccak256::digest(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    out
}

/// Ethereum-style `0x` + 40 lowercase hex characters
pub struct EvmEncoder;

impl Secp256k1Encoder for EvmEncoder {
    fn encode_address(&self, public_key: &PublicKey) -> Result<String, DerivationError> {
        Ok(format!("0x{}", hex::encode(keccak_address_bytes(public_key))))
    }

    fn export_private_key(&self, secret: &SecretKey) -> String {
        format!("0x{}", hex::encode(secret.secret_bytes()))
    }
}

/// Base58Check over `0x41 || keccak20`
pub struct TronEncoder;

impl Secp256k1Encoder for TronEncoder {
    fn encode_address(&self, public_key: &PublicKey) -> Result<String, DerivationError> {
        let mut payload = Vec::with_capacity(21);
        payload.push(TRON_ADDRESS_VERSION);
        payload.extend_from_slice(&keccak_address_bytes(public_key));
        Ok(bitcoin::base58::encode_check(&payload))
    }
}

/// Native SegWit (BIP-84) P2WPKH address
pub struct P2wpkhEncoder {
    network: Network,
}

impl P2wpkhEncoder {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

impl Secp256k1Encoder for P2wpkhEncoder {
    fn encode_address(&self, public_key: &PublicKey) -> Result<String, DerivationError> {
        let compressed = CompressedPublicKey(*public_key);
        Ok(Address::p2wpkh(&compressed, self.network).to_string())
    }

    fn export_private_key(&self, secret: &SecretKey) -> String {
        PrivateKey::new(*secret, self.network).to_wif()
    }
}

pub struct Secp256k1Deriver {
    blockchain: Blockchain,
    path: DerivationPath,
    encoder: Box<dyn Secp256k1Encoder>,
    network: Network,
}

impl Secp256k1Deriver {
    pub fn new(
        blockchain: Blockchain,
        path: DerivationPath,
        encoder: Box<dyn Secp256k1Encoder>,
    ) -> Self {
        Self {
            blockchain,
            path,
            encoder,
            network: Network::Bitcoin,
        }
    }

    /// Network used for the master key's version bytes.
    /// Key material is identical across networks.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }
}

impl ChainDeriver for Secp256k1Deriver {
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
        let secp = Secp256k1::new();

        let master_key = Xpriv::new_master(self.network, seed.as_bytes())
            .map_err(|e| DerivationError::InvalidSeed(e.to_string()))?;

        let bip32_path = path.to_bip32()?;
        let child = master_key
            .derive_priv(&secp, &bip32_path)
            .map_err(|e| DerivationError::LibraryFailure(e.to_string()))?;

        let secret = child.private_key;
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let address = self.encoder.encode_address(&public_key)?;

        Ok(WalletData::new(
            self.blockchain,
            address,
            public_key.serialize().to_vec(),
            secret.secret_bytes().to_vec(),
            self.encoder.export_private_key(&secret),
        ))
    }
}
