//! Local secp256k1 key for signing legacy (EIP-155) transactions

use k256::ecdsa::{RecoveryId, Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::abi::keccak256;
use super::address::Address;
use crate::error::{ClientError, Result};

/// Unsigned legacy transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u128,
    pub gas_price: u128,
    pub gas: u128,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn rlp_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp_uint(self.nonce),
            rlp_uint(self.gas_price),
            rlp_uint(self.gas),
            rlp_bytes(self.to.as_bytes()),
            rlp_uint(self.value),
            rlp_bytes(&self.data),
        ]
    }

    /// Keccak of the EIP-155 signing payload for `chain_id`
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut fields = self.rlp_fields();
        fields.extend([rlp_uint(chain_id as u128), rlp_uint(0), rlp_uint(0)]);
        keccak256(&rlp_list(&fields))
    }
}

/// Private key held in memory, bound to one chain id
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
    chain_id: u64,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl LocalSigner {
    /// Parse a 32-byte hex private key, with or without `0x`
    pub fn from_hex(private_key: &str, chain_id: u64) -> Result<Self> {
        let raw = private_key.trim();
        let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
            .map_err(|_| ClientError::Configuration("Private key is not valid hex".into()))?;
        if bytes.len() != 32 {
            return Err(ClientError::Configuration(format!(
                "Private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| ClientError::Configuration("Private key is out of range".into()))?;

        let point = key.verifying_key().as_affine().to_encoded_point(false);
        let hash = keccak256(&point.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);

        Ok(Self {
            key,
            address: Address::from_bytes(address),
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn sign_digest(&self, hash: &[u8; 32]) -> Result<(Signature, RecoveryId)> {
        self.key
            .sign_prehash_recoverable(hash)
            .map_err(|e| ClientError::Configuration(format!("Failed to sign transaction: {e}")))
    }

    /// RLP-encoded signed transaction, ready for `eth_sendRawTransaction`
    pub fn sign(&self, tx: &LegacyTransaction) -> Result<Vec<u8>> {
        let (signature, recovery) = self.sign_digest(&tx.signing_hash(self.chain_id))?;
        let v = self.chain_id as u128 * 2 + 35 + recovery.to_byte() as u128;
        let rs = signature.to_bytes();

        let mut fields = tx.rlp_fields();
        fields.extend([
            rlp_uint(v),
            rlp_bytes(strip_leading_zeros(&rs[..32])),
            rlp_bytes(strip_leading_zeros(&rs[32..])),
        ]);
        Ok(rlp_list(&fields))
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn rlp_length_prefix(offset: u8, len: usize) -> Vec<u8> {
    if len <= 55 {
        return vec![offset + len as u8];
    }
    let len_bytes = len.to_be_bytes();
    let len_bytes = strip_leading_zeros(&len_bytes);
    let mut out = vec![offset + 55 + len_bytes.len() as u8];
    out.extend_from_slice(len_bytes);
    out
}

fn rlp_bytes(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 1 && bytes[0] < 0x80 {
        return bytes.to_vec();
    }
    let mut out = rlp_length_prefix(0x80, bytes.len());
    out.extend_from_slice(bytes);
    out
}

fn rlp_uint(value: u128) -> Vec<u8> {
    let be = value.to_be_bytes();
    rlp_bytes(strip_leading_zeros(&be))
}

fn rlp_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut out = rlp_length_prefix(0xc0, payload.len());
    out.extend(payload);
    out
}
