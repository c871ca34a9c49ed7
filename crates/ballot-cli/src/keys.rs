//! Caller identity from an ed25519 secret key.

use ballot_types::Address;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::fmt;

/// The key a command is submitted with. Its address is the caller identity.
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Generate a new random key
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    /// Parse a 32-byte secret key given as hex, with or without `0x`.
    pub fn from_hex(secret: &str) -> anyhow::Result<Self> {
        let secret = secret.trim();
        let raw = secret.strip_prefix("0x").unwrap_or(secret);
        let bytes = hex::decode(raw).map_err(|e| anyhow::anyhow!("Invalid private key hex: {}", e))?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("Private key must be 32 bytes, got {}", bytes.len()))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.signing_key.verifying_key().to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.verifying_key().to_bytes()))
    }

    /// Export private key hex (CAUTION: sensitive)
    pub fn secret_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer({})", self.address())
    }
}
