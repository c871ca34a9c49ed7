//! Fixed-width proposal names.
//!
//! A proposal name is stored as a 32-byte buffer, null-padded on the right.
//! Human-readable text is converted at the boundary; the ledger itself only
//! ever sees the fixed buffer.

use crate::error::TypesError;
use std::fmt;
use std::str::FromStr;

/// What to do with a display name longer than [`ProposalName::MAX_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NamePolicy {
    /// Refuse the name with [`TypesError::NameTooLong`].
    #[default]
    Reject,
    /// Cut the name at the last character boundary that fits.
    Truncate,
}

impl FromStr for NamePolicy {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(NamePolicy::Reject),
            "truncate" => Ok(NamePolicy::Truncate),
            other => Err(TypesError::UnknownNamePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for NamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePolicy::Reject => write!(f, "reject"),
            NamePolicy::Truncate => write!(f, "truncate"),
        }
    }
}

/// Short display name of a proposal, held as a null-padded 32-byte buffer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProposalName([u8; 32]);

impl ProposalName {
    pub const MAX_LEN: usize = 32;

    /// Encode `text` under the given length policy.
    pub fn new(text: &str, policy: NamePolicy) -> Result<Self, TypesError> {
        let bytes = text.as_bytes();
        let len = if bytes.len() <= Self::MAX_LEN {
            bytes.len()
        } else {
            match policy {
                NamePolicy::Reject => {
                    return Err(TypesError::NameTooLong {
                        max: Self::MAX_LEN,
                        actual: bytes.len(),
                    })
                }
                NamePolicy::Truncate => (0..=Self::MAX_LEN)
                    .rev()
                    .find(|&i| text.is_char_boundary(i))
                    .unwrap_or(0),
            }
        };

        let mut buf = [0u8; 32];
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(Self(buf))
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode the bytes32 hex form (`0x` + 64 hex characters).
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        let s = s.trim();
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)?;
        let buf: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypesError::InvalidNameLength {
                expected: Self::MAX_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(buf))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Text up to the first null byte.
    pub fn text(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(Self::MAX_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl FromStr for ProposalName {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s, NamePolicy::Reject)
    }
}

impl fmt::Display for ProposalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for ProposalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalName({:?})", self.text())
    }
}
