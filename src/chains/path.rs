//! Derivation path parsing
//!
//! Paths are fixed per-chain constants (`m/44'/60'/0'/0/0`). Both `'` and `h`
//! are accepted as the hardened marker.

use bitcoin::bip32::{self, ChildNumber};
use std::fmt;
use std::str::FromStr;

use crate::error::DerivationError;

pub const HARDENED_OFFSET: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildIndex {
    pub index: u32,
    pub hardened: bool,
}

impl ChildIndex {
    /// Index as used on the wire: hardened indices carry the top bit.
    pub fn raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    raw: String,
    segments: Vec<ChildIndex>,
}

impl DerivationPath {
    pub fn segments(&self) -> &[ChildIndex] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_fully_hardened(&self) -> bool {
        self.segments.iter().all(|s| s.hardened)
    }

    /// Convert to the BIP-32 path type used by the `bitcoin` crate
    pub fn to_bip32(&self) -> Result<bip32::DerivationPath, DerivationError> {
        let children = self
            .segments
            .iter()
            .map(|s| {
                if s.hardened {
                    ChildNumber::from_hardened_idx(s.index)
                } else {
                    ChildNumber::from_normal_idx(s.index)
                }
                .map_err(|e| DerivationError::PathParse(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bip32::DerivationPath::from(children))
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('/');

        match parts.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(DerivationError::PathParse(format!(
                    "path must start with 'm': {}",
                    s
                )))
            }
        }

        let mut segments = Vec::new();
        for part in parts {
            let (digits, hardened) = match part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .or_else(|| part.strip_suffix('H'))
            {
                Some(d) => (d, true),
                None => (part, false),
            };

            let index: u32 = digits.parse().map_err(|_| {
                DerivationError::PathParse(format!("invalid segment '{}' in {}", part, s))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(DerivationError::PathParse(format!(
                    "segment '{}' out of range in {}",
                    part, s
                )));
            }
            segments.push(ChildIndex { index, hardened });
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
