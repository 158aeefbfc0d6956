use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Opaque session token handed to a browser after login
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub [u8; 32]);

impl SessionToken {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a token from its cookie form. Anything but 64 hex chars is rejected.
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidToken)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| Error::InvalidToken)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
