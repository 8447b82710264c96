//! Key algorithms, elliptic curves, and the sizes the client supports.
//!
//! The backend reports key algorithms and curves as free-form strings.
//! Parsing is always fallible: an identifier this client does not know
//! is a [`KeySpecError`], never a panic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// RSA modulus sizes the client can request, ascending.
pub const SUPPORTED_KEY_SIZES: [u32; 6] = [512, 1024, 2048, 3072, 4096, 8192];

/// Curves the client can request, in the order the backend advertises them.
pub const SUPPORTED_CURVES: [EllipticCurve; 4] = [
    EllipticCurve::P521,
    EllipticCurve::P256,
    EllipticCurve::P384,
    EllipticCurve::Ed25519,
];

/// RSA key size used when neither caller nor zone picks one.
pub const DEFAULT_RSA_KEY_SIZE: u32 = 2048;

/// Errors from parsing backend key identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySpecError {
    #[error("unknown key algorithm: {0:?}")]
    UnknownAlgorithm(String),

    #[error("unknown elliptic curve: {0:?}")]
    UnknownCurve(String),
}

/// Public key algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyType {
    #[default]
    Rsa,
    Ecdsa,
    Ed25519,
}

impl KeyType {
    /// Parse a backend algorithm name together with its curve.
    ///
    /// The backend reports Ed25519 keys as an elliptic-curve algorithm with
    /// the `ed25519` curve, so the curve decides between ECDSA and Ed25519.
    pub fn from_backend(algorithm: &str, curve: &str) -> Result<Self, KeySpecError> {
        match algorithm.trim().to_ascii_lowercase().as_str() {
            "rsa" => Ok(KeyType::Rsa),
            "ec" | "ecc" | "ecdsa" => {
                if curve.trim().eq_ignore_ascii_case("ed25519") {
                    Ok(KeyType::Ed25519)
                } else {
                    Ok(KeyType::Ecdsa)
                }
            }
            "ed25519" => Ok(KeyType::Ed25519),
            _ => Err(KeySpecError::UnknownAlgorithm(algorithm.to_string())),
        }
    }

    /// Algorithm name the backend expects in request bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            KeyType::Rsa => "RSA",
            KeyType::Ecdsa | KeyType::Ed25519 => "ECC",
        }
    }

    pub fn is_elliptic(&self) -> bool {
        !matches!(self, KeyType::Rsa)
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::Rsa => "RSA",
            KeyType::Ecdsa => "ECDSA",
            KeyType::Ed25519 => "ED25519",
        };
        f.write_str(s)
    }
}

impl FromStr for KeyType {
    type Err = KeySpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyType::from_backend(s, "")
    }
}

/// Named elliptic curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EllipticCurve {
    P256,
    P384,
    P521,
    Ed25519,
}

impl EllipticCurve {
    /// Curve name the backend expects in request bodies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            EllipticCurve::P256 => "P256",
            EllipticCurve::P384 => "P384",
            EllipticCurve::P521 => "P521",
            EllipticCurve::Ed25519 => "ED25519",
        }
    }
}

impl Default for EllipticCurve {
    fn default() -> Self {
        EllipticCurve::P256
    }
}

impl fmt::Display for EllipticCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EllipticCurve {
    type Err = KeySpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p256" | "p-256" | "secp256r1" | "prime256v1" => Ok(EllipticCurve::P256),
            "p384" | "p-384" | "secp384r1" => Ok(EllipticCurve::P384),
            "p521" | "p-521" | "secp521r1" => Ok(EllipticCurve::P521),
            "ed25519" => Ok(EllipticCurve::Ed25519),
            _ => Err(KeySpecError::UnknownCurve(s.to_string())),
        }
    }
}
