//! Retrieved certificate bundles.
//!
//! The backend returns the issued certificate, its chain and optionally the
//! private key as one base64-encoded PEM document. The chain order the
//! caller selected decides where the leaf sits: last for root-first, first
//! otherwise.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use pem::{EncodeConfig, LineEnding, Pem};
use sha1::{Digest, Sha1};

use certward_common::ChainOrder;

use crate::error::{ClientError, ClientResult};

const OPERATION: &str = "decode_certificate";
const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// An issued certificate with its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateBundle {
    /// Leaf certificate, PEM.
    pub certificate: String,
    /// Remaining certificates, PEM, in the order the backend sent them.
    pub chain: Vec<String>,
    /// Private key, PEM, when the backend generated and returned it.
    pub private_key: Option<String>,
    pub order: ChainOrder,
}

impl CertificateBundle {
    /// Decode the base64 body of a retrieve response.
    pub fn from_base64(data: &str, order: ChainOrder) -> ClientResult<Self> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| ClientError::decode(OPERATION, format!("invalid base64: {e}")))?;
        Self::from_pem(&bytes, order)
    }

    /// Split a PEM document into leaf, chain and key.
    pub fn from_pem(data: &[u8], order: ChainOrder) -> ClientResult<Self> {
        let blocks = pem::parse_many(data)
            .map_err(|e| ClientError::decode(OPERATION, format!("invalid PEM: {e}")))?;

        let mut certificates = Vec::new();
        let mut private_key = None;
        for block in blocks {
            if block.tag() == CERTIFICATE_TAG {
                x509_parser::parse_x509_certificate(block.contents()).map_err(|e| {
                    ClientError::decode(OPERATION, format!("invalid certificate: {e}"))
                })?;
                certificates.push(encode(&block));
            } else if block.tag().ends_with("PRIVATE KEY") && private_key.is_none() {
                private_key = Some(encode(&block));
            }
        }

        if certificates.is_empty() {
            return Err(ClientError::decode(OPERATION, "no certificates in response"));
        }

        let certificate = match order {
            ChainOrder::RootFirst => certificates.pop(),
            ChainOrder::RootLast | ChainOrder::Ignore => Some(certificates.remove(0)),
        }
        .ok_or_else(|| ClientError::decode(OPERATION, "no certificates in response"))?;

        Ok(Self {
            certificate,
            chain: certificates,
            private_key,
            order,
        })
    }

    /// Re-assemble the PEM document in the bundle's chain order.
    pub fn to_pem(&self) -> String {
        let mut out = self.certificates_pem();
        if let Some(key) = &self.private_key {
            out.push_str(key);
        }
        out
    }

    /// Leaf and chain, in the bundle's chain order, without the key.
    pub fn certificates_pem(&self) -> String {
        let mut out = String::new();
        match self.order {
            ChainOrder::RootFirst => {
                self.chain.iter().for_each(|c| out.push_str(c));
                out.push_str(&self.certificate);
            }
            ChainOrder::RootLast | ChainOrder::Ignore => {
                out.push_str(&self.certificate);
                self.chain.iter().for_each(|c| out.push_str(c));
            }
        }
        out
    }

    /// DER bytes of the leaf certificate.
    pub fn leaf_der(&self) -> ClientResult<Vec<u8>> {
        pem::parse(&self.certificate)
            .map(|p| p.into_contents())
            .map_err(|e| ClientError::decode(OPERATION, e))
    }

    /// Uppercase hex SHA-1 of the leaf certificate.
    pub fn thumbprint(&self) -> ClientResult<String> {
        Ok(hex::encode_upper(Sha1::digest(self.leaf_der()?)))
    }

    /// Expiry of the leaf certificate.
    pub fn not_after(&self) -> ClientResult<DateTime<Utc>> {
        let der = self.leaf_der()?;
        let (_, cert) = x509_parser::parse_x509_certificate(&der)
            .map_err(|e| ClientError::decode(OPERATION, e))?;
        Utc.timestamp_opt(cert.validity().not_after.timestamp(), 0)
            .single()
            .ok_or_else(|| ClientError::decode(OPERATION, "certificate expiry out of range"))
    }
}

fn encode(block: &Pem) -> String {
    pem::encode_config(block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}
