//! RS256 bearer token verification.

use std::collections::HashSet;
use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use serde_json::{Map, Value};
use userserv_core::PrincipalId;

use crate::error::{JwtError, KeyError};

/// Default name of the claim that carries the principal identifier.
pub const DEFAULT_IDENTITY_CLAIM: &str = "userId";

/// Verifies bearer tokens against a single fixed RSA public key.
///
/// The signature and the token structure are always checked. `exp` and `nbf`
/// are honoured when the token carries them but are not required; there is no
/// issuer, audience or revocation check.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    identity_claim: String,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("identity_claim", &self.identity_claim)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Builds a verifier from configured key material.
    ///
    /// Accepts a PEM document (`BEGIN PUBLIC KEY` or `BEGIN RSA PUBLIC KEY`) or a
    /// bare base64 encoding of a DER SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the material is empty or is not an RSA public key.
    pub fn from_key_material(material: &str, identity_claim: &str) -> Result<Self, KeyError> {
        let public_key = parse_public_key(material)?;
        Self::from_public_key(&public_key, identity_claim)
    }

    /// Builds a verifier from an already parsed key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the key cannot be re-encoded for the JWT library.
    pub fn from_public_key(key: &RsaPublicKey, identity_claim: &str) -> Result<Self, KeyError> {
        let pem = key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| KeyError::invalid_key(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_aud = false;

        Ok(Self {
            decoding_key,
            validation,
            identity_claim: identity_claim.to_string(),
        })
    }

    /// Name of the claim the identifier is read from.
    pub fn identity_claim(&self) -> &str {
        &self.identity_claim
    }

    /// Verifies `token` and returns the principal identifier it carries.
    ///
    /// # Errors
    ///
    /// Returns `JwtError` for a malformed token, a bad signature, an expired
    /// token, or a missing or non-UUID identity claim.
    pub fn verify(&self, token: &str) -> Result<PrincipalId, JwtError> {
        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)?;

        let claim = data
            .claims
            .get(&self.identity_claim)
            .ok_or_else(|| JwtError::missing_claim(&self.identity_claim))?;
        let raw = claim.as_str().ok_or_else(|| {
            JwtError::invalid_claims(format!("{} is not a string", self.identity_claim))
        })?;

        raw.parse::<PrincipalId>()
            .map_err(|e| JwtError::invalid_claims(e.to_string()))
    }
}

fn parse_public_key(material: &str) -> Result<RsaPublicKey, KeyError> {
    let material = material.trim();
    if material.is_empty() {
        return Err(KeyError::Missing);
    }

    if material.starts_with("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(material)
            .map_err(|e| KeyError::invalid_key(e.to_string()));
    }
    if material.starts_with("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(material)
            .map_err(|e| KeyError::invalid_key(e.to_string()));
    }

    let compact: String = material.split_whitespace().collect();
    let der = STANDARD
        .decode(compact)
        .map_err(|e| KeyError::invalid_key(format!("not base64: {e}")))?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| KeyError::invalid_key(e.to_string()))
}
