// MAC provider capability and the builtin HMAC implementation.

use base64::{prelude::BASE64_STANDARD, Engine};
use subtle::ConstantTimeEq;

use super::{algorithm::Algorithm, record::Tsig, TsigError};

/// Capability for computing and authenticating transaction MACs.
///
/// `blob` is the canonical signing blob; when an exchange chains multiple
/// messages, the prior MAC is already part of it. Implementations hold any
/// key material themselves and must tolerate concurrent use from multiple
/// in-flight operations.
pub trait TsigProvider: Send + Sync {
    /// Computes the MAC over `blob` for the record's key.
    ///
    /// Fails when the key is unknown to this provider.
    fn generate(&self, blob: &[u8], record: &Tsig) -> Result<Vec<u8>, TsigError>;

    /// Authenticates the record's declared MAC against `blob`.
    fn verify(&self, blob: &[u8], record: &Tsig) -> Result<(), TsigError>;
}

/// Builtin provider holding one base64-encoded shared secret.
///
/// The digest is selected by the record's algorithm name; MAC comparison is
/// constant-time.
#[derive(Debug, Clone)]
pub struct HmacProvider {
    secret: String,
}

impl HmacProvider {
    /// Creates a provider from a base64-encoded secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn raw_secret(&self) -> Result<Vec<u8>, TsigError> {
        if self.secret.is_empty() {
            return Err(TsigError::Secret);
        }
        Ok(BASE64_STANDARD.decode(&self.secret)?)
    }
}

impl TsigProvider for HmacProvider {
    fn generate(&self, blob: &[u8], record: &Tsig) -> Result<Vec<u8>, TsigError> {
        let secret = self.raw_secret()?;
        let algorithm = Algorithm::from_name(&record.algorithm).ok_or(TsigError::KeyAlg)?;
        Ok(algorithm.mac(&secret, blob))
    }

    fn verify(&self, blob: &[u8], record: &Tsig) -> Result<(), TsigError> {
        let expected = self.generate(blob, record)?;
        if bool::from(expected.as_slice().ct_eq(&record.mac)) {
            Ok(())
        } else {
            Err(TsigError::Sig)
        }
    }
}
