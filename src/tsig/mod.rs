// Transaction signature engine: record model, providers, signing blob,
// generation and verification pipelines.

use thiserror::Error;

use crate::wire::WireError;

pub mod algorithm;
pub mod provider;
pub mod record;

mod blob;
mod sign;
mod verify;

pub use algorithm::{Algorithm, UnknownAlgorithm};
pub use provider::{HmacProvider, TsigProvider};
pub use record::{
    strip, Tsig, DEFAULT_FUDGE, RCODE_BAD_KEY, RCODE_BAD_SIG, RCODE_BAD_TIME,
};
pub use sign::{generate, generate_with_provider};
pub use verify::{verify, verify_at, verify_with_provider};

/// Error taxonomy for transaction signing and verification.
///
/// Verification surfaces the first failing check: a missing record beats
/// every other condition, an unknown algorithm beats a bad signature, and a
/// bad signature beats a bad timestamp.
#[derive(Debug, Error)]
pub enum TsigError {
    /// No signature record present where one was required.
    #[error("no signature found")]
    NoSig,

    /// Algorithm name not recognised by the active provider.
    #[error("bad key algorithm")]
    KeyAlg,

    /// MAC verification failed.
    #[error("bad signature")]
    Sig,

    /// MAC valid but timestamp outside the fudge window.
    #[error("bad time")]
    Time,

    /// No shared secret configured for the key.
    #[error("no secrets defined")]
    Secret,

    /// Shared secret was not valid base64.
    #[error("bad base64 secret: {0}")]
    BadSecret(#[from] base64::DecodeError),

    /// Prior MAC supplied for chaining was not valid hex.
    #[error("bad prior mac hex: {0}")]
    BadPriorMac(#[from] hex::FromHexError),

    /// Record variables exceed the message size budget.
    #[error("signature variables length {len} overflows the {max}-byte message limit")]
    VariablesOverflow { len: usize, max: usize },

    /// Signing time does not fit the 48-bit wire field.
    #[error("time signed {0} exceeds 48 bits")]
    TimeSignedRange(u64),

    /// Variable-length field exceeds its 16-bit length prefix.
    #[error("{field} length {len} overflows 16-bit length field")]
    FieldOverflow { field: &'static str, len: usize },

    /// Declared other-data length disagrees with the record data.
    #[error("other data length {declared} does not match remaining {actual} bytes")]
    OtherLenMismatch { declared: usize, actual: usize },

    /// Provider-specific failure, surfaced unmodified.
    #[error(transparent)]
    Provider(Box<dyn std::error::Error + Send + Sync>),

    /// Message codec failure.
    #[error(transparent)]
    Wire(#[from] WireError),
}
