// Verification pipeline.

use tracing::debug;

use super::blob::signing_blob;
use super::provider::{HmacProvider, TsigProvider};
use super::record::strip_in_place;
use super::sign::{decode_prior_mac, unix_now};
use super::TsigError;

/// Verifies the trailing signature record on `msg` against the builtin
/// HMAC provider for the base64 `secret`, using the current time.
///
/// The pipeline owns `msg` for the duration of the call and may leave it
/// modified (additional-section count decremented, identifier restored to
/// the value recorded at signing time); callers needing the original bytes
/// must copy beforehand.
pub fn verify(
    msg: &mut [u8],
    secret: &str,
    prior_mac: &str,
    timers_only: bool,
) -> Result<(), TsigError> {
    verify_at(
        msg,
        &HmacProvider::new(secret),
        prior_mac,
        timers_only,
        unix_now(),
    )
}

/// [`verify`] with a caller-supplied provider.
pub fn verify_with_provider(
    msg: &mut [u8],
    provider: &dyn TsigProvider,
    prior_mac: &str,
    timers_only: bool,
) -> Result<(), TsigError> {
    verify_at(msg, provider, prior_mac, timers_only, unix_now())
}

/// Verification against an explicit reference time, in Unix-epoch seconds.
///
/// Checks run in a fixed order and the first failure wins: record
/// extraction, blob assembly (with its bounds guards), provider
/// verification, then the time window. The signature is authenticated
/// before the timestamp is examined.
pub fn verify_at(
    msg: &mut [u8],
    provider: &dyn TsigProvider,
    prior_mac: &str,
    timers_only: bool,
    now: u64,
) -> Result<(), TsigError> {
    let prior = decode_prior_mac(prior_mac)?;
    let (stripped_len, record) = strip_in_place(msg)?;
    let blob = signing_blob(&mut msg[..stripped_len], &record, &prior, timers_only)?;

    provider.verify(&blob, &record)?;

    // The fudge window works both ways: a message can arrive before it was
    // signed because of clock skew.
    if now.abs_diff(record.time_signed) > u64::from(record.fudge) {
        return Err(TsigError::Time);
    }

    debug!(key = %record.name, "verified transaction signature");
    Ok(())
}
