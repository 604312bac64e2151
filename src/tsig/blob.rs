// Canonical signing-blob assembly.

use crate::wire::{self, CLASS_ANY, DEFAULT_MSG_SIZE, HEADER_LEN};

use super::record::{time48, Tsig};
use super::TsigError;

// Record variable bytes besides the two names and the other data:
// class + ttl + time signed + fudge + error + other-length.
const FIXED_VARS_LEN: usize = 2 + 4 + 6 + 2 + 2 + 2;

/// Assembles the exact byte sequence that is MACed.
///
/// `msg` is the encoded message without its signature record; its identifier
/// field is overwritten in place with the record's original identifier,
/// compensating for any in-transit rewrite. When `prior_mac` is non-empty, a
/// two-byte length prefix and the prior MAC lead the blob (multi-message
/// chaining). With `timers_only`, the record contributes only its time and
/// fudge fields instead of the full variables.
pub(crate) fn signing_blob(
    msg: &mut [u8],
    record: &Tsig,
    prior_mac: &[u8],
    timers_only: bool,
) -> Result<Vec<u8>, TsigError> {
    if msg.len() < HEADER_LEN {
        return Err(TsigError::Wire(wire::WireError::BufferTooShort {
            expected: HEADER_LEN,
            actual: msg.len(),
        }));
    }
    wire::set_id(msg, record.original_id)?;

    let vars = if timers_only {
        timer_variables(record)?
    } else {
        record_variables(record)?
    };

    let mut blob = Vec::with_capacity(2 + prior_mac.len() + msg.len() + vars.len());
    if !prior_mac.is_empty() {
        if prior_mac.len() > u16::MAX as usize {
            return Err(TsigError::FieldOverflow {
                field: "prior mac",
                len: prior_mac.len(),
            });
        }
        blob.extend_from_slice(&(prior_mac.len() as u16).to_be_bytes());
        blob.extend_from_slice(prior_mac);
    }
    blob.extend_from_slice(msg);
    blob.extend_from_slice(&vars);
    Ok(blob)
}

// Full record variables: canonical owner name, class, ttl, canonical
// algorithm name, timers, error, other data. MAC and MAC-size are the
// output of signing, never its input.
fn record_variables(record: &Tsig) -> Result<Vec<u8>, TsigError> {
    let name = record.name.canonical_wire();
    let algorithm = record.algorithm.canonical_wire();

    let base = name.len() + algorithm.len() + FIXED_VARS_LEN;
    let len = base
        .checked_add(record.other_data.len())
        .unwrap_or(usize::MAX);
    if len > DEFAULT_MSG_SIZE {
        return Err(TsigError::VariablesOverflow {
            len,
            max: DEFAULT_MSG_SIZE,
        });
    }

    let mut vars = Vec::with_capacity(len);
    vars.extend_from_slice(&name);
    vars.extend_from_slice(&CLASS_ANY.to_be_bytes());
    vars.extend_from_slice(&0u32.to_be_bytes());
    vars.extend_from_slice(&algorithm);
    vars.extend_from_slice(&time48(record.time_signed)?);
    vars.extend_from_slice(&record.fudge.to_be_bytes());
    vars.extend_from_slice(&record.error.to_be_bytes());
    vars.extend_from_slice(&(record.other_data.len() as u16).to_be_bytes());
    vars.extend_from_slice(&record.other_data);
    Ok(vars)
}

fn timer_variables(record: &Tsig) -> Result<Vec<u8>, TsigError> {
    let mut vars = Vec::with_capacity(8);
    vars.extend_from_slice(&time48(record.time_signed)?);
    vars.extend_from_slice(&record.fudge.to_be_bytes());
    Ok(vars)
}
