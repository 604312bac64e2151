// Signature record model, record-data codec, and extraction from messages.

use crate::name::Name;
use crate::wire::{self, Header, Message, Record, WireError, CLASS_ANY, HEADER_LEN, TYPE_TSIG};

use super::TsigError;

/// Extended response code signalling a bad signature.
pub const RCODE_BAD_SIG: u16 = 16;
/// Extended response code signalling an unknown key.
pub const RCODE_BAD_KEY: u16 = 17;
/// Extended response code signalling time outside the fudge window.
pub const RCODE_BAD_TIME: u16 = 18;

/// Default fudge window in seconds (RFC 8945 recommendation).
pub const DEFAULT_FUDGE: u16 = 300;

/// A transaction signature record.
///
/// Constructed as a template before signing (empty MAC) and parsed back out
/// of received messages during verification. Class (ANY) and TTL (zero) are
/// protocol-mandated constants written on pack and not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tsig {
    /// Key name owning the signature; compared case-insensitively.
    pub name: Name,
    /// MAC algorithm name; matched case-insensitively against the registry.
    pub algorithm: Name,
    /// Signing time, seconds since the Unix epoch (48 bits on the wire).
    pub time_signed: u64,
    /// Permitted clock skew in seconds.
    pub fudge: u16,
    /// Computed MAC; empty on an unsigned template.
    pub mac: Vec<u8>,
    /// Carrying message's identifier at signing time; lets verification
    /// succeed after an intermediary rewrites the transport identifier.
    pub original_id: u16,
    /// Extended status code.
    pub error: u16,
    /// Auxiliary data; carries the server time when signalling a clock-skew
    /// failure.
    pub other_data: Vec<u8>,
}

impl Tsig {
    /// Creates an unsigned template with the default fudge window.
    pub fn new(name: Name, algorithm: Name) -> Self {
        Self {
            name,
            algorithm,
            time_signed: 0,
            fudge: DEFAULT_FUDGE,
            mac: Vec::new(),
            original_id: 0,
            error: 0,
            other_data: Vec::new(),
        }
    }

    /// Appends this template to `msg` as its trailing additional record,
    /// recording the message identifier for later restoration.
    pub fn attach(&self, msg: &mut Message) -> Result<(), TsigError> {
        let mut template = self.clone();
        template.original_id = msg.id;
        msg.additionals.push(template.to_record()?);
        Ok(())
    }

    /// Encodes the record data fields.
    pub fn pack_rdata(&self) -> Result<Vec<u8>, TsigError> {
        if self.mac.len() > u16::MAX as usize {
            return Err(TsigError::FieldOverflow {
                field: "mac",
                len: self.mac.len(),
            });
        }
        if self.other_data.len() > u16::MAX as usize {
            return Err(TsigError::FieldOverflow {
                field: "other data",
                len: self.other_data.len(),
            });
        }

        let mut out = Vec::with_capacity(self.algorithm.len() + self.mac.len() + 16);
        out.extend_from_slice(self.algorithm.wire());
        out.extend_from_slice(&time48(self.time_signed)?);
        out.extend_from_slice(&self.fudge.to_be_bytes());
        out.extend_from_slice(&(self.mac.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.mac);
        out.extend_from_slice(&self.original_id.to_be_bytes());
        out.extend_from_slice(&self.error.to_be_bytes());
        out.extend_from_slice(&(self.other_data.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.other_data);
        Ok(out)
    }

    /// Decodes record data for the record owned by `owner`.
    ///
    /// Declared lengths are checked against the actual data; a record whose
    /// other-length disagrees with its size is rejected rather than read
    /// out of bounds.
    pub fn unpack_rdata(owner: Name, rdata: &[u8]) -> Result<Self, TsigError> {
        let (algorithm, used) = Name::from_wire(rdata, 0).map_err(WireError::from)?;
        let mut pos = used;

        need(rdata, pos, 10)?;
        let time_signed = read_time48(&rdata[pos..pos + 6]);
        let fudge = u16::from_be_bytes(rdata[pos + 6..pos + 8].try_into().unwrap());
        let mac_size = u16::from_be_bytes(rdata[pos + 8..pos + 10].try_into().unwrap()) as usize;
        pos += 10;

        need(rdata, pos, mac_size)?;
        let mac = rdata[pos..pos + mac_size].to_vec();
        pos += mac_size;

        need(rdata, pos, 6)?;
        let original_id = u16::from_be_bytes(rdata[pos..pos + 2].try_into().unwrap());
        let error = u16::from_be_bytes(rdata[pos + 2..pos + 4].try_into().unwrap());
        let other_len = u16::from_be_bytes(rdata[pos + 4..pos + 6].try_into().unwrap()) as usize;
        pos += 6;

        let remaining = rdata.len() - pos;
        if other_len != remaining {
            return Err(TsigError::OtherLenMismatch {
                declared: other_len,
                actual: remaining,
            });
        }
        let other_data = rdata[pos..].to_vec();

        Ok(Self {
            name: owner,
            algorithm,
            time_signed,
            fudge,
            mac,
            original_id,
            error,
            other_data,
        })
    }

    /// Builds the full resource record carrying this signature.
    pub fn to_record(&self) -> Result<Record, TsigError> {
        Ok(Record {
            name: self.name.clone(),
            rtype: TYPE_TSIG,
            class: CLASS_ANY,
            ttl: 0,
            rdata: self.pack_rdata()?,
        })
    }
}

fn need(buf: &[u8], pos: usize, len: usize) -> Result<(), WireError> {
    if pos + len > buf.len() {
        return Err(WireError::BufferTooShort {
            expected: pos + len,
            actual: buf.len(),
        });
    }
    Ok(())
}

pub(crate) fn time48(value: u64) -> Result<[u8; 6], TsigError> {
    if value >> 48 != 0 {
        return Err(TsigError::TimeSignedRange(value));
    }
    let bytes = value.to_be_bytes();
    Ok([bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]])
}

fn read_time48(bytes: &[u8]) -> u64 {
    let mut value = 0u64;
    for &byte in &bytes[..6] {
        value = (value << 8) | u64::from(byte);
    }
    value
}

/// Removes the trailing signature record from an encoded message.
///
/// Returns the residual message with its additional-section count
/// decremented, plus the parsed record. The record must be the final entry
/// of the additional section; an empty section or a different trailing
/// record type fails with [`TsigError::NoSig`].
pub fn strip(msg: &[u8]) -> Result<(Vec<u8>, Tsig), TsigError> {
    let mut copy = msg.to_vec();
    let (len, tsig) = strip_in_place(&mut copy)?;
    copy.truncate(len);
    Ok((copy, tsig))
}

/// In-place variant of [`strip`]: patches the additional-section count in
/// the buffer and returns the length of the residual prefix.
pub(crate) fn strip_in_place(msg: &mut [u8]) -> Result<(usize, Tsig), TsigError> {
    let header = Header::parse(msg)?;
    if header.ar_count == 0 {
        return Err(TsigError::NoSig);
    }

    let mut pos = HEADER_LEN;
    for _ in 0..header.qd_count {
        pos = wire::skip_question(msg, pos)?;
    }
    for _ in 0..(u32::from(header.an_count) + u32::from(header.ns_count)) {
        pos = wire::skip_record(msg, pos)?;
    }

    let mut start = pos;
    for _ in 0..header.ar_count {
        start = pos;
        pos = wire::skip_record(msg, pos)?;
    }

    let (record, _) = Record::parse(msg, start)?;
    if record.rtype != TYPE_TSIG {
        return Err(TsigError::NoSig);
    }
    let tsig = Tsig::unpack_rdata(record.name, &record.rdata)?;

    wire::set_ar_count(msg, header.ar_count - 1)?;
    Ok((start, tsig))
}
