// Message codec: fixed header, question and record framing, section walking.

use thiserror::Error;

use crate::name::{self, Name, NameError};

/// Length of the fixed message header in bytes.
pub const HEADER_LEN: usize = 12;

/// Default maximum message size, used as a sanity bound when assembling
/// variable-length signing material.
pub const DEFAULT_MSG_SIZE: usize = 4096;

/// Record type of the transaction signature record.
pub const TYPE_TSIG: u16 = 250;

/// Address record type.
pub const TYPE_A: u16 = 1;

/// Start-of-authority record type.
pub const TYPE_SOA: u16 = 6;

/// Internet class.
pub const CLASS_IN: u16 = 1;

/// ANY class, mandated for signature records.
pub const CLASS_ANY: u16 = 255;

/// Query opcode.
pub const OPCODE_QUERY: u8 = 0;

/// Dynamic-update opcode.
pub const OPCODE_UPDATE: u8 = 5;

/// Bit assignments within the header flags word.
pub mod flags {
    /// Response flag.
    pub const QR: u16 = 0x8000;
    /// Authoritative answer.
    pub const AA: u16 = 0x0400;
    /// Truncated response.
    pub const TC: u16 = 0x0200;
    /// Recursion desired.
    pub const RD: u16 = 0x0100;
    /// Recursion available.
    pub const RA: u16 = 0x0080;

    /// Places an opcode into its position within the flags word.
    pub const fn opcode(value: u8) -> u16 {
        ((value & 0x0F) as u16) << 11
    }

    /// Extracts the response code from the flags word.
    pub const fn rcode(flags: u16) -> u8 {
        (flags & 0x000F) as u8
    }
}

/// Codec-level error.
#[derive(Debug, Error)]
pub enum WireError {
    /// Buffer shorter than required.
    #[error("buffer too short: expected at least {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    /// Declared record data length exceeds the remaining bytes.
    #[error("record data length {declared} exceeds remaining {available} bytes")]
    RdataOverrun { declared: usize, available: usize },

    /// Record data too long for its 16-bit length field.
    #[error("record data length {0} exceeds u16 range")]
    RdataTooLong(usize),

    /// Section holds more records than its 16-bit count field allows.
    #[error("section length {0} exceeds u16 range")]
    TooManyRecords(usize),

    /// Bytes were left over after the final section.
    #[error("{0} trailing bytes after message end")]
    TrailingBytes(usize),

    /// Malformed name.
    #[error(transparent)]
    Name(#[from] NameError),
}

/// Fixed 12-byte message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Message identifier.
    pub id: u16,
    /// Flags word (response bit, opcode, response code).
    pub flags: u16,
    /// Question section count.
    pub qd_count: u16,
    /// Answer section count.
    pub an_count: u16,
    /// Authority section count.
    pub ns_count: u16,
    /// Additional section count.
    pub ar_count: u16,
}

impl Header {
    /// Encodes the header into a byte array.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&self.id.to_be_bytes());
        buf[2..4].copy_from_slice(&self.flags.to_be_bytes());
        buf[4..6].copy_from_slice(&self.qd_count.to_be_bytes());
        buf[6..8].copy_from_slice(&self.an_count.to_be_bytes());
        buf[8..10].copy_from_slice(&self.ns_count.to_be_bytes());
        buf[10..12].copy_from_slice(&self.ar_count.to_be_bytes());
        buf
    }

    /// Parses a header from the start of the provided buffer.
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < HEADER_LEN {
            return Err(WireError::BufferTooShort {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            id: u16::from_be_bytes(bytes[0..2].try_into().unwrap()),
            flags: u16::from_be_bytes(bytes[2..4].try_into().unwrap()),
            qd_count: u16::from_be_bytes(bytes[4..6].try_into().unwrap()),
            an_count: u16::from_be_bytes(bytes[6..8].try_into().unwrap()),
            ns_count: u16::from_be_bytes(bytes[8..10].try_into().unwrap()),
            ar_count: u16::from_be_bytes(bytes[10..12].try_into().unwrap()),
        })
    }
}

/// A question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Queried name.
    pub name: Name,
    /// Queried record type.
    pub qtype: u16,
    /// Queried class.
    pub qclass: u16,
}

impl Question {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.name.wire());
        out.extend_from_slice(&self.qtype.to_be_bytes());
        out.extend_from_slice(&self.qclass.to_be_bytes());
    }

    fn parse(buf: &[u8], pos: usize) -> Result<(Self, usize), WireError> {
        let (name, used) = Name::from_wire(buf, pos)?;
        let fixed = pos + used;
        if fixed + 4 > buf.len() {
            return Err(WireError::BufferTooShort {
                expected: fixed + 4,
                actual: buf.len(),
            });
        }
        let qtype = u16::from_be_bytes(buf[fixed..fixed + 2].try_into().unwrap());
        let qclass = u16::from_be_bytes(buf[fixed + 2..fixed + 4].try_into().unwrap());
        Ok((
            Self {
                name,
                qtype,
                qclass,
            },
            fixed + 4,
        ))
    }
}

/// A resource record with opaque record data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner name.
    pub name: Name,
    /// Record type.
    pub rtype: u16,
    /// Record class.
    pub class: u16,
    /// Time to live.
    pub ttl: u32,
    /// Record data, kept opaque by the codec.
    pub rdata: Vec<u8>,
}

impl Record {
    /// Appends the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), WireError> {
        if self.rdata.len() > u16::MAX as usize {
            return Err(WireError::RdataTooLong(self.rdata.len()));
        }
        out.extend_from_slice(self.name.wire());
        out.extend_from_slice(&self.rtype.to_be_bytes());
        out.extend_from_slice(&self.class.to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        out.extend_from_slice(&(self.rdata.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.rdata);
        Ok(())
    }

    /// Parses a record starting at `pos`, expanding any name compression.
    pub fn parse(buf: &[u8], pos: usize) -> Result<(Self, usize), WireError> {
        let (name, used) = Name::from_wire(buf, pos)?;
        let fixed = pos + used;
        if fixed + 10 > buf.len() {
            return Err(WireError::BufferTooShort {
                expected: fixed + 10,
                actual: buf.len(),
            });
        }
        let rtype = u16::from_be_bytes(buf[fixed..fixed + 2].try_into().unwrap());
        let class = u16::from_be_bytes(buf[fixed + 2..fixed + 4].try_into().unwrap());
        let ttl = u32::from_be_bytes(buf[fixed + 4..fixed + 8].try_into().unwrap());
        let rdlen = u16::from_be_bytes(buf[fixed + 8..fixed + 10].try_into().unwrap()) as usize;
        let rdata_start = fixed + 10;
        let available = buf.len() - rdata_start;
        if rdlen > available {
            return Err(WireError::RdataOverrun {
                declared: rdlen,
                available,
            });
        }
        Ok((
            Self {
                name,
                rtype,
                class,
                ttl,
                rdata: buf[rdata_start..rdata_start + rdlen].to_vec(),
            },
            rdata_start + rdlen,
        ))
    }
}

/// A full message: header fields plus the four sections.
///
/// Section counts are derived from the section lengths on [`Message::pack`];
/// names are always packed uncompressed, while parsing tolerates compression
/// pointers.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Message identifier.
    pub id: u16,
    /// Flags word.
    pub flags: u16,
    /// Question section.
    pub questions: Vec<Question>,
    /// Answer section.
    pub answers: Vec<Record>,
    /// Authority section.
    pub authorities: Vec<Record>,
    /// Additional section; a signature record, when present, is its final
    /// entry.
    pub additionals: Vec<Record>,
}

impl Message {
    /// Serialises the message to wire form.
    pub fn pack(&self) -> Result<Vec<u8>, WireError> {
        let header = Header {
            id: self.id,
            flags: self.flags,
            qd_count: section_count(self.questions.len())?,
            an_count: section_count(self.answers.len())?,
            ns_count: section_count(self.authorities.len())?,
            ar_count: section_count(self.additionals.len())?,
        };

        let mut out = Vec::with_capacity(HEADER_LEN + 64);
        out.extend_from_slice(&header.encode());
        for question in &self.questions {
            question.encode_into(&mut out);
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            record.encode_into(&mut out)?;
        }
        Ok(out)
    }

    /// Parses a complete message, rejecting trailing bytes.
    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        let header = Header::parse(buf)?;
        let mut pos = HEADER_LEN;

        let mut questions = Vec::with_capacity(header.qd_count as usize);
        for _ in 0..header.qd_count {
            let (question, next) = Question::parse(buf, pos)?;
            questions.push(question);
            pos = next;
        }

        let mut parse_section = |count: u16, pos: &mut usize| -> Result<Vec<Record>, WireError> {
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (record, next) = Record::parse(buf, *pos)?;
                records.push(record);
                *pos = next;
            }
            Ok(records)
        };

        let answers = parse_section(header.an_count, &mut pos)?;
        let authorities = parse_section(header.ns_count, &mut pos)?;
        let additionals = parse_section(header.ar_count, &mut pos)?;

        if pos != buf.len() {
            return Err(WireError::TrailingBytes(buf.len() - pos));
        }

        Ok(Self {
            id: header.id,
            flags: header.flags,
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

fn section_count(len: usize) -> Result<u16, WireError> {
    u16::try_from(len).map_err(|_| WireError::TooManyRecords(len))
}

/// Overwrites the identifier field of an encoded message.
pub fn set_id(buf: &mut [u8], id: u16) -> Result<(), WireError> {
    if buf.len() < 2 {
        return Err(WireError::BufferTooShort {
            expected: 2,
            actual: buf.len(),
        });
    }
    buf[0..2].copy_from_slice(&id.to_be_bytes());
    Ok(())
}

/// Overwrites the additional-section count of an encoded message.
pub(crate) fn set_ar_count(buf: &mut [u8], count: u16) -> Result<(), WireError> {
    if buf.len() < HEADER_LEN {
        return Err(WireError::BufferTooShort {
            expected: HEADER_LEN,
            actual: buf.len(),
        });
    }
    buf[10..12].copy_from_slice(&count.to_be_bytes());
    Ok(())
}

/// Advances past one question entry.
pub(crate) fn skip_question(buf: &[u8], pos: usize) -> Result<usize, WireError> {
    let after_name = name::skip_name(buf, pos)?;
    let end = after_name + 4;
    if end > buf.len() {
        return Err(WireError::BufferTooShort {
            expected: end,
            actual: buf.len(),
        });
    }
    Ok(end)
}

/// Advances past one record without expanding it.
pub(crate) fn skip_record(buf: &[u8], pos: usize) -> Result<usize, WireError> {
    let after_name = name::skip_name(buf, pos)?;
    let fixed_end = after_name + 10;
    if fixed_end > buf.len() {
        return Err(WireError::BufferTooShort {
            expected: fixed_end,
            actual: buf.len(),
        });
    }
    let rdlen = u16::from_be_bytes(buf[fixed_end - 2..fixed_end].try_into().unwrap()) as usize;
    let available = buf.len() - fixed_end;
    if rdlen > available {
        return Err(WireError::RdataOverrun {
            declared: rdlen,
            available,
        });
    }
    Ok(fixed_end + rdlen)
}
