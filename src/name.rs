// Domain names: presentation parsing, wire encoding, canonical form.

use std::fmt::{self, Write};
use std::str::FromStr;

use thiserror::Error;

/// Maximum encoded length of a name, including the root label.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a single label.
pub const MAX_LABEL_LEN: usize = 63;

// A name can hold at most 127 labels, so a legitimate chain of
// compression pointers is shorter than this.
const MAX_POINTER_JUMPS: usize = 127;

/// Errors raised while parsing or decoding names.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    /// A label between dots was empty.
    #[error("empty label in name")]
    EmptyLabel,

    /// A label exceeded the 63-octet limit.
    #[error("label exceeds {MAX_LABEL_LEN} octets")]
    LabelTooLong,

    /// The encoded name exceeded the 255-octet limit.
    #[error("name exceeds {MAX_NAME_LEN} octets")]
    NameTooLong,

    /// The name ran past the end of the buffer.
    #[error("name extends past end of buffer")]
    Truncated,

    /// Label type bits were neither plain nor a compression pointer.
    #[error("reserved label type {0:#04x}")]
    ReservedLabelType(u8),

    /// Compression pointers formed a cycle or chained too deep.
    #[error("compression pointer loop")]
    PointerLoop,

    /// A compression pointer referenced an offset outside the message.
    #[error("compression pointer target {0} out of range")]
    BadPointer(usize),
}

/// A domain name held in uncompressed wire form, case preserved.
///
/// Equality is ASCII case-insensitive, per protocol name matching rules.
/// [`Name::canonical_wire`] yields the lowercased encoding used wherever
/// both peers must derive identical bytes independently.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    wire: Vec<u8>,
}

impl Name {
    /// Returns the root name `.`.
    pub fn root() -> Self {
        Self { wire: vec![0] }
    }

    /// Returns the uncompressed wire encoding, case preserved.
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the canonical (lowercased, uncompressed) wire encoding.
    pub fn canonical_wire(&self) -> Vec<u8> {
        self.wire.to_ascii_lowercase()
    }

    /// Encoded length in octets, including the root label.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.wire.len()
    }

    /// Whether this is the root name.
    pub fn is_root(&self) -> bool {
        self.wire == [0]
    }

    /// Decodes a name starting at `start`, following compression pointers.
    ///
    /// Returns the expanded name and the number of octets the name occupies
    /// at its original position (up to and including the first pointer, when
    /// one is present).
    pub fn from_wire(buf: &[u8], start: usize) -> Result<(Self, usize), NameError> {
        let mut wire = Vec::new();
        let mut pos = start;
        let mut consumed: Option<usize> = None;
        let mut jumps = 0usize;

        loop {
            let len = *buf.get(pos).ok_or(NameError::Truncated)? as usize;
            match len & 0xC0 {
                0x00 => {
                    if len == 0 {
                        wire.push(0);
                        if wire.len() > MAX_NAME_LEN {
                            return Err(NameError::NameTooLong);
                        }
                        let end = consumed.unwrap_or(pos + 1);
                        return Ok((Self { wire }, end - start));
                    }
                    let end = pos + 1 + len;
                    if end > buf.len() {
                        return Err(NameError::Truncated);
                    }
                    wire.push(len as u8);
                    wire.extend_from_slice(&buf[pos + 1..end]);
                    if wire.len() + 1 > MAX_NAME_LEN {
                        return Err(NameError::NameTooLong);
                    }
                    pos = end;
                }
                0xC0 => {
                    let second = *buf.get(pos + 1).ok_or(NameError::Truncated)? as usize;
                    if consumed.is_none() {
                        consumed = Some(pos + 2);
                    }
                    jumps += 1;
                    if jumps > MAX_POINTER_JUMPS {
                        return Err(NameError::PointerLoop);
                    }
                    let target = ((len & 0x3F) << 8) | second;
                    if target >= buf.len() {
                        return Err(NameError::BadPointer(target));
                    }
                    pos = target;
                }
                other => return Err(NameError::ReservedLabelType(other as u8)),
            }
        }
    }
}

/// Advances past a (possibly compressed) name without expanding it,
/// returning the offset of the first octet after it.
pub(crate) fn skip_name(buf: &[u8], start: usize) -> Result<usize, NameError> {
    let mut pos = start;
    loop {
        let len = *buf.get(pos).ok_or(NameError::Truncated)?;
        match len & 0xC0 {
            0x00 => {
                pos += 1 + len as usize;
                if len == 0 {
                    return Ok(pos);
                }
                if pos > buf.len() {
                    return Err(NameError::Truncated);
                }
            }
            0xC0 => {
                // A pointer terminates the name at this position.
                if pos + 2 > buf.len() {
                    return Err(NameError::Truncated);
                }
                return Ok(pos + 2);
            }
            other => return Err(NameError::ReservedLabelType(other)),
        }
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut wire = Vec::with_capacity(trimmed.len() + 2);
        for label in trimmed.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LabelTooLong);
            }
            wire.push(label.len() as u8);
            wire.extend_from_slice(label.as_bytes());
        }
        wire.push(0);
        if wire.len() > MAX_NAME_LEN {
            return Err(NameError::NameTooLong);
        }
        Ok(Self { wire })
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_char('.');
        }
        let mut pos = 0usize;
        while self.wire[pos] != 0 {
            let len = self.wire[pos] as usize;
            for &byte in &self.wire[pos + 1..pos + 1 + len] {
                f.write_char(byte as char)?;
            }
            f.write_char('.')?;
            pos += 1 + len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_round_trip() {
        let name: Name = "example.Org.".parse().expect("name");
        assert_eq!(name.to_string(), "example.Org.");
        assert_eq!(name.wire()[0], 7);
        assert_eq!(name.len(), 13);
    }

    #[test]
    fn trailing_dot_is_optional() {
        let with: Name = "example.org.".parse().unwrap();
        let without: Name = "example.org".parse().unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn equality_ignores_case() {
        let lower: Name = "testkey.".parse().unwrap();
        let upper: Name = "TESTKEY.".parse().unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.canonical_wire(), upper.canonical_wire());
    }

    #[test]
    fn root_name() {
        let root: Name = ".".parse().unwrap();
        assert!(root.is_root());
        assert_eq!(root.to_string(), ".");
        assert_eq!(root.wire(), &[0]);
    }

    #[test]
    fn rejects_empty_label() {
        assert_eq!("a..b.".parse::<Name>(), Err(NameError::EmptyLabel));
    }

    #[test]
    fn rejects_long_label() {
        let label = "x".repeat(64);
        assert_eq!(format!("{label}.").parse::<Name>(), Err(NameError::LabelTooLong));
    }

    #[test]
    fn rejects_long_name() {
        let name = vec!["y".repeat(63); 4].join(".") + ".";
        assert_eq!(name.parse::<Name>(), Err(NameError::NameTooLong));
    }

    #[test]
    fn decodes_compression_pointer() {
        // "example.com." at offset 2, then "a" + pointer back to it.
        let mut buf = vec![0u8; 2];
        buf.extend_from_slice(b"\x07example\x03com\x00");
        let ptr_at = buf.len();
        buf.extend_from_slice(b"\x01a\xC0\x02");

        let (name, used) = Name::from_wire(&buf, ptr_at).expect("expand");
        assert_eq!(name.to_string(), "a.example.com.");
        assert_eq!(used, 4);

        let end = skip_name(&buf, ptr_at).expect("skip");
        assert_eq!(end, buf.len());
    }

    #[test]
    fn rejects_pointer_loop() {
        let buf = b"\xC0\x00".to_vec();
        assert_eq!(Name::from_wire(&buf, 0), Err(NameError::PointerLoop));
    }

    #[test]
    fn rejects_truncated_name() {
        let buf = b"\x07exam".to_vec();
        assert_eq!(Name::from_wire(&buf, 0), Err(NameError::Truncated));
        assert_eq!(skip_name(&buf, 0), Err(NameError::Truncated));
    }

    #[test]
    fn rejects_reserved_label_type() {
        let buf = b"\x80abc".to_vec();
        assert_eq!(Name::from_wire(&buf, 0), Err(NameError::ReservedLabelType(0x80)));
    }
}
