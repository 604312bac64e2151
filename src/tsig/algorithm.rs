// HMAC algorithm registry for transaction signatures.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use thiserror::Error;

use crate::name::Name;

/// Registered name of HMAC-MD5, which carries the legacy sig-alg suffix.
pub const HMAC_MD5: &str = "hmac-md5.sig-alg.reg.int.";
/// Registered name of HMAC-SHA1.
pub const HMAC_SHA1: &str = "hmac-sha1.";
/// Registered name of HMAC-SHA224.
pub const HMAC_SHA224: &str = "hmac-sha224.";
/// Registered name of HMAC-SHA256.
pub const HMAC_SHA256: &str = "hmac-sha256.";
/// Registered name of HMAC-SHA384.
pub const HMAC_SHA384: &str = "hmac-sha384.";
/// Registered name of HMAC-SHA512.
pub const HMAC_SHA512: &str = "hmac-sha512.";

/// The algorithm name was not in the registry.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown algorithm '{0}'")]
pub struct UnknownAlgorithm(String);

/// Supported HMAC digest selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HmacMd5,
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

impl Algorithm {
    /// Returns the registered wire name of the algorithm.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HmacMd5 => HMAC_MD5,
            Self::HmacSha1 => HMAC_SHA1,
            Self::HmacSha224 => HMAC_SHA224,
            Self::HmacSha256 => HMAC_SHA256,
            Self::HmacSha384 => HMAC_SHA384,
            Self::HmacSha512 => HMAC_SHA512,
        }
    }

    /// Looks up an algorithm by its wire name, case-insensitively.
    pub fn from_name(name: &Name) -> Option<Self> {
        name.to_string().parse().ok()
    }

    /// Computes the keyed MAC over `data` with the selected digest.
    pub fn mac(&self, secret: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            Self::HmacMd5 => tag::<Hmac<Md5>>(secret, data),
            Self::HmacSha1 => tag::<Hmac<Sha1>>(secret, data),
            Self::HmacSha224 => tag::<Hmac<Sha224>>(secret, data),
            Self::HmacSha256 => tag::<Hmac<Sha256>>(secret, data),
            Self::HmacSha384 => tag::<Hmac<Sha384>>(secret, data),
            Self::HmacSha512 => tag::<Hmac<Sha512>>(secret, data),
        }
    }
}

fn tag<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <M as Mac>::new_from_slice(secret).expect("hmac accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut text = s.to_ascii_lowercase();
        if !text.ends_with('.') {
            text.push('.');
        }
        match text.as_str() {
            HMAC_MD5 | "hmac-md5." => Ok(Self::HmacMd5),
            HMAC_SHA1 => Ok(Self::HmacSha1),
            HMAC_SHA224 => Ok(Self::HmacSha224),
            HMAC_SHA256 => Ok(Self::HmacSha256),
            HMAC_SHA384 => Ok(Self::HmacSha384),
            HMAC_SHA512 => Ok(Self::HmacSha512),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
