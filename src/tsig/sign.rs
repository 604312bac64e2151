// Signed-message generation.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::wire::{self, Message, TYPE_TSIG};

use super::blob::signing_blob;
use super::provider::{HmacProvider, TsigProvider};
use super::record::{Tsig, DEFAULT_FUDGE};
use super::TsigError;

/// Signs `msg` with the builtin HMAC provider for the base64 `secret`.
///
/// The message must already carry an unsigned template record as the final
/// entry of its additional section (see [`Tsig::attach`]). `prior_mac` is
/// the hex MAC of the previous message in a chained exchange, or empty;
/// `timers_only` marks a stream continuation, where only the record timers
/// are signed.
///
/// Returns the signed wire bytes and the computed MAC in hex, suitable for
/// chaining into a subsequent call.
pub fn generate(
    msg: &Message,
    secret: &str,
    prior_mac: &str,
    timers_only: bool,
) -> Result<(Vec<u8>, String), TsigError> {
    generate_with_provider(msg, &HmacProvider::new(secret), prior_mac, timers_only)
}

/// [`generate`] with a caller-supplied provider.
pub fn generate_with_provider(
    msg: &Message,
    provider: &dyn TsigProvider,
    prior_mac: &str,
    timers_only: bool,
) -> Result<(Vec<u8>, String), TsigError> {
    let prior = decode_prior_mac(prior_mac)?;
    let (unsigned, mut record) = split_template(msg)?;

    if record.time_signed == 0 {
        record.time_signed = unix_now();
    }
    if record.fudge == 0 {
        record.fudge = DEFAULT_FUDGE;
    }

    let mut out = unsigned.pack()?;
    let blob = signing_blob(&mut out, &record, &prior, timers_only)?;
    record.mac = provider.generate(&blob, &record)?;

    record.to_record()?.encode_into(&mut out)?;
    let ar_count = u16::try_from(unsigned.additionals.len() + 1)
        .map_err(|_| wire::WireError::TooManyRecords(unsigned.additionals.len() + 1))?;
    wire::set_ar_count(&mut out, ar_count)?;

    debug!(key = %record.name, algorithm = %record.algorithm, "signed message");
    Ok((out, hex::encode(&record.mac)))
}

// Splits the trailing template record off a copy of the message.
fn split_template(msg: &Message) -> Result<(Message, Tsig), TsigError> {
    let mut unsigned = msg.clone();
    let template = match unsigned.additionals.pop() {
        Some(record) if record.rtype == TYPE_TSIG => record,
        _ => return Err(TsigError::NoSig),
    };
    let record = Tsig::unpack_rdata(template.name, &template.rdata)?;
    Ok((unsigned, record))
}

pub(crate) fn decode_prior_mac(prior_mac: &str) -> Result<Vec<u8>, TsigError> {
    if prior_mac.is_empty() {
        return Ok(Vec::new());
    }
    Ok(hex::decode(prior_mac)?)
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsig::algorithm::{HMAC_SHA224, HMAC_SHA256, HMAC_SHA384};
    use crate::tsig::record::{strip, RCODE_BAD_TIME};
    use crate::wire::{flags, Question, CLASS_IN, OPCODE_UPDATE, TYPE_SOA};

    // Fixed secret and signing time for the known-answer cases below; the
    // expected MACs are pre-computed interoperability vectors.
    const TEST_SECRET: &str = "NoTCJU+DMqFWywaPyxSijrDEA/eC3nK0xi3AMEZuPVk=";
    const TIME_SIGNED: u64 = 1594855491;

    fn update_message(template: &Tsig) -> Message {
        Message {
            id: 0,
            flags: flags::opcode(OPCODE_UPDATE),
            questions: vec![Question {
                name: "example.com.".parse().unwrap(),
                qtype: TYPE_SOA,
                qclass: CLASS_IN,
            }],
            additionals: vec![template.to_record().unwrap()],
            ..Default::default()
        }
    }

    fn template(algorithm: &str, error: u16, other_data: Vec<u8>) -> Tsig {
        Tsig {
            name: "testkey.".parse().unwrap(),
            algorithm: algorithm.parse().unwrap(),
            time_signed: TIME_SIGNED,
            fudge: 300,
            mac: Vec::new(),
            original_id: 42,
            error,
            other_data,
        }
    }

    #[test]
    fn known_answer_macs() {
        // (prior MAC, other data, expected MAC), all hex.
        let cases = [
            (
                "3684c225",
                "",
                "c110e3f62694755c10761dc8717462431ee34340b7c9d1eee09449150757c5b1",
            ),
            (
                "",
                "",
                "385449a425c6d52b9bf2c65c0726eefa0ad8084cdaf488f24547e686605b9610",
            ),
            (
                "3684c225",
                "666f6f",
                "15b91571ca80b3b410a77e2b44f8cc4f35ace22b26020138439dd94803e23b5d",
            ),
        ];

        for (prior_mac, other_hex, expected) in cases {
            let tsig = template(
                HMAC_SHA256,
                RCODE_BAD_TIME,
                hex::decode(other_hex).unwrap(),
            );
            let msg = update_message(&tsig);

            let (bytes, mac) = generate(&msg, TEST_SECRET, prior_mac, false).unwrap();
            assert_eq!(mac, expected, "prior={prior_mac} other={other_hex}");

            // The record sent on the wire carries the same MAC and the
            // unchanged template fields.
            let (_, sent) = strip(&bytes).unwrap();
            assert_eq!(hex::encode(&sent.mac), expected);
            let mut expected_record = tsig.clone();
            expected_record.mac = sent.mac.clone();
            assert_eq!(sent, expected_record);
        }
    }

    #[test]
    fn known_answer_sha224_and_sha384() {
        let cases = [
            (
                HMAC_SHA224,
                "hVEkQuAqnTmBuRrT9KF1Udr91gOMGWPw9LaTtw==",
                "d6daf9ea189e48bc38f9aed63d6cc4140cdfa38a7a333ee2eefdbd31",
            ),
            (
                HMAC_SHA384,
                "Qjer2TL2lAdpq9w6Gjs98/ClCQx/L3vtgVHCmrZ8l/oKEPjqUUMFO18gMCRwd5H4",
                "89a48936d29187870c325cbdba5ad71609bd038d0459d6010c844d659c570e881d3650e4fe7310be53ebe5178d0d1001",
            ),
        ];

        for (algorithm, secret, expected) in cases {
            let tsig = template(algorithm, 0, Vec::new());
            let msg = update_message(&tsig);
            let (_, mac) = generate(&msg, secret, "", false).unwrap();
            assert_eq!(mac, expected, "algorithm={algorithm}");
        }
    }

    #[test]
    fn generation_defaults_timers() {
        let mut tsig = template(HMAC_SHA256, 0, Vec::new());
        tsig.time_signed = 0;
        tsig.fudge = 0;
        let msg = update_message(&tsig);

        let (bytes, _) = generate(&msg, TEST_SECRET, "", false).unwrap();
        let (_, sent) = strip(&bytes).unwrap();
        assert!(sent.time_signed > 0);
        assert_eq!(sent.fudge, DEFAULT_FUDGE);
    }

    #[test]
    fn message_without_template_is_rejected() {
        let msg = Message {
            id: 9,
            ..Default::default()
        };
        assert!(matches!(
            generate(&msg, TEST_SECRET, "", false),
            Err(TsigError::NoSig)
        ));
    }

    #[test]
    fn bad_prior_mac_hex_is_rejected() {
        let tsig = template(HMAC_SHA256, 0, Vec::new());
        let msg = update_message(&tsig);
        assert!(matches!(
            generate(&msg, TEST_SECRET, "zz", false),
            Err(TsigError::BadPriorMac(_))
        ));
    }

    #[test]
    fn output_carries_original_identifier_and_count() {
        let tsig = template(HMAC_SHA256, 0, Vec::new());
        let msg = update_message(&tsig);
        let (bytes, _) = generate(&msg, TEST_SECRET, "", false).unwrap();

        let header = crate::wire::Header::parse(&bytes).unwrap();
        assert_eq!(header.id, 42);
        assert_eq!(header.ar_count, 1);
    }
}
