// Sigwire public library surface: transaction signatures for DNS-style
// datagram messages.

pub mod config;

pub mod name;

pub mod tsig;

pub mod wire;

pub use config::{ConfigError, KeyConfig, Keyring, KeyringConfig};

pub use name::{Name, NameError};

pub use tsig::{
    generate, generate_with_provider, strip, verify, verify_at, verify_with_provider, Algorithm,
    HmacProvider, Tsig, TsigError, TsigProvider, DEFAULT_FUDGE, RCODE_BAD_KEY, RCODE_BAD_SIG,
    RCODE_BAD_TIME,
};

pub use wire::{
    flags, set_id, Header, Message, Question, Record, WireError, CLASS_ANY, CLASS_IN,
    DEFAULT_MSG_SIZE, HEADER_LEN, OPCODE_QUERY, OPCODE_UPDATE, TYPE_A, TYPE_SOA, TYPE_TSIG,
};
