// Keyring configuration: named shared secrets loaded at startup.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use ahash::AHashMap;
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::Deserialize;
use thiserror::Error;

use crate::name::Name;
use crate::tsig::{Algorithm, HmacProvider, Tsig, TsigError, TsigProvider};

/// Error returned while loading or validating a keyring.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when reading a keyring file from disk.
    #[error("failed to read keyring '{path}': {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Source IO error.
        #[source]
        source: io::Error,
    },
    /// Error when parsing the keyring contents.
    #[error("failed to parse keyring: {0}")]
    Parse(#[from] toml::de::Error),
    /// The keyring did not pass validation checks.
    #[error("invalid keyring: {0}")]
    Validation(String),
}

/// Keyring schema: named keys with their algorithms and secrets.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KeyringConfig {
    /// Key declarations.
    pub keys: Vec<KeyConfig>,
}

/// One key declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Key name, a domain-style name such as `transfer.example.org.`.
    pub name: String,
    /// Algorithm name; defaults to hmac-sha256.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Base64-encoded shared secret.
    pub secret: String,
}

fn default_algorithm() -> String {
    "hmac-sha256".to_string()
}

impl KeyringConfig {
    /// Loads the keyring from `SIGWIRE_KEYRING` if set, otherwise returns
    /// an empty keyring.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("SIGWIRE_KEYRING") {
            Ok(path) => Self::from_path(path),
            Err(_missing) => Ok(Self::default()),
        }
    }

    /// Loads a keyring file from the provided path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads a keyring from a TOML string slice.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        <Self as FromStr>::from_str(input)
    }

    /// Validates every declared key: parseable name, registered algorithm,
    /// decodable secret, no duplicate names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<String> = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            let name: Name = key.name.parse().map_err(|err| {
                ConfigError::Validation(format!("key '{}': {err}", key.name))
            })?;
            key.algorithm.parse::<Algorithm>().map_err(|err| {
                ConfigError::Validation(format!("key '{}': {err}", key.name))
            })?;
            if BASE64_STANDARD.decode(&key.secret).is_err() {
                return Err(ConfigError::Validation(format!(
                    "key '{}': secret is not valid base64",
                    key.name
                )));
            }

            let canonical = name.to_string().to_ascii_lowercase();
            if seen.contains(&canonical) {
                return Err(ConfigError::Validation(format!(
                    "duplicate key '{canonical}'"
                )));
            }
            seen.push(canonical);
        }
        Ok(())
    }

    /// Builds the runtime [`Keyring`] from a validated configuration.
    pub fn build(&self) -> Result<Keyring, ConfigError> {
        self.validate()?;
        let mut keyring = Keyring::new();
        for key in &self.keys {
            let name: Name = key.name.parse().map_err(|err| {
                ConfigError::Validation(format!("key '{}': {err}", key.name))
            })?;
            let algorithm: Algorithm = key.algorithm.parse().map_err(|err| {
                ConfigError::Validation(format!("key '{}': {err}", key.name))
            })?;
            keyring.insert(&name, algorithm, &key.secret);
        }
        Ok(keyring)
    }
}

impl FromStr for KeyringConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
struct KeyEntry {
    algorithm: Algorithm,
    provider: HmacProvider,
}

/// Key store resolving record owner names to their secrets.
///
/// Acts as a [`TsigProvider`]: lookups are case-insensitive on the key
/// name, an unknown name fails as key-not-found, and a record naming a
/// different algorithm than the one configured for its key is rejected.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: AHashMap<String, KeyEntry>,
}

impl Keyring {
    /// Creates an empty keyring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a key.
    pub fn insert(&mut self, name: &Name, algorithm: Algorithm, secret: &str) {
        self.keys.insert(
            name.to_string().to_ascii_lowercase(),
            KeyEntry {
                algorithm,
                provider: HmacProvider::new(secret),
            },
        );
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the keyring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn entry_for(&self, record: &Tsig) -> Result<&KeyEntry, TsigError> {
        let entry = self
            .keys
            .get(&record.name.to_string().to_ascii_lowercase())
            .ok_or(TsigError::Secret)?;
        match Algorithm::from_name(&record.algorithm) {
            Some(algorithm) if algorithm == entry.algorithm => Ok(entry),
            _ => Err(TsigError::KeyAlg),
        }
    }
}

impl TsigProvider for Keyring {
    fn generate(&self, blob: &[u8], record: &Tsig) -> Result<Vec<u8>, TsigError> {
        self.entry_for(record)?.provider.generate(blob, record)
    }

    fn verify(&self, blob: &[u8], record: &Tsig) -> Result<(), TsigError> {
        self.entry_for(record)?.provider.verify(blob, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsig::{generate_with_provider, verify_at};
    use crate::wire::Message;

    const KEYRING: &str = r#"
        [[keys]]
        name = "transfer.example.org."
        algorithm = "hmac-sha256"
        secret = "pRZgBrBvI4NAHZYhxmhs/Q=="

        [[keys]]
        name = "update.example.org."
        algorithm = "hmac-sha512"
        secret = "NoTCJU+DMqFWywaPyxSijrDEA/eC3nK0xi3AMEZuPVk="
    "#;

    #[test]
    fn parses_and_builds() {
        let cfg = KeyringConfig::from_toml_str(KEYRING).expect("keyring");
        let keyring = cfg.build().expect("build");
        assert_eq!(keyring.len(), 2);
    }

    #[test]
    fn default_algorithm_is_sha256() {
        let cfg = KeyringConfig::from_toml_str(
            r#"
            [[keys]]
            name = "k.example."
            secret = "pRZgBrBvI4NAHZYhxmhs/Q=="
            "#,
        )
        .unwrap();
        assert_eq!(cfg.keys[0].algorithm, "hmac-sha256");
    }

    #[test]
    fn rejects_bad_secret() {
        let err = KeyringConfig::from_toml_str(
            r#"
            [[keys]]
            name = "k.example."
            secret = "*** not base64 ***"
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("base64")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let err = KeyringConfig::from_toml_str(
            r#"
            [[keys]]
            name = "k.example."
            algorithm = "hmac-sha999"
            secret = "pRZgBrBvI4NAHZYhxmhs/Q=="
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = KeyringConfig::from_toml_str(
            r#"
            [[keys]]
            name = "k.example."
            secret = "pRZgBrBvI4NAHZYhxmhs/Q=="

            [[keys]]
            name = "K.EXAMPLE."
            secret = "pRZgBrBvI4NAHZYhxmhs/Q=="
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(msg) => assert!(msg.contains("duplicate")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn keyring_signs_and_verifies_by_key_name() {
        let keyring = KeyringConfig::from_toml_str(KEYRING).unwrap().build().unwrap();

        let mut msg = Message {
            id: 3,
            ..Default::default()
        };
        let mut tsig = Tsig::new(
            // Mixed case resolves to the configured key.
            "Transfer.Example.Org.".parse().unwrap(),
            "hmac-sha256.".parse().unwrap(),
        );
        tsig.time_signed = 1594855491;
        tsig.attach(&mut msg).unwrap();

        let (mut bytes, _) = generate_with_provider(&msg, &keyring, "", false).unwrap();
        verify_at(&mut bytes, &keyring, "", false, 1594855491).unwrap();
    }

    #[test]
    fn unknown_key_is_key_not_found() {
        let keyring = KeyringConfig::from_toml_str(KEYRING).unwrap().build().unwrap();

        let mut msg = Message {
            id: 4,
            ..Default::default()
        };
        let mut tsig = Tsig::new(
            "stranger.example.org.".parse().unwrap(),
            "hmac-sha256.".parse().unwrap(),
        );
        tsig.time_signed = 1594855491;
        tsig.attach(&mut msg).unwrap();

        assert!(matches!(
            generate_with_provider(&msg, &keyring, "", false),
            Err(TsigError::Secret)
        ));
    }

    #[test]
    fn wrong_algorithm_for_key_is_rejected() {
        let keyring = KeyringConfig::from_toml_str(KEYRING).unwrap().build().unwrap();

        let mut msg = Message {
            id: 5,
            ..Default::default()
        };
        let mut tsig = Tsig::new(
            "transfer.example.org.".parse().unwrap(),
            "hmac-md5.sig-alg.reg.int.".parse().unwrap(),
        );
        tsig.time_signed = 1594855491;
        tsig.attach(&mut msg).unwrap();

        assert!(matches!(
            generate_with_provider(&msg, &keyring, "", false),
            Err(TsigError::KeyAlg)
        ));
    }
}
