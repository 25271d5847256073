//! Key Deriver Module
//!
//! Turns call arguments into canonical entry keys.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::cache::EntryKey;
use crate::error::{CacheError, Result};
use crate::key::{CallArgs, Signature};

/// Caller-supplied key function, given the (normalized) call arguments.
pub type KeyFn = Arc<dyn Fn(&CallArgs) -> Result<EntryKey> + Send + Sync>;

// == Hash Mode ==
/// Built-in ways of turning canonical JSON into a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// The canonical JSON text itself
    Json,
    /// SHA-256 hex digest of the canonical JSON, fixed length and filename safe
    Digest,
}

impl FromStr for HashMode {
    type Err = CacheError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(HashMode::Json),
            "digest" | "json_digest" => Ok(HashMode::Digest),
            other => Err(CacheError::Configuration(format!("unknown hash mode: {}", other))),
        }
    }
}

// == Hash Config ==
/// Key derivation options.
#[derive(Clone, Default)]
pub struct HashConfig {
    /// Built-in hash mode; None picks a default for the storage backend
    pub mode: Option<HashMode>,
    /// Custom key function, exclusive with `mode`
    pub key_fn: Option<KeyFn>,
    /// Resolve arguments against `signature` first; None means "only if filtering"
    pub normalize: Option<bool>,
    /// Parameter list used for normalization
    pub signature: Option<Signature>,
    /// Only these named parameters participate in the key
    pub include: Option<Vec<String>>,
    /// These named parameters are left out of the key
    pub exclude: Option<Vec<String>>,
}

impl fmt::Debug for HashConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashConfig")
            .field("mode", &self.mode)
            .field("key_fn", &self.key_fn.as_ref().map(|_| "<fn>"))
            .field("normalize", &self.normalize)
            .field("signature", &self.signature)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

#[derive(Clone)]
enum KeyStrategy {
    Json,
    Digest,
    Custom(KeyFn),
}

#[derive(Debug, Clone)]
enum ArgFilter {
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

// == Key Deriver ==
/// Derives entry keys from call arguments.
#[derive(Clone)]
pub struct KeyDeriver {
    strategy: KeyStrategy,
    signature: Option<Signature>,
    filter: ArgFilter,
}

impl KeyDeriver {
    // == Constructor ==
    /// Validates hash options and builds a deriver.
    ///
    /// `fixed_length_keys` is set for storage that needs short, filesystem-safe
    /// keys: it selects digest keys when neither a mode nor a key function is
    /// configured, and rejects the JSON mode.
    pub fn from_config(config: &HashConfig, fixed_length_keys: bool) -> Result<Self> {
        let strategy = match (&config.mode, &config.key_fn) {
            (Some(_), Some(_)) => {
                return Err(CacheError::Configuration(
                    "specify at most one of hash mode or key function".to_string(),
                ))
            }
            (_, Some(key_fn)) => KeyStrategy::Custom(key_fn.clone()),
            (Some(HashMode::Json), None) if fixed_length_keys => {
                return Err(CacheError::Configuration(
                    "json keys are not supported by this storage, use the digest mode".to_string(),
                ))
            }
            (Some(HashMode::Json), None) => KeyStrategy::Json,
            (Some(HashMode::Digest), None) => KeyStrategy::Digest,
            (None, None) if fixed_length_keys => KeyStrategy::Digest,
            (None, None) => KeyStrategy::Json,
        };

        let filter = match (&config.include, &config.exclude) {
            (Some(_), Some(_)) => {
                return Err(CacheError::Configuration(
                    "specify at most one of include or exclude filters".to_string(),
                ))
            }
            (Some(names), None) => ArgFilter::Include(names.clone()),
            (None, Some(names)) => ArgFilter::Exclude(names.clone()),
            (None, None) => ArgFilter::All,
        };

        let filtering = !matches!(filter, ArgFilter::All);
        let normalize = match config.normalize {
            Some(false) if filtering => {
                return Err(CacheError::Configuration(
                    "include/exclude filters require argument normalization".to_string(),
                ))
            }
            Some(normalize) => normalize,
            None => filtering,
        };

        let signature = if normalize {
            match &config.signature {
                Some(signature) => Some(signature.clone()),
                None => {
                    return Err(CacheError::Configuration(
                        "argument normalization requires a signature".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            strategy,
            signature,
            filter,
        })
    }

    /// True when arguments are resolved against a signature before hashing.
    pub fn normalizes(&self) -> bool {
        self.signature.is_some()
    }

    pub fn mode_name(&self) -> &'static str {
        match self.strategy {
            KeyStrategy::Json => "json",
            KeyStrategy::Digest => "digest",
            KeyStrategy::Custom(_) => "custom",
        }
    }

    // == Derive ==
    /// Derives the entry key for a call.
    pub fn derive(&self, args: &CallArgs) -> Result<EntryKey> {
        args.check()?;
        match &self.signature {
            Some(signature) => {
                let bound = signature.bind(args)?;
                let bound = match &self.filter {
                    ArgFilter::All => bound,
                    ArgFilter::Include(names) => bound.include(names)?,
                    ArgFilter::Exclude(names) => bound.exclude(names)?,
                };
                self.hash(&bound.into_call_args())
            }
            None => self.hash(args),
        }
    }

    fn hash(&self, args: &CallArgs) -> Result<EntryKey> {
        match &self.strategy {
            KeyStrategy::Json => Ok(EntryKey::new(canonical_json(args)?)),
            KeyStrategy::Digest => Ok(EntryKey::new(sha256_hex(canonical_json(args)?.as_bytes()))),
            KeyStrategy::Custom(key_fn) => key_fn(args),
        }
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver")
            .field("mode", &self.mode_name())
            .field("signature", &self.signature)
            .field("filter", &self.filter)
            .finish()
    }
}

// == Canonical JSON ==
/// Serializes `{"args": [...], "kwargs": {...}}` with every object's keys
/// sorted, regardless of how serde_json orders maps.
pub fn canonical_json(args: &CallArgs) -> Result<String> {
    let mut call = Map::new();
    call.insert("args".to_string(), Value::Array(args.positional().to_vec()));
    call.insert(
        "kwargs".to_string(),
        Value::Object(args.named().clone().into_iter().collect()),
    );
    serde_json::to_string(&sort_keys(Value::Object(call)))
        .map_err(|e| CacheError::KeyDerivation(e.to_string()))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(name, value)| (name, sort_keys(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain() -> KeyDeriver {
        KeyDeriver::from_config(&HashConfig::default(), false).unwrap()
    }

    fn abc_config() -> HashConfig {
        HashConfig {
            normalize: Some(true),
            signature: Some(Signature::new().param("a").param("b").param("c")),
            ..HashConfig::default()
        }
    }

    #[test]
    fn test_json_key_format() {
        let key = plain().derive(&CallArgs::new().arg(1).kwarg("x", "y")).unwrap();
        assert_eq!(key.as_str(), r#"{"args":[1],"kwargs":{"x":"y"}}"#);
    }

    #[test]
    fn test_named_order_does_not_matter() {
        let deriver = plain();
        let first = deriver
            .derive(&CallArgs::new().kwarg("b", 2).kwarg("a", 1))
            .unwrap();
        let second = deriver
            .derive(&CallArgs::new().kwarg("a", 1).kwarg("b", 2))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_maps_are_sorted() {
        let deriver = plain();
        let mut forward = Map::new();
        forward.insert("z".to_string(), json!(1));
        forward.insert("a".to_string(), json!(2));
        let key = deriver
            .derive(&CallArgs::new().arg(Value::Object(forward)))
            .unwrap();
        assert_eq!(key.as_str(), r#"{"args":[{"a":2,"z":1}],"kwargs":{}}"#);
    }

    #[test]
    fn test_digest_is_fixed_length_hex() {
        let config = HashConfig {
            mode: Some(HashMode::Digest),
            ..HashConfig::default()
        };
        let deriver = KeyDeriver::from_config(&config, false).unwrap();
        let key = deriver.derive(&CallArgs::new().arg("x".repeat(10_000))).unwrap();
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fixed_length_default() {
        let deriver = KeyDeriver::from_config(&HashConfig::default(), true).unwrap();
        assert_eq!(deriver.mode_name(), "digest");
    }

    #[test]
    fn test_fixed_length_rejects_json_mode() {
        let json = HashConfig {
            mode: Some(HashMode::Json),
            ..HashConfig::default()
        };
        assert!(matches!(
            KeyDeriver::from_config(&json, true),
            Err(CacheError::Configuration(_))
        ));
        assert!(KeyDeriver::from_config(&json, false).is_ok());
    }

    #[test]
    fn test_normalization_equivalence() {
        let deriver = KeyDeriver::from_config(&abc_config(), false).unwrap();
        let k1 = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(3)).unwrap();
        let k2 = deriver.derive(&CallArgs::new().arg(1).arg(2).kwarg("c", 3)).unwrap();
        let k3 = deriver
            .derive(&CallArgs::new().kwarg("a", 1).kwarg("b", 2).kwarg("c", 3))
            .unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1, k3);
    }

    #[test]
    fn test_without_normalization_keys_differ() {
        let deriver = plain();
        let k1 = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(3)).unwrap();
        let k2 = deriver.derive(&CallArgs::new().arg(1).arg(2).kwarg("c", 3)).unwrap();
        let k3 = deriver
            .derive(&CallArgs::new().kwarg("a", 1).kwarg("b", 2).kwarg("c", 3))
            .unwrap();
        assert_ne!(k1, k2);
        assert_ne!(k2, k3);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_filters_imply_normalization() {
        let config = HashConfig {
            normalize: None,
            exclude: Some(vec!["c".to_string()]),
            ..abc_config()
        };
        let deriver = KeyDeriver::from_config(&config, false).unwrap();
        assert!(deriver.normalizes());

        let k1 = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(3)).unwrap();
        let k2 = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(99)).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_include_filter() {
        let config = HashConfig {
            include: Some(vec!["a".to_string()]),
            ..abc_config()
        };
        let deriver = KeyDeriver::from_config(&config, false).unwrap();
        let key = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(3)).unwrap();
        assert_eq!(key.as_str(), r#"{"args":[],"kwargs":{"a":1}}"#);
    }

    #[test]
    fn test_unknown_filter_name() {
        let config = HashConfig {
            include: Some(vec!["nope".to_string()]),
            ..abc_config()
        };
        let deriver = KeyDeriver::from_config(&config, false).unwrap();
        let result = deriver.derive(&CallArgs::new().arg(1).arg(2).arg(3));
        assert!(matches!(result, Err(CacheError::KeyDerivation(_))));
    }

    #[test]
    fn test_configuration_errors() {
        let both_filters = HashConfig {
            include: Some(vec!["a".to_string()]),
            exclude: Some(vec!["b".to_string()]),
            ..abc_config()
        };
        assert!(matches!(
            KeyDeriver::from_config(&both_filters, false),
            Err(CacheError::Configuration(_))
        ));

        let filter_without_normalize = HashConfig {
            normalize: Some(false),
            include: Some(vec!["a".to_string()]),
            ..abc_config()
        };
        assert!(KeyDeriver::from_config(&filter_without_normalize, false).is_err());

        let normalize_without_signature = HashConfig {
            normalize: Some(true),
            ..HashConfig::default()
        };
        assert!(KeyDeriver::from_config(&normalize_without_signature, false).is_err());

        let mode_and_fn = HashConfig {
            mode: Some(HashMode::Json),
            key_fn: Some(Arc::new(|_: &CallArgs| -> Result<EntryKey> {
                Ok(EntryKey::from("k"))
            })),
            ..HashConfig::default()
        };
        assert!(KeyDeriver::from_config(&mode_and_fn, false).is_err());
    }

    #[test]
    fn test_custom_key_fn_sees_normalized_args() {
        let config = HashConfig {
            key_fn: Some(Arc::new(|args: &CallArgs| -> Result<EntryKey> {
                let a = args.named().get("a").cloned().unwrap_or(Value::Null);
                Ok(EntryKey::new(format!("a={}", a)))
            })),
            ..abc_config()
        };
        let deriver = KeyDeriver::from_config(&config, false).unwrap();
        let key = deriver.derive(&CallArgs::new().arg(7).arg(8).arg(9)).unwrap();
        assert_eq!(key.as_str(), "a=7");
    }

    #[test]
    fn test_parse_hash_mode() {
        assert_eq!("json".parse::<HashMode>().unwrap(), HashMode::Json);
        assert_eq!("json_digest".parse::<HashMode>().unwrap(), HashMode::Digest);
        assert!("md4".parse::<HashMode>().is_err());
    }
}
