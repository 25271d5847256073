//! Call Arguments Module
//!
//! Positional and named arguments of a call, plus the parameter list used to
//! normalize them.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

// == Call Args ==
/// Arguments of one call, converted to JSON values.
///
/// A value that cannot be represented as JSON is remembered as an error and
/// reported when a key is derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
    error: Option<String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds arguments from already-converted values.
    pub fn from_parts(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self {
            positional,
            named,
            error: None,
        }
    }

    /// Appends a positional argument.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.positional.push(value),
            Err(e) => self.record_error(format!("positional argument {}: {}", self.positional.len(), e)),
        }
        self
    }

    /// Adds a named argument, replacing any previous value for `name`.
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.named.insert(name, value);
            }
            Err(e) => self.record_error(format!("argument '{}': {}", name, e)),
        }
        self
    }

    /// Appends a positional argument by its `Hash` identity.
    ///
    /// For values that have no JSON form.
    pub fn arg_hashed<T: Hash + ?Sized>(mut self, value: &T) -> Self {
        self.positional.push(Value::from(identity_hash(value)));
        self
    }

    /// Adds a named argument by its `Hash` identity.
    pub fn kwarg_hashed<T: Hash + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.named.insert(name.into(), Value::from(identity_hash(value)));
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn named(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Fails if any argument could not be converted.
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(CacheError::KeyDerivation(format!("unserializable {}", e))),
            None => Ok(()),
        }
    }

    fn record_error(&mut self, error: String) {
        // keep the first failure, it names the offending argument
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

/// Hashes `value` through SHA-256 so keys survive toolchain upgrades.
///
/// Stays stable as long as the type's `Hash` impl writes the same bytes;
/// integer widths such as `usize` still differ between platforms.
fn identity_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DigestHasher(Sha256::new());
    value.hash(&mut hasher);
    hasher.finish()
}

struct DigestHasher(Sha256);

impl Hasher for DigestHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = self.0.clone().finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

// == Param ==
/// One formal parameter of a computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

// == Signature ==
/// Formal parameter list of the computation being cached.
///
/// Mirrors a call signature: ordered parameters that may be passed by
/// position or by name, keyword-only parameters, and an optional variadic
/// positional tail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    keyword_only: Vec<Param>,
    variadic: bool,
    error: Option<String>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required positional-or-named parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            default: None,
        });
        self
    }

    /// Adds a positional-or-named parameter with a default value.
    pub fn param_with_default<T: Serialize>(mut self, name: impl Into<String>, default: T) -> Self {
        let name = name.into();
        let default = self.default_value(&name, default);
        self.params.push(Param { name, default });
        self
    }

    /// Adds a parameter that can only be passed by name.
    pub fn keyword_only<T: Serialize>(mut self, name: impl Into<String>, default: Option<T>) -> Self {
        let name = name.into();
        let default = default.and_then(|d| self.default_value(&name, d));
        self.keyword_only.push(Param { name, default });
        self
    }

    /// Accepts any number of extra positional arguments.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn keyword_only_params(&self) -> &[Param] {
        &self.keyword_only
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Converts a default to JSON, remembering the first failure for `bind`.
    fn default_value<T: Serialize>(&mut self, name: &str, default: T) -> Option<Value> {
        match serde_json::to_value(default) {
            Ok(value) => Some(value),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(format!("'{}': {}", name, e));
                }
                None
            }
        }
    }

    // == Bind ==
    /// Resolves a call against this signature.
    ///
    /// Positional values bind to parameter names in order, surplus ones form
    /// the variadic tail, and omitted parameters take their defaults.
    pub fn bind(&self, args: &CallArgs) -> Result<BoundArgs> {
        if let Some(e) = &self.error {
            return Err(CacheError::KeyDerivation(format!("unserializable default for {}", e)));
        }
        args.check()?;

        let n_params = self.params.len();
        let positional = args.positional();
        if positional.len() > n_params && !self.variadic {
            return Err(CacheError::KeyDerivation(format!(
                "takes {} positional arguments but {} were given",
                n_params,
                positional.len()
            )));
        }

        let mut named = args.named().clone();
        for (param, value) in self.params.iter().zip(positional) {
            if named.contains_key(&param.name) {
                return Err(CacheError::KeyDerivation(format!(
                    "multiple values for argument '{}'",
                    param.name
                )));
            }
            named.insert(param.name.clone(), value.clone());
        }
        let varargs = positional.iter().skip(n_params).cloned().collect();

        for param in self.params.iter().chain(self.keyword_only.iter()) {
            if named.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    named.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(CacheError::KeyDerivation(format!(
                        "missing required argument '{}'",
                        param.name
                    )))
                }
            }
        }

        Ok(BoundArgs { varargs, named })
    }
}

// == Bound Args ==
/// Call arguments resolved to parameter names.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    pub varargs: Vec<Value>,
    pub named: BTreeMap<String, Value>,
}

impl BoundArgs {
    /// Keeps only the listed names and drops the variadic tail.
    pub fn include(self, names: &[String]) -> Result<Self> {
        let mut named = BTreeMap::new();
        for name in names {
            let value = self.named.get(name).ok_or_else(|| unknown_param(name))?;
            named.insert(name.clone(), value.clone());
        }
        Ok(Self {
            varargs: Vec::new(),
            named,
        })
    }

    /// Removes the listed names.
    pub fn exclude(mut self, names: &[String]) -> Result<Self> {
        for name in names {
            self.named.remove(name).ok_or_else(|| unknown_param(name))?;
        }
        Ok(self)
    }

    pub fn into_call_args(self) -> CallArgs {
        CallArgs::from_parts(self.varargs, self.named)
    }
}

fn unknown_param(name: &str) -> CacheError {
    CacheError::KeyDerivation(format!("unknown parameter '{}'", name))
}
