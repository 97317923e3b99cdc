//! Cache key derivation
//!
//! Turns heterogeneous call arguments into a stable integer key. Values are
//! normalized into [`ArgValue`]s, digested with SHA-256 and combined as
//! *unordered sets*: named arguments as `(name, value)` pairs, positional
//! arguments as bare values. The hash is a pure function of the normalized
//! inputs, with no randomness and no time dependency, so identical calls key
//! identically across processes and restarts.
//!
//! Treating positional arguments as a set discards position and duplicate
//! count: `(2, 3)` and `(3, 2)` share a key. That coarsening is the
//! established contract of this protocol; callers who need positional
//! sensitivity should pass named arguments with distinct names.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CacheError, Result};
use crate::serialize::Model;
use crate::store::StoreBackend;

/// A call argument normalized for hashing.
///
/// Structured domain values enter as [`ArgValue::Model`], their canonical
/// JSON, so equality of content rather than identity or construction
/// history decides key equality.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    /// Canonical JSON of a structured domain value
    Model(String),
}

impl ArgValue {
    /// Normalize a structured domain value via its canonical encoding.
    pub fn model<M: Model>(value: &M) -> Result<Self> {
        Ok(ArgValue::Model(value.canonical_json()?))
    }

    /// Normalize a caller identity; an absent identity becomes the empty
    /// string (one shared anonymous bucket).
    pub fn caller<C: CallerIdentity + ?Sized>(request: &C) -> Self {
        ArgValue::Str(request.caller_identity().unwrap_or_default())
    }
}

/// Request objects used with response-handler caching expose the caller
/// they act for, so results can be keyed per caller.
pub trait CallerIdentity {
    fn caller_identity(&self) -> Option<String>;
}

macro_rules! impl_arg_value_int {
    ($($ty:ty),+) => {
        $(impl From<$ty> for ArgValue {
            fn from(v: $ty) -> Self {
                ArgValue::Int(v as i128)
            }
        })+
    };
}

impl_arg_value_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<f32> for ArgValue {
    fn from(v: f32) -> Self {
        ArgValue::Float(v as f64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::Str(v)
    }
}

impl From<Uuid> for ArgValue {
    fn from(v: Uuid) -> Self {
        ArgValue::Str(v.to_string())
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => ArgValue::Null,
        }
    }
}

/// The positional and named arguments of one logical call, normalized.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<ArgValue>,
    named: Vec<(String, ArgValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Append a structured domain value as a positional argument.
    pub fn model_arg<M: Model>(self, value: &M) -> Result<Self> {
        let normalized = ArgValue::model(value)?;
        Ok(self.arg(normalized))
    }

    /// Append the caller identity of `request` as a positional argument.
    ///
    /// Response-handler calls put this first: the identity string stands in
    /// for the request object itself, keying the cache per caller.
    pub fn caller<C: CallerIdentity + ?Sized>(self, request: &C) -> Self {
        let identity = ArgValue::caller(request);
        self.arg(identity)
    }

    /// Append a named argument.
    pub fn named(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    pub fn named_args(&self) -> &[(String, ArgValue)] {
        &self.named
    }

    /// A copy keeping only the positional values.
    pub fn positional_only(&self) -> Self {
        Self {
            positional: self.positional.clone(),
            named: Vec::new(),
        }
    }

    fn drop_first_positional(&self) -> Self {
        Self {
            positional: self.positional.iter().skip(1).cloned().collect(),
            named: self.named.clone(),
        }
    }
}

/// Types that can present themselves as normalized call arguments.
///
/// Implemented for [`CallArgs`] itself, for `()`, and for tuples of up to
/// four `Into<ArgValue>` elements (hashed positionally). Argument types that
/// mix a request object or structured values with plain data implement this
/// by hand.
pub trait HashArgs {
    fn call_args(&self) -> Result<CallArgs>;
}

impl HashArgs for CallArgs {
    fn call_args(&self) -> Result<CallArgs> {
        Ok(self.clone())
    }
}

impl HashArgs for () {
    fn call_args(&self) -> Result<CallArgs> {
        Ok(CallArgs::new())
    }
}

macro_rules! impl_hash_args_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name),+> HashArgs for ($($name,)+)
        where
            $($name: Into<ArgValue> + Clone,)+
        {
            fn call_args(&self) -> Result<CallArgs> {
                Ok(CallArgs::new()$(.arg(self.$idx.clone()))+)
            }
        }
    };
}

impl_hash_args_for_tuple!(A: 0);
impl_hash_args_for_tuple!(A: 0, B: 1);
impl_hash_args_for_tuple!(A: 0, B: 1, C: 2);
impl_hash_args_for_tuple!(A: 0, B: 1, C: 2, D: 3);

/// What kind of callable a wrapper is keying for.
///
/// The kind decides which argument slots participate in the key, so that a
/// read-side wrapper and a write-side invalidator agree on the key for the
/// same logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallableKind {
    /// Free function: every argument participates.
    #[default]
    Function,
    /// Bound method: the leading receiver value is excluded.
    Method,
    /// Response handler: the first positional slot is the caller identity
    /// (see [`CallArgs::caller`]), standing in for the request object.
    ResponseHandler,
}

impl CallableKind {
    pub(crate) fn keyed_args(&self, args: &CallArgs) -> CallArgs {
        match self {
            CallableKind::Function | CallableKind::ResponseHandler => args.clone(),
            CallableKind::Method => args.drop_first_positional(),
        }
    }
}

fn value_digest(value: &ArgValue) -> u64 {
    let mut hasher = Sha256::new();
    match value {
        ArgValue::Null => hasher.update([0u8]),
        ArgValue::Bool(b) => {
            hasher.update([1u8]);
            hasher.update([*b as u8]);
        }
        ArgValue::Int(i) => {
            hasher.update([2u8]);
            hasher.update(i.to_le_bytes());
        }
        ArgValue::Float(f) => {
            hasher.update([3u8]);
            hasher.update(f.to_bits().to_le_bytes());
        }
        ArgValue::Str(s) => {
            hasher.update([4u8]);
            hasher.update(s.as_bytes());
        }
        ArgValue::Model(s) => {
            hasher.update([5u8]);
            hasher.update(s.as_bytes());
        }
    }
    truncate_digest(hasher)
}

fn pair_digest(name: &str, value: &ArgValue) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update([6u8]);
    hasher.update((name.len() as u64).to_le_bytes());
    hasher.update(name.as_bytes());
    hasher.update(value_digest(value).to_le_bytes());
    truncate_digest(hasher)
}

fn truncate_digest(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(word)
}

/// Deterministic, order-independent hash of one call's arguments.
///
/// Positional values and `(name, value)` pairs are digested individually
/// and folded as sorted sets, so argument order never matters and repeated
/// positional values collapse.
pub fn arg_hash(args: &CallArgs) -> u64 {
    let positional: BTreeSet<u64> = args.positional.iter().map(value_digest).collect();
    let named: BTreeSet<u64> = args
        .named
        .iter()
        .map(|(name, value)| pair_digest(name, value))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update([b'p']);
    for digest in &positional {
        hasher.update(digest.to_le_bytes());
    }
    hasher.update([b'n']);
    for digest in &named {
        hasher.update(digest.to_le_bytes());
    }
    truncate_digest(hasher)
}

/// Generate a random store key that does not already exist.
///
/// Draws UUIDv4 identifiers under `base_prefix` and probes the store,
/// retrying on collision up to `attempts` times. A zero budget is a
/// configuration error; exhausting a non-zero budget means the keyspace or
/// the store connection is misconfigured and is fatal.
pub async fn random_key(
    store: &dyn StoreBackend,
    base_prefix: &str,
    attempts: u32,
) -> Result<String> {
    if attempts == 0 {
        return Err(CacheError::Config(
            "random key generation needs at least one attempt".to_string(),
        ));
    }

    for _ in 0..attempts {
        let candidate = format!("{base_prefix}{}", Uuid::new_v4());
        if !store.exists(&candidate).await? {
            debug!("Reserved random key: {}", candidate);
            return Ok(candidate);
        }
    }

    Err(CacheError::KeyCollision { attempts })
}
