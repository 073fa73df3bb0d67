use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Why a stored value was rejected.
#[derive(Debug, Error)]
pub enum ShapeError {
    /// The raw text is not valid JSON, or does not deserialize into the type.
    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The value decoded but failed a validation rule.
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Validates an arbitrary decoded value into a `T`.
pub trait Shape<T>: Send + Sync {
    /// Accept `value` as a `T`, or say why not.
    fn parse(&self, value: Value) -> Result<T, ShapeError>;
}

/// Shape that accepts whatever deserializes into `T`.
pub struct Serde<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Serde<T> {
    /// Shape for `T`'s own `Deserialize` impl.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Serde<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Serde<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serde<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Shape<T> for Serde<T> {
    fn parse(&self, value: Value) -> Result<T, ShapeError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Shape backed by a hand-written validator. See [`from_fn`].
pub struct FnShape<F> {
    parse: F,
}

/// Build a shape from a closure.
///
/// ```
/// use keepsake::shape::{from_fn, Shape, ShapeError};
/// use serde_json::json;
///
/// let port = from_fn(|value| {
///     value
///         .as_u64()
///         .filter(|n| (1..=65535).contains(n))
///         .map(|n| n as u16)
///         .ok_or_else(|| ShapeError::Invalid(format!("not a port: {value}")))
/// });
///
/// assert_eq!(port.parse(json!(8080)).unwrap(), 8080);
/// assert!(port.parse(json!(0)).is_err());
/// ```
pub fn from_fn<T, F>(parse: F) -> FnShape<F>
where
    F: Fn(Value) -> Result<T, ShapeError> + Send + Sync,
{
    FnShape { parse }
}

impl<T, F> Shape<T> for FnShape<F>
where
    F: Fn(Value) -> Result<T, ShapeError> + Send + Sync,
{
    fn parse(&self, value: Value) -> Result<T, ShapeError> {
        (self.parse)(value)
    }
}

/// A shape with an extra predicate on the parsed value.
pub struct Refined<S, P> {
    inner: S,
    predicate: P,
    message: String,
}

impl<T, S, P> Shape<T> for Refined<S, P>
where
    S: Shape<T>,
    P: Fn(&T) -> bool + Send + Sync,
{
    fn parse(&self, value: Value) -> Result<T, ShapeError> {
        let parsed = self.inner.parse(value)?;
        if (self.predicate)(&parsed) {
            Ok(parsed)
        } else {
            Err(ShapeError::Invalid(self.message.clone()))
        }
    }
}

/// Combinators available on every shape.
pub trait ShapeExt<T>: Shape<T> + Sized {
    /// Reject parsed values for which `predicate` is false.
    fn refine<P>(self, predicate: P, message: impl Into<String>) -> Refined<Self, P>
    where
        P: Fn(&T) -> bool + Send + Sync,
    {
        Refined {
            inner: self,
            predicate,
            message: message.into(),
        }
    }
}

impl<T, S: Shape<T>> ShapeExt<T> for S {}

/// Decode raw stored text and validate it.
pub fn decode<T, S>(shape: &S, raw: &str) -> Result<T, ShapeError>
where
    S: Shape<T> + ?Sized,
{
    let value: Value = serde_json::from_str(raw)?;
    shape.parse(value)
}
