//! Runtime validation of values read back from storage.
//!
//! Anything coming out of a storage area is untrusted: it may predate a schema
//! change or have been edited by hand. A [`Shape`] turns a decoded JSON value
//! into a typed value or rejects it.

mod shape;

pub use shape::{decode, from_fn, FnShape, Refined, Serde, Shape, ShapeError, ShapeExt};
