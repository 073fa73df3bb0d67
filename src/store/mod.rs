//! The reactive container underneath every persisted store.
//!
//! A [`Store`] holds a value and notifies its subscribers synchronously on
//! every change. New subscribers receive the current value immediately.

mod store;

pub use store::{Store, Subscription};
