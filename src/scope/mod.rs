//! Scoped teardown for long-lived registrations.
//!
//! This module provides the lifetime boundary persisted stores use to release
//! their cross-context listeners when the surrounding component goes away.

mod scope;

pub use scope::{on_cleanup, CleanupHandle, Scope};
