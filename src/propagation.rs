//! Carrier interface for outgoing propagation.
//!
//! A combined header leaves the process inside some transport carrier, such
//! as a map of HTTP headers. [`Injector`] is the write-side interface to
//! such a carrier; the owning agent decides what the carrier is and when it
//! is flushed. There is no read-side counterpart here: decoding incoming
//! headers is the trace-context reader's concern.

use std::collections::HashMap;

/// Injector provides an interface for adding fields to an underlying struct like `HashMap`.
pub trait Injector {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

impl<S: std::hash::BuildHasher> Injector for HashMap<String, String, S> {
    /// Set a key and value in the HashMap.
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_lowercase(), value);
    }
}
