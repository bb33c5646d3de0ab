//! Length-bounded composition of the `tracestate` trace-context header.
//!
//! Distributed traces carry per-vendor key/value trace state across service
//! boundaries in a [W3C Trace Context]-style `tracestate` header. Each
//! outgoing propagation event prepends the current service's entry to the
//! member list it received, and the combined header must never exceed a
//! fixed wire-format byte budget. This crate owns exactly that composition:
//! the ordered member list, the prepend operation, deterministic tail
//! eviction under the budget, and serialization into wire format.
//!
//! Reading incoming headers, span lifecycle, and transport are the owning
//! agent's concern: it supplies the current [`Tracestate`] and the
//! service/span member to prepend, and consumes one header string.
//!
//! # Getting Started
//!
//! ```
//! use tracestate_propagator::{Tracestate, TracestateComposer};
//!
//! // Decoded content of the inbound tracestate, newest member first,
//! // as supplied by the trace-context reader.
//! let state = Tracestate::from_key_value(vec![("congo", "t61rcWkgMzE")]).unwrap();
//!
//! let composer = TracestateComposer::new();
//! let header = composer.combined_header(&state, "rojo", "00f067aa0ba902b7");
//!
//! assert_eq!(header, "rojo=00f067aa0ba902b7,congo=t61rcWkgMzE");
//! ```
//!
//! Every operation returns a new value; nothing is shared or mutated, so a
//! single composer can serve any number of concurrent request-handling
//! contexts.
//!
//! # Feature Flags
//!
//! - `internal-logs`: emit internal diagnostics through [`tracing`] events.
//! - `serialize`: `serde` support for [`Member`] and [`Tracestate`].
//!
//! [W3C Trace Context]: https://www.w3.org/TR/trace-context/#tracestate-header
//! [`tracing`]: https://crates.io/crates/tracing
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(
    docsrs,
    feature(doc_cfg, doc_auto_cfg),
    deny(rustdoc::broken_intra_doc_links)
)]
#![cfg_attr(test, deny(warnings))]

mod composer;
mod state;

pub mod propagation;

mod internal_logging;

pub use composer::{
    TracestateComposer, TRACESTATE_COMBINED_HEADER_MAX_LENGTH, TRACESTATE_HEADER,
};
pub use state::{Member, Tracestate, TracestateError};

#[doc(hidden)]
#[cfg(feature = "internal-logs")]
pub mod _private {
    pub use tracing::{debug, warn};
}
