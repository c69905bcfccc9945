//! Tstat log parsing, batching, and delivery engine.
//!
//! The pipeline, leaf-first:
//! - [`parse`] — header sanitization, whitespace-table reading, numeric
//!   coercion of raw cells
//! - [`record`] — directional flow record derivation (tcp and udp variants)
//! - [`filter`] — byte-volume gate
//! - [`batch`] — fixed-size order-preserving slices, serialized per slice
//! - [`transport`] — the delivery channel boundary (RabbitMQ and dry-run)
//! - [`walk`] — the depth-first directory walk and the per-directory
//!   completion-marker state machine that drives everything above
//!
//! The walk is strictly sequential and single-threaded; the completion
//! marker on disk is the only state that survives between invocations.

pub mod batch;
pub mod filter;
pub mod parse;
pub mod record;
pub mod shutdown;
pub mod transport;
pub mod walk;

pub use shutdown::ShutdownFlag;
