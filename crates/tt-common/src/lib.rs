//! Tstat transport common types and errors.
//!
//! This crate provides the foundational types shared across the transport
//! crates:
//! - The `FlowRecord` wire schema (one direction of one observed flow)
//! - Direction and protocol tags
//! - The unified error type

pub mod error;
pub mod record;

pub use error::{Error, Result};
pub use record::{Direction, FlowRecord, Protocol, RecordMeta, RecordValues};
