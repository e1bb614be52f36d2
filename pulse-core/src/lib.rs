//! Pulse Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - Reactive primitives (signals, memos, effects)
//! - Automatic dependency tracking with dynamic dependencies
//! - Lazy, memoized recomputation of derived values
//! - Deferred, deduplicated scheduling of effects
//!
//! Writes push dirtiness to exactly the nodes that read the written value,
//! so there is no diffing pass: whatever depends on a change, and nothing
//! else, is recomputed or rerun.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node bookkeeping, edge reconciliation and the task scheduler
//! - `reactive`: Signals, memos, effects and the evaluation context
//! - `config`: Per-thread runtime configuration
//! - `error`: The crate's error type
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_core::reactive::{Signal, Memo, Effect};
//! use pulse_core::graph::flush;
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = Memo::new({
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! // Create an effect
//! Effect::new(move || {
//!     println!("Doubled: {}", doubled.get());
//! });
//!
//! flush(); // prints "Doubled: 0"
//!
//! // Update the signal
//! count.set(5);
//! flush(); // prints "Doubled: 10"
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::{flush, settle, NodeId, TickReport};
pub use reactive::{untrack, Effect, Memo, Runtime, Signal};
