//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, and effects.
//! These primitives form the foundation of Pulse's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a memo or effect is evaluating, the signal automatically registers
//! that node as a dependent. When the signal's value changes, all dependents
//! are marked dirty.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changed, and only when it is next read.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that reruns whenever its
//! dependencies change. Reruns are deferred to the scheduler and batched, so
//! a burst of writes triggers one rerun.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local evaluation context to detect
//! dependencies automatically. When a signal or memo is read, we check if a
//! node is being evaluated and, if so, record the edge.

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;

pub use context::{untrack, ReactiveContext};
pub use effect::Effect;
pub use memo::Memo;
pub use runtime::Runtime;
pub use signal::Signal;
