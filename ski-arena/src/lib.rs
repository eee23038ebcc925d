//! A shared-memory arena evaluator for the SKI combinator calculus.
//!
//! The [`arena`] module is the hash-consed node store; [`reducer`] is the
//! iterative, suspendable rewrite engine that runs over it; [`ring`] is the
//! submission/completion/IO ring set workers and the host exchange work
//! and results through; [`host`] and [`worker`] are the two halves of the
//! cooperative scheduler built on top of those rings; [`marshal`] converts
//! between arena node ids and an owned expression tree.
//!
//! This crate has no binary target and no CLI: it's a library meant to be
//! embedded by something that owns its own process lifecycle, parsing, and
//! persistence.

pub mod arena;
pub mod config;
pub mod error;
pub mod host;
pub mod marshal;
pub mod reducer;
pub mod ring;
mod sync;
pub mod worker;

pub use arena::Arena;
pub use config::Config;
pub use error::{Error, Result};
pub use host::Host;
