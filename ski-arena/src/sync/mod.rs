//! Concurrency primitives shared by the arena, rings, and host/worker split.

mod cache_pad;
mod stripe;

pub use cache_pad::CachePadded;
pub use stripe::StripeLocks;
