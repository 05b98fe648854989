//! Row sources
//!
//! Concrete implementations of `ctb_core::RowSource`:
//!
//! - [`JsonlRowSource`]: `SELECT JSON` exports of `system_traces`
//! - [`MemoryRowSource`]: pre-decoded rows held in memory
//! - [`TraceGenerator`]: deterministic synthetic workloads for demo mode

mod decode;
pub mod generator;
pub mod jsonl;
pub mod memory;

pub use generator::{GeneratorConfig, TraceGenerator};
pub use jsonl::JsonlRowSource;
pub use memory::MemoryRowSource;
