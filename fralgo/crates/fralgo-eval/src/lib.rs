//! fralgo-eval - Values, environment and the tree-walking evaluator.
//!
//! Everything after parsing lives here:
//!
//! - [`values`]: the tagged value union and its coercion, arithmetic
//!   and comparison rules;
//! - [`structure`]: record type skeletons;
//! - [`symbols`] and [`namespaces`]: per-namespace symbol tables,
//!   call frames, reference maps and the lookup cascade;
//! - [`eval`]: the recursive executor with sentinel control flow;
//! - [`builtins`]: the built-in function set;
//! - [`fileio`]: the ten numbered file channels;
//! - [`libman`]: `Importer` path resolution and the import stack.
//!
//! The evaluator is strictly single-threaded; the only cross-thread
//! surface is the interruption flag a driver may raise from a signal
//! handler.

pub mod builtins;
mod edge_cases;
pub mod eval;
pub mod fileio;
pub mod libman;
pub mod namespaces;
pub mod structure;
pub mod symbols;
pub mod values;

pub use eval::{Flow, Interp, RECURSION_LIMIT};
pub use namespaces::{Environment, MAIN};
pub use structure::{StructDef, StructLookup};
pub use values::Value;
