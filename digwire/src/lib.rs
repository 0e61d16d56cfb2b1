//! Static wiring generation for dependency-injection containers.
//!
//! `digwire` scans a workspace's sources for declarations carrying an
//! `@digwire` doc directive, relocates each annotated constructor into one
//! generated module and registers every provider with the runtime container
//! at module load. Struct providers get a synthesized constructor whose
//! parameters mirror the struct's public fields; tagged fields move into a
//! derived parameter capsule that the container populates from named and
//! grouped bindings.
//!
//! The pipeline runs in a single pass: parse every scanned file, classify
//! annotated declarations, build one canonical alias table for every module
//! the declarations touch, re-qualify all types for the output module and
//! render the result with `prettyplease`. Generation is all-or-nothing and
//! idempotent: no output is written unless every file succeeds, and
//! re-running on unchanged input reproduces the file byte for byte.

pub mod classify;
pub mod cli;
pub mod directive;
pub mod emit;
pub mod error;
pub mod generate;
pub mod metadata;
pub mod output;
pub mod resolve;
pub mod transform;
pub mod type_expr;
