//! Declaration transformers.
//!
//! Each annotated declaration becomes a relocated provider function in the
//! output module; annotated structs additionally grow a parameter capsule
//! when they declare tagged fields.

use crate::directive::Directive;

pub mod functions;
pub mod structs;

/// Synthesized output for one annotated declaration.
#[derive(Debug, Clone)]
pub struct Synthesized {
    /// Name of the provider function, unique per run.
    pub fn_name: String,
    /// Items to splice into the output module, provider function last.
    pub items: Vec<syn::Item>,
    /// The declaration's directive, for registration bucketing.
    pub directive: Directive,
}
