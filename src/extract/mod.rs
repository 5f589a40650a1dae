//! Per-language symbol and import extraction
//!
//! Extraction is deliberately lexical: a static table of declaration and
//! import patterns per language, plus a generic fallback for everything
//! else. This trades completeness for being grammar-free and fast across
//! many languages, which is acceptable for a navigation aid.

pub mod registry;
pub mod rules;

pub use registry::{ExtractorRegistry, LanguageId};
