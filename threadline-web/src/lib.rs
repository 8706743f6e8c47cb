//! Source acquisition: turn shared conversation links into clean text.
//!
//! - [`gate::ConcurrencyGate`]: bounds how many extractions touch the browser at once
//! - [`adapters`]: per-site DOM selector strategies with a generic fallback
//! - [`extract::ContentExtractor`]: navigate, scroll, harvest, classify
//! - [`sanitize::Sanitizer`]: boilerplate removal and ASCII normalization

pub mod adapters;
pub mod extract;
pub mod gate;
pub mod sanitize;

pub use extract::{ContentExtractor, ExtractionError, ExtractorSettings, SourceExtractor, SourceText};
pub use gate::{ConcurrencyGate, GatePermit};
pub use sanitize::Sanitizer;

#[cfg(test)]
pub(crate) mod testing;
