// ABOUTME: Price extraction strategies for the two content shapes a source can serve.
// ABOUTME: Markup walks visible HTML text; embedded reads literal arrays out of script payloads.

//! Extraction module.
//!
//! Submodules:
//! - `markup`: document-order text walk with classifier + plausibility parsing.
//! - `embedded`: `identifier = [...];` literal arrays mapped to fields.

pub mod embedded;
pub mod markup;

pub use embedded::{extract_from_embedded, EmbeddedMarkers, EntryMapping};
pub use markup::extract_from_document;
