#![warn(rust_2018_idioms)]

//! Parsing, validation and recompilation of untrusted CFF font programs.
//!
//! [cff::CFF::parse] reads a CFF program into an owned model, checking every glyph program and
//! repairing or replacing what is malformed. [cff::CFF::compile] writes the model back out.
//! [font::CffFont] ties both together for callers that load fonts for rendering.

/// Reading and writing of binary data.
pub mod binary;
pub mod cff;
pub mod error;
pub mod font;
/// Shared test code.
#[cfg(test)]
pub mod tests;
