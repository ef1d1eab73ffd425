//! Reply generators for the in-process reply service.

pub mod echo;
pub mod gemini;
