//! The text format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! The text format is ASN.1 value notation: labelled values in nested
//! brace blocks, separated by commas, with `--` comments and a
//! `Name ::=` header in front of a named top level value. Tags play no
//! part in it; members and variants are identified by their labels.

mod lex;

pub mod reader;
pub mod writer;

pub use self::reader::TextReader;
pub use self::writer::TextWriter;
