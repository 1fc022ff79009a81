//! Reading and writing object streams.
//!
//! This crate implements a serialization layer for tree shaped objects
//! described by runtime type descriptors. An object can travel in two
//! interchangeable formats: a binary format following the Basic Encoding
//! Rules of X.690 with a few application specific extensions, and a text
//! format following ASN.1 value notation.
//!
//! The two formats are bridged by a pair of traits: [`ObjectWriter`] is
//! implemented by [`BinaryWriter`] and [`TextWriter`], and [`ObjectReader`]
//! by [`BinaryReader`] and [`TextReader`]. Code driving these traits only
//! ever deals with the logical structure of an object. The type descriptors
//! in the [`descr`] module provide that structure, and the generic
//! [`write_object`] and [`read_object`] functions walk a descriptor and a
//! [`Value`] tree in lockstep.
//!
//! A quick example, writing and re-reading a single object in the text
//! format:
//!
//! ```
//! use objstream::{
//!     Config, TextReader, TextWriter, TypeDescr, Value,
//!     read_object, write_object,
//! };
//! use objstream::descr::ClassDescr;
//!
//! let descr: TypeDescr = ClassDescr::new("Pair")
//!     .member("a", TypeDescr::integer())
//!     .member("b", TypeDescr::visible_string())
//!     .into();
//! let value = Value::class([
//!     (0, Value::Integer(300)),
//!     (1, Value::Visible("hi".into())),
//! ]);
//!
//! let mut writer = TextWriter::new(Vec::new(), Config::default());
//! write_object(&mut writer, &descr, &value).unwrap();
//! let text = writer.finish().unwrap();
//!
//! let mut reader = TextReader::new(text.as_slice(), Config::default());
//! assert_eq!(read_object(&mut reader, &descr).unwrap(), value);
//! ```
//!
//! For the binary format, swap in [`BinaryWriter`] and [`BinaryReader`].

//--- Re-exports

pub use self::descr::{TypeDescr, Tagging};
pub use self::error::{Error, ErrorKind, Pos};
pub use self::fixup::StringFixup;
pub use self::length::Length;
pub use self::source::Source;
pub use self::stream::{
    Config, ObjectReader, ObjectWriter, read_object, write_object,
};
pub use self::tag::Tag;
pub use self::value::{BitString, Value};

pub use self::binary::{BinaryReader, BinaryWriter};
pub use self::text::{TextReader, TextWriter};

//--- Modules

pub mod binary;
pub mod descr;
pub mod error;
pub mod fixup;
pub mod length;
pub mod source;
pub mod stream;
pub mod tag;
pub mod text;
pub mod value;

mod frame;
