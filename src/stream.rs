//! The shared contract of the two formats.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.
//!
//! Both the binary and the text codec implement the visitor style traits
//! defined here: begin/end callbacks for every structural kind and one
//! call per primitive value. The free functions [`write_object`] and
//! [`read_object`] drive a depth-first traversal of a [`Value`] tree
//! against a [`TypeDescr`] through these traits, so the traversal logic
//! exists only once.

use bytes::Bytes;
use crate::descr::{
    ClassDescr, ContainerDescr, ChoiceDescr, EnumDescr, PrimitiveKind,
    TypeDescr,
};
use crate::error::{Error, Pos};
use crate::fixup::StringFixup;
use crate::value::{BitString, Value};


//------------ Config --------------------------------------------------------

/// The configuration of a stream.
///
/// A config is passed in when a stream is created and never changes
/// afterwards.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// What to do with non-printable bytes in visible strings.
    pub fixup: StringFixup,

    /// Whether decoding quietly skips members unknown to the descriptor.
    pub skip_unknown: bool,

    /// The number of significant digits used when encoding reals.
    pub real_precision: usize,

    /// Whether to check tagging disciplines for consistent use.
    ///
    /// With this enabled, a class using automatic tagging that contains a
    /// member with an explicit tagging override is reported as an illegal
    /// call. This is a check against broken descriptors, not against bad
    /// data.
    pub verify_tagging: bool,

    /// Whether large bit strings may use the compressed encoding.
    pub compress_bit_strings: bool,
}

impl Config {
    /// The default number of significant digits for a double.
    pub const DEFAULT_REAL_PRECISION: usize = 15;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixup: StringFixup::default(),
            skip_unknown: false,
            real_precision: Self::DEFAULT_REAL_PRECISION,
            verify_tagging: false,
            compress_bit_strings: false,
        }
    }
}


//------------ ObjectWriter --------------------------------------------------

/// A sink for one depth-first traversal of an object.
///
/// Every begin call must be matched by the corresponding end call at the
/// same nesting depth. Implementations enforce this through their frame
/// stack and report violations as illegal calls.
pub trait ObjectWriter {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error>;
    fn begin_member(
        &mut self, descr: &ClassDescr, index: usize
    ) -> Result<(), Error>;
    fn end_member(
        &mut self, descr: &ClassDescr, index: usize
    ) -> Result<(), Error>;
    fn end_class(&mut self, descr: &ClassDescr) -> Result<(), Error>;

    fn begin_container(&mut self, descr: &ContainerDescr)
        -> Result<(), Error>;
    fn begin_element(&mut self, descr: &ContainerDescr)
        -> Result<(), Error>;
    fn end_element(&mut self, descr: &ContainerDescr) -> Result<(), Error>;
    fn end_container(&mut self, descr: &ContainerDescr) -> Result<(), Error>;

    fn begin_variant(
        &mut self, descr: &ChoiceDescr, index: usize
    ) -> Result<(), Error>;
    fn end_variant(
        &mut self, descr: &ChoiceDescr, index: usize
    ) -> Result<(), Error>;

    fn write_null(&mut self) -> Result<(), Error>;
    fn write_bool(&mut self, value: bool) -> Result<(), Error>;
    fn write_integer(&mut self, value: i64) -> Result<(), Error>;
    fn write_unsigned(&mut self, value: u64) -> Result<(), Error>;
    fn write_real(&mut self, value: f64) -> Result<(), Error>;
    fn write_visible(&mut self, value: &str) -> Result<(), Error>;
    fn write_utf8(&mut self, value: &str) -> Result<(), Error>;
    fn write_string_store(&mut self, value: &str) -> Result<(), Error>;
    fn write_octets(&mut self, value: &[u8]) -> Result<(), Error>;
    fn write_bits(&mut self, value: &BitString) -> Result<(), Error>;
    fn write_enum(
        &mut self, descr: &EnumDescr, value: i64
    ) -> Result<(), Error>;

    /// Returns the current position for error reporting.
    fn pos(&self) -> Pos;
}


//------------ ObjectReader --------------------------------------------------

/// A source for one depth-first traversal of an object.
///
/// The iteration calls `next_member` and `next_element` signal the end of
/// a block by returning `None` and `false` respectively, exactly once.
pub trait ObjectReader {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error>;

    /// Advances to the next member of the open class.
    ///
    /// Returns the index of the member in the descriptor or `None` at the
    /// end of the class. Members not present in the descriptor are skipped
    /// or rejected depending on the configuration.
    fn next_member(
        &mut self, descr: &ClassDescr
    ) -> Result<Option<usize>, Error>;
    fn end_member(
        &mut self, descr: &ClassDescr, index: usize
    ) -> Result<(), Error>;
    fn end_class(&mut self, descr: &ClassDescr) -> Result<(), Error>;

    fn begin_container(&mut self, descr: &ContainerDescr)
        -> Result<(), Error>;

    /// Returns whether another element follows in the open container.
    fn next_element(&mut self, descr: &ContainerDescr)
        -> Result<bool, Error>;
    fn end_element(&mut self, descr: &ContainerDescr) -> Result<(), Error>;
    fn end_container(&mut self, descr: &ContainerDescr) -> Result<(), Error>;

    /// Begins the chosen variant, returning its index in the descriptor.
    fn begin_variant(&mut self, descr: &ChoiceDescr) -> Result<usize, Error>;
    fn end_variant(
        &mut self, descr: &ChoiceDescr, index: usize
    ) -> Result<(), Error>;

    fn read_null(&mut self) -> Result<(), Error>;
    fn read_bool(&mut self) -> Result<bool, Error>;
    fn read_integer(&mut self) -> Result<i64, Error>;
    fn read_unsigned(&mut self) -> Result<u64, Error>;
    fn read_real(&mut self) -> Result<f64, Error>;
    fn read_visible(&mut self) -> Result<String, Error>;
    fn read_utf8(&mut self) -> Result<String, Error>;
    fn read_string_store(&mut self) -> Result<String, Error>;
    fn read_octets(&mut self) -> Result<Bytes, Error>;
    fn read_bits(&mut self) -> Result<BitString, Error>;
    fn read_enum(&mut self, descr: &EnumDescr) -> Result<i64, Error>;

    /// Returns the current position for error reporting.
    fn pos(&self) -> Pos;
}


//------------ write_object --------------------------------------------------

/// Writes a value following a type descriptor.
///
/// The value must structurally match the descriptor; a mismatch is
/// reported as an illegal call since it indicates a bug in the code that
/// built the value, not bad data.
pub fn write_object<W: ObjectWriter + ?Sized>(
    writer: &mut W, descr: &TypeDescr, value: &Value
) -> Result<(), Error> {
    match (descr, value) {
        (TypeDescr::Primitive(kind), value) => {
            write_primitive(writer, kind, value)
        }
        (TypeDescr::Class(class), Value::Class(members)) => {
            writer.begin_class(class)?;
            for (index, member) in members {
                if *index >= class.members().len() {
                    return Err(err_mismatch(writer.pos()))
                }
                writer.begin_member(class, *index)?;
                write_object(writer, &class.get(*index).descr, member)?;
                writer.end_member(class, *index)?;
            }
            writer.end_class(class)
        }
        (TypeDescr::Choice(choice), Value::Choice(index, inner)) => {
            if *index >= choice.variants().len() {
                return Err(err_mismatch(writer.pos()))
            }
            writer.begin_variant(choice, *index)?;
            write_object(writer, &choice.get(*index).descr, inner)?;
            writer.end_variant(choice, *index)
        }
        (TypeDescr::Container(container), Value::Container(elements)) => {
            writer.begin_container(container)?;
            for element in elements {
                writer.begin_element(container)?;
                write_object(writer, container.element(), element)?;
                writer.end_element(container)?;
            }
            writer.end_container(container)
        }
        _ => Err(err_mismatch(writer.pos()))
    }
}

/// Writes a primitive value of the given kind.
fn write_primitive<W: ObjectWriter + ?Sized>(
    writer: &mut W, kind: &PrimitiveKind, value: &Value
) -> Result<(), Error> {
    match (kind, value) {
        (PrimitiveKind::Null, Value::Null) => writer.write_null(),
        (PrimitiveKind::Bool, Value::Bool(value)) => {
            writer.write_bool(*value)
        }
        (PrimitiveKind::Integer, Value::Integer(value)) => {
            writer.write_integer(*value)
        }
        (PrimitiveKind::Unsigned, Value::Unsigned(value)) => {
            writer.write_unsigned(*value)
        }
        (PrimitiveKind::Real, Value::Real(value)) => {
            writer.write_real(*value)
        }
        (PrimitiveKind::VisibleString, Value::Visible(value)) => {
            writer.write_visible(value)
        }
        (PrimitiveKind::Utf8String, Value::Utf8(value)) => {
            writer.write_utf8(value)
        }
        (PrimitiveKind::StringStore, Value::Visible(value)) => {
            writer.write_string_store(value)
        }
        (PrimitiveKind::OctetString, Value::Octets(value)) => {
            writer.write_octets(value)
        }
        (PrimitiveKind::BitString, Value::Bits(value)) => {
            writer.write_bits(value)
        }
        (PrimitiveKind::Enum(descr), Value::Enum(value)) => {
            writer.write_enum(descr, *value)
        }
        _ => Err(err_mismatch(writer.pos()))
    }
}

fn err_mismatch(pos: Pos) -> Error {
    Error::illegal("value does not match type descriptor", pos)
}


//------------ read_object ---------------------------------------------------

/// Reads a value following a type descriptor.
pub fn read_object<R: ObjectReader + ?Sized>(
    reader: &mut R, descr: &TypeDescr
) -> Result<Value, Error> {
    match descr {
        TypeDescr::Primitive(kind) => read_primitive(reader, kind),
        TypeDescr::Class(class) => {
            reader.begin_class(class)?;
            let mut members = Vec::new();
            while let Some(index) = reader.next_member(class)? {
                let value = read_object(reader, &class.get(index).descr)?;
                reader.end_member(class, index)?;
                members.push((index, value));
            }
            reader.end_class(class)?;
            for (index, member) in class.members().iter().enumerate() {
                if !member.optional
                    && !members.iter().any(|(idx, _)| *idx == index)
                {
                    return Err(Error::format(
                        format!(
                            "missing mandatory member \"{}\" of {}",
                            member.name, class.name()
                        ),
                        reader.pos()
                    ))
                }
            }
            Ok(Value::Class(members))
        }
        TypeDescr::Choice(choice) => {
            let index = reader.begin_variant(choice)?;
            let value = read_object(reader, &choice.get(index).descr)?;
            reader.end_variant(choice, index)?;
            Ok(Value::choice(index, value))
        }
        TypeDescr::Container(container) => {
            reader.begin_container(container)?;
            let mut elements = Vec::new();
            while reader.next_element(container)? {
                elements.push(read_object(reader, container.element())?);
                reader.end_element(container)?;
            }
            reader.end_container(container)?;
            Ok(Value::Container(elements))
        }
    }
}

/// Reads a primitive value of the given kind.
fn read_primitive<R: ObjectReader + ?Sized>(
    reader: &mut R, kind: &PrimitiveKind
) -> Result<Value, Error> {
    match kind {
        PrimitiveKind::Null => {
            reader.read_null()?;
            Ok(Value::Null)
        }
        PrimitiveKind::Bool => reader.read_bool().map(Value::Bool),
        PrimitiveKind::Integer => reader.read_integer().map(Value::Integer),
        PrimitiveKind::Unsigned => {
            reader.read_unsigned().map(Value::Unsigned)
        }
        PrimitiveKind::Real => reader.read_real().map(Value::Real),
        PrimitiveKind::VisibleString => {
            reader.read_visible().map(Value::Visible)
        }
        PrimitiveKind::Utf8String => reader.read_utf8().map(Value::Utf8),
        PrimitiveKind::StringStore => {
            reader.read_string_store().map(Value::Visible)
        }
        PrimitiveKind::OctetString => reader.read_octets().map(Value::Octets),
        PrimitiveKind::BitString => reader.read_bits().map(Value::Bits),
        PrimitiveKind::Enum(descr) => {
            reader.read_enum(descr).map(Value::Enum)
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::binary::{BinaryReader, BinaryWriter};
    use crate::descr::{ClassDescr, ChoiceDescr, Tagging};
    use crate::error::ErrorKind;
    use crate::text::{TextReader, TextWriter};
    use super::*;

    fn sample_descr() -> TypeDescr {
        ClassDescr::new("Sample")
            .member("flag", TypeDescr::boolean())
            .member("count", TypeDescr::unsigned())
            .member("ratio", TypeDescr::real())
            .member("label", TypeDescr::visible_string())
            .member("blob", TypeDescr::octet_string())
            .member("mask", TypeDescr::bit_string())
            .member("mode", TypeDescr::enumerated(
                EnumDescr::new([("off", 0), ("on", 1)], false)
            ))
            .member("items", TypeDescr::sequence_of(TypeDescr::integer()))
            .member("pick", ChoiceDescr::new("Pick")
                .variant("num", TypeDescr::integer())
                .variant("name", TypeDescr::visible_string())
                .into()
            )
            .optional_member("note", TypeDescr::utf8_string())
            .into()
    }

    fn sample_value() -> Value {
        Value::class([
            (0, Value::Bool(true)),
            (1, Value::Unsigned(300)),
            (2, Value::Real(1.5)),
            (3, Value::Visible("hello".into())),
            (4, Value::octets(b"\x01\x02\xff".as_slice())),
            (5, Value::Bits(
                BitString::from_bits([true, false, true, true, false])
            )),
            (6, Value::Enum(1)),
            (7, Value::container(
                [Value::Integer(-1), Value::Integer(0), Value::Integer(7)]
            )),
            (8, Value::choice(1, Value::Visible("x".into()))),
        ])
    }

    fn binary_round_trip(descr: &TypeDescr, value: &Value) -> Value {
        let mut writer = BinaryWriter::new(Vec::new(), Config::default());
        write_object(&mut writer, descr, value).unwrap();
        let data = writer.finish().unwrap();
        let mut reader = BinaryReader::new(
            data.as_slice(), Config::default()
        );
        let res = read_object(&mut reader, descr).unwrap();
        reader.finish().unwrap();
        res
    }

    fn text_round_trip(descr: &TypeDescr, value: &Value) -> Value {
        let mut writer = TextWriter::new(Vec::new(), Config::default());
        write_object(&mut writer, descr, value).unwrap();
        let data = writer.finish().unwrap();
        let mut reader = TextReader::new(data.as_slice(), Config::default());
        let res = read_object(&mut reader, descr).unwrap();
        reader.finish().unwrap();
        res
    }

    #[test]
    fn round_trip_both_formats() {
        let descr = sample_descr();
        let value = sample_value();
        assert_eq!(binary_round_trip(&descr, &value), value);
        assert_eq!(text_round_trip(&descr, &value), value);
    }

    #[test]
    fn round_trip_explicit_tagging() {
        let descr: TypeDescr = ClassDescr::new("Sample")
            .tagging(Tagging::Explicit)
            .member("a", TypeDescr::integer())
            .member("b", TypeDescr::visible_string())
            .into();
        let value = Value::class([
            (0, Value::Integer(-300)),
            (1, Value::Visible("hi".into())),
        ]);
        assert_eq!(binary_round_trip(&descr, &value), value);
        assert_eq!(text_round_trip(&descr, &value), value);
    }

    #[test]
    fn round_trip_top_level_choice() {
        let descr: TypeDescr = ChoiceDescr::new("Pick")
            .variant("num", TypeDescr::integer())
            .variant("name", TypeDescr::visible_string())
            .into();
        let value = Value::choice(0, Value::Integer(42));
        assert_eq!(binary_round_trip(&descr, &value), value);
        assert_eq!(text_round_trip(&descr, &value), value);
    }

    #[test]
    fn missing_mandatory_member() {
        let partial: TypeDescr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .optional_member("b", TypeDescr::visible_string())
            .into();
        let full: TypeDescr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .member("b", TypeDescr::visible_string())
            .into();
        let value = Value::class([(0, Value::Integer(1))]);

        let mut writer = BinaryWriter::new(Vec::new(), Config::default());
        write_object(&mut writer, &partial, &value).unwrap();
        let data = writer.finish().unwrap();
        let mut reader = BinaryReader::new(
            data.as_slice(), Config::default()
        );
        let err = read_object(&mut reader, &full).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().contains("missing mandatory member \"b\""));
    }

    #[test]
    fn value_descr_mismatch() {
        let descr = TypeDescr::integer();
        let mut writer = BinaryWriter::new(Vec::new(), Config::default());
        let err = write_object(
            &mut writer, &descr, &Value::Bool(true)
        ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalCall);
    }

    #[test]
    fn multiple_top_level_values() {
        let descr: TypeDescr = ClassDescr::new("One")
            .member("a", TypeDescr::integer())
            .into();
        let first = Value::class([(0, Value::Integer(1))]);
        let second = Value::class([(0, Value::Integer(2))]);

        let mut writer = TextWriter::new(Vec::new(), Config::default());
        write_object(&mut writer, &descr, &first).unwrap();
        write_object(&mut writer, &descr, &second).unwrap();
        let data = writer.finish().unwrap();

        let mut reader = TextReader::new(data.as_slice(), Config::default());
        assert!(!reader.at_end().unwrap());
        assert_eq!(read_object(&mut reader, &descr).unwrap(), first);
        assert_eq!(read_object(&mut reader, &descr).unwrap(), second);
        assert!(reader.at_end().unwrap());
    }
}
