//! Encoding an object into the binary format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::io;
use smallvec::SmallVec;
use crate::descr::{
    ClassDescr, ChoiceDescr, ContainerDescr, EnumDescr, Tagging, TypeDescr,
};
use crate::error::{Error, Pos};
use crate::frame::{Frame, FrameKind, FrameStack};
use crate::length::Length;
use crate::stream::{Config, ObjectWriter};
use crate::tag::Tag;
use crate::value::BitString;
use super::integrity::Integrity;
use super::{compress_bits, verify_class_tagging};


//------------ Override ------------------------------------------------------

/// A tag to be written in place of the next value's natural tag.
#[derive(Clone, Debug)]
enum Override {
    /// A numbered tag, usually a context class member tag.
    ///
    /// Its constructed flag is taken from the replaced natural tag.
    Numbered(Tag),

    /// A named application tag carrying a type name.
    Named(String),
}


//------------ BinaryWriter --------------------------------------------------

/// A writer producing the binary format.
///
/// Constructed values are always written with indefinite length and closed
/// with an end-of-contents marker, so the writer never needs to buffer a
/// value to learn its length first.
pub struct BinaryWriter<W> {
    /// The target the octets go to.
    target: W,

    /// The configuration.
    config: Config,

    /// The currently open frames.
    frames: FrameStack,

    /// A tag replacing the natural tag of the next value.
    override_tag: Option<Override>,

    /// The number of octets written so far.
    pos: u64,

    /// The number of string fixups applied so far.
    warnings: usize,

    /// The octet order tracker.
    integrity: Integrity,
}

impl<W: io::Write> BinaryWriter<W> {
    /// Creates a new writer with the given configuration.
    pub fn new(target: W, config: Config) -> Self {
        Self {
            target,
            config,
            frames: FrameStack::new(),
            override_tag: None,
            pos: 0,
            warnings: 0,
            integrity: Integrity::new(),
        }
    }

    /// Returns the number of string fixup warnings so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Finishes the stream and returns the target.
    ///
    /// Fails if any frame is still open.
    pub fn finish(mut self) -> Result<W, Error> {
        let pos = Pos::Byte(self.pos);
        self.frames.check_closed(pos)?;
        self.integrity.finish();
        self.target.flush().map_err(|err| Error::from_io(err, pos))?;
        Ok(self.target)
    }
}

/// # Low-level octet emission
impl<W: io::Write> BinaryWriter<W> {
    /// Returns the current position for error reporting.
    fn err_pos(&self) -> Pos {
        Pos::Byte(self.pos)
    }

    /// Writes raw octets to the target.
    fn put(&mut self, data: &[u8]) -> Result<(), Error> {
        self.target.write_all(data).map_err(|err| {
            Error::from_io(err, Pos::Byte(self.pos))
        })?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Writes the identifier octets of a tag as is.
    fn put_raw_tag(&mut self, tag: Tag) -> Result<(), Error> {
        let mut buf = [0u8; 6];
        let len = tag.encode(&mut buf);
        self.put(&buf[..len])
    }

    /// Writes the identifier octets for a value with the given natural tag.
    ///
    /// A pending override replaces the natural tag, keeping only its
    /// constructed flag.
    fn put_tag_for(&mut self, natural: Tag) -> Result<(), Error> {
        self.integrity.tag();
        match self.override_tag.take() {
            None => self.put_raw_tag(natural),
            Some(Override::Numbered(tag)) => {
                self.put_raw_tag(tag.to_constructed(natural.constructed))
            }
            Some(Override::Named(name)) => {
                match Tag::named_octets(&name, natural.constructed) {
                    Some(octets) => self.put(&octets),
                    None => {
                        Err(Error::illegal(
                            format!(
                                "type name \"{}\" cannot be encoded", name
                            ),
                            self.err_pos()
                        ))
                    }
                }
            }
        }
    }

    /// Writes the length octets.
    fn put_length(&mut self, length: Length) -> Result<(), Error> {
        self.integrity.length();
        let mut buf = Vec::with_capacity(length.encoded_len());
        length.write(&mut buf).map_err(|err| {
            Error::from_io(err, Pos::Byte(self.pos))
        })?;
        self.put(&buf)
    }

    /// Writes a complete primitive value.
    fn put_primitive(
        &mut self, natural: Tag, content: &[u8]
    ) -> Result<(), Error> {
        self.put_tag_for(natural)?;
        self.put_length(Length::Definite(content.len()))?;
        self.integrity.content();
        self.put(content)
    }

    /// Opens a constructed value with indefinite length.
    fn open_frame(
        &mut self, kind: FrameKind, natural: Tag
    ) -> Result<(), Error> {
        self.put_tag_for(natural)?;
        self.put_length(Length::Indefinite)?;
        self.integrity.open();
        self.frames.push(Frame::indefinite(kind));
        Ok(())
    }

    /// Closes a frame, writing the end-of-contents marker if one is due.
    fn close_frame(&mut self, kind: FrameKind) -> Result<(), Error> {
        if self.override_tag.is_some() {
            return Err(Error::illegal(
                "value was announced but never written", self.err_pos()
            ))
        }
        let frame = self.frames.pop(kind, self.err_pos())?;
        if frame.indefinite {
            self.integrity.tag();
            self.integrity.length();
            self.integrity.content();
            self.put(b"\x00\x00")?;
            self.integrity.close();
        }
        Ok(())
    }
}

/// # Encoding helpers
impl<W: io::Write> BinaryWriter<W> {
    /// Writes a signed integer under the given tag.
    ///
    /// The value takes the smallest two's complement width of one to four
    /// octets; wider values always take eight octets so readers backed by
    /// fixed machine words need only handle the one large width.
    fn put_signed(&mut self, natural: Tag, value: i64) -> Result<(), Error> {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 7 {
            if (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
                || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0)
            {
                start += 1;
            }
            else {
                break
            }
        }
        if (5..=7).contains(&(8 - start)) {
            start = 0;
        }
        self.put_primitive(natural, &bytes[start..])
    }

    /// Writes a visible style string under the given tag.
    fn put_string(&mut self, natural: Tag, value: &str) -> Result<(), Error> {
        let fixup = self.config.fixup;
        let pos = self.err_pos();
        let mut content = Vec::with_capacity(value.len());
        for byte in value.bytes() {
            content.push(fixup.fix(byte, &mut self.warnings, pos)?);
        }
        self.put_primitive(natural, &content)
    }
}

/// # Extensions beyond the core types
impl<W: io::Write> BinaryWriter<W> {
    /// Tags the next value with a type name instead of its natural tag.
    ///
    /// The name must be non-empty printable ASCII. Used for values of
    /// externally defined types whose tag the receiver cannot know.
    pub fn set_type_name(
        &mut self, name: impl Into<String>
    ) -> Result<(), Error> {
        if self.override_tag.is_some() {
            return Err(Error::illegal(
                "a tag override is already pending", self.err_pos()
            ))
        }
        self.override_tag = Some(Override::Named(name.into()));
        Ok(())
    }

    /// Writes an integer in the fixed eight octet encoding.
    pub fn write_long_integer(&mut self, value: i64) -> Result<(), Error> {
        self.put_primitive(Tag::LONG_INTEGER, &value.to_be_bytes())
    }
}

impl<W: io::Write> ObjectWriter for BinaryWriter<W> {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error> {
        if self.config.verify_tagging {
            verify_class_tagging(descr, self.err_pos())?;
        }
        self.open_frame(FrameKind::Class, descr.natural_tag())
    }

    fn begin_member(
        &mut self, descr: &ClassDescr, index: usize
    ) -> Result<(), Error> {
        let number = descr.get(index).tag;
        // A choice has no tag of its own the member tag could replace,
        // so choice members always use a wrapper.
        let explicit = matches!(
            descr.get(index).descr, TypeDescr::Choice(_)
        ) || descr.member_tagging(index) == Tagging::Explicit;
        if explicit {
            self.open_frame(FrameKind::Member, Tag::ctx_constructed(number))
        }
        else {
            self.override_tag = Some(Override::Numbered(Tag::ctx(number)));
            self.frames.push(Frame::plain(FrameKind::Member));
            Ok(())
        }
    }

    fn end_member(
        &mut self, _descr: &ClassDescr, _index: usize
    ) -> Result<(), Error> {
        self.close_frame(FrameKind::Member)
    }

    fn end_class(&mut self, _descr: &ClassDescr) -> Result<(), Error> {
        self.close_frame(FrameKind::Class)
    }

    fn begin_container(
        &mut self, descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.open_frame(FrameKind::Container, descr.natural_tag())
    }

    fn begin_element(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.frames.push(Frame::plain(FrameKind::Element));
        Ok(())
    }

    fn end_element(&mut self, _descr: &ContainerDescr) -> Result<(), Error> {
        self.close_frame(FrameKind::Element)
    }

    fn end_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.close_frame(FrameKind::Container)
    }

    fn begin_variant(
        &mut self, descr: &ChoiceDescr, index: usize
    ) -> Result<(), Error> {
        let number = descr.get(index).tag;
        let explicit = matches!(
            descr.get(index).descr, TypeDescr::Choice(_)
        ) || descr.choice_tagging() == Tagging::Explicit;
        if explicit {
            self.open_frame(FrameKind::Variant, Tag::ctx_constructed(number))
        }
        else {
            self.override_tag = Some(Override::Numbered(Tag::ctx(number)));
            self.frames.push(Frame::plain(FrameKind::Variant));
            Ok(())
        }
    }

    fn end_variant(
        &mut self, _descr: &ChoiceDescr, _index: usize
    ) -> Result<(), Error> {
        self.close_frame(FrameKind::Variant)
    }

    fn write_null(&mut self) -> Result<(), Error> {
        self.put_primitive(Tag::NULL, b"")
    }

    fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.put_primitive(
            Tag::BOOLEAN, if value { b"\xff" } else { b"\x00" }
        )
    }

    fn write_integer(&mut self, value: i64) -> Result<(), Error> {
        self.put_signed(Tag::INTEGER, value)
    }

    fn write_unsigned(&mut self, value: u64) -> Result<(), Error> {
        let bytes = value.to_be_bytes();
        let mut start = 0;
        while start < 7 && bytes[start] == 0 {
            start += 1;
        }
        if (5..=7).contains(&(8 - start)) {
            start = 0;
        }
        let mut content = SmallVec::<[u8; 9]>::new();
        if bytes[start] & 0x80 != 0 {
            // An extra leading octet keeps the sign bit clear.
            content.push(0);
        }
        content.extend_from_slice(&bytes[start..]);
        self.put_primitive(Tag::INTEGER, &content)
    }

    fn write_real(&mut self, value: f64) -> Result<(), Error> {
        if value.is_nan() {
            return self.put_primitive(Tag::REAL, b"\x42")
        }
        if value.is_infinite() {
            return self.put_primitive(
                Tag::REAL,
                if value > 0. { b"\x40" } else { b"\x41" }
            )
        }
        if value == 0. {
            // Canonical zero: the NR2 selector with no digits. A negative
            // zero keeps its sign through the special value octet.
            return self.put_primitive(
                Tag::REAL,
                if value.is_sign_negative() { b"\x43" } else { b"\x02" }
            )
        }
        let digits = self.config.real_precision.max(1);
        let mut content = format!("{:.*E}", digits - 1, value).into_bytes();
        content.insert(0, 0x03);
        self.put_primitive(Tag::REAL, &content)
    }

    fn write_visible(&mut self, value: &str) -> Result<(), Error> {
        self.put_string(Tag::VISIBLE_STRING, value)
    }

    fn write_utf8(&mut self, value: &str) -> Result<(), Error> {
        self.put_primitive(Tag::UTF8_STRING, value.as_bytes())
    }

    fn write_string_store(&mut self, value: &str) -> Result<(), Error> {
        self.put_string(Tag::STRING_STORE, value)
    }

    fn write_octets(&mut self, value: &[u8]) -> Result<(), Error> {
        self.put_primitive(Tag::OCTET_STRING, value)
    }

    fn write_bits(&mut self, value: &BitString) -> Result<(), Error> {
        // The compressed form only works where the reader can tell it
        // apart by tag, so never under a pending override.
        if self.config.compress_bit_strings && self.override_tag.is_none() {
            let content = compress_bits(value);
            return self.put_primitive(Tag::OCTET_STRING, &content)
        }
        let mut content = Vec::with_capacity(value.data().len() + 1);
        content.push(value.unused_bits());
        content.extend_from_slice(value.data());
        self.put_primitive(Tag::BIT_STRING, &content)
    }

    fn write_enum(
        &mut self, descr: &EnumDescr, value: i64
    ) -> Result<(), Error> {
        if !descr.is_open() && descr.by_value(value).is_none() {
            return Err(Error::invalid(
                format!("{} is not a named enumerated value", value),
                self.err_pos()
            ))
        }
        self.put_signed(Tag::ENUMERATED, value)
    }

    fn pos(&self) -> Pos {
        Pos::Byte(self.pos)
    }
}


//============ Tests =========================================================
