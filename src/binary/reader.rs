//! Decoding an object from the binary format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::{io, str};
use bytes::Bytes;
use crate::descr::{
    ClassDescr, ChoiceDescr, ContainerDescr, EnumDescr, Tagging, TypeDescr,
};
use crate::error::{Error, Pos};
use crate::frame::{Frame, FrameKind, FrameStack};
use crate::length::Length;
use crate::source::Source;
use crate::stream::{Config, ObjectReader};
use crate::tag::{Class, Tag};
use crate::value::BitString;
use super::integrity::Integrity;
use super::{decompress_bits, verify_class_tagging};


//------------ BinaryReader --------------------------------------------------

/// A reader consuming the binary format.
///
/// Constructed values may use either definite or indefinite lengths. A
/// definite length is checked against the enclosing frames when read, so
/// a value claiming to extend past its parent is rejected before any of
/// its content is consumed.
pub struct BinaryReader<R> {
    /// The cursor over the input.
    source: Source<R>,

    /// The configuration.
    config: Config,

    /// The currently open frames.
    frames: FrameStack,

    /// A consumed wrapper tag standing in for the next value's tag.
    ///
    /// Set when an implicitly tagged member or variant has been entered:
    /// the wrapper tag has replaced the value's natural tag on the wire,
    /// so the next tag expectation is satisfied by this instead.
    replaced: Option<Tag>,

    /// The number of string fixups applied so far.
    warnings: usize,

    /// The octet order tracker.
    integrity: Integrity,
}

impl<R: io::Read> BinaryReader<R> {
    /// Creates a new reader with the given configuration.
    pub fn new(reader: R, config: Config) -> Self {
        Self {
            source: Source::new(reader),
            config,
            frames: FrameStack::new(),
            replaced: None,
            warnings: 0,
            integrity: Integrity::new(),
        }
    }

    /// Returns the number of string fixup warnings so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Peeks at the tag of the next top level value.
    ///
    /// Returns `None` if the input has cleanly ended. May only be called
    /// between top level values.
    pub fn probe(&mut self) -> Result<Option<Tag>, Error> {
        if !self.frames.is_empty() {
            return Err(Error::illegal(
                "probing inside an open value", self.source.pos()
            ))
        }
        if self.source.peek_opt(0)?.is_none() {
            return Ok(None)
        }
        Ok(Some(Tag::peek(&mut self.source)?.0))
    }

    /// Finishes the stream.
    ///
    /// Fails if any frame is still open.
    pub fn finish(self) -> Result<(), Error> {
        self.frames.check_closed(self.source.pos())?;
        self.integrity.finish();
        Ok(())
    }
}

/// # Low-level octet consumption
impl<R: io::Read> BinaryReader<R> {
    /// Consumes the tag of the next value which must match `natural`.
    ///
    /// If a wrapper tag has replaced the natural tag, only the constructed
    /// flag can still be checked.
    fn expect_tag(&mut self, natural: Tag) -> Result<(), Error> {
        let pos = self.source.pos();
        if let Some(tag) = self.replaced.take() {
            if tag.constructed != natural.constructed {
                return Err(Error::format(
                    format!(
                        "expected {} encoding for {}",
                        if natural.constructed { "constructed" }
                        else { "primitive" },
                        natural
                    ),
                    pos
                ))
            }
            return Ok(())
        }
        self.integrity.tag();
        let tag = Tag::read(&mut self.source)?;
        if tag != natural {
            return Err(Error::format(
                format!("expected {}, found {}", natural, tag), pos
            ))
        }
        Ok(())
    }

    /// Reads the length octets of the next value.
    ///
    /// A definite length claiming more octets than any enclosing frame
    /// has left is rejected right here.
    fn read_length(&mut self) -> Result<Length, Error> {
        let pos = self.source.pos();
        self.integrity.length();
        let length = Length::read(&mut self.source)?;
        if let Length::Definite(len) = length {
            if let Some(limit) = self.frames.limit() {
                if self.source.byte_pos() + len as u64 > limit {
                    return Err(Error::overflow(
                        "value extends past its enclosing value", pos
                    ))
                }
            }
        }
        Ok(length)
    }

    /// Reads the content octets of a primitive value.
    ///
    /// The tag must already have been consumed.
    fn read_content(&mut self) -> Result<Vec<u8>, Error> {
        let pos = self.source.pos();
        let length = self.read_length()?;
        match length.definite() {
            Some(len) => {
                let mut buf = vec![0; len];
                self.source.read_exact(&mut buf)?;
                self.integrity.content();
                Ok(buf)
            }
            None => {
                Err(Error::format(
                    "primitive value with indefinite length", pos
                ))
            }
        }
    }

    /// Consumes an end-of-contents marker.
    fn take_eoc(&mut self) -> Result<(), Error> {
        let pos = self.source.pos();
        self.integrity.tag();
        let tag = Tag::read(&mut self.source)?;
        if !tag.is_end_of_contents() {
            return Err(Error::format(
                format!("expected end-of-contents, found {}", tag), pos
            ))
        }
        self.integrity.length();
        if Length::read(&mut self.source)? != Length::Definite(0) {
            return Err(Error::format(
                "end-of-contents with content octets", pos
            ))
        }
        self.integrity.content();
        Ok(())
    }

    /// Opens a frame for a constructed value whose length was just read.
    fn push_frame(&mut self, kind: FrameKind, length: Length) {
        self.integrity.open();
        match length {
            Length::Definite(len) => {
                self.frames.push(Frame::definite(
                    kind, self.source.byte_pos() + len as u64
                ));
            }
            Length::Indefinite => {
                self.frames.push(Frame::indefinite(kind));
            }
        }
    }

    /// Returns whether the innermost frame's content is exhausted.
    ///
    /// For an indefinite frame the end-of-contents marker is detected but
    /// not consumed.
    fn at_frame_end(&mut self) -> Result<bool, Error> {
        let frame = match self.frames.top() {
            Some(frame) => *frame,
            None => {
                return Err(Error::illegal(
                    "no open frame", self.source.pos()
                ))
            }
        };
        if frame.indefinite {
            Ok(Tag::peek(&mut self.source)?.0.is_end_of_contents())
        }
        else if let Some(limit) = frame.limit {
            Ok(self.source.byte_pos() >= limit)
        }
        else {
            Ok(false)
        }
    }

    /// Closes a frame, consuming the end-of-contents marker if one is due.
    fn close_frame(&mut self, kind: FrameKind) -> Result<(), Error> {
        if self.replaced.is_some() {
            return Err(Error::illegal(
                "value was announced but never read", self.source.pos()
            ))
        }
        let frame = self.frames.pop(kind, self.source.pos())?;
        if frame.indefinite {
            self.take_eoc()?;
            self.integrity.close();
        }
        else if let Some(limit) = frame.limit {
            if self.source.byte_pos() != limit {
                return Err(Error::format(
                    "constructed value not fully consumed",
                    self.source.pos()
                ))
            }
            self.integrity.close();
        }
        Ok(())
    }

    /// Skips over one complete value at the cursor.
    fn skip_value(&mut self) -> Result<(), Error> {
        let pos = self.source.pos();
        self.integrity.tag();
        let tag = Tag::read(&mut self.source)?;
        let length = self.read_length()?;
        match length {
            Length::Definite(len) => {
                self.source.skip(len)?;
                self.integrity.content();
            }
            Length::Indefinite => {
                if !tag.constructed {
                    return Err(Error::format(
                        "primitive value with indefinite length", pos
                    ))
                }
                self.integrity.open();
                loop {
                    if Tag::peek(
                        &mut self.source
                    )?.0.is_end_of_contents() {
                        self.take_eoc()?;
                        self.integrity.close();
                        break
                    }
                    self.skip_value()?;
                }
            }
        }
        Ok(())
    }

    /// Consumes a context tag that selects a member or variant.
    ///
    /// For an explicitly tagged entry the wrapper's length is read and a
    /// frame of the given kind opened; for an implicitly tagged one the
    /// tag is left standing in for the value's natural tag.
    fn enter_tagged(
        &mut self, kind: FrameKind, explicit: bool
    ) -> Result<(), Error> {
        let pos = self.source.pos();
        self.integrity.tag();
        let tag = Tag::read(&mut self.source)?;
        if explicit {
            if !tag.constructed {
                return Err(Error::format(
                    "explicitly tagged value must be constructed", pos
                ))
            }
            let length = self.read_length()?;
            self.push_frame(kind, length);
        }
        else {
            self.replaced = Some(tag);
            self.frames.push(Frame::plain(kind));
        }
        Ok(())
    }

    /// Reads the string content of a visible style value.
    fn take_string(&mut self) -> Result<String, Error> {
        let pos = self.source.pos();
        let content = self.read_content()?;
        let fixup = self.config.fixup;
        let mut res = String::with_capacity(content.len());
        for byte in content {
            res.push(char::from(
                fixup.fix(byte, &mut self.warnings, pos)?
            ));
        }
        Ok(res)
    }
}

/// # Extensions beyond the core types
impl<R: io::Read> BinaryReader<R> {
    /// Reads a named type tag, leaving it standing in for the value's tag.
    ///
    /// Returns the type name. The value itself is read with the regular
    /// methods afterwards.
    pub fn read_type_name(&mut self) -> Result<String, Error> {
        if self.replaced.is_some() {
            return Err(Error::illegal(
                "a tag is already standing in", self.source.pos()
            ))
        }
        self.integrity.tag();
        let (name, constructed) = Tag::read_named(&mut self.source)?;
        self.replaced = Some(Tag::new(Class::Application, constructed, 0));
        Ok(name)
    }

    /// Reads an integer in the fixed eight octet encoding.
    pub fn read_long_integer(&mut self) -> Result<i64, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::LONG_INTEGER)?;
        let content = self.read_content()?;
        let bytes: [u8; 8] = match content.as_slice().try_into() {
            Ok(bytes) => bytes,
            Err(_) => {
                return Err(Error::invalid(
                    "long integer must have eight content octets", pos
                ))
            }
        };
        Ok(i64::from_be_bytes(bytes))
    }
}

impl<R: io::Read> ObjectReader for BinaryReader<R> {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error> {
        if self.config.verify_tagging {
            verify_class_tagging(descr, self.source.pos())?;
        }
        self.expect_tag(descr.natural_tag())?;
        let length = self.read_length()?;
        self.push_frame(FrameKind::Class, length);
        Ok(())
    }

    fn next_member(
        &mut self, descr: &ClassDescr
    ) -> Result<Option<usize>, Error> {
        loop {
            if self.at_frame_end()? {
                return Ok(None)
            }
            let pos = self.source.pos();
            let (tag, _) = Tag::peek(&mut self.source)?;
            let index = if tag.class == Class::Context {
                descr.index_by_tag(tag.number)
            }
            else {
                None
            };
            let index = match index {
                Some(index) => index,
                None => {
                    if self.config.skip_unknown {
                        self.skip_value()?;
                        continue
                    }
                    return Err(Error::format(
                        format!(
                            "unexpected member {} of {}, \
                             expected one of: {}",
                            tag, descr.name(), descr.member_names()
                        ),
                        pos
                    ))
                }
            };
            // A choice has no tag of its own the member tag could
            // replace, so choice members always use a wrapper.
            let explicit = matches!(
                descr.get(index).descr, TypeDescr::Choice(_)
            ) || descr.member_tagging(index) == Tagging::Explicit;
            self.enter_tagged(FrameKind::Member, explicit)?;
            return Ok(Some(index))
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
        self.expect_tag(descr.natural_tag())?;
        let length = self.read_length()?;
        self.push_frame(FrameKind::Container, length);
        Ok(())
    }

    fn next_element(
        &mut self, _descr: &ContainerDescr
    ) -> Result<bool, Error> {
        if self.at_frame_end()? {
            return Ok(false)
        }
        self.frames.push(Frame::plain(FrameKind::Element));
        Ok(true)
    }

    fn end_element(&mut self, _descr: &ContainerDescr) -> Result<(), Error> {
        self.close_frame(FrameKind::Element)
    }

    fn end_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.close_frame(FrameKind::Container)
    }

    fn begin_variant(&mut self, descr: &ChoiceDescr) -> Result<usize, Error> {
        if self.replaced.is_some() {
            return Err(Error::illegal(
                "a choice cannot be implicitly tagged", self.source.pos()
            ))
        }
        let pos = self.source.pos();
        let (tag, _) = Tag::peek(&mut self.source)?;
        if tag.class != Class::Context {
            return Err(Error::format(
                format!(
                    "expected variant tag of {}, found {}",
                    descr.name(), tag
                ),
                pos
            ))
        }
        let index = match descr.index_by_tag(tag.number) {
            Some(index) => index,
            None => {
                return Err(Error::format(
                    format!(
                        "unknown variant [{}] of {}, expected one of: {}",
                        tag.number, descr.name(), descr.variant_names()
                    ),
                    pos
                ))
            }
        };
        let explicit = matches!(
            descr.get(index).descr, TypeDescr::Choice(_)
        ) || descr.choice_tagging() == Tagging::Explicit;
        self.enter_tagged(FrameKind::Variant, explicit)?;
        Ok(index)
    }

    fn end_variant(
        &mut self, _descr: &ChoiceDescr, _index: usize
    ) -> Result<(), Error> {
        self.close_frame(FrameKind::Variant)
    }

    fn read_null(&mut self) -> Result<(), Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::NULL)?;
        if !self.read_content()?.is_empty() {
            return Err(Error::invalid("NULL with content octets", pos))
        }
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::BOOLEAN)?;
        let content = self.read_content()?;
        if content.len() != 1 {
            return Err(Error::invalid(
                "boolean must have one content octet", pos
            ))
        }
        Ok(content[0] != 0)
    }

    fn read_integer(&mut self) -> Result<i64, Error> {
        if self.replaced.is_none()
            && Tag::peek(&mut self.source)?.0 == Tag::LONG_INTEGER
        {
            return self.read_long_integer()
        }
        let pos = self.source.pos();
        self.expect_tag(Tag::INTEGER)?;
        let content = self.read_content()?;
        signed_from_bytes(&content, pos)
    }

    fn read_unsigned(&mut self) -> Result<u64, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::INTEGER)?;
        let content = self.read_content()?;
        unsigned_from_bytes(&content, pos)
    }

    fn read_real(&mut self) -> Result<f64, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::REAL)?;
        let content = self.read_content()?;
        parse_real(&content, pos)
    }

    fn read_visible(&mut self) -> Result<String, Error> {
        // GeneralString content is treated like VisibleString content.
        if self.replaced.is_none()
            && Tag::peek(&mut self.source)?.0 == Tag::GENERAL_STRING
        {
            self.expect_tag(Tag::GENERAL_STRING)?;
            return self.take_string()
        }
        self.expect_tag(Tag::VISIBLE_STRING)?;
        self.take_string()
    }

    fn read_utf8(&mut self) -> Result<String, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::UTF8_STRING)?;
        let content = self.read_content()?;
        String::from_utf8(content).map_err(|_| {
            Error::invalid("UTF8 string with malformed content", pos)
        })
    }

    fn read_string_store(&mut self) -> Result<String, Error> {
        self.expect_tag(Tag::STRING_STORE)?;
        self.take_string()
    }

    fn read_octets(&mut self) -> Result<Bytes, Error> {
        self.expect_tag(Tag::OCTET_STRING)?;
        Ok(self.read_content()?.into())
    }

    fn read_bits(&mut self) -> Result<BitString, Error> {
        let pos = self.source.pos();
        // A bit string under the OCTET STRING tag is the compressed form.
        // Behind a replaced tag the distinction is lost and the padded
        // form is assumed.
        if self.replaced.is_none()
            && Tag::peek(&mut self.source)?.0 == Tag::OCTET_STRING
        {
            self.expect_tag(Tag::OCTET_STRING)?;
            let content = self.read_content()?;
            return decompress_bits(&content, pos)
        }
        self.expect_tag(Tag::BIT_STRING)?;
        let content = self.read_content()?;
        let (unused, data) = match content.split_first() {
            Some(split) => split,
            None => {
                return Err(Error::invalid(
                    "bit string without content octets", pos
                ))
            }
        };
        let unused = usize::from(*unused);
        if unused > 7 || (data.is_empty() && unused != 0) {
            return Err(Error::invalid(
                "bit string with bad unused bit count", pos
            ))
        }
        let bit_len = data.len() * 8 - unused;
        Ok(BitString::new(Bytes::from(content).slice(1..), bit_len))
    }

    fn read_enum(&mut self, descr: &EnumDescr) -> Result<i64, Error> {
        let pos = self.source.pos();
        self.expect_tag(Tag::ENUMERATED)?;
        let content = self.read_content()?;
        let value = signed_from_bytes(&content, pos)?;
        if !descr.is_open() && descr.by_value(value).is_none() {
            return Err(Error::invalid(
                format!("unknown enumerated value {}", value), pos
            ))
        }
        Ok(value)
    }

    fn pos(&self) -> Pos {
        self.source.pos()
    }
}


//------------ Content decoding ----------------------------------------------

/// Decodes a two's complement integer from content octets.
fn signed_from_bytes(content: &[u8], pos: Pos) -> Result<i64, Error> {
    let first = match content.first() {
        Some(first) => *first,
        None => {
            return Err(Error::invalid(
                "integer without content octets", pos
            ))
        }
    };
    if content.len() > 8 {
        return Err(Error::overflow("integer value too large", pos))
    }
    let mut res: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    for byte in content {
        res = (res << 8) | i64::from(*byte);
    }
    Ok(res)
}

/// Decodes an unsigned integer from content octets.
fn unsigned_from_bytes(content: &[u8], pos: Pos) -> Result<u64, Error> {
    if content.is_empty() {
        return Err(Error::invalid("integer without content octets", pos))
    }
    // A set top bit without a leading zero octet encodes a negative value.
    if content[0] & 0x80 != 0 {
        return Err(Error::invalid(
            "negative value for unsigned integer", pos
        ))
    }
    let mut content = content;
    while content.len() > 1 && content[0] == 0 {
        content = &content[1..];
    }
    if content.len() > 8 {
        return Err(Error::overflow("integer value too large", pos))
    }
    let mut res: u64 = 0;
    for byte in content {
        res = (res << 8) | u64::from(*byte);
    }
    Ok(res)
}

/// Decodes a real value from content octets.
///
/// Only the decimal encodings and the special value octets are supported.
/// Empty content is the canonical zero.
fn parse_real(content: &[u8], pos: Pos) -> Result<f64, Error> {
    let (first, rest) = match content.split_first() {
        Some(split) => split,
        None => return Ok(0.),
    };
    match *first {
        0x01 | 0x02 | 0x03 => { }
        0x40 | 0x41 | 0x42 | 0x43 => {
            if !rest.is_empty() {
                return Err(Error::invalid(
                    "special real value with trailing octets", pos
                ))
            }
            return Ok(match *first {
                0x40 => f64::INFINITY,
                0x41 => f64::NEG_INFINITY,
                0x42 => f64::NAN,
                _ => -0.,
            })
        }
        _ => {
            return Err(Error::invalid("unsupported real encoding", pos))
        }
    }
    let text = str::from_utf8(rest).map_err(|_| {
        Error::invalid("malformed numeric string in real value", pos)
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.)
    }
    text.parse::<f64>().map_err(|_| {
        Error::invalid("malformed numeric string in real value", pos)
    })
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::binary::writer::BinaryWriter;
    use crate::error::ErrorKind;
    use crate::stream::ObjectWriter;
    use super::*;

    fn reader(data: &[u8]) -> BinaryReader<&[u8]> {
        BinaryReader::new(data, Config::default())
    }

    #[test]
    fn integers() {
        assert_eq!(reader(b"\x02\x01\x00").read_integer().unwrap(), 0);
        assert_eq!(
            reader(b"\x02\x02\x01\x2c").read_integer().unwrap(), 300
        );
        assert_eq!(reader(b"\x02\x01\xff").read_integer().unwrap(), -1);
        assert_eq!(
            reader(b"\x02\x02\x7f\xff").read_integer().unwrap(), 32767
        );
        assert_eq!(
            reader(b"\x02\x02\x80\x00").read_integer().unwrap(), -32768
        );
        assert_eq!(
            reader(b"\x02\x03\x00\x80\x00").read_integer().unwrap(), 32768
        );
        assert_eq!(
            reader(b"\x02\x04\x7f\xff\xff\xff").read_integer().unwrap(),
            i64::from(i32::MAX)
        );
        assert_eq!(
            reader(b"\x02\x08\x7f\xff\xff\xff\xff\xff\xff\xff")
                .read_integer().unwrap(),
            i64::MAX
        );
        assert_eq!(
            reader(b"\x02\x08\x80\x00\x00\x00\x00\x00\x00\x00")
                .read_integer().unwrap(),
            i64::MIN
        );
        assert_eq!(
            reader(b"\x02\x09\x00\x00\x00\x00\x00\x00\x00\x00\x01")
                .read_integer().unwrap_err().kind(),
            ErrorKind::Overflow
        );
        assert_eq!(
            reader(b"\x02\x00").read_integer().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        // The fixed eight octet form is accepted in place of INTEGER.
        assert_eq!(
            reader(b"\x42\x08\x00\x00\x00\x00\x00\x00\x01\x2c")
                .read_integer().unwrap(),
            300
        );
    }

    #[test]
    fn unsigned() {
        assert_eq!(
            reader(b"\x02\x02\x00\x80").read_unsigned().unwrap(), 128
        );
        assert_eq!(
            reader(b"\x02\x03\x00\x80\x00").read_unsigned().unwrap(), 32768
        );
        // Content with a set top bit encodes a negative value.
        assert_eq!(
            reader(b"\x02\x01\xff").read_unsigned().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader(b"\x02\x02\x80\x00").read_unsigned().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader(b"\x02\x09\x00\xff\xff\xff\xff\xff\xff\xff\xff")
                .read_unsigned().unwrap(),
            u64::MAX
        );
        assert_eq!(
            reader(b"\x02\x09\x01\x00\x00\x00\x00\x00\x00\x00\x00")
                .read_unsigned().unwrap_err().kind(),
            ErrorKind::Overflow
        );
    }

    #[test]
    fn booleans_and_null() {
        assert!(reader(b"\x01\x01\xff").read_bool().unwrap());
        assert!(!reader(b"\x01\x01\x00").read_bool().unwrap());
        assert!(reader(b"\x01\x01\x01").read_bool().unwrap());
        assert_eq!(
            reader(b"\x01\x02\x00\x00").read_bool().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        reader(b"\x05\x00").read_null().unwrap();
        assert_eq!(
            reader(b"\x05\x01\x00").read_null().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn reals() {
        assert_eq!(reader(b"\x09\x00").read_real().unwrap(), 0.);
        assert_eq!(reader(b"\x09\x01\x02").read_real().unwrap(), 0.);
        assert_eq!(
            reader(b"\x09\x01\x40").read_real().unwrap(), f64::INFINITY
        );
        assert_eq!(
            reader(b"\x09\x01\x41").read_real().unwrap(),
            f64::NEG_INFINITY
        );
        assert!(reader(b"\x09\x01\x42").read_real().unwrap().is_nan());
        assert!(
            reader(b"\x09\x01\x43").read_real().unwrap().is_sign_negative()
        );
        assert_eq!(reader(b"\x09\x04\x01300").read_real().unwrap(), 300.);
        assert_eq!(reader(b"\x09\x05\x023.25").read_real().unwrap(), 3.25);
        assert_eq!(
            reader(b"\x09\x07\x031.50E2").read_real().unwrap(), 150.
        );
        assert_eq!(
            reader(b"\x09\x03\x03xy").read_real().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader(b"\x09\x02\x08\x00").read_real().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            reader(b"\x1a\x03abc").read_visible().unwrap(), "abc"
        );
        // GeneralString reads as a visible string.
        assert_eq!(
            reader(b"\x1b\x03abc").read_visible().unwrap(), "abc"
        );
        assert_eq!(
            reader(b"\x41\x01x").read_string_store().unwrap(), "x"
        );
        assert_eq!(
            reader(b"\x0c\x02\xc3\xa4").read_utf8().unwrap(), "ä"
        );
        assert_eq!(
            reader(b"\x0c\x01\xc3").read_utf8().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader(b"\x04\x02\x00\xff").read_octets().unwrap().as_ref(),
            b"\x00\xff"
        );
    }

    #[test]
    fn string_fixup_warnings() {
        let mut reader = reader(b"\x1a\x03a\x07b");
        assert_eq!(reader.read_visible().unwrap(), "a#b");
        assert_eq!(reader.warnings(), 1);
    }

    #[test]
    fn bit_strings() {
        let bits = reader(b"\x03\x02\x05\xa0").read_bits().unwrap();
        assert_eq!(bits.bit_len(), 3);
        assert!(bits.bit(0) && !bits.bit(1) && bits.bit(2));
        // The compressed form under the OCTET STRING tag.
        let bits = reader(
            b"\x04\x05\x03\x00\x01\x01\x01"
        ).read_bits().unwrap();
        assert_eq!(
            bits.iter().collect::<Vec<_>>(), [true, false, true]
        );
        assert_eq!(
            reader(b"\x03\x00").read_bits().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader(b"\x03\x02\x08\xa0").read_bits().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }

    #[test]
    fn enums() {
        let descr = EnumDescr::new([("a", 0), ("b", 4)], false);
        let mut rdr = reader(b"\x0a\x01\x04");
        assert_eq!(rdr.read_enum(&descr).unwrap(), 4);
        assert_eq!(
            reader(b"\x0a\x01\x03").read_enum(&descr).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        let open = EnumDescr::new([("a", 0)], true);
        assert_eq!(reader(b"\x0a\x01\x63").read_enum(&open).unwrap(), 99);
    }

    #[test]
    fn definite_class() {
        let descr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .member("b", TypeDescr::visible_string());
        let mut rdr = reader(b"\x30\x08\x80\x02\x01\x2c\x81\x02hi");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 300);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(1));
        assert_eq!(rdr.read_visible().unwrap(), "hi");
        rdr.end_member(&descr, 1).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
        rdr.finish().unwrap();
    }

    #[test]
    fn indefinite_class_round_trip() {
        let descr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .optional_member("b", TypeDescr::visible_string());
        let mut writer = BinaryWriter::new(Vec::new(), Config::default());
        writer.begin_class(&descr).unwrap();
        writer.begin_member(&descr, 0).unwrap();
        writer.write_integer(-7).unwrap();
        writer.end_member(&descr, 0).unwrap();
        writer.end_class(&descr).unwrap();
        let data = writer.finish().unwrap();

        let mut rdr = reader(&data);
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), -7);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn explicit_member() {
        let descr = ClassDescr::new("One")
            .tagging(Tagging::Explicit)
            .member("a", TypeDescr::integer());
        let mut rdr = reader(
            b"\x30\x80\xa0\x80\x02\x01\x01\x00\x00\x00\x00"
        );
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 1);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn unknown_member() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        // Member [1] is not part of the descriptor.
        let data = b"\x30\x08\x80\x01\x05\x81\x03abc";
        let mut rdr = reader(data);
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 5);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(
            rdr.next_member(&descr).unwrap_err().kind(), ErrorKind::Format
        );

        let mut rdr = BinaryReader::new(
            data.as_slice(),
            Config { skip_unknown: true, ..Default::default() }
        );
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 5);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn variants() {
        let descr = ChoiceDescr::new("IntOrStr")
            .variant("int", TypeDescr::integer())
            .variant("str", TypeDescr::visible_string());
        let mut rdr = reader(b"\x81\x01x");
        assert_eq!(rdr.begin_variant(&descr).unwrap(), 1);
        assert_eq!(rdr.read_visible().unwrap(), "x");
        rdr.end_variant(&descr, 1).unwrap();
        rdr.finish().unwrap();

        assert_eq!(
            reader(b"\x83\x01x").begin_variant(&descr).unwrap_err().kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn containers() {
        let descr = ContainerDescr::sequence_of(TypeDescr::integer());
        let mut rdr = reader(b"\x30\x06\x02\x01\x01\x02\x01\x02");
        rdr.begin_container(&descr).unwrap();
        let mut values = Vec::new();
        while rdr.next_element(&descr).unwrap() {
            values.push(rdr.read_integer().unwrap());
            rdr.end_element(&descr).unwrap();
        }
        rdr.end_container(&descr).unwrap();
        assert_eq!(values, [1, 2]);
    }

    #[test]
    fn oversized_member() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        // The member claims four octets inside a three octet class.
        let mut rdr = reader(b"\x30\x03\x80\x04\x01");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(
            rdr.read_integer().unwrap_err().kind(), ErrorKind::Overflow
        );
    }

    #[test]
    fn truncated_class() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let mut rdr = reader(b"\x30\x80\x80\x01\x05");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 5);
        rdr.end_member(&descr, 0).unwrap();
        // The end-of-contents marker is missing.
        assert_eq!(
            rdr.next_member(&descr).unwrap_err().kind(),
            ErrorKind::EndOfData
        );
    }

    #[test]
    fn named_tag() {
        let mut writer = BinaryWriter::new(Vec::new(), Config::default());
        writer.set_type_name("Date").unwrap();
        writer.write_visible("1999").unwrap();
        let data = writer.finish().unwrap();

        let mut rdr = reader(&data);
        assert_eq!(rdr.read_type_name().unwrap(), "Date");
        assert_eq!(rdr.read_visible().unwrap(), "1999");
        rdr.finish().unwrap();
    }

    #[test]
    fn probe() {
        let mut rdr = reader(b"\x02\x01\x2a");
        assert_eq!(rdr.probe().unwrap(), Some(Tag::INTEGER));
        assert_eq!(rdr.read_integer().unwrap(), 42);
        assert_eq!(rdr.probe().unwrap(), None);
    }

    #[test]
    fn wrong_tag() {
        let err = reader(b"\x02\x01\x2a").read_bool().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.pos(), Pos::Byte(0));
    }
}
