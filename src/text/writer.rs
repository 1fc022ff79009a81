//! Encoding an object into the text format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::io;
use crate::descr::{ClassDescr, ChoiceDescr, ContainerDescr, EnumDescr};
use crate::error::{Error, Pos};
use crate::frame::{Frame, FrameKind, FrameStack};
use crate::stream::{Config, ObjectWriter};
use crate::value::BitString;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// How many string bytes go on one line before wrapping.
const STRING_WRAP: usize = 128;


//------------ TextWriter ----------------------------------------------------

/// A writer producing the text format.
///
/// Output is indented two spaces per block level. A named top level value
/// is preceded by a `Name ::=` header.
pub struct TextWriter<W> {
    /// The target the text goes to.
    target: W,

    /// The configuration.
    config: Config,

    /// The currently open frames.
    frames: FrameStack,

    /// The number of open brace blocks, which is the indent level.
    blocks: usize,

    /// Whether anything has been written yet.
    started: bool,

    /// The one-based line the cursor is on.
    line: usize,

    /// The number of string fixups applied so far.
    warnings: usize,
}

impl<W: io::Write> TextWriter<W> {
    /// Creates a new writer with the given configuration.
    pub fn new(target: W, config: Config) -> Self {
        Self {
            target,
            config,
            frames: FrameStack::new(),
            blocks: 0,
            started: false,
            line: 1,
            warnings: 0,
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
        self.frames.check_closed(Pos::Line(self.line))?;
        if self.started {
            self.put("\n")?;
        }
        self.target.flush().map_err(|err| {
            Error::from_io(err, Pos::Line(self.line))
        })?;
        Ok(self.target)
    }
}

/// # Low-level text emission
impl<W: io::Write> TextWriter<W> {
    /// Returns the current position for error reporting.
    fn err_pos(&self) -> Pos {
        Pos::Line(self.line)
    }

    /// Writes raw bytes to the target.
    fn put_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        self.target.write_all(data).map_err(|err| {
            Error::from_io(err, Pos::Line(self.line))
        })?;
        self.line += data.iter().filter(|byte| **byte == b'\n').count();
        Ok(())
    }

    /// Writes a string slice to the target.
    fn put(&mut self, text: &str) -> Result<(), Error> {
        self.put_bytes(text.as_bytes())
    }

    /// Separates a new top level value from the previous one.
    fn top_separator(&mut self) -> Result<(), Error> {
        if self.frames.is_empty() {
            if self.started {
                self.put("\n")?;
            }
            self.started = true;
        }
        Ok(())
    }

    /// Starts a new entry inside the innermost block.
    ///
    /// Writes the comma after the previous entry and the indented fresh
    /// line for the new one.
    fn start_entry(&mut self) -> Result<(), Error> {
        let first = match self.frames.top_mut() {
            Some(frame) => {
                let first = frame.first;
                frame.first = false;
                first
            }
            None => {
                return Err(Error::illegal(
                    "entry outside of a block", self.err_pos()
                ))
            }
        };
        if !first {
            self.put(",")?;
        }
        self.put("\n")?;
        for _ in 0..self.blocks {
            self.put("  ")?;
        }
        Ok(())
    }

    /// Closes the innermost block, writing the closing brace.
    fn close_block(&mut self, kind: FrameKind) -> Result<(), Error> {
        self.frames.pop(kind, self.err_pos())?;
        self.blocks -= 1;
        self.put("\n")?;
        for _ in 0..self.blocks {
            self.put("  ")?;
        }
        self.put("}")
    }

    /// Writes a quoted string, wrapping long content.
    fn put_quoted(&mut self, content: &[u8]) -> Result<(), Error> {
        self.put("\"")?;
        let mut count = 0;
        for byte in content {
            if count >= STRING_WRAP {
                self.put("\n")?;
                count = 0;
            }
            if *byte == b'"' {
                self.put("\"\"")?;
                count += 2;
            }
            else {
                self.put_bytes(&[*byte])?;
                count += 1;
            }
        }
        self.put("\"")
    }

    /// Writes a visible style string with the fixup policy applied.
    fn put_string(&mut self, value: &str) -> Result<(), Error> {
        self.top_separator()?;
        let fixup = self.config.fixup;
        let pos = self.err_pos();
        let mut content = Vec::with_capacity(value.len());
        for byte in value.bytes() {
            content.push(fixup.fix(byte, &mut self.warnings, pos)?);
        }
        self.put_quoted(&content)
    }
}

impl<W: io::Write> ObjectWriter for TextWriter<W> {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error> {
        self.top_separator()?;
        if self.frames.is_empty() {
            self.put(descr.name())?;
            self.put(" ::= {")?;
        }
        else {
            self.put("{")?;
        }
        self.frames.push(Frame::plain(FrameKind::Class));
        self.blocks += 1;
        Ok(())
    }

    fn begin_member(
        &mut self, descr: &ClassDescr, index: usize
    ) -> Result<(), Error> {
        self.start_entry()?;
        self.put(&descr.get(index).name)?;
        self.put(" ")?;
        self.frames.push(Frame::plain(FrameKind::Member));
        Ok(())
    }

    fn end_member(
        &mut self, _descr: &ClassDescr, _index: usize
    ) -> Result<(), Error> {
        self.frames.pop(FrameKind::Member, self.err_pos())?;
        Ok(())
    }

    fn end_class(&mut self, _descr: &ClassDescr) -> Result<(), Error> {
        self.close_block(FrameKind::Class)
    }

    fn begin_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.top_separator()?;
        self.put("{")?;
        self.frames.push(Frame::plain(FrameKind::Container));
        self.blocks += 1;
        Ok(())
    }

    fn begin_element(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.start_entry()?;
        self.frames.push(Frame::plain(FrameKind::Element));
        Ok(())
    }

    fn end_element(&mut self, _descr: &ContainerDescr) -> Result<(), Error> {
        self.frames.pop(FrameKind::Element, self.err_pos())?;
        Ok(())
    }

    fn end_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.close_block(FrameKind::Container)
    }

    fn begin_variant(
        &mut self, descr: &ChoiceDescr, index: usize
    ) -> Result<(), Error> {
        self.top_separator()?;
        if self.frames.is_empty() {
            self.put(descr.name())?;
            self.put(" ::= ")?;
        }
        self.put(&descr.get(index).name)?;
        self.put(" ")?;
        self.frames.push(Frame::plain(FrameKind::Variant));
        Ok(())
    }

    fn end_variant(
        &mut self, _descr: &ChoiceDescr, _index: usize
    ) -> Result<(), Error> {
        self.frames.pop(FrameKind::Variant, self.err_pos())?;
        Ok(())
    }

    fn write_null(&mut self) -> Result<(), Error> {
        self.top_separator()?;
        self.put("NULL")
    }

    fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.top_separator()?;
        self.put(if value { "TRUE" } else { "FALSE" })
    }

    fn write_integer(&mut self, value: i64) -> Result<(), Error> {
        self.top_separator()?;
        self.put(&value.to_string())
    }

    fn write_unsigned(&mut self, value: u64) -> Result<(), Error> {
        self.top_separator()?;
        self.put(&value.to_string())
    }

    fn write_real(&mut self, value: f64) -> Result<(), Error> {
        self.top_separator()?;
        if value.is_nan() {
            return self.put("NOT-A-NUMBER")
        }
        if value.is_infinite() {
            return self.put(
                if value > 0. { "PLUS-INFINITY" } else { "MINUS-INFINITY" }
            )
        }
        if value == 0. {
            return self.put("{ 0, 10, 0 }")
        }
        let (mantissa, exponent) = decimal_parts(
            value.abs(), self.config.real_precision
        );
        self.put(&format!(
            "{{ {}{}, 10, {} }}",
            if value < 0. { "-" } else { "" }, mantissa, exponent
        ))
    }

    fn write_visible(&mut self, value: &str) -> Result<(), Error> {
        self.put_string(value)
    }

    fn write_utf8(&mut self, value: &str) -> Result<(), Error> {
        self.top_separator()?;
        self.put_quoted(value.as_bytes())
    }

    fn write_string_store(&mut self, value: &str) -> Result<(), Error> {
        self.put_string(value)
    }

    fn write_octets(&mut self, value: &[u8]) -> Result<(), Error> {
        self.top_separator()?;
        let mut text = String::with_capacity(value.len() * 2 + 3);
        text.push('\'');
        for byte in value {
            text.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            text.push(char::from(HEX_DIGITS[usize::from(byte & 0x0F)]));
        }
        text.push_str("'H");
        self.put(&text)
    }

    fn write_bits(&mut self, value: &BitString) -> Result<(), Error> {
        self.top_separator()?;
        let mut text = String::with_capacity(value.bit_len() + 3);
        text.push('\'');
        for bit in value.iter() {
            text.push(if bit { '1' } else { '0' });
        }
        text.push_str("'B");
        self.put(&text)
    }

    fn write_enum(
        &mut self, descr: &EnumDescr, value: i64
    ) -> Result<(), Error> {
        self.top_separator()?;
        match descr.by_value(value) {
            Some(name) => self.put(name),
            None if descr.is_open() => self.put(&value.to_string()),
            None => {
                Err(Error::invalid(
                    format!("{} is not a named enumerated value", value),
                    self.err_pos()
                ))
            }
        }
    }

    fn pos(&self) -> Pos {
        Pos::Line(self.line)
    }
}


//------------ decimal_parts -------------------------------------------------

/// Splits a positive finite value into a decimal mantissa and exponent.
///
/// The mantissa has at most `digits` significant digits with trailing
/// zeros removed.
fn decimal_parts(value: f64, digits: usize) -> (u64, i32) {
    let text = format!("{:.*E}", digits.max(1) - 1, value);
    let mut mantissa: u64 = 0;
    let mut exponent: i32 = 0;
    let mut fraction_digits = 0;
    let mut in_fraction = false;
    let mut in_exponent = false;
    let mut exponent_negative = false;
    for ch in text.chars() {
        match ch {
            '0'..='9' if in_exponent => {
                exponent = exponent * 10 + (ch as i32 - '0' as i32);
            }
            '0'..='9' => {
                mantissa = mantissa * 10 + u64::from(ch as u8 - b'0');
                if in_fraction {
                    fraction_digits += 1;
                }
            }
            '.' => in_fraction = true,
            'E' => in_exponent = true,
            '-' => exponent_negative = true,
            _ => { }
        }
    }
    if exponent_negative {
        exponent = -exponent;
    }
    while mantissa != 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        fraction_digits -= 1;
    }
    (mantissa, exponent - fraction_digits)
}


//============ Tests =========================================================
