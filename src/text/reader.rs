//! Decoding an object from the text format.
//!
//! This is a private module. Its public items are re-exported by the crate
//! root.

use std::io;
use bytes::Bytes;
use crate::descr::{ClassDescr, ChoiceDescr, ContainerDescr, EnumDescr};
use crate::error::{Error, Pos};
use crate::frame::{Frame, FrameKind, FrameStack};
use crate::stream::{Config, ObjectReader};
use crate::value::BitString;
use super::lex::{Lexer, Token};


//------------ TextReader ----------------------------------------------------

/// A reader consuming the text format.
///
/// Members and variants are resolved by their labels; a bracketed number
/// is accepted in place of a label and resolved through the member tag
/// numbers. Errors report the line they were discovered on.
pub struct TextReader<R> {
    /// The tokenizer over the input.
    lex: Lexer<R>,

    /// The configuration.
    config: Config,

    /// The currently open frames.
    frames: FrameStack,

    /// The number of string fixups applied so far.
    warnings: usize,
}

impl<R: io::Read> TextReader<R> {
    /// Creates a new reader with the given configuration.
    pub fn new(reader: R, config: Config) -> Self {
        Self {
            lex: Lexer::new(reader),
            config,
            frames: FrameStack::new(),
            warnings: 0,
        }
    }

    /// Returns the number of string fixup warnings so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Returns whether the input has cleanly ended.
    ///
    /// May only be called between top level values.
    pub fn at_end(&mut self) -> Result<bool, Error> {
        if !self.frames.is_empty() {
            return Err(Error::illegal(
                "probing inside an open value", self.lex.pos()
            ))
        }
        Ok(self.lex.peek()?.is_none())
    }

    /// Finishes the stream.
    ///
    /// Fails if any frame is still open.
    pub fn finish(self) -> Result<(), Error> {
        self.frames.check_closed(self.lex.pos())
    }
}

/// # Parsing helpers
impl<R: io::Read> TextReader<R> {
    /// Consumes the next token which must equal the expected one.
    fn expect(&mut self, expected: Token) -> Result<(), Error> {
        let pos = self.lex.pos();
        let token = self.lex.next()?;
        if token != expected {
            return Err(Error::format(
                format!("expected {}, found {}", expected, token), pos
            ))
        }
        Ok(())
    }

    /// Consumes a `Name ::=` header in front of a top level value.
    ///
    /// Nothing is consumed if the value starts without a header.
    fn take_top_header(&mut self, name: &str) -> Result<(), Error> {
        if !self.frames.is_empty() {
            return Ok(())
        }
        let matches = matches!(
            self.lex.peek()?, Some(Token::Ident(ident)) if ident == name
        );
        if matches {
            self.lex.next()?;
            self.expect(Token::DefinedAs)?;
        }
        Ok(())
    }

    /// Prepares for the next entry of the innermost block.
    ///
    /// Returns `false` if the block's closing brace is next instead. The
    /// brace is left for the end call.
    fn start_entry(&mut self) -> Result<bool, Error> {
        let first = match self.frames.top_mut() {
            Some(frame) => {
                let first = frame.first;
                frame.first = false;
                first
            }
            None => {
                return Err(Error::illegal(
                    "entry outside of a block", self.lex.pos()
                ))
            }
        };
        if matches!(self.lex.peek()?, Some(Token::CloseBrace)) {
            return Ok(false)
        }
        if !first {
            self.expect(Token::Comma)?;
        }
        Ok(true)
    }

    /// Skips one complete value at the cursor.
    fn skip_value(&mut self) -> Result<(), Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::OpenBrace => {
                let mut depth = 1;
                while depth > 0 {
                    match self.lex.next()? {
                        Token::OpenBrace => depth += 1,
                        Token::CloseBrace => depth -= 1,
                        _ => { }
                    }
                }
                Ok(())
            }
            Token::Ident(_) => {
                // A keyword or enum name stands alone; a choice label has
                // its value following it.
                match self.lex.peek()? {
                    Some(Token::Comma) | Some(Token::CloseBrace) | None => {
                        Ok(())
                    }
                    _ => self.skip_value(),
                }
            }
            Token::Number(_) | Token::Quoted(_) | Token::Hex(_)
            | Token::Bits(_) => Ok(()),
            token => {
                Err(Error::format(
                    format!("unexpected {}", token), pos
                ))
            }
        }
    }

    /// Reads a quoted string and applies the fixup policy.
    fn take_string(&mut self) -> Result<String, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Quoted(content) => {
                let fixup = self.config.fixup;
                let mut res = String::with_capacity(content.len());
                for byte in content {
                    res.push(char::from(
                        fixup.fix(byte, &mut self.warnings, pos)?
                    ));
                }
                Ok(res)
            }
            token => {
                Err(Error::format(
                    format!("expected quoted string, found {}", token), pos
                ))
            }
        }
    }

    /// Reads a number token and parses it as an `i64`.
    fn take_number(&mut self, what: &'static str) -> Result<i64, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Number(text) => {
                text.parse().map_err(|_| {
                    Error::overflow(
                        format!("{} out of range", what), pos
                    )
                })
            }
            token => {
                Err(Error::format(
                    format!("expected {}, found {}", what, token), pos
                ))
            }
        }
    }
}

impl<R: io::Read> ObjectReader for TextReader<R> {
    fn begin_class(&mut self, descr: &ClassDescr) -> Result<(), Error> {
        if self.frames.is_empty() {
            if matches!(self.lex.peek()?, Some(Token::Ident(_))) {
                let pos = self.lex.pos();
                match self.lex.next()? {
                    Token::Ident(name) if name == descr.name() => {
                        self.expect(Token::DefinedAs)?;
                    }
                    token => {
                        return Err(Error::format(
                            format!(
                                "expected type {}, found {}",
                                descr.name(), token
                            ),
                            pos
                        ))
                    }
                }
            }
        }
        self.expect(Token::OpenBrace)?;
        self.frames.push(Frame::plain(FrameKind::Class));
        Ok(())
    }

    fn next_member(
        &mut self, descr: &ClassDescr
    ) -> Result<Option<usize>, Error> {
        loop {
            if !self.start_entry()? {
                return Ok(None)
            }
            let pos = self.lex.pos();
            let (index, label) = match self.lex.next()? {
                Token::Ident(name) => {
                    (descr.index_by_name(&name), name)
                }
                Token::BracketNumber(number) => {
                    (descr.index_by_tag(number), format!("[{}]", number))
                }
                token => {
                    return Err(Error::format(
                        format!(
                            "expected member of {}, found {}",
                            descr.name(), token
                        ),
                        pos
                    ))
                }
            };
            match index {
                Some(index) => {
                    self.frames.push(Frame::plain(FrameKind::Member));
                    return Ok(Some(index))
                }
                None => {
                    if self.config.skip_unknown {
                        self.skip_value()?;
                        continue
                    }
                    return Err(Error::format(
                        format!(
                            "unknown member \"{}\" of {}, \
                             expected one of: {}",
                            label, descr.name(), descr.member_names()
                        ),
                        pos
                    ))
                }
            }
        }
    }

    fn end_member(
        &mut self, _descr: &ClassDescr, _index: usize
    ) -> Result<(), Error> {
        self.frames.pop(FrameKind::Member, self.lex.pos())?;
        Ok(())
    }

    fn end_class(&mut self, _descr: &ClassDescr) -> Result<(), Error> {
        self.frames.pop(FrameKind::Class, self.lex.pos())?;
        self.expect(Token::CloseBrace)
    }

    fn begin_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.expect(Token::OpenBrace)?;
        self.frames.push(Frame::plain(FrameKind::Container));
        Ok(())
    }

    fn next_element(
        &mut self, _descr: &ContainerDescr
    ) -> Result<bool, Error> {
        if !self.start_entry()? {
            return Ok(false)
        }
        self.frames.push(Frame::plain(FrameKind::Element));
        Ok(true)
    }

    fn end_element(&mut self, _descr: &ContainerDescr) -> Result<(), Error> {
        self.frames.pop(FrameKind::Element, self.lex.pos())?;
        Ok(())
    }

    fn end_container(
        &mut self, _descr: &ContainerDescr
    ) -> Result<(), Error> {
        self.frames.pop(FrameKind::Container, self.lex.pos())?;
        self.expect(Token::CloseBrace)
    }

    fn begin_variant(&mut self, descr: &ChoiceDescr) -> Result<usize, Error> {
        self.take_top_header(descr.name())?;
        let pos = self.lex.pos();
        let index = match self.lex.next()? {
            Token::Ident(name) => {
                match descr.index_by_name(&name) {
                    Some(index) => index,
                    None => {
                        return Err(Error::format(
                            format!(
                                "unknown variant \"{}\" of {}, \
                                 expected one of: {}",
                                name, descr.name(), descr.variant_names()
                            ),
                            pos
                        ))
                    }
                }
            }
            Token::BracketNumber(number) => {
                match descr.index_by_tag(number) {
                    Some(index) => index,
                    None => {
                        return Err(Error::format(
                            format!(
                                "unknown variant [{}] of {}, \
                                 expected one of: {}",
                                number, descr.name(), descr.variant_names()
                            ),
                            pos
                        ))
                    }
                }
            }
            token => {
                return Err(Error::format(
                    format!(
                        "expected variant of {}, found {}",
                        descr.name(), token
                    ),
                    pos
                ))
            }
        };
        self.frames.push(Frame::plain(FrameKind::Variant));
        Ok(index)
    }

    fn end_variant(
        &mut self, _descr: &ChoiceDescr, _index: usize
    ) -> Result<(), Error> {
        self.frames.pop(FrameKind::Variant, self.lex.pos())?;
        Ok(())
    }

    fn read_null(&mut self) -> Result<(), Error> {
        self.expect(Token::Ident("NULL".into()))
    }

    fn read_bool(&mut self) -> Result<bool, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Ident(name) if name == "TRUE" => Ok(true),
            Token::Ident(name) if name == "FALSE" => Ok(false),
            token => {
                Err(Error::format(
                    format!("expected TRUE or FALSE, found {}", token), pos
                ))
            }
        }
    }

    fn read_integer(&mut self) -> Result<i64, Error> {
        self.take_number("integer value")
    }

    fn read_unsigned(&mut self) -> Result<u64, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Number(text) => {
                if text.starts_with('-') {
                    return Err(Error::invalid(
                        "negative value for unsigned integer", pos
                    ))
                }
                text.parse().map_err(|_| {
                    Error::overflow("integer value out of range", pos)
                })
            }
            token => {
                Err(Error::format(
                    format!("expected integer value, found {}", token), pos
                ))
            }
        }
    }

    fn read_real(&mut self) -> Result<f64, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Ident(name) => {
                match name.as_str() {
                    "PLUS-INFINITY" => Ok(f64::INFINITY),
                    "MINUS-INFINITY" => Ok(f64::NEG_INFINITY),
                    "NOT-A-NUMBER" => Ok(f64::NAN),
                    _ => {
                        Err(Error::format(
                            format!(
                                "expected real value, found \"{}\"", name
                            ),
                            pos
                        ))
                    }
                }
            }
            Token::Number(text) => {
                text.parse().map_err(|_| {
                    Error::invalid("malformed real value", pos)
                })
            }
            Token::OpenBrace => {
                let mantissa = self.take_number("real mantissa")? as f64;
                self.expect(Token::Comma)?;
                let base = match self.take_number("real base")? {
                    2 => 2f64,
                    10 => 10f64,
                    _ => {
                        return Err(Error::invalid(
                            "real base must be 2 or 10", pos
                        ))
                    }
                };
                self.expect(Token::Comma)?;
                let exp_pos = self.lex.pos();
                let exponent = match self.lex.next()? {
                    Token::Number(text) => text,
                    token => {
                        return Err(Error::format(
                            format!(
                                "expected real exponent, found {}", token
                            ),
                            exp_pos
                        ))
                    }
                };
                self.expect(Token::CloseBrace)?;
                let exponent = match exponent.parse::<i32>() {
                    Ok(exponent) => exponent,
                    // An absurdly small exponent just underflows to zero.
                    Err(_) if exponent.starts_with('-') => return Ok(0.),
                    Err(_) => {
                        return Err(Error::overflow(
                            "real exponent out of range", exp_pos
                        ))
                    }
                };
                let value = mantissa * base.powi(exponent);
                if value.is_infinite() {
                    return Err(Error::overflow(
                        "real value out of range", pos
                    ))
                }
                Ok(value)
            }
            token => {
                Err(Error::format(
                    format!("expected real value, found {}", token), pos
                ))
            }
        }
    }

    fn read_visible(&mut self) -> Result<String, Error> {
        self.take_string()
    }

    fn read_utf8(&mut self) -> Result<String, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Quoted(content) => {
                String::from_utf8(content).map_err(|_| {
                    Error::invalid(
                        "UTF8 string with malformed content", pos
                    )
                })
            }
            token => {
                Err(Error::format(
                    format!("expected quoted string, found {}", token), pos
                ))
            }
        }
    }

    fn read_string_store(&mut self) -> Result<String, Error> {
        self.take_string()
    }

    fn read_octets(&mut self) -> Result<Bytes, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Hex(octets) => Ok(octets.into()),
            token => {
                Err(Error::format(
                    format!("expected hex string, found {}", token), pos
                ))
            }
        }
    }

    fn read_bits(&mut self) -> Result<BitString, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Bits(bits) => Ok(bits),
            token => {
                Err(Error::format(
                    format!("expected bit string, found {}", token), pos
                ))
            }
        }
    }

    fn read_enum(&mut self, descr: &EnumDescr) -> Result<i64, Error> {
        let pos = self.lex.pos();
        match self.lex.next()? {
            Token::Ident(name) => {
                descr.by_name(&name).ok_or_else(|| {
                    Error::invalid(
                        format!("unknown enumerated name \"{}\"", name),
                        pos
                    )
                })
            }
            Token::Number(text) => {
                let value = text.parse().map_err(|_| {
                    Error::overflow("enumerated value out of range", pos)
                })?;
                if !descr.is_open() && descr.by_value(value).is_none() {
                    return Err(Error::invalid(
                        format!("unknown enumerated value {}", value), pos
                    ))
                }
                Ok(value)
            }
            token => {
                Err(Error::format(
                    format!("expected enumerated value, found {}", token),
                    pos
                ))
            }
        }
    }

    fn pos(&self) -> Pos {
        self.lex.pos()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use crate::descr::TypeDescr;
    use crate::error::ErrorKind;
    use super::*;

    fn reader(input: &str) -> TextReader<&[u8]> {
        TextReader::new(input.as_bytes(), Config::default())
    }

    #[test]
    fn primitives() {
        assert_eq!(reader("300").read_integer().unwrap(), 300);
        assert_eq!(reader("-300").read_integer().unwrap(), -300);
        assert_eq!(
            reader("99999999999999999999").read_integer()
                .unwrap_err().kind(),
            ErrorKind::Overflow
        );
        assert_eq!(
            reader("18446744073709551615").read_unsigned().unwrap(),
            u64::MAX
        );
        assert_eq!(
            reader("-1").read_unsigned().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert!(reader("TRUE").read_bool().unwrap());
        assert!(!reader("FALSE").read_bool().unwrap());
        reader("NULL").read_null().unwrap();
        assert_eq!(reader("\"hi\"").read_visible().unwrap(), "hi");
        assert_eq!(
            reader("'0aff'H").read_octets().unwrap().as_ref(),
            b"\x0a\xff"
        );
        assert_eq!(
            reader("'101'B").read_bits().unwrap(),
            BitString::from_bits([true, false, true])
        );
    }

    #[test]
    fn reals() {
        assert_eq!(reader("{ 15, 10, 1 }").read_real().unwrap(), 150.);
        assert_eq!(reader("{ -325, 10, -2 }").read_real().unwrap(), -3.25);
        assert_eq!(reader("{ 3, 2, 2 }").read_real().unwrap(), 12.);
        assert_eq!(reader("PLUS-INFINITY").read_real().unwrap(),
            f64::INFINITY);
        assert_eq!(reader("MINUS-INFINITY").read_real().unwrap(),
            f64::NEG_INFINITY);
        assert!(reader("NOT-A-NUMBER").read_real().unwrap().is_nan());
        assert_eq!(
            reader("{ 1, 3, 1 }").read_real().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader("{ 1, 10, 999999 }").read_real().unwrap_err().kind(),
            ErrorKind::Overflow
        );
        // A huge negative exponent underflows to zero.
        assert_eq!(
            reader("{ 1, 10, -99999999999 }").read_real().unwrap(), 0.
        );
    }

    #[test]
    fn string_fixup() {
        let mut rdr = reader("\"a\tb\"");
        assert_eq!(rdr.read_visible().unwrap(), "a#b");
        assert_eq!(rdr.warnings(), 1);
    }

    #[test]
    fn classes() {
        let descr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .member("b", TypeDescr::visible_string());
        let mut rdr = reader("Pair ::= {\n  a 300,\n  b \"hi\"\n}\n");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 300);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(1));
        assert_eq!(rdr.read_visible().unwrap(), "hi");
        rdr.end_member(&descr, 1).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
        assert!(rdr.at_end().unwrap());
    }

    #[test]
    fn nameless_class() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let mut rdr = reader("{ a 1 }");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 1);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn wrong_type_name() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let err = reader("Two ::= { a 1 }")
            .begin_class(&descr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn member_by_number() {
        let descr = ClassDescr::new("Pair")
            .member("a", TypeDescr::integer())
            .member("b", TypeDescr::integer());
        let mut rdr = reader("{ [1] 7 }");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(1));
        assert_eq!(rdr.read_integer().unwrap(), 7);
        rdr.end_member(&descr, 1).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn unknown_member() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let input = "{ a 1, z { x 2, y \"s\" } }";
        let mut rdr = reader(input);
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 1);
        rdr.end_member(&descr, 0).unwrap();
        let err = rdr.next_member(&descr).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.message().contains("expected one of: a"));

        let mut rdr = TextReader::new(
            input.as_bytes(),
            Config { skip_unknown: true, ..Default::default() }
        );
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 1);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn containers_and_choices() {
        let container = ContainerDescr::sequence_of(TypeDescr::integer());
        let mut rdr = reader("{ 1, 2, 3 }");
        rdr.begin_container(&container).unwrap();
        let mut values = Vec::new();
        while rdr.next_element(&container).unwrap() {
            values.push(rdr.read_integer().unwrap());
            rdr.end_element(&container).unwrap();
        }
        rdr.end_container(&container).unwrap();
        assert_eq!(values, [1, 2, 3]);

        let choice = ChoiceDescr::new("IntOrStr")
            .variant("int", TypeDescr::integer())
            .variant("str", TypeDescr::visible_string());
        let mut rdr = reader("IntOrStr ::= str \"x\"");
        assert_eq!(rdr.begin_variant(&choice).unwrap(), 1);
        assert_eq!(rdr.read_visible().unwrap(), "x");
        rdr.end_variant(&choice, 1).unwrap();

        let mut rdr = reader("int 5");
        assert_eq!(rdr.begin_variant(&choice).unwrap(), 0);
        assert_eq!(rdr.read_integer().unwrap(), 5);
        rdr.end_variant(&choice, 0).unwrap();

        assert_eq!(
            reader("float 1").begin_variant(&choice).unwrap_err().kind(),
            ErrorKind::Format
        );
    }

    #[test]
    fn enums() {
        let descr = EnumDescr::new([("alpha", 0), ("beta", 1)], false);
        assert_eq!(reader("beta").read_enum(&descr).unwrap(), 1);
        assert_eq!(reader("1").read_enum(&descr).unwrap(), 1);
        assert_eq!(
            reader("gamma").read_enum(&descr).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(
            reader("7").read_enum(&descr).unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        let open = EnumDescr::new([("alpha", 0)], true);
        assert_eq!(reader("7").read_enum(&open).unwrap(), 7);
    }

    #[test]
    fn comments_between_tokens() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let mut rdr = reader(
            "One ::= { -- the only member --\n  a 1 -- done\n}"
        );
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(rdr.read_integer().unwrap(), 1);
        rdr.end_member(&descr, 0).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), None);
        rdr.end_class(&descr).unwrap();
    }

    #[test]
    fn truncated_input() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let mut rdr = reader("{ a ");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        assert_eq!(
            rdr.read_integer().unwrap_err().kind(), ErrorKind::EndOfData
        );
    }

    #[test]
    fn error_line() {
        let descr = ClassDescr::new("One")
            .member("a", TypeDescr::integer());
        let mut rdr = reader("{\n  a,\n}");
        rdr.begin_class(&descr).unwrap();
        assert_eq!(rdr.next_member(&descr).unwrap(), Some(0));
        let err = rdr.read_integer().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.pos(), Pos::Line(2));
    }
}
