//! Splitting text input into tokens.
//!
//! This is a private module used by the text reader only.

use std::{fmt, io};
use crate::error::{Error, Pos};
use crate::source::Source;
use crate::value::BitString;


//------------ Token ---------------------------------------------------------

/// One lexical element of the text notation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// An identifier: a label, type reference, or keyword.
    Ident(String),

    /// An integer literal, kept as its digits to defer range checking.
    Number(String),

    /// A quoted string with escapes resolved and line breaks dropped.
    Quoted(Vec<u8>),

    /// A hexadecimal string, already decoded to octets.
    Hex(Vec<u8>),

    /// A binary string, already decoded to bits.
    Bits(BitString),

    /// An opening brace.
    OpenBrace,

    /// A closing brace.
    CloseBrace,

    /// A comma.
    Comma,

    /// The `::=` of a top level value header.
    DefinedAs,

    /// A numeric member reference in brackets.
    BracketNumber(u32),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "\"{}\"", name),
            Token::Number(text) => f.write_str(text),
            Token::Quoted(_) => f.write_str("a quoted string"),
            Token::Hex(_) => f.write_str("a hex string"),
            Token::Bits(_) => f.write_str("a bit string"),
            Token::OpenBrace => f.write_str("'{'"),
            Token::CloseBrace => f.write_str("'}'"),
            Token::Comma => f.write_str("','"),
            Token::DefinedAs => f.write_str("'::='"),
            Token::BracketNumber(number) => write!(f, "[{}]", number),
        }
    }
}


//------------ Lexer ---------------------------------------------------------

/// A tokenizer over text input with one token of lookahead.
pub struct Lexer<R> {
    /// The cursor over the input.
    source: Source<R>,

    /// A token taken off the input but not yet consumed.
    peeked: Option<Token>,
}

impl<R: io::Read> Lexer<R> {
    /// Creates a new lexer.
    pub fn new(reader: R) -> Self {
        Self { source: Source::new_text(reader), peeked: None }
    }

    /// Returns the position for error reporting.
    pub fn pos(&self) -> Pos {
        self.source.pos()
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, Error> {
        if self.peeked.is_none() {
            self.peeked = self.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Consumes and returns the next token if there is one.
    pub fn next_opt(&mut self) -> Result<Option<Token>, Error> {
        if let Some(token) = self.peeked.take() {
            return Ok(Some(token))
        }
        self.next_token()
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Result<Token, Error> {
        match self.next_opt()? {
            Some(token) => Ok(token),
            None => Err(self.source.err_end()),
        }
    }

    /// Lexes the next token off the input.
    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        loop {
            let byte = match self.source.take_opt()? {
                Some(byte) => byte,
                None => return Ok(None),
            };
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => continue,
                b'-' => {
                    if self.source.peek_opt(0)? == Some(b'-') {
                        self.source.take()?;
                        self.skip_comment()?;
                        continue
                    }
                    return self.lex_number(true).map(Some)
                }
                b'0'..=b'9' => {
                    self.source.unget(byte);
                    return self.lex_number(false).map(Some)
                }
                b'"' => return self.lex_quoted().map(Some),
                b'\'' => return self.lex_tick().map(Some),
                b'{' => return Ok(Some(Token::OpenBrace)),
                b'}' => return Ok(Some(Token::CloseBrace)),
                b',' => return Ok(Some(Token::Comma)),
                b'[' => return self.lex_bracket().map(Some),
                b':' => {
                    let pos = self.source.pos();
                    if self.source.take()? != b':'
                        || self.source.take()? != b'='
                    {
                        return Err(Error::format("expected \"::=\"", pos))
                    }
                    return Ok(Some(Token::DefinedAs))
                }
                byte if byte.is_ascii_alphabetic() || byte == b'_' => {
                    return self.lex_ident(byte).map(Some)
                }
                byte => {
                    return Err(Error::format(
                        format!("unexpected character 0x{:02x}", byte),
                        self.source.pos()
                    ))
                }
            }
        }
    }

    /// Skips a comment whose leading `--` has been consumed.
    ///
    /// A comment runs to a closing `--` or to the end of the line,
    /// whichever comes first.
    fn skip_comment(&mut self) -> Result<(), Error> {
        loop {
            match self.source.take_opt()? {
                None | Some(b'\n') => return Ok(()),
                Some(b'-') => {
                    if self.source.peek_opt(0)? == Some(b'-') {
                        self.source.take()?;
                        return Ok(())
                    }
                }
                Some(_) => { }
            }
        }
    }

    /// Lexes an identifier whose first byte has been consumed.
    ///
    /// Identifiers may contain single hyphens but a double hyphen starts
    /// a comment.
    fn lex_ident(&mut self, first: u8) -> Result<Token, Error> {
        let mut name = String::new();
        name.push(char::from(first));
        loop {
            match self.source.peek_opt(0)? {
                Some(byte)
                    if byte.is_ascii_alphanumeric()
                        || byte == b'_' || byte == b'.' =>
                {
                    name.push(char::from(byte));
                    self.source.take()?;
                }
                Some(b'-') => {
                    match self.source.peek_opt(1)? {
                        Some(byte) if byte.is_ascii_alphanumeric() => {
                            self.source.take()?;
                            name.push('-');
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        Ok(Token::Ident(name))
    }

    /// Lexes an integer literal.
    fn lex_number(&mut self, negative: bool) -> Result<Token, Error> {
        let pos = self.source.pos();
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        while let Some(byte) = self.source.peek_opt(0)? {
            if !byte.is_ascii_digit() {
                break
            }
            text.push(char::from(byte));
            self.source.take()?;
        }
        if text.ends_with('-') || text.is_empty() {
            return Err(Error::format("expected digits", pos))
        }
        Ok(Token::Number(text))
    }

    /// Lexes a quoted string whose opening quote has been consumed.
    ///
    /// A doubled quote stands for a literal quote. Line breaks inside the
    /// string come from wrapping long values and are dropped.
    fn lex_quoted(&mut self) -> Result<Token, Error> {
        let mut content = Vec::new();
        loop {
            match self.source.take()? {
                b'"' => {
                    if self.source.peek_opt(0)? == Some(b'"') {
                        self.source.take()?;
                        content.push(b'"');
                    }
                    else {
                        return Ok(Token::Quoted(content))
                    }
                }
                b'\n' | b'\r' => { }
                byte => content.push(byte),
            }
        }
    }

    /// Lexes a hex or binary string whose opening tick has been consumed.
    fn lex_tick(&mut self) -> Result<Token, Error> {
        let pos = self.source.pos();
        let mut text = Vec::new();
        loop {
            match self.source.take()? {
                b'\'' => break,
                b' ' | b'\t' | b'\r' | b'\n' => { }
                byte => text.push(byte),
            }
        }
        match self.source.take()? {
            b'H' | b'h' => {
                let mut octets = Vec::with_capacity(text.len().div_ceil(2));
                for pair in text.chunks(2) {
                    let hi = hex_digit(pair[0], pos)?;
                    // An odd number of digits pads with a zero nibble.
                    let lo = match pair.get(1) {
                        Some(byte) => hex_digit(*byte, pos)?,
                        None => 0,
                    };
                    octets.push(hi << 4 | lo);
                }
                Ok(Token::Hex(octets))
            }
            b'B' | b'b' => {
                let mut bits = Vec::with_capacity(text.len());
                for byte in text {
                    match byte {
                        b'0' => bits.push(false),
                        b'1' => bits.push(true),
                        _ => {
                            return Err(Error::format(
                                "expected binary digit", pos
                            ))
                        }
                    }
                }
                Ok(Token::Bits(BitString::from_bits(bits)))
            }
            _ => {
                Err(Error::format(
                    "expected 'H' or 'B' after tick string", pos
                ))
            }
        }
    }

    /// Lexes a bracketed member number whose bracket has been consumed.
    fn lex_bracket(&mut self) -> Result<Token, Error> {
        let pos = self.source.pos();
        let mut number: u32 = 0;
        let mut digits = 0;
        loop {
            match self.source.take()? {
                b']' => break,
                byte if byte.is_ascii_digit() => {
                    number = number.checked_mul(10).and_then(|n| {
                        n.checked_add(u32::from(byte - b'0'))
                    }).ok_or_else(|| {
                        Error::overflow("member number too large", pos)
                    })?;
                    digits += 1;
                }
                _ => {
                    return Err(Error::format(
                        "expected digits in brackets", pos
                    ))
                }
            }
        }
        if digits == 0 {
            return Err(Error::format("expected digits in brackets", pos))
        }
        Ok(Token::BracketNumber(number))
    }
}

/// Decodes a single hex digit.
fn hex_digit(byte: u8, pos: Pos) -> Result<u8, Error> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        _ => Err(Error::format("expected hex digit", pos)),
    }
}


//============ Tests =========================================================
