//! The chunked lexer.
//!
//! Classifies the next token from the input buffer at its resume position,
//! tolerating tokens split across arbitrary byte boundaries. When the buffer
//! runs out mid-token the scanner parks its progress in [`PartialToken`] and
//! reports [`Scan::NeedMore`]; the next call picks up exactly where it left
//! off. No byte is ever consumed before it has contributed to a decision.

use crate::buffer::InputBuffer;
use crate::error::Malformed;
use crate::value::Value;

/// JSON whitespace per RFC 8259: space, tab, line feed, carriage return.
#[inline]
pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// First non-whitespace position at or after `index`.
pub(crate) fn find_non_whitespace(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len() && is_whitespace(bytes[index]) {
        index += 1;
    }
    index
}

/// A fully classified token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Colon,
    Comma,
    /// A string body with the surrounding quotes stripped and escape
    /// sequences left raw. `terminated` is false for a provisional body whose
    /// closing quote has not been seen yet.
    Str { text: String, terminated: bool },
    /// A number, already narrowed to `Integer` or `Float`.
    Number(Value),
    /// `true`, `false` or `null`, already materialized.
    Literal(Value),
}

/// Outcome of one scan step.
#[derive(Debug)]
pub(crate) enum Scan {
    Token(Token),
    /// The buffer ended between tokens or inside one; continuation state
    /// stays parked in the lexer until more input arrives.
    NeedMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum PartialKind {
    #[default]
    None,
    Str,
    Number,
    Literal,
}

/// Continuation state for a token whose bytes span chunk boundaries.
#[derive(Debug, Default)]
struct PartialToken {
    kind: PartialKind,
    bytes: Vec<u8>,
    /// The last consumed byte was an unescaped backslash.
    escape_pending: bool,
}

impl PartialToken {
    fn reset(&mut self) {
        self.kind = PartialKind::None;
        self.bytes.clear();
        self.escape_pending = false;
    }
}

#[derive(Debug, Default)]
pub(crate) struct Lexer {
    partial: PartialToken,
}

impl Lexer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True when no token is in progress across the current chunk boundary.
    pub(crate) fn is_idle(&self) -> bool {
        self.partial.kind == PartialKind::None
    }

    /// The longest valid UTF-8 prefix of an in-progress string body, or
    /// `None` when the lexer is not mid-string.
    ///
    /// A multi-byte scalar split across chunks keeps its lead bytes parked
    /// here until completed, so an exposed partial value never contains a
    /// replacement character that a later chunk would have to rewrite.
    /// Genuinely invalid UTF-8 is reported once the string terminates.
    pub(crate) fn partial_string(&self) -> Option<&str> {
        if self.partial.kind != PartialKind::Str {
            return None;
        }
        Some(utf8_prefix(&self.partial.bytes))
    }

    /// Scan the next token starting at the buffer's resume position,
    /// continuing any token parked at the previous chunk boundary.
    pub(crate) fn next_token(&mut self, buf: &mut InputBuffer) -> Result<Scan, Malformed> {
        match self.partial.kind {
            PartialKind::Str => return self.scan_string(buf),
            PartialKind::Number => return self.scan_number(buf),
            PartialKind::Literal => return self.scan_literal(buf),
            PartialKind::None => {}
        }

        let start = find_non_whitespace(buf.bytes(), buf.resume());
        buf.advance_to(start);
        let Some(byte) = buf.peek() else {
            return Ok(Scan::NeedMore);
        };

        match byte {
            b'{' => Ok(self.single(buf, Token::LBrace)),
            b'}' => Ok(self.single(buf, Token::RBrace)),
            b'[' => Ok(self.single(buf, Token::LBracket)),
            b']' => Ok(self.single(buf, Token::RBracket)),
            b':' => Ok(self.single(buf, Token::Colon)),
            b',' => Ok(self.single(buf, Token::Comma)),
            b'"' => {
                buf.advance_to(start + 1);
                self.partial.kind = PartialKind::Str;
                self.scan_string(buf)
            }
            b'-' | b'0'..=b'9' => {
                self.partial.kind = PartialKind::Number;
                self.scan_number(buf)
            }
            b't' | b'f' | b'n' => {
                self.partial.kind = PartialKind::Literal;
                self.scan_literal(buf)
            }
            other => Err(Malformed::at(
                buf.offset(start),
                format!("unexpected character {:?}", char::from(other)),
            )),
        }
    }

    fn single(&mut self, buf: &mut InputBuffer, token: Token) -> Scan {
        buf.advance_to(buf.resume() + 1);
        Scan::Token(token)
    }

    /// Body scan for a string whose opening quote has been consumed. `\`
    /// escapes the next byte unconditionally; the body is not decoded, only
    /// scanned past so the terminator is found correctly.
    fn scan_string(&mut self, buf: &mut InputBuffer) -> Result<Scan, Malformed> {
        let mut i = buf.resume();
        while i < buf.bytes().len() {
            let byte = buf.bytes()[i];
            if self.partial.escape_pending {
                self.partial.bytes.push(byte);
                self.partial.escape_pending = false;
            } else if byte == b'\\' {
                self.partial.bytes.push(byte);
                self.partial.escape_pending = true;
            } else if byte == b'"' {
                buf.advance_to(i + 1);
                let raw = core::mem::take(&mut self.partial.bytes);
                self.partial.reset();
                let text = String::from_utf8(raw)
                    .map_err(|_| Malformed::at(buf.offset(i), "invalid UTF-8 in string"))?;
                return Ok(Scan::Token(Token::Str {
                    text,
                    terminated: true,
                }));
            } else {
                self.partial.bytes.push(byte);
            }
            i += 1;
        }
        buf.advance_to(i);
        Ok(Scan::NeedMore)
    }

    /// Greedy scan over the number character class. The run is only
    /// committed once a byte outside the class proves it complete; a run
    /// that reaches the end of the buffer is kept for continuation.
    fn scan_number(&mut self, buf: &mut InputBuffer) -> Result<Scan, Malformed> {
        let mut i = buf.resume();
        while i < buf.bytes().len() {
            let byte = buf.bytes()[i];
            if matches!(byte, b'0'..=b'9' | b'+' | b'-' | b'.' | b'e' | b'E') {
                self.partial.bytes.push(byte);
                i += 1;
            } else {
                buf.advance_to(i);
                let value = self.finish_number(buf.offset(i))?;
                return Ok(Scan::Token(Token::Number(value)));
            }
        }
        buf.advance_to(i);
        Ok(Scan::NeedMore)
    }

    fn finish_number(&mut self, offset: usize) -> Result<Value, Malformed> {
        let raw = core::mem::take(&mut self.partial.bytes);
        self.partial.reset();
        // the scanner only pushes ASCII into a number run
        let text = String::from_utf8(raw)
            .map_err(|_| Malformed::at(offset, "invalid number"))?;
        let invalid = || Malformed::at(offset, format!("invalid number {text:?}"));

        if text.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
            return Ok(Value::Float(text.parse().map_err(|_| invalid())?));
        }
        match text.parse::<i64>() {
            Ok(n) => Ok(Value::Integer(n)),
            // RFC 8259 puts no range limit on numbers; an overflowing
            // integer run degrades to a float rather than failing
            Err(_) => Ok(Value::Float(text.parse().map_err(|_| invalid())?)),
        }
    }

    /// Reads while the accumulated bytes are a strict prefix of `true`,
    /// `false` or `null`. An exact spelling is only emitted once a following
    /// non-identifier byte is visible.
    fn scan_literal(&mut self, buf: &mut InputBuffer) -> Result<Scan, Malformed> {
        let mut i = buf.resume();
        loop {
            if let Some(value) = match_literal(&self.partial.bytes) {
                return match buf.bytes().get(i) {
                    None => {
                        buf.advance_to(i);
                        Ok(Scan::NeedMore)
                    }
                    Some(b) if b.is_ascii_alphanumeric() || *b == b'_' => Err(Malformed::at(
                        buf.offset(i),
                        format!("invalid literal starting with {}", partial_lossy(&self.partial.bytes)),
                    )),
                    Some(_) => {
                        buf.advance_to(i);
                        self.partial.reset();
                        Ok(Scan::Token(Token::Literal(value)))
                    }
                };
            }
            match buf.bytes().get(i) {
                None => {
                    buf.advance_to(i);
                    return Ok(Scan::NeedMore);
                }
                Some(&byte) => {
                    self.partial.bytes.push(byte);
                    if !is_literal_prefix(&self.partial.bytes) {
                        return Err(Malformed::at(
                            buf.offset(i),
                            format!("invalid literal {}", partial_lossy(&self.partial.bytes)),
                        ));
                    }
                    i += 1;
                }
            }
        }
    }
}

fn match_literal(bytes: &[u8]) -> Option<Value> {
    match bytes {
        b"true" => Some(Value::Bool(true)),
        b"false" => Some(Value::Bool(false)),
        b"null" => Some(Value::Null),
        _ => None,
    }
}

fn is_literal_prefix(bytes: &[u8]) -> bool {
    [b"true".as_slice(), b"false".as_slice(), b"null".as_slice()]
        .iter()
        .any(|lit| lit.starts_with(bytes))
}

fn partial_lossy(bytes: &[u8]) -> String {
    format!("{:?}", String::from_utf8_lossy(bytes))
}

fn utf8_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            // cannot fail on the validated prefix
            core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn lex_all(chunks: &[&[u8]]) -> Result<Vec<Token>, Malformed> {
        let mut buf = InputBuffer::new();
        let mut lexer = Lexer::new();
        let mut tokens = Vec::new();
        for chunk in chunks {
            buf.append(chunk);
            loop {
                match lexer.next_token(&mut buf)? {
                    Scan::Token(token) => tokens.push(token),
                    Scan::NeedMore => break,
                }
            }
        }
        Ok(tokens)
    }

    fn str_token(text: &str) -> Token {
        Token::Str {
            text: text.into(),
            terminated: true,
        }
    }

    #[test]
    fn test_structural_tokens() {
        let tokens = lex_all(&[b"{ } [ ] : ,"]).unwrap();
        assert_eq!(
            tokens,
            [
                Token::LBrace,
                Token::RBrace,
                Token::LBracket,
                Token::RBracket,
                Token::Colon,
                Token::Comma,
            ]
        );
    }

    #[test]
    fn test_string_split_across_chunks() {
        let tokens = lex_all(&[b"\"he", b"ll", b"o\""]).unwrap();
        assert_eq!(tokens, [str_token("hello")]);
    }

    #[test]
    fn test_string_keeps_raw_escapes() {
        let tokens = lex_all(&[br#""a\"b\\c\nd""#]).unwrap();
        assert_eq!(tokens, [str_token(r#"a\"b\\c\nd"#)]);
    }

    #[test]
    fn test_escaped_quote_split_at_backslash() {
        // the chunk ends on the backslash; the quote that follows must not
        // terminate the string
        let tokens = lex_all(&[br#""ab\"#, br#""cd""#]).unwrap();
        assert_eq!(tokens, [str_token(r#"ab\"cd"#)]);
    }

    #[test]
    fn test_partial_string_exposes_utf8_prefix_only() {
        let mut buf = InputBuffer::new();
        let mut lexer = Lexer::new();
        // é is 0xc3 0xa9; cut between the two bytes
        buf.append(b"\"caf\xc3");
        assert!(matches!(lexer.next_token(&mut buf).unwrap(), Scan::NeedMore));
        assert_eq!(lexer.partial_string(), Some("caf"));

        buf.append(b"\xa9");
        assert!(matches!(lexer.next_token(&mut buf).unwrap(), Scan::NeedMore));
        assert_eq!(lexer.partial_string(), Some("café"));
    }

    #[test_case(b"12 " => Token::Number(Value::Integer(12)); "integer")]
    #[test_case(b"-42," => Token::Number(Value::Integer(-42)); "negative")]
    #[test_case(b"3.14]" => Token::Number(Value::Float(3.14)); "float")]
    #[test_case(b"2.5e10 " => Token::Number(Value::Float(2.5e10)); "exponent")]
    #[test_case(b"-1.5E-3 " => Token::Number(Value::Float(-1.5e-3)); "negative exponent")]
    fn test_numbers_commit_on_terminator(input: &[u8]) -> Token {
        let mut tokens = lex_all(&[input]).unwrap();
        tokens.remove(0)
    }

    #[test]
    fn test_number_run_waits_for_terminator() {
        let mut buf = InputBuffer::new();
        let mut lexer = Lexer::new();
        buf.append(b"12");
        assert!(matches!(lexer.next_token(&mut buf).unwrap(), Scan::NeedMore));
        assert_eq!(lexer.partial_string(), None);

        buf.append(b"3 ");
        match lexer.next_token(&mut buf).unwrap() {
            Scan::Token(token) => assert_eq!(token, Token::Number(Value::Integer(123))),
            Scan::NeedMore => panic!("number should commit at whitespace"),
        }
    }

    #[test]
    fn test_huge_integer_degrades_to_float() {
        let tokens = lex_all(&[b"123456789012345678901234567890 "]).unwrap();
        assert_eq!(
            tokens,
            [Token::Number(Value::Float(123456789012345678901234567890.0))]
        );
    }

    #[test_case(b"12..3 "; "double dot")]
    #[test_case(b"1e "; "dangling exponent")]
    #[test_case(b"- "; "bare minus")]
    #[test_case(b"1-2 "; "minus inside run")]
    fn test_invalid_numbers(input: &[u8]) {
        assert!(lex_all(&[input]).is_err());
    }

    fn test_literals_case(input: &[u8]) -> Token {
        let mut tokens = lex_all(&[input]).unwrap();
        tokens.remove(0)
    }

    // Written as plain #[test] functions rather than #[test_case(... => true ...)]
    // because the `test-case` macro on this toolchain fails to parse a bare
    // `true`/`false` keyword on the right-hand side of `=>`.
    #[test]
    fn test_literals_true() {
        assert_eq!(
            test_literals_case(b"true,"),
            Token::Literal(Value::Bool(true))
        );
    }

    #[test]
    fn test_literals_false() {
        assert_eq!(
            test_literals_case(b"false]"),
            Token::Literal(Value::Bool(false))
        );
    }

    #[test]
    fn test_literals_null() {
        assert_eq!(test_literals_case(b"null "), Token::Literal(Value::Null));
    }

    #[test]
    fn test_literal_split_across_chunks() {
        let tokens = lex_all(&[b"tr", b"u", b"e,"]).unwrap();
        assert_eq!(tokens, [Token::Literal(Value::Bool(true)), Token::Comma]);
    }

    #[test]
    fn test_exact_literal_waits_for_lookahead() {
        let mut buf = InputBuffer::new();
        let mut lexer = Lexer::new();
        buf.append(b"null");
        assert!(matches!(lexer.next_token(&mut buf).unwrap(), Scan::NeedMore));

        buf.append(b"]");
        match lexer.next_token(&mut buf).unwrap() {
            Scan::Token(token) => assert_eq!(token, Token::Literal(Value::Null)),
            Scan::NeedMore => panic!("literal should commit before ']'"),
        }
    }

    #[test_case(b"tru3 "; "bad tail")]
    #[test_case(b"nul "; "cut short")]
    #[test_case(b"truex"; "identifier continues")]
    #[test_case(b"word"; "unknown word")]
    fn test_invalid_literals(input: &[u8]) {
        assert!(lex_all(&[input]).is_err());
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex_all(&[b"@"]).unwrap_err();
        assert!(err.reason().contains("unexpected character"));
    }
}
