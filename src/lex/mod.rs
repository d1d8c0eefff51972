use std::rc::Rc;

use super::data::error::LexError;
use super::data::lex::*;
use super::data::prelude::*;
use crate::intern::InternedStr;


/// A Lexer takes the source code and turns it into tokens with line numbers.
///
/// Tokens are either literals, keywords, identifiers, or operators.
/// This allows the parser to worry about fewer things at a time.
///
/// The lexer never stops at an error: every diagnostic is recorded in its
/// `ErrorHandler` and scanning continues with the next character, so a
/// single run reports everything that is wrong with the input.
///
/// Lexer implements Iterator, so you can loop over the tokens.
#[derive(Debug)]
pub struct Lexer {
    chars: Rc<str>,
    offset: usize,
    /// used for 2-character tokens
    current: Option<u8>,
    /// used for 3-character lookahead (e.g. `0b1` vs `0b` followed by an id)
    lookahead: Option<u8>,
    line: u32,
    pub(crate) error_handler: ErrorHandler,
}

// returned when lexing a character or string literal
enum CharError {
    Eof,
    Newline,
    Terminator,
    BadEscape,
}

impl Lexer {
    /// Creates a Lexer from the contents of a file
    pub fn new<S: Into<Rc<str>>>(chars: S) -> Lexer {
        Lexer {
            chars: chars.into(),
            offset: 0,
            current: None,
            lookahead: None,
            line: 1,
            error_handler: ErrorHandler::new(),
        }
    }

    /// Take the error sink out of the lexer once scanning is over.
    pub fn into_errors(self) -> ErrorHandler {
        self.error_handler
    }

    /// This lexer reads a single byte at a time, with at most two bytes of
    /// lookahead. All scanning functions should use this instead of `chars`
    /// directly; going around it would not update the line counter.
    fn next_char(&mut self) -> Option<u8> {
        let next = if let Some(c) = self.current {
            self.current = self.lookahead.take();
            Some(c)
        } else {
            self.chars.as_bytes().get(self.offset).copied()
        };
        next.map(|c| {
            self.offset += 1;
            if c == b'\n' {
                self.line += 1;
            }
            c
        })
    }
    /// Return the byte that would be returned by `next_char`.
    /// Can be called any number of times and will still return the same result.
    fn peek(&mut self) -> Option<u8> {
        self.current = self
            .current
            .or_else(|| self.lookahead.take())
            .or_else(|| self.chars.as_bytes().get(self.offset).copied());
        self.current
    }
    fn peek_next(&mut self) -> Option<u8> {
        // `current`, when buffered, always mirrors `chars[offset]`
        self.lookahead = self
            .lookahead
            .or_else(|| self.chars.as_bytes().get(self.offset + 1).copied());
        self.lookahead
    }
    /// If the next character is `item`, consume it and return true.
    /// Otherwise, return false.
    fn match_next(&mut self, item: u8) -> bool {
        if self.peek() == Some(item) {
            self.next_char();
            true
        } else {
            false
        }
    }
    fn location(&self) -> Location {
        Location::new(self.line)
    }
    fn error(&mut self, err: LexError, location: Location) {
        self.error_handler.error(err, location);
    }

    /// Remove all consecutive whitespace pending in the stream.
    /// Newlines count lines but are never tokens.
    fn consume_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.next_char();
                }
                _ => break,
            }
        }
    }
    /// Remove all characters between now and the next b'\n' character.
    ///
    /// Before: chars{"blah `invalid tokens``\nhello // blah"}
    /// After:  chars{"hello // blah"}
    fn consume_line_comment(&mut self) {
        while let Some(c) = self.next_char() {
            if c == b'\n' {
                break;
            }
        }
    }
    /// Remove a block comment, i.e. until the next '*/'. Block comments do
    /// not nest. The diagnostic for a comment that runs to end of file
    /// points at the line the comment was opened on.
    ///
    /// Before: chars{"this is a lot of text */ int main(){}"}
    /// After:  chars{" int main(){}"}
    fn consume_block_comment(&mut self) {
        let start = self.location();
        while let Some(c) = self.next_char() {
            if c == b'*' && self.peek() == Some(b'/') {
                self.next_char();
                return;
            }
        }
        self.error(LexError::UnterminatedComment, start);
    }

    /// Parse a numeric literal, given the starting digit.
    ///
    /// Binary (`0b101`), hexadecimal (`0x2A`), and octal (`0755`, with any
    /// number of leading zeros) forms are integers only; decimal digit runs
    /// may continue into a float with `.` and/or an exponent (`1.5`, `1.`,
    /// `1e-3`). `.5` is handled by the caller before it gets here.
    fn parse_num(&mut self, start: u8) -> Result<Token, LexError> {
        debug_assert!(start.is_ascii_digit());
        if start == b'0' {
            match self.peek() {
                Some(b'b') | Some(b'B')
                    if self.peek_next().map_or(false, |c| c == b'0' || c == b'1') =>
                {
                    self.next_char();
                    return self.parse_int_radix(2);
                }
                Some(b'x') | Some(b'X')
                    if self.peek_next().map_or(false, |c| c.is_ascii_hexdigit()) =>
                {
                    self.next_char();
                    return self.parse_int_radix(16);
                }
                _ => {}
            }
        }
        let mut buf = String::new();
        buf.push(start as char);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.next_char();
                buf.push(c as char);
            } else {
                break;
            }
        }
        // a decimal run may continue as a float
        if self.peek() == Some(b'.') {
            self.next_char();
            return self.parse_float(buf).map(Token::from);
        }
        if self.is_exponent_start() {
            let float = self.parse_exponent(buf)?;
            return Ok(Literal::Float(float).into());
        }
        let literal = if buf.bytes().all(|c| c == b'0') {
            Literal::Int(0)
        } else if buf.starts_with('0') {
            if buf.bytes().any(|c| c > b'7') {
                // octal with a decimal digit: never a valid token
                return Err(LexError::IllegalChar('0'));
            }
            Literal::Int(i64::from_str_radix(&buf, 8).map_err(|_| LexError::IntegerOverflow)?)
        } else {
            Literal::Int(buf.parse().map_err(|_| LexError::IntegerOverflow)?)
        };
        Ok(literal.into())
    }
    // the radix marker has been consumed and at least one digit is pending
    fn parse_int_radix(&mut self, radix: u32) -> Result<Token, LexError> {
        let mut acc: i64 = 0;
        let mut err = false;
        while let Some(c) = self.peek() {
            let digit = match (c as char).to_digit(radix) {
                Some(digit) => digit,
                None => break,
            };
            self.next_char();
            // we keep consuming on overflow so we don't get bogus extra
            // tokens out of the unread digits
            match acc
                .checked_mul(radix.into())
                .and_then(|acc| acc.checked_add(digit.into()))
            {
                Some(next) => acc = next,
                None => err = true,
            }
        }
        if err {
            Err(LexError::IntegerOverflow)
        } else {
            Ok(Literal::Int(acc).into())
        }
    }
    // at this point we've already seen and consumed the '.';
    // `buf` holds the integer part, possibly empty
    fn parse_float(&mut self, mut buf: String) -> Result<Literal, LexError> {
        buf.push('.');
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.next_char();
                buf.push(c as char);
            } else {
                break;
            }
        }
        let float = self.parse_exponent(buf)?;
        Ok(Literal::Float(float))
    }
    fn is_exponent_start(&mut self) -> bool {
        match self.peek() {
            Some(b'e') | Some(b'E') => self.peek_next().map_or(false, |c| {
                c.is_ascii_digit() || c == b'+' || c == b'-'
            }),
            _ => false,
        }
    }
    // parses `[eE][+-]?digits` if present, then converts the whole buffer
    fn parse_exponent(&mut self, mut buf: String) -> Result<f64, LexError> {
        // normalize `.5` and `5.` so the conversion below can't reject them
        if buf.starts_with('.') {
            buf.insert(0, '0');
        }
        if buf.ends_with('.') {
            buf.push('0');
        }
        if self.is_exponent_start() {
            self.next_char();
            buf.push('e');
            match self.peek() {
                Some(c) if c == b'+' || c == b'-' => {
                    self.next_char();
                    buf.push(c as char);
                }
                _ => {}
            }
            if !self.peek().map_or(false, |c| c.is_ascii_digit()) {
                return Err(LexError::ExponentMissingDigits);
            }
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                self.next_char();
                buf.push(c as char);
            }
        }
        buf.parse().map_err(|_| LexError::ExponentMissingDigits)
    }

    /// Read one escape sequence inside a character literal and decode it to
    /// its byte value: one of `\a \b \f \n \r \t \v \0 \\ \' \" \?`, a
    /// three-digit octal escape, or `\xHH`. The backslash has already been
    /// consumed.
    fn parse_escape(&mut self) -> Result<u8, CharError> {
        let c = self.next_char().ok_or(CharError::Eof)?;
        Ok(match c {
            b'a' => b'\x07',
            b'b' => b'\x08',
            b'f' => b'\x0c',
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => b'\x0b',
            b'0'..=b'3' => {
                // octal escape: exactly three digits, \041 == '!'
                let mut value = (c - b'0') as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            self.next_char();
                            value = value * 8 + (d - b'0') as u32;
                        }
                        _ => return Err(CharError::BadEscape),
                    }
                }
                value as u8
            }
            b'x' => {
                let mut value: u32 = 0;
                for _ in 0..2 {
                    match self.peek().and_then(|c| (c as char).to_digit(16)) {
                        Some(digit) => {
                            self.next_char();
                            value = value * 16 + digit;
                        }
                        None => return Err(CharError::BadEscape),
                    }
                }
                value as u8
            }
            b'\\' | b'\'' | b'"' | b'?' => c,
            _ => return Err(CharError::BadEscape),
        })
    }
    /// Parse a character literal, starting after the opening quote.
    ///
    /// Before: chars{"a' blah"}
    /// After:  chars{" blah"}
    fn parse_char(&mut self) -> Result<Token, LexError> {
        fn consume_until_quote(lexer: &mut Lexer) {
            while let Some(c) = lexer.peek() {
                if c == b'\n' {
                    break;
                }
                lexer.next_char();
                if c == b'\'' {
                    break;
                }
            }
        }
        let value = match self.next_char() {
            None => return Err(LexError::UnterminatedChar),
            Some(b'\n') | Some(b'\'') => return Err(LexError::UnterminatedChar),
            Some(b'\\') => match self.parse_escape() {
                Ok(value) => value,
                Err(_) => {
                    consume_until_quote(self);
                    return Err(LexError::UnterminatedChar);
                }
            },
            Some(c) => c,
        };
        if self.match_next(b'\'') {
            Ok(Literal::Char(value).into())
        } else {
            consume_until_quote(self);
            Err(LexError::UnterminatedChar)
        }
    }

    /// Parse a string literal, starting after the opening quote.
    ///
    /// The token's value is the raw source text between the quotes; escapes
    /// are not decoded (nothing downstream consumes strings). A string
    /// containing one of the disallowed escapes `\a \b \e \f \r \v` is
    /// still a token, but the diagnostic is recorded alongside it.
    fn parse_string(&mut self) -> Result<Token, LexError> {
        let location = self.location();
        let mut raw = String::new();
        loop {
            match self.next_char() {
                None | Some(b'\n') => return Err(LexError::UnterminatedString),
                Some(b'"') => break,
                Some(b'\\') => {
                    raw.push('\\');
                    match self.next_char() {
                        None => return Err(LexError::UnterminatedString),
                        Some(b'\n') => return Err(LexError::UnterminatedString),
                        Some(c) => raw.push(c as char),
                    }
                }
                Some(c) => raw.push(c as char),
            }
        }
        let disallowed: Vec<_> = ["\\a", "\\b", "\\e", "\\f", "\\r", "\\v"]
            .iter()
            .filter(|escape| raw.contains(*escape))
            .map(|escape| format!("'{}'", escape))
            .collect();
        if !disallowed.is_empty() {
            self.error(LexError::DisallowedEscape(disallowed.join(", ")), location);
        }
        Ok(Literal::Str(InternedStr::get_or_intern(raw)).into())
    }

    /// Parse an identifier or keyword, given the starting letter.
    ///
    /// Identifiers match the regex `[a-zA-Z_][a-zA-Z0-9_]*`. After the
    /// match, text equal to a reserved word is remapped to that keyword;
    /// `true` and `false` become boolean literals.
    fn parse_id(&mut self, start: u8) -> Token {
        let mut id = String::new();
        id.push(start.into());
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    self.next_char();
                    id.push(c.into());
                }
                _ => break,
            }
        }
        match Keyword::try_from_id(&id) {
            Some(Keyword::True) => Literal::Bool(true).into(),
            Some(Keyword::False) => Literal::Bool(false).into(),
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Id(InternedStr::get_or_intern(id)),
        }
    }
}

impl Iterator for Lexer {
    type Item = Locatable<Token>;

    /// Return the next token in the stream.
    ///
    /// Any lexical error is pushed onto the error handler and scanning
    /// continues, so the stream itself only ever contains valid tokens.
    /// Once this returns None it will always return None.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.consume_whitespace();
            // avoid recursing on long runs of comments
            while self.peek() == Some(b'/') {
                match self.peek_next() {
                    Some(b'/') => {
                        self.consume_line_comment();
                        self.consume_whitespace();
                    }
                    Some(b'*') => {
                        self.next_char();
                        self.next_char();
                        self.consume_block_comment();
                        self.consume_whitespace();
                    }
                    _ => break,
                }
            }
            let location = self.location();
            let c = self.next_char()?;
            let data = match c {
                b'+' => match self.peek() {
                    Some(b'=') => {
                        self.next_char();
                        AssignmentToken::PlusEqual.into()
                    }
                    Some(b'+') => {
                        self.next_char();
                        Token::PlusPlus
                    }
                    _ => Token::Plus,
                },
                b'-' => match self.peek() {
                    Some(b'=') => {
                        self.next_char();
                        AssignmentToken::MinusEqual.into()
                    }
                    Some(b'-') => {
                        self.next_char();
                        Token::MinusMinus
                    }
                    _ => Token::Minus,
                },
                b'*' => {
                    if self.match_next(b'=') {
                        AssignmentToken::StarEqual.into()
                    } else {
                        Token::Star
                    }
                }
                b'/' => {
                    if self.match_next(b'=') {
                        AssignmentToken::DivideEqual.into()
                    } else {
                        Token::Divide
                    }
                }
                b'%' => {
                    if self.match_next(b'=') {
                        AssignmentToken::ModEqual.into()
                    } else {
                        Token::Mod
                    }
                }
                b'=' => {
                    if self.match_next(b'=') {
                        ComparisonToken::EqualEqual.into()
                    } else {
                        Token::EQUAL
                    }
                }
                b'!' => {
                    if self.match_next(b'=') {
                        ComparisonToken::NotEqual.into()
                    } else {
                        Token::LogicalNot
                    }
                }
                b'<' => {
                    if self.match_next(b'=') {
                        ComparisonToken::LessEqual.into()
                    } else {
                        ComparisonToken::Less.into()
                    }
                }
                b'>' => {
                    if self.match_next(b'=') {
                        ComparisonToken::GreaterEqual.into()
                    } else {
                        ComparisonToken::Greater.into()
                    }
                }
                b'&' => {
                    if self.match_next(b'&') {
                        Token::LogicalAnd
                    } else {
                        self.error(LexError::IllegalChar('&'), location);
                        continue;
                    }
                }
                b'|' => {
                    if self.match_next(b'|') {
                        Token::LogicalOr
                    } else {
                        self.error(LexError::IllegalChar('|'), location);
                        continue;
                    }
                }
                b'{' => Token::LeftBrace,
                b'}' => Token::RightBrace,
                b'[' => Token::LeftBracket,
                b']' => Token::RightBracket,
                b'(' => Token::LeftParen,
                b')' => Token::RightParen,
                b';' => Token::Semicolon,
                b',' => Token::Comma,
                b'.' => match self.peek() {
                    Some(c) if c.is_ascii_digit() => match self.parse_float(String::new()) {
                        Ok(float) => float.into(),
                        Err(err) => {
                            self.error(err, location);
                            continue;
                        }
                    },
                    _ => Token::Dot,
                },
                b'0'..=b'9' => match self.parse_num(c) {
                    Ok(token) => token,
                    Err(err) => {
                        self.error(err, location);
                        continue;
                    }
                },
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_id(c),
                b'\'' => match self.parse_char() {
                    Ok(token) => token,
                    Err(err) => {
                        self.error(err, location);
                        continue;
                    }
                },
                b'"' => match self.parse_string() {
                    Ok(token) => token,
                    Err(err) => {
                        self.error(err, location);
                        continue;
                    }
                },
                x => {
                    self.error(LexError::IllegalChar(x.into()), location);
                    continue;
                }
            };
            return Some(Locatable { data, location });
        }
    }
}
