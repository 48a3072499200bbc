use crate::NEWLINE;
use crate::error::{HyperlispError, LiteralKind};

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\n' => self.line += 1,
            // a lone CR ends a line too
            '\r' if self.peek() != Some('\n') => self.line += 1,
            _ => {}
        }
        Some(c)
    }

    pub fn eat(&mut self, pattern: &str) -> bool {
        if self.starts_with(pattern) {
            for _ in pattern.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    pub fn at_line_end(&self) -> bool {
        matches!(self.peek(), None | Some('\n') | Some('\r'))
    }

    /// Consumes one line terminator (`\n`, `\r\n` or a lone `\r`).
    pub fn eat_line_end(&mut self) -> bool {
        self.eat("\r\n") || self.eat("\n") || self.eat("\r")
    }

    pub fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stop(c) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }
}

pub fn read_single_line_literal(cursor: &mut Cursor<'_>) -> Result<String, HyperlispError> {
    let start_line = cursor.line();
    let mut out = String::new();
    while let Some(c) = cursor.bump() {
        match c {
            '"' => return Ok(out),
            '\\' => read_escape(cursor, &mut out)?,
            '\n' | '\r' => {
                return Err(HyperlispError::LineBreakInLiteral { line: start_line });
            }
            other => out.push(other),
        }
    }
    Err(HyperlispError::UnterminatedLiteral {
        line: start_line,
        kind: LiteralKind::SingleLine,
    })
}

pub fn read_multi_line_literal(cursor: &mut Cursor<'_>) -> Result<String, HyperlispError> {
    let start_line = cursor.line();
    let mut out = String::new();
    loop {
        let line = cursor.line();
        let Some(c) = cursor.bump() else {
            break;
        };
        match c {
            '"' => {
                if !cursor.eat("\"") {
                    return Ok(out);
                }
                out.push('"');
            }
            '\n' => out.push_str(NEWLINE),
            '\r' => {
                if !cursor.eat("\n") {
                    return Err(HyperlispError::LoneCarriageReturn { line });
                }
                out.push_str(NEWLINE);
            }
            other => out.push(other),
        }
    }
    Err(HyperlispError::UnterminatedLiteral {
        line: start_line,
        kind: LiteralKind::MultiLine,
    })
}

fn read_escape(cursor: &mut Cursor<'_>, out: &mut String) -> Result<(), HyperlispError> {
    let line = cursor.line();
    let Some(c) = cursor.bump() else {
        return Err(HyperlispError::UnterminatedLiteral {
            line,
            kind: LiteralKind::SingleLine,
        });
    };
    match c {
        '"' => out.push('"'),
        '\'' => out.push('\''),
        '\\' => out.push('\\'),
        'a' => out.push('\u{7}'),
        'b' => out.push('\u{8}'),
        'f' => out.push('\u{c}'),
        't' => out.push('\t'),
        'v' => out.push('\u{b}'),
        'n' => out.push_str(NEWLINE),
        'r' => {
            // "\r" is only valid as the first half of "\r\n"
            if !cursor.eat("\\n") {
                return Err(HyperlispError::InvalidEscape {
                    line,
                    sequence: "r".to_string(),
                });
            }
            out.push_str(NEWLINE);
        }
        'x' => out.push(read_hex_unit(cursor, line)?),
        other => {
            return Err(HyperlispError::InvalidEscape {
                line,
                sequence: other.to_string(),
            });
        }
    }
    Ok(())
}

fn read_hex_unit(cursor: &mut Cursor<'_>, line: usize) -> Result<char, HyperlispError> {
    let (first, mut sequence) = read_code_unit(cursor, line)?;
    let mut units = vec![first];
    // a high surrogate pairs with an immediately following \x low surrogate
    if (0xD800..0xDC00).contains(&first) && cursor.eat("\\x") {
        let (second, digits) = read_code_unit(cursor, line)?;
        units.push(second);
        sequence = format!("{sequence}\\{digits}");
    }

    let mut chars = char::decode_utf16(units);
    match (chars.next(), chars.next()) {
        (Some(Ok(c)), None) => Ok(c),
        _ => Err(HyperlispError::InvalidEscape { line, sequence }),
    }
}

fn read_code_unit(cursor: &mut Cursor<'_>, line: usize) -> Result<(u16, String), HyperlispError> {
    let mut digits = String::with_capacity(4);
    for _ in 0..4 {
        match cursor.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(c);
                cursor.bump();
            }
            _ => break,
        }
    }
    let sequence = format!("x{digits}");
    if digits.len() != 4 {
        return Err(HyperlispError::InvalidEscape { line, sequence });
    }
    match u16::from_str_radix(&digits, 16) {
        Ok(unit) => Ok((unit, sequence)),
        Err(_) => Err(HyperlispError::InvalidEscape { line, sequence }),
    }
}
