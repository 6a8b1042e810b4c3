//! Streaming JSON tokenizer
//!
//! The lexer reads its resource sequentially, one chunk at a time, and yields
//! each structural character and each atomic value (string, number,
//! `true`/`false`/`null`) as a single [`Token`] together with its absolute
//! byte offset. Atom contents are not interpreted; that is left to the
//! decoder. Atoms may be arbitrarily long: the token buffer grows as needed.

use stencil_core::{StencilError, StencilResult};
use std::io::{Read, Seek, SeekFrom};

const CHUNK_SIZE: usize = 8192;
const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// One token and the offset of its first byte in the resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub offset: u64,
}

impl Token {
    /// Offset one past the token's last byte
    pub fn end(&self) -> u64 {
        self.offset + self.value.len() as u64
    }

    /// Whether this is the structural character `c`
    pub fn is(&self, c: char) -> bool {
        self.value.len() == 1 && self.value.starts_with(c)
    }

    pub fn is_opener(&self) -> bool {
        self.is('[') || self.is('{')
    }

    pub fn is_closer(&self) -> bool {
        self.is(']') || self.is('}')
    }
}

/// Tokenize `length` bytes of `resource` starting at `offset`.
///
/// The resource is positioned at `offset` first; the returned lexer then
/// consumes it sequentially.
pub fn tokens<R: Read + Seek + ?Sized>(
    resource: &mut R,
    offset: u64,
    length: Option<u64>,
) -> StencilResult<Lexer<'_, R>> {
    resource.seek(SeekFrom::Start(offset))?;
    Ok(Lexer::new(resource, offset, length))
}

/// Single-pass tokenizer over a reader already positioned at `start`
pub struct Lexer<'r, R: Read + ?Sized> {
    reader: &'r mut R,
    chunk: Vec<u8>,
    chunk_pos: usize,
    /// Absolute offset of the next unread byte
    position: u64,
    /// Absolute offset at which to stop
    limit: Option<u64>,
    at_start: bool,
    exhausted: bool,
    failed: bool,
}

impl<'r, R: Read + ?Sized> Lexer<'r, R> {
    pub fn new(reader: &'r mut R, start: u64, length: Option<u64>) -> Self {
        Self {
            reader,
            chunk: Vec::with_capacity(CHUNK_SIZE),
            chunk_pos: 0,
            position: start,
            limit: length.map(|len| start + len),
            at_start: start == 0,
            exhausted: false,
            failed: false,
        }
    }

    /// Absolute offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fill(&mut self) -> StencilResult<bool> {
        if self.chunk_pos < self.chunk.len() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        let mut want = CHUNK_SIZE;
        if let Some(limit) = self.limit {
            let remaining = limit.saturating_sub(self.position);
            want = want.min(usize::try_from(remaining).unwrap_or(usize::MAX));
        }
        if want == 0 {
            self.exhausted = true;
            return Ok(false);
        }
        self.chunk.resize(want, 0);
        let read = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StencilError::Resource(e)),
            }
        };
        self.chunk.truncate(read);
        self.chunk_pos = 0;
        if read == 0 {
            self.exhausted = true;
            return Ok(false);
        }
        Ok(true)
    }

    fn peek(&mut self) -> StencilResult<Option<u8>> {
        if self.fill()? {
            Ok(Some(self.chunk[self.chunk_pos]))
        } else {
            Ok(None)
        }
    }

    fn bump(&mut self) {
        self.chunk_pos += 1;
        self.position += 1;
    }

    fn skip_bom(&mut self) -> StencilResult<()> {
        self.at_start = false;
        for expected in BOM {
            match self.peek()? {
                Some(b) if b == expected => self.bump(),
                // A partial BOM can only be followed by garbage; leave it to the decoder.
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    fn next_token(&mut self) -> StencilResult<Option<Token>> {
        if self.at_start {
            self.skip_bom()?;
        }

        while let Some(b) = self.peek()? {
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.bump();
            } else {
                break;
            }
        }

        let offset = self.position;
        let Some(first) = self.peek()? else {
            return Ok(None);
        };

        let mut bytes = Vec::new();
        match first {
            b'[' | b']' | b'{' | b'}' | b':' | b',' => {
                self.bump();
                bytes.push(first);
            }
            b'"' => {
                self.bump();
                bytes.push(first);
                let mut escaped = false;
                loop {
                    let Some(b) = self.peek()? else {
                        return Err(StencilError::MalformedInput(format!(
                            "unterminated string starting at byte {offset}"
                        )));
                    };
                    self.bump();
                    bytes.push(b);
                    if escaped {
                        escaped = false;
                    } else if b == b'\\' {
                        escaped = true;
                    } else if b == b'"' {
                        break;
                    }
                }
            }
            _ => {
                while let Some(b) = self.peek()? {
                    if ends_bare_word(b) {
                        break;
                    }
                    self.bump();
                    bytes.push(b);
                }
            }
        }

        let value = String::from_utf8(bytes).map_err(|_| {
            StencilError::MalformedInput(format!("invalid UTF-8 in token at byte {offset}"))
        })?;
        Ok(Some(Token { value, offset }))
    }
}

impl<R: Read + ?Sized> Iterator for Lexer<'_, R> {
    type Item = StencilResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Whitespace, structural characters and quotes end a bare word
fn ends_bare_word(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'[' | b']' | b'{' | b'}' | b':' | b',' | b'"')
}

#[cfg(test)]
#[path = "lexer/lexer_tests.rs"]
mod lexer_tests;
