//! Top-level element boundaries of a JSON list or dict
//!
//! The splitters consume lexer tokens for one container and track a nesting
//! level. Separators are only acted upon at the container's top level, so
//! nested containers are skipped over without being interpreted; they are
//! tokenized again only when their own boundary is visited later.

use crate::lexer::{Lexer, Token, tokens};
use crate::parse::parse_key;
use stencil_core::{Key, ScalarKind, StencilError, StencilResult};
use std::io::{Read, Seek, SeekFrom};

/// Raw byte range of one element within a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub offset: u64,
    pub length: u64,
}

impl Boundary {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset one past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Read the bytes of `boundary` from `resource`
pub fn read_range<R: Read + Seek + ?Sized>(
    resource: &mut R,
    boundary: Boundary,
) -> StencilResult<Vec<u8>> {
    resource.seek(SeekFrom::Start(boundary.offset))?;
    let len = usize::try_from(boundary.length)
        .map_err(|_| StencilError::MalformedInput("boundary too large".to_string()))?;
    let mut bytes = vec![0; len];
    resource.read_exact(&mut bytes)?;
    Ok(bytes)
}

/// Split the list at `offset` into element boundaries.
///
/// Returns `None` when the addressed range is the literal `null`.
pub fn split_list<R: Read + Seek + ?Sized>(
    resource: &mut R,
    offset: u64,
    length: Option<u64>,
) -> StencilResult<Option<ListSplit<'_, R>>> {
    let mut lexer = tokens(resource, offset, length)?;
    match next_token(&mut lexer)? {
        Some(t) if t.is('[') => Ok(Some(ListSplit {
            span: Span::new(lexer),
            done: false,
        })),
        Some(t) if t.value == "null" => expect_end(&mut lexer).map(|()| None),
        Some(t) => Err(unexpected(&t, "'[' or null")),
        None => Err(StencilError::MalformedInput(format!(
            "expected a list at byte {offset}, found end of input"
        ))),
    }
}

/// Split the dict at `offset` into `(key, boundary)` pairs.
///
/// Keys are decoded eagerly as `key_kind`; values stay opaque ranges.
/// Returns `None` when the addressed range is the literal `null`.
pub fn split_dict<R: Read + Seek + ?Sized>(
    resource: &mut R,
    offset: u64,
    length: Option<u64>,
    key_kind: ScalarKind,
) -> StencilResult<Option<DictSplit<'_, R>>> {
    let mut lexer = tokens(resource, offset, length)?;
    match next_token(&mut lexer)? {
        Some(t) if t.is('{') => Ok(Some(DictSplit {
            span: Span::new(lexer),
            key_kind,
            done: false,
        })),
        Some(t) if t.value == "null" => expect_end(&mut lexer).map(|()| None),
        Some(t) => Err(unexpected(&t, "'{' or null")),
        None => Err(StencilError::MalformedInput(format!(
            "expected a dict at byte {offset}, found end of input"
        ))),
    }
}

fn next_token<R: Read + ?Sized>(lexer: &mut Lexer<'_, R>) -> StencilResult<Option<Token>> {
    lexer.next().transpose()
}

/// Fail unless the addressed range holds nothing past the container.
fn expect_end<R: Read + ?Sized>(lexer: &mut Lexer<'_, R>) -> StencilResult<()> {
    match next_token(lexer)? {
        None => Ok(()),
        Some(t) => Err(StencilError::MalformedInput(format!(
            "trailing {:?} at byte {}",
            t.value, t.offset
        ))),
    }
}

fn unexpected(token: &Token, expected: &str) -> StencilError {
    StencilError::MalformedInput(format!(
        "expected {expected} at byte {}, found {:?}",
        token.offset, token.value
    ))
}

/// Outcome of scanning one element
enum Element {
    /// An element followed by a separator
    Item(Boundary),
    /// The final element, followed by the closing bracket
    Last(Boundary),
    /// Closing bracket with no pending element
    End,
}

/// Tracks one element's span at the container's top level
struct Span<'r, R: Read + ?Sized> {
    lexer: Lexer<'r, R>,
    /// Whether at least one element was produced
    produced: bool,
}

impl<'r, R: Read + ?Sized> Span<'r, R> {
    fn new(lexer: Lexer<'r, R>) -> Self {
        Self {
            lexer,
            produced: false,
        }
    }

    /// Scan one element value, stopping at a top-level `,` or at the
    /// container's closing bracket (which must be `closer`).
    fn element(&mut self, closer: char) -> StencilResult<Element> {
        let mut level: i64 = 0;
        let mut start: Option<u64> = None;
        let mut end: u64 = 0;

        loop {
            let Some(token) = next_token(&mut self.lexer)? else {
                return Err(StencilError::MalformedInput(format!(
                    "unbalanced nesting: input ended at byte {} inside a container",
                    self.lexer.position()
                )));
            };

            if token.is_opener() {
                if level == 0 && start.is_some() {
                    return Err(unexpected(&token, "','"));
                }
                start.get_or_insert(token.offset);
                level += 1;
                end = token.end();
            } else if token.is_closer() {
                level -= 1;
                if level == -1 {
                    if !token.is(closer) {
                        return Err(unexpected(&token, &format!("'{closer}'")));
                    }
                    expect_end(&mut self.lexer)?;
                    return match start {
                        Some(offset) => {
                            self.produced = true;
                            Ok(Element::Last(Boundary::new(offset, end - offset)))
                        }
                        None if !self.produced => Ok(Element::End),
                        None => Err(unexpected(&token, "a value")),
                    };
                }
                end = token.end();
            } else if level == 0 && (token.is(',') || token.is(':')) {
                if token.is(':') {
                    return Err(unexpected(&token, "',' or a value"));
                }
                return match start {
                    Some(offset) => {
                        self.produced = true;
                        Ok(Element::Item(Boundary::new(offset, end - offset)))
                    }
                    None => Err(unexpected(&token, "a value")),
                };
            } else {
                if level == 0 && start.is_some() {
                    return Err(unexpected(&token, "','"));
                }
                start.get_or_insert(token.offset);
                end = token.end();
            }
        }
    }
}

/// Lazy sequence of list element boundaries
pub struct ListSplit<'r, R: Read + ?Sized> {
    span: Span<'r, R>,
    done: bool,
}

impl<R: Read + ?Sized> Iterator for ListSplit<'_, R> {
    type Item = StencilResult<Boundary>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.span.element(']') {
            Ok(Element::Item(boundary)) => Some(Ok(boundary)),
            Ok(Element::Last(boundary)) => {
                self.done = true;
                Some(Ok(boundary))
            }
            Ok(Element::End) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazy sequence of dict `(key, value boundary)` pairs
pub struct DictSplit<'r, R: Read + ?Sized> {
    span: Span<'r, R>,
    key_kind: ScalarKind,
    done: bool,
}

/// Outcome of scanning one dict entry
enum Entry {
    Pair(Key, Boundary),
    Last(Key, Boundary),
    End,
}

/// Scan one `"key": value` entry of a dict
fn entry<R: Read + ?Sized>(span: &mut Span<'_, R>, key_kind: ScalarKind) -> StencilResult<Entry> {
    let Some(key_token) = next_token(&mut span.lexer)? else {
        return Err(StencilError::MalformedInput(
            "unbalanced nesting: input ended inside a dict".to_string(),
        ));
    };
    if key_token.is('}') {
        if span.produced {
            return Err(unexpected(&key_token, "a key"));
        }
        expect_end(&mut span.lexer)?;
        return Ok(Entry::End);
    }
    if !key_token.value.starts_with('"') {
        return Err(unexpected(&key_token, "a string key"));
    }
    let key = parse_key(&key_token.value, key_kind)?;

    match next_token(&mut span.lexer)? {
        Some(t) if t.is(':') => {}
        Some(t) => return Err(unexpected(&t, "':'")),
        None => {
            return Err(StencilError::MalformedInput(
                "unbalanced nesting: input ended after a dict key".to_string(),
            ));
        }
    }

    match span.element('}')? {
        Element::Item(boundary) => Ok(Entry::Pair(key, boundary)),
        Element::Last(boundary) => Ok(Entry::Last(key, boundary)),
        Element::End => Err(StencilError::MalformedInput(format!(
            "missing value for key {key}"
        ))),
    }
}

impl<R: Read + ?Sized> DictSplit<'_, R> {
    fn entry(&mut self) -> StencilResult<Option<(Key, Boundary)>> {
        match entry(&mut self.span, self.key_kind)? {
            Entry::Pair(key, boundary) => Ok(Some((key, boundary))),
            Entry::Last(key, boundary) => {
                self.done = true;
                Ok(Some((key, boundary)))
            }
            Entry::End => {
                self.done = true;
                Ok(None)
            }
        }
    }
}

impl<R: Read + ?Sized> Iterator for DictSplit<'_, R> {
    type Item = StencilResult<(Key, Boundary)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Resumable position inside a container.
///
/// Unlike [`ListSplit`] and [`DictSplit`], a cursor does not hold the
/// resource between steps, so the caller may read other ranges of the same
/// handle (for instance parse the boundary just returned) before stepping
/// again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCursor {
    position: u64,
    end: Option<u64>,
    produced: bool,
    done: bool,
}

impl SplitCursor {
    fn open<R: Read + Seek + ?Sized>(
        resource: &mut R,
        offset: u64,
        length: Option<u64>,
        opener: char,
    ) -> StencilResult<Option<Self>> {
        let mut lexer = tokens(resource, offset, length)?;
        match next_token(&mut lexer)? {
            Some(t) if t.is(opener) => Ok(Some(Self {
                position: lexer.position(),
                end: length.map(|len| offset + len),
                produced: false,
                done: false,
            })),
            Some(t) if t.value == "null" => expect_end(&mut lexer).map(|()| None),
            Some(t) => Err(unexpected(&t, &format!("'{opener}' or null"))),
            None => Err(StencilError::MalformedInput(format!(
                "expected '{opener}' at byte {offset}, found end of input"
            ))),
        }
    }

    /// Open the list at `offset`; `None` when it is the literal `null`
    pub fn list<R: Read + Seek + ?Sized>(
        resource: &mut R,
        offset: u64,
        length: Option<u64>,
    ) -> StencilResult<Option<Self>> {
        Self::open(resource, offset, length, '[')
    }

    /// Open the dict at `offset`; `None` when it is the literal `null`
    pub fn dict<R: Read + Seek + ?Sized>(
        resource: &mut R,
        offset: u64,
        length: Option<u64>,
    ) -> StencilResult<Option<Self>> {
        Self::open(resource, offset, length, '{')
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn resume<'r, R: Read + Seek + ?Sized>(
        &self,
        resource: &'r mut R,
    ) -> StencilResult<Span<'r, R>> {
        let length = self.end.map(|end| end.saturating_sub(self.position));
        let lexer = tokens(resource, self.position, length)?;
        Ok(Span {
            lexer,
            produced: self.produced,
        })
    }

    fn settle<R: Read + ?Sized>(&mut self, span: &Span<'_, R>) {
        self.position = span.lexer.position();
        self.produced = span.produced;
    }

    /// Next list element boundary
    pub fn next_item<R: Read + Seek + ?Sized>(
        &mut self,
        resource: &mut R,
    ) -> StencilResult<Option<Boundary>> {
        if self.done {
            return Ok(None);
        }
        let mut span = self.resume(resource)?;
        let element = span.element(']');
        self.settle(&span);
        match element {
            Ok(Element::Item(boundary)) => Ok(Some(boundary)),
            Ok(Element::Last(boundary)) => {
                self.done = true;
                Ok(Some(boundary))
            }
            Ok(Element::End) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Next dict entry, its key decoded as `key_kind`
    pub fn next_entry<R: Read + Seek + ?Sized>(
        &mut self,
        resource: &mut R,
        key_kind: ScalarKind,
    ) -> StencilResult<Option<(Key, Boundary)>> {
        if self.done {
            return Ok(None);
        }
        let mut span = self.resume(resource)?;
        let scanned = entry(&mut span, key_kind);
        self.settle(&span);
        match scanned {
            Ok(Entry::Pair(key, boundary)) => Ok(Some((key, boundary))),
            Ok(Entry::Last(key, boundary)) => {
                self.done = true;
                Ok(Some((key, boundary)))
            }
            Ok(Entry::End) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }
}
