//! The stack-based parsing state machine and its materializer.
//!
//! One frame per open container. Tokens from the chunked lexer drive the
//! per-frame transition tables; completed values are committed into the live
//! tree in byte-stream order, and an in-progress string value is installed
//! provisionally so snapshots can expose it before its closing quote
//! arrives. Partial object keys are never exposed.

use tracing::{debug, trace};

use crate::buffer::InputBuffer;
use crate::config::ParserConfig;
use crate::error::Malformed;
use crate::lexer::{self, Lexer, Scan, Token};
use crate::value::{Map, Value};

/// Which container shape a frame is building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Object,
    Array,
}

/// Per-frame expectation for the next token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    ObjectExpectKeyOrEnd,
    ObjectExpectColon,
    ObjectExpectValue,
    ObjectExpectCommaOrEnd,
    ArrayExpectValueOrEnd,
    ArrayExpectCommaOrEnd,
}

/// Where a frame's container is anchored inside its parent, so the live
/// tree stays a single physically-rooted value while open frames mutate
/// their own nesting level through it.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// The outermost container, owned by the parser directly.
    Root,
    /// The entry under this key in the parent object.
    Key(String),
    /// The last element of the parent array.
    Tail,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    state: FrameState,
    slot: Slot,
    /// Key whose value has not been committed yet.
    pending_key: Option<String>,
    /// The most recently installed value is a provisional string body.
    last_value_partial: bool,
}

impl Frame {
    fn open(kind: FrameKind, slot: Slot) -> Self {
        let state = match kind {
            FrameKind::Object => FrameState::ObjectExpectKeyOrEnd,
            FrameKind::Array => FrameState::ArrayExpectValueOrEnd,
        };
        Self {
            kind,
            state,
            slot,
            pending_key: None,
            last_value_partial: false,
        }
    }
}

fn expectation(state: FrameState) -> &'static str {
    match state {
        FrameState::ObjectExpectKeyOrEnd => "expected object key or '}'",
        FrameState::ObjectExpectColon => "expected ':' after object key",
        FrameState::ObjectExpectValue => "expected object value",
        FrameState::ObjectExpectCommaOrEnd => "expected ',' or '}' in object",
        FrameState::ArrayExpectValueOrEnd => "expected value or ']' in array",
        FrameState::ArrayExpectCommaOrEnd => "expected ',' or ']' in array",
    }
}

fn out_of_sync() -> Malformed {
    Malformed::new("live value out of sync with parse stack")
}

/// Incremental JSON parser.
///
/// Feed the document through [`consume`](Parser::consume) in as many chunks
/// as it happens to arrive in (tokens may split anywhere, including inside
/// escape sequences and multi-byte UTF-8 scalars) and read the current
/// best-effort snapshot with [`get`](Parser::get) at any point.
///
/// # Example
///
/// ```
/// use trickle_core::Parser;
///
/// let mut parser = Parser::new();
/// parser.consume(br#"{"city": "Zur"#)?;
/// assert_eq!(parser.get().unwrap().get("city").unwrap().as_str(), Some("Zur"));
///
/// parser.consume(br#"ich"}"#)?;
/// assert_eq!(parser.get().unwrap().get("city").unwrap().as_str(), Some("Zurich"));
/// # Ok::<(), trickle_core::Malformed>(())
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    buf: InputBuffer,
    lexer: Lexer,
    stack: Vec<Frame>,
    /// Root container under construction; moves to `root` when it closes.
    live: Option<Value>,
    root: Option<Value>,
    config: ParserConfig,
    failure: Option<Malformed>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> ParserConfig {
        self.config
    }

    /// True once the document root has closed; only trailing whitespace is
    /// accepted from then on.
    pub fn is_complete(&self) -> bool {
        self.root.is_some()
    }

    /// The error this parser failed with, if any.
    pub fn error(&self) -> Option<&Malformed> {
        self.failure.as_ref()
    }

    /// Append a chunk and advance parsing as far as the bytes allow.
    ///
    /// Returns `Ok` whether the document is now complete or still partial; a
    /// chunk boundary inside a token is normal. Empty input is a no-op.
    /// Returns the same [`Malformed`] as before for a parser that has
    /// already failed.
    pub fn consume(&mut self, bytes: &[u8]) -> Result<(), Malformed> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if bytes.is_empty() {
            return Ok(());
        }
        trace!(chunk = bytes.len(), buffered = self.buf.len(), "consume");
        match self.ingest(bytes) {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(error = %err, "parser entering failed state");
                self.failure = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Current snapshot: the completed root once the document has closed,
    /// the live partial tree while a container is open, `None` before the
    /// first container opens.
    ///
    /// Pure and O(1). Treat the returned value as read-only until the next
    /// `consume`. After a failure this keeps returning the last sound
    /// snapshot; transitions validate before mutating, so the tree is never
    /// torn.
    pub fn get(&self) -> Option<&Value> {
        self.root.as_ref().or(self.live.as_ref())
    }

    fn ingest(&mut self, bytes: &[u8]) -> Result<(), Malformed> {
        let retained = self.buf.len() + bytes.len();
        if retained > self.config.max_buffer_bytes {
            return Err(Malformed::new(format!(
                "retained input of {retained} bytes exceeds limit {}",
                self.config.max_buffer_bytes
            )));
        }
        self.buf.append(bytes);
        self.advance()?;
        if self.root.is_some() {
            self.buf.compact();
        }
        Ok(())
    }

    /// Run the lexer/state-machine loop to exhaustion or to a partial-token
    /// boundary.
    fn advance(&mut self) -> Result<(), Malformed> {
        loop {
            // Outside any container only `{` or `[` may appear, and only
            // while no root has been produced. Rejecting on the first byte
            // keeps "cannot begin a legal completion" errors immediate.
            if self.stack.is_empty() && self.lexer.is_idle() {
                let start = lexer::find_non_whitespace(self.buf.bytes(), self.buf.resume());
                self.buf.advance_to(start);
                let Some(byte) = self.buf.peek() else { break };
                if self.root.is_some() {
                    return Err(Malformed::at(
                        self.buf.offset(start),
                        "unexpected input after document end",
                    ));
                }
                if byte != b'{' && byte != b'[' {
                    return Err(Malformed::at(
                        self.buf.offset(start),
                        "document root must be an object or array",
                    ));
                }
            }

            match self.lexer.next_token(&mut self.buf)? {
                Scan::Token(token) => self.feed_token(token)?,
                Scan::NeedMore => {
                    // Surface the body scanned so far as a provisional
                    // string value; everything else stays withheld.
                    if let Some(text) = self.lexer.partial_string().map(str::to_owned) {
                        self.commit_string(text, false)?;
                    }
                    break;
                }
            }
        }
        Ok(())
    }

    fn feed_token(&mut self, token: Token) -> Result<(), Malformed> {
        match token {
            Token::LBrace => self.open_container(FrameKind::Object),
            Token::LBracket => self.open_container(FrameKind::Array),
            Token::RBrace => self.close_container(FrameKind::Object),
            Token::RBracket => self.close_container(FrameKind::Array),
            Token::Colon => self.colon(),
            Token::Comma => self.comma(),
            Token::Str { text, terminated } => self.commit_string(text, terminated),
            Token::Number(value) | Token::Literal(value) => self.install_value(value, false),
        }
    }

    fn open_container(&mut self, kind: FrameKind) -> Result<(), Malformed> {
        if self.stack.len() >= self.config.max_depth {
            return Err(Malformed::new(format!(
                "nesting depth {} exceeds limit {}",
                self.stack.len() + 1,
                self.config.max_depth
            )));
        }
        let container = match kind {
            FrameKind::Object => Value::Object(Map::new()),
            FrameKind::Array => Value::Array(Vec::new()),
        };

        let Some(parent) = self.stack.last() else {
            // double roots are already rejected before lexing
            self.live = Some(container);
            self.stack.push(Frame::open(kind, Slot::Root));
            return Ok(());
        };

        let opener = match kind {
            FrameKind::Object => '{',
            FrameKind::Array => '[',
        };
        let slot = match parent.state {
            FrameState::ObjectExpectValue => {
                let key = parent.pending_key.clone().ok_or_else(out_of_sync)?;
                Slot::Key(key)
            }
            FrameState::ArrayExpectValueOrEnd => Slot::Tail,
            state => {
                return Err(Malformed::new(format!(
                    "unexpected '{opener}', {}",
                    expectation(state)
                )));
            }
        };

        // install the empty container in the parent, then step into it
        match (&slot, self.top_container_mut()?) {
            (Slot::Key(key), Value::Object(map)) => map.insert(key.clone(), container),
            (Slot::Tail, Value::Array(items)) => items.push(container),
            _ => return Err(out_of_sync()),
        }
        let parent = self.stack.last_mut().ok_or_else(out_of_sync)?;
        parent.pending_key = None;
        parent.state = match parent.kind {
            FrameKind::Object => FrameState::ObjectExpectCommaOrEnd,
            FrameKind::Array => FrameState::ArrayExpectCommaOrEnd,
        };
        self.stack.push(Frame::open(kind, slot));
        Ok(())
    }

    fn close_container(&mut self, kind: FrameKind) -> Result<(), Malformed> {
        let closer = match kind {
            FrameKind::Object => '}',
            FrameKind::Array => ']',
        };
        let Some(frame) = self.stack.last() else {
            return Err(Malformed::new(format!(
                "unexpected '{closer}' outside any container"
            )));
        };
        if frame.kind != kind {
            return Err(Malformed::new(format!(
                "mismatched '{closer}' closing {}",
                match frame.kind {
                    FrameKind::Object => "an object",
                    FrameKind::Array => "an array",
                }
            )));
        }

        let state = frame.state;
        match state {
            FrameState::ObjectExpectCommaOrEnd | FrameState::ArrayExpectCommaOrEnd => {}
            FrameState::ObjectExpectKeyOrEnd | FrameState::ArrayExpectValueOrEnd => {
                // `{}` and `[]` close; `{"a":1,}` and `[1,]` do not
                if !self.top_container_is_empty()? {
                    return Err(Malformed::new(format!("trailing ',' before '{closer}'")));
                }
            }
            state => {
                return Err(Malformed::new(format!(
                    "unexpected '{closer}', {}",
                    expectation(state)
                )));
            }
        }

        self.stack.pop();
        if self.stack.is_empty() {
            self.root = self.live.take();
            debug!("document root closed");
        }
        Ok(())
    }

    fn colon(&mut self) -> Result<(), Malformed> {
        match self.stack.last_mut() {
            Some(frame) if frame.state == FrameState::ObjectExpectColon => {
                frame.state = FrameState::ObjectExpectValue;
                Ok(())
            }
            Some(frame) => Err(Malformed::new(format!(
                "unexpected ':', {}",
                expectation(frame.state)
            ))),
            None => Err(Malformed::new("unexpected ':' outside any container")),
        }
    }

    fn comma(&mut self) -> Result<(), Malformed> {
        match self.stack.last_mut() {
            Some(frame) if frame.state == FrameState::ObjectExpectCommaOrEnd => {
                frame.state = FrameState::ObjectExpectKeyOrEnd;
                Ok(())
            }
            Some(frame) if frame.state == FrameState::ArrayExpectCommaOrEnd => {
                frame.state = FrameState::ArrayExpectValueOrEnd;
                Ok(())
            }
            Some(frame) => Err(Malformed::new(format!(
                "unexpected ',', {}",
                expectation(frame.state)
            ))),
            None => Err(Malformed::new("unexpected ',' outside any container")),
        }
    }

    /// A string token. In key position only a terminated string becomes the
    /// pending key; a partial key is never exposed, its body just keeps
    /// accumulating in the lexer. Everywhere else strings are values.
    fn commit_string(&mut self, text: String, terminated: bool) -> Result<(), Malformed> {
        let state = match self.stack.last() {
            Some(frame) => frame.state,
            None => return Err(Malformed::new("string value outside any container")),
        };
        if state == FrameState::ObjectExpectKeyOrEnd {
            if terminated {
                let frame = self.stack.last_mut().ok_or_else(out_of_sync)?;
                frame.pending_key = Some(text);
                frame.state = FrameState::ObjectExpectColon;
            }
            return Ok(());
        }
        self.install_value(Value::String(text), !terminated)
    }

    /// Install a value in the top frame. A provisional string leaves the
    /// frame expecting the rest of the same value; the eventual terminated
    /// token replaces the provisional body and advances the frame.
    fn install_value(&mut self, value: Value, partial: bool) -> Result<(), Malformed> {
        let (state, replace) = match self.stack.last() {
            Some(frame) => (frame.state, frame.last_value_partial),
            None => return Err(Malformed::new("value outside any container")),
        };
        match state {
            FrameState::ObjectExpectValue => {
                let key = match &self.stack.last().ok_or_else(out_of_sync)?.pending_key {
                    Some(key) => key.clone(),
                    None => return Err(out_of_sync()),
                };
                match self.top_container_mut()? {
                    // Map::insert overwrites in place, which also covers
                    // growing a provisional string
                    Value::Object(map) => map.insert(key, value),
                    _ => return Err(out_of_sync()),
                }
                let frame = self.stack.last_mut().ok_or_else(out_of_sync)?;
                frame.last_value_partial = partial;
                if !partial {
                    frame.pending_key = None;
                    frame.state = FrameState::ObjectExpectCommaOrEnd;
                }
                Ok(())
            }
            FrameState::ArrayExpectValueOrEnd => {
                match self.top_container_mut()? {
                    Value::Array(items) => {
                        if replace {
                            match items.last_mut() {
                                Some(slot) => *slot = value,
                                None => return Err(out_of_sync()),
                            }
                        } else {
                            items.push(value);
                        }
                    }
                    _ => return Err(out_of_sync()),
                }
                let frame = self.stack.last_mut().ok_or_else(out_of_sync)?;
                frame.last_value_partial = partial;
                if !partial {
                    frame.state = FrameState::ArrayExpectCommaOrEnd;
                }
                Ok(())
            }
            state => Err(Malformed::new(format!(
                "unexpected value, {}",
                expectation(state)
            ))),
        }
    }

    /// Walk slot anchors from the live root down to the container owned by
    /// the top frame.
    fn top_container_mut(&mut self) -> Result<&mut Value, Malformed> {
        let mut current = self.live.as_mut().ok_or_else(out_of_sync)?;
        for frame in self.stack.iter().skip(1) {
            current = match (&frame.slot, current) {
                (Slot::Key(key), Value::Object(map)) => {
                    map.get_mut(key).ok_or_else(out_of_sync)?
                }
                (Slot::Tail, Value::Array(items)) => items.last_mut().ok_or_else(out_of_sync)?,
                _ => return Err(out_of_sync()),
            };
        }
        Ok(current)
    }

    fn top_container_is_empty(&mut self) -> Result<bool, Malformed> {
        match self.top_container_mut()? {
            Value::Object(map) => Ok(map.is_empty()),
            Value::Array(items) => Ok(items.is_empty()),
            _ => Err(out_of_sync()),
        }
    }
}
