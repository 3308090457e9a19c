//! Incremental text parser for the extended OpenStep plist grammar.
//!
//! The parser is a cooperative state machine driven by byte chunks:
//!
//! ```text
//!   plist  = value
//!   value  = dict | array | data | date | string | bool | number
//!   dict   = "{" ( key ":" value ";" )* "}"
//!   array  = "(" ( value ( "," value )* )? ")"
//!   data   = "<" hexbyte* ">"
//!   date   = "<*D" yyyy "-" mm "-" dd " " HH ":" MM ":" SS " " tz ">"
//!   string = '"' ( char | "\" esc )* '"'
//!   bool   = "true" | "false"        (case-insensitive)
//!   number = ["-"] digit+ [ "." | e-notation ... ]
//! ```
//!
//! Chunk boundaries may fall anywhere, including inside a token. Partial
//! token bytes are staged in a [`ScanBuf`] and a continuation state records
//! the little that is not byte data (an escape flag, a literal match count),
//! so the next `feed` resumes exactly where the previous one stopped. Calls
//! never block or suspend; they only return.
//!
//! Errors are sticky: after a failed `feed` every further non-empty `feed`
//! keeps failing, and only [`Parser::result`] (which drops any partial tree)
//! makes the parser reusable.

use chrono::DateTime;

use crate::error::{PlistError, Result};
use crate::scan::ScanBuf;
use crate::tree::{NodeId, Payload, Tree};
use crate::types::Kind;

/// Format of a date token body, between `<*D` and `>`.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Parser state, one variant per continuation point.
///
/// `Scan` is the between-tokens dispatcher. The token states each cover a
/// token that may straddle a chunk boundary; `AngleOpen` and `DateMarker`
/// are the lookahead points where `<` has not yet resolved to data or date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scan,
    QuotedString { escape: bool },
    Number,
    Double,
    AngleOpen,
    DateMarker,
    Data,
    Date,
    True { matched: u8 },
    False { matched: u8 },
    Done,
    Failed,
}

/// Incremental plist text parser.
///
/// Feed it byte slices with [`Parser::feed`], then take the finished tree
/// with [`Parser::result`]. A parser can be reused for further documents
/// after each `result` call.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    tree: Tree,
    /// Completed or in-progress document root.
    root: Option<NodeId>,
    /// Innermost open container frame: a dict, key, or array.
    cur: Option<NodeId>,
    /// Whether the open key has seen its `:` separator.
    key_sep: bool,
    buf: ScanBuf,
}

impl Default for State {
    fn default() -> Self {
        State::Scan
    }
}

fn is_blank(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// One-byte escape translation inside a quoted string.
fn unescape_byte(b: u8) -> u8 {
    match b {
        b'b' => 0x08,
        b't' => 0x09,
        b'f' => 0x0c,
        b'n' => 0x0a,
        b'r' => 0x0d,
        // `\\`, `\/`, `\"` and everything else pass through unchanged.
        other => other,
    }
}

/// Decode accumulated hex digits into bytes. An odd digit count leaves the
/// final nibble as the high-order half of one extra byte, so the output
/// length is always `digits / 2 + digits % 2`.
fn decode_hex_digits(digits: &[u8]) -> Vec<u8> {
    fn nibble(b: u8) -> u8 {
        match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        }
    }
    let mut out = Vec::with_capacity(digits.len() / 2 + digits.len() % 2);
    let mut pairs = digits.chunks_exact(2);
    for pair in &mut pairs {
        out.push(nibble(pair[0]) << 4 | nibble(pair[1]));
    }
    if let [last] = pairs.remainder() {
        out.push(nibble(*last) << 4);
    }
    out
}

/// Convert a number token to a signed 64-bit integer, with the base
/// autodetected from the prefix: `0x` is hex, a leading `0` is octal,
/// anything else is decimal. Returns `None` when the token does not convert.
fn parse_integer_token(bytes: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?;
    let (negative, magnitude) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if magnitude.is_empty() {
        return None;
    }
    let value: i128 = if let Some(hex) = magnitude
        .strip_prefix("0x")
        .or_else(|| magnitude.strip_prefix("0X"))
    {
        if hex.is_empty() {
            return None;
        }
        i128::from_str_radix(hex, 16).ok()?
    } else if magnitude.len() > 1 && magnitude.starts_with('0') {
        i128::from_str_radix(&magnitude[1..], 8).ok()?
    } else {
        magnitude.parse::<i128>().ok()?
    };
    let value = if negative { -value } else { value };
    i64::try_from(value).ok()
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of input.
    ///
    /// An empty chunk is a no-op. A chunk that ends mid-token saves the
    /// partial progress and returns `Ok`; the next chunk resumes the token.
    /// Once the root value is complete, trailing blanks are accepted; any
    /// other byte is a parse error like any other, dropping the tree. After
    /// a parse error the parser stays failed until [`Parser::result`]
    /// resets it.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        let mut i = 0;
        while i < chunk.len() {
            let b = chunk[i];
            match self.state {
                State::Failed => return Err(PlistError::Invalid),
                State::Done => {
                    if !is_blank(b) {
                        return Err(self.fail());
                    }
                    i += 1;
                }
                State::Scan => {
                    i += 1;
                    match b {
                        _ if is_blank(b) => {}
                        b'{' => self.open_container(Payload::Dict { keys: Vec::new() })?,
                        b'}' => self.close_container(Kind::Dict)?,
                        b'(' => self.open_container(Payload::Array { elems: Vec::new() })?,
                        b')' => self.close_container(Kind::Array)?,
                        b',' => self.array_separator()?,
                        b':' => self.key_separator()?,
                        b';' => self.entry_terminator()?,
                        b'<' => {
                            self.buf.reset();
                            self.state = State::AngleOpen;
                        }
                        b'"' => {
                            self.buf.reset();
                            self.state = State::QuotedString { escape: false };
                        }
                        b'-' | b'0'..=b'9' => {
                            self.buf.reset();
                            self.push_buf(b)?;
                            self.state = State::Number;
                        }
                        b't' | b'T' => self.state = State::True { matched: 1 },
                        b'f' | b'F' => self.state = State::False { matched: 1 },
                        _ => return Err(self.fail()),
                    }
                }
                State::QuotedString { escape } => {
                    i += 1;
                    if escape {
                        self.push_buf(unescape_byte(b))?;
                        self.state = State::QuotedString { escape: false };
                    } else if b == b'\\' {
                        self.state = State::QuotedString { escape: true };
                    } else if b == b'"' {
                        let text = match std::str::from_utf8(self.buf.as_bytes()) {
                            Ok(text) => text.to_owned(),
                            Err(_) => return Err(self.fail()),
                        };
                        self.complete_value(Payload::String(text))?;
                    } else {
                        self.push_buf(b)?;
                    }
                }
                State::Number => {
                    if b == b'.' {
                        self.push_buf(b)?;
                        i += 1;
                        self.state = State::Double;
                    } else if (b == b'e' || b == b'E') && !self.hex_prefixed() {
                        self.push_buf(b)?;
                        i += 1;
                        self.state = State::Double;
                    } else if self.integer_byte_ok(b) {
                        self.push_buf(b)?;
                        i += 1;
                    } else {
                        // Terminator byte: finish the token and let Scan
                        // dispatch the byte on the next iteration.
                        let value = self.finish_integer()?;
                        self.complete_value(Payload::Integer(value))?;
                    }
                }
                State::Double => {
                    let exp_sign = (b == b'+' || b == b'-')
                        && matches!(self.buf.last(), Some(b'e') | Some(b'E'));
                    if b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || exp_sign {
                        self.push_buf(b)?;
                        i += 1;
                    } else {
                        let value = self.finish_real()?;
                        self.complete_value(Payload::Real(value))?;
                    }
                }
                State::AngleOpen => {
                    if b == b'*' {
                        i += 1;
                        self.state = State::DateMarker;
                    } else {
                        // Plain data; reprocess this byte as a hex digit.
                        self.state = State::Data;
                    }
                }
                State::DateMarker => {
                    i += 1;
                    if b == b'D' {
                        self.state = State::Date;
                    } else {
                        return Err(self.fail());
                    }
                }
                State::Data => {
                    i += 1;
                    if b.is_ascii_hexdigit() {
                        self.push_buf(b)?;
                    } else if is_blank(b) {
                        // Digits may be separated by blanks.
                    } else if b == b'>' {
                        let bytes = decode_hex_digits(self.buf.as_bytes());
                        self.complete_value(Payload::Data(bytes))?;
                    } else {
                        return Err(self.fail());
                    }
                }
                State::Date => {
                    i += 1;
                    if b == b'>' {
                        let when = match std::str::from_utf8(self.buf.as_bytes())
                            .ok()
                            .and_then(|s| DateTime::parse_from_str(s, DATE_FORMAT).ok())
                        {
                            Some(when) => when,
                            None => return Err(self.fail()),
                        };
                        self.complete_value(Payload::Date(when))?;
                    } else {
                        self.push_buf(b)?;
                    }
                }
                State::True { matched } => {
                    i += 1;
                    if b.to_ascii_lowercase() == b"true"[matched as usize] {
                        if matched == 3 {
                            self.complete_value(Payload::Boolean(true))?;
                        } else {
                            self.state = State::True { matched: matched + 1 };
                        }
                    } else {
                        return Err(self.fail());
                    }
                }
                State::False { matched } => {
                    i += 1;
                    if b.to_ascii_lowercase() == b"false"[matched as usize] {
                        if matched == 4 {
                            self.complete_value(Payload::Boolean(false))?;
                        } else {
                            self.state = State::False { matched: matched + 1 };
                        }
                    } else {
                        return Err(self.fail());
                    }
                }
            }
        }
        Ok(())
    }

    /// Take the finished document out of the parser.
    ///
    /// In `Done` this yields the tree and its root and resets the parser for
    /// the next document. A bare number root is finished here, since more
    /// digits could always have followed. In every other state the partial
    /// tree is dropped, the parser resets, and `NotFound` is returned.
    pub fn result(&mut self) -> Result<(Tree, NodeId)> {
        match self.state {
            State::Done => {}
            State::Number if self.cur.is_none() && self.root.is_none() => {
                let Some(value) = parse_integer_token(self.buf.as_bytes()) else {
                    self.reset();
                    return Err(PlistError::NotFound);
                };
                self.complete_value(Payload::Integer(value))?;
            }
            State::Double if self.cur.is_none() && self.root.is_none() => {
                let parsed = std::str::from_utf8(self.buf.as_bytes())
                    .ok()
                    .and_then(|s| s.parse::<f64>().ok());
                let Some(value) = parsed else {
                    self.reset();
                    return Err(PlistError::NotFound);
                };
                self.complete_value(Payload::Real(value))?;
            }
            _ => {
                self.reset();
                return Err(PlistError::NotFound);
            }
        }
        let Some(root) = self.root.take() else {
            self.reset();
            return Err(PlistError::NotFound);
        };
        let tree = std::mem::take(&mut self.tree);
        self.reset();
        Ok((tree, root))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn reset(&mut self) {
        self.state = State::Scan;
        self.tree = Tree::new();
        self.root = None;
        self.cur = None;
        self.key_sep = false;
        self.buf.reset();
    }

    /// Enter the sticky failed state, dropping the partial tree.
    fn fail(&mut self) -> PlistError {
        self.fail_with(PlistError::Invalid)
    }

    fn fail_with(&mut self, err: PlistError) -> PlistError {
        self.reset();
        self.state = State::Failed;
        err
    }

    fn push_buf(&mut self, b: u8) -> Result<()> {
        if let Err(err) = self.buf.push(b) {
            return Err(self.fail_with(err));
        }
        Ok(())
    }

    fn hex_prefixed(&self) -> bool {
        let bytes = self.buf.as_bytes();
        let digits = match bytes.first() {
            Some(b'-') => &bytes[1..],
            _ => bytes,
        };
        matches!(digits, [b'0', b'x', ..] | [b'0', b'X', ..])
    }

    /// Whether `b` can extend the integer token accumulated so far.
    fn integer_byte_ok(&self, b: u8) -> bool {
        if b.is_ascii_digit() {
            return true;
        }
        if b == b'x' || b == b'X' {
            // Only as the radix prefix right after a leading zero.
            return matches!(self.buf.as_bytes(), [b'0'] | [b'-', b'0']);
        }
        if b.is_ascii_hexdigit() {
            return self.hex_prefixed();
        }
        false
    }

    fn finish_integer(&mut self) -> Result<i64> {
        match parse_integer_token(self.buf.as_bytes()) {
            Some(value) => Ok(value),
            None => Err(self.fail()),
        }
    }

    fn finish_real(&mut self) -> Result<f64> {
        let parsed = std::str::from_utf8(self.buf.as_bytes())
            .ok()
            .and_then(|s| s.parse::<f64>().ok());
        match parsed {
            Some(value) => Ok(value),
            None => Err(self.fail()),
        }
    }

    /// Attach a completed scalar according to the innermost open frame, per
    /// the attach rule: root when nothing is open, element of an open array,
    /// new key of an open dict (strings only, unique names), or value of an
    /// open key.
    fn complete_value(&mut self, payload: Payload) -> Result<()> {
        self.buf.reset();
        let Some(cur) = self.cur else {
            if self.root.is_some() {
                return Err(self.fail());
            }
            let id = self.tree.new_node(payload);
            self.root = Some(id);
            self.state = State::Done;
            return Ok(());
        };
        match self.tree.kind(cur) {
            Some(Kind::Array) => {
                let id = self.tree.new_node(payload);
                self.tree.adopt(cur, id);
                self.state = State::Scan;
            }
            Some(Kind::Dict) => {
                // The next value inside a dict names the entry; it must be a
                // string, and the name must be new.
                let Payload::String(name) = payload else {
                    return Err(self.fail());
                };
                if self.tree.dict_has(cur, &name) {
                    return Err(self.fail());
                }
                let key = self.tree.new_key(name);
                self.tree.adopt(cur, key);
                self.cur = Some(key);
                self.key_sep = false;
                self.state = State::Scan;
            }
            Some(Kind::Key) => {
                if !self.key_sep || self.tree.key_value(cur).is_some() {
                    return Err(self.fail());
                }
                let id = self.tree.new_node(payload);
                self.tree.adopt(cur, id);
                self.state = State::Scan;
            }
            _ => return Err(self.fail()),
        }
        Ok(())
    }

    /// `{` or `(`: push a new container frame. Containers attach on open so
    /// their children have a parent to land in.
    fn open_container(&mut self, payload: Payload) -> Result<()> {
        let Some(cur) = self.cur else {
            if self.root.is_some() {
                return Err(self.fail());
            }
            let id = self.tree.new_node(payload);
            self.root = Some(id);
            self.cur = Some(id);
            self.state = State::Scan;
            return Ok(());
        };
        match self.tree.kind(cur) {
            Some(Kind::Array) => {
                let id = self.tree.new_node(payload);
                self.tree.adopt(cur, id);
                self.cur = Some(id);
            }
            Some(Kind::Key) => {
                if !self.key_sep || self.tree.key_value(cur).is_some() {
                    return Err(self.fail());
                }
                let id = self.tree.new_node(payload);
                self.tree.adopt(cur, id);
                self.cur = Some(id);
            }
            // A container cannot serve as a dict entry name.
            _ => return Err(self.fail()),
        }
        self.state = State::Scan;
        Ok(())
    }

    /// `}` or `)`: pop the innermost frame. A `}` tolerates a dangling key
    /// whose value just completed but whose `;` was omitted.
    fn close_container(&mut self, kind: Kind) -> Result<()> {
        let Some(mut cur) = self.cur else {
            return Err(self.fail());
        };
        if kind == Kind::Dict && self.tree.kind(cur) == Some(Kind::Key) {
            if self.tree.key_value(cur).is_none() {
                return Err(self.fail());
            }
            match self.tree.parent(cur) {
                Some(dict) => cur = dict,
                None => return Err(self.fail()),
            }
        }
        if self.tree.kind(cur) != Some(kind) {
            return Err(self.fail());
        }
        self.cur = self.tree.parent(cur);
        self.state = if self.cur.is_none() {
            State::Done
        } else {
            State::Scan
        };
        Ok(())
    }

    /// `,`: element separator, only meaningful inside an array frame.
    fn array_separator(&mut self) -> Result<()> {
        match self.cur.and_then(|cur| self.tree.kind(cur)) {
            Some(Kind::Array) => Ok(()),
            _ => Err(self.fail()),
        }
    }

    /// `:`: separates a key from its value, exactly once per entry.
    fn key_separator(&mut self) -> Result<()> {
        let Some(cur) = self.cur else {
            return Err(self.fail());
        };
        if self.tree.kind(cur) == Some(Kind::Key)
            && !self.key_sep
            && self.tree.key_value(cur).is_none()
        {
            self.key_sep = true;
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    /// `;`: closes a completed dict entry, returning to the dict frame.
    fn entry_terminator(&mut self) -> Result<()> {
        let Some(cur) = self.cur else {
            return Err(self.fail());
        };
        if self.tree.kind(cur) != Some(Kind::Key) || self.tree.key_value(cur).is_none() {
            return Err(self.fail());
        }
        self.cur = self.tree.parent(cur);
        Ok(())
    }
}
