//! Stream handles and the stream registry
//!
//! A stream is an opaque handle (`'$stream'(Id)` at the term level) carrying
//! its mode, type, optional alias, eof action, and a buffered source or
//! sink. The registry is owned by the machine; closing a stream removes it
//! and its alias. Identity and lifecycle are what the engine cares about;
//! the byte-level plumbing below is deliberately plain.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};

use super::term::{Atom, Term};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StreamMode {
    Read,
    Write,
    Append,
}

impl StreamMode {
    pub fn name(self) -> &'static str {
        match self {
            StreamMode::Read => "read",
            StreamMode::Write => "write",
            StreamMode::Append => "append",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StreamType {
    Text,
    Binary,
}

impl StreamType {
    pub fn name(self) -> &'static str {
        match self {
            StreamType::Text => "text",
            StreamType::Binary => "binary",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EofAction {
    Error,
    EofCode,
    Reset,
}

impl EofAction {
    pub fn name(self) -> &'static str {
        match self {
            EofAction::Error => "error",
            EofAction::EofCode => "eof_code",
            EofAction::Reset => "reset",
        }
    }
}

enum Channel {
    Source(BufReader<Box<dyn Read>>),
    Sink(BufWriter<Box<dyn Write>>),
}

/// One open stream.
pub struct Stream {
    pub id: u64,
    pub mode: StreamMode,
    pub typ: StreamType,
    pub alias: Option<Atom>,
    pub eof_action: EofAction,
    pub reposition: bool,
    pub file_name: Option<String>,
    channel: Channel,
    /// One-character pushback, for `peek_char/2`.
    pushback: Option<char>,
    /// Character position, reported by the `position/1` property.
    position: u64,
    past_eof: bool,
}

impl Stream {
    pub fn is_input(&self) -> bool {
        matches!(self.channel, Channel::Source(_))
    }

    pub fn is_output(&self) -> bool {
        matches!(self.channel, Channel::Sink(_))
    }

    /// The term handle for this stream.
    pub fn term(&self) -> Term {
        stream_term(self.id)
    }

    /// Read one character, honoring pushback. `None` is end of stream.
    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback.take() {
            self.position += 1;
            return Ok(Some(c));
        }
        let r = match &mut self.channel {
            Channel::Source(r) => r,
            Channel::Sink(_) => return Err(io::Error::new(io::ErrorKind::Unsupported, "output stream")),
        };
        match next_utf8_char(r)? {
            Some(c) => {
                self.position += 1;
                Ok(Some(c))
            }
            None => {
                self.past_eof = true;
                Ok(None)
            }
        }
    }

    /// Look at the next character without consuming it.
    pub fn peek_char(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback {
            return Ok(Some(c));
        }
        match self.read_char()? {
            Some(c) => {
                self.position -= 1;
                self.pushback = Some(c);
                Ok(Some(c))
            }
            None => Ok(None),
        }
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        match &mut self.channel {
            Channel::Sink(w) => {
                w.write_all(s.as_bytes())?;
                self.position += s.chars().count() as u64;
                Ok(())
            }
            Channel::Source(_) => Err(io::Error::new(io::ErrorKind::Unsupported, "input stream")),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.channel {
            Channel::Sink(w) => w.flush(),
            Channel::Source(_) => Ok(()),
        }
    }

    /// The `end_of_stream/1` property value: `not`, `at`, or `past`.
    pub fn end_of_stream(&mut self) -> &'static str {
        if self.past_eof {
            return "past";
        }
        match self.peek_char() {
            Ok(Some(_)) => "not",
            Ok(None) => "at",
            Err(_) => "not",
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Decode a single UTF-8 character from a byte source.
fn next_utf8_char(r: &mut impl Read) -> io::Result<Option<char>> {
    let mut first = [0u8; 1];
    match r.read(&mut first) {
        Ok(0) => return Ok(None),
        Ok(_) => {}
        Err(e) => return Err(e),
    }
    let b = first[0];
    let width = match b {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8")),
    };
    let mut buf = [b, 0, 0, 0];
    if width > 1 {
        r.read_exact(&mut buf[1..width])?;
    }
    match std::str::from_utf8(&buf[..width]) {
        Ok(s) => Ok(s.chars().next()),
        Err(_) => Err(io::Error::new(io::ErrorKind::InvalidData, "invalid utf-8")),
    }
}

/// The `'$stream'(Id)` handle term.
pub fn stream_term(id: u64) -> Term {
    Term::compound("$stream", vec![Term::Integer(id as i64)])
}

/// Recover a stream id from a `'$stream'(Id)` handle term.
pub fn term_stream_id(t: &Term) -> Option<u64> {
    let c = t.as_functor("$stream", 1)?;
    match c.args[0] {
        Term::Integer(i) if i >= 0 => Some(i as u64),
        _ => None,
    }
}

/// All open streams plus the current input/output selection.
pub struct StreamRegistry {
    streams: HashMap<u64, Stream>,
    aliases: HashMap<Atom, u64>,
    next_id: u64,
    current_input: u64,
    current_output: u64,
}

impl StreamRegistry {
    /// A registry with `user_input` and `user_output` attached to stdio.
    pub fn new() -> Self {
        let mut reg = StreamRegistry {
            streams: HashMap::new(),
            aliases: HashMap::new(),
            next_id: 0,
            current_input: 0,
            current_output: 0,
        };
        let stdin = reg.insert(
            Channel::Source(BufReader::new(Box::new(io::stdin()) as Box<dyn Read>)),
            StreamMode::Read,
            Some(Atom::new("user_input")),
            None,
        );
        let stdout = reg.insert(
            Channel::Sink(BufWriter::new(Box::new(io::stdout()) as Box<dyn Write>)),
            StreamMode::Write,
            Some(Atom::new("user_output")),
            None,
        );
        reg.current_input = stdin;
        reg.current_output = stdout;
        reg
    }

    fn insert(
        &mut self,
        channel: Channel,
        mode: StreamMode,
        alias: Option<Atom>,
        file_name: Option<String>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        let reposition = file_name.is_some() && mode == StreamMode::Read;
        let s = Stream {
            id,
            mode,
            typ: StreamType::Text,
            alias,
            eof_action: EofAction::EofCode,
            reposition,
            file_name,
            channel,
            pushback: None,
            position: 0,
            past_eof: false,
        };
        if let Some(a) = alias {
            self.aliases.insert(a, id);
        }
        self.streams.insert(id, s);
        id
    }

    /// Open a file stream. Returns the new stream id.
    pub fn open(&mut self, path: &str, mode: StreamMode, alias: Option<Atom>) -> io::Result<u64> {
        let channel = match mode {
            StreamMode::Read => {
                let f = File::open(path)?;
                Channel::Source(BufReader::new(Box::new(f) as Box<dyn Read>))
            }
            StreamMode::Write => {
                let f = File::create(path)?;
                Channel::Sink(BufWriter::new(Box::new(f) as Box<dyn Write>))
            }
            StreamMode::Append => {
                let f = OpenOptions::new().create(true).append(true).open(path)?;
                Channel::Sink(BufWriter::new(Box::new(f) as Box<dyn Write>))
            }
        };
        Ok(self.insert(channel, mode, alias, Some(path.to_string())))
    }

    /// Close and remove a stream; its alias (if any) dies with it.
    pub fn close(&mut self, id: u64) -> io::Result<()> {
        if let Some(mut s) = self.streams.remove(&id) {
            if let Some(a) = s.alias {
                self.aliases.remove(&a);
            }
            s.flush()?;
        }
        Ok(())
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Stream> {
        self.streams.get_mut(&id)
    }

    pub fn get(&self, id: u64) -> Option<&Stream> {
        self.streams.get(&id)
    }

    pub fn by_alias(&self, alias: Atom) -> Option<u64> {
        self.aliases.get(&alias).copied()
    }

    pub fn set_alias(&mut self, alias: Atom, id: u64) {
        self.aliases.insert(alias, id);
        if let Some(s) = self.streams.get_mut(&id) {
            s.alias = Some(alias);
        }
    }

    pub fn current_input(&self) -> u64 {
        self.current_input
    }

    pub fn current_output(&self) -> u64 {
        self.current_output
    }

    pub fn set_current_input(&mut self, id: u64) {
        self.current_input = id;
    }

    pub fn set_current_output(&mut self, id: u64) {
        self.current_output = id;
    }

    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.streams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        StreamRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trip() {
        let t = stream_term(7);
        assert_eq!(term_stream_id(&t), Some(7));
        assert_eq!(term_stream_id(&Term::atom("user_input")), None);
    }

    #[test]
    fn test_registry_defaults() {
        let reg = StreamRegistry::new();
        let input = reg.by_alias(Atom::new("user_input")).unwrap();
        let output = reg.by_alias(Atom::new("user_output")).unwrap();
        assert_eq!(reg.current_input(), input);
        assert_eq!(reg.current_output(), output);
        assert!(reg.get(input).unwrap().is_input());
        assert!(reg.get(output).unwrap().is_output());
    }

    #[test]
    fn test_close_removes_alias() {
        let mut reg = StreamRegistry::new();
        let id = reg.by_alias(Atom::new("user_input")).unwrap();
        reg.close(id).unwrap();
        assert!(reg.by_alias(Atom::new("user_input")).is_none());
        assert!(reg.get(id).is_none());
    }
}
