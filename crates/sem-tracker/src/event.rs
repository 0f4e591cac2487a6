//! Wire protocol for the event channel.
//!
//! One ASCII line per event, `\n`-terminated: `REGISTER:<name>` or
//! `UNREGISTER:<name>`. The protocol defines no escaping, so a name must
//! not contain `:` or `\n`; [`validate_name`] enforces that on the writer
//! side while the parser stays liberal about anything the split rule
//! still accepts (an empty name, for instance).

use crate::error::TrackError;
use crate::error::TrackResult;

/// Longest encoded event line that is still one atomic pipe write.
pub const MAX_LINE_LEN: usize = libc::PIPE_BUF;

const REGISTER: &str = "REGISTER";
const UNREGISTER: &str = "UNREGISTER";

/// A tracking event carried over the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A named primitive is about to be created.
    Register(String),
    /// A named primitive has been released by its owner.
    Unregister(String),
}

impl Event {
    /// Parses one channel line, without its trailing newline.
    ///
    /// A missing colon, a second colon, or an unknown command token are
    /// recoverable parse errors; the consumer reports them and moves on.
    pub fn parse(line: &str) -> TrackResult<Event> {
        let (cmd, name) = line
            .split_once(':')
            .ok_or_else(|| TrackError::MalformedLine(line.to_string()))?;
        if name.contains(':') {
            return Err(TrackError::MalformedLine(line.to_string()));
        }
        match cmd {
            REGISTER => Ok(Event::Register(name.to_string())),
            UNREGISTER => Ok(Event::Unregister(name.to_string())),
            _ => Err(TrackError::UnknownCommand(cmd.to_string())),
        }
    }

    /// The resource name the event refers to.
    pub fn name(&self) -> &str {
        match self {
            Event::Register(name) | Event::Unregister(name) => name,
        }
    }

    /// Encodes the event as its wire line, trailing newline included.
    pub fn encode(&self) -> Vec<u8> {
        let line = match self {
            Event::Register(name) => format!("{REGISTER}:{name}\n"),
            Event::Unregister(name) => format!("{UNREGISTER}:{name}\n"),
        };
        line.into_bytes()
    }
}

/// Writer-side guard: the name must survive the line protocol unescaped
/// and keep the encoded event within one atomic pipe write.
pub fn validate_name(name: &str) -> TrackResult<()> {
    if name.is_empty()
        || name.contains(':')
        || name.contains('\n')
        || name.len() + UNREGISTER.len() + 2 > MAX_LINE_LEN
    {
        return Err(TrackError::InvalidName(name.to_string()));
    }
    Ok(())
}
