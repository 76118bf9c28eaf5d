//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of Dedumap.
//
// Dedumap is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Dedumap is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along
// with Dedumap. If not, see <http://www.gnu.org/licenses/>.

//! A minimal tagged-command IMAP client.
//!
//! **THIS IS NOT A GENERAL-PURPOSE IMAP CLIENT.** It understands exactly
//! as much of the protocol as the deduplicator needs: send one command,
//! collect the untagged response lines (with any literals read inline),
//! and parse the tagged completion. Response lines are handed back as
//! raw bytes; the callers that know what a LIST or SEARCH line looks
//! like do their own parsing.

use std::io::{self, BufRead, Read, Write};
use std::str;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::support::error::Error;

lazy_static! {
    static ref LITERAL_AT_EOL: Regex =
        Regex::new(r#"~?\{([0-9]+)\}\r\n$"#).unwrap();
}

/// Condition of a tagged command completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Ok,
    No,
    Bad,
}

/// Everything the server sent in response to one command.
#[derive(Debug)]
pub struct CommandResponse {
    /// The untagged (`*`-prefixed) logical lines that preceded the
    /// completion, trailing CRLF stripped, literal contents inline.
    pub untagged: Vec<Vec<u8>>,
    pub condition: Condition,
    /// Human-readable text from the tagged completion line.
    pub message: String,
}

impl CommandResponse {
    /// Fail with `CommandRejected` unless the completion was `OK`.
    pub fn ok(self, command: &'static str) -> Result<Self, Error> {
        match self.condition {
            Condition::Ok => Ok(self),
            _ => Err(Error::CommandRejected {
                command,
                message: self.message,
            }),
        }
    }
}

pub struct Client<R, W> {
    read: R,
    write: W,
    trace_stderr: Option<&'static str>,
    next_tag: u64,
}

impl<R: BufRead, W: Write> Client<R, W> {
    pub fn new(read: R, write: W, trace_stderr: Option<&'static str>) -> Self {
        Client {
            read,
            write,
            trace_stderr,
            next_tag: 0,
        }
    }

    /// Read the server greeting that opens every connection.
    pub fn read_greeting(&mut self) -> Result<(), Error> {
        let mut line = Vec::new();
        self.read_logical_line(&mut line)?;
        if line.len() >= 4 && line[..4].eq_ignore_ascii_case(b"* OK") {
            Ok(())
        } else {
            Err(Error::BadGreeting(
                String::from_utf8_lossy(&line).trim().to_owned(),
            ))
        }
    }

    /// Send `cmd` (without tag or line ending) and collect the response.
    pub fn command(&mut self, cmd: &str) -> Result<CommandResponse, Error> {
        self.run_command(cmd, None)
    }

    /// Like `command`, but the wire trace shows `display` instead of the
    /// command text. Used for anything carrying credentials.
    pub fn command_censored(
        &mut self,
        cmd: &str,
        display: &str,
    ) -> Result<CommandResponse, Error> {
        self.run_command(cmd, Some(display))
    }

    fn run_command(
        &mut self,
        cmd: &str,
        display: Option<&str>,
    ) -> Result<CommandResponse, Error> {
        let tag = self.next_tag;
        self.next_tag += 1;

        let line = format!("{} {}\r\n", tag, cmd);
        match display {
            Some(display) => {
                self.trace(">>", format!("{} {}", tag, display).as_bytes())
            },
            None => self.trace(">>", line.as_bytes()),
        }
        self.write.write_all(line.as_bytes())?;
        self.write.flush()?;

        self.read_until_tagged(&tag.to_string())
    }

    fn read_until_tagged(
        &mut self,
        tag: &str,
    ) -> Result<CommandResponse, Error> {
        let mut untagged = Vec::new();
        loop {
            let mut line = Vec::new();
            self.read_logical_line(&mut line)?;
            line.truncate(line.len() - 2);

            if Some(&b'*') == line.first() || Some(&b'+') == line.first() {
                untagged.push(line);
                continue;
            }

            let text = String::from_utf8_lossy(&line).into_owned();
            let mut words = text.splitn(3, ' ');
            let line_tag = words.next().unwrap_or("");
            let condition = words.next().unwrap_or("");
            let message = words.next().unwrap_or("").to_owned();

            if line_tag != tag {
                return Err(Error::Protocol(format!(
                    "response for unexpected tag: {}",
                    text
                )));
            }

            let condition = if condition.eq_ignore_ascii_case("OK") {
                Condition::Ok
            } else if condition.eq_ignore_ascii_case("NO") {
                Condition::No
            } else if condition.eq_ignore_ascii_case("BAD") {
                Condition::Bad
            } else {
                return Err(Error::Protocol(format!(
                    "unparseable tagged response: {}",
                    text
                )));
            };

            return Ok(CommandResponse {
                untagged,
                condition,
                message,
            });
        }
    }

    /// Read one logical response line into `dst`.
    ///
    /// If a raw line announces a literal with `{n}` at its end, the
    /// literal's bytes and the raw line continuing after them are read
    /// as part of the same logical line.
    fn read_logical_line(&mut self, dst: &mut Vec<u8>) -> Result<(), Error> {
        loop {
            let start = dst.len();
            let nread = self.read.read_until(b'\n', dst)?;
            self.trace("<<", &dst[start..]);

            if !dst.ends_with(b"\r\n") {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Line didn't end with CRLF",
                )));
            }

            let literal_len = LITERAL_AT_EOL
                .captures(&dst[dst.len() - nread..])
                .and_then(|cap| {
                    str::from_utf8(cap.get(1).unwrap().as_bytes())
                        .expect("Matched invalid UTF-8 inside literal start?")
                        .parse::<u32>()
                        .ok()
                });

            let literal_len = match literal_len {
                Some(n) => n,
                None => return Ok(()),
            };

            let literal_start = dst.len();
            let nread = self
                .read
                .by_ref()
                .take(literal_len.into())
                .read_to_end(dst)?;
            self.trace("<<", &dst[literal_start..]);
            if (nread as u64) < u64::from(literal_len) {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Hit EOF before end of literal",
                )));
            }
        }
    }

    fn trace(&self, what: &str, data: &[u8]) {
        if let Some(prefix) = self.trace_stderr {
            let (data, truncated) = data.split_at(data.len().min(256));

            let mut vis = String::new();
            for &byte in data {
                match byte {
                    b' '..=b'~' => vis.push(byte as char),
                    b'\n' => vis.push_str("\\n"),
                    b'\r' => vis.push_str("\\r"),
                    b => vis.push_str(&format!("\\x{:02X}", b)),
                }
            }
            eprintln!("{}WIRE {} {}", prefix, what, vis);

            if !truncated.is_empty() {
                eprintln!(
                    "{}WIRE {} <{} more bytes>",
                    prefix,
                    what,
                    truncated.len()
                );
            }
        }
    }
}

/// Quote a string for transmission as an IMAP quoted string.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if '"' == ch || '\\' == ch {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn client(input: &str) -> Client<&[u8], Vec<u8>> {
        Client::new(input.as_bytes(), Vec::new(), None)
    }

    #[test]
    fn greeting_accepted() {
        let mut client =
            client("* OK [CAPABILITY IMAP4rev1] server ready\r\n");
        client.read_greeting().unwrap();
    }

    #[test]
    fn greeting_rejected() {
        let mut client = client("* BYE go away\r\n");
        assert_matches!(
            Err(Error::BadGreeting(..)),
            client.read_greeting()
        );
    }

    #[test]
    fn simple_command_round_trip() {
        let mut client = client(
            "* LIST (\\HasNoChildren) \".\" \"INBOX\"\r\n\
             0 OK LIST completed\r\n",
        );
        let response = client.command("LIST \"\" \"*\"").unwrap();
        assert_eq!(Condition::Ok, response.condition);
        assert_eq!(1, response.untagged.len());
        assert_eq!(
            b"* LIST (\\HasNoChildren) \".\" \"INBOX\"" as &[u8],
            &response.untagged[0] as &[u8]
        );
        assert_eq!(b"0 LIST \"\" \"*\"\r\n" as &[u8], &client.write as &[u8]);
    }

    #[test]
    fn no_condition_reported() {
        let mut client = client("0 NO [NONEXISTENT] no such mailbox\r\n");
        let response = client.command("SELECT \"nope\"").unwrap();
        assert_eq!(Condition::No, response.condition);
        assert!(response.ok("SELECT").is_err());
    }

    #[test]
    fn literal_read_inline() {
        let mut client = client(
            "* 1 FETCH (RFC822.HEADER {5}\r\nABCDE)\r\n\
             0 OK FETCH completed\r\n",
        );
        let response = client.command("FETCH 1 (RFC822.HEADER)").unwrap();
        assert_eq!(1, response.untagged.len());
        assert_eq!(
            b"* 1 FETCH (RFC822.HEADER {5}\r\nABCDE)" as &[u8],
            &response.untagged[0] as &[u8]
        );
    }

    #[test]
    fn tag_mismatch_is_protocol_error() {
        let mut client = client("999 OK whatever\r\n");
        assert_matches!(
            Err(Error::Protocol(..)),
            client.command("NOOP")
        );
    }

    #[test]
    fn tags_increment() {
        let mut client = client(
            "0 OK done\r\n\
             1 OK done\r\n",
        );
        client.command("NOOP").unwrap();
        client.command("NOOP").unwrap();
        assert_eq!(
            b"0 NOOP\r\n1 NOOP\r\n" as &[u8],
            &client.write as &[u8]
        );
    }

    #[test]
    fn quoting() {
        assert_eq!("\"INBOX\"", quote("INBOX"));
        assert_eq!("\"a \\\"b\\\" c\"", quote("a \"b\" c"));
        assert_eq!("\"back\\\\slash\"", quote("back\\slash"));
    }
}
