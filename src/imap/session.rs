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

//! The live IMAP implementation of the session capability.

use std::cell::RefCell;
use std::io::{self, BufRead, Read, Write};
use std::net::{self, ToSocketAddrs};
use std::rc::Rc;
use std::str;

use lazy_static::lazy_static;
use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslVerifyMode};
use regex::bytes::Regex;

use super::client::{quote, Client};
use crate::dedup::session::{Seqnum, Session, SessionFactory};
use crate::support::config::Settings;
use crate::support::error::Error;

lazy_static! {
    static ref LITERAL: Regex = Regex::new(r#"\{([0-9]+)\}\r\n"#).unwrap();
}

/// Opens one `ImapSession` per `connect` call.
///
/// A single connector is shared by all workers; each connection it
/// opens belongs exclusively to the thread that asked for it.
pub struct ImapConnector {
    settings: Settings,
    trace: bool,
}

impl ImapConnector {
    pub fn new(settings: Settings, trace: bool) -> Self {
        ImapConnector { settings, trace }
    }
}

impl SessionFactory for ImapConnector {
    type Session = ImapSession;

    fn connect(&self) -> Result<ImapSession, Error> {
        let settings = &self.settings;
        let password = settings.password.as_deref().ok_or_else(|| {
            Error::AuthRejected("no password configured".to_owned())
        })?;

        let mut addresses =
            (&settings.host as &str, settings.port).to_socket_addrs()?;
        let address = addresses.next().ok_or_else(|| {
            Error::Io(io::Error::new(io::ErrorKind::Other, "Host not found"))
        })?;

        let tcp_stream = net::TcpStream::connect(address)?;

        let mut client = if settings.plaintext {
            wrap_stream(tcp_stream, self.trace)
        } else {
            let mut connector = SslConnector::builder(SslMethod::tls())?;
            if settings.allow_insecure_tls_connections {
                connector.set_verify(SslVerifyMode::NONE);
            }

            let ssl_stream = connector
                .build()
                .connect(&settings.host, tcp_stream)
                .map_err(|e| match e {
                    HandshakeError::SetupFailure(es) => Error::Ssl(es),
                    HandshakeError::Failure(f) => Error::Tls(f.into_error()),
                    HandshakeError::WouldBlock(_) => unreachable!(),
                })?;
            wrap_stream(ssl_stream, self.trace)
        };

        client.read_greeting()?;

        let login = format!(
            "LOGIN {} {}",
            quote(&settings.user),
            quote(password)
        );
        let response = client.command_censored(&login, "LOGIN <censored>")?;
        if let Err(Error::CommandRejected { message, .. }) =
            response.ok("LOGIN")
        {
            return Err(Error::AuthRejected(message));
        }

        Ok(ImapSession { client })
    }
}

fn wrap_stream<S: Read + Write + 'static>(
    stream: S,
    trace: bool,
) -> Client<Box<dyn BufRead>, Box<dyn Write>> {
    let write = RcIo(Rc::new(RefCell::new(stream)));
    let read = io::BufReader::new(write.clone());
    Client::new(
        Box::new(read),
        Box::new(write),
        if trace { Some("") } else { None },
    )
}

pub struct ImapSession {
    client: Client<Box<dyn BufRead>, Box<dyn Write>>,
}

impl Session for ImapSession {
    fn list_folders(&mut self) -> Result<Vec<String>, Error> {
        let response = self.client.command("LIST \"\" \"*\"")?.ok("LIST")?;
        Ok(response
            .untagged
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .filter(|line| {
                let bytes = line.as_bytes();
                bytes.len() >= 7 && bytes[..7].eq_ignore_ascii_case(b"* LIST ")
            })
            .collect())
    }

    fn select(
        &mut self,
        raw_name: &str,
        read_only: bool,
    ) -> Result<(), Error> {
        let verb = if read_only { "EXAMINE" } else { "SELECT" };
        self.client
            .command(&format!("{} {}", verb, quote(raw_name)))?
            .ok(verb)?;
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<Seqnum>, Error> {
        let response = self.client.command("SEARCH ALL")?.ok("SEARCH")?;

        let mut seqnums = Vec::new();
        for line in &response.untagged {
            let line = String::from_utf8_lossy(line);
            let mut words = line.split_whitespace();
            if Some("*") != words.next() {
                continue;
            }
            if !words.next().map_or(false, |w| w.eq_ignore_ascii_case("SEARCH"))
            {
                continue;
            }

            for word in words {
                match word.parse::<Seqnum>() {
                    Ok(seqnum) => seqnums.push(seqnum),
                    Err(_) => {
                        return Err(Error::Protocol(format!(
                            "malformed SEARCH response: {}",
                            line
                        )))
                    },
                }
            }
        }

        Ok(seqnums)
    }

    fn fetch_headers(&mut self, seqnum: Seqnum) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .command(&format!("FETCH {} (RFC822.HEADER)", seqnum))?
            .ok("FETCH")?;

        // The header block arrives as a literal embedded in an untagged
        // FETCH line. Unrelated untagged responses have no literal and
        // are skipped.
        for line in &response.untagged {
            let captures = match LITERAL.captures(line) {
                Some(captures) => captures,
                None => continue,
            };

            let len = str::from_utf8(captures.get(1).unwrap().as_bytes())
                .expect("Matched invalid UTF-8 inside literal start?")
                .parse::<usize>()
                .map_err(|_| {
                    Error::Protocol("oversized FETCH literal".to_owned())
                })?;
            let start = captures.get(0).unwrap().end();

            if line.len().saturating_sub(start) < len {
                return Err(Error::Protocol(
                    "truncated FETCH literal".to_owned(),
                ));
            }
            return Ok(line[start..start + len].to_vec());
        }

        Err(Error::Protocol(format!(
            "FETCH {} returned no header literal",
            seqnum
        )))
    }

    fn mark_deleted(&mut self, seqnum: Seqnum) -> Result<(), Error> {
        self.client
            .command(&format!(
                "STORE {} +FLAGS.SILENT (\\Deleted)",
                seqnum
            ))?
            .ok("STORE")?;
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), Error> {
        self.client.command("EXPUNGE")?.ok("EXPUNGE")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        // CLOSE is invalid when nothing was ever selected; LOGOUT is
        // what actually matters.
        let _ = self.client.command("CLOSE");
        self.client.command("LOGOUT")?.ok("LOGOUT")?;
        Ok(())
    }
}

/// Shared-stream adaptor so one socket can serve as both the buffered
/// reader and the writer of a `Client`.
#[derive(Debug)]
struct RcIo<T>(Rc<RefCell<T>>);

impl<T> Clone for RcIo<T> {
    fn clone(&self) -> Self {
        RcIo(Rc::clone(&self.0))
    }
}

impl<T: Read> Read for RcIo<T> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        self.0.borrow_mut().read(dst)
    }
}

impl<T: Write> Write for RcIo<T> {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(src)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}
