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

//! A scripted in-memory mail store for resolver and pool tests.
//!
//! The "server" lives behind an `Arc<Mutex<_>>` so that many mock
//! sessions, possibly on different threads, observe and record against
//! the same state, the way real sessions share one real server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::session::{Seqnum, Session, SessionFactory};
use crate::support::error::Error;

#[derive(Default)]
pub struct MockServer {
    /// Raw lines returned from the folder listing.
    pub list_lines: Vec<String>,
    /// Folder contents by raw name.
    pub folders: HashMap<String, MockFolder>,
    /// Every (folder, seqnum) marked deleted, in call order.
    pub deleted: Vec<(String, Seqnum)>,
    /// Folders for which EXPUNGE was issued.
    pub expunged: Vec<String>,
    pub connects: usize,
    pub finishes: usize,
}

#[derive(Default)]
pub struct MockFolder {
    /// Message header blocks; seqnum n is `messages[n - 1]`.
    pub messages: Vec<Vec<u8>>,
    pub unselectable: bool,
    pub fetch_failures: HashSet<Seqnum>,
    pub mark_failures: HashSet<Seqnum>,
}

impl MockFolder {
    pub fn with_messages(messages: Vec<Vec<u8>>) -> Self {
        MockFolder {
            messages,
            ..MockFolder::default()
        }
    }
}

/// Render a header block for a message with the given identity fields.
pub fn message(
    from: &str,
    subject: &str,
    date: &str,
    message_id: &str,
) -> Vec<u8> {
    format!(
        "From: {}\r\nSubject: {}\r\nDate: {}\r\nMessage-ID: {}\r\n\r\n",
        from, subject, date, message_id
    )
    .into_bytes()
}

pub struct MockConnector {
    pub server: Arc<Mutex<MockServer>>,
    pub fail_connect: bool,
}

impl MockConnector {
    pub fn new(server: MockServer) -> Self {
        MockConnector {
            server: Arc::new(Mutex::new(server)),
            fail_connect: false,
        }
    }

    /// Run `f` against the shared server state.
    pub fn inspect<R>(&self, f: impl FnOnce(&MockServer) -> R) -> R {
        f(&self.server.lock().unwrap())
    }
}

impl SessionFactory for MockConnector {
    type Session = MockSession;

    fn connect(&self) -> Result<MockSession, Error> {
        if self.fail_connect {
            return Err(Error::Protocol("scripted connect failure".to_owned()));
        }

        self.server.lock().unwrap().connects += 1;
        Ok(MockSession {
            server: Arc::clone(&self.server),
            selected: None,
        })
    }
}

pub struct MockSession {
    server: Arc<Mutex<MockServer>>,
    selected: Option<String>,
}

impl MockSession {
    fn selected(&self) -> Result<String, Error> {
        self.selected
            .clone()
            .ok_or_else(|| Error::Protocol("no folder selected".to_owned()))
    }
}

impl Session for MockSession {
    fn list_folders(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.server.lock().unwrap().list_lines.clone())
    }

    fn select(
        &mut self,
        raw_name: &str,
        _read_only: bool,
    ) -> Result<(), Error> {
        let server = self.server.lock().unwrap();
        match server.folders.get(raw_name) {
            Some(folder) if !folder.unselectable => {
                drop(server);
                self.selected = Some(raw_name.to_owned());
                Ok(())
            },
            _ => Err(Error::CommandRejected {
                command: "SELECT",
                message: format!("no such mailbox: {}", raw_name),
            }),
        }
    }

    fn search_all(&mut self) -> Result<Vec<Seqnum>, Error> {
        let selected = self.selected()?;
        let server = self.server.lock().unwrap();
        let count = server.folders[&selected].messages.len();
        Ok((1..=count as Seqnum).collect())
    }

    fn fetch_headers(&mut self, seqnum: Seqnum) -> Result<Vec<u8>, Error> {
        let selected = self.selected()?;
        let server = self.server.lock().unwrap();
        let folder = &server.folders[&selected];

        if folder.fetch_failures.contains(&seqnum) {
            return Err(Error::Protocol("scripted fetch failure".to_owned()));
        }

        folder
            .messages
            .get(seqnum as usize - 1)
            .cloned()
            .ok_or_else(|| Error::Protocol("no such message".to_owned()))
    }

    fn mark_deleted(&mut self, seqnum: Seqnum) -> Result<(), Error> {
        let selected = self.selected()?;
        let mut server = self.server.lock().unwrap();

        if server.folders[&selected].mark_failures.contains(&seqnum) {
            return Err(Error::Protocol("scripted store failure".to_owned()));
        }

        server.deleted.push((selected, seqnum));
        Ok(())
    }

    fn expunge(&mut self) -> Result<(), Error> {
        let selected = self.selected()?;
        self.server.lock().unwrap().expunged.push(selected);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.selected = None;
        self.server.lock().unwrap().finishes += 1;
        Ok(())
    }
}
