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

//! The session capability the deduplication core runs against.
//!
//! The core never talks to a socket itself; it consumes these traits.
//! `imap::session` provides the live implementation, and the tests a
//! scripted one.

use log::debug;

use crate::support::error::Error;

/// A message handle within the currently selected folder.
///
/// Sequence numbers are only meaningful relative to one selection and
/// are never retained across folders.
pub type Seqnum = u32;

/// One authenticated connection to the mail store.
///
/// Every operation can fail independently; the caller decides how far
/// the failure propagates.
pub trait Session {
    /// Return the raw response lines of a full folder listing.
    fn list_folders(&mut self) -> Result<Vec<String>, Error>;
    /// Select the folder with the given wire-format name.
    fn select(&mut self, raw_name: &str, read_only: bool)
        -> Result<(), Error>;
    /// Return the handles of every message in the selected folder, in
    /// the server's enumeration order.
    fn search_all(&mut self) -> Result<Vec<Seqnum>, Error>;
    /// Fetch the raw header block of one message.
    fn fetch_headers(&mut self, seqnum: Seqnum) -> Result<Vec<u8>, Error>;
    /// Mark one message deleted.
    fn mark_deleted(&mut self, seqnum: Seqnum) -> Result<(), Error>;
    /// Permanently remove every message marked deleted.
    fn expunge(&mut self) -> Result<(), Error>;
    /// Close the selected folder (if any) and log out.
    fn finish(&mut self) -> Result<(), Error>;
}

/// Capability to open fresh sessions.
///
/// `Sync` because one factory is shared by every worker in the pool;
/// the sessions it produces stay on the thread that opened them.
pub trait SessionFactory: Sync {
    type Session: Session;

    fn connect(&self) -> Result<Self::Session, Error>;
}

/// Scoped wrapper that releases a session on every exit path.
///
/// Dropping the guard closes the folder and logs out, whether the
/// owning code returned normally or bailed early with `?`. Release
/// failures are logged and swallowed; there is nothing useful a caller
/// could do with them.
pub struct SessionGuard<S: Session> {
    session: Option<S>,
}

impl<S: Session> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        SessionGuard {
            session: Some(session),
        }
    }
}

impl<S: Session> std::ops::Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("SessionGuard used after drop")
    }
}

impl<S: Session> std::ops::DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("SessionGuard used after drop")
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.finish() {
                debug!("session release failed: {}", e);
            }
        }
    }
}
