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

use std::fmt;

use super::session::Seqnum;

/// A folder discovered by one listing pass.
///
/// Read-only once created; nothing here is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderDescriptor {
    /// The wire-format name exactly as the server reported it. This is
    /// what must be sent back when selecting the folder.
    pub raw_name: String,
    /// The human-readable name, decoded from modified UTF-7. Derived
    /// from `raw_name` and never round-tripped to the server.
    pub decoded_name: String,
    /// Whether the skip filter classified this as a system folder.
    pub skip: bool,
}

/// The identity headers of one message, decoded.
///
/// Exists only within one folder-processing pass; discarded once the
/// fingerprint has been taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub seqnum: Seqnum,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub message_id: String,
}

/// The identity digest of a message.
///
/// Two messages with the same fingerprint are considered duplicates of
/// each other, with no secondary verification.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub(super) [u8; 32]);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first few bytes are plenty to tell fingerprints apart in
        // test output.
        write!(
            f,
            "Fingerprint({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Counters for the processing of one folder.
///
/// Immutable once returned by the resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FolderResult {
    /// The decoded folder name, for reporting.
    pub folder: String,
    pub total_messages: usize,
    pub duplicates_found: usize,
    pub duplicates_deleted: usize,
    pub errors: usize,
}

impl FolderResult {
    pub fn new(folder: String) -> Self {
        FolderResult {
            folder,
            ..FolderResult::default()
        }
    }
}

/// Run-wide counters, folded together from `FolderResult`s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total_messages: usize,
    pub duplicates_found: usize,
    pub duplicates_deleted: usize,
    pub errors: usize,
}

impl RunStats {
    pub fn merge(&mut self, result: &FolderResult) {
        self.total_messages += result.total_messages;
        self.duplicates_found += result.duplicates_found;
        self.duplicates_deleted += result.duplicates_deleted;
        self.errors += result.errors;
    }
}

/// Whether a run is allowed to mutate the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Count duplicates but issue no mutating commands at all.
    Verify,
    /// Mark duplicates deleted and expunge them.
    Purge,
}

impl RunMode {
    pub fn is_purge(self) -> bool {
        RunMode::Purge == self
    }
}
