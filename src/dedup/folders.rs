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

//! Folder discovery: turning LIST response lines into descriptors.

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;

use super::model::FolderDescriptor;
use super::session::Session;
use super::skip;
use crate::imap::utf7;
use crate::support::error::Error;

lazy_static! {
    // `* LIST (\flags) "delimiter" "name"` --- the usual form.
    static ref LIST_QUOTED: Regex =
        Regex::new(r#"\([^)]*\)\s+"[^"]*"\s+"([^"]*)""#).unwrap();
    // Some servers leave names without special characters unquoted.
    static ref LIST_UNQUOTED: Regex =
        Regex::new(r#"\([^)]*\)\s+"[^"]*"\s+(\S+)"#).unwrap();
}

/// Extract the raw mailbox name from one LIST response line.
fn parse_list_line(line: &str) -> Option<&str> {
    LIST_QUOTED
        .captures(line)
        .or_else(|| LIST_UNQUOTED.captures(line))
        .map(|captures| captures.get(1).unwrap().as_str())
}

/// Discover the folders of the mailbox.
///
/// Issues one LIST call and parses each returned line independently: a
/// line that matches neither name pattern is dropped with a debug log,
/// never failing the whole call. Empty and placeholder (`.`) names are
/// dropped too. With `skip_system`, folders matching the skip filter
/// are excluded from the result entirely; otherwise they are returned
/// with their `skip` flag set for the caller to decide. Server order is
/// preserved.
pub fn list_folders(
    session: &mut impl Session,
    skip_system: bool,
) -> Result<Vec<FolderDescriptor>, Error> {
    let mut folders = Vec::new();

    for line in session.list_folders()? {
        let raw_name = match parse_list_line(&line) {
            Some(raw_name) => raw_name,
            None => {
                debug!("ignoring unparseable LIST line: {}", line);
                continue;
            },
        };

        if raw_name.is_empty() || "." == raw_name {
            continue;
        }

        let (decoded_name, clean) = utf7::decode(raw_name);
        if !clean {
            debug!(
                "folder name {:?} only decoded lossily, as {:?}",
                raw_name, decoded_name
            );
        }

        let skip = skip::should_skip(&decoded_name);
        if skip && skip_system {
            info!("skipping system folder {}", decoded_name);
            continue;
        }

        folders.push(FolderDescriptor {
            raw_name: raw_name.to_owned(),
            decoded_name: decoded_name.into_owned(),
            skip,
        });
    }

    Ok(folders)
}
