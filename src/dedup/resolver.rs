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

//! Duplicate resolution within a single folder.

use std::collections::HashMap;

use log::{debug, info, warn};

use super::fingerprint::fingerprint;
use super::model::{Fingerprint, FolderResult, MessageRecord, RunMode};
use super::session::{Session, SessionFactory, SessionGuard, Seqnum};
use crate::imap::utf7;
use crate::support::error::Error;

/// Deduplicate one folder over a session of its own.
///
/// This never fails: every error ends up in the returned result's error
/// count, at the smallest scope that can contain it. A message that
/// cannot be fetched is skipped; a folder that cannot be opened yields
/// a zeroed result; nothing here can take down a sibling folder.
pub fn resolve_folder<F: SessionFactory>(
    factory: &F,
    raw_name: &str,
    mode: RunMode,
) -> FolderResult {
    let (display, _) = utf7::decode(raw_name);
    let mut result = FolderResult::new(display.into_owned());

    if let Err(e) = resolve_impl(factory, raw_name, mode, &mut result) {
        warn!("{}: {}", result.folder, e);
        result.errors += 1;
    }

    result
}

fn resolve_impl<F: SessionFactory>(
    factory: &F,
    raw_name: &str,
    mode: RunMode,
    result: &mut FolderResult,
) -> Result<(), Error> {
    let mut session = SessionGuard::new(factory.connect()?);

    if let Err(e) = session.select(raw_name, false) {
        warn!("{}: cannot open folder: {}", result.folder, e);
        result.errors += 1;
        return Ok(());
    }

    let seqnums = session.search_all()?;
    result.total_messages = seqnums.len();
    if seqnums.is_empty() {
        debug!("{}: empty, nothing to do", result.folder);
        return Ok(());
    }

    // Group by fingerprint. Within each group the vector keeps fetch
    // order, which is the server's ascending order; the first entry is
    // the copy that survives.
    let mut groups: HashMap<Fingerprint, Vec<Seqnum>> = HashMap::new();
    let mut fetched = 0usize;
    for seqnum in seqnums {
        let raw = match session.fetch_headers(seqnum) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(
                    "{}: fetch of message {} failed: {}",
                    result.folder, seqnum, e
                );
                result.errors += 1;
                continue;
            },
        };

        let record = MessageRecord::from_headers(seqnum, &raw);
        groups.entry(fingerprint(&record)).or_default().push(seqnum);

        fetched += 1;
        if fetched % 50 == 0 {
            debug!(
                "{}: fetched {}/{}",
                result.folder, fetched, result.total_messages
            );
        }
    }

    for seqnums in groups.values() {
        if seqnums.len() < 2 {
            continue;
        }

        result.duplicates_found += seqnums.len() - 1;

        for &duplicate in &seqnums[1..] {
            if !mode.is_purge() {
                continue;
            }

            match session.mark_deleted(duplicate) {
                Ok(()) => result.duplicates_deleted += 1,
                Err(e) => {
                    debug!(
                        "{}: marking message {} failed: {}",
                        result.folder, duplicate, e
                    );
                    result.errors += 1;
                },
            }
        }
    }

    if mode.is_purge() && result.duplicates_deleted > 0 {
        if let Err(e) = session.expunge() {
            warn!("{}: expunge failed: {}", result.folder, e);
            result.errors += 1;
        }
    }

    info!(
        "{}: {} messages, {} duplicates, {} deleted, {} errors",
        result.folder,
        result.total_messages,
        result.duplicates_found,
        result.duplicates_deleted,
        result.errors
    );
    Ok(())
}
