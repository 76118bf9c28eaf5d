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

//! The worker pool that fans folders out over parallel sessions.

use std::sync::Mutex;

use log::info;

use super::folders;
use super::model::{RunMode, RunStats};
use super::resolver;
use super::session::{SessionFactory, SessionGuard};
use crate::support::error::Error;

/// Deduplicate the given folders (raw names) with up to `concurrency`
/// parallel workers.
///
/// All folders are pre-loaded into a bounded channel; dropping the
/// sender is what eventually stops the workers. Each worker loops:
/// take one folder, resolve it over a fresh session, fold the result
/// into the shared stats under the one lock. The call returns when the
/// scope has joined every worker. No folder is handed to two workers,
/// and workers share nothing except the channel and the stats lock.
pub fn run<F: SessionFactory>(
    factory: &F,
    folders: Vec<String>,
    concurrency: usize,
    mode: RunMode,
) -> RunStats {
    if folders.is_empty() {
        return RunStats::default();
    }

    let workers = concurrency.max(1).min(folders.len());
    let stats = Mutex::new(RunStats::default());
    let (task_send, task_recv) = crossbeam::channel::bounded(folders.len());
    for folder in folders {
        task_send.send(folder).expect("pre-sized task queue refused a task");
    }
    drop(task_send);

    crossbeam::scope(|s| {
        for _ in 0..workers {
            let task_recv = task_recv.clone();
            let stats = &stats;
            s.spawn(move |_| {
                for raw_name in task_recv.iter() {
                    let result =
                        resolver::resolve_folder(factory, &raw_name, mode);
                    stats.lock().unwrap().merge(&result);
                }
            });
        }
    })
    .unwrap();

    stats.into_inner().unwrap()
}

/// Discover every folder of the mailbox and deduplicate them all.
///
/// The discovery connection is the only one whose failure aborts the
/// run; once the pool is going, failures stay inside their folder.
pub fn process_all_folders<F: SessionFactory>(
    factory: &F,
    concurrency: usize,
    mode: RunMode,
    skip_system: bool,
) -> Result<RunStats, Error> {
    let discovered = {
        let mut session = SessionGuard::new(factory.connect()?);
        folders::list_folders(&mut *session, skip_system)?
    };

    info!("{} folders to process", discovered.len());
    let names = discovered
        .into_iter()
        .map(|folder| folder.raw_name)
        .collect();
    Ok(run(factory, names, concurrency, mode))
}
