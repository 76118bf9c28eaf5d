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

use std::path::PathBuf;

use structopt::StructOpt;

use crate::dedup::model::RunMode;
use crate::support::sysexits::*;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Scan for duplicate messages without deleting anything.
    ///
    /// Connects, walks every folder, and reports how many duplicates a
    /// purge would delete. No mutating command is sent to the server in
    /// this mode, so it is safe to run against any mailbox.
    Check(CommonOptions),
    /// Find duplicate messages and permanently delete all but one copy.
    ///
    /// Messages are considered duplicates when their From, Subject,
    /// Date, and Message-ID headers are all identical; the first copy
    /// in each folder (in server order) is kept. Deleted messages are
    /// expunged and cannot be recovered, which is why this asks for
    /// confirmation unless --yes is given.
    Purge(PurgeSubcommand),
    /// List the folders of the mailbox as the duplicate scan sees them.
    ///
    /// Shows the decoded (human-readable) name of each folder and marks
    /// the system folders that check and purge skip by default.
    Folders(CommonOptions),
}

#[derive(StructOpt, Default)]
pub(super) struct CommonOptions {
    /// Read connection settings from this TOML file.
    /// Flags given on the command line override the file.
    #[structopt(long, parse(from_os_str))]
    pub(super) config: Option<PathBuf>,

    /// The host to connect to.
    #[structopt(long, short)]
    pub(super) host: Option<String>,

    /// The port to connect to [default: 993].
    #[structopt(long, short)]
    pub(super) port: Option<u16>,

    /// The user name to log in as.
    #[structopt(long, short)]
    pub(super) user: Option<String>,

    /// Number of folders to process in parallel
    /// [default: number of CPUs].
    #[structopt(long, short)]
    pub(super) threads: Option<usize>,

    /// Process trash, spam, and draft folders too.
    #[structopt(long)]
    pub(super) include_system_folders: bool,

    /// Process only this folder, by its wire-format name.
    /// Can be passed multiple times. Bypasses folder discovery and the
    /// system-folder filter.
    #[structopt(long, number_of_values(1))]
    pub(super) folder: Vec<String>,

    /// Connect without TLS. The password is sent in the clear.
    #[structopt(long)]
    pub(super) plaintext: bool,

    /// Allow insecure TLS connections.
    #[structopt(long)]
    pub(super) allow_insecure_tls_connections: bool,

    /// Dump a trace of the IMAP connections to standard error.
    #[structopt(long)]
    pub(super) trace: bool,
}

#[derive(StructOpt)]
pub(super) struct PurgeSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Delete without asking for confirmation.
    #[structopt(long)]
    pub(super) yes: bool,
}

impl Command {
    fn common(&self) -> &CommonOptions {
        match *self {
            Command::Check(ref c) | Command::Folders(ref c) => c,
            Command::Purge(ref p) => &p.common,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more
    // concise API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    crate::init_simple_log(cmd.common().trace);

    match cmd {
        Command::Check(common) => {
            super::run::dedup(common, RunMode::Verify, true)
        },
        Command::Purge(purge) => {
            super::run::dedup(purge.common, RunMode::Purge, purge.yes)
        },
        Command::Folders(common) => super::run::folders(common),
    }
}
