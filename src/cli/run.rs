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

//! Execution of the CLI commands against a live server.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use super::main::CommonOptions;
use crate::dedup::model::{RunMode, RunStats};
use crate::dedup::pool;
use crate::dedup::session::{SessionFactory, SessionGuard};
use crate::imap::session::ImapConnector;
use crate::support::config::Settings;
use crate::support::sysexits::*;

pub(super) fn dedup(options: CommonOptions, mode: RunMode, confirmed: bool) {
    let (settings, threads) = assemble_settings(&options);

    if mode.is_purge() && !confirmed && !confirm_purge() {
        die!(EX_USAGE, "Cancelled, nothing deleted.");
    }

    let connector = ImapConnector::new(settings, options.trace);
    let stats = if options.folder.is_empty() {
        match pool::process_all_folders(
            &connector,
            threads,
            mode,
            !options.include_system_folders,
        ) {
            Ok(stats) => stats,
            Err(e) => die!(EX_UNAVAILABLE, "Error: {}", e),
        }
    } else {
        // An explicit folder set skips discovery (and the skip filter)
        // entirely.
        pool::run(&connector, options.folder.clone(), threads, mode)
    };

    print_summary(&stats, mode);
}

pub(super) fn folders(options: CommonOptions) {
    let (settings, _) = assemble_settings(&options);
    let connector = ImapConnector::new(settings, options.trace);

    let mut session = match connector.connect() {
        Ok(session) => SessionGuard::new(session),
        Err(e) => die!(EX_UNAVAILABLE, "Error: {}", e),
    };

    let discovered =
        match crate::dedup::folders::list_folders(&mut *session, false) {
            Ok(discovered) => discovered,
            Err(e) => die!(EX_UNAVAILABLE, "Error: {}", e),
        };
    drop(session);

    for folder in discovered {
        if folder.skip {
            println!("{} (system, skipped by default)", folder.decoded_name);
        } else {
            println!("{}", folder.decoded_name);
        }
    }
}

/// Merge the config file (if any) and the command-line flags into the
/// final settings, prompting for a password if none was provided.
fn assemble_settings(options: &CommonOptions) -> (Settings, usize) {
    let mut settings = match &options.config {
        Some(path) => load_config(path),
        None => Settings::default(),
    };

    if let Some(ref host) = options.host {
        settings.host = host.clone();
    }
    if let Some(port) = options.port {
        settings.port = port;
    }
    if let Some(ref user) = options.user {
        settings.user = user.clone();
    }
    if options.plaintext {
        settings.plaintext = true;
    }
    if options.allow_insecure_tls_connections {
        settings.allow_insecure_tls_connections = true;
    }

    if settings.host.is_empty() {
        die!(EX_USAGE, "No host given; use --host or a config file.");
    }
    if settings.user.is_empty() {
        die!(EX_USAGE, "No user given; use --user or a config file.");
    }

    if settings.password.is_none() {
        match rpassword::read_password_from_tty(Some("Password: ")) {
            Ok(password) => settings.password = Some(password),
            Err(e) => die!(EX_NOINPUT, "Failed to read password: {}", e),
        }
    }

    let threads = options
        .threads
        .or(settings.threads)
        .unwrap_or_else(num_cpus::get);

    (settings, threads)
}

fn load_config(path: &Path) -> Settings {
    let mut text = Vec::new();
    if let Err(e) = fs::File::open(path)
        .and_then(|mut f| f.read_to_end(&mut text))
    {
        die!(EX_NOINPUT, "Error reading '{}': {}", path.display(), e);
    }

    match toml::from_slice(&text) {
        Ok(settings) => settings,
        Err(e) => {
            die!(EX_CONFIG, "Error in config file at '{}': {}",
                 path.display(), e)
        },
    }
}

fn confirm_purge() -> bool {
    print!(
        "This will PERMANENTLY delete duplicate messages. Continue? (yes/no) "
    );
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }

    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_summary(stats: &RunStats, mode: RunMode) {
    println!();
    println!("Messages examined:  {}", stats.total_messages);
    println!("Duplicates found:   {}", stats.duplicates_found);
    if mode.is_purge() {
        println!("Duplicates deleted: {}", stats.duplicates_deleted);
    }
    if stats.errors > 0 {
        println!("Errors:             {}", stats.errors);
    }
}
