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

use serde::{Deserialize, Serialize};

/// Connection and run settings for the mailbox being deduplicated.
///
/// Usually assembled from command-line flags, but the whole struct can
/// also be loaded from a TOML file via `--config`; flags given on the
/// command line override their file counterparts.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// The host to connect to.
    pub host: String,
    /// The port to connect to.
    pub port: u16,
    /// The user name to log in as.
    pub user: String,
    /// The password to log in with.
    ///
    /// If unset, it is prompted for on the controlling terminal, which
    /// is the recommended way to provide it.
    pub password: Option<String>,
    /// Number of folders to process in parallel.
    ///
    /// If unset, the number of CPUs is used.
    pub threads: Option<usize>,
    /// Connect without TLS.
    ///
    /// Only useful against servers on port 143 that never offer TLS,
    /// such as a localhost proxy. The password is sent in the clear.
    pub plaintext: bool,
    /// Do not verify the server's TLS certificate.
    pub allow_insecure_tls_connections: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: String::new(),
            port: 993,
            user: String::new(),
            password: None,
            threads: None,
            plaintext: false,
            allow_insecure_tls_connections: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let settings: Settings = toml::from_str(
            "host = \"imap.example.org\"\n\
             user = \"jason\"\n",
        )
        .unwrap();
        assert_eq!("imap.example.org", settings.host);
        assert_eq!(993, settings.port);
        assert_eq!("jason", settings.user);
        assert_eq!(None, settings.password);
        assert!(!settings.plaintext);
    }

    #[test]
    fn full_config_parses() {
        let settings: Settings = toml::from_str(
            "host = \"localhost\"\n\
             port = 143\n\
             user = \"jason\"\n\
             password = \"hunter2\"\n\
             threads = 2\n\
             plaintext = true\n",
        )
        .unwrap();
        assert_eq!(143, settings.port);
        assert_eq!(Some("hunter2".to_owned()), settings.password);
        assert_eq!(Some(2), settings.threads);
        assert!(settings.plaintext);
    }
}
