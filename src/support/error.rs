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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unexpected server greeting: {0}")]
    BadGreeting(String),
    #[error("Login rejected: {0}")]
    AuthRejected(String),
    #[error("{command} failed: {message}")]
    CommandRejected {
        command: &'static str,
        message: String,
    },
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ssl(#[from] openssl::error::ErrorStack),
    #[error(transparent)]
    Tls(#[from] openssl::ssl::Error),
}
