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

//! The deduplication pipeline.
//!
//! Discovery turns a folder listing into descriptors; the resolver
//! deduplicates one folder over its own session; the pool runs many
//! resolvers in parallel and aggregates their results. Everything here
//! is written against the session traits, not the live IMAP code.

pub mod fingerprint;
pub mod folders;
pub mod model;
pub mod pool;
pub mod resolver;
pub mod session;
pub mod skip;

#[cfg(test)]
pub mod testing;
