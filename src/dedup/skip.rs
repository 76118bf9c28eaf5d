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

/// Substrings (lower case) identifying trash, spam, and draft folders
/// in the languages and vendor dialects commonly seen in the wild.
const SKIP_FOLDERS: &[&str] = &[
    "trash",
    "deleted",
    "spam",
    "junk",
    "drafts",
    "draft",
    "корзина",
    "удаленные",
    "спам",
    "мусор",
    "черновики",
    "черновик",
    "[gmail]/trash",
    "[gmail]/spam",
    "[gmail]/drafts",
    "deleted items",
    "deleted messages",
    "junk email",
];

/// Whether the (decoded) folder name refers to a system folder that
/// deduplication should leave alone by default.
///
/// Matching is case-insensitive substring containment, so a folder
/// named "My Drafts Folder" is also skipped. That over-reach is
/// accepted; skipping a real folder is harmless, deduplicating a trash
/// folder is noise.
pub fn should_skip(decoded_name: &str) -> bool {
    let lower = decoded_name.to_lowercase();
    SKIP_FOLDERS.iter().any(|pattern| lower.contains(pattern))
}

#[cfg(test)]
mod test {
    use super::should_skip;

    #[test]
    fn test_should_skip() {
        assert!(should_skip("Trash"));
        assert!(should_skip("INBOX.Trash"));
        assert!(should_skip("Deleted Items"));
        assert!(should_skip("Спам"));
        assert!(should_skip("INBOX.Корзина"));
        assert!(should_skip("Черновики"));
        assert!(should_skip("[Gmail]/Spam"));
        assert!(should_skip("My Drafts Folder"));

        assert!(!should_skip("INBOX"));
        assert!(!should_skip("Projects"));
        assert!(!should_skip("Архив"));
        assert!(!should_skip("Sent"));
    }
}
