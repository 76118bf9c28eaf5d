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

//! Field extraction from raw RFC 5322 header blocks.
//!
//! The fingerprint engine needs exactly four named fields, so there is
//! no header map here, just a scan. The scan is 8-bit clean: values are
//! returned as bytes and interpretation is left to the caller.

use memchr::memchr;

/// Extract the value of the named header field from a raw header block.
///
/// Field-name matching is ASCII-case-insensitive; the first occurrence
/// wins. Folded continuation lines are unfolded to a single space. The
/// scan stops at the blank line terminating the header block, so body
/// text that happens to look like a header is never picked up.
pub fn header_value(raw: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut value: Option<Vec<u8>> = None;

    for line in lines(raw) {
        if line.is_empty() {
            break;
        }

        if b' ' == line[0] || b'\t' == line[0] {
            // Continuation of whatever field started last.
            if let Some(value) = value.as_mut() {
                value.push(b' ');
                value.extend_from_slice(trim(line));
            }
            continue;
        }

        if value.is_some() {
            break;
        }

        let colon = match memchr(b':', line) {
            Some(colon) => colon,
            None => continue,
        };

        if trim(&line[..colon]).eq_ignore_ascii_case(name.as_bytes()) {
            value = Some(trim(&line[colon + 1..]).to_vec());
        }
    }

    value
}

fn lines(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    raw.split(|&b| b'\n' == b).map(|line| match line.last() {
        Some(&b'\r') => &line[..line.len() - 1],
        _ => line,
    })
}

fn trim(mut s: &[u8]) -> &[u8] {
    while s.first().map_or(false, |&b| b' ' == b || b'\t' == b) {
        s = &s[1..];
    }
    while s.last().map_or(false, |&b| b' ' == b || b'\t' == b) {
        s = &s[..s.len() - 1];
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    const MESSAGE: &str = "\
Message-ID: <4102090.1075845189404.JavaMail.evans@thyme>\r\n\
Date: Mon, 14 May 2001 19:36:00 -0700 (PDT)\r\n\
From: vmartinez@winstead.com\r\n\
Subject: Request for meeting -- Subject: short speech to US Olympic\r\n\
\tCommittee 7.16-19.01\r\n\
Mime-Version: 1.0\r\n\
\r\n\
From: not-a-header@body.example.com\r\n";

    fn get(name: &str) -> Option<String> {
        header_value(MESSAGE.as_bytes(), name)
            .map(|v| String::from_utf8(v).unwrap())
    }

    #[test]
    fn simple_field() {
        assert_eq!(
            Some("vmartinez@winstead.com".to_owned()),
            get("From")
        );
        assert_eq!(
            Some("<4102090.1075845189404.JavaMail.evans@thyme>".to_owned()),
            get("Message-ID")
        );
    }

    #[test]
    fn case_insensitive_match() {
        assert_eq!(get("From"), get("FROM"));
        assert_eq!(get("Message-ID"), get("message-id"));
    }

    #[test]
    fn folded_field_unfolds_to_one_space() {
        assert_eq!(
            Some(
                "Request for meeting -- Subject: short speech to US Olympic \
                 Committee 7.16-19.01"
                    .to_owned()
            ),
            get("Subject")
        );
    }

    #[test]
    fn body_is_not_scanned() {
        // The From inside the body must not shadow or duplicate the
        // header; only the real header value is returned.
        assert_eq!(
            Some("vmartinez@winstead.com".to_owned()),
            get("From")
        );
        assert_eq!(None, get("X-Not-Present"));
    }

    #[test]
    fn first_occurrence_wins() {
        let raw = b"Subject: first\r\nSubject: second\r\n\r\n";
        assert_eq!(
            Some(b"first".to_vec()),
            header_value(raw, "Subject")
        );
    }

    #[test]
    fn empty_and_malformed_values() {
        let raw = b"Subject:\r\njunk line without colon\r\nDate: x\r\n\r\n";
        assert_eq!(Some(Vec::new()), header_value(raw, "Subject"));
        assert_eq!(Some(b"x".to_vec()), header_value(raw, "Date"));
        assert_eq!(None, header_value(b"", "Subject"));
    }
}
