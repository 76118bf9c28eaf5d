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

//! Message identity from envelope headers.
//!
//! The fingerprint is deliberately not a content hash. Two messages
//! with the same From, Subject, Date, and Message-ID are one logical
//! message as far as deduplication is concerned, bodies unseen. The
//! flip side: templated notifications sent without unique Message-IDs
//! will merge. That behaviour is inherited and kept.

use log::debug;
use tiny_keccak::{Hasher, Sha3};

use super::model::{Fingerprint, MessageRecord};
use super::session::Seqnum;
use crate::mime::encoded_word;
use crate::mime::header;

impl MessageRecord {
    /// Build a record from the raw header block of one message.
    ///
    /// From and Subject go through full RFC 2047 decoding since that is
    /// where non-ASCII text lives. Date and Message-ID are ASCII by
    /// convention and are taken as-is, trimmed. A missing header is an
    /// empty string; it still participates in the fingerprint.
    pub fn from_headers(seqnum: Seqnum, raw: &[u8]) -> Self {
        MessageRecord {
            seqnum,
            from: decoded_field(raw, "From"),
            subject: decoded_field(raw, "Subject"),
            date: verbatim_field(raw, "Date"),
            message_id: verbatim_field(raw, "Message-ID"),
        }
    }
}

fn decoded_field(raw: &[u8], name: &str) -> String {
    match header::header_value(raw, name) {
        Some(value) => {
            let decoded = encoded_word::decode_header(&value);
            if !decoded.clean {
                debug!("{} header only decoded lossily", name);
            }
            decoded.text
        },
        None => String::new(),
    }
}

fn verbatim_field(raw: &[u8], name: &str) -> String {
    header::header_value(raw, name)
        .map(|value| String::from_utf8_lossy(&value).trim().to_owned())
        .unwrap_or_default()
}

/// Digest the identity headers of a message.
///
/// Stable across runs and platforms; nothing about the digest input
/// depends on the session, the folder, or enumeration order.
pub fn fingerprint(record: &MessageRecord) -> Fingerprint {
    let mut hasher = Sha3::v256();
    hasher.update(record.from.as_bytes());
    hasher.update(b"|");
    hasher.update(record.subject.as_bytes());
    hasher.update(b"|");
    hasher.update(record.date.as_bytes());
    hasher.update(b"|");
    hasher.update(record.message_id.as_bytes());

    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    Fingerprint(digest)
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(
        from: &str,
        subject: &str,
        date: &str,
        message_id: &str,
    ) -> MessageRecord {
        MessageRecord {
            seqnum: 1,
            from: from.to_owned(),
            subject: subject.to_owned(),
            date: date.to_owned(),
            message_id: message_id.to_owned(),
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = record(
            "a@example.com",
            "hello",
            "Mon, 14 May 2001 19:36:00 -0700",
            "<1@example.com>",
        );
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[test]
    fn each_field_matters() {
        let base = record("a@example.com", "hello", "today", "<1@x>");
        let variants = [
            record("b@example.com", "hello", "today", "<1@x>"),
            record("a@example.com", "goodbye", "today", "<1@x>"),
            record("a@example.com", "hello", "yesterday", "<1@x>"),
            record("a@example.com", "hello", "today", "<2@x>"),
        ];

        let base_print = fingerprint(&base);
        for variant in &variants {
            assert_ne!(base_print, fingerprint(variant));
        }
    }

    #[test]
    fn seqnum_does_not_matter() {
        let mut a = record("a@example.com", "hello", "today", "<1@x>");
        let print = fingerprint(&a);
        a.seqnum = 99;
        assert_eq!(print, fingerprint(&a));
    }

    #[test]
    fn from_headers_decodes_encoded_words() {
        let raw = b"From: =?UTF-8?B?0JjQstCw0L0=?= <ivan@example.org>\r\n\
                    Subject: =?ISO-8859-1?Q?Andr=E9?=\r\n\
                    Date: Mon, 14 May 2001 19:36:00 -0700\r\n\
                    Message-ID: <1@example.org>\r\n\
                    \r\n\
                    body\r\n";
        let record = MessageRecord::from_headers(7, raw);
        assert_eq!(7, record.seqnum);
        assert_eq!("Иван <ivan@example.org>", record.from);
        assert_eq!("André", record.subject);
        assert_eq!("Mon, 14 May 2001 19:36:00 -0700", record.date);
        assert_eq!("<1@example.org>", record.message_id);
    }

    #[test]
    fn missing_headers_become_empty_strings() {
        let record = MessageRecord::from_headers(1, b"X-Other: y\r\n\r\n");
        assert_eq!("", record.from);
        assert_eq!("", record.subject);
        assert_eq!("", record.date);
        assert_eq!("", record.message_id);
        // Two header-less messages are duplicates of each other.
        assert_eq!(
            fingerprint(&record),
            fingerprint(&MessageRecord::from_headers(2, b"A: b\r\n\r\n"))
        );
    }

    #[test]
    fn differently_encoded_same_text_fingerprints_equal() {
        // The fingerprint hashes decoded text, so the transfer encoding
        // of the header must not matter.
        let q = MessageRecord::from_headers(
            1,
            b"Subject: =?UTF-8?Q?caf=C3=A9?=\r\n\r\n",
        );
        let b = MessageRecord::from_headers(
            2,
            b"Subject: =?UTF-8?B?Y2Fmw6k=?=\r\n\r\n",
        );
        assert_eq!("café", q.subject);
        assert_eq!(fingerprint(&q), fingerprint(&b));
    }
}
