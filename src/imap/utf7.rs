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

//! The "modified UTF-7" mailbox name encoding set by RFC 3501.
//!
//! Sections between `&` and `-` are base64 with `,` in place of `/` and
//! no padding, decoding to big-endian UTF-16; `&-` denotes a literal
//! `&`. Everything a server sends is decoded for display only --- the
//! raw name is what gets sent back, so decoding never needs to be
//! inverted in ordinary operation. `encode` exists for tests and for
//! callers that want to build wire names from user input.

use std::borrow::Cow;
use std::str;

/// Decode a mailbox name from modified UTF-7.
///
/// Decoding is extremely permissive, which RFC 3501 discourages but
/// does not forbid. A section that cannot be decoded (bad base64, an
/// odd number of bytes, unpaired surrogates) is preserved verbatim,
/// markers included, and decoding continues with the next character.
/// The second element of the return value is false if any section was
/// preserved that way, so callers can surface the fallback.
pub fn decode(raw: &str) -> (Cow<str>, bool) {
    if !raw.contains('&') {
        return (Cow::Borrowed(raw), true);
    }

    let mut out = String::with_capacity(raw.len());
    let mut clean = true;
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // `terminator` is the index of `-` within `rest`, if any.
        let terminator = rest[1..].find('-').map(|ix| ix + 1);
        let (section, tail) = match terminator {
            Some(t) => (&rest[1..t], &rest[t + 1..]),
            None => (&rest[1..], ""),
        };
        rest = tail;

        if Some(1) == terminator {
            // "&-", the escaped shift-in character itself.
            out.push('&');
            continue;
        }

        if section.is_empty() {
            // A dangling "&" at the very end of the name.
            out.push('&');
            continue;
        }

        match decode_section(section) {
            Some(text) => out.push_str(&text),
            None => {
                clean = false;
                out.push('&');
                out.push_str(section);
                if terminator.is_some() {
                    out.push('-');
                }
            },
        }
    }

    out.push_str(rest);
    (Cow::Owned(out), clean)
}

fn decode_section(section: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(section.len() * 3 / 4 + 2);
    base64::decode_config_buf(
        section,
        base64::IMAP_MUTF7.decode_allow_trailing_bits(true),
        &mut bytes,
    )
    .ok()?;

    if bytes.len() % 2 != 0 {
        return None;
    }

    let units = bytes
        .chunks(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();
    String::from_utf16(&units).ok()
}

/// Encode a mailbox name into modified UTF-7.
///
/// The result is minimal and normalised: direct characters are never
/// encoded, `&` is only represented as `&-`, and every encoded section
/// has an explicit terminator.
pub fn encode(name: &str) -> Cow<str> {
    if name.bytes().all(|b| is_direct(b) && b != b'&') {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 8);
    let mut run = String::new();
    for ch in name.chars() {
        if '&' == ch {
            flush_run(&mut out, &mut run);
            out.push_str("&-");
        } else if ch.is_ascii() && is_direct(ch as u8) {
            flush_run(&mut out, &mut run);
            out.push(ch);
        } else {
            run.push(ch);
        }
    }
    flush_run(&mut out, &mut run);
    Cow::Owned(out)
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.is_empty() {
        return;
    }

    let mut buf = Vec::<u8>::with_capacity(run.len() * 2);
    for unit in run.encode_utf16() {
        buf.extend_from_slice(&unit.to_be_bytes());
    }

    out.push('&');
    out.push_str(&base64::encode_config(&buf, base64::IMAP_MUTF7));
    out.push('-');
    run.clear();
}

fn is_direct(byte: u8) -> bool {
    byte >= b' ' && byte < 0x7F
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    /// Decode to owned data so assertions stay readable.
    fn dec(raw: &str) -> (String, bool) {
        let (text, clean) = decode(raw);
        (text.into_owned(), clean)
    }

    fn clean(text: &str) -> (String, bool) {
        (text.to_owned(), true)
    }

    fn lossy(text: &str) -> (String, bool) {
        (text.to_owned(), false)
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(clean("INBOX"), dec("INBOX"));
        assert_eq!(clean("INBOX.Archive.2023"), dec("INBOX.Archive.2023"));
        assert_eq!("INBOX", encode("INBOX"));
    }

    #[test]
    fn escaped_ampersand() {
        assert_eq!(clean("Lost & Found"), dec("Lost &- Found"));
        assert_eq!("Lost &- Found", encode("Lost & Found"));
    }

    #[test]
    fn decode_known_fixtures() {
        // Examples from RFC 3501
        assert_eq!(
            clean("~peter/mail/台北/日本語"),
            dec("~peter/mail/&U,BTFw-/&ZeVnLIqe-")
        );
        assert_eq!(clean("日本語"), dec("&ZeVnLIqe-"));
        // Cyrillic folder names as produced by mail.ru and Yandex
        assert_eq!(clean("Корзина"), dec("&BBoEPgRABDcEOAQ9BDA-"));
        assert_eq!(clean("Спам"), dec("&BCEEPwQwBDw-"));
        assert_eq!(
            clean("INBOX.Черновики"),
            dec("INBOX.&BCcENQRABD0EPgQyBDgEOgQ4-")
        );
    }

    #[test]
    fn encode_known_fixtures() {
        assert_eq!("&ZeVnLIqe-", encode("日本語"));
        assert_eq!("&BBoEPgRABDcEOAQ9BDA-", encode("Корзина"));
        assert_eq!("INBOX.&BCEEPwQwBDw-", encode("INBOX.Спам"));
    }

    #[test]
    fn bad_sections_preserved_verbatim() {
        // Not base64 at all
        assert_eq!(lossy("&!!!-"), dec("&!!!-"));
        // Odd byte count after base64 decoding
        assert_eq!(lossy("a&IQ-b"), dec("a&IQ-b"));
        // The good section around a bad one still decodes
        assert_eq!(lossy("x&IQ-Спам"), dec("x&IQ-&BCEEPwQwBDw-"));
    }

    #[test]
    fn unterminated_section_still_decodes() {
        assert_eq!(clean("Спам"), dec("&BCEEPwQwBDw"));
    }

    #[test]
    fn decode_pathological() {
        assert_eq!(clean("hello&"), dec("hello&"));
        assert_eq!(clean("&"), dec("&"));
        assert_eq!(lossy("&&"), dec("&&"));
        assert_eq!(clean(""), dec(""));
    }

    proptest! {
        #[test]
        fn encoding_is_reversible(s in ".*") {
            let encoded = encode(&s);
            let (decoded, was_clean) = decode(&encoded);
            prop_assert_eq!(&s, &decoded);
            prop_assert!(was_clean);
        }

        #[test]
        fn decoding_never_panics(s in ".*") {
            decode(&s);
        }
    }
}
