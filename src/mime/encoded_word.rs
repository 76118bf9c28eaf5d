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

//! Decoding of RFC 2047 "encoded words" in header values.

use std::borrow::Cow;
use std::str;

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // RFC 2047 limits encoded words to 75 characters, but real agents
    // produce longer ones and real clients interpret them, so no length
    // limit is enforced here.
    static ref ENCODED_WORD: Regex =
        Regex::new(r"^=\?([!->@-~]*)\?([!->@-~]*)\?([!->@-~]*)\?=$").unwrap();
}

/// A best-effort decoded header value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// False if any part of the value failed to decode and was taken as
    /// lossy UTF-8 instead.
    pub clean: bool,
}

/// Decode a header value that may contain RFC 2047 encoded words.
///
/// The value is assumed to be unfolded already (see `header`). Each
/// whitespace-separated word that parses as an encoded word is decoded;
/// everything else is kept as-is. Whitespace between two adjacent
/// encoded words is deleted, per RFC 2047 section 6.2. A word that
/// fails to decode falls back to a lossy UTF-8 reading of whatever
/// bytes were recovered and clears the `clean` flag. This never fails.
pub fn decode_header(raw: &[u8]) -> Decoded {
    let (value, mut clean) = match str::from_utf8(raw) {
        Ok(s) => (Cow::Borrowed(s), true),
        Err(_) => (String::from_utf8_lossy(raw), false),
    };

    if !value.contains("=?") {
        return Decoded {
            text: value.trim().to_owned(),
            clean,
        };
    }

    let mut text = String::with_capacity(value.len());
    let mut prev_encoded = false;
    for word in value.split_ascii_whitespace() {
        match ew_decode(word) {
            Some((decoded, word_clean)) => {
                if !text.is_empty() && !prev_encoded {
                    text.push(' ');
                }
                text.push_str(&decoded);
                clean &= word_clean;
                prev_encoded = true;
            },
            None => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(word);
                prev_encoded = false;
            },
        }
    }

    Decoded { text, clean }
}

/// Decode a single encoded word.
///
/// `None` means the word is not an encoded word at all and must be kept
/// with its surrounding whitespace intact. The bool is false when the
/// word looked like an encoded word but some stage of it could only be
/// decoded by falling back.
fn ew_decode(word: &str) -> Option<(String, bool)> {
    let captures = ENCODED_WORD.captures(word)?;

    let charset = captures.get(1).unwrap().as_str();
    let transfer_encoding = captures.get(2).unwrap().as_str();
    let payload = captures.get(3).unwrap().as_str();

    let content = match decode_xfer(transfer_encoding, payload) {
        Some(content) => content,
        // Unknown or broken transfer encoding; the raw word is the best
        // text available.
        None => return Some((word.to_owned(), false)),
    };

    match decode_charset(charset, &content) {
        Some(text) => Some((text.into_owned(), true)),
        None => Some((String::from_utf8_lossy(&content).into_owned(), false)),
    }
}

fn decode_xfer(xfer: &str, payload: &str) -> Option<Vec<u8>> {
    match xfer {
        "q" | "Q" => Some(q_decode(payload)),
        "b" | "B" => base64::decode(payload).ok(),
        _ => None,
    }
}

/// The RFC 2047 "Q" encoding: `_` is a space regardless of charset and
/// `=XX` is a hex-escaped byte. Invalid escapes are passed through
/// untransformed rather than rejected.
fn q_decode(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut ix = 0;

    while ix < bytes.len() {
        match bytes[ix] {
            b'_' => {
                out.push(b' ');
                ix += 1;
            },
            b'=' if ix + 2 < bytes.len() => {
                match str::from_utf8(&bytes[ix + 1..ix + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    Some(byte) => {
                        out.push(byte);
                        ix += 3;
                    },
                    None => {
                        out.push(b'=');
                        ix += 1;
                    },
                }
            },
            byte => {
                out.push(byte);
                ix += 1;
            },
        }
    }

    out
}

fn decode_charset<'a>(charset: &str, content: &'a [u8]) -> Option<Cow<'a, str>> {
    let (text, malformed) = Encoding::for_label_no_replacement(
        charset.as_bytes(),
    )?
    .decode_with_bom_removal(content);

    if malformed {
        None
    } else {
        Some(text)
    }
}
