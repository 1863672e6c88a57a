//! Tokenizing of single 80-byte FITS header cards.
//!
//! A card is split into a keyword token (bytes 0..8) and a raw value token.
//! The raw token preserves quotes so that string values can be re-emitted
//! verbatim; typed interpretation is left to the helpers at the bottom of
//! this module.

use alloc::string::String;

use crate::block::CARD_SIZE;
use crate::error::{Error, Result};

/// The tokenized form of one header card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardToken {
    /// A card with a value indicator (`=` at byte 8).
    Valued {
        /// Keyword, 1..=8 ASCII characters, trailing pad spaces removed.
        keyword: String,
        /// Raw value token. Quotes are kept for string literals; empty when
        /// the value field is blank or malformed.
        value: String,
    },
    /// A commentary or blank card (no value indicator).
    Commentary,
}

/// Split one 80-byte header card into keyword and raw value tokens.
///
/// Returns [`Error::MalformedCard`] only when fewer than 80 bytes are
/// supplied. Any other malformed content degrades to an empty value token,
/// matching the tolerant nature of the format.
pub fn read_card(card: &[u8]) -> Result<CardToken> {
    if card.len() < CARD_SIZE {
        return Err(Error::MalformedCard);
    }

    if card[8] != b'=' {
        return Ok(CardToken::Commentary);
    }

    let keyword_end = card[..8]
        .iter()
        .position(|&b| b == b' ')
        .unwrap_or(8);
    let keyword = String::from_utf8_lossy(&card[..keyword_end]).into_owned();

    // The value field begins at the first non-space byte at or after byte 10.
    let mut start = 10;
    while start < CARD_SIZE && card[start] == b' ' {
        start += 1;
    }
    if start == CARD_SIZE {
        return Ok(CardToken::Valued {
            keyword,
            value: String::new(),
        });
    }

    let end = match card[start] {
        b'\'' => scan_string(card, start),
        b'(' => scan_tuple(card, start),
        _ => Some(scan_plain(card, start)),
    };

    let value = match end {
        Some(end) => String::from_utf8_lossy(&card[start..end]).into_owned(),
        // Unterminated quote or tuple.
        None => String::new(),
    };

    Ok(CardToken::Valued { keyword, value })
}

/// Find the end (exclusive) of a quoted string token starting at `start`.
/// Doubled quotes inside the literal are escapes and do not terminate it.
fn scan_string(card: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < CARD_SIZE {
        if card[i] == b'\'' {
            if i + 1 < CARD_SIZE && card[i + 1] == b'\'' {
                i += 2;
            } else {
                return Some(i + 1);
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Find the end (exclusive) of a parenthesized tuple token starting at `start`.
fn scan_tuple(card: &[u8], start: usize) -> Option<usize> {
    card[start..CARD_SIZE]
        .iter()
        .position(|&b| b == b')')
        .map(|off| start + off + 1)
}

/// Find the end (exclusive) of a bare token: a space or the inline comment
/// delimiter `/` terminates it.
fn scan_plain(card: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < CARD_SIZE && card[i] != b' ' && card[i] != b'/' {
        i += 1;
    }
    i
}

// ── Typed interpretation of raw value tokens ──

/// Parse an integer value token.
pub fn parse_int(value: &str) -> Option<i64> {
    value.parse::<i64>().ok()
}

/// Parse a floating-point value token.
///
/// Accepts the FITS `D` exponent notation (`1.5D+03`) alongside the usual
/// `E` form.
pub fn parse_float(value: &str) -> Option<f64> {
    let normalized = value.replace('D', "E").replace('d', "e");
    normalized.parse::<f64>().ok()
}

/// Parse a FITS logical value token (`T` or `F`).
pub fn parse_logical(value: &str) -> Option<bool> {
    match value {
        "T" => Some(true),
        "F" => Some(false),
        _ => None,
    }
}

/// Strip the quotes from a string value token, collapsing doubled quotes
/// and trimming the trailing pad spaces FITS requires inside the literal.
///
/// Returns `None` when the token is not a quoted string.
pub fn unquote(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'\'') {
        return None;
    }

    let mut out = String::new();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                out.push('\'');
                i += 2;
            } else {
                break;
            }
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    Some(out)
}
