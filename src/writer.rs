//! Emission of 80-byte header cards.
//!
//! [`CardWriter`] accumulates cards and finishes the header with an END card
//! plus the blank cards that round it to a whole number of 2880-byte blocks.
//! Layout of a valued card: keyword left-justified in bytes 0..8, `=` at
//! byte 8, a space at byte 9, and the value starting at byte 10. Logical
//! values sit right-justified at byte 29, the fixed-format column.

use alloc::string::String;
use alloc::vec::Vec;

use crate::block::{trailing_pad_cards, CARD_SIZE, HEADER_PAD_BYTE};

/// Builds one image unit's header, card by card.
#[derive(Debug, Default)]
pub struct CardWriter {
    buf: Vec<u8>,
    cards: usize,
}

impl CardWriter {
    pub fn new() -> CardWriter {
        CardWriter::default()
    }

    /// Cards emitted so far.
    pub fn card_count(&self) -> usize {
        self.cards
    }

    fn push_card(&mut self, keyword: &str, value: &[u8], at: usize) {
        let start = self.buf.len();
        self.buf.resize(start + CARD_SIZE, HEADER_PAD_BYTE);
        let card = &mut self.buf[start..];
        let kw = keyword.as_bytes();
        card[..kw.len().min(8)].copy_from_slice(&kw[..kw.len().min(8)]);
        card[8] = b'=';
        let len = value.len().min(CARD_SIZE - at);
        card[at..at + len].copy_from_slice(&value[..len]);
        self.cards += 1;
    }

    /// Emit a logical card (`T`/`F` at byte 29).
    pub fn logical(&mut self, keyword: &str, value: bool) {
        self.push_card(keyword, if value { b"T" } else { b"F" }, 29);
    }

    /// Emit an integer card.
    pub fn integer(&mut self, keyword: &str, value: i64) {
        let text = alloc::format!("{value}");
        self.push_card(keyword, text.as_bytes(), 10);
    }

    /// Emit a quoted string card. Embedded quotes are doubled and the
    /// literal is padded to the eight-character minimum.
    pub fn string(&mut self, keyword: &str, value: &str) {
        let mut escaped = String::new();
        for c in value.chars() {
            escaped.push(c);
            if c == '\'' {
                escaped.push('\'');
            }
        }
        let text = alloc::format!("'{escaped:<8}'");
        self.push_card(keyword, text.as_bytes(), 10);
    }

    /// Re-emit a raw value token exactly as it was read.
    pub fn raw(&mut self, keyword: &str, value: &str) {
        self.push_card(keyword, value.as_bytes(), 10);
    }

    /// Emit the END card and pad the header to a whole number of blocks.
    pub fn finish(mut self) -> Vec<u8> {
        let start = self.buf.len();
        self.buf.resize(start + CARD_SIZE, HEADER_PAD_BYTE);
        self.buf[start..start + 3].copy_from_slice(b"END");
        self.cards += 1;

        let pad = trailing_pad_cards(self.cards);
        self.buf
            .resize(self.buf.len() + pad * CARD_SIZE, HEADER_PAD_BYTE);
        self.buf
    }
}
