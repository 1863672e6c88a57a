//! FITS image-unit header parsing.
//!
//! The header of an image unit is a sequence of 80-byte cards whose leading
//! keywords must arrive in a mandated order (SIMPLE/XTENSION, BITPIX, NAXIS,
//! NAXIS1..NAXISn, then PCOUNT/GCOUNT for extensions). [`HeaderParser`] is an
//! explicit state-machine value driven one card at a time, so a single card
//! transition can be tested in isolation; [`parse_header`] drives it over a
//! byte buffer with a bounds check before every card read.

use alloc::string::String;
use alloc::vec::Vec;

use crate::block::{trailing_pad_cards, CARD_SIZE};
use crate::card::{parse_float, parse_int, parse_logical, read_card, unquote, CardToken};
use crate::error::{Error, Result};

/// BITPIX values with a defined sample encoding.
pub const VALID_BITPIX: [i32; 6] = [8, 16, 32, 64, -32, -64];

/// Upper bound on NAXIS accepted by the parser; the format reserves at
/// most three digits for the axis index.
const MAX_NAXIS: u64 = 999;

/// The parsed state of one image unit's header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    /// `true` for a primary unit (SIMPLE), `false` for an IMAGE extension.
    pub is_primary: bool,
    /// BITPIX: sample bit width, negative for IEEE floats.
    pub bits_per_pixel: i32,
    /// NAXIS1..NAXISn.
    pub dims: Vec<u64>,
    /// PCOUNT (random-groups parameter count; 0 for plain images).
    pub param_count: u64,
    /// GCOUNT (random-groups group count; 1 for plain images).
    pub group_count: u64,
    /// GROUPS = T was seen.
    pub uses_random_groups: bool,
    /// BLANK sentinel value. Only meaningful for integer sample types;
    /// cleared with a warning when BITPIX is negative.
    pub blank: Option<i64>,
    /// BSCALE linear scale factor.
    pub bscale: f64,
    /// BZERO linear offset.
    pub bzero: f64,
    /// Explicit DATAMIN, in the physical (post BSCALE/BZERO) domain.
    pub data_min: Option<f64>,
    /// Explicit DATAMAX, in the physical domain.
    pub data_max: Option<f64>,
    /// CTYPE3 began with "RGB".
    pub is_rgb_cube: bool,
    /// Unrecognized keyword/value pairs, raw value text, in arrival order.
    pub metadata: Vec<(String, String)>,
}

impl Default for HeaderRecord {
    fn default() -> Self {
        HeaderRecord {
            is_primary: true,
            bits_per_pixel: 0,
            dims: Vec::new(),
            param_count: 0,
            group_count: 1,
            uses_random_groups: false,
            blank: None,
            bscale: 1.0,
            bzero: 0.0,
            data_min: None,
            data_max: None,
            is_rgb_cube: false,
            metadata: Vec::new(),
        }
    }
}

impl HeaderRecord {
    /// Number of axes of the pixel matrix.
    pub fn naxis(&self) -> usize {
        self.dims.len()
    }
}

/// Parser position within the mandated keyword sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderState {
    PrimaryOrExtension,
    Bitpix,
    Naxis,
    NaxisN { next: usize },
    Pcount,
    Gcount,
    Freeform,
    Done,
}

/// Card-at-a-time header state machine.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    state: HeaderState,
    naxis: usize,
    record: HeaderRecord,
}

impl Default for HeaderParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderParser {
    /// Create a parser positioned before the first card of an image unit.
    pub fn new() -> Self {
        HeaderParser {
            state: HeaderState::PrimaryOrExtension,
            naxis: 0,
            record: HeaderRecord::default(),
        }
    }

    /// Returns `true` once the END card has been consumed.
    pub fn is_done(&self) -> bool {
        self.state == HeaderState::Done
    }

    /// Consume one 80-byte card. Returns `Ok(true)` when the card was END.
    pub fn advance(&mut self, card: &[u8]) -> Result<bool> {
        if card.len() < CARD_SIZE {
            return Err(Error::MalformedCard);
        }

        // END only terminates the free-form section. In a mandatory slot it
        // tokenizes as a commentary card and hits the per-state keyword
        // check below, so a header that stops short of NAXIS (or any other
        // mandated card) is a sequence violation, not a valid header.
        if self.state == HeaderState::Freeform && &card[..8] == b"END     " {
            self.state = HeaderState::Done;
            return Ok(true);
        }

        let token = read_card(card)?;

        match self.state {
            HeaderState::PrimaryOrExtension => self.on_first(&token)?,
            HeaderState::Bitpix => self.on_bitpix(&token)?,
            HeaderState::Naxis => self.on_naxis(&token)?,
            HeaderState::NaxisN { next } => self.on_naxis_n(&token, next)?,
            HeaderState::Pcount => self.on_pcount(&token)?,
            HeaderState::Gcount => self.on_gcount(&token)?,
            HeaderState::Freeform => self.on_freeform(token),
            HeaderState::Done => return Err(Error::HeaderSequenceError),
        }
        Ok(false)
    }

    /// Freeze the accumulated record. Must only be called once END has been
    /// seen; otherwise the header was truncated.
    pub fn finish(self) -> Result<HeaderRecord> {
        if self.state != HeaderState::Done {
            return Err(Error::TruncatedHeader);
        }
        let mut record = self.record;
        if record.blank.is_some() && record.bits_per_pixel < 0 {
            log::warn!("BLANK keyword is invalid for floating point samples, ignoring");
            record.blank = None;
        }
        Ok(record)
    }

    fn expect_valued<'a>(&self, token: &'a CardToken, keyword: &str) -> Result<&'a str> {
        match token {
            CardToken::Valued { keyword: kw, value } if kw == keyword => Ok(value),
            _ => Err(Error::HeaderSequenceError),
        }
    }

    fn on_first(&mut self, token: &CardToken) -> Result<()> {
        match token {
            CardToken::Valued { keyword, value } if keyword == "SIMPLE" => {
                self.record.is_primary = true;
                if parse_logical(value) != Some(true) {
                    log::warn!("SIMPLE = {value}: file does not conform to the standard");
                }
            }
            CardToken::Valued { keyword, value } if keyword == "XTENSION" => {
                self.record.is_primary = false;
                let name = unquote(value).unwrap_or_default();
                if !name.starts_with("IMAGE") {
                    return Err(Error::HeaderSequenceError);
                }
            }
            _ => return Err(Error::HeaderSequenceError),
        }
        self.state = HeaderState::Bitpix;
        Ok(())
    }

    fn on_bitpix(&mut self, token: &CardToken) -> Result<()> {
        let value = self.expect_valued(token, "BITPIX")?;
        let bitpix = parse_int(value).ok_or(Error::HeaderSequenceError)?;
        let bitpix = i32::try_from(bitpix).map_err(|_| Error::UnsupportedSampleType(i32::MAX))?;
        if !VALID_BITPIX.contains(&bitpix) {
            return Err(Error::UnsupportedSampleType(bitpix));
        }
        self.record.bits_per_pixel = bitpix;
        self.state = HeaderState::Naxis;
        Ok(())
    }

    fn on_naxis(&mut self, token: &CardToken) -> Result<()> {
        let value = self.expect_valued(token, "NAXIS")?;
        let naxis = parse_int(value)
            .filter(|&n| n >= 0 && (n as u64) <= MAX_NAXIS)
            .ok_or(Error::HeaderSequenceError)?;
        self.naxis = naxis as usize;
        self.record.dims.reserve(self.naxis);
        self.state = if self.naxis == 0 {
            self.after_dims()
        } else {
            HeaderState::NaxisN { next: 1 }
        };
        Ok(())
    }

    fn on_naxis_n(&mut self, token: &CardToken, next: usize) -> Result<()> {
        let expected = alloc::format!("NAXIS{next}");
        let value = self.expect_valued(token, &expected)?;
        let dim = parse_int(value)
            .filter(|&n| n >= 0)
            .ok_or(Error::HeaderSequenceError)?;
        self.record.dims.push(dim as u64);
        self.state = if next == self.naxis {
            self.after_dims()
        } else {
            HeaderState::NaxisN { next: next + 1 }
        };
        Ok(())
    }

    /// IMAGE extensions carry mandatory PCOUNT/GCOUNT cards after the axes;
    /// primary units go straight to the free-form section.
    fn after_dims(&self) -> HeaderState {
        if self.record.is_primary {
            HeaderState::Freeform
        } else {
            HeaderState::Pcount
        }
    }

    fn on_pcount(&mut self, token: &CardToken) -> Result<()> {
        let value = self.expect_valued(token, "PCOUNT")?;
        if parse_int(value) != Some(0) {
            return Err(Error::HeaderSequenceError);
        }
        self.state = HeaderState::Gcount;
        Ok(())
    }

    fn on_gcount(&mut self, token: &CardToken) -> Result<()> {
        let value = self.expect_valued(token, "GCOUNT")?;
        if parse_int(value) != Some(1) {
            return Err(Error::HeaderSequenceError);
        }
        self.state = HeaderState::Freeform;
        Ok(())
    }

    fn on_freeform(&mut self, token: CardToken) {
        let (keyword, value) = match token {
            CardToken::Valued { keyword, value } => (keyword, value),
            CardToken::Commentary => return,
        };
        if !self.apply_recognized(&keyword, &value) && !keyword.is_empty() {
            self.record.metadata.push((keyword, value));
        }
    }

    /// Apply a recognized free-form keyword to the record. Returns `false`
    /// for unrecognized keywords, which become metadata. Unparseable values
    /// for recognized keywords are ignored rather than fatal, matching the
    /// tolerance of the rest of the format.
    fn apply_recognized(&mut self, keyword: &str, value: &str) -> bool {
        match keyword {
            "BLANK" => {
                if let Some(v) = parse_int(value) {
                    self.record.blank = Some(v);
                }
            }
            "BSCALE" => {
                if let Some(v) = parse_float(value) {
                    self.record.bscale = v;
                }
            }
            "BZERO" => {
                if let Some(v) = parse_float(value) {
                    self.record.bzero = v;
                }
            }
            "DATAMIN" => self.record.data_min = parse_float(value),
            "DATAMAX" => self.record.data_max = parse_float(value),
            "CTYPE3" => {
                if unquote(value).is_some_and(|s| s.starts_with("RGB")) {
                    self.record.is_rgb_cube = true;
                }
            }
            "GROUPS" => {
                if parse_logical(value) == Some(true) {
                    self.record.uses_random_groups = true;
                }
            }
            // The random-groups form; extension units consumed theirs in
            // the mandatory slots already.
            "PCOUNT" if self.record.is_primary => {
                if let Some(v) = parse_int(value).filter(|&n| n >= 0) {
                    self.record.param_count = v as u64;
                }
            }
            "GCOUNT" if self.record.is_primary => {
                if let Some(v) = parse_int(value).filter(|&n| n >= 0) {
                    self.record.group_count = v as u64;
                }
            }
            _ => return false,
        }
        true
    }
}

/// Parse one complete image-unit header from the start of `buf`.
///
/// Returns the frozen [`HeaderRecord`] and the number of bytes consumed,
/// including the blank padding cards after END (always a multiple of 2880).
/// The remaining buffer length is checked before every card read and before
/// the trailing padding is skipped.
pub fn parse_header(buf: &[u8]) -> Result<(HeaderRecord, usize)> {
    let mut parser = HeaderParser::new();
    let mut offset = 0;
    let mut cards = 0usize;

    loop {
        if offset + CARD_SIZE > buf.len() {
            return Err(Error::TruncatedHeader);
        }
        let done = parser.advance(&buf[offset..offset + CARD_SIZE])?;
        offset += CARD_SIZE;
        cards += 1;
        if done {
            break;
        }
    }

    let pad_bytes = trailing_pad_cards(cards) * CARD_SIZE;
    if offset + pad_bytes > buf.len() {
        return Err(Error::TruncatedHeader);
    }
    offset += pad_bytes;

    let record = parser.finish()?;
    Ok((record, offset))
}
