//! Record rendering for sessions.
//!
//! A formatted record is ASCII `['-']I.DD`, padded with spaces to a multiple
//! of [`RECORD_STRIDE`] bytes so a consumer can resynchronize on record
//! boundaries after a partial read. A raw record is the code as two
//! big-endian bytes.

use crate::lookup::FRACTION_DIGITS;

/// Formatted records always span a multiple of this many bytes
pub const RECORD_STRIDE: usize = 10;

/// Room for the longest formatted record (`i32::MIN` renders to 12 chars)
pub const RECORD_CAPACITY: usize = 2 * RECORD_STRIDE;

pub const RAW_RECORD_LEN: usize = 2;

// sign + 8 integer digits + '.' + fraction
const MAX_TEXT_LEN: usize = 12;

/// Render a fixed-point value as text into `buf`, returning the record length
pub fn render_formatted(value: i32, buf: &mut [u8; RECORD_CAPACITY]) -> usize {
    let mut text = [0u8; MAX_TEXT_LEN];
    let mut pos = text.len();
    let mut magnitude = value.unsigned_abs();

    for _ in 0..FRACTION_DIGITS {
        pos -= 1;
        text[pos] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
    }
    pos -= 1;
    text[pos] = b'.';
    loop {
        pos -= 1;
        text[pos] = b'0' + (magnitude % 10) as u8;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        pos -= 1;
        text[pos] = b'-';
    }

    let text = &text[pos..];
    buf[..text.len()].copy_from_slice(text);

    let mut len = text.len();
    while len % RECORD_STRIDE != 0 {
        buf[len] = b' ';
        len += 1;
    }
    len
}

/// Render a raw code as two big-endian bytes
pub fn render_raw(raw: u16, buf: &mut [u8; RECORD_CAPACITY]) -> usize {
    buf[..RAW_RECORD_LEN].copy_from_slice(&raw.to_be_bytes());
    RAW_RECORD_LEN
}
