//! Byte-granularity run-length coding: `[value: u8][count: u32 BE]` pairs.

use crate::error::{IndexError, Result};

const PAIR_LEN: usize = 5;

pub fn encode(bytes: &[u8]) -> Vec<u8> {
    encode_with_max_run(bytes, u32::MAX)
}

/// Runs longer than `max_run` are split into several pairs. The byte that
/// overflows a full run opens the next one with a count of 1.
pub(crate) fn encode_with_max_run(bytes: &[u8], max_run: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut iter = bytes.iter().copied();
    let Some(mut cur) = iter.next() else { return out };
    let mut count: u32 = 1;
    for b in iter {
        if b == cur && count < max_run {
            count += 1;
        } else {
            push_pair(&mut out, cur, count);
            cur = b;
            count = 1;
        }
    }
    push_pair(&mut out, cur, count);
    out
}

fn push_pair(out: &mut Vec<u8>, value: u8, count: u32) {
    out.push(value);
    out.extend_from_slice(&count.to_be_bytes());
}

pub fn decode(encoded: &[u8]) -> Result<Vec<u8>> {
    decode_with_limit(encoded, usize::MAX)
}

/// Like [`decode`], but fails before allocating once the pairs add up to
/// more than `max_len` bytes.
pub fn decode_with_limit(encoded: &[u8], max_len: usize) -> Result<Vec<u8>> {
    if encoded.len() % PAIR_LEN != 0 {
        return Err(IndexError::malformed(format!(
            "rle stream of {} bytes is not a whole number of pairs",
            encoded.len()
        )));
    }
    let mut total: usize = 0;
    for pair in encoded.chunks_exact(PAIR_LEN) {
        total = total
            .checked_add(pair_count(pair) as usize)
            .filter(|t| *t <= max_len)
            .ok_or_else(|| IndexError::malformed(format!("rle stream expands past {max_len} bytes")))?;
    }
    let mut out = Vec::with_capacity(total);
    for pair in encoded.chunks_exact(PAIR_LEN) {
        out.resize(out.len() + pair_count(pair) as usize, pair[0]);
    }
    Ok(out)
}

fn pair_count(pair: &[u8]) -> u32 {
    u32::from_be_bytes([pair[1], pair[2], pair[3], pair[4]])
}
