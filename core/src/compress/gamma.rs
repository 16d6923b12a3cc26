//! Elias-gamma coding of the gaps between ascending 1-based positions.
//!
//! A value `v >= 1` with bit length `L` is written as `L - 1` zero bits
//! followed by `v` in `L` bits, MSB first. Bits are packed MSB first and the
//! last byte is zero padded, so decoding needs the element count.

use crate::error::{IndexError, Result};

#[derive(Default)]
struct BitWriter {
    out: Vec<u8>,
    used: u8,
}

impl BitWriter {
    fn push(&mut self, bit: bool) {
        if self.used == 0 {
            self.out.push(0);
        }
        if bit {
            if let Some(last) = self.out.last_mut() {
                *last |= 0x80 >> self.used;
            }
        }
        self.used = (self.used + 1) % 8;
    }

    fn push_gamma(&mut self, value: u32) {
        debug_assert!(value >= 1);
        let len = 32 - value.leading_zeros();
        for _ in 1..len {
            self.push(false);
        }
        for shift in (0..len).rev() {
            self.push((value >> shift) & 1 == 1);
        }
    }

    fn finish(self) -> Vec<u8> { self.out }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self { Self { bytes, pos: 0 } }

    fn next_bit(&mut self) -> Option<bool> {
        let byte = *self.bytes.get(self.pos / 8)?;
        let bit = byte & (0x80 >> (self.pos % 8)) != 0;
        self.pos += 1;
        Some(bit)
    }

    fn read_gamma(&mut self) -> Result<u32> {
        let mut zeros = 0u32;
        loop {
            match self.next_bit() {
                Some(false) => zeros += 1,
                Some(true) => break,
                None => return Err(IndexError::malformed("gamma stream ended inside a prefix")),
            }
            if zeros > 31 {
                return Err(IndexError::malformed("gamma prefix longer than 31 bits"));
            }
        }
        let mut value: u32 = 1;
        for _ in 0..zeros {
            let bit = self
                .next_bit()
                .ok_or_else(|| IndexError::malformed("gamma stream ended inside a value"))?;
            value = (value << 1) | bit as u32;
        }
        Ok(value)
    }
}

/// Encode strictly increasing positive positions as gamma-coded gaps.
pub fn encode(positions: &[u32]) -> Result<Vec<u8>> {
    let mut w = BitWriter::default();
    let mut prev = 0u32;
    for (index, &p) in positions.iter().enumerate() {
        if p <= prev {
            return Err(IndexError::NotStrictlyIncreasing { index, prev, next: p });
        }
        w.push_gamma(p - prev);
        prev = p;
    }
    Ok(w.finish())
}

/// Decode `count` positions. Trailing padding bits are ignored.
pub fn decode(bytes: &[u8], count: usize) -> Result<Vec<u32>> {
    let mut r = BitReader::new(bytes);
    let mut out = Vec::with_capacity(count.min(bytes.len() * 8));
    let mut prev = 0u32;
    for _ in 0..count {
        let gap = r.read_gamma()?;
        prev = prev
            .checked_add(gap)
            .ok_or_else(|| IndexError::malformed("decoded position overflows u32"))?;
        out.push(prev);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_one_and_two() {
        // gap 1 -> "1", gap 2 -> "010"
        assert_eq!(encode(&[1, 3]).unwrap(), vec![0b1010_0000]);
        assert_eq!(decode(&[0b1010_0000], 2).unwrap(), vec![1, 3]);
    }

    #[test]
    fn known_codewords() {
        // 5 = 101 -> "00101"
        assert_eq!(encode(&[5]).unwrap(), vec![0b0010_1000]);
        // 9 = 1001 -> "0001001"
        assert_eq!(encode(&[9]).unwrap(), vec![0b0001_0010]);
    }

    #[test]
    fn empty_and_single() {
        assert!(encode(&[]).unwrap().is_empty());
        assert!(decode(&[], 0).unwrap().is_empty());
        for p in [1u32, 2, 255, 256, 70_000, u32::MAX] {
            let enc = encode(&[p]).unwrap();
            assert_eq!(decode(&enc, 1).unwrap(), vec![p]);
        }
    }

    #[test]
    fn long_consecutive_run_is_one_bit_each() {
        let positions: Vec<u32> = (1..=1000).collect();
        let enc = encode(&positions).unwrap();
        assert_eq!(enc.len(), 125);
        assert!(enc.iter().all(|&b| b == 0xFF));
        assert_eq!(decode(&enc, positions.len()).unwrap(), positions);
    }

    #[test]
    fn sparse_sequence_roundtrip() {
        let positions = vec![3, 4, 10, 100, 101, 5000, 65_537, 1_000_000];
        let enc = encode(&positions).unwrap();
        assert_eq!(decode(&enc, positions.len()).unwrap(), positions);
    }

    #[test]
    fn rejects_non_increasing_input() {
        assert!(matches!(
            encode(&[2, 2]),
            Err(IndexError::NotStrictlyIncreasing { index: 1, prev: 2, next: 2 })
        ));
        assert!(matches!(encode(&[0]), Err(IndexError::NotStrictlyIncreasing { index: 0, .. })));
    }

    #[test]
    fn asking_for_too_many_elements_fails() {
        let enc = encode(&[1, 3]).unwrap();
        // the padding zeros read as an unterminated prefix
        assert!(decode(&enc, 3).is_err());
    }
}
