pub mod gamma;
pub mod rle;

use crate::bitmap::Bitmap;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};

/// One term's bitmap together with both compressed forms of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedArtifact {
    pub bitmap: Vec<u8>,
    pub bits: usize,
    pub rle: Vec<u8>,
    pub gamma: Vec<u8>,
    /// Number of set bits; the gamma decoder needs it to stop.
    pub count: usize,
}

impl CompressedArtifact {
    pub fn from_bitmap(bitmap: &Bitmap) -> Result<Self> {
        let positions = bitmap.positions();
        Ok(Self {
            rle: rle::encode(bitmap.as_bytes()),
            gamma: gamma::encode(&positions)?,
            count: positions.len(),
            bits: bitmap.bits(),
            bitmap: bitmap.as_bytes().to_vec(),
        })
    }

    pub fn raw_bitmap(&self) -> Result<Bitmap> {
        Bitmap::from_bytes(self.bitmap.clone(), self.bits)
    }

    pub fn decode_rle_bitmap(&self) -> Result<Bitmap> {
        Bitmap::from_bytes(rle::decode_with_limit(&self.rle, self.bits.div_ceil(8))?, self.bits)
    }

    pub fn decode_gamma_bitmap(&self) -> Result<Bitmap> {
        let positions = gamma::decode(&self.gamma, self.count)?;
        Bitmap::from_positions(&positions, self.bits)
    }

    /// Both compressed forms must decode to exactly the raw bitmap's set bits.
    pub fn verify(&self) -> Result<()> {
        let raw = self.raw_bitmap()?;
        if raw.count_ones() != self.count {
            return Err(IndexError::malformed(format!(
                "artifact claims {} set bits, bitmap has {}",
                self.count,
                raw.count_ones()
            )));
        }
        if self.decode_rle_bitmap()? != raw {
            return Err(IndexError::malformed("rle form disagrees with raw bitmap"));
        }
        if self.decode_gamma_bitmap()? != raw {
            return Err(IndexError::malformed("gamma form disagrees with raw bitmap"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::DenseDocIndex;

    #[test]
    fn three_doc_artifact() {
        let dense = DenseDocIndex::from_snapshot([100, 200, 300]);
        let bm = Bitmap::from_postings(&[100, 300], &dense);
        let art = CompressedArtifact::from_bitmap(&bm).unwrap();
        assert_eq!(art.bitmap, vec![0xA0]);
        assert_eq!(art.rle, vec![0xA0, 0, 0, 0, 1]);
        assert_eq!(art.gamma, vec![0xA0]);
        assert_eq!(art.count, 2);
        art.verify().unwrap();
    }

    #[test]
    fn empty_bitmap_artifact() {
        let art = CompressedArtifact::from_bitmap(&Bitmap::zeroed(12)).unwrap();
        assert_eq!(art.rle, vec![0, 0, 0, 0, 2]);
        assert!(art.gamma.is_empty());
        art.verify().unwrap();
    }

    #[test]
    fn tampered_artifact_fails_verify() {
        let bm = Bitmap::from_positions(&[2, 5, 20], 24).unwrap();
        let mut art = CompressedArtifact::from_bitmap(&bm).unwrap();
        art.verify().unwrap();
        art.rle[0] ^= 0x01;
        assert!(art.verify().is_err());
    }

    #[test]
    fn corrupt_run_length_is_malformed() {
        let bm = Bitmap::from_positions(&[1], 8).unwrap();
        let mut art = CompressedArtifact::from_bitmap(&bm).unwrap();
        art.rle = vec![0x80, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(art.decode_rle_bitmap(), Err(IndexError::Malformed(_))));
        assert!(matches!(art.verify(), Err(IndexError::Malformed(_))));
    }
}
