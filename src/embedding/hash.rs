//! Offline feature-hashing embedder.
//!
//! Each lower-cased alphanumeric word is hashed with SHA-256; the first
//! eight bytes pick a dimension and one bit of the ninth picks the sign.
//! The summed vector is L2-normalised. Texts that share words land near
//! each other, which is enough to exercise the pipeline end to end without
//! a network or model download. It is not a semantic model.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;

pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Result<Self> {
        if dims == 0 {
            bail!("hash embedder needs dims > 0");
        }
        Ok(Self { dims })
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];

        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.to_lowercase().as_bytes());
            let mut idx_bytes = [0u8; 8];
            idx_bytes.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(idx_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_zero_dims_rejected() {
        assert!(HashEmbedder::new(0).is_err());
    }

    #[test]
    fn test_deterministic_and_normalised() {
        let e = HashEmbedder::new(64).unwrap();
        let a = e.embed_one("Unexplained haemoptysis in a smoker");
        let b = e.embed_one("Unexplained haemoptysis in a smoker");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let e = HashEmbedder::new(64).unwrap();
        assert_eq!(e.embed_one("Dyspepsia, weight loss."), e.embed_one("dyspepsia weight LOSS"));
    }

    #[test]
    fn test_shared_words_are_closer() {
        let e = HashEmbedder::new(256).unwrap();
        let query = e.embed_one("urgent referral dyspepsia");
        let related = e.embed_one("refer people with dyspepsia for an urgent referral");
        let unrelated = e.embed_one("melanoma skin lesion assessment");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8).unwrap();
        assert!(e.embed_one("  ").iter().all(|v| *v == 0.0));
    }
}
