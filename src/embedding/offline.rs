//! Deterministic, network-free embeddings.
//!
//! The vector is a fingerprint of the SHA-256 digest of the text: the
//! 64-character hex digest is cut into sixteen 4-character groups, each
//! group is read as a base-16 integer and reduced modulo 1000. Identical
//! text always maps to the identical vector; it carries no semantic
//! similarity beyond exact duplicates.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{EmbedError, EmbeddingProvider};

/// Dimensionality of [`offline_embedding`] vectors.
pub const OFFLINE_DIMS: usize = 16;
/// Model name recorded in indexes built with the offline strategy.
pub const OFFLINE_MODEL: &str = "offline-sha256";

const HEX_GROUP: usize = 4;
const MODULUS: u32 = 1000;

/// Compute the offline embedding of `text`.
pub fn offline_embedding(text: &str) -> Vec<f32> {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest
        .as_bytes()
        .chunks_exact(HEX_GROUP)
        .map(|group| (hex_value(group) % MODULUS) as f32)
        .collect()
}

fn hex_value(group: &[u8]) -> u32 {
    group.iter().fold(0u32, |acc, &c| {
        acc * 16 + (c as char).to_digit(16).unwrap_or(0)
    })
}

/// The always-available embedding strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineHashProvider;

#[async_trait]
impl EmbeddingProvider for OfflineHashProvider {
    fn model_name(&self) -> &str {
        OFFLINE_MODEL
    }

    fn dims(&self) -> usize {
        OFFLINE_DIMS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(offline_embedding(text))
    }
}
