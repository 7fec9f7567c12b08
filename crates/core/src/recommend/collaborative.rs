//! Item-to-item collaborative similarity from co-purchase presence

use std::collections::HashMap;

use super::transactions::Itemset;
use super::types::SignalMap;
use crate::domain::product::{Product, ProductId};

pub const DEFAULT_TOP_K: usize = 5;

/// Presence of a product in each transaction, one bit per transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
    ones: u32,
}

impl BitVector {
    pub fn zeros(len: usize) -> Self {
        Self { words: vec![0; len.div_ceil(64)], ones: 0 }
    }

    pub fn set(&mut self, index: usize) {
        let (word, bit) = (index / 64, index % 64);
        let mask = 1u64 << bit;
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.ones += 1;
        }
    }

    pub fn count_ones(&self) -> u32 {
        self.ones
    }

    /// Cosine similarity of two 0/1 vectors of equal length. Zero when
    /// either vector is all zeros.
    pub fn cosine(&self, other: &Self) -> f64 {
        if self.ones == 0 || other.ones == 0 {
            return 0.0;
        }
        let shared: u32 =
            self.words.iter().zip(&other.words).map(|(a, b)| (a & b).count_ones()).sum();
        f64::from(shared) / (f64::from(self.ones) * f64::from(other.ones)).sqrt()
    }
}

/// Averages each product's top-K cosine similarities to the rest of the
/// catalog, then normalizes by the global maximum.
#[derive(Debug, Clone, Copy)]
pub struct CollaborativeSimilarityScorer {
    top_k: usize,
}

impl Default for CollaborativeSimilarityScorer {
    fn default() -> Self {
        Self { top_k: DEFAULT_TOP_K }
    }
}

impl CollaborativeSimilarityScorer {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn score(&self, products: &[Product], itemsets: &[Itemset]) -> SignalMap {
        if products.is_empty() {
            return SignalMap::new();
        }

        let vectors = presence_vectors(products, itemsets);
        let scores: SignalMap = products
            .iter()
            .enumerate()
            .map(|(i, product)| {
                let mut similarities: Vec<f64> = vectors
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, other)| vectors[i].cosine(other))
                    .collect();
                similarities.sort_by(|a, b| b.total_cmp(a));
                similarities.truncate(self.top_k);

                let mean = if similarities.is_empty() {
                    0.0
                } else {
                    similarities.iter().sum::<f64>() / similarities.len() as f64
                };
                (product.id, mean)
            })
            .collect();

        scores.normalized()
    }
}

/// One vector per catalog product, in catalog order. Ids outside the catalog
/// are ignored.
fn presence_vectors(products: &[Product], itemsets: &[Itemset]) -> Vec<BitVector> {
    let slots: HashMap<ProductId, usize> =
        products.iter().enumerate().map(|(slot, product)| (product.id, slot)).collect();
    let mut vectors = vec![BitVector::zeros(itemsets.len()); products.len()];

    for (transaction, itemset) in itemsets.iter().enumerate() {
        for id in itemset {
            if let Some(&slot) = slots.get(id) {
                vectors[slot].set(transaction);
            }
        }
    }

    vectors
}
