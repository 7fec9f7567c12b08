//! TF-IDF content similarity over product names and descriptions

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::types::SignalMap;
use crate::domain::product::Product;

fn symbol_run_regex() -> &'static Regex {
    static SYMBOL_RUN_RE: OnceLock<Regex> = OnceLock::new();
    SYMBOL_RUN_RE.get_or_init(|| {
        Regex::new(r"[^\p{L}\p{N}\s]+").expect("symbol run regex should compile")
    })
}

/// Lowercases, replaces every run of characters outside the Unicode letter
/// and number categories (and whitespace) with a single space, then
/// collapses whitespace. Combining marks are not letters and are stripped.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = symbol_run_regex().replace_all(&lowered, " ");

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// Term weights keyed by vocabulary index, sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
    norm: f64,
}

impl SparseVector {
    pub fn from_entries(mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(index, _)| *index);
        let norm = entries.iter().map(|(_, weight)| weight * weight).sum::<f64>().sqrt();
        Self { entries, norm }
    }

    /// Cosine similarity; vocabulary slots a vector lacks count as zero.
    /// Returns `0.0` when either vector has zero norm.
    pub fn cosine(&self, other: &Self) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }

        let mut dot = 0.0;
        let (mut left, mut right) = (self.entries.iter().peekable(), other.entries.iter().peekable());
        while let (Some((li, lw)), Some((ri, rw))) = (left.peek(), right.peek()) {
            match li.cmp(ri) {
                std::cmp::Ordering::Less => {
                    left.next();
                }
                std::cmp::Ordering::Greater => {
                    right.next();
                }
                std::cmp::Ordering::Equal => {
                    dot += lw * rw;
                    left.next();
                    right.next();
                }
            }
        }

        dot / (self.norm * other.norm)
    }
}

/// TF-IDF vectors for a corpus. `tf` is the raw count over the document's
/// largest term count and `idf = ln(1 + N / df)`.
pub fn tfidf_vectors(documents: &[String]) -> Vec<SparseVector> {
    let mut vocabulary: HashMap<&str, usize> = HashMap::new();
    let mut term_counts: Vec<HashMap<usize, usize>> = Vec::with_capacity(documents.len());

    for document in documents {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for token in tokenize(document) {
            let next_index = vocabulary.len();
            let index = *vocabulary.entry(token).or_insert(next_index);
            *counts.entry(index).or_insert(0) += 1;
        }
        term_counts.push(counts);
    }

    let mut document_frequency = vec![0usize; vocabulary.len()];
    for counts in &term_counts {
        for index in counts.keys() {
            document_frequency[*index] += 1;
        }
    }

    let total_documents = documents.len() as f64;
    term_counts
        .iter()
        .map(|counts| {
            let max_count = counts.values().copied().max().unwrap_or(1) as f64;
            let entries = counts
                .iter()
                .map(|(&index, &count)| {
                    let tf = count as f64 / max_count;
                    let idf = (1.0 + total_documents / document_frequency[index].max(1) as f64).ln();
                    (index, tf * idf)
                })
                .collect();
            SparseVector::from_entries(entries)
        })
        .collect()
}

/// Mean cosine similarity of each product to every other product,
/// normalized by the largest mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSimilarityScorer;

impl ContentSimilarityScorer {
    pub fn score(&self, products: &[Product]) -> SignalMap {
        if products.len() < 2 {
            return products.iter().map(|product| (product.id, 0.0)).collect();
        }

        let documents: Vec<String> =
            products.iter().map(|product| normalize_text(&product.document())).collect();
        let vectors = tfidf_vectors(&documents);
        let others = (vectors.len() - 1) as f64;

        let scores: SignalMap = products
            .iter()
            .enumerate()
            .map(|(i, product)| {
                let total: f64 = vectors
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, other)| vectors[i].cosine(other))
                    .sum();
                (product.id, total / others)
            })
            .collect();

        scores.normalized()
    }
}
