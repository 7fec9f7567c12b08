//! Frequent itemset mining and association-rule affinity
//!
//! Level-wise Apriori: frequent k-itemsets are joined on their shared
//! (k-1)-prefix, candidates with an infrequent k-subset are pruned before
//! counting, and rules are derived from every frequent itemset of two or more
//! items.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::transactions::Itemset;
use super::types::{PairScores, SignalMap};
use crate::domain::product::ProductId;

/// Support and confidence floors for mined rules (both inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MiningThresholds {
    pub min_support: f64,
    pub min_confidence: f64,
}

impl Default for MiningThresholds {
    fn default() -> Self {
        Self { min_support: 0.01, min_confidence: 0.1 }
    }
}

/// Association rule: antecedent => consequent
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub antecedent: Vec<ProductId>,
    pub consequent: Vec<ProductId>,
    /// Support of antecedent ∪ consequent
    pub support: f64,
    /// P(consequent | antecedent)
    pub confidence: f64,
}

impl Rule {
    /// Strength credited to the rule's antecedent members.
    pub fn value(&self) -> f64 {
        self.support * self.confidence
    }
}

/// Per-product and per-pair affinity derived from mined rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationScores {
    pub affinity: SignalMap,
    pub pairs: PairScores,
}

#[derive(Debug, Clone, Default)]
pub struct AssociationMiner {
    thresholds: MiningThresholds,
}

impl AssociationMiner {
    pub fn new(thresholds: MiningThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> MiningThresholds {
        self.thresholds
    }

    /// Mines rules and folds them into affinity maps.
    pub fn score(&self, itemsets: &[Itemset]) -> AssociationScores {
        aggregate_rules(&self.mine_rules(itemsets))
    }

    /// All rules meeting both thresholds, in a deterministic order.
    pub fn mine_rules(&self, itemsets: &[Itemset]) -> Vec<Rule> {
        if itemsets.is_empty() {
            return Vec::new();
        }

        let frequent = self.frequent_itemsets(itemsets);
        let total = itemsets.len() as f64;
        let mut rules = Vec::new();

        for (items, &count) in &frequent {
            if items.len() < 2 {
                continue;
            }

            let support = count as f64 / total;
            let width = items.len();
            for mask in 1..((1u64 << width) - 1) {
                let (antecedent, consequent): (Vec<_>, Vec<_>) =
                    items.iter().enumerate().partition(|(index, _)| mask & (1u64 << *index) != 0);
                let antecedent: Vec<ProductId> = antecedent.into_iter().map(|(_, id)| *id).collect();
                let consequent: Vec<ProductId> = consequent.into_iter().map(|(_, id)| *id).collect();

                // Every subset of a frequent itemset is itself frequent.
                let Some(&antecedent_count) = frequent.get(&antecedent) else {
                    continue;
                };
                let confidence = count as f64 / antecedent_count as f64;
                if confidence >= self.thresholds.min_confidence {
                    rules.push(Rule { antecedent, consequent, support, confidence });
                }
            }
        }

        debug!(
            event_name = "recommend.association.rules_mined",
            transactions = itemsets.len(),
            frequent_itemsets = frequent.len(),
            rules = rules.len(),
            "association rules mined"
        );

        rules
    }

    /// Frequent itemsets (sorted item lists) with their transaction counts.
    fn frequent_itemsets(&self, itemsets: &[Itemset]) -> BTreeMap<Vec<ProductId>, usize> {
        let total = itemsets.len() as f64;
        let is_frequent = |count: usize| count as f64 / total >= self.thresholds.min_support;

        let mut item_counts: HashMap<ProductId, usize> = HashMap::new();
        let transactions: Vec<Vec<ProductId>> = itemsets
            .iter()
            .map(|itemset| {
                let mut items = itemset.clone();
                items.sort_unstable();
                items.dedup();
                for item in &items {
                    *item_counts.entry(*item).or_insert(0) += 1;
                }
                items
            })
            .collect();

        let mut frequent: BTreeMap<Vec<ProductId>, usize> = item_counts
            .into_iter()
            .filter(|(_, count)| is_frequent(*count))
            .map(|(item, count)| (vec![item], count))
            .collect();

        // Items that are not frequent on their own cannot appear in any
        // larger frequent itemset.
        let frequent_items: HashSet<ProductId> = frequent.keys().map(|items| items[0]).collect();
        let transactions: Vec<Vec<ProductId>> = transactions
            .into_iter()
            .map(|items| items.into_iter().filter(|item| frequent_items.contains(item)).collect())
            .filter(|items: &Vec<ProductId>| items.len() >= 2)
            .collect();

        let mut current: Vec<Vec<ProductId>> = frequent.keys().cloned().collect();
        while !current.is_empty() {
            let candidates = generate_candidates(&current);
            if candidates.is_empty() {
                break;
            }

            let width = candidates[0].len();
            let mut counts = vec![0usize; candidates.len()];
            for transaction in transactions.iter().filter(|items| items.len() >= width) {
                for (slot, candidate) in counts.iter_mut().zip(&candidates) {
                    if is_sorted_subset(candidate, transaction) {
                        *slot += 1;
                    }
                }
            }

            current = Vec::new();
            for (candidate, count) in candidates.into_iter().zip(counts) {
                if is_frequent(count) {
                    current.push(candidate.clone());
                    frequent.insert(candidate, count);
                }
            }
        }

        frequent
    }
}

/// Joins sorted k-itemsets sharing a (k-1)-prefix and drops candidates with
/// an infrequent k-subset. `level` must be sorted lexicographically.
fn generate_candidates(level: &[Vec<ProductId>]) -> Vec<Vec<ProductId>> {
    let known: HashSet<&[ProductId]> = level.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();

    for (i, left) in level.iter().enumerate() {
        let prefix = &left[..left.len() - 1];
        for right in &level[i + 1..] {
            if &right[..right.len() - 1] != prefix {
                break;
            }

            let mut candidate = left.clone();
            candidate.push(right[right.len() - 1]);

            let has_infrequent_subset = (0..candidate.len()).any(|skip| {
                let subset: Vec<ProductId> = candidate
                    .iter()
                    .enumerate()
                    .filter(|(index, _)| *index != skip)
                    .map(|(_, id)| *id)
                    .collect();
                !known.contains(subset.as_slice())
            });
            if !has_infrequent_subset {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

fn is_sorted_subset(needle: &[ProductId], haystack: &[ProductId]) -> bool {
    let mut remaining = haystack.iter();
    needle.iter().all(|item| remaining.by_ref().any(|candidate| candidate == item))
}

/// Folds rules into affinity maps.
///
/// Each rule's `support × confidence` is added to every antecedent member
/// (never the consequent), then the map is normalized by its maximum. Pair
/// affinity keeps the strongest value per (antecedent member, consequent
/// member) and is normalized per antecedent product.
pub fn aggregate_rules(rules: &[Rule]) -> AssociationScores {
    let mut affinity = SignalMap::new();
    let mut pairs = PairScores::new();

    for rule in rules {
        let value = rule.value();
        for &main in &rule.antecedent {
            affinity.accumulate(main, value);
            for &partner in &rule.consequent {
                pairs.retain_max(main, partner, value);
            }
        }
    }

    affinity.normalize_by_max();
    pairs.normalize_per_main();

    AssociationScores { affinity, pairs }
}
