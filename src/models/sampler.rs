//! Representative example selection for prompts.
//!
//! For a relation type, picks a small set of diverse classified pairs by
//! clustering them on the edit distance between their reading texts and
//! taking the cluster medoids.

use super::{Document, PairId, RelationTypeId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use strsim::levenshtein;
use tracing::debug;

/// Default seed for example selection.
pub const DEFAULT_SEED: u64 = 42;

const MAX_ITERATIONS: usize = 300;

/// Caches representative examples per (relation type, k, seed).
///
/// The cache belongs to one document and is dropped whenever the document's
/// revision moves on.
#[derive(Debug, Clone)]
pub struct ExampleSampler {
    seed: u64,
    revision: Option<u64>,
    cache: HashMap<(RelationTypeId, usize, u64), Vec<PairId>>,
}

impl Default for ExampleSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl ExampleSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            revision: None,
            cache: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Up to `k` representative pairs classified with `relation_type`.
    pub fn representative_examples(
        &mut self,
        doc: &Document,
        relation_type: RelationTypeId,
        k: usize,
    ) -> Vec<PairId> {
        if self.revision != Some(doc.revision()) {
            self.cache.clear();
            self.revision = Some(doc.revision());
        }

        let seed = self.seed;
        self.cache
            .entry((relation_type, k, seed))
            .or_insert_with(|| representative_examples(doc, relation_type, k, seed))
            .clone()
    }
}

/// Select up to `k` representative pairs for a relation type.
///
/// Pairs classified by the automated classifier are never used. Pairs with a
/// justification are preferred; the remainder is drawn from those without.
pub fn representative_examples(
    doc: &Document,
    relation_type: RelationTypeId,
    k: usize,
    seed: u64,
) -> Vec<PairId> {
    let (described, undescribed): (Vec<PairId>, Vec<PairId>) = doc
        .relation_type(relation_type)
        .pairs()
        .iter()
        .copied()
        .filter(|pair| !doc.rdgai_responsible(*pair))
        .partition(|pair| !doc.pair_description(*pair).is_empty());

    let mut examples = select(doc, &described, k, seed);
    if examples.len() < k {
        examples.extend(select(doc, &undescribed, k - examples.len(), seed));
    }
    debug!(
        "Selected {} examples for '{}'",
        examples.len(),
        doc.relation_type(relation_type).name
    );
    examples
}

fn select(doc: &Document, pairs: &[PairId], k: usize, seed: u64) -> Vec<PairId> {
    if pairs.len() <= k {
        return pairs.to_vec();
    }

    let texts: Vec<(&str, &str)> = pairs
        .iter()
        .map(|pair| {
            let pair = doc.pair(*pair);
            (
                doc.reading(pair.active()).text.as_str(),
                doc.reading(pair.passive()).text.as_str(),
            )
        })
        .collect();

    let n = texts.len();
    let mut distances = vec![vec![0usize; n]; n];
    for i in 0..n {
        for j in i + 1..n {
            let distance =
                levenshtein(texts[i].0, texts[j].0) + levenshtein(texts[i].1, texts[j].1);
            distances[i][j] = distance;
            distances[j][i] = distance;
        }
    }

    k_medoids(&distances, k, seed)
        .into_iter()
        .map(|index| pairs[index])
        .collect()
}

/// Indices of `k` medoids over a symmetric distance matrix, sorted.
fn k_medoids(distances: &[Vec<usize>], k: usize, seed: u64) -> Vec<usize> {
    let n = distances.len();
    if k == 0 {
        return Vec::new();
    }
    if n <= k {
        return (0..n).collect();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut medoids = rand::seq::index::sample(&mut rng, n, k).into_vec();
    medoids.sort_unstable();

    for _ in 0..MAX_ITERATIONS {
        let mut clusters: Vec<Vec<usize>> = medoids.iter().map(|medoid| vec![*medoid]).collect();
        for point in 0..n {
            if medoids.contains(&point) {
                continue;
            }
            let nearest = (0..medoids.len())
                .min_by_key(|&cluster| (distances[point][medoids[cluster]], cluster))
                .unwrap_or(0);
            clusters[nearest].push(point);
        }

        let mut updated: Vec<usize> = clusters
            .iter()
            .map(|members| {
                members
                    .iter()
                    .copied()
                    .min_by_key(|&candidate| {
                        let cost: usize = members.iter().map(|&m| distances[candidate][m]).sum();
                        (cost, candidate)
                    })
                    .unwrap_or(members[0])
            })
            .collect();
        updated.sort_unstable();

        if updated == medoids {
            break;
        }
        medoids = updated;
    }

    medoids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RDGAI_RESPONSIBLE;

    /// One apparatus with `readings` readings and every pair classified as `cat`.
    fn classified_doc(readings: usize) -> (Document, RelationTypeId) {
        let rdgs: String = (1..=readings)
            .map(|n| format!("<rdg n=\"{n}\">{}</rdg>", "word ".repeat(n % 7) + &"x".repeat(n)))
            .collect();
        let mut doc = Document::parse(&format!(
            r#"<TEI><text><interpGrp type="transcriptional"><interp xml:id="cat"/></interpGrp><app>{rdgs}</app></text></TEI>"#
        ))
        .unwrap();
        let cat = doc.relation_type_by_name("cat").unwrap().id();
        let pairs: Vec<PairId> = doc.all_pairs().map(|pair| pair.id()).collect();
        for pair in pairs {
            doc.add_type(pair, cat, None, "");
        }
        (doc, cat)
    }

    #[test]
    fn test_returns_exactly_k_deterministically() {
        let (doc, cat) = classified_doc(15);
        let total = doc.relation_type(cat).pairs().len();
        assert_eq!(total, 210);

        let first = representative_examples(&doc, cat, 5, 42);
        let second = representative_examples(&doc, cat, 5, 42);
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);

        let (other_doc, other_cat) = classified_doc(15);
        assert_eq!(representative_examples(&other_doc, other_cat, 5, 42), first);

        let mut unique = first.clone();
        unique.dedup();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_small_subset_returned_unsampled() {
        let (doc, cat) = classified_doc(2);
        let examples = representative_examples(&doc, cat, 5, 42);
        assert_eq!(examples.len(), 2);
    }

    #[test]
    fn test_zero_examples() {
        let (doc, cat) = classified_doc(4);
        assert!(representative_examples(&doc, cat, 0, 42).is_empty());
    }

    #[test]
    fn test_described_pairs_preferred() {
        let (mut doc, cat) = classified_doc(6);
        let described: Vec<PairId> = doc.all_pairs().take(3).map(|pair| pair.id()).collect();
        for pair in &described {
            doc.add_description(*pair, "Justified", None);
        }

        let examples = representative_examples(&doc, cat, 5, 7);
        assert_eq!(examples.len(), 5);
        for pair in &described {
            assert!(examples.contains(pair));
        }
    }

    #[test]
    fn test_machine_classifications_excluded() {
        let (mut doc, cat) = classified_doc(3);
        let pairs: Vec<PairId> = doc.all_pairs().map(|pair| pair.id()).collect();
        for pair in &pairs[1..] {
            doc.add_type(*pair, cat, Some(RDGAI_RESPONSIBLE), "");
        }
        assert_eq!(representative_examples(&doc, cat, 5, 42), vec![pairs[0]]);
    }

    #[test]
    fn test_sampler_cache_invalidated_by_mutation() {
        let (mut doc, cat) = classified_doc(4);
        let mut sampler = ExampleSampler::default();
        assert_eq!(sampler.representative_examples(&doc, cat, 20).len(), 12);

        let pair = doc.all_pairs().next().unwrap().id();
        doc.remove_type(pair, cat);
        assert_eq!(sampler.representative_examples(&doc, cat, 20).len(), 11);
    }

    #[test]
    fn test_k_medoids_separates_clusters() {
        // Two tight groups far apart
        let points = [0usize, 1, 2, 100, 101, 102];
        let distances: Vec<Vec<usize>> = points
            .iter()
            .map(|a| points.iter().map(|b| a.abs_diff(*b)).collect())
            .collect();
        let medoids = k_medoids(&distances, 2, 1);
        assert_eq!(medoids, vec![1, 4]);
    }
}
