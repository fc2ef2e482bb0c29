//! Cosine-similarity ranking over one document's records.
//!
//! This is a brute-force exact scan: every record is scored against the
//! query vector on every call. At single-document scale (hundreds of
//! passages) that is the right trade — no index maintenance, exact results.
//! It is the scaling boundary to revisit if indexes ever span corpora.

use doctalk_core::error::{DocTalkError, Result};
use doctalk_core::types::{DocumentIndex, RankedMatch};

/// Cosine of the angle between two equal-length vectors, in [-1, 1].
///
/// A zero-magnitude vector has no direction; similarity against it is
/// defined as 0.0 (lowest relevance) rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every record against `query` and return the top `k` matches.
///
/// Ordering is descending by score with ties broken by ascending passage
/// ordinal, so repeated calls against an unchanged index are reproducible.
/// When the index holds fewer than `k` records, all of them are returned.
///
/// Fails with [`DocTalkError::DimensionMismatch`] if any record's vector
/// length differs from the query's — that means the index invariant was
/// violated upstream.
pub fn rank(query: &[f32], index: &DocumentIndex, k: usize) -> Result<Vec<RankedMatch>> {
    let mut matches: Vec<RankedMatch> = Vec::with_capacity(index.records.len());
    for record in &index.records {
        if record.values.len() != query.len() {
            return Err(DocTalkError::DimensionMismatch {
                expected: query.len(),
                found: record.values.len(),
                record_id: record.id.clone(),
            });
        }
        matches.push(RankedMatch {
            score: cosine_similarity(query, &record.values),
            record: record.clone(),
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.record.ordinal().cmp(&b.record.ordinal()))
    });
    matches.truncate(k);
    Ok(matches)
}
