//! WAND top-k ranked retrieval
//!
//! Lists are kept in a permutation ordered by their current docID. Upper
//! bounds are summed along that order until they could beat the current
//! top-k threshold; the list where that happens names the pivot docID.
//! Only documents that reach a pivot are ever scored.

use super::bm25::{bm25_idf, bm25_score};
use super::{BlockCursor, TopK};
use crate::compression::BlockCodec;
use crate::pool::SegmentPool;
use crate::{BlockPtr, DocId, Direction, Result, Score, ScoredDoc, SiftError};
use tracing::debug;

/// Per-list inputs of a ranked query
#[derive(Debug, Clone, Copy)]
pub struct WandQuery<'a> {
    /// Head block of every list
    pub heads: &'a [BlockPtr],
    /// Document frequency of every list
    pub doc_freqs: &'a [u32],
    /// Largest score each list can contribute
    pub upper_bounds: &'a [Score],
}

/// Collection statistics for BM25
#[derive(Debug, Clone, Copy)]
pub struct CollectionStats<'a> {
    /// Document length indexed by docID; missing entries use the average
    pub doc_lengths: &'a [u32],
    /// Number of documents in the collection
    pub total_docs: u32,
    /// Average document length; a non-positive value scores every document
    /// as average length
    pub avg_doc_length: f32,
}

impl CollectionStats<'_> {
    /// Length of `doc`
    pub fn doc_length(&self, doc: DocId) -> f32 {
        self.doc_lengths
            .get(doc as usize)
            .map_or(self.avg_doc_length, |&len| len as f32)
    }
}

struct TermState<'a> {
    cursor: BlockCursor<'a>,
    idf: Score,
    upper_bound: Score,
}

/// Top `hits` documents by BM25 over the union of the lists.
///
/// With `use_frequencies` every list contributes its BM25 score computed
/// from the stored term frequency and the document length; without it a
/// list contributes its upper bound.
pub fn wand(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    query: WandQuery<'_>,
    stats: &CollectionStats<'_>,
    hits: usize,
    use_frequencies: bool,
) -> Result<Vec<ScoredDoc>> {
    let n = query.heads.len();
    if query.doc_freqs.len() != n || query.upper_bounds.len() != n {
        return Err(SiftError::Query(format!(
            "{} lists, {} document frequencies, {} upper bounds",
            n,
            query.doc_freqs.len(),
            query.upper_bounds.len()
        )));
    }
    if n == 0 || hits == 0 {
        return Ok(Vec::new());
    }

    let direction = pool.direction();
    let mut terms = Vec::with_capacity(n);
    for i in 0..n {
        terms.push(TermState {
            cursor: BlockCursor::open(pool, codec, query.heads[i], use_frequencies)?,
            idf: bm25_idf(query.doc_freqs[i], stats.total_docs),
            upper_bound: query.upper_bounds[i],
        });
    }

    let mut order: Vec<usize> = (0..n).filter(|&i| terms[i].cursor.doc().is_some()).collect();
    sort_by_doc(&mut order, &terms, direction);

    let mut topk = TopK::new(hits);
    let mut scored = 0usize;

    while !order.is_empty() {
        let Some(pivot) = find_pivot(&order, &terms, &topk) else {
            break;
        };
        let Some(pivot_doc) = terms[order[pivot]].cursor.doc() else {
            break;
        };

        if terms[order[0]].cursor.doc() == Some(pivot_doc) {
            let mut score = 0.0;
            for &i in &order {
                let term = &terms[i];
                if term.cursor.doc() != Some(pivot_doc) {
                    break;
                }
                score += if use_frequencies {
                    bm25_score(
                        term.cursor.frequency() as f32,
                        term.idf,
                        stats.doc_length(pivot_doc),
                        stats.avg_doc_length,
                    )
                } else {
                    term.upper_bound
                };
            }
            topk.push(pivot_doc, score);
            scored += 1;

            for &i in &order {
                if terms[i].cursor.doc() != Some(pivot_doc) {
                    break;
                }
                terms[i].cursor.advance()?;
            }
        } else {
            for &i in &order[..pivot] {
                terms[i].cursor.gallop_search(pivot_doc)?;
            }
        }

        order.retain(|&i| terms[i].cursor.doc().is_some());
        bubble(&mut order, &terms, direction);
    }

    debug!(lists = n, scored, results = topk.len(), "WAND finished");
    Ok(topk.into_sorted_vec())
}

/// First position in `order` where the accumulated upper bounds could
/// enter the top-k
fn find_pivot(order: &[usize], terms: &[TermState<'_>], topk: &TopK) -> Option<usize> {
    let mut acc = 0.0;
    for (position, &i) in order.iter().enumerate() {
        acc += terms[i].upper_bound;
        if topk.would_accept(acc) {
            return Some(position);
        }
    }
    None
}

fn sort_by_doc(order: &mut [usize], terms: &[TermState<'_>], direction: Direction) {
    order.sort_by(|&a, &b| compare_terms(terms, a, b, direction));
}

/// Insertion pass restoring docID order after a few lists moved forward
fn bubble(order: &mut [usize], terms: &[TermState<'_>], direction: Direction) {
    for i in 1..order.len() {
        let mut j = i;
        while j > 0 && compare_terms(terms, order[j - 1], order[j], direction).is_gt() {
            order.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn compare_terms(
    terms: &[TermState<'_>],
    a: usize,
    b: usize,
    direction: Direction,
) -> std::cmp::Ordering {
    match (terms[a].cursor.doc(), terms[b].cursor.doc()) {
        (Some(x), Some(y)) => direction.compare(x, y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}
