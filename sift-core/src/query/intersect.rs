//! Small-vs-small conjunctive intersection

use super::BlockCursor;
use crate::compression::BlockCodec;
use crate::pool::SegmentPool;
use crate::{BlockPtr, DocId, Result};
use tracing::debug;

/// Intersect posting lists, returning at most `hits` docIDs in traversal
/// order.
///
/// Lists should be ordered by increasing document frequency; `min_df` is
/// the frequency of the shortest list and sizes the candidate buffer. The
/// first two lists are merged by mutual galloping, then every further list
/// filters the surviving candidates in place.
pub fn intersect_svs(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    heads: &[BlockPtr],
    min_df: usize,
    hits: usize,
) -> Result<Vec<DocId>> {
    if heads.is_empty() || hits == 0 {
        return Ok(Vec::new());
    }

    if heads.len() == 1 {
        let mut cursor = BlockCursor::open(pool, codec, heads[0], false)?;
        let mut results = Vec::with_capacity(min_df.min(hits));
        while let Some(doc) = cursor.doc() {
            results.push(doc);
            if results.len() == hits {
                break;
            }
            cursor.advance()?;
        }
        return Ok(results);
    }

    let last_pass = heads.len() - 1;
    let limit = if last_pass == 1 { hits } else { usize::MAX };
    let mut candidates = merge_pair(pool, codec, heads[0], heads[1], min_df, limit)?;

    for (i, &head) in heads.iter().enumerate().skip(2) {
        if candidates.is_empty() {
            break;
        }
        let limit = if i == last_pass { hits } else { usize::MAX };
        filter_candidates(pool, codec, head, &mut candidates, limit)?;
    }
    candidates.truncate(hits);

    debug!(
        lists = heads.len(),
        results = candidates.len(),
        "SvS intersection finished"
    );
    Ok(candidates)
}

/// Gallop two lists against each other
fn merge_pair(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    first: BlockPtr,
    second: BlockPtr,
    min_df: usize,
    limit: usize,
) -> Result<Vec<DocId>> {
    let mut candidates = Vec::with_capacity(min_df.min(limit));

    let mut a = BlockCursor::open(pool, codec, first, false)?;
    let mut b = BlockCursor::open(pool, codec, second, false)?;

    while let Some(doc) = a.doc() {
        if !b.gallop_search(doc)? {
            break;
        }
        let Some(other) = b.doc() else { break };
        if other == doc {
            candidates.push(doc);
            if candidates.len() == limit {
                break;
            }
            a.advance()?;
            b.advance()?;
        } else if !a.gallop_search(other)? {
            break;
        }
    }

    Ok(candidates)
}

/// Keep only the candidates present in the list at `head`
fn filter_candidates(
    pool: &SegmentPool,
    codec: &dyn BlockCodec,
    head: BlockPtr,
    candidates: &mut Vec<DocId>,
    limit: usize,
) -> Result<()> {
    let mut cursor = BlockCursor::open(pool, codec, head, false)?;
    let mut kept = 0;

    for i in 0..candidates.len() {
        let candidate = candidates[i];
        if !cursor.gallop_search(candidate)? {
            break;
        }
        if cursor.doc() == Some(candidate) {
            candidates[kept] = candidate;
            kept += 1;
            if kept == limit {
                break;
            }
        }
    }

    candidates.truncate(kept);
    Ok(())
}
