//! Query algorithms over posting lists stored in a segment pool
//!
//! Supports:
//! - Conjunctive small-vs-small intersection with galloping search
//! - Bloom-accelerated Boolean AND/OR (BWAND)
//! - WAND top-k retrieval with BM25 scoring
//!
//! Every algorithm takes the head pointer of each list and compares docIDs
//! only through the pool's [`Direction`](crate::Direction), so the same code
//! serves ascending and descending lists.

mod bm25;
mod bwand;
mod cursor;
mod intersect;
mod topk;
mod wand;

pub use bm25::{bm25_idf, bm25_score, bm25_upper_bound};
pub use bwand::{bwand_and, bwand_or, Membership};
pub use cursor::BlockCursor;
pub use intersect::intersect_svs;
pub use topk::TopK;
pub use wand::{wand, CollectionStats, WandQuery};

#[cfg(test)]
mod tests {
    //! End-to-end scenarios over small hand-built lists

    use super::*;
    use crate::compression::BitPackCodec;
    use crate::pool::{BloomConfig, ListBuilder, PoolConfig, SegmentPool};
    use crate::{BlockPtr, DocId, Direction};

    fn scenario_pool() -> (SegmentPool, Vec<BlockPtr>) {
        let config = PoolConfig::default().with_bloom(BloomConfig::default());
        let mut pool = SegmentPool::new(config).unwrap();
        let codec = BitPackCodec::new();
        let mut builder = ListBuilder::new(&mut pool, &codec);
        let a = builder.doc_ids(&[1, 5, 9, 20]).unwrap();
        let b = builder.doc_ids(&[5, 9, 30]).unwrap();
        (pool, vec![a.head, b.head])
    }

    #[test]
    fn test_scenario_intersection() {
        let (pool, heads) = scenario_pool();
        let codec = BitPackCodec::new();
        assert_eq!(intersect_svs(&pool, &codec, &heads, 3, 10).unwrap(), vec![5, 9]);
    }

    #[test]
    fn test_scenario_bwand_or() {
        let (pool, heads) = scenario_pool();
        let codec = BitPackCodec::new();
        let top = bwand_or(&pool, &codec, &heads, &[1.0, 1.0], 2, Membership::Exact).unwrap();

        let mut docs: Vec<DocId> = top.iter().map(|d| d.doc_id).collect();
        docs.sort_unstable();
        assert_eq!(docs, vec![5, 9]);
        assert!(top.iter().all(|d| (d.score - 2.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_scenario_descending_single_batch() {
        let mut pool =
            SegmentPool::new(PoolConfig::default().with_direction(Direction::Descending)).unwrap();
        let codec = BitPackCodec::new();
        let head = pool
            .append_doc_ids(&codec, &[9, 5, 1], BlockPtr::NULL)
            .unwrap();

        let mut cursor = BlockCursor::open(&pool, &codec, head, false).unwrap();
        let mut seen = Vec::new();
        while let Some(doc) = cursor.doc() {
            seen.push(doc);
            cursor.advance().unwrap();
        }
        assert_eq!(seen, vec![9, 5, 1]);
    }

    #[test]
    fn test_scenario_gallop_past_end() {
        let (pool, heads) = scenario_pool();
        let codec = BitPackCodec::new();
        let mut cursor = BlockCursor::open(&pool, &codec, heads[0], false).unwrap();
        assert!(!cursor.gallop_search(21).unwrap());
        assert!(cursor.block().is_null());
    }
}
