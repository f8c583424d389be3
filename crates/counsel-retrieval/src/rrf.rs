//! Reciprocal Rank Fusion (§4.2 step 3).
//!
//! Grounded in `search.py::rrf_fusion`: accumulate a score per chunk
//! identifier, scanning the vector-result list before the keyword-result
//! list so that ties resolve in the vector list's favour.

use std::collections::HashMap;

use counsel_core::EntityId;

use crate::port::RankedChunk;

/// The RRF smoothing constant (§4.2).
pub const RRF_K: f64 = 60.0;

/// One chunk's fused score, with its identifier carried through untouched
/// for the enrich stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedChunk {
    pub chunk_id: EntityId,
    pub score: f64,
}

struct Accumulator {
    score: f64,
    first_seen_order: usize,
}

/// Fuses any number of ranked result lists into one RRF-scored, descending
/// sequence. Lists are scanned in the order given; `first_seen_order` is
/// assigned the first time a chunk is encountered, so passing the vector
/// list before the keyword list makes the vector list win ties, matching
/// §4.2's "ties broken by insertion order" contract precisely.
pub fn fuse(lists: &[&[RankedChunk]]) -> Vec<FusedChunk> {
    let mut acc: HashMap<EntityId, Accumulator> = HashMap::new();
    let mut next_order = 0usize;

    for list in lists {
        for (idx, chunk) in list.iter().enumerate() {
            let rank = idx + 1;
            let contribution = 1.0 / (RRF_K + rank as f64);
            acc.entry(chunk.chunk_id)
                .and_modify(|a| a.score += contribution)
                .or_insert_with(|| {
                    let order = next_order;
                    next_order += 1;
                    Accumulator { score: contribution, first_seen_order: order }
                });
        }
    }

    let mut fused: Vec<(EntityId, Accumulator)> = acc.into_iter().collect();
    fused.sort_by(|(_, a), (_, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.first_seen_order.cmp(&b.first_seen_order))
    });

    fused
        .into_iter()
        .map(|(chunk_id, a)| FusedChunk { chunk_id, score: a.score })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: EntityId) -> RankedChunk {
        RankedChunk {
            chunk_id: id,
            text: String::new(),
            document_id: EntityId::new(),
            knowledge_base_id: EntityId::new(),
            chunk_ordinal: 0,
        }
    }

    #[test]
    fn score_is_sum_of_reciprocal_ranks() {
        let a = EntityId::new();
        let vector_list = vec![chunk(a)];
        let fused = fuse(&[&vector_list]);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn chunk_present_in_both_lists_sums_both_contributions() {
        let a = EntityId::new();
        let vector_list = vec![chunk(a)];
        let keyword_list = vec![chunk(a)];
        let fused = fuse(&[&vector_list, &keyword_list]);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn ties_are_broken_by_vector_list_insertion_order() {
        let a = EntityId::new();
        let b = EntityId::new();
        // Both chunks rank 1st in their respective, single-item lists, so
        // both accumulate the same score. `a` appears in the vector list
        // (scanned first) and must win the tie.
        let vector_list = vec![chunk(a)];
        let keyword_list = vec![chunk(b)];
        let fused = fuse(&[&vector_list, &keyword_list]);
        assert_eq!(fused[0].chunk_id, a);
        assert_eq!(fused[1].chunk_id, b);
    }

    #[test]
    fn higher_rank_in_either_list_yields_higher_score() {
        let a = EntityId::new();
        let b = EntityId::new();
        let vector_list = vec![chunk(a), chunk(b)];
        let fused = fuse(&[&vector_list]);
        assert_eq!(fused[0].chunk_id, a);
        assert!(fused[0].score > fused[1].score);
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        let empty: Vec<RankedChunk> = Vec::new();
        assert!(fuse(&[&empty, &empty]).is_empty());
    }
}
