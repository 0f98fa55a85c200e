// ============================================================
// Layer 5 — Embedding and Match Matrix
// ============================================================
// Built once per read, read-only afterwards:
//
//   doc_emb   [bs, Ld, dim]  = word_vectors[doc_ids]
//   query_emb [bs, Lq, dim]  = word_vectors[query_ids]
//   match     [bs, Ld, Lq]
//
//   dot        doc_emb · query_embᵀ
//   cosine     dot / (|doc| |query|)
//   indicator  1.0 where the token ids are equal, else 0.0

use burn::prelude::*;
use burn::tensor::module::embedding;

use crate::domain::match_grid::MatchGrid;
use crate::domain::variants::InteractionKind;

// Keeps cosine finite for all-zero (padding) vectors
const NORM_EPSILON: f32 = 1e-12;

/// Look up token ids in the embedding table.
pub fn embed<B: Backend>(word_vectors: &Tensor<B, 2>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    embedding(word_vectors.clone(), ids)
}

pub fn match_matrix<B: Backend>(
    kind:      InteractionKind,
    doc_ids:   &Tensor<B, 2, Int>,
    query_ids: &Tensor<B, 2, Int>,
    doc_emb:   &Tensor<B, 3>,
    query_emb: &Tensor<B, 3>,
) -> Tensor<B, 3> {
    match kind {
        InteractionKind::Dot => dot(doc_emb, query_emb),
        InteractionKind::Cosine => {
            let doc_norm   = norms(doc_emb);                     // [bs, Ld, 1]
            let query_norm = norms(query_emb).swap_dims(1, 2);   // [bs, 1, Lq]
            let denom      = doc_norm.matmul(query_norm).clamp_min(NORM_EPSILON);
            dot(doc_emb, query_emb) / denom
        }
        InteractionKind::Indicator => {
            let [bs, d_len] = doc_ids.dims();
            let [_, q_len]  = query_ids.dims();
            let docs    = doc_ids.clone().unsqueeze_dim::<3>(2).expand([bs, d_len, q_len]);
            let queries = query_ids.clone().unsqueeze_dim::<3>(1).expand([bs, d_len, q_len]);
            docs.equal(queries).float()
        }
    }
}

fn dot<B: Backend>(doc_emb: &Tensor<B, 3>, query_emb: &Tensor<B, 3>) -> Tensor<B, 3> {
    doc_emb.clone().matmul(query_emb.clone().swap_dims(1, 2))
}

fn norms<B: Backend>(emb: &Tensor<B, 3>) -> Tensor<B, 3> {
    (emb.clone() * emb.clone()).sum_dim(2).sqrt()
}

/// Copy the match matrix to the host for CPU region search.
pub fn host_grid<B: Backend>(matrix: &Tensor<B, 3>) -> MatchGrid {
    let dims = matrix.dims();
    let values: Vec<f32> = matrix.clone().into_data().iter::<f32>().collect();
    MatchGrid::new(values, dims).unwrap_or_else(|| MatchGrid::zeros(dims))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_util::{floats, id_batch, matrix, TestBackend};
    use burn::tensor::TensorData;

    // vocab of 3 two-dimensional vectors
    fn table() -> Tensor<TestBackend, 2> {
        Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.0, 1.0, 0.0, 3.0, 4.0], [3, 2]),
            &Default::default(),
        )
    }

    fn setup(kind: InteractionKind) -> Vec<f32> {
        let docs    = id_batch(vec![1, 2], [1, 2]);
        let queries = id_batch(vec![2], [1, 1]);
        let wv      = table();
        let d_emb   = embed(&wv, docs.clone());
        let q_emb   = embed(&wv, queries.clone());
        floats(match_matrix(kind, &docs, &queries, &d_emb, &q_emb))
    }

    #[test]
    fn test_embedding_lookup() {
        let emb = embed(&table(), id_batch(vec![2, 0], [1, 2]));
        assert_eq!(emb.dims(), [1, 2, 2]);
        assert_eq!(floats(emb), vec![3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_dot_interaction() {
        // [1,0]·[3,4] = 3, [3,4]·[3,4] = 25
        assert_eq!(setup(InteractionKind::Dot), vec![3.0, 25.0]);
    }

    #[test]
    fn test_cosine_interaction() {
        let m = setup(InteractionKind::Cosine);
        assert!((m[0] - 0.6).abs() < 1e-5);
        assert!((m[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cosine_of_padding_is_finite() {
        let docs  = id_batch(vec![0], [1, 1]);
        let wv    = table();
        let d_emb = embed(&wv, docs.clone());
        let m = floats(match_matrix(InteractionKind::Cosine, &docs, &docs, &d_emb, &d_emb));
        assert!(m[0].is_finite());
    }

    #[test]
    fn test_indicator_interaction() {
        assert_eq!(setup(InteractionKind::Indicator), vec![0.0, 1.0]);
    }

    #[test]
    fn test_host_grid_copies_values() {
        let grid = host_grid(&matrix(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]));
        assert_eq!(grid.dims(), [1, 2, 2]);
        assert_eq!(grid.row(0, 1)[0], 3.0);
    }
}
