use rayon::prelude::*;

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Index pairs `(i, j)`, `i < j`, whose similarity is strictly above
/// `threshold`, ordered by `i` then `j`.
pub fn candidate_pairs(embeddings: &[Vec<f32>], threshold: f32) -> Vec<(usize, usize)> {
    (0..embeddings.len())
        .into_par_iter()
        .map(|i| {
            ((i + 1)..embeddings.len())
                .filter(|&j| cosine_similarity(&embeddings[i], &embeddings[j]) > threshold)
                .map(|j| (i, j))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}
