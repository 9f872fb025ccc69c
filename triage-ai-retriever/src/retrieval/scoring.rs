/// Cosine similarity between two vectors.
///
/// Always divides by the product of magnitudes rather than assuming unit
/// vectors, so unnormalized backends still score correctly. A
/// zero-magnitude vector on either side yields exactly 0.0 instead of a
/// division error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
