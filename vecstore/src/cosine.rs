/// Cosine distance, `1 - cos(a, b)`.
///
/// Lies in `[0, 2]`: 0 for vectors pointing the same way, 1 at a right
/// angle, 2 for opposite vectors. Sorting by ascending distance is sorting
/// by descending similarity.
///
/// Sums are carried in f64. A length mismatch or a zero-norm side yields
/// the maximum distance 2.0.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 2.0;
    }

    let (dot, aa, bb) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, aa, bb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, aa + x * x, bb + y * y)
        },
    );
    if aa == 0.0 || bb == 0.0 {
        return 2.0;
    }

    let cos = dot / (aa.sqrt() * bb.sqrt());
    (1.0 - cos.clamp(-1.0, 1.0)) as f32
}

/// Cosine similarity in `[-1, 1]`, the complement of [`cosine_distance`].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_distance(a, b)
}
