//! Vector helpers shared by the builder, the index and the query path.

/// Euclidean norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length in place.
///
/// Returns `false` and leaves `v` untouched when the norm is zero or not
/// finite; such vectors have no direction and cannot be ranked.
pub fn normalize_in_place(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if !norm.is_finite() || norm <= f32::EPSILON {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Inner product. Callers guarantee equal lengths.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Map cosine similarity from [-1, 1] onto [0, 1].
///
/// Assumes a cosine metric; a different distance needs a different mapping.
pub fn rescale_cosine(raw: f32) -> f32 {
    ((raw + 1.0) / 2.0).clamp(0.0, 1.0)
}
