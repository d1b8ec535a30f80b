// src/similarity.rs - Angle sequence similarity
use nalgebra::DVector;

/// Cosine similarity of two angle sequences, in [0, 1].
///
/// The longer sequence is truncated to the length of the shorter one; there
/// is no resampling or time alignment. An all-zero (or empty) truncated
/// sequence scores 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let a = DVector::from_column_slice(&a[..len]);
    let b = DVector::from_column_slice(&b[..len]);

    if a.iter().all(|v| *v == 0.0) || b.iter().all(|v| *v == 0.0) {
        return 0.0;
    }

    // 1 - cosine distance
    let similarity = a.dot(&b) / (a.norm() * b.norm());
    similarity.clamp(0.0, 1.0)
}

/// Similarity expressed in percent.
pub fn similarity_percentage(a: &[f64], b: &[f64]) -> f64 {
    cosine_similarity(a, b) * 100.0
}
