use thiserror::Error;

/// Why an embedding cannot take part in matching.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("embedding is empty")]
    Empty,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding has zero norm")]
    ZeroNorm,

    #[error("embedding has a non-finite component at index {0}")]
    NonFinite(usize),
}

/// Cosine similarity, failing safe to 0.0.
///
/// Empty vectors, a length mismatch, a zero norm or a non-finite result
/// all score 0.0 so a malformed embedding never halts a run; it simply
/// never wins a match.
pub fn score(a: &[f64], b: &[f64]) -> f64 {
    try_score(a, b).unwrap_or(0.0)
}

/// Cosine similarity that reports malformed input instead of masking it.
pub fn try_score(a: &[f64], b: &[f64]) -> Result<f64, EmbeddingError> {
    if a.is_empty() || b.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_sq_a: f64 = a.iter().map(|x| x * x).sum();
    let norm_sq_b: f64 = b.iter().map(|x| x * x).sum();
    if norm_sq_a == 0.0 || norm_sq_b == 0.0 {
        return Err(EmbeddingError::ZeroNorm);
    }

    // sqrt of the product rather than product of sqrts: sqrt(s * s) == s
    // exactly, so a vector scored against itself is exactly 1.0.
    let sim = dot / (norm_sq_a * norm_sq_b).sqrt();
    if !sim.is_finite() {
        let bad = a
            .iter()
            .chain(b.iter())
            .position(|x| !x.is_finite())
            .map(|i| i % a.len())
            .unwrap_or(0);
        return Err(EmbeddingError::NonFinite(bad));
    }
    Ok(sim.clamp(-1.0, 1.0))
}

/// Check a single embedding before matching.
pub fn validate(embedding: &[f64], expected_dim: Option<usize>) -> Result<(), EmbeddingError> {
    if embedding.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    if let Some(expected) = expected_dim {
        if embedding.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
    }
    if let Some(i) = embedding.iter().position(|x| !x.is_finite()) {
        return Err(EmbeddingError::NonFinite(i));
    }
    if embedding.iter().all(|x| *x == 0.0) {
        return Err(EmbeddingError::ZeroNorm);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_exactly_one() {
        for v in [vec![1.0, 2.0, 3.0], vec![1.0, 1.0], vec![0.1, 0.7, -0.3, 5.5]] {
            assert_eq!(score(&v, &v), 1.0);
        }
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(score(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_negative_one() {
        assert_eq!(score(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
    }

    #[test]
    fn score_is_symmetric() {
        let pairs = [
            (vec![0.3, 0.1, 0.9], vec![0.2, 0.8, 0.4]),
            (vec![1.0, -2.0], vec![3.0, 0.5]),
            (vec![1e-3, 7.0, 2.0], vec![4.0, 4.0, 4.0]),
        ];
        for (a, b) in pairs {
            assert_eq!(score(&a, &b), score(&b, &a));
        }
    }

    #[test]
    fn malformed_input_scores_zero() {
        assert_eq!(score(&[], &[1.0]), 0.0);
        assert_eq!(score(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(score(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(score(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
        assert_eq!(score(&[f64::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn try_score_names_the_problem() {
        assert_eq!(try_score(&[], &[]), Err(EmbeddingError::Empty));
        assert_eq!(
            try_score(&[1.0], &[1.0, 2.0]),
            Err(EmbeddingError::DimensionMismatch { expected: 1, actual: 2 })
        );
        assert_eq!(try_score(&[0.0], &[1.0]), Err(EmbeddingError::ZeroNorm));
        assert_eq!(
            try_score(&[1.0, f64::INFINITY], &[1.0, 1.0]),
            Err(EmbeddingError::NonFinite(1))
        );
    }

    #[test]
    fn validate_checks_dimension_and_content() {
        assert!(validate(&[0.1, 0.2], Some(2)).is_ok());
        assert!(validate(&[0.1, 0.2], None).is_ok());
        assert_eq!(
            validate(&[0.1, 0.2], Some(3)),
            Err(EmbeddingError::DimensionMismatch { expected: 3, actual: 2 })
        );
        assert_eq!(validate(&[0.0, 0.0], None), Err(EmbeddingError::ZeroNorm));
        assert_eq!(validate(&[], None), Err(EmbeddingError::Empty));
        assert_eq!(validate(&[1.0, f64::NAN], None), Err(EmbeddingError::NonFinite(1)));
    }
}
