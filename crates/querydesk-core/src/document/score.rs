//! Relevance scoring helpers shared by store implementations.

/// Cosine similarity between two vectors, clamped to [0, 1].
///
/// Returns 0.0 for mismatched lengths or zero vectors rather than
/// propagating NaN into ranking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Keyword match score for lexical retrieval, in [0, 1].
///
/// Fraction of terms found in the document, with title hits counted
/// double (capped at 1.0). Terms are matched case-insensitively.
pub fn lexical_score(terms: &[String], title: &str, content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let title_lower = title.to_lowercase();
    let content_lower = content.to_lowercase();
    let mut hits = 0.0f32;
    for term in terms {
        let term_lower = term.to_lowercase();
        if term_lower.is_empty() {
            continue;
        }
        if title_lower.contains(&term_lower) {
            hits += 2.0;
        } else if content_lower.contains(&term_lower) {
            hits += 1.0;
        }
    }
    (hits / terms.len() as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.5, 0.3, 0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_negative_clamped_to_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_lexical_all_terms_in_title() {
        let terms = vec!["python".to_string(), "tutorial".to_string()];
        let score = lexical_score(&terms, "Python tutorial basics", "irrelevant body");
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_title_hit_outweighs_content_hit() {
        // One of two terms matches: a title hit counts double.
        let terms = vec!["python".to_string(), "quantum".to_string()];
        let in_title = lexical_score(&terms, "Python basics", "nothing else");
        let in_content = lexical_score(&terms, "Guide", "python only here");
        assert!((in_title - 1.0).abs() < 1e-6);
        assert!((in_content - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_lexical_no_hits() {
        let terms = vec!["quantum".to_string()];
        assert_eq!(lexical_score(&terms, "Cooking", "recipes and food"), 0.0);
    }

    #[test]
    fn test_lexical_empty_terms() {
        assert_eq!(lexical_score(&[], "anything", "anything"), 0.0);
    }

    #[test]
    fn test_lexical_partial_match() {
        let terms = vec!["python".to_string(), "quantum".to_string()];
        let score = lexical_score(&terms, "Guide", "python only here");
        assert!((score - 0.5).abs() < 1e-6);
    }
}
