use crate::models::explanation::{BaseExplanation, Reason};

/// Fixed base explanation used when the why-service is unavailable.
///
/// Deliberately placeholder-shaped: its summary and reasons are detected as
/// generic by the builder and replaced with locally derived content.
pub fn mock_base_explanation() -> BaseExplanation {
    BaseExplanation {
        score: Some(70.0),
        summary: "Strong match based on profile signals.".to_string(),
        reasons: vec![
            Reason {
                requirement: "Core requirement".to_string(),
                evidence: Vec::new(),
            },
            Reason {
                requirement: "Secondary requirement".to_string(),
                evidence: Vec::new(),
            },
        ],
        transferable: Vec::new(),
        trajectory: Vec::new(),
    }
}
