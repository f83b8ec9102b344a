// Candidate WHY explanations: normalization, summary/reason heuristics, the
// pure builder that combines them, and the HTTP handler. Only the handler
// performs I/O.

pub mod builder;
pub mod handlers;
pub mod normalize;
pub mod reasons;
pub mod summary;

pub use builder::build_explanation;
