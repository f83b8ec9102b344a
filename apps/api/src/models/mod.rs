pub mod candidate;
pub mod explanation;
pub mod filters;
