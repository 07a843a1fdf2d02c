//! Verdict aggregation.
//!
//! Folds the four metric vectors into a weighted 0–100 score, a category,
//! a severity-ordered issue list and user-facing suggestions.

mod issue;
mod result;
mod scorer;

pub use issue::{Defect, IssueType, QualityIssue, Severity};
pub use result::{QualityCategory, QualityResult, ResultMetadata};
pub use scorer::{blur_grade, category, issues, overall_score, suggestions};
