use crate::models::{Category, Feedback, HistoryRecord, Section};

/// Returns the authoritative score for one category.
///
/// The scorer puts the score either inside the section or in the separate
/// `scores` block, not consistently. The inline value wins; the block is
/// consulted only when the inline score is absent or null.
pub fn resolve_score(feedback: Option<&Feedback>, category: Category) -> Option<f64> {
    let feedback = feedback?;
    let inline = match &feedback.sections[category] {
        Section::Structured(section) => section.score,
        Section::Missing | Section::Text(_) => None,
    };
    inline.or(feedback.scores[category])
}

pub fn record_score(record: &HistoryRecord, category: Category) -> Option<f64> {
    resolve_score(record.feedback.as_ref(), category)
}
