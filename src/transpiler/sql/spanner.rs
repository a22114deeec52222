use super::super::traits::{CaseFolding, SqlGenerator};

/// Case-insensitive comparisons lower-case both operands; expressions
/// cannot use `COLLATE()` here.
pub struct SpannerGenerator;

impl SqlGenerator for SpannerGenerator {
    fn case_folding(&self) -> CaseFolding {
        CaseFolding::Lower
    }
}
