use super::super::traits::{CaseFolding, SqlGenerator};

pub struct BigQueryGenerator;

impl SqlGenerator for BigQueryGenerator {
    fn case_folding(&self) -> CaseFolding {
        CaseFolding::Collate
    }
}
