//! Dialect-specific SQL generation.

/// How a dialect compares strings case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFolding {
    /// `COLLATE(expr, "und:ci")`
    Collate,
    /// `LOWER(expr)`
    Lower,
}

/// Trait for dialect-specific SQL generation.
pub trait SqlGenerator {
    /// Quote an identifier (variable, column or field name).
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
    /// Spell a reference to the named query parameter.
    fn named_parameter(&self, name: &str) -> String {
        format!("@{}", name)
    }
    /// Case-insensitive comparison mechanism.
    fn case_folding(&self) -> CaseFolding;
    /// Opening text of the case-insensitive wrapper, up to the wrapped expression.
    fn fold_open(&self) -> &'static str {
        match self.case_folding() {
            CaseFolding::Collate => "COLLATE(",
            CaseFolding::Lower => "LOWER(",
        }
    }
    /// Closing text of the case-insensitive wrapper.
    fn fold_close(&self) -> &'static str {
        match self.case_folding() {
            CaseFolding::Collate => ", \"und:ci\")",
            CaseFolding::Lower => ")",
        }
    }
}
