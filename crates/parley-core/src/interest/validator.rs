//! Allow-list validation of raw analysis output.
//!
//! The analysis collaborator answers with free text, one candidate per line in
//! the form `<code> <description>[;]`. Only lines whose exact
//! `(code, description)` pair exists in the catalog snapshot survive; the rest
//! are dropped without failing the request.

use tracing::debug;

use crate::catalog::CatalogSnapshot;

/// Result of validating one analysis response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Accepted lines, trimmed but otherwise verbatim, in input order.
    pub accepted: Vec<String>,
    /// Non-blank lines with no space separating code and description.
    pub malformed: usize,
    /// Well-formed lines with no matching catalog pair.
    pub unmatched: usize,
}

impl ValidationOutcome {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Stateless validator; all state lives in the snapshot passed in.
pub struct InterestValidator;

impl InterestValidator {
    /// Filter `raw` against `snapshot`.
    ///
    /// Duplicates are kept here; the interest record deduplicates on merge.
    pub fn validate(raw: &str, snapshot: &CatalogSnapshot) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        if raw.trim().is_empty() {
            return outcome;
        }

        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some((code, description)) = line.split_once(' ') else {
                debug!(line, "Dropping interest line without description");
                outcome.malformed += 1;
                continue;
            };
            let description = description.strip_suffix(';').unwrap_or(description);
            if snapshot.contains(code, description) {
                outcome.accepted.push(line.to_string());
            } else {
                debug!(code, description, "Dropping interest not in catalog");
                outcome.unmatched += 1;
            }
        }

        outcome
    }
}
