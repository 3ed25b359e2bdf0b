//! Name-similarity scoring for ambiguous import names.

use std::cmp::Ordering;
use whichdist_core::{DistName, ImportName};

/// Score awarded when the candidate's import form equals the import name
/// exactly; strictly above anything `normalized_levenshtein` can produce.
const EXACT_SCORE: f64 = 2.0;

/// How well `candidate` matches `import` as its providing distribution.
///
/// Exact canonical equality scores [`EXACT_SCORE`]; anything else scores the
/// normalized Levenshtein similarity of the canonicalized forms, in `[0, 1]`.
#[must_use]
pub fn similarity(import: &ImportName, candidate: &DistName) -> f64 {
    let candidate_form = candidate.as_import_form();
    if candidate_form == import.as_str() {
        EXACT_SCORE
    } else {
        strsim::normalized_levenshtein(import.as_str(), &candidate_form)
    }
}

/// The best-scoring candidate for `import`, ties broken toward the
/// lexically smaller name. Deterministic for a fixed candidate set.
#[must_use]
pub fn best_match(import: &ImportName, candidates: &[DistName]) -> Option<DistName> {
    let mut best: Option<(f64, &DistName)> = None;
    for candidate in candidates {
        let score = similarity(import, candidate);
        let replace = match &best {
            None => true,
            Some((best_score, best_name)) => {
                match score.partial_cmp(best_score).unwrap_or(Ordering::Equal) {
                    Ordering::Greater => true,
                    Ordering::Equal => candidate < *best_name,
                    Ordering::Less => false,
                }
            }
        };
        if replace {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, name)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<DistName> {
        raw.iter().map(DistName::new).collect()
    }

    #[test]
    fn exact_import_form_wins() {
        let import = ImportName::new("yaml");
        let candidates = names(&["pyyaml", "yaml", "ruamel-yaml"]);
        assert_eq!(best_match(&import, &candidates), Some(DistName::new("yaml")));
    }

    #[test]
    fn closest_name_wins_without_exact_match() {
        let import = ImportName::new("bs4");
        let candidates = names(&["beautifulsoup4", "bs4-stubs"]);
        assert_eq!(
            best_match(&import, &candidates),
            Some(DistName::new("bs4-stubs"))
        );
    }

    #[test]
    fn dashes_fold_before_comparison() {
        let import = ImportName::new("typing_extensions");
        let candidates = names(&["typing-extensions", "typing"]);
        let score = similarity(&import, &DistName::new("typing-extensions"));
        assert!(score > 1.5, "dash spelling should be an exact match");
        assert_eq!(
            best_match(&import, &candidates),
            Some(DistName::new("typing-extensions"))
        );
    }

    #[test]
    fn ties_break_lexically() {
        let import = ImportName::new("zz");
        // Both one edit away from "zz".
        let candidates = names(&["za", "zb"]);
        assert_eq!(best_match(&import, &candidates), Some(DistName::new("za")));
        let reversed = names(&["zb", "za"]);
        assert_eq!(best_match(&import, &reversed), Some(DistName::new("za")));
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert_eq!(best_match(&ImportName::new("flask"), &[]), None);
    }
}
