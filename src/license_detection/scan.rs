//! Matching engine: scans a document against every catalog entry.
//!
//! The document is normalized once. Each entry is first prechecked with its
//! static blocks; only entries whose blocks are all present run their
//! compiled pattern. Entries are independent, so the loop runs in parallel.

use log::debug;
use rayon::prelude::*;

use crate::license_detection::catalog::{LicenseCatalog, LicenseCatalogEntry};
use crate::license_detection::models::{MatchResult, ScanStats};
use crate::license_detection::normalize::NormalizationData;

/// Matches and counters from one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub matches: Vec<MatchResult>,
    pub stats: ScanStats,
}

enum EntryOutcome {
    Pruned,
    NoMatch,
    Matched(MatchResult),
}

/// Returns every catalog entry that matches `document`, in catalog order.
pub fn scan(document: &[u8], catalog: &LicenseCatalog) -> Vec<MatchResult> {
    scan_with_stats(document, catalog).matches
}

pub fn scan_with_stats(document: &[u8], catalog: &LicenseCatalog) -> ScanOutcome {
    let data = NormalizationData::new(document, catalog.options().normalize_options());

    let outcomes: Vec<EntryOutcome> = catalog
        .entries()
        .par_iter()
        .map(|entry| match_entry(entry, &data))
        .collect();

    let mut outcome = ScanOutcome {
        stats: ScanStats {
            entries: outcomes.len(),
            ..ScanStats::default()
        },
        ..ScanOutcome::default()
    };
    for entry_outcome in outcomes {
        match entry_outcome {
            EntryOutcome::Pruned => outcome.stats.pruned += 1,
            EntryOutcome::NoMatch => outcome.stats.evaluated += 1,
            EntryOutcome::Matched(result) => {
                outcome.stats.evaluated += 1;
                outcome.matches.push(result);
            }
        }
    }

    debug!(
        "Scanned {} entries: {} pruned, {} evaluated, {} matched",
        outcome.stats.entries,
        outcome.stats.pruned,
        outcome.stats.evaluated,
        outcome.matches.len()
    );
    outcome
}

fn match_entry(entry: &LicenseCatalogEntry, data: &NormalizationData) -> EntryOutcome {
    let normalized = data.normalized_text();
    if !entry.passes_precheck(normalized) {
        return EntryOutcome::Pruned;
    }
    let Some(normalized_span) = entry.pattern.find(normalized) else {
        return EntryOutcome::NoMatch;
    };

    // An all-optional template can match an empty body.
    let span = data.raw_span(normalized_span.clone()).unwrap_or_else(|| {
        let at = data
            .raw_offset(normalized_span.start)
            .unwrap_or(data.raw_bytes().len());
        at..at
    });

    EntryOutcome::Matched(MatchResult {
        id: entry.id.clone(),
        license_id: entry.license_id.clone(),
        namespace: entry.namespace,
        kind: entry.kind,
        deprecated: entry.deprecated,
        span,
        normalized_span,
    })
}
