use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::endpoint::Endpoint;

/// One set declared by the repository's ListSets response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SetDescriptor {
    pub set_spec: String,
}

/// Result of sizing one set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub set_spec: String,
    pub url: String,
    pub status_code: u16,
    /// `None` when the request failed or the response had nothing countable.
    pub count: Option<u64>,
    pub failed: bool,
}

/// Report entry for one set.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SetReport {
    pub url: String,
    pub status_code: u16,
    pub size: Option<u64>,
}

/// Set entries keyed by set spec, serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSets(Vec<(String, SetReport)>);

impl ReportSets {
    /// Insert or replace the entry for `set_spec`, keeping its first position.
    pub fn insert(&mut self, set_spec: String, entry: SetReport) {
        match self.0.iter_mut().find(|(k, _)| *k == set_spec) {
            Some((_, existing)) => *existing = entry,
            None => self.0.push((set_spec, entry)),
        }
    }

    pub fn get(&self, set_spec: &str) -> Option<&SetReport> {
        self.0.iter().find(|(k, _)| k == set_spec).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SetReport)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for ReportSets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// The scan report printed at the end of a run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub base_url: String,
    pub sets: ReportSets,
}

/// Tallies used for the closing log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub sized: usize,
    pub unknown: usize,
    pub failed: usize,
}

/// Fold scan outcomes into a report, one entry per set in outcome order.
pub fn assemble(endpoint: &Endpoint, outcomes: &[ScanOutcome]) -> Report {
    let mut sets = ReportSets::default();
    for outcome in outcomes {
        sets.insert(
            outcome.set_spec.clone(),
            SetReport {
                url: outcome.url.clone(),
                status_code: outcome.status_code,
                size: if outcome.failed { None } else { outcome.count },
            },
        );
    }
    Report {
        base_url: endpoint.as_str().to_string(),
        sets,
    }
}

impl Report {
    /// JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever writes valid UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Count sized, unknown-size and failed sets.
pub fn summarize(outcomes: &[ScanOutcome]) -> ReportSummary {
    outcomes.iter().fold(ReportSummary::default(), |mut acc, o| {
        match (o.failed, o.count) {
            (true, _) => acc.failed += 1,
            (false, Some(_)) => acc.sized += 1,
            (false, None) => acc.unknown += 1,
        }
        acc
    })
}
