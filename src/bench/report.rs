//! Benchmark report: per-variant results, table and JSON output

use super::timing::BenchResult;
use crate::error::Result;
use crate::types::{AccessOrder, ComponentCount};
use crate::variant::{Resolution, Transfer, VariantSpec};
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct VariantResult {
    pub variant: VariantSpec,
    pub timing: BenchResult,
}

/// Results of one run, in execution order
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub entity_count: usize,
    pub access_order: AccessOrder,
    pub results: Vec<VariantResult>,
}

/// A pair of variants whose timings contradict the expected ordering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderingViolation {
    pub payload: ComponentCount,
    pub expected_faster: String,
    pub expected_slower: String,
    pub faster_ns: f64,
    pub slower_ns: f64,
}

impl fmt::Display for OrderingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.0}ns) is slower than {} ({:.0}ns)",
            self.expected_faster, self.faster_ns, self.expected_slower, self.slower_ns
        )
    }
}

impl Report {
    pub fn new(entity_count: usize, access_order: AccessOrder) -> Self {
        Self {
            entity_count,
            access_order,
            results: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariantResult> {
        self.results.iter().find(|r| r.variant.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.variant.name.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Regression check: for each payload, cached handles with bulk transfer
    /// should never be slower than resolving on every per-entity call.
    pub fn ordering_violations(&self) -> Vec<OrderingViolation> {
        let mut violations = Vec::new();

        for payload in ComponentCount::all() {
            let fastest = self.results.iter().find(|r| {
                r.variant.payload == payload
                    && r.variant.transfer == Transfer::Bulk
                    && r.variant.resolution == Resolution::Cached
            });
            let Some(fastest) = fastest else { continue };

            for slow in self.results.iter().filter(|r| {
                r.variant.payload == payload
                    && r.variant.transfer == Transfer::PerEntity
                    && r.variant.resolution == Resolution::EveryCall
            }) {
                if fastest.timing.avg_ns > slow.timing.avg_ns {
                    violations.push(OrderingViolation {
                        payload,
                        expected_faster: fastest.variant.name.clone(),
                        expected_slower: slow.variant.name.clone(),
                        faster_ns: fastest.timing.avg_ns,
                        slower_ns: slow.timing.avg_ns,
                    });
                }
            }
        }
        violations
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "═".repeat(140);
        writeln!(f, "╔{}╗", rule)?;
        writeln!(
            f,
            "║ COUPLING API CALL-PATTERN BENCHMARKS | entities: {} | access: {}",
            self.entity_count, self.access_order
        )?;
        writeln!(f, "╠{}╣", rule)?;
        for r in &self.results {
            writeln!(f, "║ {}", r.timing)?;
        }
        write!(f, "╚{}╝", rule)
    }
}
