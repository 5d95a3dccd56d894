use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::ResultRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub mentioned: usize,
    pub failed: usize,
    pub visibility_rate: f32,
}

/// Failed questions count towards `total`, so they lower the rate.
pub fn summarize(rows: &[ResultRow]) -> AuditSummary {
    let total = rows.len();
    let mentioned = rows.iter().filter(|r| r.verdict.mentioned).count();
    let failed = rows.iter().filter(|r| r.provenance.is_failure()).count();
    let visibility_rate = if total == 0 { 0.0 } else { mentioned as f32 / total as f32 };
    AuditSummary { total, mentioned, failed, visibility_rate }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visibility {}/{} ({:.0}%), {} failed",
            self.mentioned,
            self.total,
            self.visibility_rate * 100.0,
            self.failed
        )
    }
}
