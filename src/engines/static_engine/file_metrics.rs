//! File-level metrics: blank/comment/code line
//! classification and a derived maintainability sub-score.

use serde::{Deserialize, Serialize};

use crate::core::codebase::Codebase;

/// Aggregate code-shape metrics over a codebase's non-binary files, recorded
/// as `metrics.code_metrics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub blank_lines: usize,
    pub comment_lines: usize,
    pub code_lines: usize,
    pub total_files: usize,
}

/// `clamp(0..100, 60 + 40 * (comments / max(code, 1)))` — richly commented
/// source scores higher, capped at 100, floored at 60 regardless of ratio.
pub fn maintainability_score(metrics: &CodeMetrics) -> f64 {
    let ratio = metrics.comment_lines as f64 / metrics.code_lines.max(1) as f64;
    (60.0 + 40.0 * ratio).clamp(0.0, 100.0)
}

/// Derive [`CodeMetrics`] from a codebase's source files.
pub fn compute_code_metrics(codebase: &Codebase) -> CodeMetrics {
    let stats = codebase.stats();
    CodeMetrics {
        blank_lines: stats.blank_lines,
        comment_lines: stats.comment_lines,
        code_lines: stats.code_lines,
        total_files: stats.total_files,
    }
}
