//! Result aggregation: weighted overall score,
//! quality-gate decision, and the derived human-facing [`Summary`].

use std::collections::HashMap;

use crate::core::config::ValidationConfig;
use crate::core::task::{EngineResult, EngineStatus, Summary};

/// `Σ(score_i * weight_i) / Σ(weight_i)` over engines that produced a score.
/// Zero if no engine produced a score at all.
pub fn weighted_overall_score(results: &HashMap<String, EngineResult>, config: &ValidationConfig) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (engine, result) in results {
        if let Some(score) = result.score {
            let weight = config.weight_for(engine);
            weighted_sum += score * weight;
            weight_total += weight;
        }
    }
    if weight_total == 0.0 {
        0.0
    } else {
        weighted_sum / weight_total
    }
}

/// Quality gate = true iff overall >= min_overall AND (if a "security"
/// result exists) security.score >= min_security. Absence of a security
/// result never blocks the gate on its own.
pub fn quality_gate_passes(overall: f64, results: &HashMap<String, EngineResult>, config: &ValidationConfig) -> bool {
    if overall < config.quality_gate.min_overall {
        return false;
    }
    match results.get("security").and_then(|r| r.score) {
        Some(security_score) => security_score >= config.quality_gate.min_security,
        None => true,
    }
}

/// Derive the human-facing [`Summary`] from per-engine results.
pub fn derive_summary(results: &HashMap<String, EngineResult>) -> Summary {
    let mut summary = Summary::default();

    if let Some(static_result) = results.get("static") {
        summary.quality_score = static_result.score;
        if let Some(maintainability) = static_result
            .metrics
            .get("maintainability")
            .and_then(|v| v.as_f64())
        {
            summary.maintainability_score = Some(maintainability);
        }
        if let Some(languages) = static_result
            .metrics
            .get("languages")
            .and_then(|v| v.as_object())
        {
            for (lang, count) in languages {
                if let Some(count) = count.as_u64() {
                    summary.languages.insert(lang.clone(), count as usize);
                }
            }
        }
        if let Some(code_metrics) = static_result.metrics.get("code_metrics") {
            if let Some(code_lines) = code_metrics.get("code_lines").and_then(|v| v.as_u64()) {
                summary.total_lines += code_lines as usize;
            }
        }
    }

    if let Some(security_result) = results.get("security") {
        summary.security_score = security_result.score;
    }

    if let Some(performance_result) = results.get("performance") {
        summary.performance_score = performance_result.score;
    }

    for result in results.values() {
        if result.status == EngineStatus::Failed {
            if let Some(error) = &result.error {
                summary
                    .recommendations
                    .push(format!("{} engine failed: {error}", result.engine));
            }
            continue;
        }
        for finding in &result.findings {
            if matches!(
                finding.severity,
                crate::core::finding::Severity::Critical | crate::core::finding::Severity::High
            ) {
                summary.recommendations.push(finding.title.clone());
            }
        }
    }

    summary
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn result(engine: &str, score: f64) -> EngineResult {
        EngineResult::completed(engine, score, Duration::from_millis(1))
    }

    proptest! {
        #[test]
        fn weighted_score_stays_within_the_scores_it_averages(
            static_score in 0.0f64..=100.0,
            runtime_score in 0.0f64..=100.0,
            security_score in 0.0f64..=100.0,
        ) {
            let mut results = HashMap::new();
            results.insert("static".to_string(), result("static", static_score));
            results.insert("runtime".to_string(), result("runtime", runtime_score));
            results.insert("security".to_string(), result("security", security_score));
            let config = ValidationConfig::default();

            let overall = weighted_overall_score(&results, &config);
            let lo = static_score.min(runtime_score).min(security_score);
            let hi = static_score.max(runtime_score).max(security_score);
            prop_assert!(overall >= lo - 1e-9 && overall <= hi + 1e-9);
        }
    }
}
