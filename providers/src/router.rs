//! Provider Router
//!
//! Maps a declarative request onto the best registered adapter and explains
//! the choice. Selection runs in four passes:
//!
//! 1. capability filter (ready, privacy level, token, amount bounds)
//! 2. local cost estimation per surviving adapter
//! 3. hard constraints (max fee, max latency, blocking warnings)
//! 4. weighted scoring
//!
//! Scoring weights are fixed for a build: within the candidate set, fee is
//! worth up to 40 points (cheapest 40, linear to 0 at the most expensive),
//! latency up to 20, anonymity-set size up to 20 (largest 20, absent 0),
//! compliance match 10, preferred provider 10. Ties break by ascending
//! provider id.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::adapter::{precheck, PrivacyProvider};
use crate::error::{ExclusionReason, ProviderError, Result};
use crate::registry::TokenRegistry;
use crate::types::{
    CostEstimate, EstimateRequest, ProviderId, ScoredCandidate, SelectionCriteria, SelectionResult,
};

const FEE_WEIGHT: f64 = 40.0;
const LATENCY_WEIGHT: f64 = 20.0;
const ANONYMITY_WEIGHT: f64 = 20.0;
const COMPLIANCE_BONUS: i64 = 10;
const PREFERRED_BONUS: i64 = 10;

/// Registry of adapters plus the selection procedure.
pub struct ProviderRouter {
    adapters: BTreeMap<ProviderId, Arc<dyn PrivacyProvider>>,
    registry: &'static TokenRegistry,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
            registry: TokenRegistry::standard(),
        }
    }

    /// Register an adapter, replacing any previous one with the same id.
    pub fn register(&mut self, adapter: Arc<dyn PrivacyProvider>) {
        self.adapters.insert(adapter.provider_id(), adapter);
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn PrivacyProvider>> {
        self.adapters.get(&id).cloned()
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.adapters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Choose the best adapter for `criteria`.
    pub async fn select_provider(&self, criteria: &SelectionCriteria) -> Result<SelectionResult> {
        let mut exclusions: Vec<ExclusionReason> = Vec::new();
        let mut surviving: Vec<(ProviderId, Arc<dyn PrivacyProvider>, CostEstimate)> = Vec::new();

        // Passes 1-3: filter, estimate, hard constraints
        for (&id, adapter) in &self.adapters {
            if let Err(err) = precheck(
                adapter.as_ref(),
                self.registry,
                &criteria.token,
                criteria.amount,
                criteria.privacy_level,
            ) {
                exclusions.push(ExclusionReason {
                    provider: id,
                    reason: err.to_string(),
                });
                continue;
            }

            let estimate = match adapter
                .estimate(&EstimateRequest {
                    token: criteria.token.clone(),
                    amount: criteria.amount,
                    privacy_level: criteria.privacy_level,
                })
                .await
            {
                Ok(estimate) => estimate,
                Err(err) => {
                    exclusions.push(ExclusionReason {
                        provider: id,
                        reason: format!("estimate failed: {err}"),
                    });
                    continue;
                }
            };

            if let Some(max_fee) = criteria.max_fee {
                if estimate.fee > max_fee {
                    exclusions.push(ExclusionReason {
                        provider: id,
                        reason: format!("fee {:.4} exceeds max {:.4}", estimate.fee, max_fee),
                    });
                    continue;
                }
            }
            if let Some(max_latency) = criteria.max_latency_ms {
                if estimate.latency_ms > max_latency {
                    exclusions.push(ExclusionReason {
                        provider: id,
                        reason: format!(
                            "latency {} ms exceeds max {} ms",
                            estimate.latency_ms, max_latency
                        ),
                    });
                    continue;
                }
            }
            if let Some(blocking) = estimate
                .warnings
                .iter()
                .find(|w| w.contains("below minimum") || w.contains("above maximum"))
            {
                exclusions.push(ExclusionReason {
                    provider: id,
                    reason: blocking.clone(),
                });
                continue;
            }

            surviving.push((id, adapter.clone(), estimate));
        }

        if surviving.is_empty() {
            return Err(ProviderError::NoSuitableProvider(exclusions));
        }

        // Pass 4: score within the surviving set
        let fee_min = surviving.iter().map(|(_, _, e)| e.fee).fold(f64::MAX, f64::min);
        let fee_max = surviving.iter().map(|(_, _, e)| e.fee).fold(f64::MIN, f64::max);
        let lat_min = surviving.iter().map(|(_, _, e)| e.latency_ms).min().unwrap_or(0);
        let lat_max = surviving.iter().map(|(_, _, e)| e.latency_ms).max().unwrap_or(0);
        let anon_max = surviving
            .iter()
            .filter_map(|(_, _, e)| e.anonymity_set)
            .max();

        let mut candidates: Vec<ScoredCandidate> = surviving
            .into_iter()
            .map(|(id, adapter, estimate)| {
                let mut score = 0.0;

                score += spread_score(estimate.fee, fee_min, fee_max, FEE_WEIGHT);
                score += spread_score(
                    estimate.latency_ms as f64,
                    lat_min as f64,
                    lat_max as f64,
                    LATENCY_WEIGHT,
                );
                if let (Some(anonymity), Some(max)) = (estimate.anonymity_set, anon_max) {
                    if max > 0 {
                        score += ANONYMITY_WEIGHT * anonymity as f64 / max as f64;
                    }
                }

                let mut score = score.round() as i64;
                let mut reasons = vec![
                    format!("supports {}", criteria.privacy_level),
                    format!("supports {}", criteria.token),
                    format!("fee {:.4} {}", estimate.fee, criteria.token),
                    format!("latency {} ms", estimate.latency_ms),
                ];
                if let Some(anonymity) = estimate.anonymity_set {
                    reasons.push(format!("anonymity set {anonymity}"));
                }

                if criteria.require_compliance && adapter.supports_compliance() {
                    score += COMPLIANCE_BONUS;
                    reasons.push("compliance supported".to_string());
                }
                if criteria.preferred_provider == Some(id) {
                    score += PREFERRED_BONUS;
                    reasons.push("preferred provider".to_string());
                }

                ScoredCandidate {
                    provider: id,
                    estimate,
                    score,
                    reasons,
                }
            })
            .collect();

        // Score descending, provider id ascending on ties
        candidates.sort_by(|a, b| b.score.cmp(&a.score).then(a.provider.cmp(&b.provider)));

        let recommended = candidates.remove(0);
        debug!(
            "router selected {} (score {}) from {} candidates",
            recommended.provider,
            recommended.score,
            candidates.len() + 1
        );

        let explanation = recommended.reasons.clone();
        Ok(SelectionResult {
            recommended,
            alternatives: candidates,
            explanation,
        })
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear score: best value in the candidate set gets the full weight, the
/// worst gets zero; a degenerate spread gives everyone the full weight.
fn spread_score(value: f64, min: f64, max: f64, weight: f64) -> f64 {
    let spread = max - min;
    if spread <= f64::EPSILON {
        weight
    } else {
        weight * (max - value) / spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread_score() {
        // Cheapest gets full weight, most expensive zero
        assert_eq!(spread_score(0.2, 0.2, 1.0, 40.0), 40.0);
        assert_eq!(spread_score(1.0, 0.2, 1.0, 40.0), 0.0);
        // Equal values all get the full weight
        assert_eq!(spread_score(0.5, 0.5, 0.5, 40.0), 40.0);
        // Midpoint is half
        let mid = spread_score(0.6, 0.2, 1.0, 40.0);
        assert!((mid - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_empty_router() {
        let router = ProviderRouter::new();
        assert!(router.is_empty());
        assert_eq!(router.provider_ids(), vec![]);
    }
}
