//! Plan-based feature gating with per-user overrides and percentage
//! rollouts.
//!
//! Resolution order: explicit per-user override, then plan defaults.
//! Rollout percentages are applied last and can only narrow access, so a
//! half-rolled-out feature stays off for users outside the cohort even
//! when their plan includes it. Cohort assignment is a stable hash of
//! user id and feature, never randomness per request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Gated capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AiExtraction,
    VisionOcr,
    AiEnrichment,
    HighVolume,
    PriorityInference,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiExtraction => "ai_extraction",
            Self::VisionOcr => "vision_ocr",
            Self::AiEnrichment => "ai_enrichment",
            Self::HighVolume => "high_volume",
            Self::PriorityInference => "priority_inference",
        }
    }

    pub const ALL: [Feature; 5] = [
        Feature::AiExtraction,
        Feature::VisionOcr,
        Feature::AiEnrichment,
        Feature::HighVolume,
        Feature::PriorityInference,
    ];
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Free,
    Plus,
    Pro,
}

impl Plan {
    pub fn includes(&self, feature: Feature) -> bool {
        match self {
            Plan::Free => matches!(feature, Feature::AiExtraction),
            Plan::Plus => matches!(
                feature,
                Feature::AiExtraction | Feature::VisionOcr | Feature::AiEnrichment
            ),
            Plan::Pro => true,
        }
    }

    pub fn seat_limit(&self) -> u32 {
        match self {
            Plan::Free => 1,
            Plan::Plus => 3,
            Plan::Pro => 10,
        }
    }

    /// Base requests per window, before the high-volume multiplier.
    pub fn base_quota(&self) -> u32 {
        match self {
            Plan::Free => 20,
            Plan::Plus => 100,
            Plan::Pro => 400,
        }
    }
}

/// What one user is entitled to: their plan plus any explicit per-user
/// feature overrides (support escalations, beta access, kill switches).
#[derive(Debug, Clone, Default)]
pub struct Entitlements {
    pub plan: Plan,
    pub overrides: HashMap<Feature, bool>,
}

pub trait EntitlementSource: Send + Sync {
    fn entitlements(&self, user_id: &str) -> Entitlements;
}

/// In-memory entitlement table; unknown users get the default plan.
#[derive(Default)]
pub struct StaticEntitlements {
    users: HashMap<String, Entitlements>,
    default_plan: Plan,
}

impl StaticEntitlements {
    pub fn new(default_plan: Plan) -> Self {
        Self {
            users: HashMap::new(),
            default_plan,
        }
    }

    pub fn with_plan(mut self, user_id: &str, plan: Plan) -> Self {
        self.users.entry(user_id.to_string()).or_default().plan = plan;
        self
    }

    pub fn with_override(mut self, user_id: &str, feature: Feature, enabled: bool) -> Self {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .overrides
            .insert(feature, enabled);
        self
    }
}

impl EntitlementSource for StaticEntitlements {
    fn entitlements(&self, user_id: &str) -> Entitlements {
        self.users.get(user_id).cloned().unwrap_or(Entitlements {
            plan: self.default_plan,
            overrides: HashMap::new(),
        })
    }
}

pub struct FeatureGate {
    source: Arc<dyn EntitlementSource>,
    /// Percentage (0-100) of the user base each feature is rolled out to.
    /// Absent means fully rolled out.
    rollouts: HashMap<Feature, u8>,
}

impl FeatureGate {
    pub fn new(source: Arc<dyn EntitlementSource>) -> Self {
        Self {
            source,
            rollouts: HashMap::new(),
        }
    }

    pub fn with_rollout(mut self, feature: Feature, percent: u8) -> Self {
        self.rollouts.insert(feature, percent.min(100));
        self
    }

    pub fn is_enabled(&self, user_id: &str, feature: Feature) -> bool {
        let entitlements = self.source.entitlements(user_id);
        let enabled = entitlements
            .overrides
            .get(&feature)
            .copied()
            .unwrap_or_else(|| entitlements.plan.includes(feature));
        if !enabled {
            return false;
        }
        match self.rollouts.get(&feature) {
            Some(&percent) => rollout_cohort(user_id, feature) < percent,
            None => true,
        }
    }

    /// Plan quota with the high-volume multiplier applied.
    pub fn request_quota(&self, user_id: &str) -> u32 {
        let base = self.source.entitlements(user_id).plan.base_quota();
        if self.is_enabled(user_id, Feature::HighVolume) {
            base * 3
        } else {
            base
        }
    }

    /// Per-call timeout, doubled for priority users.
    pub fn call_timeout(&self, user_id: &str, base: Duration) -> Duration {
        if self.is_enabled(user_id, Feature::PriorityInference) {
            base * 2
        } else {
            base
        }
    }

    /// Snapshot of every feature's state for one user, for the features
    /// endpoint.
    pub fn snapshot(&self, user_id: &str) -> Vec<(Feature, bool)> {
        Feature::ALL
            .iter()
            .map(|&f| (f, self.is_enabled(user_id, f)))
            .collect()
    }

    pub fn entitlements(&self, user_id: &str) -> Entitlements {
        self.source.entitlements(user_id)
    }

    /// Where a feature's enabled state came from, for diagnostics.
    pub fn resolution_source(&self, user_id: &str, feature: Feature) -> &'static str {
        let entitlements = self.source.entitlements(user_id);
        if entitlements.overrides.contains_key(&feature) {
            "override"
        } else if self.rollouts.contains_key(&feature) {
            "rollout"
        } else {
            "plan"
        }
    }
}

/// Stable 0-99 bucket from sha256(feature:user). The same user always
/// lands in the same bucket for a given feature.
pub fn rollout_cohort(user_id: &str, feature: Feature) -> u8 {
    let digest = Sha256::digest(format!("{}:{}", feature.as_str(), user_id).as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(source: StaticEntitlements) -> FeatureGate {
        FeatureGate::new(Arc::new(source))
    }

    #[test]
    fn plan_defaults() {
        assert!(Plan::Free.includes(Feature::AiExtraction));
        assert!(!Plan::Free.includes(Feature::VisionOcr));
        assert!(Plan::Plus.includes(Feature::VisionOcr));
        assert!(!Plan::Plus.includes(Feature::HighVolume));
        assert!(Plan::Pro.includes(Feature::PriorityInference));
    }

    #[test]
    fn seat_limits_scale_with_plan() {
        assert_eq!(Plan::Free.seat_limit(), 1);
        assert_eq!(Plan::Plus.seat_limit(), 3);
        assert_eq!(Plan::Pro.seat_limit(), 10);
    }

    #[test]
    fn unknown_user_gets_default_plan() {
        let g = gate(StaticEntitlements::new(Plan::Free));
        assert!(g.is_enabled("stranger", Feature::AiExtraction));
        assert!(!g.is_enabled("stranger", Feature::VisionOcr));
    }

    #[test]
    fn user_override_beats_plan() {
        let source = StaticEntitlements::new(Plan::Free)
            .with_override("beta-user", Feature::VisionOcr, true)
            .with_plan("banned", Plan::Pro)
            .with_override("banned", Feature::AiExtraction, false);
        let g = gate(source);
        assert!(g.is_enabled("beta-user", Feature::VisionOcr));
        assert!(!g.is_enabled("banned", Feature::AiExtraction));
    }

    #[test]
    fn rollout_narrows_but_never_widens() {
        let source = StaticEntitlements::new(Plan::Free);
        // 0%: nobody gets it, even with the plan including it
        let closed = gate(source).with_rollout(Feature::AiExtraction, 0);
        assert!(!closed.is_enabled("anyone", Feature::AiExtraction));

        // 100% rollout cannot enable a feature the plan excludes
        let open =
            gate(StaticEntitlements::new(Plan::Free)).with_rollout(Feature::VisionOcr, 100);
        assert!(!open.is_enabled("anyone", Feature::VisionOcr));
    }

    #[test]
    fn rollout_cohort_is_stable() {
        let a = rollout_cohort("user-42", Feature::AiEnrichment);
        let b = rollout_cohort("user-42", Feature::AiEnrichment);
        assert_eq!(a, b);
        assert!(a < 100);
    }

    #[test]
    fn partial_rollout_splits_the_user_base() {
        let g = gate(StaticEntitlements::new(Plan::Pro)).with_rollout(Feature::HighVolume, 50);
        let enabled = (0..200)
            .filter(|i| g.is_enabled(&format!("user-{i}"), Feature::HighVolume))
            .count();
        // A stable hash over 200 users lands near half, never all or none
        assert!(enabled > 50 && enabled < 150, "enabled {enabled}");
    }

    #[test]
    fn high_volume_triples_quota() {
        let g = gate(StaticEntitlements::new(Plan::Pro));
        assert_eq!(g.request_quota("pro-user"), 1200);

        let g = gate(StaticEntitlements::new(Plan::Plus));
        assert_eq!(g.request_quota("plus-user"), 100);
    }

    #[test]
    fn priority_inference_extends_timeout() {
        let base = Duration::from_secs(30);
        let g = gate(StaticEntitlements::new(Plan::Pro));
        assert_eq!(g.call_timeout("pro", base), Duration::from_secs(60));

        let g = gate(StaticEntitlements::new(Plan::Free));
        assert_eq!(g.call_timeout("free", base), base);
    }

    #[test]
    fn snapshot_lists_every_feature() {
        let g = gate(StaticEntitlements::new(Plan::Plus));
        let snapshot = g.snapshot("someone");
        assert_eq!(snapshot.len(), Feature::ALL.len());
        assert!(snapshot.contains(&(Feature::AiEnrichment, true)));
        assert!(snapshot.contains(&(Feature::HighVolume, false)));
    }
}
