//! Feature entitlement endpoint.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::limits::features::rollout_cohort;
use crate::limits::{Feature, Plan};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesRequest {
    /// `snapshot` (default) or `check`.
    pub action: Option<String>,
    pub feature_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturesResponse {
    pub plan_tier: Plan,
    pub seat_limit: u32,
    pub request_quota: u32,
    /// Feature key → effective enabled state.
    pub entitlements: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<FeatureCheck>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCheck {
    pub feature_key: &'static str,
    pub enabled: bool,
    /// `plan`, `override`, or `rollout`.
    pub source: &'static str,
    pub rollout_cohort: u8,
}

/// `POST /api/features`
pub async fn features(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<FeaturesRequest>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let plan = ctx.gate.entitlements(&user.user_id).plan;
    let entitlements: BTreeMap<&'static str, bool> = ctx
        .gate
        .snapshot(&user.user_id)
        .into_iter()
        .map(|(feature, enabled)| (feature.as_str(), enabled))
        .collect();

    let check = match body.action.as_deref() {
        Some("check") => {
            let key = body.feature_key.as_deref().ok_or_else(|| {
                ApiError::bad_request("featureKey is required for check")
                    .with_request_id(request_id.clone())
            })?;
            let feature = parse_feature(key).ok_or_else(|| {
                ApiError::bad_request(format!("unknown feature: {key}"))
                    .with_request_id(request_id.clone())
            })?;
            Some(FeatureCheck {
                feature_key: feature.as_str(),
                enabled: ctx.gate.is_enabled(&user.user_id, feature),
                source: ctx.gate.resolution_source(&user.user_id, feature),
                rollout_cohort: rollout_cohort(&user.user_id, feature),
            })
        }
        None | Some("snapshot") => None,
        Some(other) => {
            return Err(ApiError::bad_request(format!("unknown action: {other}"))
                .with_request_id(request_id));
        }
    };

    Ok(Json(FeaturesResponse {
        plan_tier: plan,
        seat_limit: plan.seat_limit(),
        request_quota: ctx.gate.request_quota(&user.user_id),
        entitlements,
        check,
    }))
}

fn parse_feature(key: &str) -> Option<Feature> {
    Feature::ALL.into_iter().find(|f| f.as_str() == key)
}
