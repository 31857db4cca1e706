//! The remote service boundary.
//!
//! [`BungieApi`] is the seam between the pipeline stages and the network:
//! the stages only ever see typed results or an [`ApiError`]. The real
//! implementation lives in [`crate::client`]; tests substitute a scripted
//! in-memory fake.
//!
//! The `parse_*` functions turn a raw Bungie response envelope into those
//! typed results. They are pure so the shape checks can be tested without
//! a network.
//!
//! # Envelope
//!
//! Every Bungie response is wrapped like this:
//!
//! ```json
//! { "Response": ..., "ErrorCode": 1, "ErrorStatus": "Success", "Message": "Ok" }
//! ```
//!
//! An `ErrorStatus` other than `"Success"` is reported as
//! [`ApiError::Service`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::models::{
    ActivityRecord, CharacterId, MembershipType, PaginationCursor, PlayerHandle, ResolvedIdentity,
};

/// Remote calls the pipeline depends on.
///
/// Each call is independent; implementations must not retry on their own.
#[async_trait]
pub trait BungieApi: Send + Sync {
    /// Search one platform for a Bungie name. An empty list means no match
    /// on that platform; the first card is the one used.
    async fn search_by_bungie_name(
        &self,
        platform: MembershipType,
        handle: &PlayerHandle,
    ) -> Result<Vec<UserInfoCard>, ApiError>;

    /// Memberships linked to the given one through cross-save.
    async fn linked_profiles(
        &self,
        membership_type: MembershipType,
        membership_id: &str,
    ) -> Result<Vec<LinkedProfile>, ApiError>;

    /// Character ids on the account. `Ok` with an empty list means the
    /// profile was readable but has no characters.
    async fn profile_characters(
        &self,
        membership_type: MembershipType,
        membership_id: &str,
    ) -> Result<Vec<CharacterId>, ApiError>;

    /// One page of a character's activity history. An empty list marks
    /// the end of the history.
    async fn activity_page(
        &self,
        identity: &ResolvedIdentity,
        cursor: &PaginationCursor,
        page_size: u32,
    ) -> Result<Vec<HistoryEntry>, ApiError>;
}

/// A search hit (`UserInfoCard` in Bungie's schema).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoCard {
    pub membership_id: String,
    pub membership_type: MembershipType,
    #[serde(default = "no_override")]
    pub cross_save_override: MembershipType,
}

fn no_override() -> MembershipType {
    MembershipType::NONE
}

impl From<UserInfoCard> for ResolvedIdentity {
    fn from(card: UserInfoCard) -> Self {
        ResolvedIdentity {
            membership_id: card.membership_id,
            membership_type: card.membership_type,
            cross_save_override: card.cross_save_override,
        }
    }
}

/// One entry of `LinkedProfiles.profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProfile {
    pub membership_id: String,
    pub membership_type: MembershipType,
}

/// One entry of the activity history endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub period: DateTime<Utc>,
    pub activity_details: ActivityDetails,
    pub values: HistoryValues,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    pub instance_id: String,
    pub mode: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryValues {
    pub activity_duration_seconds: StatValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatValue {
    pub basic: BasicValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BasicValue {
    pub value: f64,
}

impl HistoryEntry {
    pub fn into_record(self, pgcr_base: &str) -> ActivityRecord {
        ActivityRecord::new(
            self.activity_details.instance_id,
            self.activity_details.mode,
            self.period,
            self.values.activity_duration_seconds.basic.value,
            pgcr_base,
        )
    }
}

/// Unwrap the envelope, returning the `Response` member.
///
/// A missing `Response` yields `Value::Null`; callers decide whether
/// that is malformed.
pub fn unwrap_envelope(body: Value) -> Result<Value, ApiError> {
    let mut body = match body {
        Value::Object(map) => map,
        other => {
            return Err(ApiError::Malformed(format!(
                "expected an object envelope, got {}",
                json_kind(&other)
            )))
        }
    };

    if let Some(status) = body.get("ErrorStatus").and_then(|s| s.as_str()) {
        if status != "Success" {
            let message = body
                .get("Message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Service {
                status: status.to_string(),
                message,
            });
        }
    }

    Ok(body.remove("Response").unwrap_or(Value::Null))
}

/// `SearchDestinyPlayerByBungieName` → the first user card, if any.
///
/// Only element 0 is decoded; later cards never affect the result, so a
/// malformed trailing card cannot turn a hit into a miss.
pub fn parse_search(body: Value) -> Result<Vec<UserInfoCard>, ApiError> {
    match unwrap_envelope(body)? {
        Value::Array(cards) => match cards.into_iter().next() {
            Some(first) => Ok(vec![serde_json::from_value(first)?]),
            None => Ok(Vec::new()),
        },
        other => Err(ApiError::Malformed(format!(
            "search Response is {}, expected array",
            json_kind(&other)
        ))),
    }
}

/// `LinkedProfiles` → `Response.profiles`.
pub fn parse_linked_profiles(body: Value) -> Result<Vec<LinkedProfile>, ApiError> {
    let mut response = unwrap_envelope(body)?;
    match response.get_mut("profiles").map(Value::take) {
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
        _ => Err(ApiError::Malformed(
            "LinkedProfiles response has no profiles array".to_string(),
        )),
    }
}

/// `Profile?components=100,200` → keys of `Response.characters.data`.
pub fn parse_profile_characters(body: Value) -> Result<Vec<CharacterId>, ApiError> {
    let response = unwrap_envelope(body)?;
    let data = response
        .get("characters")
        .and_then(|c| c.get("data"))
        .and_then(|d| d.as_object())
        .ok_or_else(|| {
            ApiError::Malformed("profile response has no characters.data map".to_string())
        })?;

    Ok(data.keys().cloned().collect())
}

/// `Stats/Activities` → `Response.activities`.
///
/// An absent `activities` member is how the service signals the end of the
/// history, so it parses as an empty page rather than an error.
///
/// The page is decoded as a whole: one bad entry makes the entire page
/// malformed and none of its entries are returned.
pub fn parse_activity_page(body: Value) -> Result<Vec<HistoryEntry>, ApiError> {
    let mut response = unwrap_envelope(body)?;
    if !response.is_object() {
        return Err(ApiError::Malformed(format!(
            "activity history Response is {}, expected object",
            json_kind(&response)
        )));
    }

    match response.get_mut("activities").map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
        Some(other) => Err(ApiError::Malformed(format!(
            "activities is {}, expected array",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
