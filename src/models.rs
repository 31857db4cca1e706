//! Core data models used throughout the harvester.
//!
//! These types represent the player handle typed by the operator, the
//! membership it resolves to, and the activity rows that flow from the
//! history endpoint into the export sink.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HarvestError;

/// A Bungie name as typed by the operator: `name#code`.
///
/// Parsed once; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    pub display_name: String,
    pub display_code: u32,
}

impl FromStr for PlayerHandle {
    type Err = HarvestError;

    /// Splits at the last `#` so names that themselves contain `#` still
    /// parse; the code must be a plain unsigned integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, code) = s.rsplit_once('#').ok_or_else(|| {
            HarvestError::InputFormat(format!("missing '#' separator in '{}'", s))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(HarvestError::InputFormat(format!(
                "empty display name in '{}'",
                s
            )));
        }

        let code = code.trim();
        let display_code = code.parse::<u32>().map_err(|_| {
            HarvestError::InputFormat(format!("display code '{}' is not numeric", code))
        })?;

        Ok(Self {
            display_name: name.to_string(),
            display_code,
        })
    }
}

impl fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:04}", self.display_name, self.display_code)
    }
}

/// Platform identifier (Bungie `BungieMembershipType`).
///
/// The values are opaque to the pipeline; only the probe order matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipType(pub i32);

impl MembershipType {
    /// `crossSaveOverride` uses 0 for "cross-save not in effect".
    pub const NONE: MembershipType = MembershipType(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platforms in the same order the search endpoint is probed by default.
pub const DEFAULT_PLATFORMS: [MembershipType; 4] = [
    MembershipType(3),
    MembershipType(1),
    MembershipType(2),
    MembershipType(6),
];

/// An account membership the rest of the pipeline works against.
///
/// The cross-save step replaces this value wholesale; it is never
/// patched field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub membership_id: String,
    pub membership_type: MembershipType,
    pub cross_save_override: MembershipType,
}

impl ResolvedIdentity {
    /// True when cross-save names a primary membership other than this one.
    pub fn needs_cross_save(&self) -> bool {
        !self.cross_save_override.is_none() && self.cross_save_override != self.membership_type
    }
}

impl fmt::Display for ResolvedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (type {}, crossSaveOverride {})",
            self.membership_id, self.membership_type, self.cross_save_override
        )
    }
}

pub type CharacterId = String;

/// One completed activity, as written to the export.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub instance_id: String,
    pub mode: i32,
    pub period: DateTime<Utc>,
    pub duration_seconds: f64,
    pub pgcr_link: String,
}

impl ActivityRecord {
    /// Column names, in row order.
    pub const HEADER: [&'static str; 5] =
        ["instanceId", "mode", "date", "durationSeconds", "pgcrLink"];

    /// Build a record, deriving the PGCR link from `pgcr_base` + instance id.
    pub fn new(
        instance_id: String,
        mode: i32,
        period: DateTime<Utc>,
        duration_seconds: f64,
        pgcr_base: &str,
    ) -> Self {
        let pgcr_link = format!("{}{}", pgcr_base, instance_id);
        Self {
            instance_id,
            mode,
            period,
            duration_seconds,
            pgcr_link,
        }
    }

    /// Field values in [`ActivityRecord::HEADER`] order.
    pub fn fields(&self) -> [String; 5] {
        [
            self.instance_id.clone(),
            self.mode.to_string(),
            self.period.to_rfc3339_opts(SecondsFormat::Secs, true),
            format_duration(self.duration_seconds),
            self.pgcr_link.clone(),
        ]
    }
}

/// `1234.0` → `"1234"`, `12.5` → `"12.5"`.
fn format_duration(secs: f64) -> String {
    if secs.fract() == 0.0 && secs.is_finite() {
        format!("{}", secs as i64)
    } else {
        format!("{}", secs)
    }
}

/// Position of the next history page to request for one character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    pub character_id: CharacterId,
    pub page: u32,
}

impl PaginationCursor {
    pub fn start(character_id: CharacterId) -> Self {
        Self {
            character_id,
            page: 0,
        }
    }

    /// Advance by exactly one page.
    pub fn advance(&mut self) {
        self.page += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_handle() {
        let h: PlayerHandle = "Guardian#1234".parse().unwrap();
        assert_eq!(h.display_name, "Guardian");
        assert_eq!(h.display_code, 1234);
    }

    #[test]
    fn parse_handle_keeps_inner_hash_and_spaces() {
        let h: PlayerHandle = "  Space Cadet#Two#0042\n".parse().unwrap();
        assert_eq!(h.display_name, "Space Cadet#Two");
        assert_eq!(h.display_code, 42);
        assert_eq!(h.to_string(), "Space Cadet#Two#0042");
    }

    #[test]
    fn parse_handle_rejects_bad_input() {
        for input in ["Guardian1234", "Guardian#", "Guardian#12a4", "#1234", "Guardian#-5"] {
            let err = input.parse::<PlayerHandle>().unwrap_err();
            assert!(
                matches!(err, HarvestError::InputFormat(_)),
                "{} gave {:?}",
                input,
                err
            );
        }
    }

    #[test]
    fn cross_save_trigger() {
        let mut id = ResolvedIdentity {
            membership_id: "1".into(),
            membership_type: MembershipType(1),
            cross_save_override: MembershipType(0),
        };
        assert!(!id.needs_cross_save());
        id.cross_save_override = MembershipType(1);
        assert!(!id.needs_cross_save());
        id.cross_save_override = MembershipType(3);
        assert!(id.needs_cross_save());
    }

    #[test]
    fn record_fields() {
        let period = Utc.with_ymd_and_hms(2023, 2, 28, 19, 5, 0).unwrap();
        let rec = ActivityRecord::new(
            "12345".into(),
            4,
            period,
            1834.0,
            "https://www.bungie.net/en/PGCR/",
        );
        assert_eq!(rec.pgcr_link, "https://www.bungie.net/en/PGCR/12345");
        assert_eq!(
            rec.fields(),
            [
                "12345".to_string(),
                "4".to_string(),
                "2023-02-28T19:05:00Z".to_string(),
                "1834".to_string(),
                "https://www.bungie.net/en/PGCR/12345".to_string(),
            ]
        );
    }

    #[test]
    fn fractional_duration_kept() {
        assert_eq!(format_duration(12.5), "12.5");
        assert_eq!(format_duration(0.0), "0");
    }

    #[test]
    fn cursor_advances_by_one() {
        let mut c = PaginationCursor::start("c1".into());
        assert_eq!(c.page, 0);
        c.advance();
        c.advance();
        assert_eq!(c.page, 2);
    }
}
