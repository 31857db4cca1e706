//! Harvest progress reporting.
//!
//! Reports what the pipeline is doing (which platform is being probed,
//! which account was found, how many activities have been fetched so far)
//! so the operator can follow a long export. Progress is emitted on
//! **stderr** so stdout stays parseable for scripts.

use std::io::Write;

use crate::models::{MembershipType, ResolvedIdentity};

/// A single progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Searching one platform for the handle.
    Probing { platform: MembershipType },
    /// Search hit; cross-save not yet applied.
    Found { identity: ResolvedIdentity },
    /// Cross-save moved the run to the primary membership.
    CrossSaveResolved { identity: ResolvedIdentity },
    /// Characters discovered on the final membership.
    Characters { count: usize },
    /// A non-empty history page was fetched.
    Page {
        character_id: String,
        page: u32,
        fetched: usize,
        total: u64,
    },
    /// Pagination for a character ended at `page`.
    CharacterDone { character_id: String, page: u32 },
}

/// Reports harvest progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipeline stages.
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "  page 3: fetched 250 activities (total: 1,000)".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Probing { platform } => {
                format!("searching platform {}...\n", platform)
            }
            ProgressEvent::Found { identity } => format!(
                "found membershipId {} (type {}, crossSaveOverride {})\n",
                identity.membership_id, identity.membership_type, identity.cross_save_override
            ),
            ProgressEvent::CrossSaveResolved { identity } => format!(
                "cross-save: using primary membershipId {} (type {})\n",
                identity.membership_id, identity.membership_type
            ),
            ProgressEvent::Characters { count } => {
                format!("found {} character(s)\n", count)
            }
            ProgressEvent::Page {
                character_id,
                page,
                fetched,
                total,
            } => format!(
                "  {}  page {}: fetched {} activities (total: {})\n",
                character_id,
                page,
                fetched,
                format_number(*total)
            ),
            ProgressEvent::CharacterDone { character_id, page } => format!(
                "  {}  no more activities at page {}\n",
                character_id, page
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &ProgressEvent) -> serde_json::Value {
    match event {
        ProgressEvent::Probing { platform } => serde_json::json!({
            "event": "progress",
            "phase": "probing",
            "platform": platform.0
        }),
        ProgressEvent::Found { identity } => serde_json::json!({
            "event": "progress",
            "phase": "found",
            "membershipId": identity.membership_id,
            "membershipType": identity.membership_type.0,
            "crossSaveOverride": identity.cross_save_override.0
        }),
        ProgressEvent::CrossSaveResolved { identity } => serde_json::json!({
            "event": "progress",
            "phase": "cross_save",
            "membershipId": identity.membership_id,
            "membershipType": identity.membership_type.0
        }),
        ProgressEvent::Characters { count } => serde_json::json!({
            "event": "progress",
            "phase": "characters",
            "count": count
        }),
        ProgressEvent::Page {
            character_id,
            page,
            fetched,
            total,
        } => serde_json::json!({
            "event": "progress",
            "phase": "page",
            "characterId": character_id,
            "page": page,
            "fetched": fetched,
            "total": total
        }),
        ProgressEvent::CharacterDone { character_id, page } => serde_json::json!({
            "event": "progress",
            "phase": "character_done",
            "characterId": character_id,
            "page": page
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    /// Human when stderr is a TTY, otherwise off.
    Auto,
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Auto => {
                if atty::is(atty::Stream::Stderr) {
                    Box::new(StderrProgress)
                } else {
                    Box::new(NoProgress)
                }
            }
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn page_event_json() {
        let v = event_json(&ProgressEvent::Page {
            character_id: "2305843009301234567".into(),
            page: 2,
            fetched: 250,
            total: 750,
        });
        assert_eq!(v["phase"], "page");
        assert_eq!(v["characterId"], "2305843009301234567");
        assert_eq!(v["fetched"], 250);
        assert_eq!(v["total"], 750);
    }
}
