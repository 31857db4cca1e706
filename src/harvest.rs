//! Activity history harvesting.
//!
//! Discovers the characters on the final membership, then walks each
//! character's activity history page by page, streaming every entry into
//! an [`ActivitySink`] as soon as its page arrives.
//!
//! # Pagination
//!
//! The history endpoint has no "last page" flag; the end is signalled by a
//! page without activities. Each character's walk is a two-state machine:
//!
//! ```text
//!  Fetching(n) ──non-empty page──▶ Fetching(n + 1)
//!       │
//!       └──empty / failed page──▶ Exhausted
//! ```
//!
//! A failed or malformed page ends that character only. With
//! `max_pages` set, reaching the ceiling also ends it.
//!
//! Characters are processed one at a time in discovery order, so rows come
//! out ordered by character, then page, then position within the page.

use crate::api::BungieApi;
use crate::config::Config;
use crate::error::HarvestError;
use crate::export::ActivitySink;
use crate::models::{CharacterId, PaginationCursor, ResolvedIdentity};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Knobs for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub page_size: u32,
    pub max_pages: Option<u32>,
    pub pgcr_base_url: String,
}

impl HarvestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.harvest.page_size,
            max_pages: config.harvest.max_pages,
            pgcr_base_url: config.output.pgcr_base_url.clone(),
        }
    }
}

/// Why a character's pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStop {
    /// A page came back without activities.
    Exhausted,
    /// A page request failed or its body was unusable.
    Malformed,
    /// `max_pages` pages were fetched.
    Ceiling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub character_id: CharacterId,
    /// Non-empty pages fetched.
    pub pages: u32,
    pub activities: u64,
    pub stop: PageStop,
}

/// What a harvest produced; `total` is the sum over `characters`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub total: u64,
    pub characters: Vec<CharacterSummary>,
}

enum PageState {
    Fetching(PaginationCursor),
    Exhausted(PaginationCursor, PageStop),
}

/// List the characters on `identity`.
///
/// # Errors
///
/// - [`HarvestError::ProfileUnavailable`] if the profile request fails or
///   has no character map.
/// - [`HarvestError::NoCharacters`] if the map is empty.
pub async fn discover_characters(
    api: &dyn BungieApi,
    identity: &ResolvedIdentity,
) -> Result<Vec<CharacterId>, HarvestError> {
    let characters = api
        .profile_characters(identity.membership_type, &identity.membership_id)
        .await
        .map_err(|e| HarvestError::ProfileUnavailable(e.to_string()))?;

    if characters.is_empty() {
        return Err(HarvestError::NoCharacters);
    }
    Ok(characters)
}

/// Harvest every character's full history into `sink`.
///
/// The sink is not finished here; that is up to the caller once this
/// returns.
pub async fn harvest<S: ActivitySink + ?Sized>(
    api: &dyn BungieApi,
    identity: &ResolvedIdentity,
    options: &HarvestOptions,
    sink: &mut S,
    progress: &dyn ProgressReporter,
) -> Result<HarvestSummary, HarvestError> {
    let characters = discover_characters(api, identity).await?;
    harvest_characters(api, identity, characters, options, sink, progress).await
}

/// Harvest the given characters, in order, into `sink`.
pub async fn harvest_characters<S: ActivitySink + ?Sized>(
    api: &dyn BungieApi,
    identity: &ResolvedIdentity,
    characters: Vec<CharacterId>,
    options: &HarvestOptions,
    sink: &mut S,
    progress: &dyn ProgressReporter,
) -> Result<HarvestSummary, HarvestError> {
    progress.report(ProgressEvent::Characters {
        count: characters.len(),
    });

    let mut summary = HarvestSummary::default();
    for character_id in characters {
        let character =
            harvest_character(api, identity, options, character_id, sink, progress, summary.total)
                .await?;
        summary.total += character.activities;
        summary.characters.push(character);
    }

    Ok(summary)
}

async fn harvest_character<S: ActivitySink + ?Sized>(
    api: &dyn BungieApi,
    identity: &ResolvedIdentity,
    options: &HarvestOptions,
    character_id: CharacterId,
    sink: &mut S,
    progress: &dyn ProgressReporter,
    total_before: u64,
) -> Result<CharacterSummary, HarvestError> {
    let mut activities: u64 = 0;
    let mut state = PageState::Fetching(PaginationCursor::start(character_id));

    let (cursor, stop) = loop {
        let mut cursor = match state {
            PageState::Exhausted(cursor, stop) => break (cursor, stop),
            PageState::Fetching(cursor) => cursor,
        };

        if options.max_pages.is_some_and(|max| cursor.page >= max) {
            tracing::warn!(
                character_id = %cursor.character_id,
                page = cursor.page,
                "hit max page limit"
            );
            state = PageState::Exhausted(cursor, PageStop::Ceiling);
            continue;
        }

        let entries = match api.activity_page(identity, &cursor, options.page_size).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    character_id = %cursor.character_id,
                    page = cursor.page,
                    error = %e,
                    "activity page unusable; treating as end of history"
                );
                state = PageState::Exhausted(cursor, PageStop::Malformed);
                continue;
            }
        };

        if entries.is_empty() {
            state = PageState::Exhausted(cursor, PageStop::Exhausted);
            continue;
        }

        let fetched = entries.len();
        for entry in entries {
            let record = entry.into_record(&options.pgcr_base_url);
            sink.write(&cursor.character_id, &record)?;
        }
        activities += fetched as u64;

        progress.report(ProgressEvent::Page {
            character_id: cursor.character_id.clone(),
            page: cursor.page,
            fetched,
            total: total_before + activities,
        });

        cursor.advance();
        state = PageState::Fetching(cursor);
    };

    progress.report(ProgressEvent::CharacterDone {
        character_id: cursor.character_id.clone(),
        page: cursor.page,
    });

    Ok(CharacterSummary {
        character_id: cursor.character_id,
        pages: cursor.page,
        activities,
        stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_config() {
        let mut config = Config::default();
        config.harvest.page_size = 100;
        config.harvest.max_pages = Some(7);

        let options = HarvestOptions::from_config(&config);
        assert_eq!(options.page_size, 100);
        assert_eq!(options.max_pages, Some(7));
        assert_eq!(options.pgcr_base_url, "https://www.bungie.net/en/PGCR/");
    }
}
