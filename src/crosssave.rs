//! Cross-save unification.
//!
//! A player who has enabled cross-save has one primary membership; the
//! search may have found one of the secondary ones. When the card's
//! `crossSaveOverride` names another membership type, the linked profiles
//! are fetched and the identity is replaced by the linked membership of
//! that type.
//!
//! Failure here is never fatal: the original identity is kept and a
//! [`CrossSaveWarning`] is returned alongside it.

use std::fmt;

use crate::api::BungieApi;
use crate::models::{MembershipType, ResolvedIdentity};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Why the primary membership could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossSaveWarning {
    /// Linked profiles were fetched but none has the override type.
    NoMatchingProfile { wanted: MembershipType },
    /// The linked profiles call failed or returned an unusable body.
    LinkedProfilesUnavailable(String),
}

impl fmt::Display for CrossSaveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossSaveWarning::NoMatchingProfile { wanted } => write!(
                f,
                "could not resolve cross-save override {}, proceeding with original membership",
                wanted
            ),
            CrossSaveWarning::LinkedProfilesUnavailable(reason) => write!(
                f,
                "LinkedProfiles call failed ({}), proceeding with original membership",
                reason
            ),
        }
    }
}

/// Result of [`unify`]: the identity to harvest plus any warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unification {
    pub identity: ResolvedIdentity,
    pub warning: Option<CrossSaveWarning>,
}

/// Move `identity` to its cross-save primary membership when needed.
///
/// No request is made unless the override is set and differs from the
/// identity's own membership type.
pub async fn unify(
    api: &dyn BungieApi,
    identity: ResolvedIdentity,
    progress: &dyn ProgressReporter,
) -> Unification {
    if !identity.needs_cross_save() {
        return Unification {
            identity,
            warning: None,
        };
    }

    let wanted = identity.cross_save_override;
    let profiles = match api
        .linked_profiles(identity.membership_type, &identity.membership_id)
        .await
    {
        Ok(profiles) => profiles,
        Err(e) => return keep(identity, CrossSaveWarning::LinkedProfilesUnavailable(e.to_string())),
    };

    match profiles.into_iter().find(|p| p.membership_type == wanted) {
        Some(primary) => {
            let unified = ResolvedIdentity {
                membership_id: primary.membership_id,
                membership_type: primary.membership_type,
                cross_save_override: identity.cross_save_override,
            };
            progress.report(ProgressEvent::CrossSaveResolved {
                identity: unified.clone(),
            });
            Unification {
                identity: unified,
                warning: None,
            }
        }
        None => keep(identity, CrossSaveWarning::NoMatchingProfile { wanted }),
    }
}

fn keep(identity: ResolvedIdentity, warning: CrossSaveWarning) -> Unification {
    tracing::warn!(membership_id = %identity.membership_id, "{}", warning);
    Unification {
        identity,
        warning: Some(warning),
    }
}
