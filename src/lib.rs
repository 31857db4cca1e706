//! # d2-history
//!
//! Export a Destiny 2 player's complete activity history to CSV.
//!
//! Given a Bungie name (`name#code`), the pipeline finds the player's
//! membership, follows cross-save to the primary account, and then pages
//! through the activity history of every character on it, writing one row
//! per activity.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │ resolve  │──▶│crosssave │──▶│ harvest  │──▶│  export  │
//! │ platform │   │ linked   │   │ per-char │   │   CSV    │
//! │  probes  │   │ profiles │   │  pages   │   │  sink    │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘
//!       │              │              │
//!       └──────────────┴──────┬───────┘
//!                             ▼
//!                     BungieApi (client)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export BUNGIE_API_KEY=...
//! d2h export "Guardian#1234"            # writes activities.csv
//! d2h resolve "Guardian#1234"           # print the primary membership
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and API key lookup |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`api`] | Remote boundary trait and response parsing |
//! | [`client`] | HTTP client for Bungie.net |
//! | [`resolve`] | Platform probing for a Bungie name |
//! | [`crosssave`] | Cross-save primary membership lookup |
//! | [`harvest`] | Character discovery and history pagination |
//! | [`export`] | CSV and in-memory sinks |
//! | [`pipeline`] | End-to-end composition |
//! | [`progress`] | Progress reporting on stderr |

pub mod api;
pub mod client;
pub mod config;
pub mod crosssave;
pub mod error;
pub mod export;
pub mod harvest;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod resolve;
