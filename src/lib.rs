//! # Tab Reader
//!
//! Receives snapshots of open browser tabs from an extension, keeps each
//! one as a timestamped JSON file, and answers questions against the most
//! recent capture.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐ POST /active_tab ┌──────────┐   ┌──────────────────────┐
//! │ Extension │─────────────────▶│  ingest  │──▶│ storage dir          │
//! └───────────┘                  └──────────┘   │  tab_*.json          │
//!                                               │  tabs_*.json         │
//!                 ┌──────────┐   ┌──────────┐   │  latest.json         │
//!                 │ CLI/HTTP │◀──│ retrieve │◀──│                      │
//!                 │  query   │   └──────────┘   └──────────────────────┘
//!                 └──────────┘
//! ```
//!
//! Ingestion and retrieval communicate only through a [`store::TabStore`]:
//! one writer appends artifacts and moves the pointer, readers follow it.
//!
//! ## Quick Start
//!
//! ```bash
//! tabr serve                      # listen for the extension on :5000
//! tabr tabs                       # list the latest captured tabs
//! tabr ask "what is on example.com?"
//! tabr status
//! tabr prune --keep 50            # drop old captures
//! tabr stock IBM --chart ibm.png  # quote + five-day chart
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Tab records, payloads, artifacts, pointer |
//! | [`store`] | Artifact + pointer storage (filesystem, memory) |
//! | [`ingest`] | Payload decoding and persistence |
//! | [`retrieve`] | Loading the latest capture |
//! | [`query`] | Question-to-tab matching and chat history |
//! | [`retention`] | Explicit pruning of old captures |
//! | [`server`] | HTTP server |
//! | [`dashboard`] | Terminal views |
//! | [`stocks`] | Stock quote client |
//! | [`chart`] | PNG line chart rendering |

pub mod chart;
pub mod config;
pub mod dashboard;
pub mod ingest;
pub mod models;
pub mod query;
pub mod retention;
pub mod retrieve;
pub mod server;
pub mod stocks;
pub mod store;
