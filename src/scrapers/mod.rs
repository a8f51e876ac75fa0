//! News sources the ingestion loop can page through.
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | GNews | [`gnews`] | Search API | Requires API key; page-numbered results |

pub mod gnews;
