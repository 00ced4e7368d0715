//! Registry of attention sources the pipeline knows how to display.
//!
//! Count maps and post lists only ever carry keys from this registry.

use serde::Serialize;

use crate::types::Output;

/// A known attention source and its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMeta {
    pub name: &'static str,
    pub display_name: &'static str,
}

pub const SOURCES: &[SourceMeta] = &[
    SourceMeta { name: "blogs", display_name: "Blog posts" },
    SourceMeta { name: "f1000", display_name: "F1000 reviews" },
    SourceMeta { name: "facebook", display_name: "Facebook pages" },
    SourceMeta { name: "googleplus", display_name: "Google+ posts" },
    SourceMeta { name: "linkedin", display_name: "LinkedIn posts" },
    SourceMeta { name: "news", display_name: "News mentions" },
    SourceMeta { name: "peer_reviews", display_name: "Public peer reviews" },
    SourceMeta { name: "pinterest", display_name: "Pinterest mentions" },
    SourceMeta { name: "q&a", display_name: "Q&A post mentions" },
    SourceMeta { name: "reddit", display_name: "Reddit posts" },
    SourceMeta { name: "twitter", display_name: "Tweets" },
    SourceMeta { name: "video", display_name: "Video mentions" },
    SourceMeta { name: "weibo", display_name: "Weibo posts" },
    SourceMeta { name: "wikipedia", display_name: "Wikipedia articles" },
];

/// Sources whose posts carry a real title rather than a summary.
pub const TITLED_SOURCES: &[&str] = &["blogs", "f1000", "news", "q&a", "reddit", "wikipedia"];

pub fn is_known_source(name: &str) -> bool {
    SOURCES.iter().any(|s| s.name == name)
}

/// Per-source activity for one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source_name: &'static str,
    pub display_name: &'static str,
    pub posts_count: i64,
    pub events_last_week_count: usize,
}

/// Summaries for every known source the output has posts from.
///
/// `now` is passed in so callers (and tests) control what "last week" means.
pub fn source_summaries(
    output: &Output,
    now: chrono::DateTime<chrono::Utc>,
) -> Vec<SourceSummary> {
    let derived = output.derived();
    SOURCES
        .iter()
        .filter_map(|meta| {
            let posts_count = derived.post_counts.get(meta.name).copied().unwrap_or(0);
            if posts_count <= 0 {
                return None;
            }
            let events_last_week_count = derived
                .event_dates
                .get(meta.name)
                .map(|dates| count_within_days(dates, now, 7))
                .unwrap_or(0);
            Some(SourceSummary {
                source_name: meta.name,
                display_name: meta.display_name,
                posts_count,
                events_last_week_count,
            })
        })
        .collect()
}

/// Posts from the last week summed over all sources.
pub fn events_last_week_count(output: &Output, now: chrono::DateTime<chrono::Utc>) -> usize {
    source_summaries(output, now)
        .iter()
        .map(|s| s.events_last_week_count)
        .sum()
}

fn count_within_days(dates: &[String], now: chrono::DateTime<chrono::Utc>, days: i64) -> usize {
    dates
        .iter()
        .filter_map(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
        .filter(|d| (now - d.with_timezone(&chrono::Utc)).num_days() <= days)
        .count()
}
