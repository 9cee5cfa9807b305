//! Candidate filtering and selection.
//!
//! Candidates are narrowed by start date, URL keywords and the processed
//! log, then the oldest survivor is picked so a source is worked through
//! chronologically.

use crate::config::CampaignConfig;
use crate::models::SourceCandidate;

/// Eligible candidates, oldest first.
///
/// The sort is stable: candidates with equal timestamps keep source order.
/// `is_processed` receives `(campaign_id, link)`.
pub fn eligible<F>(
    candidates: &[SourceCandidate],
    campaign: &CampaignConfig,
    mut is_processed: F,
) -> Vec<SourceCandidate>
where
    F: FnMut(&str, &str) -> bool,
{
    let start = campaign.filters.start_date;
    let keywords = &campaign.filters.url_keywords;

    let mut kept: Vec<SourceCandidate> = candidates
        .iter()
        .filter(|c| !c.link.trim().is_empty())
        .filter(|c| match (start, c.published_at) {
            (Some(start), Some(published)) => published >= start,
            _ => true,
        })
        .filter(|c| {
            if keywords.is_empty() {
                return true;
            }
            let link = c.link.to_lowercase();
            keywords.iter().any(|k| link.contains(k.as_str()))
        })
        .filter(|c| !is_processed(&campaign.id, &c.link))
        .cloned()
        .collect();

    kept.sort_by_key(SourceCandidate::timestamp);
    kept
}

/// The oldest eligible candidate, or `None` when nothing is left.
pub fn select<F>(
    candidates: &[SourceCandidate],
    campaign: &CampaignConfig,
    is_processed: F,
) -> Option<SourceCandidate>
where
    F: FnMut(&str, &str) -> bool,
{
    eligible(candidates, campaign, is_processed).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceType;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn at(day: u32) -> Option<chrono::DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap())
    }

    fn campaign() -> CampaignConfig {
        CampaignConfig::new("c1", "https://site.test/feed", SourceType::Rss)
    }

    #[test]
    fn test_selects_oldest() {
        let candidates = vec![
            SourceCandidate::new("https://site.test/new", at(3)),
            SourceCandidate::new("https://site.test/old", at(1)),
            SourceCandidate::new("https://site.test/mid", at(2)),
        ];
        let picked = select(&candidates, &campaign(), |_, _| false).unwrap();
        assert_eq!(picked.link, "https://site.test/old");
    }

    #[test]
    fn test_unknown_dates_sort_first_and_ties_keep_order() {
        let candidates = vec![
            SourceCandidate::new("https://site.test/dated", at(1)),
            SourceCandidate::new("https://site.test/undated-a", None),
            SourceCandidate::new("https://site.test/undated-b", None),
        ];
        let order: Vec<String> = eligible(&candidates, &campaign(), |_, _| false)
            .into_iter()
            .map(|c| c.link)
            .collect();
        assert_eq!(
            order,
            vec![
                "https://site.test/undated-a",
                "https://site.test/undated-b",
                "https://site.test/dated"
            ]
        );
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let candidates = vec![
            SourceCandidate::new("https://site.test/a", at(1)),
            SourceCandidate::new("https://site.test/b", at(2)),
        ];
        let mut processed: HashSet<String> = HashSet::new();
        let c = campaign();

        let first = select(&candidates, &c, |_, l| processed.contains(l)).unwrap();
        assert_eq!(first.link, "https://site.test/a");
        processed.insert(first.link.clone());

        let second = select(&candidates, &c, |_, l| processed.contains(l)).unwrap();
        assert_eq!(second.link, "https://site.test/b");
        processed.insert(second.link.clone());

        assert!(select(&candidates, &c, |_, l| processed.contains(l)).is_none());
        assert!(select(&candidates, &c, |_, l| processed.contains(l)).is_none());
    }

    #[test]
    fn test_start_date_and_empty_links() {
        let mut c = campaign();
        c.filters.start_date = at(2);
        let candidates = vec![
            SourceCandidate::new("", at(5)),
            SourceCandidate::new("https://site.test/too-old", at(1)),
            SourceCandidate::new("https://site.test/undated", None),
            SourceCandidate::new("https://site.test/ok", at(3)),
        ];
        let links: Vec<String> = eligible(&candidates, &c, |_, _| false)
            .into_iter()
            .map(|c| c.link)
            .collect();
        assert_eq!(links, vec!["https://site.test/undated", "https://site.test/ok"]);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let mut c = campaign();
        c.filters.url_keywords = vec!["rust".to_string()];
        let candidates = vec![
            SourceCandidate::new("https://site.test/Learning-RUST", at(2)),
            SourceCandidate::new("https://site.test/cooking", at(1)),
        ];
        let picked = select(&candidates, &c, |_, _| false).unwrap();
        assert_eq!(picked.link, "https://site.test/Learning-RUST");

        c.filters.url_keywords = vec!["golang".to_string()];
        assert!(select(&candidates, &c, |_, _| false).is_none());
    }

    #[test]
    fn test_is_processed_receives_campaign_id() {
        let candidates = vec![SourceCandidate::new("https://site.test/a", at(1))];
        let picked = select(&candidates, &campaign(), |campaign_id, _| campaign_id == "c1");
        assert!(picked.is_none());
    }
}
