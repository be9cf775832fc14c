//! Lenient drafts of model output and the contracts that validate them.
//!
//! Drafts accept whatever shape the model is likely to return (missing
//! fields, numbers as strings, `null` arrays). Their [`Contract`] impls turn
//! them into domain types or report every violation found.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::contract::{Checker, Contract, Validated};
use crate::types::{
    BarChartRow, COMPETITOR_COUNT, ChartDataset, Competitor, CompetitorSet, GapMatrixRow,
    QueryKind, Review, Storefront, SupportStatus, UnmetNeed,
};

/// Reviews kept per storefront.
pub const REVIEWS_PER_STORE: usize = 3;

// ---------------------------------------------------------------------------
// Competitors
// ---------------------------------------------------------------------------

/// A competitor as proposed by the model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitorDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub app_store_url: Option<String>,
    #[serde(default)]
    pub google_play_url: Option<String>,
}

impl Contract for CompetitorDraft {
    type Valid = Competitor;
    const NAME: &'static str = "Competitor";

    fn check(self, path: &str, checker: &mut Checker) -> Option<Competitor> {
        let name = checker.non_empty(&format!("{path}.name"), self.name.as_deref())?;
        Some(Competitor {
            name,
            app_store_url: listing_url(self.app_store_url.as_deref(), Storefront::AppStore),
            google_play_url: listing_url(self.google_play_url.as_deref(), Storefront::GooglePlay),
        })
    }
}

/// Accept a storefront URL only when it is a well-formed http(s) URL on the
/// store's domain.
///
/// Anything else is repaired to `None`; a bad link is never fatal.
pub fn listing_url(raw: Option<&str>, store: Storefront) -> Option<Url> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let mut checker = Checker::default();
    let parsed = checker.url(store.label(), raw);
    match checker.finish(parsed) {
        Validated::Valid(url) if store.owns(&url) => Some(url),
        Validated::Valid(url) => {
            debug!(store = store.label(), %url, "dropping off-domain listing URL");
            None
        }
        Validated::Invalid(violations) => {
            let reason = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            debug!(store = store.label(), raw, %reason, "dropping malformed listing URL");
            None
        }
    }
}

/// Model output for competitor discovery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitorDiscoveryDraft {
    #[serde(default)]
    pub query_kind: Option<String>,
    #[serde(default)]
    pub competitors: Option<Vec<CompetitorDraft>>,
}

/// Validated discovery output. The count is deliberately unchecked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCompetitors {
    pub kind: Option<QueryKind>,
    pub competitors: Vec<Competitor>,
}

impl Contract for CompetitorDiscoveryDraft {
    type Valid = DiscoveredCompetitors;
    const NAME: &'static str = "CompetitorDiscovery";

    fn check(self, path: &str, checker: &mut Checker) -> Option<DiscoveredCompetitors> {
        let Some(drafts) = self.competitors else {
            checker.push(format!("{path}.competitors"), "is required");
            return None;
        };
        let competitors = drafts
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| c.check(&format!("{path}.competitors[{i}]"), checker))
            .collect();
        Some(DiscoveredCompetitors {
            kind: self.query_kind.as_deref().and_then(QueryKind::from_label),
            competitors,
        })
    }
}

impl Contract for Vec<Competitor> {
    type Valid = CompetitorSet;
    const NAME: &'static str = "CompetitorSet";

    fn check(self, path: &str, checker: &mut Checker) -> Option<CompetitorSet> {
        if !checker.exactly(path, &self, COMPETITOR_COUNT) {
            return None;
        }
        <[Competitor; COMPETITOR_COUNT]>::try_from(self)
            .ok()
            .map(CompetitorSet::from)
    }
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewDraft {
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Contract for ReviewDraft {
    type Valid = Review;
    const NAME: &'static str = "Review";

    fn check(self, path: &str, checker: &mut Checker) -> Option<Review> {
        let rating = checker.int_in_range(&format!("{path}.rating"), self.rating.as_ref(), 1, 5);
        let text = checker.non_empty(&format!("{path}.text"), self.text.as_deref());
        Some(Review {
            rating: u8::try_from(rating?).ok()?,
            text: text?,
        })
    }
}

/// The review list for one storefront the competitor is listed on.
///
/// Must hold at least one review; surplus beyond three is dropped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PlatformReviewsDraft(pub Vec<ReviewDraft>);

impl Contract for PlatformReviewsDraft {
    type Valid = Vec<Review>;
    const NAME: &'static str = "ReviewList";

    fn check(self, path: &str, checker: &mut Checker) -> Option<Vec<Review>> {
        if self.0.is_empty() {
            checker.push(path, "listed storefront has no reviews");
            return None;
        }
        // Items are judged on their own; a bad review is dropped, not fatal.
        let reviews: Vec<Review> = self
            .0
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| {
                let item = r.validate();
                if let Validated::Invalid(violations) = &item {
                    debug!(path, index = i, violations = violations.len(), "dropping invalid review");
                }
                item.ok()
            })
            .take(REVIEWS_PER_STORE)
            .collect();
        if reviews.is_empty() {
            checker.push(path, "listed storefront has no valid reviews");
            return None;
        }
        Some(reviews)
    }
}

/// Model output for review synthesis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewsDraft {
    #[serde(default)]
    pub app_store_reviews: Option<Vec<ReviewDraft>>,
    #[serde(default)]
    pub google_play_reviews: Option<Vec<ReviewDraft>>,
}

impl ReviewsDraft {
    /// Take the draft list for one storefront.
    pub fn take(&mut self, store: Storefront) -> PlatformReviewsDraft {
        let list = match store {
            Storefront::AppStore => self.app_store_reviews.take(),
            Storefront::GooglePlay => self.google_play_reviews.take(),
        };
        PlatformReviewsDraft(list.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Chart data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BarRowDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub review_count: Option<Value>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub market_share: Option<Value>,
}

impl Contract for BarRowDraft {
    type Valid = BarChartRow;
    const NAME: &'static str = "BarChartRow";

    fn check(self, path: &str, checker: &mut Checker) -> Option<BarChartRow> {
        let name = checker.non_empty(&format!("{path}.name"), self.name.as_deref());
        let review_count = checker.optional_count(&format!("{path}.review_count"), self.review_count.as_ref());
        let rating =
            checker.optional_number_in_range(&format!("{path}.rating"), self.rating.as_ref(), 0.0, 5.0);
        let market_share = checker.optional_number_in_range(
            &format!("{path}.market_share"),
            self.market_share.as_ref(),
            0.0,
            100.0,
        );
        Some(BarChartRow {
            name: name?,
            review_count,
            rating,
            market_share,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GapRowDraft {
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub unmet_need: Option<String>,
    #[serde(default)]
    pub competitor_status: Option<BTreeMap<String, Value>>,
}

impl Contract for GapRowDraft {
    type Valid = GapMatrixRow;
    const NAME: &'static str = "GapMatrixRow";

    fn check(self, path: &str, checker: &mut Checker) -> Option<GapMatrixRow> {
        let feature = checker.non_empty(&format!("{path}.feature"), self.feature.as_deref());

        let unmet_need = self
            .unmet_need
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| {
                checker.one_of::<UnmetNeed>(&format!("{path}.unmet_need"), s, &["High", "Medium", "Low"])
            });

        let mut competitor_status = BTreeMap::new();
        for (competitor, status) in self.competitor_status.unwrap_or_default() {
            let status_path = format!("{path}.competitor_status.{competitor}");
            let Some(raw) = status.as_str() else {
                checker.push(status_path, format!("expected Yes|No|Unknown, got {status}"));
                continue;
            };
            if let Some(parsed) =
                checker.one_of::<SupportStatus>(&status_path, raw, &["Yes", "No", "Unknown"])
            {
                competitor_status.insert(competitor, parsed);
            }
        }

        Some(GapMatrixRow {
            feature: feature?,
            unmet_need,
            competitor_status,
        })
    }
}

/// Model output for chart-data synthesis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartDraft {
    #[serde(default)]
    pub bar_chart_data: Option<Vec<BarRowDraft>>,
    #[serde(default)]
    pub gap_matrix_data: Option<Vec<GapRowDraft>>,
    #[serde(default)]
    pub suggested_bar_chart_metric: Option<String>,
}

impl Contract for ChartDraft {
    type Valid = ChartDataset;
    const NAME: &'static str = "ChartDataset";

    fn check(self, path: &str, checker: &mut Checker) -> Option<ChartDataset> {
        let Some(bars) = self.bar_chart_data else {
            checker.push(format!("{path}.bar_chart_data"), "is required");
            return None;
        };
        let Some(gaps) = self.gap_matrix_data else {
            checker.push(format!("{path}.gap_matrix_data"), "is required");
            return None;
        };

        let bar_chart = bars
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| r.check(&format!("{path}.bar_chart_data[{i}]"), checker))
            .collect();
        let gap_matrix = gaps
            .into_iter()
            .enumerate()
            .filter_map(|(i, r)| r.check(&format!("{path}.gap_matrix_data[{i}]"), checker))
            .collect();

        Some(ChartDataset {
            bar_chart,
            gap_matrix,
            suggested_metric: self
                .suggested_bar_chart_metric
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{validate, validate_json};
    use serde_json::json;

    #[test]
    fn competitor_drops_off_domain_urls() {
        let draft = CompetitorDraft {
            name: Some("Spotify".into()),
            app_store_url: Some("https://apps.apple.com/us/app/spotify/id324684580".into()),
            google_play_url: Some("https://example.com/spotify".into()),
        };
        let Validated::Valid(c) = validate(draft) else {
            panic!("expected valid competitor");
        };
        assert!(c.app_store_url.is_some());
        assert!(c.google_play_url.is_none());
    }

    #[test]
    fn listing_url_requires_http_on_store_domain() {
        let play = "https://play.google.com/store/apps/details?id=com.spotify.music";
        assert_eq!(
            listing_url(Some(play), Storefront::GooglePlay).map(|u| u.to_string()),
            Some(play.to_string())
        );
        assert!(listing_url(Some("  "), Storefront::GooglePlay).is_none());
        assert!(listing_url(Some("ftp://play.google.com/store"), Storefront::GooglePlay).is_none());
        assert!(listing_url(Some("play.google.com/store"), Storefront::GooglePlay).is_none());
        assert!(listing_url(Some(play), Storefront::AppStore).is_none());
    }

    #[test]
    fn competitor_requires_name() {
        let draft = CompetitorDraft {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(!validate(draft).is_valid());
    }

    #[test]
    fn discovery_keeps_count_and_kind() {
        let value = json!({
            "query_kind": "app",
            "competitors": [{"name": "Spotify"}, {"name": "Tidal", "google_play_url": "not a url"}]
        });
        let Validated::Valid(found) = validate_json::<CompetitorDiscoveryDraft>(value) else {
            panic!("expected valid discovery");
        };
        assert_eq!(found.kind, Some(QueryKind::StorefrontApp));
        assert_eq!(found.competitors.len(), 2);
        assert!(found.competitors[1].google_play_url.is_none());
    }

    #[test]
    fn discovery_rejects_missing_list_and_wrong_shape() {
        assert!(!validate_json::<CompetitorDiscoveryDraft>(json!({})).is_valid());
        assert!(!validate_json::<CompetitorDiscoveryDraft>(json!({"competitors": "x"})).is_valid());
    }

    #[test]
    fn competitor_set_needs_exactly_three() {
        let two = vec![Competitor::named("A"), Competitor::named("B")];
        assert!(!validate(two).is_valid());

        let three = vec![
            Competitor::named("A"),
            Competitor::named("B"),
            Competitor::named("C"),
        ];
        let set = validate(three).ok().expect("valid set");
        assert_eq!(set.names(), vec!["A", "B", "C"]);
    }

    #[test]
    fn platform_reviews_truncate_and_validate() {
        let value = json!([
            {"rating": 5, "text": "Love it"},
            {"rating": "4", "text": "Solid"},
            {"rating": 3, "text": "Fine"},
            {"rating": 9, "text": "ignored, past the third"}
        ]);
        let draft: PlatformReviewsDraft = serde_json::from_value(value).expect("draft");
        let reviews = validate(draft).ok().expect("valid reviews");
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[1].rating, 4);
    }

    #[test]
    fn platform_reviews_drop_bad_items() {
        let value = json!([
            {"rating": 0, "text": "out of range"},
            {"rating": 4, "text": "   "},
            {"rating": 2, "text": "Crashes on login"}
        ]);
        let draft: PlatformReviewsDraft = serde_json::from_value(value).expect("draft");
        let reviews = validate(draft).ok().expect("one valid review survives");
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].text, "Crashes on login");
    }

    #[test]
    fn platform_reviews_reject_all_bad_and_empty_lists() {
        let bad = PlatformReviewsDraft(vec![ReviewDraft {
            rating: Some(json!(0)),
            text: Some("x".into()),
        }]);
        assert!(!validate(bad).is_valid());
        assert!(!validate(PlatformReviewsDraft(Vec::new())).is_valid());
    }

    #[test]
    fn reviews_draft_take_defaults_to_empty() {
        let mut draft: ReviewsDraft =
            serde_json::from_value(json!({"app_store_reviews": [{"rating": 4, "text": "ok"}]}))
                .expect("draft");
        assert_eq!(draft.take(Storefront::AppStore).0.len(), 1);
        assert!(draft.take(Storefront::GooglePlay).0.is_empty());
    }

    #[test]
    fn chart_contract_accepts_well_formed_data() {
        let value = json!({
            "bar_chart_data": [
                {"name": "Spotify", "review_count": 6, "rating": 4.3, "market_share": 31},
                {"name": "Tidal", "rating": null}
            ],
            "gap_matrix_data": [
                {"feature": "Offline mode", "unmet_need": "high",
                 "competitor_status": {"Spotify": "Yes", "Tidal": "unknown"}}
            ],
            "suggested_bar_chart_metric": "rating"
        });
        let chart = validate_json::<ChartDraft>(value).ok().expect("valid chart");
        assert_eq!(chart.bar_chart.len(), 2);
        assert_eq!(chart.bar_chart[0].review_count, Some(6));
        assert_eq!(chart.gap_matrix[0].unmet_need, Some(UnmetNeed::High));
        assert_eq!(
            chart.gap_matrix[0].competitor_status.get("Tidal"),
            Some(&SupportStatus::Unknown)
        );
        assert_eq!(chart.suggested_metric.as_deref(), Some("rating"));
    }

    #[test]
    fn chart_contract_rejects_out_of_range_and_unknown_status() {
        let value = json!({
            "bar_chart_data": [{"name": "A", "rating": 7}],
            "gap_matrix_data": [{"feature": "F", "competitor_status": {"A": "Partially"}}]
        });
        let Validated::Invalid(violations) = validate_json::<ChartDraft>(value) else {
            panic!("expected invalid chart");
        };
        assert_eq!(violations.len(), 2);
        assert!(violations[0].path.ends_with("rating"));
    }

    #[test]
    fn chart_contract_requires_both_arrays() {
        let value = json!({"bar_chart_data": []});
        assert!(!validate_json::<ChartDraft>(value).is_valid());
    }
}
