//! Review synthesis, one inference call per listed competitor.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use marketscope_shared::drafts::ReviewsDraft;
use marketscope_shared::{
    Competitor, CompetitorSet, Contract, ReviewBundle, StepStatus, Storefront, Validated,
};

use crate::capabilities::Capabilities;
use crate::prompts;
use crate::steps::StepOutcome;

/// Synthesize reviews for one competitor.
///
/// `None` with a skipped status when the competitor has no storefront listing.
#[instrument(skip_all, fields(competitor = %competitor.name))]
pub async fn synthesize_reviews(
    caps: &Capabilities,
    competitor: &Competitor,
) -> StepOutcome<Option<ReviewBundle>> {
    let platforms = competitor.listed_on();
    if platforms.is_empty() {
        debug!("no storefront listing, skipping");
        return StepOutcome::skipped(None, format!("{} has no storefront listing", competitor.name));
    }

    let raw = match caps
        .inference
        .generate_structured(
            &prompts::review_request(&competitor.name, &platforms),
            &prompts::review_contract(),
        )
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            return StepOutcome::failed(None, format!("reviews for {} failed: {e}", competitor.name));
        }
    };

    let mut draft: ReviewsDraft = match serde_json::from_value(raw) {
        Ok(draft) => draft,
        Err(e) => {
            return StepOutcome::failed(
                None,
                format!("reviews for {} have the wrong shape: {e}", competitor.name),
            );
        }
    };

    let mut bundle = ReviewBundle {
        competitor_name: competitor.name.clone(),
        app_store: Vec::new(),
        google_play: Vec::new(),
    };
    for store in Storefront::ALL {
        let list = draft.take(store);
        if !platforms.contains(&store) {
            continue;
        }
        let reviews = match list.validate() {
            Validated::Valid(reviews) => reviews,
            Validated::Invalid(violations) => {
                let detail: Vec<String> = violations.iter().map(ToString::to_string).collect();
                return StepOutcome::failed(
                    None,
                    format!(
                        "{} reviews for {} violate the contract: {}",
                        store.label(),
                        competitor.name,
                        detail.join("; ")
                    ),
                );
            }
        };
        match store {
            Storefront::AppStore => bundle.app_store = reviews,
            Storefront::GooglePlay => bundle.google_play = reviews,
        }
    }

    debug!(reviews = bundle.review_count(), "reviews synthesized");
    StepOutcome::succeeded(Some(bundle))
}

/// Run [`synthesize_reviews`] for every competitor concurrently.
///
/// Bundles keep competitor order. Skipped and failed competitors contribute
/// nothing.
#[instrument(skip_all)]
pub async fn synthesize_all(
    caps: &Capabilities,
    competitors: &CompetitorSet,
    semaphore: Arc<Semaphore>,
) -> StepOutcome<Vec<ReviewBundle>> {
    let mut handles = Vec::new();
    for competitor in competitors.iter().cloned() {
        let caps = caps.clone();
        let sem = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await;
            synthesize_reviews(&caps, &competitor).await
        }));
    }

    let mut bundles = Vec::new();
    let mut diagnostics = Vec::new();
    let mut attempted = 0;
    for (competitor, result) in competitors.iter().zip(futures::future::join_all(handles).await) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => StepOutcome::failed(None, format!("reviews for {} panicked: {e}", competitor.name)),
        };
        if matches!(outcome.status, StepStatus::Skipped { .. }) {
            continue;
        }
        attempted += 1;
        if let Some(bundle) = outcome.value {
            bundles.push(bundle);
        } else {
            warn!(competitor = %competitor.name, "review synthesis failed");
        }
        diagnostics.extend(outcome.diagnostics);
    }

    info!(attempted, bundles = bundles.len(), "review fan-out complete");

    if attempted == 0 {
        return StepOutcome::skipped(bundles, "no competitor has a storefront listing");
    }
    if bundles.is_empty() {
        return StepOutcome {
            value: bundles,
            status: StepStatus::Failed {
                reason: format!("all {attempted} review syntheses failed"),
            },
            diagnostics,
        };
    }
    StepOutcome::from_diagnostics(bundles, diagnostics)
}
