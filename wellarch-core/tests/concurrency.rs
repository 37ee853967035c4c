//! Concurrency tests for the shared provider gate
//!
//! All five pillars share one RateLimitedCaller, so its limit applies to the
//! whole run rather than to each pillar.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ReviewProvider, SECTIONED_CORPUS, fast_config, orchestrator, review_json};
use wellarch_core::{AssessmentStatus, NoProgress};

#[tokio::test]
async fn default_limit_is_never_exceeded() {
    let provider = Arc::new(
        ReviewProvider::new(review_json(10, true, &[])).with_delay(Duration::from_millis(40)),
    );
    let config = fast_config();
    let limit = config.limits.max_concurrent;
    assert_eq!(limit, 6);

    let assessment = orchestrator(provider.clone(), config)
        .run(SECTIONED_CORPUS, &NoProgress)
        .await;

    assert_eq!(assessment.status, AssessmentStatus::Completed);
    assert!(provider.max_in_flight() <= limit);
    assert_eq!(provider.calls(), 5);
}

#[tokio::test]
async fn tight_limit_applies_across_all_pillars() {
    let provider = Arc::new(
        ReviewProvider::new(review_json(10, true, &[])).with_delay(Duration::from_millis(40)),
    );
    let mut config = fast_config();
    config.limits.max_concurrent = 2;

    let assessment = orchestrator(provider.clone(), config)
        .run(SECTIONED_CORPUS, &NoProgress)
        .await;

    assert_eq!(assessment.status, AssessmentStatus::Completed);
    assert_eq!(provider.max_in_flight(), 2);
    assert_eq!(provider.calls(), 5);
}

#[tokio::test]
async fn pillars_overlap_when_the_limit_allows() {
    let provider = Arc::new(
        ReviewProvider::new(review_json(10, true, &[])).with_delay(Duration::from_millis(40)),
    );
    orchestrator(provider.clone(), fast_config())
        .run(SECTIONED_CORPUS, &NoProgress)
        .await;

    // five pillars fan out concurrently rather than one after another
    assert!(provider.max_in_flight() > 1);
}

#[tokio::test]
async fn serial_limit_still_completes_every_pillar() {
    let provider = Arc::new(
        ReviewProvider::new(review_json(10, true, &[])).with_delay(Duration::from_millis(5)),
    );
    let mut config = fast_config();
    config.limits.max_concurrent = 1;

    let assessment = orchestrator(provider.clone(), config)
        .run(SECTIONED_CORPUS, &NoProgress)
        .await;

    assert_eq!(provider.max_in_flight(), 1);
    assert!(assessment.pillars.iter().all(|p| !p.fallback_used));
}
