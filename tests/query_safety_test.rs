mod helpers;

use helpers::primary_service;
use serde_json::json;

#[test]
fn like_metacharacters_match_literally() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer("episodic", "the build hit 100% coverage", None)
        .unwrap();
    // Would match "100<anything>%"-style patterns if % were not escaped.
    fixture
        .service
        .save_to_layer("episodic", "the build hit 100 then stalled at 3%", None)
        .unwrap();

    let results = fixture
        .service
        .query_layer(
            "episodic",
            Some(&json!({"content_contains": "100%"})),
            None,
            None,
            false,
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].record.content.contains("100% coverage"));
}

#[test]
fn underscore_is_not_a_wildcard() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer("semantic", "set retry_count before the rollout", None)
        .unwrap();
    fixture
        .service
        .save_to_layer("semantic", "set retryXcount is a typo", None)
        .unwrap();

    let results = fixture
        .service
        .query_layer(
            "semantic",
            Some(&json!({"content_contains": "retry_count"})),
            None,
            None,
            false,
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].record.content.contains("retry_count"));
}

#[test]
fn sql_injection_in_filters_is_inert() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer("working", "harmless note", None)
        .unwrap();

    let results = fixture
        .service
        .query_layer(
            "working",
            Some(&json!({"content_contains": "'; DROP TABLE memories; --"})),
            None,
            None,
            false,
        )
        .unwrap();
    assert!(results.is_empty());

    // The table is still there and queryable.
    let remaining = fixture
        .service
        .query_layer("working", None, None, None, false)
        .unwrap();
    assert_eq!(remaining.len(), 1);
}

#[test]
fn order_by_outside_whitelist_falls_back_to_recency() {
    let fixture = primary_service();

    let first = fixture
        .service
        .save_to_layer("semantic", "older entry", Some(&json!({"importance": 0.9, "timestamp": 1_700_000_000.0})))
        .unwrap();
    let second = fixture
        .service
        .save_to_layer("semantic", "newer entry", Some(&json!({"importance": 0.2, "timestamp": 1_700_086_400.0})))
        .unwrap();

    for bogus in ["metadata desc", "importance sideways", "id; DROP TABLE memories"] {
        let results = fixture
            .service
            .query_layer("semantic", None, Some(bogus), None, false)
            .unwrap();
        assert_eq!(results.len(), 2, "order_by {bogus:?}");
        // timestamp DESC: the newer entry first regardless of importance.
        assert_eq!(results[0].record.id, second.id);
        assert_eq!(results[1].record.id, first.id);
    }
}

#[test]
fn whitelisted_order_by_is_honored() {
    let fixture = primary_service();

    let low = fixture
        .service
        .save_to_layer("semantic", "low importance", Some(&json!({"importance": 0.2})))
        .unwrap();
    let high = fixture
        .service
        .save_to_layer("semantic", "high importance", Some(&json!({"importance": 0.9})))
        .unwrap();

    let ascending = fixture
        .service
        .query_layer("semantic", None, Some("importance asc"), None, false)
        .unwrap();
    assert_eq!(ascending[0].record.id, low.id);

    let descending = fixture
        .service
        .query_layer("semantic", None, Some("importance desc"), None, false)
        .unwrap();
    assert_eq!(descending[0].record.id, high.id);
}

#[test]
fn cross_filter_violation_is_a_validation_error() {
    let fixture = primary_service();
    let err = fixture
        .service
        .query_layer(
            "semantic",
            Some(&json!({"importance_min": 0.8, "importance_max": 0.2})),
            None,
            None,
            false,
        )
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn context_is_searched_alongside_content() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer(
            "episodic",
            "we shipped the release",
            Some(&json!({"context": "during the quarterly planning call"})),
        )
        .unwrap();

    let by_context = fixture
        .service
        .recall("quarterly planning", Some("episodic"), None, false)
        .unwrap();
    assert_eq!(by_context.len(), 1);

    let filtered = fixture
        .service
        .query_layer(
            "episodic",
            Some(&json!({"context_contains": "quarterly"})),
            None,
            None,
            false,
        )
        .unwrap();
    assert_eq!(filtered.len(), 1);
}
