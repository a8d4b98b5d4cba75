mod helpers;

use helpers::{dual_service, primary_service};
use serde_json::json;

#[test]
fn round_trip_with_routing_and_metadata() {
    let fixture = dual_service();

    let outcome = fixture
        .service
        .remember(
            "The deployment process requires running migrations before starting the app server",
            None,
            Some(&json!({"importance": 0.8})),
        )
        .unwrap();
    assert_eq!(outcome.layer, "procedural");
    assert!(outcome.id > 0);
    assert!(outcome.dual_write, "cache root exists, write should mirror");

    let results = fixture
        .service
        .recall("deployment process", None, None, false)
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].record.id, outcome.id);
    assert_eq!(results[0].layer, "procedural");
    assert!((results[0].record.importance - 0.8).abs() < 1e-9);
}

#[test]
fn auto_routing_matches_content_kind() {
    let fixture = primary_service();

    let episodic = fixture
        .service
        .remember("Today we had a great session working on the project", None, None)
        .unwrap();
    assert_eq!(episodic.layer, "episodic");

    let procedural = fixture
        .service
        .remember("How to deploy the MCP server: step 1 install dependencies", None, None)
        .unwrap();
    assert_eq!(procedural.layer, "procedural");

    let meta = fixture
        .service
        .remember(
            "I realized that the pattern here is about integration not separation",
            None,
            None,
        )
        .unwrap();
    assert_eq!(meta.layer, "meta");
}

#[test]
fn explicit_layer_and_aliases_skip_routing() {
    let fixture = primary_service();

    // Content that would route elsewhere, pinned by alias.
    for (alias, expected) in [
        ("core", "identity"),
        ("facts", "semantic"),
        ("howto", "procedural"),
        ("insights", "meta"),
        ("events", "episodic"),
        ("wip", "working"),
    ] {
        let outcome = fixture
            .service
            .remember("How to deploy: step 1 install the server", Some(alias), None)
            .unwrap();
        assert_eq!(outcome.layer, expected, "alias {alias}");
    }
}

#[test]
fn invalid_layer_is_rejected() {
    let fixture = primary_service();
    let err = fixture
        .service
        .remember("anything", Some("limbic"), None)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_LAYER");
}

#[test]
fn empty_content_is_rejected() {
    let fixture = primary_service();
    let err = fixture.service.remember("   ", None, None).unwrap_err();
    assert_eq!(err.code(), "INVALID_CONTENT");
}

#[test]
fn unknown_metadata_keys_survive_under_custom() {
    let fixture = primary_service();

    let outcome = fixture
        .service
        .save_to_layer(
            "semantic",
            "Rust uses ownership for memory safety",
            Some(&json!({"importance": 0.6, "project": "atlas", "tags": ["rust"]})),
        )
        .unwrap();

    let results = fixture
        .service
        .query_layer("semantic", Some(&json!({"id": outcome.id})), None, None, false)
        .unwrap();
    assert_eq!(results.len(), 1);
    let metadata = results[0].record.metadata.as_ref().unwrap();
    assert_eq!(metadata["custom"]["project"], "atlas");
    assert_eq!(metadata["tags"][0], "rust");
}

#[test]
fn recall_ranks_by_importance_then_recency() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer("semantic", "ranked entry low", Some(&json!({"importance": 0.3})))
        .unwrap();
    let high = fixture
        .service
        .save_to_layer("semantic", "ranked entry high", Some(&json!({"importance": 0.85})))
        .unwrap();

    let results = fixture
        .service
        .recall("ranked entry", None, None, false)
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record.id, high.id);
}

#[test]
fn recall_scoped_to_one_layer() {
    let fixture = primary_service();

    fixture
        .service
        .save_to_layer("semantic", "scoped topic fact", None)
        .unwrap();
    fixture
        .service
        .save_to_layer("working", "scoped topic task", None)
        .unwrap();

    let results = fixture
        .service
        .recall("scoped topic", Some("working"), None, false)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].layer, "working");
}
