//! Scans driven through the Dispatcharr API client against a mock server

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;

use event_channel_manager::config::{DispatcharrConfig, ScanConfig};
use event_channel_manager::errors::{AppError, SourceError};
use event_channel_manager::models::{DecisionSource, ScanAction, ScanMode};
use event_channel_manager::rules::RuleTag;
use event_channel_manager::services::ScanOrchestrator;
use event_channel_manager::sources::DispatcharrClient;

fn client(server: &MockServer) -> Arc<DispatcharrClient> {
    let config = DispatcharrConfig {
        url: server.base_url(),
        username: "admin".to_string(),
        password: "secret".to_string(),
        ..DispatcharrConfig::default()
    };
    Arc::new(DispatcharrClient::new(&config).unwrap())
}

fn scan_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 5, 18, 0, 0).unwrap()
}

async fn mock_login(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/accounts/token/");
            then.status(200).json_body(json!({ "access": "tok" }));
        })
        .await;
}

async fn mock_list(server: &MockServer, path: &'static str, body: serde_json::Value) {
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path(path)
                .header("Authorization", "Bearer tok");
            then.status(200).json_body(body);
        })
        .await;
}

#[tokio::test]
async fn apply_sends_one_bulk_update_per_profile() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    mock_list(
        &server,
        "/api/channels/profiles/",
        json!([
            { "id": 1, "name": "Events", "channels": [1, 2] },
            { "id": 2, "name": "Events Backup", "channels": [] }
        ]),
    )
    .await;
    mock_list(&server, "/api/channels/groups/", json!([])).await;
    mock_list(
        &server,
        "/api/channels/channels/",
        json!([
            { "id": 1, "name": "PPV 1", "channel_number": 1.0 },
            { "id": 2, "name": "UFC: Main Card 11/08", "channel_number": 2.0 },
            { "id": 3, "name": "NBA: Finals Game 7", "channel_number": 3.0 }
        ]),
    )
    .await;

    let update = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/api/channels/profiles/1/channels/bulk-update/")
                .json_body(json!({ "channels": [
                    { "channel_id": 1, "enabled": false },
                    { "channel_id": 3, "enabled": true }
                ]}));
            then.status(200).json_body(json!({ "success": true }));
        })
        .await;

    let client = client(&server);
    let orchestrator = ScanOrchestrator::new(client.clone(), client);
    let config = ScanConfig {
        profile_names: "Events".to_string(),
        hide_rules: "[NumberOnly]".to_string(),
        ..ScanConfig::default()
    };

    let result = orchestrator
        .scan_at(&config, ScanMode::Apply, scan_time())
        .await
        .unwrap();

    assert_eq!(result.profile_names, vec!["Events"]);
    assert_eq!(result.changes.hide, vec![1]);
    assert_eq!(result.changes.show, vec![3]);
    update.assert_async().await;
}

#[tokio::test]
async fn no_epg_rule_uses_program_windows() {
    let server = MockServer::start_async().await;
    mock_login(&server).await;
    mock_list(
        &server,
        "/api/channels/profiles/",
        json!({ "results": [{ "id": 1, "name": "Events", "channels": [10, 11, 12, 13] }] }),
    )
    .await;
    mock_list(
        &server,
        "/api/channels/groups/",
        json!([{ "id": 5, "name": "PPV" }]),
    )
    .await;
    mock_list(
        &server,
        "/api/channels/channels/",
        json!([
            { "id": 10, "name": "PPV 10: Fight Night", "channel_group_id": 5, "epg_data_id": 70 },
            { "id": 11, "name": "PPV 11: Title Bout", "channel_group_id": 5, "epg_data_id": 71 },
            { "id": 12, "name": "PPV 12: Undercard", "channel_group_id": 5, "epg_data_id": 72 },
            { "id": 13, "name": "PPV 13: Prelims", "channel_group_id": 5 }
        ]),
    )
    .await;
    mock_list(
        &server,
        "/api/epg/data/",
        json!([
            { "id": 70, "epg_source": 1 },
            { "id": 71, "epg_source": 1 },
            { "id": 72, "epg_source": 2 }
        ]),
    )
    .await;
    mock_list(
        &server,
        "/api/epg/sources/",
        json!([
            { "id": 1, "source_type": "xmltv" },
            { "id": 2, "source_type": "dummy" }
        ]),
    )
    .await;
    mock_list(
        &server,
        "/api/epg/programs/",
        json!([
            { "epg": 70, "start_time": "2025-11-05T20:00:00Z", "end_time": "2025-11-05T23:00:00Z" },
            { "epg": 71, "start_time": "2025-11-07T20:00:00Z", "end_time": "2025-11-07T23:00:00Z" }
        ]),
    )
    .await;

    let client = client(&server);
    let orchestrator = ScanOrchestrator::new(client.clone(), client);
    let config = ScanConfig {
        profile_names: "Events".to_string(),
        channel_groups: "PPV".to_string(),
        hide_rules: "[NoEPG]".to_string(),
        ..ScanConfig::default()
    };

    let result = orchestrator
        .scan_at(&config, ScanMode::DryRun, scan_time())
        .await
        .unwrap();

    let actions: Vec<ScanAction> = result.results.iter().map(|d| d.action).collect();
    assert_eq!(
        actions,
        vec![
            ScanAction::NoChange,
            ScanAction::Hide,
            ScanAction::NoChange,
            ScanAction::Hide
        ]
    );
    assert_eq!(result.results[1].reason, "No EPG data in next 24 hours");
    assert_eq!(result.results[3].reason, "No EPG assigned");
    assert_eq!(
        result.results[3].matched_rule,
        DecisionSource::Rule(RuleTag::NoEpg)
    );
}

#[tokio::test]
async fn rejected_credentials_surface_as_source_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/accounts/token/");
            then.status(401).json_body(json!({ "detail": "No active account" }));
        })
        .await;

    let client = client(&server);
    let orchestrator = ScanOrchestrator::new(client.clone(), client);
    let config = ScanConfig {
        profile_names: "Events".to_string(),
        ..ScanConfig::default()
    };

    let err = orchestrator
        .scan_at(&config, ScanMode::DryRun, scan_time())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Source(SourceError::AuthenticationFailed { .. })
    ));
    assert!(!err.is_fatal_scan_error());
}
