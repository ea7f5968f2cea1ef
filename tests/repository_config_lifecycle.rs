//! Repository configuration lifecycle against a mocked Xray API.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xray_provider::testing::{assert_has_warning, ProviderTester};
use xray_provider::{ProviderConfig, ProviderError, ResourceData, XrayClient, XrayProvider};

const TYPE_NAME: &str = "xray_repository_config";

fn tester(server: &MockServer, max_retries: usize) -> ProviderTester<XrayProvider> {
    let config = ProviderConfig::new(&server.uri(), "token")
        .unwrap()
        .with_max_retries(max_retries);
    let client = XrayClient::new(&config).unwrap();
    ProviderTester::new(XrayProvider::with_client(client))
}

fn remote_paths_config() -> serde_json::Value {
    json!({
        "repo_name": "libs-release-local",
        "repo_paths_config": {
            "patterns": [{
                "include": "pattern1",
                "exclude": "pattern12",
                "index_new_artifacts": true,
                "retention_in_days": 90
            }],
            "all_other_artifacts": {
                "index_new_artifacts": true,
                "retention_in_days": 90
            }
        }
    })
}

#[tokio::test]
async fn test_create_sends_payload_and_reads_back() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/xray/api/v1/repos_config"))
        .and(header("authorization", "Bearer token"))
        .and(body_json(json!({
            "repo_name": "libs-release-local",
            "repo_config": {
                "retention_in_days": 90
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"info": "Repository configuration updated"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs-release-local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "repo_name": "libs-release-local",
            "repo_config": {"retention_in_days": 90}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let data = tester(&server, 0)
        .create(TYPE_NAME, json!({"repo_name": "libs-release-local", "config": [{}]}))
        .await
        .unwrap();

    assert_eq!(data.id(), Some("libs-release-local"));
    assert_eq!(data.state()["config"][0]["retention_in_days"], 90);
    assert_eq!(data.state()["paths_config"], json!([]));
}

#[tokio::test]
async fn test_create_with_paths_config() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/xray/api/v1/repos_config"))
        .and(body_json(remote_paths_config()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs-release-local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_paths_config()))
        .mount(&server)
        .await;

    let data = tester(&server, 0)
        .create(
            TYPE_NAME,
            json!({
                "repo_name": "libs-release-local",
                "paths_config": [{
                    "pattern": [{"include": "pattern1", "exclude": "pattern12"}],
                    "all_other_artifacts": [{}]
                }]
            }),
        )
        .await
        .unwrap();

    let pattern = &data.state()["paths_config"][0]["pattern"][0];
    assert_eq!(pattern["include"], "pattern1");
    assert_eq!(pattern["index_new_artifacts"], true);
    assert_eq!(data.state()["config"], json!([]));
}

#[tokio::test]
async fn test_conflicting_blocks_send_nothing() {
    let server = MockServer::start().await;

    let err = tester(&server, 0)
        .create(
            TYPE_NAME,
            json!({
                "repo_name": "libs-release-local",
                "config": [{}],
                "paths_config": [{"pattern": [{"include": "a/**"}], "all_other_artifacts": [{}]}]
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Validation(_)));
    assert!(err.message().contains("Only one of config, paths_config can be set"));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_put_failure_surfaces_body() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/xray/api/v1/repos_config"))
        .respond_with(ResponseTemplate::new(400).set_body_string("repository not indexed"))
        .expect(1)
        .mount(&server)
        .await;

    let err = tester(&server, 3)
        .create(TYPE_NAME, json!({"repo_name": "libs", "config": [{}]}))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.message().contains("repository not indexed"));
}

#[tokio::test]
async fn test_read_missing_clears_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let tester = tester(&server, 3);
    let mut data = ResourceData::with_id("gone", json!({"repo_name": "gone"}));
    let err = tester.read(TYPE_NAME, &mut data).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(data.id(), None);
}

#[tokio::test]
async fn test_read_retries_transient_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs-release-local"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs-release-local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_paths_config()))
        .mount(&server)
        .await;

    let tester = tester(&server, 2);
    let mut data = ResourceData::with_id("libs-release-local", json!({}));
    tester.read(TYPE_NAME, &mut data).await.unwrap();

    assert_eq!(data.id(), Some("libs-release-local"));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_resends_configuration() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/xray/api/v1/repos_config"))
        .and(body_json(json!({
            "repo_name": "libs",
            "repo_config": {"vuln_contextual_analysis": true, "retention_in_days": 30}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "repo_name": "libs",
            "repo_config": {"vuln_contextual_analysis": true, "retention_in_days": 30}
        })))
        .mount(&server)
        .await;

    let tester = tester(&server, 0);
    let mut data = ResourceData::with_id("libs", json!({"repo_name": "libs", "config": [{}]}));
    tester
        .lifecycle_update(
            TYPE_NAME,
            &mut data,
            json!({
                "repo_name": "libs",
                "config": [{"vuln_contextual_analysis": true, "retention_in_days": 30}]
            }),
        )
        .await
        .unwrap();

    assert_eq!(data.state()["config"][0]["retention_in_days"], 30);
}

#[tokio::test]
async fn test_delete_sends_nothing() {
    let server = MockServer::start().await;

    let tester = tester(&server, 0);
    let mut data = ResourceData::with_id("libs", json!({"repo_name": "libs", "config": [{}]}));
    let diagnostics = tester.delete(TYPE_NAME, &mut data).await.unwrap();

    assert_has_warning(&diagnostics, "No delete functionality provided by API");
    assert_eq!(data.id(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_reads_existing_configuration() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/xray/api/v1/repos_config/libs-release-local"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_paths_config()))
        .expect(1)
        .mount(&server)
        .await;

    let data = tester(&server, 0)
        .import_resource(TYPE_NAME, "libs-release-local")
        .await
        .unwrap();

    assert_eq!(data.id(), Some("libs-release-local"));
    assert_eq!(data.state()["repo_name"], "libs-release-local");
    assert_eq!(
        data.state()["paths_config"][0]["all_other_artifacts"][0]["retention_in_days"],
        90
    );
}
