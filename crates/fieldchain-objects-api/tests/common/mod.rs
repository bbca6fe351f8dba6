use fieldchain_objects_api::{ApiClient, ApiConfig, FeatureFlags};
use fieldchain_test_utils::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CSRF_TOKEN: &str = "csrf-token";

pub fn client(server: &MockServer) -> ApiClient {
    client_with_flags(server, FeatureFlags::default())
}

pub fn client_with_flags(server: &MockServer, flags: FeatureFlags) -> ApiClient {
    ApiClient::new(
        ApiConfig::new(server.uri())
            .with_csrf_token(CSRF_TOKEN)
            .with_feature_flags(flags),
    )
}

/// Mock server answering the Objects API endpoints for groups 1 and 2
pub async fn objects_api() -> MockServer {
    init_tracing();
    let server = MockServer::start().await;

    for group in ["1", "2"] {
        Mock::given(method("GET"))
            .and(path("/api/v2/objects-api/object-types"))
            .and(query_param("objects_api_group", group))
            .respond_with(ResponseTemplate::new(200).set_body_json(object_types_json()))
            .mount(&server)
            .await;

        for uuid in [TREE_UUID, PERSON_UUID] {
            Mock::given(method("GET"))
                .and(path(format!("/api/v2/objects-api/object-types/{uuid}/versions")))
                .and(query_param("objects_api_group", group))
                .respond_with(ResponseTemplate::new(200).set_body_json(object_type_versions_json()))
                .mount(&server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path("/api/v2/objects-api/catalogues"))
            .and(query_param("objects_api_group", group))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalogues_json()))
            .mount(&server)
            .await;

        for catalogue in [CATALOGUE_1, CATALOGUE_2, CATALOGUE_3] {
            Mock::given(method("GET"))
                .and(path("/api/v2/objects-api/document-types"))
                .and(query_param("objects_api_group", group))
                .and(query_param("catalogue_url", catalogue))
                .respond_with(ResponseTemplate::new(200).set_body_json(document_types_json(catalogue)))
                .mount(&server)
                .await;
        }

        Mock::given(method("GET"))
            .and(path(format!(
                "/api/v2/prefill/plugins/objects-api/objecttypes/{TREE_UUID}/versions/1/properties"
            )))
            .and(query_param("objects_api_group", group))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"targetPath": ["height"], "jsonSchema": {"type": "integer"}},
                {"targetPath": ["location", "coordinates"], "jsonSchema": {"type": "array"}}
            ])))
            .mount(&server)
            .await;
    }

    server
}
