//! Preset chains driven end to end against a mock Objects API

mod common;

use common::*;
use fieldchain_core::prelude::*;
use fieldchain_objects_api::catalogue_key;
use fieldchain_objects_api::presets::{self, prefill, registration, OBJECTTYPE_CHANGE_MESSAGE};
use fieldchain_test_utils::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn mapping() -> Value {
    json!([{"variableKey": "textfield", "targetPath": ["height"]}])
}

fn saved_catalogue() -> Value {
    json!({"rsin": "000000000", "domain": "TEST"})
}

fn selected_label(chain: &ChainController, id: &str) -> Option<String> {
    chain.field(&fid(id)).unwrap().selected_option().map(|o| o.label.clone())
}

#[tokio::test]
async fn version_change_asks_before_dropping_mapping() {
    let server = objects_api().await;
    let gate = ModalGate::new();
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(
            JsonFormStore::from_value(json!({
                (registration::API_GROUP): 1,
                (registration::OBJECTTYPE): TREE_UUID,
                (registration::OBJECTTYPE_VERSION): 1,
                (registration::VARIABLES_MAPPING): mapping(),
            })),
            Arc::new(gate.clone()),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    let version = fid(registration::OBJECTTYPE_VERSION);
    assert_eq!(labels(&chain.options(&fid(registration::OBJECTTYPE)).unwrap()), vec!["Tree (open)", "Person (open)"]);
    assert_eq!(labels(&chain.options(&version).unwrap()), vec!["1 (published)", "2 (draft)"]);
    assert_eq!(chain.value(&version).unwrap(), int(1));
    assert!(gate.current().is_none());

    // decline
    let pending = tokio::spawn({
        let chain = chain.clone();
        let version = version.clone();
        async move { chain.set_value(&version, int(2)).await }
    });
    assert_eq!(gate.opened().await.map(|p| p.message), Some(OBJECTTYPE_CHANGE_MESSAGE.to_string()));
    gate.answer(false);
    assert_eq!(pending.await.unwrap().unwrap(), ChangeOutcome::Rejected);
    assert_eq!(chain.value(&version).unwrap(), int(1));
    assert_eq!(chain.store_value(registration::VARIABLES_MAPPING), Some(mapping()));

    // accept
    let pending = tokio::spawn({
        let chain = chain.clone();
        let version = version.clone();
        async move { chain.set_value(&version, int(2)).await }
    });
    gate.opened().await;
    gate.answer(true);
    assert_eq!(pending.await.unwrap().unwrap(), ChangeOutcome::Applied);
    assert_eq!(chain.value(&version).unwrap(), int(2));
    assert_eq!(chain.store_value(registration::OBJECTTYPE_VERSION), Some(json!(2)));
    assert_eq!(chain.store_value(registration::VARIABLES_MAPPING), Some(json!([])));
}

#[tokio::test]
async fn group_change_without_objecttype_does_not_ask() {
    let server = objects_api().await;
    let gate = ScriptedGate::declining();
    // keep the object type unset
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .config(ChainConfig::new().with_auto_select(false))
        .build(
            JsonFormStore::from_value(json!({
                (registration::API_GROUP): 1,
                (registration::VARIABLES_MAPPING): mapping(),
            })),
            gate.clone(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    let outcome = chain.set_value(&fid(registration::API_GROUP), int(2)).await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Applied);
    assert_eq!(gate.prompt_count(), 0);
    assert_eq!(chain.store_value(registration::VARIABLES_MAPPING), Some(json!([])));

    chain.wait_idle().await;
    assert_eq!(chain.options(&fid(registration::OBJECTTYPE)).unwrap().len(), 2);
}

#[tokio::test]
async fn catalogue_change_clears_document_types_silently() {
    let server = objects_api().await;
    let gate = ScriptedGate::declining();
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(
            JsonFormStore::from_value(json!({
                (registration::API_GROUP): 1,
                (registration::CATALOGUE): saved_catalogue(),
                (registration::IOT_SUBMISSION_REPORT): "Test PDF",
                (registration::IOT_ATTACHMENT): "Test attachment",
            })),
            gate.clone(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    let report = fid(registration::IOT_SUBMISSION_REPORT);
    assert_eq!(labels(&chain.options(&report).unwrap()), vec!["Test PDF", "Test attachment"]);
    assert_eq!(selected_label(&chain, registration::IOT_SUBMISSION_REPORT), Some("Test PDF".to_string()));

    let outcome = chain
        .set_value(&fid(registration::CATALOGUE), Some(catalogue_key("OTHER", "000000000")))
        .await
        .unwrap();
    assert_eq!(outcome, ChangeOutcome::Applied);
    assert_eq!(gate.prompt_count(), 0);
    assert_eq!(
        chain.store_value(registration::CATALOGUE),
        Some(json!({"domain": "OTHER", "rsin": "000000000"}))
    );
    for id in registration::DOCUMENT_TYPES {
        assert_eq!(chain.value(&fid(id)).unwrap(), None, "{id} should be cleared");
        assert_eq!(chain.store_value(id), None);
    }

    chain.wait_idle().await;
    for id in registration::DOCUMENT_TYPES {
        assert_eq!(labels(&chain.options(&fid(id)).unwrap()), vec!["Other PDF", "Other attachment"]);
    }
}

#[tokio::test]
async fn group_reset_clears_persisted_catalogue() {
    let server = objects_api().await;
    let gate = ScriptedGate::accepting(1);
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(
            JsonFormStore::from_value(json!({
                (registration::API_GROUP): 1,
                (registration::CATALOGUE): saved_catalogue(),
                (registration::IOT_SUBMISSION_REPORT): "Test PDF",
            })),
            gate.clone(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;
    assert_eq!(chain.value(&fid(registration::CATALOGUE)).unwrap(), Some(catalogue_key("TEST", "000000000")));

    let outcome = chain.set_value(&fid(registration::API_GROUP), int(2)).await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Applied);
    assert_eq!(chain.value(&fid(registration::CATALOGUE)).unwrap(), None);
    assert_eq!(chain.store_value(registration::CATALOGUE), None);
    assert_eq!(chain.store_value(registration::IOT_SUBMISSION_REPORT), None);
}

#[tokio::test]
async fn selecting_group_picks_first_objecttype_and_latest_version() {
    let server = objects_api().await;
    let gate = ScriptedGate::declining();
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(JsonFormStore::new(), gate.clone())
        .unwrap();
    chain.mount();
    chain.wait_idle().await;
    assert_eq!(chain.value(&fid(registration::OBJECTTYPE)).unwrap(), None);

    chain.set_value(&fid(registration::API_GROUP), int(1)).await.unwrap();
    chain.wait_idle().await;

    assert_eq!(chain.store_value(registration::OBJECTTYPE), Some(json!(TREE_UUID)));
    assert_eq!(chain.store_value(registration::OBJECTTYPE_VERSION), Some(json!(2)));
    assert_eq!(selected_label(&chain, registration::OBJECTTYPE), Some("Tree (open)".to_string()));
    assert_eq!(selected_label(&chain, registration::OBJECTTYPE_VERSION), Some("2 (draft)".to_string()));
    assert_eq!(gate.prompt_count(), 0);
}

#[tokio::test]
async fn objecttype_no_longer_offered_is_replaced() {
    let server = objects_api().await;
    let gate = ScriptedGate::declining();
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(
            JsonFormStore::from_value(json!({
                (registration::API_GROUP): 1,
                (registration::OBJECTTYPE): "a-non-existing-uuid",
                (registration::OBJECTTYPE_VERSION): 1,
            })),
            gate.clone(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    assert_eq!(chain.store_value(registration::OBJECTTYPE), Some(json!(TREE_UUID)));
    assert_eq!(chain.store_value(registration::OBJECTTYPE_VERSION), Some(json!(2)));
    assert_eq!(selected_label(&chain, registration::OBJECTTYPE_VERSION), Some("2 (draft)".to_string()));
    assert_eq!(gate.prompt_count(), 0);
}

#[tokio::test]
async fn single_group_is_selected_on_mount() {
    let server = objects_api().await;
    let chain = presets::registration_chain(&client(&server), vec![SelectOption::new(1, "Objects API group 1")])
        .build(JsonFormStore::new(), ScriptedGate::declining())
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    assert_eq!(chain.store_value(registration::API_GROUP), Some(json!(1)));
    assert_eq!(chain.load_state(&fid(registration::OBJECTTYPE)).unwrap(), LoadState::Loaded);
    assert_eq!(chain.load_state(&fid(registration::CATALOGUE)).unwrap(), LoadState::Loaded);
    assert_eq!(chain.load_state(&fid(registration::OBJECTTYPE_VERSION)).unwrap(), LoadState::Loaded);
    // catalogues are never picked for the user
    assert_eq!(chain.value(&fid(registration::CATALOGUE)).unwrap(), None);
}

#[tokio::test]
async fn saved_registration_options_round_trip() {
    let server = objects_api().await;
    let saved = json!({
        (registration::API_GROUP): 1,
        (registration::OBJECTTYPE): TREE_UUID,
        (registration::OBJECTTYPE_VERSION): 1,
        (registration::VARIABLES_MAPPING): mapping(),
        (registration::CATALOGUE): saved_catalogue(),
        (registration::IOT_SUBMISSION_REPORT): "Test PDF",
    });
    let gate = ScriptedGate::declining();
    let chain = presets::registration_chain(&client(&server), api_group_options())
        .build(JsonFormStore::from_value(saved.clone()), gate.clone())
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    for (path, value) in saved.as_object().unwrap() {
        assert_eq!(chain.store_value(path).as_ref(), Some(value), "{path}");
    }
    assert_eq!(selected_label(&chain, registration::CATALOGUE), Some("Catalogus 1".to_string()));
    assert_eq!(selected_label(&chain, registration::IOT_SUBMISSION_REPORT), Some("Test PDF".to_string()));
    assert_eq!(gate.prompt_count(), 0);
    assert!(chain.fields().iter().all(|f| f.load_state != LoadState::Error));
}

#[tokio::test]
async fn target_path_field_follows_version() {
    let server = objects_api().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/api/v2/registration/plugins/objects-api/target-paths"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!([
            {"targetPath": ["height"], "isRequired": true, "jsonSchema": {"type": "integer"}}
        ])))
        .mount(&server)
        .await;

    let client = client(&server);
    let builder = presets::registration_chain(&client, api_group_options());
    let chain = presets::with_target_paths(builder, &client, "textfield", json!({"type": "integer"}))
        .build(
            JsonFormStore::from_value(json!({(registration::API_GROUP): 1, (registration::OBJECTTYPE): TREE_UUID})),
            ScriptedGate::declining(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    // the latest version is picked, which completes the target path parents
    let paths = fid(&registration::target_path_field("textfield"));
    assert_eq!(chain.value(&fid(registration::OBJECTTYPE_VERSION)).unwrap(), int(2));
    assert_eq!(labels(&chain.options(&paths).unwrap()), vec!["height"]);

    chain.set_value(&fid(registration::OBJECTTYPE_VERSION), None).await.unwrap();
    chain.wait_idle().await;
    assert_eq!(chain.load_state(&paths).unwrap(), LoadState::Idle);
}

#[tokio::test]
async fn prefill_objecttype_change_resets_auth_path_and_mapping() {
    let server = objects_api().await;
    let gate = ScriptedGate::accepting(1);
    let chain = presets::prefill_chain(&client(&server), api_group_options())
        .build(
            JsonFormStore::from_value(json!({
                "options": {
                    "objectsApiGroup": 1,
                    "objecttypeUuid": TREE_UUID,
                    "objecttypeVersion": 1,
                    "authAttributePath": ["bsn"],
                    "variablesMapping": mapping(),
                }
            })),
            gate.clone(),
        )
        .unwrap();
    chain.mount();
    chain.wait_idle().await;

    let properties = fid(prefill::PROPERTIES);
    assert_eq!(labels(&chain.options(&properties).unwrap()), vec!["height", "location > coordinates"]);

    let outcome = chain.set_value(&fid(prefill::OBJECTTYPE), key(PERSON_UUID)).await.unwrap();
    assert_eq!(outcome, ChangeOutcome::Applied);
    assert_eq!(gate.prompts(), vec![OBJECTTYPE_CHANGE_MESSAGE.to_string()]);
    assert_eq!(chain.store_value(prefill::OBJECTTYPE_PATH), Some(json!(PERSON_UUID)));
    assert_eq!(chain.store_value(prefill::OBJECTTYPE_VERSION_PATH), None);
    assert_eq!(chain.store_value(prefill::AUTH_ATTRIBUTE_PATH), Some(json!([])));
    assert_eq!(chain.store_value(prefill::VARIABLES_MAPPING), Some(json!([])));

    chain.wait_idle().await;
    assert_eq!(chain.store_value(prefill::OBJECTTYPE_VERSION_PATH), Some(json!(2)));
}
