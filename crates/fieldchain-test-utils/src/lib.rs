//! Testing utilities for fieldchain workspace
//!
//! Scripted option sources and confirmation gates, Objects API fixtures, and
//! tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use fieldchain_core::{ConfirmationError, ConfirmationGate};
use fieldchain_options::{FetchError, FieldId, OptionKey, OptionSource, ParentValues, SelectOption};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const TREE_UUID: &str = "2c77babf-a967-4057-9969-0200320d23f1";
pub const PERSON_UUID: &str = "2c77babf-a967-4057-9969-0200320d23f2";
pub const CATALOGUE_1: &str = "https://example.com/catalogi/api/v1/catalogussen/1";
pub const CATALOGUE_2: &str = "https://example.com/catalogi/api/v1/catalogussen/2";
pub const CATALOGUE_3: &str = "https://example.com/catalogi/api/v1/catalogussen/3";

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fid(id: &str) -> FieldId {
    FieldId::new(id)
}

pub fn key(value: &str) -> Option<OptionKey> {
    Some(OptionKey::from(value))
}

pub fn int(value: i64) -> Option<OptionKey> {
    Some(OptionKey::Int(value))
}

pub fn parents(pairs: &[(&str, OptionKey)]) -> ParentValues {
    pairs
        .iter()
        .map(|(id, value)| (FieldId::new(*id), value.clone()))
        .collect()
}

pub fn keys(options: &[SelectOption]) -> Vec<OptionKey> {
    options.iter().map(|o| o.key.clone()).collect()
}

pub fn labels(options: &[SelectOption]) -> Vec<String> {
    options.iter().map(|o| o.label.clone()).collect()
}

/// Opens a held response
#[derive(Debug, Clone)]
pub struct Release(Arc<Semaphore>);

impl Release {
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

#[derive(Debug, Clone)]
struct Script {
    result: Result<Vec<SelectOption>, FetchError>,
    hold: Option<Arc<Semaphore>>,
}

/// Option source answering from a per-parent-values script
///
/// Unscripted parent values answer with an empty list.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<ParentValues, Script>>,
    calls: Mutex<Vec<ParentValues>>,
    count: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, parents: ParentValues, options: Vec<SelectOption>) {
        self.scripts.lock().insert(
            parents,
            Script {
                result: Ok(options),
                hold: None,
            },
        );
    }

    pub fn fail(&self, parents: ParentValues, error: FetchError) {
        self.scripts.lock().insert(
            parents,
            Script {
                result: Err(error),
                hold: None,
            },
        );
    }

    /// Respond with `options` only once the returned handle is released
    pub fn respond_held(&self, parents: ParentValues, options: Vec<SelectOption>) -> Release {
        let gate = Arc::new(Semaphore::new(0));
        self.scripts.lock().insert(
            parents,
            Script {
                result: Ok(options),
                hold: Some(gate.clone()),
            },
        );
        Release(gate)
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<ParentValues> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl OptionSource for ScriptedSource {
    async fn fetch(&self, parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(parents.clone());
        let script = self.scripts.lock().get(parents).cloned();
        let Some(script) = script else {
            return Ok(Vec::new());
        };
        if let Some(hold) = script.hold {
            if let Ok(permit) = hold.acquire().await {
                permit.forget();
            }
        }
        script.result
    }
}

/// Source that never answers
#[derive(Debug, Default)]
pub struct PendingSource;

#[async_trait]
impl OptionSource for PendingSource {
    async fn fetch(&self, _parents: &ParentValues) -> Result<Vec<SelectOption>, FetchError> {
        std::future::pending().await
    }
}

/// Gate replaying a fixed list of answers, recording every prompt
///
/// Once the script runs out every further prompt is declined.
#[derive(Debug, Default)]
pub struct ScriptedGate {
    answers: Mutex<VecDeque<Result<bool, ConfirmationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn new(answers: impl IntoIterator<Item = Result<bool, ConfirmationError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn accepting(times: usize) -> Arc<Self> {
        Self::new(std::iter::repeat(Ok(true)).take(times))
    }

    pub fn declining() -> Arc<Self> {
        Self::new([Ok(false)])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ConfirmationGate for ScriptedGate {
    async fn confirm(&self, message: &str) -> Result<bool, ConfirmationError> {
        self.prompts.lock().push(message.to_string());
        self.answers.lock().pop_front().unwrap_or(Ok(false))
    }
}

pub fn object_types_json() -> Value {
    json!([
        {
            "url": format!("https://objecttypen.nl/api/v1/objecttypes/{TREE_UUID}"),
            "uuid": TREE_UUID,
            "name": "Tree",
            "namePlural": "Trees",
            "dataClassification": "open"
        },
        {
            "url": format!("https://objecttypen.nl/api/v1/objecttypes/{PERSON_UUID}"),
            "uuid": PERSON_UUID,
            "name": "Person",
            "namePlural": "Persons",
            "dataClassification": "open"
        }
    ])
}

pub fn object_type_versions_json() -> Value {
    json!([
        {"version": 1, "status": "published"},
        {"version": 2, "status": "draft"}
    ])
}

pub fn catalogues_json() -> Value {
    json!([
        {"url": CATALOGUE_1, "domain": "TEST", "rsin": "000000000", "label": "Catalogus 1"},
        {"url": CATALOGUE_2, "domain": "OTHER", "rsin": "000000000", "label": "Catalogus 2"},
        {"url": CATALOGUE_3, "domain": "TEST", "rsin": "111111111", "label": ""}
    ])
}

pub fn document_types_json(catalogue_url: &str) -> Value {
    match catalogue_url {
        CATALOGUE_1 => json!([
            {"url": "https://example.com/catalogi/api/v1/iot/1", "description": "Test PDF", "isPublished": true},
            {"url": "https://example.com/catalogi/api/v1/iot/2", "description": "Test attachment", "isPublished": true}
        ]),
        CATALOGUE_2 => json!([
            {"url": "https://example.com/catalogi/api/v1/iot/3", "description": "Other PDF", "isPublished": true},
            {"url": "https://example.com/catalogi/api/v1/iot/4", "description": "Other attachment", "isPublished": true}
        ]),
        CATALOGUE_3 => json!([
            {"url": "https://example.com/catalogi/api/v1/iot/5", "description": "Draft PDF", "isPublished": false},
            {"url": "https://example.com/catalogi/api/v1/iot/6", "description": "Published PDF", "isPublished": true}
        ]),
        _ => json!([]),
    }
}

pub fn api_group_options() -> Vec<SelectOption> {
    vec![
        SelectOption::new(1, "Objects API group 1"),
        SelectOption::new(2, "Objects API group 2"),
    ]
}

pub fn version_options() -> Vec<SelectOption> {
    vec![SelectOption::new(1, "1 (published)"), SelectOption::new(2, "2 (draft)")]
}
