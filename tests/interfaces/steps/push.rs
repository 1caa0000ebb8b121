//! Push protocol step definitions.

use std::sync::Arc;

use async_trait::async_trait;
use cucumber::{given, then, when, World};
use pushgate::mutation::{HandlerRegistry, HandlerResult, MutationHandler, TransactMode, Transactor};
use pushgate::storage::{LedgerStore, MemoryLedgerStore, MemoryLedgerTransaction};
use pushgate::{MutationError, PushConfig, PushProcessor};
use serde_json::{json, Value};

const CLIENT_GROUP: &str = "group-1";

// --- Handlers ---

/// Writes row `items/<key>`.
struct PutItem;

#[async_trait]
impl MutationHandler<MemoryLedgerStore> for PutItem {
    async fn execute(&self, tx: &mut MemoryLedgerTransaction, args: &Value) -> HandlerResult {
        let key = args["key"].as_str().unwrap_or_default();
        tx.put("items", key, json!(true));
        Ok(None)
    }
}

/// Writes row `items/<key>`, then rejects.
struct RejectItem;

#[async_trait]
impl MutationHandler<MemoryLedgerStore> for RejectItem {
    async fn execute(&self, tx: &mut MemoryLedgerTransaction, args: &Value) -> HandlerResult {
        let key = args["key"].as_str().unwrap_or_default();
        tx.put("items", key, json!(true));
        Err(MutationError::app("Item rejected"))
    }
}

/// Manual mode: writes row `items/<key>`, commits, then fails.
struct PutThenNotify;

#[async_trait]
impl MutationHandler<MemoryLedgerStore> for PutThenNotify {
    fn transact_mode(&self) -> TransactMode {
        TransactMode::Manual
    }

    async fn execute(&self, tx: &mut MemoryLedgerTransaction, args: &Value) -> HandlerResult {
        PutItem.execute(tx, args).await
    }

    async fn run(
        &self,
        transactor: &mut Transactor<'_, MemoryLedgerStore>,
        args: &Value,
    ) -> HandlerResult {
        let tx = transactor.begin().await?;
        self.execute(tx, args).await?;
        transactor.commit().await?;
        Err(MutationError::app("Notification failed"))
    }
}

/// Manual mode: fails before opening the transaction.
struct QuoteThenPut;

#[async_trait]
impl MutationHandler<MemoryLedgerStore> for QuoteThenPut {
    fn transact_mode(&self) -> TransactMode {
        TransactMode::Manual
    }

    async fn execute(&self, tx: &mut MemoryLedgerTransaction, args: &Value) -> HandlerResult {
        PutItem.execute(tx, args).await
    }

    async fn run(
        &self,
        _transactor: &mut Transactor<'_, MemoryLedgerStore>,
        _args: &Value,
    ) -> HandlerResult {
        Err(MutationError::app("Quote unavailable"))
    }
}

/// Manual mode: forgets to open the transaction.
struct Forgetful;

#[async_trait]
impl MutationHandler<MemoryLedgerStore> for Forgetful {
    fn transact_mode(&self) -> TransactMode {
        TransactMode::Manual
    }

    async fn execute(&self, _tx: &mut MemoryLedgerTransaction, _args: &Value) -> HandlerResult {
        Ok(None)
    }

    async fn run(
        &self,
        _transactor: &mut Transactor<'_, MemoryLedgerStore>,
        _args: &Value,
    ) -> HandlerResult {
        Ok(None)
    }
}

fn registry() -> HandlerRegistry<MemoryLedgerStore> {
    let items = HandlerRegistry::new()
        .on("put", PutItem)
        .on("reject", RejectItem);

    HandlerRegistry::new()
        .mount("item", items)
        .on("order.notify", PutThenNotify)
        .on("order.quote", QuoteThenPut)
        .on("order.forgetful", Forgetful)
}

// --- World ---

/// Test context for push scenarios.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct PushWorld {
    store: Arc<MemoryLedgerStore>,
    processor: PushProcessor<MemoryLedgerStore>,
    push_version: i64,
    mutations: Vec<Value>,
    response: Option<Value>,
}

impl PushWorld {
    fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        let processor = PushProcessor::new(Arc::clone(&store), registry(), PushConfig::default());
        Self {
            store,
            processor,
            push_version: 1,
            mutations: Vec::new(),
            response: None,
        }
    }

    fn response(&self) -> &Value {
        self.response.as_ref().expect("Push not processed")
    }

    fn result_of(&self, id: i64, client_id: &str) -> &Value {
        self.response()["mutations"]
            .as_array()
            .expect("Push did not succeed")
            .iter()
            .find(|m| m["id"]["id"] == json!(id) && m["id"]["clientID"] == json!(client_id))
            .map(|m| &m["result"])
            .expect("No result for mutation")
    }
}

// --- Given steps ---

#[given("a push processor")]
async fn given_push_processor(world: &mut PushWorld) {
    world.mutations.clear();
    world.response = None;
}

#[given(expr = "client {string} has last mutation id {int}")]
async fn given_last_mutation_id(world: &mut PushWorld, client_id: String, lmid: i64) {
    world
        .store
        .set_last_mutation_id(CLIENT_GROUP, &client_id, lmid)
        .await;
}

#[given(expr = "the push declares version {int}")]
async fn given_push_version(world: &mut PushWorld, version: i64) {
    world.push_version = version;
}

#[given(expr = "mutation {int} {string} from client {string} with key {string}")]
async fn given_mutation(
    world: &mut PushWorld,
    id: i64,
    name: String,
    client_id: String,
    key: String,
) {
    world.mutations.push(json!({
        "id": id,
        "clientID": client_id,
        "name": name,
        "args": { "key": key },
    }));
}

// --- When steps ---

#[when("the push is processed")]
async fn when_push_processed(world: &mut PushWorld) {
    let body = json!({
        "pushVersion": world.push_version,
        "clientGroupID": CLIENT_GROUP,
        "requestID": "request-1",
        "timestamp": 1_700_000_000_000_i64,
        "mutations": world.mutations,
    });
    world.response = Some(world.processor.process(&body).await.to_json());
}

#[when("a malformed push is processed")]
async fn when_malformed_push_processed(world: &mut PushWorld) {
    let body = json!({ "clientGroupID": CLIENT_GROUP, "mutations": "not-a-list" });
    world.response = Some(world.processor.process(&body).await.to_json());
}

// --- Then steps ---

#[then(expr = "mutation {int} from client {string} succeeds")]
async fn then_mutation_succeeds(world: &mut PushWorld, id: i64, client_id: String) {
    let result = world.result_of(id, &client_id);
    assert!(
        result.get("error").is_none(),
        "expected success, got {result}"
    );
}

#[then(expr = "mutation {int} from client {string} fails with {string}")]
async fn then_mutation_fails(world: &mut PushWorld, id: i64, client_id: String, code: String) {
    let result = world.result_of(id, &client_id);
    assert_eq!(result["error"], json!(code), "unexpected result {result}");
}

#[then(expr = "the results in order are {string}")]
async fn then_results_in_order(world: &mut PushWorld, expected: String) {
    let outcomes: Vec<String> = world.response()["mutations"]
        .as_array()
        .expect("Push did not succeed")
        .iter()
        .map(|m| match m["result"]["error"].as_str() {
            Some(code) => code.to_string(),
            None => "ok".to_string(),
        })
        .collect();

    let expected: Vec<String> = expected.split(',').map(|s| s.trim().to_string()).collect();
    assert_eq!(outcomes, expected);
}

#[then(expr = "the push fails with reason {string}")]
async fn then_push_fails(world: &mut PushWorld, reason: String) {
    let response = world.response();
    assert_eq!(response["kind"], json!("PushFailed"));
    assert_eq!(response["origin"], json!("server"));
    assert_eq!(response["reason"], json!(reason));
}

#[then(expr = "the unprocessed mutations are {string}")]
async fn then_unprocessed(world: &mut PushWorld, expected: String) {
    let listed: Vec<String> = world.response()["mutationIDs"]
        .as_array()
        .expect("Push did not fail")
        .iter()
        .map(|m| format!("{}:{}", m["clientID"].as_str().unwrap_or_default(), m["id"]))
        .collect();

    let expected: Vec<String> = if expected == "none" {
        Vec::new()
    } else {
        expected.split(',').map(|s| s.trim().to_string()).collect()
    };
    assert_eq!(listed, expected);
}

#[then(expr = "client {string} has last mutation id {int}")]
async fn then_last_mutation_id(world: &mut PushWorld, client_id: String, lmid: i64) {
    let actual = world
        .store
        .last_mutation_id(CLIENT_GROUP, &client_id)
        .await
        .expect("Failed to read ledger");
    assert_eq!(actual, lmid);
}

#[then(expr = "item {string} exists")]
async fn then_item_exists(world: &mut PushWorld, key: String) {
    assert!(world.store.row("items", &key).await.is_some(), "missing item {key}");
}

#[then(expr = "item {string} does not exist")]
async fn then_item_absent(world: &mut PushWorld, key: String) {
    assert!(world.store.row("items", &key).await.is_none(), "unexpected item {key}");
}
