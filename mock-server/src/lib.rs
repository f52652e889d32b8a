use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const HEALTH_MESSAGE: &str = "Roomy API is running";

/// One in-memory resource collection with server-assigned integer ids.
#[derive(Debug)]
pub struct Collection {
    /// Field every created item must carry as a non-empty string.
    required: &'static str,
    next_id: u64,
    items: BTreeMap<u64, Map<String, Value>>,
}

impl Collection {
    pub fn new(required: &'static str) -> Self {
        Self {
            required,
            next_id: 1,
            items: BTreeMap::new(),
        }
    }
}

pub type Db = Arc<RwLock<Collection>>;

type ApiResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    Router::new()
        .route("/", get(health))
        .nest("/api/users", collection_routes(Collection::new("name")))
        .nest("/api/rooms", collection_routes(Collection::new("title")))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Initialize `tracing` output filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn collection_routes(collection: Collection) -> Router {
    let db: Db = Arc::new(RwLock::new(collection));
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/{id}",
            get(get_item).put(replace_item).patch(patch_item).delete(delete_item),
        )
        .with_state(db)
}

async fn health() -> Json<Value> {
    Json(json!({ "message": HEALTH_MESSAGE }))
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Value>> {
    let collection = db.read().await;
    Json(
        collection
            .items
            .iter()
            .map(|(id, fields)| with_id(*id, fields))
            .collect(),
    )
}

async fn create_item(State(db): State<Db>, Json(input): Json<Value>) -> ApiResult {
    let mut collection = db.write().await;
    let fields = validate(&input, collection.required)?;
    let id = collection.next_id;
    collection.next_id += 1;
    collection.items.insert(id, fields.clone());
    info!(id, "item created");
    Ok((StatusCode::CREATED, Json(with_id(id, &fields))))
}

async fn get_item(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult {
    let collection = db.read().await;
    let fields = collection.items.get(&id).ok_or_else(not_found)?;
    Ok((StatusCode::OK, Json(with_id(id, fields))))
}

async fn replace_item(State(db): State<Db>, Path(id): Path<u64>, Json(input): Json<Value>) -> ApiResult {
    let mut collection = db.write().await;
    let fields = validate(&input, collection.required)?;
    let slot = collection.items.get_mut(&id).ok_or_else(not_found)?;
    *slot = fields;
    Ok((StatusCode::OK, Json(with_id(id, slot))))
}

async fn patch_item(State(db): State<Db>, Path(id): Path<u64>, Json(input): Json<Value>) -> ApiResult {
    let mut collection = db.write().await;
    let changes = as_object(&input)?;
    let slot = collection.items.get_mut(&id).ok_or_else(not_found)?;
    for (key, value) in changes {
        if key != "id" {
            slot.insert(key.clone(), value.clone());
        }
    }
    Ok((StatusCode::OK, Json(with_id(id, slot))))
}

async fn delete_item(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut collection = db.write().await;
    collection.items.remove(&id).ok_or_else(not_found)?;
    debug!(id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn with_id(id: u64, fields: &Map<String, Value>) -> Value {
    let mut item = fields.clone();
    item.insert("id".to_string(), json!(id));
    Value::Object(item)
}

fn as_object(input: &Value) -> Result<&Map<String, Value>, (StatusCode, Json<Value>)> {
    input.as_object().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "request body must be a JSON object" })),
        )
    })
}

/// Check the payload and strip any client-supplied id.
fn validate(input: &Value, required: &str) -> Result<Map<String, Value>, (StatusCode, Json<Value>)> {
    let mut fields = as_object(input)?.clone();
    fields.remove("id");
    match fields.get(required).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(fields),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": format!("{required} is required") })),
        )),
    }
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
