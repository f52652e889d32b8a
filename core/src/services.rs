//! Resource services: per-collection operations over the verb wrappers.
//!
//! # Design
//! A resource type names its entry in the endpoint table and its draft type;
//! `ResourceService<R>` derives list/create/get/update/patch/remove from
//! that. Services only build paths; every error comes from the request core
//! unchanged. Adding a collection means implementing `Resource`, nothing
//! more.

use std::marker::PhantomData;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::client::{ApiClient, RequestOptions};
use crate::config::EndpointTable;
use crate::error::ApiError;
use crate::types::{HealthStatus, NewRoom, NewUser, Room, User};

/// A backend collection reachable through the endpoint table.
pub trait Resource: DeserializeOwned + Send + 'static {
    /// Payload used to create or replace an item.
    type Draft: Serialize + Send + Sync;

    /// Key of the collection path in the endpoint table.
    const ENDPOINT: &'static str;
}

impl Resource for User {
    type Draft = NewUser;
    const ENDPOINT: &'static str = EndpointTable::USERS;
}

impl Resource for Room {
    type Draft = NewRoom;
    const ENDPOINT: &'static str = EndpointTable::ROOMS;
}

/// Operations on one resource collection.
pub struct ResourceService<R> {
    client: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _resource: PhantomData,
        }
    }
}

pub type UserService = ResourceService<User>;
pub type RoomService = ResourceService<Room>;

impl<R: Resource> ResourceService<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    /// Collection path, e.g. `/api/users`.
    pub fn collection_path(&self) -> Result<&'static str, ApiError> {
        self.client
            .config()
            .endpoints()
            .get(R::ENDPOINT)
            .ok_or_else(|| ApiError::unclassified(UnknownEndpoint(R::ENDPOINT)))
    }

    /// Single-item path, e.g. `/api/users/7`.
    pub fn item_path(&self, id: u64) -> Result<String, ApiError> {
        Ok(format!("{}/{id}", self.collection_path()?))
    }

    #[instrument(skip(self), fields(resource = R::ENDPOINT))]
    pub async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.client.get(self.collection_path()?, RequestOptions::new()).await
    }

    #[instrument(skip_all, fields(resource = R::ENDPOINT))]
    pub async fn create(&self, draft: &R::Draft) -> Result<R, ApiError> {
        self.client
            .post(self.collection_path()?, Some(draft), RequestOptions::new())
            .await
    }

    #[instrument(skip(self), fields(resource = R::ENDPOINT))]
    pub async fn get(&self, id: u64) -> Result<R, ApiError> {
        self.client.get(&self.item_path(id)?, RequestOptions::new()).await
    }

    /// Replace an item (PUT).
    #[instrument(skip(self, draft), fields(resource = R::ENDPOINT))]
    pub async fn update(&self, id: u64, draft: &R::Draft) -> Result<R, ApiError> {
        self.client
            .put(&self.item_path(id)?, Some(draft), RequestOptions::new())
            .await
    }

    /// Apply a partial update (PATCH) given as a JSON object.
    #[instrument(skip(self, changes), fields(resource = R::ENDPOINT))]
    pub async fn patch(&self, id: u64, changes: &Value) -> Result<R, ApiError> {
        self.client
            .patch(&self.item_path(id)?, Some(changes), RequestOptions::new())
            .await
    }

    /// Delete an item. Whatever the backend sends back on success is ignored.
    #[instrument(skip(self), fields(resource = R::ENDPOINT))]
    pub async fn remove(&self, id: u64) -> Result<(), ApiError> {
        self.client
            .delete::<IgnoredAny>(&self.item_path(id)?, RequestOptions::new())
            .await
            .map(|_| ())
    }
}

/// Check that the backend is up; returns its greeting.
#[instrument(skip_all)]
pub async fn health_check(client: &ApiClient) -> Result<HealthStatus, ApiError> {
    client
        .get(client.config().endpoints().health(), RequestOptions::new())
        .await
}

#[derive(Debug, thiserror::Error)]
#[error("no endpoint registered for resource `{0}`")]
struct UnknownEndpoint(&'static str);
