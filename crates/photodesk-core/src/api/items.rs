use crate::models::{Item, ItemCreate, ItemUpdate};

use super::{ApiClient, ApiError, RequestOptions};

impl ApiClient {
    pub async fn list_items(&self) -> Result<Vec<Item>, ApiError> {
        self.get_json("/items", RequestOptions::default()).await
    }

    pub async fn create_item(&self, data: &ItemCreate) -> Result<Item, ApiError> {
        self.post_json("/items", data, RequestOptions::default()).await
    }

    pub async fn update_item(&self, id: i64, data: &ItemUpdate) -> Result<Item, ApiError> {
        self.patch_json(&format!("/items/{}", id), data).await
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/items/{}", id)).await
    }
}
