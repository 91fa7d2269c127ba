//! Item repository
//!
//! Database operations for storefront items.

use crate::db::{backend, Backend, DynDatabasePool};
use crate::models::Item;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

const ITEM_COLUMNS: &str =
    "id, title, description, image, large_image, price, created_at, updated_at";

/// Item repository trait
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Create a new item
    async fn create(&self, item: &Item) -> Result<Item>;

    /// Get item by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Item>>;

    /// Persist every field of an existing item
    async fn update(&self, item: &Item) -> Result<Item>;

    /// Delete an item, returning whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based item repository implementation
pub struct SqlxItemRepository {
    pool: DynDatabasePool,
}

impl SqlxItemRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ItemRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ItemRepository for SqlxItemRepository {
    async fn create(&self, item: &Item) -> Result<Item> {
        let sql = r#"
            INSERT INTO items (title, description, image, large_image, price, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        let now = Utc::now();

        let id = match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(&item.title)
                .bind(&item.description)
                .bind(&item.image)
                .bind(&item.large_image)
                .bind(item.price)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create item")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(&item.title)
                .bind(&item.description)
                .bind(&item.image)
                .bind(&item.large_image)
                .bind(item.price)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create item")?
                .last_insert_id() as i64,
        };

        Ok(Item {
            id,
            created_at: now,
            updated_at: now,
            ..item.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS);
        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get item by ID")?;
                Ok(row.map(|r| row_to_item_sqlite(&r)))
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get item by ID")?;
                Ok(row.map(|r| row_to_item_mysql(&r)))
            }
        }
    }

    async fn update(&self, item: &Item) -> Result<Item> {
        let sql = r#"
            UPDATE items
            SET title = ?, description = ?, image = ?, large_image = ?, price = ?, updated_at = ?
            WHERE id = ?
        "#;
        let now = Utc::now();

        match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&item.title)
                    .bind(&item.description)
                    .bind(&item.image)
                    .bind(&item.large_image)
                    .bind(item.price)
                    .bind(now)
                    .bind(item.id)
                    .execute(pool)
                    .await
                    .context("Failed to update item")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&item.title)
                    .bind(&item.description)
                    .bind(&item.image)
                    .bind(&item.large_image)
                    .bind(item.price)
                    .bind(now)
                    .bind(item.id)
                    .execute(pool)
                    .await
                    .context("Failed to update item")?;
            }
        }

        self.get_by_id(item.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Item not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = match backend(self.pool.as_ref())? {
            Backend::Sqlite(pool) => sqlx::query("DELETE FROM items WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete item")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query("DELETE FROM items WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete item")?
                .rows_affected(),
        };

        Ok(affected > 0)
    }
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> Item {
    Item {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
        large_image: row.get("large_image"),
        price: row.get("price"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow) -> Item {
    Item {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        image: row.get("image"),
        large_image: row.get("large_image"),
        price: row.get("price"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
