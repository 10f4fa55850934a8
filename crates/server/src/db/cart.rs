//! Cart repository.
//!
//! Every mutation is a single atomic statement, so two concurrent requests
//! against the same cart cannot lose an update. Duplicate adds hit the
//! (user, book) primary key and become no-ops via `ON CONFLICT DO NOTHING`,
//! leaving the quantity pinned at 1.

use sqlx::PgPool;

use bindery_core::{BookId, UserId};

use super::RepositoryError;
use crate::models::{Book, CartItem};

const CART_COLUMNS: &str =
    "user_id, book_id, title, author, cover_url, price, quantity, added_at";

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the user's cart, oldest additions first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY added_at"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Add a book to the cart as a denormalized snapshot.
    ///
    /// Returns `true` if a row was inserted, `false` when the book was
    /// already in the cart (duplicate add is a no-op).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add(&self, user_id: UserId, book: &Book) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO cart_items (user_id, book_id, title, author, cover_url, price)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (user_id, book_id) DO NOTHING",
        )
        .bind(user_id.as_i32())
        .bind(book.id.as_i32())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.cover_url)
        .bind(book.price)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a book from the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book is not in the cart.
    pub async fn remove(&self, user_id: UserId, book_id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND book_id = $2")
            .bind(user_id.as_i32())
            .bind(book_id.as_i32())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
