//! Purchase repository.
//!
//! Purchases are immutable once recorded: there is insert and read, nothing
//! else. Recording a purchase and clearing the cart happen in one
//! transaction so a crash can never leave a paid cart behind.

use sqlx::PgPool;

use bindery_core::{Price, PurchaseId, UserId};

use super::{RepositoryError, map_unique_violation};
use crate::models::{CartItem, Purchase, PurchaseItem};

const PURCHASE_COLUMNS: &str = "id, user_id, total, payment_ref, purchased_at";
const ITEM_COLUMNS: &str =
    "id, purchase_id, book_id, title, author, cover_url, content_url, price";

/// Repository for purchase records.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a completed checkout from the cart snapshot and clear the cart.
    ///
    /// Book content URLs are frozen onto the purchase items at this point.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the payment reference was
    /// already recorded (double confirm) and `RepositoryError::Database`
    /// for other failures.
    pub async fn record(
        &self,
        user_id: UserId,
        items: &[CartItem],
        total: Price,
        payment_ref: &str,
    ) -> Result<Purchase, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // payment_ref is unique, so a double confirm loses here.
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "INSERT INTO purchases (user_id, total, payment_ref)
             VALUES ($1, $2, $3)
             RETURNING {PURCHASE_COLUMNS}"
        ))
        .bind(user_id.as_i32())
        .bind(total)
        .bind(payment_ref)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "payment already recorded"))?;

        for item in items {
            sqlx::query(
                "INSERT INTO purchase_items
                     (purchase_id, book_id, title, author, cover_url, content_url, price)
                 SELECT $1, $2, $3, $4, $5, books.content_url, $6
                 FROM books WHERE books.id = $2",
            )
            .bind(purchase.id.as_i32())
            .bind(item.book_id.as_i32())
            .bind(&item.title)
            .bind(&item.author)
            .bind(&item.cover_url)
            .bind(item.price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(purchase)
    }

    /// List a user's purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases
             WHERE user_id = $1 ORDER BY purchased_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(purchases)
    }

    /// List the book snapshots inside one purchase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, purchase_id: PurchaseId) -> Result<Vec<PurchaseItem>, RepositoryError> {
        let items = sqlx::query_as::<_, PurchaseItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM purchase_items WHERE purchase_id = $1 ORDER BY id"
        ))
        .bind(purchase_id.as_i32())
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Find the purchased-book snapshot for a (user, book) pair, if the user
    /// owns the book. Used to gate flashcard generation and PDF serving.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_owned_item(
        &self,
        user_id: UserId,
        book_id: bindery_core::BookId,
    ) -> Result<Option<PurchaseItem>, RepositoryError> {
        let item = sqlx::query_as::<_, PurchaseItem>(
            "SELECT pi.id, pi.purchase_id, pi.book_id, pi.title, pi.author,
                    pi.cover_url, pi.content_url, pi.price
             FROM purchase_items pi
             JOIN purchases p ON p.id = pi.purchase_id
             WHERE p.user_id = $1 AND pi.book_id = $2
             ORDER BY p.purchased_at DESC
             LIMIT 1",
        )
        .bind(user_id.as_i32())
        .bind(book_id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }
}
