//! Book catalog repository.

use sqlx::PgPool;

use bindery_core::BookId;

use super::RepositoryError;
use crate::models::{Book, BookFilter, NewBook};

const BOOK_COLUMNS: &str = "id, title, author, description, genre, categories, price, \
     cover_url, content_url, is_bestseller, is_featured, is_new_release, published_at";

/// Build the WHERE clause for a catalog listing.
///
/// Returns the SQL fragment (empty for an unfiltered listing) and whether a
/// category bind is required; flag filters are baked in as literals since
/// they carry no user input.
fn filter_clause(filter: &BookFilter) -> (String, bool) {
    let mut conditions = Vec::new();
    let mut binds_category = false;

    if filter.category.is_some() {
        conditions.push("$1 = ANY(categories)".to_owned());
        binds_category = true;
    }
    if let Some(featured) = filter.featured {
        conditions.push(format!("is_featured = {featured}"));
    }
    if let Some(bestseller) = filter.bestseller {
        conditions.push(format!("is_bestseller = {bestseller}"));
    }
    if let Some(newrelease) = filter.newrelease {
        conditions.push(format!("is_new_release = {newrelease}"));
    }

    if conditions.is_empty() {
        (String::new(), false)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds_category)
    }
}

/// Repository for book catalog operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List books matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError> {
        let (clause, binds_category) = filter_clause(filter);
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM books{clause} ORDER BY published_at DESC"
        );

        let mut query = sqlx::query_as::<_, Book>(&sql);
        if binds_category {
            query = query.bind(filter.category.clone());
        }

        let books = query.fetch_all(self.pool).await?;
        Ok(books)
    }

    /// Get a book by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool)
        .await?;
        Ok(book)
    }

    /// Insert a new book with its uploaded asset URLs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        book: &NewBook,
        cover_url: Option<&str>,
        content_url: Option<&str>,
    ) -> Result<Book, RepositoryError> {
        let created = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books
                 (title, author, description, genre, categories, price,
                  cover_url, content_url, is_bestseller, is_featured, is_new_release)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.genre)
        .bind(&book.categories)
        .bind(book.price)
        .bind(cover_url)
        .bind(content_url)
        .bind(book.is_bestseller)
        .bind(book.is_featured)
        .bind(book.is_new_release)
        .fetch_one(self.pool)
        .await?;
        Ok(created)
    }

    /// Update a book's metadata (asset URLs are managed by the media layer).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    pub async fn update(&self, id: BookId, book: &NewBook) -> Result<Book, RepositoryError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books
             SET title = $2, author = $3, description = $4, genre = $5,
                 categories = $6, price = $7, is_bestseller = $8,
                 is_featured = $9, is_new_release = $10
             WHERE id = $1
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.genre)
        .bind(&book.categories)
        .bind(book.price)
        .bind(book.is_bestseller)
        .bind(book.is_featured)
        .bind(book.is_new_release)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(updated)
    }

    /// Delete a book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book does not exist.
    pub async fn delete(&self, id: BookId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_builds_no_clause() {
        let (clause, binds) = filter_clause(&BookFilter::default());
        assert!(clause.is_empty());
        assert!(!binds);
    }

    #[test]
    fn bestseller_filter_only_constrains_bestseller() {
        let filter = BookFilter {
            bestseller: Some(true),
            ..BookFilter::default()
        };
        let (clause, binds) = filter_clause(&filter);
        assert_eq!(clause, " WHERE is_bestseller = true");
        assert!(!binds);
    }

    #[test]
    fn category_filter_binds_parameter() {
        let filter = BookFilter {
            category: Some("fiction".to_owned()),
            featured: Some(true),
            ..BookFilter::default()
        };
        let (clause, binds) = filter_clause(&filter);
        assert_eq!(clause, " WHERE $1 = ANY(categories) AND is_featured = true");
        assert!(binds);
    }

    #[test]
    fn all_flags_combine_with_and() {
        let filter = BookFilter {
            category: None,
            featured: Some(false),
            bestseller: Some(true),
            newrelease: Some(true),
        };
        let (clause, _) = filter_clause(&filter);
        assert_eq!(
            clause,
            " WHERE is_featured = false AND is_bestseller = true AND is_new_release = true"
        );
    }
}
