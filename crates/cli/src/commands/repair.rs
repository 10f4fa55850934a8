//! Book URL repair command.
//!
//! Legacy catalog rows carry two kinds of malformed URLs: object-store
//! content URLs with a stray `.pdf` suffix (the upload path persists them
//! without one) and sentinel "placeholder" cover URLs left by early imports.
//! This command batch-fixes both and reports counts. The runtime never
//! mutates stored URLs; this is the only write path for them.

use sqlx::PgPool;
use url::Url;

use super::{CliError, connect};

/// Fallback cover used when `--default-cover` is not passed.
const DEFAULT_COVER: &str = "";

/// Strip a stray `.pdf` suffix from an object-store content URL.
///
/// Returns the repaired URL, or `None` when the URL is already canonical.
/// Non-store URLs are left alone: a plain web URL ending in `.pdf` is
/// correct as stored.
fn repair_content_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let references_store = parsed
        .path_segments()
        .is_some_and(|mut segments| segments.any(|s| s == "upload"));
    if !references_store {
        return None;
    }

    let len = url.len();
    if len >= 4 && url.get(len - 4..)?.eq_ignore_ascii_case(".pdf") {
        Some(url.get(..len - 4)?.to_owned())
    } else {
        None
    }
}

/// Replace sentinel placeholder cover URLs with the configured default.
fn repair_cover_url(url: &str, default_cover: &str) -> Option<String> {
    if url.to_lowercase().contains("placeholder") && url != default_cover {
        Some(default_cover.to_owned())
    } else {
        None
    }
}

/// Run the repair pass over the whole catalog.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable or a write fails.
pub async fn book_urls(dry_run: bool, default_cover: Option<&str>) -> Result<(), CliError> {
    let pool = connect().await?;
    let default_cover = default_cover.unwrap_or(DEFAULT_COVER);

    let rows: Vec<(i32, Option<String>, Option<String>)> =
        sqlx::query_as("SELECT id, content_url, cover_url FROM books ORDER BY id")
            .fetch_all(&pool)
            .await?;

    let mut content_fixed = 0u64;
    let mut covers_fixed = 0u64;

    for (id, content_url, cover_url) in rows {
        if let Some(repaired) = content_url.as_deref().and_then(repair_content_url) {
            tracing::info!(book_id = id, from = ?content_url, to = %repaired, "content url");
            if !dry_run {
                write_column(&pool, "content_url", id, &repaired).await?;
            }
            content_fixed += 1;
        }

        if let Some(repaired) = cover_url
            .as_deref()
            .and_then(|u| repair_cover_url(u, default_cover))
        {
            tracing::info!(book_id = id, from = ?cover_url, to = %repaired, "cover url");
            if !dry_run {
                write_column(&pool, "cover_url", id, &repaired).await?;
            }
            covers_fixed += 1;
        }
    }

    tracing::info!(
        content_fixed,
        covers_fixed,
        dry_run,
        "book url repair complete"
    );
    Ok(())
}

async fn write_column(
    pool: &PgPool,
    column: &str,
    id: i32,
    value: &str,
) -> Result<(), CliError> {
    // Column names come from the two literals above, never user input.
    sqlx::query(&format!("UPDATE books SET {column} = $2 WHERE id = $1"))
        .bind(id)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn strips_pdf_suffix_from_store_urls() {
        let fixed = repair_content_url(
            "https://res.cloudinary.com/demo/raw/upload/v42/books/dune.pdf",
        )
        .unwrap();
        assert_eq!(fixed, "https://res.cloudinary.com/demo/raw/upload/v42/books/dune");
    }

    #[test]
    fn strip_is_case_insensitive() {
        assert!(
            repair_content_url("https://res.cloudinary.com/demo/raw/upload/v42/loud.PDF")
                .is_some()
        );
    }

    #[test]
    fn canonical_store_urls_are_untouched() {
        assert!(
            repair_content_url("https://res.cloudinary.com/demo/raw/upload/v42/books/dune")
                .is_none()
        );
    }

    #[test]
    fn plain_web_pdfs_are_untouched() {
        assert!(repair_content_url("https://example.com/files/book.pdf").is_none());
    }

    #[test]
    fn placeholder_covers_are_replaced() {
        let fixed = repair_cover_url(
            "https://cdn.example.com/images/placeholder.jpg",
            "https://res.cloudinary.com/demo/image/upload/v1/bindery/default-cover",
        )
        .unwrap();
        assert!(fixed.ends_with("default-cover"));
    }

    #[test]
    fn real_covers_are_untouched() {
        assert!(
            repair_cover_url("https://res.cloudinary.com/demo/image/upload/v1/covers/dune", "x")
                .is_none()
        );
    }
}
