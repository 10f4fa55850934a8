//! Object-store URL normalization.
//!
//! Stored asset URLs look like
//! `https://res.cloudinary.com/<cloud>/raw/upload/v173.../books/war-and-peace.pdf`,
//! except that legacy rows carry the `.pdf` suffix inconsistently: the upload
//! path strips it before persisting while some delivery forms require it.
//! `AssetUrl` extracts the store-assigned public identifier and can
//! reconstruct a retrieval URL in either form on demand.

use url::Url;

use super::error::MediaError;

/// A normalized object-store URL.
///
/// Produced by splitting the URL path on the `upload` segment: the segment
/// after it is the version tag and the remainder is the object path. A
/// case-insensitive `.pdf` suffix on the object path is stripped to obtain
/// the public identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrl {
    /// Everything up to (not including) the `upload` segment,
    /// e.g. `https://res.cloudinary.com/demo/raw`.
    prefix: String,
    /// Version tag with the leading `v` stripped, e.g. `1734567890`.
    version: String,
    /// Object path without any `.pdf` suffix, e.g. `books/war-and-peace`.
    public_id: String,
}

impl AssetUrl {
    /// Parse a stored asset URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::InvalidAssetUrl` if the URL is unparseable, has
    /// no `upload` path segment, or has nothing after the version segment.
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let parsed =
            Url::parse(raw).map_err(|_| MediaError::InvalidAssetUrl(raw.to_owned()))?;

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(Iterator::collect)
            .unwrap_or_default();

        let upload_pos = segments
            .iter()
            .position(|s| *s == "upload")
            .ok_or_else(|| MediaError::InvalidAssetUrl(raw.to_owned()))?;

        let version = segments
            .get(upload_pos + 1)
            .copied()
            .ok_or_else(|| MediaError::InvalidAssetUrl(raw.to_owned()))?;
        let version = version.strip_prefix('v').unwrap_or(version).to_owned();

        let object_path = segments
            .get(upload_pos + 2..)
            .filter(|rest| !rest.is_empty())
            .map(|rest| rest.join("/"))
            .ok_or_else(|| MediaError::InvalidAssetUrl(raw.to_owned()))?;

        let public_id = strip_pdf_suffix(&object_path);

        let host = parsed
            .host_str()
            .ok_or_else(|| MediaError::InvalidAssetUrl(raw.to_owned()))?;
        let mut prefix = format!("{}://{host}", parsed.scheme());
        if let Some(port) = parsed.port() {
            prefix.push_str(&format!(":{port}"));
        }
        for segment in segments.get(..upload_pos).unwrap_or_default() {
            prefix.push('/');
            prefix.push_str(segment);
        }

        Ok(Self {
            prefix,
            version,
            public_id: public_id.to_owned(),
        })
    }

    /// Whether a URL looks like it references the object store at all.
    ///
    /// Cheap pre-check for the retrieval flow; URLs failing this are fetched
    /// directly as plain HTTP resources.
    #[must_use]
    pub fn references_store(raw: &str) -> bool {
        Url::parse(raw).is_ok_and(|u| {
            u.path_segments()
                .is_some_and(|mut segments| segments.any(|s| s == "upload"))
        })
    }

    /// The store-assigned public identifier, independent of version/suffix.
    #[must_use]
    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// The version tag without its leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Reconstruct a retrieval URL.
    ///
    /// With `pdf_hint` the URL carries the explicit `.pdf` format suffix;
    /// without it the bare identifier is used. Both forms are served by the
    /// store depending on how the object was uploaded, which is exactly the
    /// inconsistency the retrieval flow probes.
    #[must_use]
    pub fn retrieval_url(&self, pdf_hint: bool) -> String {
        let suffix = if pdf_hint { ".pdf" } else { "" };
        format!(
            "{}/upload/v{}/{}{suffix}",
            self.prefix, self.version, self.public_id
        )
    }
}

/// Strip a case-insensitive `.pdf` suffix.
fn strip_pdf_suffix(path: &str) -> &str {
    let len = path.len();
    if len >= 4 && path.get(len - 4..).is_some_and(|s| s.eq_ignore_ascii_case(".pdf")) {
        path.get(..len - 4).unwrap_or(path)
    } else {
        path
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SUFFIXED: &str =
        "https://res.cloudinary.com/demo/raw/upload/v1734567890/books/war-and-peace.pdf";
    const BARE: &str =
        "https://res.cloudinary.com/demo/raw/upload/v1734567890/books/war-and-peace";

    #[test]
    fn suffixed_url_strips_pdf_from_identifier() {
        let asset = AssetUrl::parse(SUFFIXED).unwrap();
        assert_eq!(asset.public_id(), "books/war-and-peace");
        assert_eq!(asset.version(), "1734567890");
    }

    #[test]
    fn unsuffixed_url_keeps_identifier_unchanged() {
        let asset = AssetUrl::parse(BARE).unwrap();
        assert_eq!(asset.public_id(), "books/war-and-peace");
        assert_eq!(asset.retrieval_url(false), BARE);
    }

    #[test]
    fn suffix_strip_is_case_insensitive() {
        let asset = AssetUrl::parse(
            "https://res.cloudinary.com/demo/raw/upload/v42/books/loud.PDF",
        )
        .unwrap();
        assert_eq!(asset.public_id(), "books/loud");
    }

    #[test]
    fn reconstruct_with_hint_ends_in_pdf() {
        let asset = AssetUrl::parse(BARE).unwrap();
        let with_hint = asset.retrieval_url(true);
        assert!(with_hint.ends_with(".pdf"), "{with_hint}");
        assert_eq!(with_hint, SUFFIXED);
    }

    #[test]
    fn reconstruct_without_hint_has_no_suffix() {
        let asset = AssetUrl::parse(SUFFIXED).unwrap();
        let without = asset.retrieval_url(false);
        assert!(!without.ends_with(".pdf"), "{without}");
        assert_eq!(without, BARE);
    }

    #[test]
    fn missing_upload_segment_is_invalid() {
        let err = AssetUrl::parse("https://example.com/files/book.pdf").unwrap_err();
        assert!(matches!(err, MediaError::InvalidAssetUrl(_)));
    }

    #[test]
    fn missing_object_path_is_invalid() {
        let err =
            AssetUrl::parse("https://res.cloudinary.com/demo/raw/upload/v42").unwrap_err();
        assert!(matches!(err, MediaError::InvalidAssetUrl(_)));
    }

    #[test]
    fn references_store_checks_upload_segment() {
        assert!(AssetUrl::references_store(SUFFIXED));
        assert!(!AssetUrl::references_store("https://example.com/files/book.pdf"));
        assert!(!AssetUrl::references_store("not a url"));
    }

    #[test]
    fn preserves_port_and_resource_prefix() {
        let asset =
            AssetUrl::parse("http://127.0.0.1:9900/demo/raw/upload/v7/books/x.pdf").unwrap();
        assert_eq!(
            asset.retrieval_url(true),
            "http://127.0.0.1:9900/demo/raw/upload/v7/books/x.pdf"
        );
    }
}
