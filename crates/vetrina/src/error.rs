//! Error taxonomy for the materialization pipeline.
//!
//! Every fallible operation in this crate returns [`Error`]. The variants
//! are part of the public contract: callers (the authoring UI, the batch
//! runner, the provisioning API) match on them to decide whether to retry,
//! re-read, or surface the failure to an operator.
//!
//! [`SchemaViolation`](Error::SchemaViolation) and
//! [`UnknownPage`](Error::UnknownPage) are never coerced into defaults —
//! malformed content must be caught at the authoring surface, not at
//! render time.

use crate::site::SiteId;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the preset store, registry, resolver, and materializer.
#[derive(Debug, Error)]
pub enum Error {
    /// No preset document exists under the given id.
    #[error("preset '{0}' not found")]
    PresetNotFound(String),

    /// A preset with this id already exists in the store.
    #[error("preset '{0}' already exists")]
    PresetExists(String),

    /// A preset delete was refused because live site instances still
    /// reference it.
    #[error("preset '{preset}' is still referenced by {sites} site instance(s)")]
    PresetInUse { preset: String, sites: usize },

    /// No site instance exists under the given id.
    #[error("site {0} not found")]
    SiteNotFound(SiteId),

    /// A site instance with this id is already provisioned.
    #[error("site {0} already exists")]
    SiteExists(SiteId),

    /// Another site instance already owns this tenant slug.
    #[error("slug '{0}' is already taken by another site")]
    DuplicateSlug(String),

    /// An override write targeted a page slug the site's preset does not
    /// define.
    #[error("page '{0}' has no definition in the site's preset")]
    UnknownPage(String),

    /// Resolution asked for a page slug absent from the current preset.
    /// Raised even when a stale override for the slug is still stored.
    #[error("page '{page}' not found in preset '{preset}'")]
    PageNotFound { preset: String, page: String },

    /// Content failed validation against its page's content schema.
    #[error("content failed schema validation: {0}")]
    SchemaViolation(String),

    /// A preset replace raced with another writer. The caller retries with
    /// a fresh read; the store never retries internally.
    #[error(
        "preset '{preset}' was modified concurrently (expected version {expected}, found {found})"
    )]
    VersionConflict {
        preset: String,
        expected: u32,
        found: u32,
    },

    /// Transient store I/O failure. Retryable with backoff at the call
    /// site; see [`crate::retry`].
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Error {
    /// Whether this error is transient and worth retrying with backoff.
    ///
    /// Only store I/O failures qualify. `VersionConflict` in particular is
    /// *not* transient here — retrying without a fresh read would just
    /// conflict again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Map a filesystem error into the store taxonomy.
    pub(crate) fn store(context: &str, err: std::io::Error) -> Self {
        Self::StoreUnavailable(format!("{context}: {err}"))
    }
}
