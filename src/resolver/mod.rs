//! Pluggable URL resolvers.
//!
//! A resolver maps a URL to a playable byte stream. Resolvers are tried in
//! registration order; the first one that claims a URL wins, and a resolver
//! that does not recognize a URL steps aside with `Resolution::NotApplicable`
//! so the next one gets a chance.

pub mod http;
pub mod youtubedl;

use crate::error::RegistryError;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncRead;
use url::Url;

/// A raw byte stream handed between pipeline stages.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// A successfully resolved URL.
pub struct ResolvedStream {
    /// The media bytes to feed into the transcoder.
    pub stream: ByteStream,
    /// Diagnostic output of the resolver, logged line by line while playing.
    pub diagnostics: Option<ByteStream>,
    pub title: Option<String>,
}

/// Outcome of asking one resolver about a URL.
pub enum Resolution {
    Matched(ResolvedStream),
    /// This resolver does not handle the URL; try the next one.
    NotApplicable,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Unique identifier of this resolver within a registry.
    fn id(&self) -> &str;

    fn display_name(&self) -> &str {
        self.id()
    }

    /// Resolve a URL to a byte stream, or signal that the URL is not for
    /// this resolver. Hard errors abort the whole resolution attempt.
    async fn resolve(&self, url: &Url, credential: Option<&str>) -> Result<Resolution>;
}

/// Ordered set of resolvers keyed by their unique id.
#[derive(Default)]
pub struct ResolverRegistry {
    entries: Mutex<Vec<Arc<dyn Resolver>>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver. Registering a duplicate id is a fatal
    /// configuration error and leaves the registry unchanged.
    pub fn register(&self, resolver: Arc<dyn Resolver>) -> Result<(), RegistryError> {
        let mut entries = self.entries.lock().expect("resolver registry lock poisoned");
        if entries.iter().any(|entry| entry.id() == resolver.id()) {
            return Err(RegistryError::DuplicateResolver(resolver.id().to_string()));
        }
        entries.push(resolver);
        Ok(())
    }

    /// Remove a resolver by id. No-op if absent.
    pub fn unregister(&self, id: &str) {
        let mut entries = self.entries.lock().expect("resolver registry lock poisoned");
        entries.retain(|entry| entry.id() != id);
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<dyn Resolver>> {
        let entries = self.entries.lock().expect("resolver registry lock poisoned");
        entries.iter().find(|entry| entry.id() == id).cloned()
    }

    fn snapshot(&self) -> Vec<Arc<dyn Resolver>> {
        let entries = self.entries.lock().expect("resolver registry lock poisoned");
        entries.clone()
    }

    /// Try all registered resolvers in registration order. Returns `Ok(None)`
    /// when no resolver claimed the URL; the caller treats that as an
    /// unsupported URL.
    pub async fn resolve(
        &self,
        url: &Url,
        credential: Option<&str>,
    ) -> Result<Option<ResolvedStream>> {
        let entries = self.snapshot();
        anyhow::ensure!(!entries.is_empty(), "no resolvers are registered");

        for resolver in entries {
            match resolver.resolve(url, credential).await? {
                Resolution::Matched(resolved) => {
                    debug!("Resolver {} matched {}", resolver.display_name(), url);
                    return Ok(Some(resolved));
                }
                Resolution::NotApplicable => continue,
            }
        }

        // No resolver has been found that works with this URL.
        Ok(None)
    }
}
