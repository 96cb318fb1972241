//! External-URI resolution capability.
//!
//! A locally bound address (`http://127.0.0.1:3000`) is not necessarily the
//! address the requesting user can browse to — under tunneled or remote
//! development the host environment remaps local ports onto forwarded
//! endpoints. Implementations of [`ExternalUriResolver`] perform that
//! remapping; [`LoopbackResolver`] is the identity used for plain local runs
//! and tests.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failure while resolving an externally reachable URI.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid local uri: {0}")]
    InvalidUri(#[from] url::ParseError),

    #[error("external resolution failed for {uri}: {reason}")]
    Failed { uri: Url, reason: String },
}

/// Maps a local `scheme://host:port/path` URI to its externally reachable
/// equivalent.
#[async_trait]
pub trait ExternalUriResolver: Send + Sync {
    async fn resolve(&self, local: &Url) -> Result<Url, ResolveError>;
}

/// Identity resolver: the local address is already the external address.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackResolver;

#[async_trait]
impl ExternalUriResolver for LoopbackResolver {
    async fn resolve(&self, local: &Url) -> Result<Url, ResolveError> {
        Ok(local.clone())
    }
}
