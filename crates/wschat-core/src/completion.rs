//! Completion endpoint port.
//!
//! `CompletionClient` is the opaque remote operation that makes the backend
//! produce (and persist) an assistant reply. The result carries no reply
//! text: success only means a reply row will arrive through the feed.
//!
//! `BoxCompletionClient` follows the usual blanket-impl pattern for runtime
//! selection between implementations:
//! 1. Define an object-safe `CompletionClientDyn` trait with boxed futures
//! 2. Blanket-impl `CompletionClientDyn` for all `T: CompletionClient`
//! 3. `BoxCompletionClient` wraps `Box<dyn CompletionClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;
use wschat_types::completion::CompletionRequest;
use wschat_types::error::CompletionError;

/// Remote completion operation.
pub trait CompletionClient: Send + Sync {
    /// Ask the endpoint to answer `request`.
    ///
    /// Implementations stop waiting and return `CompletionError::Cancelled`
    /// once `cancel` fires. Cancellation is best-effort on the remote side.
    fn complete(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<(), CompletionError>> + Send;
}

/// Object-safe version of [`CompletionClient`] with boxed futures.
pub trait CompletionClientDyn: Send + Sync {
    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), CompletionError>> + Send + 'a>>;
}

impl<T: CompletionClient> CompletionClientDyn for T {
    fn complete_boxed<'a>(
        &'a self,
        request: &'a CompletionRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), CompletionError>> + Send + 'a>> {
        Box::pin(self.complete(request, cancel))
    }
}

/// Type-erased completion client.
pub struct BoxCompletionClient {
    inner: Box<dyn CompletionClientDyn + Send + Sync>,
}

impl BoxCompletionClient {
    pub fn new<T: CompletionClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }
}

impl CompletionClient for BoxCompletionClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<(), CompletionError> {
        self.inner.complete_boxed(request, cancel).await
    }
}

impl std::fmt::Debug for BoxCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxCompletionClient").finish_non_exhaustive()
    }
}
