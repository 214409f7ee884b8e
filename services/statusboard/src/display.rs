//! Display surface abstraction
//!
//! The rendered status document lives in a single message on an external
//! messaging system. Failures distinguish a vanished message or channel
//! (`StatusboardError::NotFound`) from missing permissions
//! (`StatusboardError::Forbidden`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::render::DisplayDocument;

/// Location of the status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRef {
    pub channel_id: u64,
    pub message_id: u64,
}

/// Messaging system hosting the rendered status document
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait DisplaySurface: Send + Sync {
    /// Post a new message and return where it landed
    async fn post_message(
        &self,
        channel_id: u64,
        document: &DisplayDocument,
    ) -> crate::Result<DisplayRef>;

    /// Replace the content of an existing message
    async fn edit_message(&self, display: DisplayRef, document: &DisplayDocument)
        -> crate::Result<()>;

    async fn delete_message(&self, display: DisplayRef) -> crate::Result<()>;

    /// Check that the message still exists and is reachable
    async fn fetch_message(&self, display: DisplayRef) -> crate::Result<()>;

    /// Guild owning a channel, used as the context for presence lookups
    async fn channel_guild(&self, channel_id: u64) -> crate::Result<u64>;
}
