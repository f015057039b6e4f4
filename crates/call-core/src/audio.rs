//! Audio session controller interface
//!
//! Only the OS may activate or deactivate the audio hardware session. The
//! controller configures it when a call is about to carry audio; activation
//! and deactivation come back as [`AudioSessionEvent`](crate::AudioSessionEvent)s
//! which the reconciler relays to the engine.

use async_trait::async_trait;

use crate::error::CallSyncResult;

#[async_trait]
pub trait AudioSessionController: Send + Sync {
    /// Configure the platform audio session for voice
    async fn configure(&self) -> CallSyncResult<()>;
}
