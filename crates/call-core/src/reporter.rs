//! OS telephony subsystem interface
//!
//! The reporter renders the native call UI. The reconciler tells it that calls
//! exist, connect and end, and requests OS transactions for app-initiated
//! actions. The OS answers with [`PendingAction`](crate::PendingAction)s that
//! reach the reconciler through its handle, and every one of them must come
//! back through [`TelephonyReporter::acknowledge`] or the OS treats the action
//! as timed out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CallSyncResult;
use crate::intent::{Acknowledgement, ActionId};
use crate::types::CallToken;

/// Call attributes shown by the OS call UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUpdate {
    /// Remote party handle
    pub remote_handle: String,
    /// Whether the UI offers hold
    pub supports_holding: bool,
    /// Whether the UI offers a keypad
    pub supports_dtmf: bool,
    /// Whether the call has video
    pub has_video: bool,
}

/// App-initiated transaction submitted to the OS call controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallRequest {
    /// Start an outgoing call; the OS answers with a start-outgoing intent
    StartCall { token: CallToken, remote_handle: String },
    /// Answer the ringing call; the OS answers with an answer intent
    Answer { token: CallToken },
    /// End the call; the OS answers with an end intent
    End { token: CallToken },
}

impl CallRequest {
    pub fn token(&self) -> CallToken {
        match self {
            CallRequest::StartCall { token, .. }
            | CallRequest::Answer { token }
            | CallRequest::End { token } => *token,
        }
    }
}

/// Telephony-session reporter
#[async_trait]
pub trait TelephonyReporter: Send + Sync {
    /// Show the incoming-call UI
    async fn report_new_incoming(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()>;

    /// Update the OS record of an outgoing call
    async fn report_outgoing(&self, token: CallToken, update: CallUpdate) -> CallSyncResult<()>;

    /// The outgoing call was answered by the remote
    async fn report_connected(&self, token: CallToken) -> CallSyncResult<()>;

    /// The call ended without an OS end action
    async fn report_ended(&self, token: CallToken, reason: &str) -> CallSyncResult<()>;

    /// Submit a transaction to the OS call controller
    async fn request_transaction(&self, request: CallRequest) -> CallSyncResult<()>;

    /// Fulfill or fail a pending OS action
    fn acknowledge(&self, action: ActionId, ack: Acknowledgement);
}
