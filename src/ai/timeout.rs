//! Per-Call Timeouts
//!
//! Each model call is bounded by a timeout chosen from the client class.
//! Mobile clients get the longer budget since their networks are slower.
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let result = with_timeout(
//!     config.for_client(ClientClass::Mobile),
//!     async { /* LLM call */ },
//!     "LLM request"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::constants::llm as llm_constants;
use crate::types::{ClientClass, FitError, Result};

/// Timeouts per client class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Desktop and server callers (default: 30 seconds)
    pub standard: Duration,
    /// Mobile callers (default: 60 seconds)
    pub mobile: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            standard: Duration::from_secs(llm_constants::STANDARD_TIMEOUT_SECS),
            mobile: Duration::from_secs(llm_constants::MOBILE_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        Self {
            standard: config.timeout_for(ClientClass::Standard),
            mobile: config.timeout_for(ClientClass::Mobile),
        }
    }

    pub fn for_client(&self, client: ClientClass) -> Duration {
        match client {
            ClientClass::Standard => self.standard,
            ClientClass::Mobile => self.mobile,
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns `FitError::Timeout` if the operation doesn't complete within the
/// specified duration. The inner future is dropped on expiry.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(FitError::timeout(operation_name, timeout)),
    }
}
