//! ============================================================================
//! Core Types for the Access Controller
//! ============================================================================
//! Wire types for the registration and access-check endpoints, plus the
//! controller state machine and per-check outcomes. Serialized as JSON.
//! ============================================================================

use serde::{Deserialize, Serialize};

/// Body of `POST /api/register/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub device_id: String,
    /// Optional contact address; sent as an empty string when unknown
    pub email: String,
}

/// Response of `POST /api/register/`. Only logged by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub device_id: Option<String>,
    pub trial_days_left: Option<i64>,
    pub is_paid: Option<bool>,
    pub is_active: Option<bool>,
}

/// Body of `POST /api/check-access/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckAccessRequest {
    pub device_id: String,
}

/// Why the server refused access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    PaymentRequired,
    Maintenance,
    AccountDisabled,
    NotRegistered,
    #[serde(other)]
    Other,
}

impl DenialReason {
    /// Whether the blocking notice should offer a retry affordance
    pub fn offers_retry(&self) -> bool {
        matches!(self, DenialReason::PaymentRequired)
    }
}

/// Server-computed verdict for one access check.
///
/// `access` is required: a body without it is treated as undecodable,
/// never as a denial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessDecision {
    pub access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_paid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_days_left: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_expired: Option<bool>,
}

impl AccessDecision {
    pub fn allowed() -> Self {
        Self {
            access: true,
            warning: None,
            reason: None,
            message: None,
            is_paid: None,
            trial_days_left: None,
            trial_expired: None,
        }
    }

    pub fn denied(reason: Option<DenialReason>, message: Option<&str>) -> Self {
        Self {
            access: false,
            reason,
            message: message.map(str::to_string),
            ..Self::allowed()
        }
    }

    pub fn with_warning(mut self, warning: &str) -> Self {
        self.warning = Some(warning.to_string());
        self
    }
}

/// Lifecycle of an access controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    /// Constructed, first check not yet completed
    #[default]
    Initializing,
    /// Recurring checks are scheduled
    Polling,
    /// Access refused; terminal for this controller
    Denied,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControllerState::Denied)
    }
}

/// Blocking notice rendered when access is refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialNotice {
    pub message: String,
    pub reason: Option<DenialReason>,
    pub retry_offered: bool,
}

/// Fallback text when the server omits a denial message
pub const DEFAULT_DENIAL_MESSAGE: &str = "Access denied";

impl DenialNotice {
    pub fn from_decision(decision: &AccessDecision) -> Self {
        Self {
            message: decision
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_DENIAL_MESSAGE.to_string()),
            reason: decision.reason.clone(),
            retry_offered: decision
                .reason
                .as_ref()
                .map(DenialReason::offers_retry)
                .unwrap_or(false),
        }
    }
}

/// Transient warning shown on top of the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: u64,
    pub message: String,
}

/// What a single access check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Access granted, nothing to show
    Allowed,
    /// Access granted, banner shown with this message
    Warned(String),
    /// Access refused; controller is now Denied
    Denied(DenialNotice),
    /// Check failed in transport or decoding; treated as offline use
    Skipped(String),
    /// Controller was already Denied; no request was made
    AlreadyDenied,
}
