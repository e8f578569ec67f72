//! Auth gate in front of the book list.
//!
//! The gate walks a fixed sequence against a [`LocalAuthenticator`]: hardware
//! capability, enrollment, then the challenge itself. Every outcome other
//! than success leaves a dismissible [`Notice`] and waits for a manual retry.

mod passcode;

use log::{error, info, warn};
use thiserror::Error;

pub use passcode::{PasscodeError, PasscodeVault, MIN_PASSCODE_LEN, PASSCODE_KEY};

/// Prompt shown by the platform challenge.
pub const PROMPT_MESSAGE: &str = "Authenticate to access Book App";
/// Label of the fallback action offered by the challenge.
pub const FALLBACK_LABEL: &str = "Use Passcode";

/// A failure reported by the platform while answering one of the queries.
#[derive(Debug, Error)]
#[error("authentication platform error: {0}")]
pub struct AuthError(pub String);

/// Options passed to the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeOptions {
    pub prompt_message: String,
    pub fallback_label: String,
}

impl Default for ChallengeOptions {
    fn default() -> Self {
        Self {
            prompt_message: PROMPT_MESSAGE.to_string(),
            fallback_label: FALLBACK_LABEL.to_string(),
        }
    }
}

/// Outcome of a completed challenge. `error` names the reason of a failure
/// when the platform supplies one (`"user_cancel"`, `"mismatch"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeResult {
    pub success: bool,
    pub error: Option<String>,
}

impl ChallengeResult {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Device-local authentication capability.
pub trait LocalAuthenticator {
    fn has_hardware(&mut self) -> Result<bool, AuthError>;
    fn is_enrolled(&mut self) -> Result<bool, AuthError>;
    fn authenticate(&mut self, options: &ChallengeOptions) -> Result<ChallengeResult, AuthError>;
}

/// Why the gate cannot even start a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    NoHardware,
    NotEnrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Checking,
    Authenticated,
    Unavailable(Unavailable),
    Failed,
}

/// Dismissible message produced by a gate attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: &'static str,
    pub message: &'static str,
}

const NO_HARDWARE: Notice = Notice {
    title: "Error",
    message: "Device not compatible with biometric auth",
};
const NOT_ENROLLED: Notice = Notice {
    title: "Error",
    message: "No biometrics/PIN enrolled on this device",
};
const CHALLENGE_FAILED: Notice = Notice {
    title: "Failed",
    message: "Authentication failed, try again.",
};
const PLATFORM_ERROR: Notice = Notice {
    title: "Error",
    message: "Authentication error occurred",
};

/// Session value owned by the application controller. It is never persisted,
/// so every launch starts locked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn grant(&mut self) {
        self.authenticated = true;
    }
}

/// Gate state machine. Starts in `Checking` with an attempt pending, which is
/// the "on mount" run; [`AuthGate::retry`] queues another.
#[derive(Debug)]
pub struct AuthGate {
    status: AuthStatus,
    notice: Option<Notice>,
    pending: bool,
    notified: bool,
    options: ChallengeOptions,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    pub fn new() -> Self {
        Self {
            status: AuthStatus::Checking,
            notice: None,
            pending: true,
            notified: false,
            options: ChallengeOptions::default(),
        }
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// True while an attempt is queued and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Manual "try again". Ignored once authenticated.
    pub fn retry(&mut self) {
        if self.status == AuthStatus::Authenticated {
            return;
        }
        self.status = AuthStatus::Checking;
        self.notice = None;
        self.pending = true;
    }

    /// Run one attempt. `on_success` fires at most once over the gate's
    /// lifetime, on the first successful challenge.
    pub fn authenticate<A>(&mut self, authenticator: &mut A, on_success: impl FnOnce()) -> AuthStatus
    where
        A: LocalAuthenticator + ?Sized,
    {
        self.pending = false;
        self.status = AuthStatus::Checking;
        self.notice = None;

        let (status, notice) = match self.run_sequence(authenticator) {
            Ok(status) => (status, notice_for(status)),
            Err(err) => {
                error!("event=auth_attempt module=auth status=error error={err}");
                (AuthStatus::Failed, Some(PLATFORM_ERROR))
            }
        };
        self.status = status;
        self.notice = notice;

        if status == AuthStatus::Authenticated && !self.notified {
            self.notified = true;
            info!("event=auth_attempt module=auth status=ok");
            on_success();
        }
        status
    }

    fn run_sequence<A>(&self, authenticator: &mut A) -> Result<AuthStatus, AuthError>
    where
        A: LocalAuthenticator + ?Sized,
    {
        if !authenticator.has_hardware()? {
            warn!("event=auth_attempt module=auth status=unavailable reason=no_hardware");
            return Ok(AuthStatus::Unavailable(Unavailable::NoHardware));
        }
        if !authenticator.is_enrolled()? {
            warn!("event=auth_attempt module=auth status=unavailable reason=not_enrolled");
            return Ok(AuthStatus::Unavailable(Unavailable::NotEnrolled));
        }

        let result = authenticator.authenticate(&self.options)?;
        if result.success {
            Ok(AuthStatus::Authenticated)
        } else {
            warn!(
                "event=auth_attempt module=auth status=failed reason={}",
                result.error.as_deref().unwrap_or("unknown")
            );
            Ok(AuthStatus::Failed)
        }
    }
}

fn notice_for(status: AuthStatus) -> Option<Notice> {
    match status {
        AuthStatus::Checking | AuthStatus::Authenticated => None,
        AuthStatus::Unavailable(Unavailable::NoHardware) => Some(NO_HARDWARE),
        AuthStatus::Unavailable(Unavailable::NotEnrolled) => Some(NOT_ENROLLED),
        AuthStatus::Failed => Some(CHALLENGE_FAILED),
    }
}
