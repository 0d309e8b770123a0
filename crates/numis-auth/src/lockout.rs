//! Consecutive-failure lockout.
//!
//! Pure state transitions over [`LockoutState`]; persisting the result
//! atomically is the caller's job (see `AccountRepository::compare_and_set_lockout`).

use chrono::{DateTime, Duration, Utc};
use numis_core::models::account::LockoutState;

use crate::config::AuthConfig;

/// Whether an account may attempt to authenticate right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Open,
    Locked {
        until: DateTime<Utc>,
        /// Whole minutes left, rounded up, never below 1.
        remaining_minutes: i64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub cooldown: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_config(&AuthConfig::default())
    }
}

impl LockoutPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_login_attempts.max(1),
            cooldown: Duration::seconds(config.lockout_duration_secs as i64),
        }
    }

    pub fn status(&self, state: &LockoutState, now: DateTime<Utc>) -> LockStatus {
        match state.locked_until {
            Some(until) if until > now => {
                let secs = (until - now).num_seconds();
                LockStatus::Locked {
                    until,
                    remaining_minutes: ((secs + 59) / 60).max(1),
                }
            }
            _ => LockStatus::Open,
        }
    }

    /// Next state after a failed password or code check.
    ///
    /// A failure after an expired lock starts a fresh window at 1.
    pub fn register_failure(&self, state: &LockoutState, now: DateTime<Utc>) -> LockoutState {
        let lock_expired = matches!(state.locked_until, Some(until) if until <= now);
        let failed_attempts = if lock_expired {
            1
        } else {
            state.failed_attempts.saturating_add(1)
        };

        let locked_until = if failed_attempts >= self.max_failed_attempts {
            Some(now + self.cooldown)
        } else {
            None
        };

        LockoutState {
            failed_attempts,
            locked_until,
        }
    }

    /// State after a fully successful authentication.
    pub fn reset(&self) -> LockoutState {
        LockoutState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy {
            max_failed_attempts: 5,
            cooldown: Duration::minutes(15),
        }
    }

    #[test]
    fn fifth_failure_locks() {
        let p = policy();
        let now = Utc::now();
        let mut state = LockoutState::default();
        for i in 1..5 {
            state = p.register_failure(&state, now);
            assert_eq!(state.failed_attempts, i);
            assert_eq!(p.status(&state, now), LockStatus::Open);
        }
        state = p.register_failure(&state, now);
        assert_eq!(state.failed_attempts, 5);
        assert_eq!(state.locked_until, Some(now + Duration::minutes(15)));
        assert!(matches!(
            p.status(&state, now),
            LockStatus::Locked {
                remaining_minutes: 15,
                ..
            }
        ));
    }

    #[test]
    fn remaining_minutes_round_up() {
        let p = policy();
        let now = Utc::now();
        let state = LockoutState {
            failed_attempts: 5,
            locked_until: Some(now + Duration::seconds(61)),
        };
        assert!(matches!(
            p.status(&state, now),
            LockStatus::Locked {
                remaining_minutes: 2,
                ..
            }
        ));

        let state = LockoutState {
            failed_attempts: 5,
            locked_until: Some(now + Duration::milliseconds(300)),
        };
        assert!(matches!(
            p.status(&state, now),
            LockStatus::Locked {
                remaining_minutes: 1,
                ..
            }
        ));
    }

    #[test]
    fn lock_expires_passively() {
        let p = policy();
        let now = Utc::now();
        let state = LockoutState {
            failed_attempts: 5,
            locked_until: Some(now),
        };
        assert_eq!(p.status(&state, now), LockStatus::Open);
    }

    #[test]
    fn failure_after_expiry_restarts_count() {
        let p = policy();
        let now = Utc::now();
        let state = LockoutState {
            failed_attempts: 5,
            locked_until: Some(now - Duration::seconds(1)),
        };
        let next = p.register_failure(&state, now);
        assert_eq!(next.failed_attempts, 1);
        assert_eq!(next.locked_until, None);
    }

    #[test]
    fn reset_clears_everything() {
        assert_eq!(policy().reset(), LockoutState::default());
    }

    #[test]
    fn from_config_uses_configured_values() {
        let config = AuthConfig {
            max_failed_login_attempts: 3,
            lockout_duration_secs: 60,
            ..Default::default()
        };
        let p = LockoutPolicy::from_config(&config);
        assert_eq!(p.max_failed_attempts, 3);
        assert_eq!(p.cooldown, Duration::minutes(1));
    }
}
