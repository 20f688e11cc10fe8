//! Time Gate Resolver
//!
//! Cooldown and lock windows are enforced by the contract from block time.
//! The client predicts them from the same on-chain reads so a gated call is
//! never submitted. Readings are not cached: block time moves between calls.

use std::fmt;

use ethers::types::Address;
use swap_chain::{RemoteError, ResourceLedger};

/// Seconds left on the cooldown and lock windows.
///
/// Negative values mean the window elapsed that many seconds ago.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeGate {
    pub cooldown_remaining: i64,
    pub lock_remaining: i64,
}

impl TimeGate {
    /// A zero timestamp means "never set" and yields zero remaining
    pub fn compute(now: u64, last_action_at: u64, locked_until: u64, cooldown: u64) -> Self {
        let lock_remaining = if locked_until == 0 {
            0
        } else {
            clamp_secs(i128::from(locked_until) - i128::from(now))
        };
        let cooldown_remaining = if last_action_at == 0 {
            0
        } else {
            clamp_secs(i128::from(last_action_at) + i128::from(cooldown) - i128::from(now))
        };

        Self {
            cooldown_remaining,
            lock_remaining,
        }
    }

    /// Both windows have elapsed
    pub fn is_open(&self) -> bool {
        self.cooldown_remaining <= 0 && self.lock_remaining <= 0
    }
}

fn clamp_secs(value: i128) -> i64 {
    value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// `"0s"`, `"45s"`, or `"1m 30s"`
pub fn format_seconds(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }
    let minutes = seconds / 60;
    let rest = seconds % 60;
    if minutes > 0 {
        format!("{minutes}m {rest}s")
    } else {
        format!("{rest}s")
    }
}

/// Second count displayed with [`format_seconds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seconds(pub i64);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_seconds(self.0))
    }
}

impl From<u64> for Seconds {
    fn from(value: u64) -> Self {
        Seconds(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

/// A time gate together with the reads it was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGateReading {
    pub account: Address,
    pub now: u64,
    pub cooldown: u64,
    pub lock_duration: u64,
    pub gate: TimeGate,
}

/// Reads the gate inputs for an account from the ledger
pub struct TimeGateResolver<'a, L: ?Sized> {
    ledger: &'a L,
}

impl<'a, L: ResourceLedger + ?Sized> TimeGateResolver<'a, L> {
    pub fn new(ledger: &'a L) -> Self {
        Self { ledger }
    }

    pub async fn resolve(&self, account: Address) -> Result<TimeGateReading, RemoteError> {
        let now = self.ledger.latest_timestamp().await?;
        let last_action_at = self.ledger.last_action_at(account).await?;
        let locked_until = self.ledger.locked_until(account).await?;
        let cooldown = self.ledger.cooldown().await?;
        let lock_duration = self.ledger.lock_duration().await?;

        Ok(TimeGateReading {
            account,
            now,
            cooldown,
            lock_duration,
            gate: TimeGate::compute(now, last_action_at, locked_until, cooldown),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use swap_chain::mock::{MockLedger, MockState};

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "0s");
        assert_eq!(format_seconds(45), "45s");
        assert_eq!(format_seconds(90), "1m 30s");
        assert_eq!(format_seconds(120), "2m 0s");
        assert_eq!(format_seconds(-5), "0s");
        assert_eq!(Seconds(61).to_string(), "1m 1s");
    }

    #[test]
    fn test_compute_remaining() {
        let gate = TimeGate::compute(1_000, 950, 1_120, 60);
        assert_eq!(gate.cooldown_remaining, 10);
        assert_eq!(gate.lock_remaining, 120);
        assert!(!gate.is_open());

        let gate = TimeGate::compute(1_000, 900, 990, 60);
        assert_eq!(gate.cooldown_remaining, -40);
        assert_eq!(gate.lock_remaining, -10);
        assert!(gate.is_open());
    }

    #[test]
    fn test_extreme_inputs_do_not_overflow() {
        let gate = TimeGate::compute(0, u64::MAX, u64::MAX, u64::MAX);
        assert_eq!(gate.cooldown_remaining, i64::MAX);
        assert_eq!(gate.lock_remaining, i64::MAX);
    }

    #[tokio::test]
    async fn test_resolve_reads_ledger() {
        let account = Address::repeat_byte(0x01);
        let mut state = MockState {
            account,
            now: 10_000,
            cooldown: 300,
            lock_duration: 600,
            ..Default::default()
        };
        state.last_action_at.insert(account, 9_900);
        state.locked_until.insert(account, 10_060);
        let ledger = MockLedger::new(state);

        let reading = TimeGateResolver::new(&ledger).resolve(account).await.unwrap();
        assert_eq!(reading.now, 10_000);
        assert_eq!(reading.lock_duration, 600);
        assert_eq!(reading.gate.cooldown_remaining, 200);
        assert_eq!(reading.gate.lock_remaining, 60);
    }

    proptest! {
        #[test]
        fn test_unset_last_action_never_cools_down(now in any::<u64>(), cooldown in any::<u64>(), locked_until in any::<u64>()) {
            let gate = TimeGate::compute(now, 0, locked_until, cooldown);
            prop_assert_eq!(gate.cooldown_remaining, 0);
        }

        #[test]
        fn test_unset_lock_never_locks(now in any::<u64>(), last_action_at in any::<u64>(), cooldown in any::<u64>()) {
            let gate = TimeGate::compute(now, last_action_at, 0, cooldown);
            prop_assert_eq!(gate.lock_remaining, 0);
        }

        #[test]
        fn test_format_non_positive_is_zero(seconds in i64::MIN..=0) {
            prop_assert_eq!(format_seconds(seconds), "0s");
        }
    }
}
