// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage counters checked against plan limits.
//!
//! The tracker performs no I/O and never fails. Callers ask
//! [`QuotaTracker::check_allowed`] before a gated operation, surface
//! `QuotaExceeded` themselves, and [`QuotaTracker::commit`] only once the
//! operation has succeeded. Crossing 80% of a limit emits `tracing::warn`.

use parley_core::{Identity, ParleyError, PlanTier, QuotaKind, QuotaSource, QuotaState};
use tracing::{debug, warn};

/// Fraction of a limit at which a warning is logged.
const WARN_RATIO: f64 = 0.8;

/// In-memory quota tracker for one session.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    state: QuotaState,
}

impl QuotaTracker {
    pub fn new(state: QuotaState) -> Self {
        Self { state }
    }

    /// Hydrate from a quota source, falling back to `fallback` if it fails.
    ///
    /// A failed fetch is logged and never fatal: the session runs on default
    /// quota assumptions instead.
    pub async fn from_source(
        source: &dyn QuotaSource,
        identity: Option<&Identity>,
        fallback: QuotaState,
    ) -> Self {
        match source.fetch(identity).await {
            Ok(state) => {
                debug!(plan_tier = %state.plan_tier, "quota state loaded");
                Self::new(state)
            }
            Err(e) => {
                warn!(error = %e, "quota source unavailable, using default plan limits");
                Self::new(fallback)
            }
        }
    }

    /// Whether `count` more units of `kind` fit under the plan limit.
    ///
    /// Unlimited kinds always allow. Logs a warning once usage is at or past
    /// 80% of the limit.
    pub fn check_allowed(&self, kind: QuotaKind, count: u64) -> bool {
        let Some(limit) = self.state.limit(kind) else {
            return true;
        };
        let used = self.state.used(kind);

        if used.saturating_add(count) > limit {
            return false;
        }

        if limit > 0 && used as f64 >= limit as f64 * WARN_RATIO {
            warn!(
                kind = %kind,
                used = used,
                limit = limit,
                "approaching plan quota (80%+)"
            );
        }

        true
    }

    /// Record `count` units of successful usage.
    pub fn commit(&mut self, kind: QuotaKind, count: u64) {
        let counter = match kind {
            QuotaKind::Messages => &mut self.state.messages_used,
            QuotaKind::Attachments => &mut self.state.attachments_used,
        };
        *counter = counter.saturating_add(count);
        debug!(kind = %kind, used = *counter, "quota committed");
    }

    /// Convenience: `Err(QuotaExceeded)` if `check_allowed` denies.
    pub fn require(&self, kind: QuotaKind, count: u64) -> Result<(), ParleyError> {
        if self.check_allowed(kind, count) {
            Ok(())
        } else {
            Err(ParleyError::QuotaExceeded { kind })
        }
    }

    pub fn is_unlimited(&self, kind: QuotaKind) -> bool {
        self.state.limit(kind).is_none()
    }

    /// Units left in the period. `None` means unlimited.
    pub fn remaining(&self, kind: QuotaKind) -> Option<u64> {
        self.state
            .limit(kind)
            .map(|limit| limit.saturating_sub(self.state.used(kind)))
    }

    /// Used / limit. `None` means unlimited.
    pub fn utilization(&self, kind: QuotaKind) -> Option<f64> {
        self.state.limit(kind).map(|limit| {
            if limit == 0 {
                1.0
            } else {
                self.state.used(kind) as f64 / limit as f64
            }
        })
    }

    pub fn used(&self, kind: QuotaKind) -> u64 {
        self.state.used(kind)
    }

    pub fn limit(&self, kind: QuotaKind) -> Option<u64> {
        self.state.limit(kind)
    }

    pub fn plan_tier(&self) -> PlanTier {
        self.state.plan_tier
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QuotaState {
        self.state.clone()
    }

    /// Start a new period: usage returns to zero, limits are kept.
    pub fn reset_period(&mut self) {
        self.state.messages_used = 0;
        self.state.attachments_used = 0;
        debug!(plan_tier = %self.state.plan_tier, "quota period reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;

    fn state(messages: (u64, Option<u64>), attachments: (u64, Option<u64>)) -> QuotaState {
        QuotaState {
            plan_tier: PlanTier::Free,
            messages_used: messages.0,
            message_limit: messages.1,
            attachments_used: attachments.0,
            attachment_limit: attachments.1,
        }
    }

    #[test]
    fn allows_under_limit_and_denies_at_limit() {
        let mut tracker = QuotaTracker::new(state((49, Some(50)), (0, Some(10))));
        assert!(tracker.check_allowed(QuotaKind::Messages, 1));
        tracker.commit(QuotaKind::Messages, 1);
        assert_eq!(tracker.used(QuotaKind::Messages), 50);
        assert!(!tracker.check_allowed(QuotaKind::Messages, 1));
        assert!(matches!(
            tracker.require(QuotaKind::Messages, 1),
            Err(ParleyError::QuotaExceeded {
                kind: QuotaKind::Messages
            })
        ));
    }

    #[test]
    fn multi_unit_check_counts_all_units() {
        let tracker = QuotaTracker::new(state((0, None), (8, Some(10))));
        assert!(tracker.check_allowed(QuotaKind::Attachments, 2));
        assert!(!tracker.check_allowed(QuotaKind::Attachments, 3));
        assert_eq!(tracker.remaining(QuotaKind::Attachments), Some(2));
    }

    #[test]
    fn unlimited_short_circuits() {
        let mut tracker = QuotaTracker::new(state((u64::MAX - 1, None), (0, None)));
        assert!(tracker.is_unlimited(QuotaKind::Messages));
        assert!(tracker.check_allowed(QuotaKind::Messages, 1_000));
        tracker.commit(QuotaKind::Messages, 10);
        assert_eq!(tracker.used(QuotaKind::Messages), u64::MAX);
        assert_eq!(tracker.remaining(QuotaKind::Messages), None);
        assert_eq!(tracker.utilization(QuotaKind::Messages), None);
    }

    #[test]
    fn reset_period_keeps_limits() {
        let mut tracker = QuotaTracker::new(state((50, Some(50)), (3, Some(10))));
        tracker.reset_period();
        assert_eq!(tracker.used(QuotaKind::Messages), 0);
        assert_eq!(tracker.used(QuotaKind::Attachments), 0);
        assert_eq!(tracker.limit(QuotaKind::Messages), Some(50));
    }

    #[test]
    fn utilization_reports_fraction() {
        let tracker = QuotaTracker::new(state((25, Some(50)), (0, Some(0))));
        assert_eq!(tracker.utilization(QuotaKind::Messages), Some(0.5));
        assert_eq!(tracker.utilization(QuotaKind::Attachments), Some(1.0));
    }

    #[test]
    #[tracing_test::traced_test]
    fn warns_when_past_eighty_percent() {
        let tracker = QuotaTracker::new(state((45, Some(50)), (0, None)));
        assert!(tracker.check_allowed(QuotaKind::Messages, 1));
        assert!(logs_contain("approaching plan quota"));
    }

    struct FailingSource;

    #[async_trait]
    impl QuotaSource for FailingSource {
        async fn fetch(&self, _identity: Option<&Identity>) -> Result<QuotaState, ParleyError> {
            Err(ParleyError::request_failed("unreachable"))
        }
    }

    #[tokio::test]
    async fn from_source_falls_back_on_error() {
        let fallback = state((0, Some(5)), (0, Some(1)));
        let tracker = QuotaTracker::from_source(&FailingSource, None, fallback.clone()).await;
        assert_eq!(tracker.state(), fallback);
    }

    proptest! {
        #[test]
        fn check_allowed_matches_limit_comparison(
            used in 0u64..1_000,
            limit in proptest::option::of(0u64..1_000),
        ) {
            let tracker = QuotaTracker::new(state((used, limit), (0, None)));
            let expected = match limit {
                None => true,
                Some(limit) => used < limit,
            };
            prop_assert_eq!(tracker.check_allowed(QuotaKind::Messages, 1), expected);
        }

        #[test]
        fn commit_is_monotonic(commits in proptest::collection::vec(0u64..10, 0..20)) {
            let mut tracker = QuotaTracker::new(state((0, Some(100)), (0, None)));
            let mut previous = 0;
            for n in commits {
                tracker.commit(QuotaKind::Messages, n);
                prop_assert!(tracker.used(QuotaKind::Messages) >= previous);
                previous = tracker.used(QuotaKind::Messages);
            }
        }
    }
}
