//! Per-invocation lifecycle state machine
//!
//! One `Lifecycle` value exists per show invocation. It consumes the
//! normalized [`AdEvent`] stream and tells the controller what to do next.
//! The settle point is unique by construction: once `on_event` has
//! returned [`Step::Settle`], every later event collapses to
//! [`Step::Ignore`], so callback races in the ad network (closed racing
//! earned-reward, duplicate error callbacks) cannot produce a second
//! outcome.

use ag_core::AdType;

use crate::provider::AdEvent;

/// Where the invocation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Load issued, nothing heard back yet.
    Requested,
    /// Network reported the unit loaded.
    Loaded,
    /// Unit is on screen.
    Showing,
    /// Terminal: dismissed (or reward earned).
    Closed,
    /// Terminal: network failure.
    Errored,
}

/// What the controller should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Call `show()` on the unit.
    Show,
    /// Side effect only (status bar, analytics); no lifecycle action.
    Note,
    /// Settle the invocation with this outcome. Emitted at most once.
    Settle(bool),
    /// Event arrived out of order or after settlement; drop it.
    Ignore,
}

/// State machine for one show invocation.
#[derive(Debug)]
pub struct Lifecycle {
    ad_type: AdType,
    phase: Phase,
    settled: bool,
}

impl Lifecycle {
    pub fn new(ad_type: AdType) -> Self {
        Self {
            ad_type,
            phase: Phase::Requested,
            settled: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Advance on a network event. First settling event wins.
    pub fn on_event(&mut self, event: &AdEvent) -> Step {
        if self.settled {
            return Step::Ignore;
        }

        match event {
            AdEvent::Loaded => {
                if self.phase == Phase::Requested {
                    self.phase = Phase::Loaded;
                    Step::Show
                } else {
                    Step::Ignore
                }
            }
            AdEvent::Opened => {
                if self.phase == Phase::Loaded {
                    self.phase = Phase::Showing;
                }
                Step::Note
            }
            AdEvent::Closed => {
                self.phase = Phase::Closed;
                self.settled = true;
                // A rewarded unit dismissed without an earned-reward event
                // means the reward was not earned.
                Step::Settle(self.ad_type != AdType::Rewarded)
            }
            AdEvent::EarnedReward => {
                if self.ad_type == AdType::Rewarded {
                    self.phase = Phase::Closed;
                    self.settled = true;
                    Step::Settle(true)
                } else {
                    Step::Ignore
                }
            }
            AdEvent::Error(_) => {
                self.phase = Phase::Errored;
                self.settled = true;
                Step::Settle(false)
            }
        }
    }
}
