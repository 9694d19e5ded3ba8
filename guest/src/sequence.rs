//! Boot sequence: signal, then hand off
//!
//! `SignalPending -> SignalEmitted -> HandoffExecuted`. The first transition
//! is taken whatever the signal outcome. The second is terminal: the process
//! image is replaced, or the caller exits with the hand-off error.

use std::ffi::OsStr;

use log::debug;

use crate::error::HandoffError;
use crate::handoff::Handoff;
use crate::signal::{BootSignal, SignalOutcome};

/// Boot stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStage {
    SignalPending,
    SignalEmitted,
    HandoffExecuted,
}

/// Drives a [`BootSignal`] and the init hand-off in order
pub struct BootSequence<S: BootSignal> {
    signal: S,
    stage: BootStage,
    outcome: Option<SignalOutcome>,
}

impl<S: BootSignal> BootSequence<S> {
    pub fn new(signal: S) -> Self {
        Self {
            signal,
            stage: BootStage::SignalPending,
            outcome: None,
        }
    }

    pub fn stage(&self) -> BootStage {
        self.stage
    }

    /// Outcome of the signal step, once it has run
    pub fn outcome(&self) -> Option<SignalOutcome> {
        self.outcome
    }

    /// Emit the boot signal. Emits at most once per sequence.
    pub fn signal(&mut self) -> SignalOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = self.signal.emit();
        match outcome {
            SignalOutcome::Emitted => debug!("boot signal emitted"),
            SignalOutcome::Skipped(e) => {
                debug!("boot signal skipped: {} (code {:#x})", e, e.as_error_code())
            }
        }
        self.outcome = Some(outcome);
        self.advance(BootStage::SignalEmitted);
        outcome
    }

    /// Exec into init, emitting the signal first if it has not run yet.
    /// Only returns on failure.
    pub fn hand_off<I, A>(&mut self, handoff: &Handoff, args: I) -> HandoffError
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.signal();
        let prepared = handoff.prepare(args);
        self.advance(BootStage::HandoffExecuted);
        match prepared {
            Ok(prepared) => {
                debug!("exec {:?} argv {:?}", prepared.path(), prepared.argv());
                prepared.exec()
            }
            Err(e) => e,
        }
    }

    fn advance(&mut self, next: BootStage) {
        if self.stage != next {
            debug!("boot stage {:?} -> {:?}", self.stage, next);
            self.stage = next;
        }
    }
}
