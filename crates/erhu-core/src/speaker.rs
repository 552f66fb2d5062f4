//! Shared speaker contract.
//!
//! The handheld has one tone output shared by every application. Ownership
//! is advisory and can be taken away at any time, so instead of a global
//! "is this mine" query the output hands out a [`SpeakerGrant`] on acquire.
//! The grant is the only value `start`/`stop`/`release` accept: a caller
//! whose grant has gone stale cannot clobber the new owner's tone.

/// Proof of ownership of the tone output.
///
/// Deliberately not `Clone`: there is at most one live grant per owner.
#[derive(Debug, PartialEq, Eq)]
pub struct SpeakerGrant {
    generation: u32,
}

/// Platform-agnostic speaker backend.
pub trait Speaker: Send {
    /// Try to take exclusive ownership, waiting up to `timeout_ms`.
    fn acquire(&mut self, timeout_ms: u32) -> Option<SpeakerGrant>;

    /// Start (or retune in place) the continuous tone. Ignored if `grant`
    /// is no longer the current owner.
    fn start(&mut self, grant: &SpeakerGrant, frequency_hz: f32, volume: f32);

    /// Stop tone generation. Ignored if `grant` is no longer the current
    /// owner.
    fn stop(&mut self, grant: &SpeakerGrant);

    /// Give the output back. Harmless on a stale grant.
    fn release(&mut self, grant: SpeakerGrant);
}

/// Single-owner bookkeeping shared by the speaker backends.
///
/// Each successful claim gets a fresh generation number; a grant is valid
/// only while its generation matches the recorded owner. `preempt` models
/// another application taking the output away.
pub struct Arbiter {
    owner: Option<u32>,
    next_generation: u32,
}

impl Arbiter {
    pub const fn new() -> Self {
        Self {
            owner: None,
            next_generation: 1,
        }
    }

    /// Claim the output if it is free.
    pub fn try_claim(&mut self) -> Option<SpeakerGrant> {
        if self.owner.is_some() {
            return None;
        }
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.owner = Some(generation);
        Some(SpeakerGrant { generation })
    }

    /// Take the output regardless of the current owner, invalidating any
    /// outstanding grant.
    pub fn preempt(&mut self) -> SpeakerGrant {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.owner = Some(generation);
        SpeakerGrant { generation }
    }

    /// Whether `grant` still names the current owner.
    pub fn is_current(&self, grant: &SpeakerGrant) -> bool {
        self.owner == Some(grant.generation)
    }

    /// Release the output if `grant` still owns it.
    pub fn release(&mut self, grant: SpeakerGrant) {
        if self.is_current(&grant) {
            self.owner = None;
        }
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_free_output() {
        let mut arbiter = Arbiter::new();
        let grant = arbiter.try_claim().unwrap();
        assert!(arbiter.is_current(&grant));
    }

    #[test]
    fn second_claim_fails_while_owned() {
        let mut arbiter = Arbiter::new();
        let _grant = arbiter.try_claim().unwrap();
        assert!(arbiter.try_claim().is_none());
    }

    #[test]
    fn release_frees_the_output() {
        let mut arbiter = Arbiter::new();
        let grant = arbiter.try_claim().unwrap();
        arbiter.release(grant);
        assert!(arbiter.try_claim().is_some());
    }

    #[test]
    fn preempt_invalidates_old_grant() {
        let mut arbiter = Arbiter::new();
        let old = arbiter.try_claim().unwrap();
        let new = arbiter.preempt();

        assert!(!arbiter.is_current(&old));
        assert!(arbiter.is_current(&new));

        // the stale grant cannot release the new owner's claim
        arbiter.release(old);
        assert!(arbiter.is_current(&new));
    }
}
