use crate::error::GncError;
use crate::vessel::{RotationCommand, Vessel};
use crate::warn;

/// Outcome of one phase tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    InProgress,
    Done,
}

impl PhaseStatus {
    pub fn is_done(self) -> bool {
        self == PhaseStatus::Done
    }
}

/// A flight phase driven by an external loop.
///
/// Implement this to create phases that can be plugged into the flight
/// runner or sequenced by a mission. `tick` never blocks; it samples the
/// vessel, writes commands and reports whether the phase has finished.
pub trait PhaseController<V: Vessel + ?Sized> {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<V: Vessel + ?Sized, P: PhaseController<V> + ?Sized> PhaseController<V> for Box<P> {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        (**self).tick(vessel)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ---------------------------------------------------------------------------
// Deadline wrapper
// ---------------------------------------------------------------------------

/// Fails the wrapped phase once vessel time passes `start + limit`, leaving
/// the engine off and the controls centred. The clock starts on the first
/// tick.
#[derive(Debug, Clone)]
pub struct Deadline<P> {
    inner: P,
    limit: f64, // s
    started_at: Option<f64>,
}

impl<P> Deadline<P> {
    pub fn new(inner: P, limit: f64) -> Self {
        Self { inner, limit, started_at: None }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<V: Vessel + ?Sized, P: PhaseController<V>> PhaseController<V> for Deadline<P> {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        let ut = vessel.ut();
        let start = *self.started_at.get_or_insert(ut);
        if ut - start > self.limit {
            warn!("{} exceeded its {:.0} s deadline", self.inner.name(), self.limit);
            vessel.set_throttle(0.0);
            vessel.set_rotation(RotationCommand::zero());
            return Err(GncError::DeadlineExceeded {
                phase: self.inner.name().to_string(),
                limit: self.limit,
            });
        }
        self.inner.tick(vessel)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
