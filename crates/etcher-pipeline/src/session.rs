//! Latest-wins bookkeeping for repeated runs.
//!
//! A front end re-runs the pipeline every time a control moves, and
//! runs may finish out of order when dispatched to background threads.
//! Each run takes a [`RunTicket`] from [`Session::begin`]; when it
//! finishes, [`Session::publish`] keeps its outputs only if no newer
//! ticket has been issued since. A stale or failed run never replaces
//! what is already published.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::face::FaceDetector;
use crate::params::ParameterBundle;
use crate::types::{OutputSet, PipelineError};

/// Proof that a run was started, ordered by start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    /// Monotonically increasing run number, starting at 1.
    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct State {
    issued: u64,
    published: Option<(u64, Arc<OutputSet>)>,
}

/// Holds the most recent published [`OutputSet`].
///
/// Cheap to share across threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<State>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a run and return its ticket.
    #[must_use = "the ticket is needed to publish the run"]
    pub fn begin(&self) -> RunTicket {
        let mut state = self.lock();
        state.issued += 1;
        RunTicket {
            generation: state.issued,
        }
    }

    /// Offer the outputs of a finished run.
    ///
    /// Returns `true` if they were stored, `false` if a newer run has
    /// started since `ticket` was issued.
    #[must_use = "a stale run's outputs are discarded"]
    pub fn publish(&self, ticket: RunTicket, outputs: OutputSet) -> bool {
        let mut state = self.lock();
        if ticket.generation != state.issued {
            debug!(
                generation = ticket.generation,
                latest = state.issued,
                "dropping stale run"
            );
            return false;
        }
        state.published = Some((ticket.generation, Arc::new(outputs)));
        true
    }

    /// The most recently published outputs, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<OutputSet>> {
        self.lock().published.as_ref().map(|(_, set)| Arc::clone(set))
    }

    /// Generation of the most recently published outputs.
    #[must_use]
    pub fn published_generation(&self) -> Option<u64> {
        self.lock().published.as_ref().map(|(generation, _)| *generation)
    }

    /// Begin, process and publish in one call.
    ///
    /// Returns whether the outputs were published.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error if the run fails; the previously
    /// published outputs are left in place.
    pub fn run(
        &self,
        image_bytes: &[u8],
        params: &ParameterBundle,
        detector: Option<&dyn FaceDetector>,
    ) -> Result<bool, PipelineError> {
        let ticket = self.begin();
        let outputs = crate::process(image_bytes, params, detector)?;
        Ok(self.publish(ticket, outputs))
    }
}
