//! Time-delayed views of other signals.
//!
//! A delay line keeps `(step_size, snapshot)` pairs, most recent first. The
//! newest snapshot is treated as being one step old, so walking the history
//! accumulates the step sizes until the configured delay is covered. The
//! delayed value is interpolated between the snapshot that covers the delay
//! and the next newer one; anything older is dropped.

use std::collections::VecDeque;

use sp_core::{Real, ensure_non_negative};
use tracing::trace;

use crate::error::{SignalError, SignalResult};
use crate::signal::{Signal, SignalId, check_order, check_step_size};

/// A signal that replays `source` shifted by `delay` seconds.
///
/// Until enough history has accumulated to cover the delay the value is all
/// zeros. A zero delay passes the current source state straight through.
///
/// A delay shorter than the current step is covered by the newest snapshot
/// alone, which has no newer neighbour. The value is then interpolated from a
/// zero origin, `delay / step_size * source`, on every step and not only
/// during warm-up. With `delay = h / 2` the output stays at half the source.
/// Composites that subtract a delayed view from its source (the Smith
/// predictor error) therefore need `delay == 0` or `delay >= step_size`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delayed {
    signal: Signal,
    source: SignalId,
    delay: Real,
    history: VecDeque<(Real, Vec<Real>)>,
}

impl Delayed {
    /// Create a delay line over `source`, which must have the given `order`.
    ///
    /// # Errors
    ///
    /// [`SignalError::Configuration`] if `delay` is negative or not finite, or
    /// if `order` exceeds [`MAX_ORDER`](crate::MAX_ORDER).
    pub fn new(source: SignalId, order: usize, delay: Real) -> SignalResult<Self> {
        let order = check_order(order)?;
        let delay = ensure_non_negative(delay, "delay must be finite and non-negative")?;
        Ok(Self {
            signal: Signal::new(order),
            source,
            delay,
            history: VecDeque::new(),
        })
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn source(&self) -> SignalId {
        self.source
    }

    pub fn delay(&self) -> Real {
        self.delay
    }

    /// Number of retained snapshots.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Total time covered by the retained snapshots.
    pub fn history_span(&self) -> Real {
        self.history.iter().map(|(h, _)| h).sum()
    }

    /// Record the source state for this step and rebuild the delayed value.
    ///
    /// `source_values` is the source's value sequence at call time, so the
    /// source has to be stepped first within a tick.
    pub fn step_with(&mut self, source_values: &[Real], step_size: Real) -> SignalResult<&[Real]> {
        let h = check_step_size(step_size)?;
        if source_values.len() != self.signal.values().len() {
            return Err(SignalError::InvalidReference {
                what: format!(
                    "delayed order {} does not match source length {}",
                    self.signal.order(),
                    source_values.len()
                ),
            });
        }

        self.history.push_front((h, source_values.to_vec()));

        if self.delay == 0.0 {
            self.history.truncate(1);
            self.signal.overwrite(source_values);
            return Ok(self.signal.values());
        }

        let mut covered: Real = 0.0;
        let mut covered_before: Real = 0.0;
        let mut bracket = None;
        for (i, (dt, _)) in self.history.iter().enumerate() {
            covered_before = covered;
            covered += dt;
            if covered >= self.delay {
                bracket = Some(i);
                break;
            }
        }

        let Some(i) = bracket else {
            trace!(
                snapshots = self.history.len(),
                covered,
                delay = self.delay,
                "delay line warming up"
            );
            self.signal.clear();
            return Ok(self.signal.values());
        };

        let (dt, older) = &self.history[i];
        let c = (self.delay - covered_before) / dt;
        let value: Vec<Real> = if i == 0 {
            // no newer snapshot: interpolate from the zero origin
            older.iter().map(|v| c * v).collect()
        } else {
            let newer = &self.history[i - 1].1;
            newer
                .iter()
                .zip(older)
                .map(|(n, o)| n + c * (o - n))
                .collect()
        };

        self.history.truncate(i + 1);
        trace!(
            snapshots = self.history.len(),
            bracket = i,
            fraction = c,
            "delay line sampled"
        );
        self.signal.overwrite(&value);
        Ok(self.signal.values())
    }

    /// Zero the value and drop all history, restarting warm-up.
    pub fn clear(&mut self) {
        self.signal.clear();
        self.history.clear();
    }
}
