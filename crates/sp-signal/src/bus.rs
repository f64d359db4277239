//! Signal storage and per-node stepping.
//!
//! The bus owns every signal node and hands out [`SignalId`] handles. Nodes
//! refer to each other only through these handles, so composites can wire
//! cycles (a regulator feeding a plant that feeds back into the regulator's
//! error) without shared ownership.
//!
//! The bus does not order evaluation. [`SignalBus::step`] advances exactly one
//! node using whatever its inputs currently hold.

use sp_core::Real;
use tracing::{debug, warn};

use crate::computed::Computed;
use crate::delayed::Delayed;
use crate::error::{SignalError, SignalResult};
use crate::forced::Forced;
use crate::signal::{Signal, SignalId};

/// A signal together with its update policy.
#[derive(Debug)]
pub enum SignalNode {
    Forced(Forced),
    Computed(Computed),
    Delayed(Delayed),
}

impl SignalNode {
    pub fn signal(&self) -> &Signal {
        match self {
            Self::Forced(f) => f.signal(),
            Self::Computed(c) => c.signal(),
            Self::Delayed(d) => d.signal(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Forced(_) => "forced",
            Self::Computed(_) => "computed",
            Self::Delayed(_) => "delayed",
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Forced(f) => f.clear(),
            Self::Computed(c) => c.clear(),
            Self::Delayed(d) => d.clear(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    label: String,
    node: SignalNode,
}

/// Work gathered under a shared borrow, applied under an exclusive one.
enum Update {
    Forced,
    Computed(Real),
    Delayed(Vec<Real>),
}

/// Arena of signal nodes addressed by [`SignalId`].
#[derive(Debug, Default)]
pub struct SignalBus {
    slots: Vec<Slot>,
}

impl SignalBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a forced signal.
    pub fn add_forced(&mut self, label: impl Into<String>, forced: Forced) -> SignalId {
        self.push(label.into(), SignalNode::Forced(forced))
    }

    /// Add a computed signal. Inputs that are already bound must exist.
    pub fn add_computed(
        &mut self,
        label: impl Into<String>,
        computed: Computed,
    ) -> SignalResult<SignalId> {
        for source in computed.inputs().iter().flatten() {
            self.index(*source)?;
        }
        Ok(self.push(label.into(), SignalNode::Computed(computed)))
    }

    /// Add a delay line over `source`, matching its order.
    pub fn add_delayed(
        &mut self,
        label: impl Into<String>,
        source: SignalId,
        delay: Real,
    ) -> SignalResult<SignalId> {
        let order = self.signal(source)?.order();
        let delayed = Delayed::new(source, order, delay)?;
        Ok(self.push(label.into(), SignalNode::Delayed(delayed)))
    }

    /// Rebuild the delay line at `id` with a new delay, keeping its source.
    ///
    /// The handle stays valid but the accumulated history is discarded, so
    /// the line warms up again from zero.
    pub fn replace_delayed(&mut self, id: SignalId, delay: Real) -> SignalResult<()> {
        let idx = self.index(id)?;
        let old = self.delayed(id)?;
        let fresh = Delayed::new(old.source(), old.signal().order(), delay)?;
        if old.history_len() > 0 {
            warn!(
                signal = %self.slots[idx].label,
                old_delay = old.delay(),
                new_delay = delay,
                "delay line recreated, history discarded"
            );
        }
        self.slots[idx].node = SignalNode::Delayed(fresh);
        Ok(())
    }

    /// Label given to the node at creation.
    pub fn label(&self, id: SignalId) -> SignalResult<&str> {
        Ok(&self.slots[self.index(id)?].label)
    }

    pub fn node(&self, id: SignalId) -> SignalResult<&SignalNode> {
        Ok(&self.slots[self.index(id)?].node)
    }

    pub fn signal(&self, id: SignalId) -> SignalResult<&Signal> {
        Ok(self.node(id)?.signal())
    }

    /// Current value sequence of a signal.
    pub fn values(&self, id: SignalId) -> SignalResult<&[Real]> {
        Ok(self.signal(id)?.values())
    }

    /// Read the `i`-th derivative of a signal.
    pub fn get(&self, id: SignalId, i: usize) -> SignalResult<Real> {
        self.signal(id)?.get(i)
    }

    /// Set an initial condition. Delay lines are rebuilt from their source and
    /// cannot be written.
    pub fn set_raw(&mut self, id: SignalId, i: usize, v: Real) -> SignalResult<()> {
        let idx = self.index(id)?;
        let slot = &mut self.slots[idx];
        match &mut slot.node {
            SignalNode::Forced(f) => f.signal_mut().set_raw(i, v),
            SignalNode::Computed(c) => c.signal_mut().set_raw(i, v),
            SignalNode::Delayed(_) => Err(SignalError::InvalidReference {
                what: format!("'{}' is a delay line and cannot be set", slot.label),
            }),
        }
    }

    /// Zero a signal (and drop history for delay lines).
    pub fn clear(&mut self, id: SignalId) -> SignalResult<()> {
        let idx = self.index(id)?;
        self.slots[idx].node.clear();
        Ok(())
    }

    /// Access a delay line.
    pub fn delayed(&self, id: SignalId) -> SignalResult<&Delayed> {
        match self.node(id)? {
            SignalNode::Delayed(d) => Ok(d),
            other => Err(self.kind_mismatch(id, "delayed", other)),
        }
    }

    /// Access a computed signal.
    pub fn computed(&self, id: SignalId) -> SignalResult<&Computed> {
        match self.node(id)? {
            SignalNode::Computed(c) => Ok(c),
            other => Err(self.kind_mismatch(id, "computed", other)),
        }
    }

    /// Wire `source` into input `slot` of the computed signal `target`.
    pub fn bind_input(&mut self, target: SignalId, slot: usize, source: SignalId) -> SignalResult<()> {
        self.index(source)?;
        let idx = self.index(target)?;
        let entry = &mut self.slots[idx];
        match &mut entry.node {
            SignalNode::Computed(c) => c.bind_input(slot, source),
            other => Err(SignalError::InvalidReference {
                what: format!(
                    "'{}' is {}, only computed signals take inputs",
                    entry.label,
                    other.kind_name()
                ),
            }),
        }
    }

    /// Advance one node by `step_size`.
    ///
    /// # Errors
    ///
    /// - [`SignalError::Domain`] for a non-positive step size
    /// - [`SignalError::UninitializedReference`] if a computed input is unbound
    /// - [`SignalError::InvalidReference`] for unknown handles
    pub fn step(&mut self, id: SignalId, step_size: Real) -> SignalResult<()> {
        let idx = self.index(id)?;

        let update = match &self.slots[idx].node {
            SignalNode::Forced(_) => Update::Forced,
            SignalNode::Computed(c) => Update::Computed(self.evaluate(idx, c, step_size)?),
            SignalNode::Delayed(d) => Update::Delayed(self.values(d.source())?.to_vec()),
        };

        match (&mut self.slots[idx].node, update) {
            (SignalNode::Forced(f), Update::Forced) => {
                f.step(step_size)?;
            }
            (SignalNode::Computed(c), Update::Computed(value)) => {
                c.commit(value, step_size)?;
            }
            (SignalNode::Delayed(d), Update::Delayed(source)) => {
                d.step_with(&source, step_size)?;
            }
            _ => unreachable!("node kind changed during step"),
        }
        Ok(())
    }

    /// Step each node in the given order.
    pub fn step_in_order(&mut self, ids: &[SignalId], step_size: Real) -> SignalResult<()> {
        for id in ids {
            self.step(*id, step_size)?;
        }
        Ok(())
    }

    fn evaluate(&self, idx: usize, computed: &Computed, step_size: Real) -> SignalResult<Real> {
        let mut inputs = Vec::with_capacity(computed.inputs().len());
        for (slot, input) in computed.inputs().iter().enumerate() {
            let source = input.ok_or_else(|| SignalError::UninitializedReference {
                what: format!(
                    "input slot {slot} of '{}' is not wired",
                    self.slots[idx].label
                ),
            })?;
            inputs.push(self.values(source)?);
        }
        computed.evaluate(&inputs, step_size)
    }

    fn push(&mut self, label: String, node: SignalNode) -> SignalId {
        let id = SignalId::new(self.slots.len() as u64);
        debug!(id = id.value(), signal = %label, kind = node.kind_name(), "signal added");
        self.slots.push(Slot { label, node });
        id
    }

    fn index(&self, id: SignalId) -> SignalResult<usize> {
        usize::try_from(id.value())
            .ok()
            .filter(|idx| *idx < self.slots.len())
            .ok_or_else(|| SignalError::InvalidReference {
                what: format!("signal {} is not on this bus", id.value()),
            })
    }

    fn kind_mismatch(&self, id: SignalId, wanted: &str, found: &SignalNode) -> SignalError {
        let label = self.label(id).unwrap_or("?");
        SignalError::InvalidReference {
            what: format!("'{label}' is {}, expected {wanted}", found.kind_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::{Tolerances, nearly_equal};

    fn tol() -> Tolerances {
        Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        }
    }

    #[test]
    fn empty_bus() {
        let bus = SignalBus::new();
        assert!(bus.is_empty());
        assert!(matches!(
            bus.get(SignalId::new(0), 0),
            Err(SignalError::InvalidReference { .. })
        ));
    }

    #[test]
    fn forced_feeds_computed() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |t| 2.0 * t).unwrap());
        let g = bus
            .add_computed(
                "g",
                Computed::with_inputs(0, 0, &[f], |ctx| ctx.input(0)[0] + 1.0).unwrap(),
            )
            .unwrap();

        bus.step_in_order(&[f, g], 0.5).unwrap();
        assert_eq!(bus.get(f, 0).unwrap(), 1.0);
        assert_eq!(bus.get(g, 0).unwrap(), 2.0);
        assert_eq!(bus.label(g).unwrap(), "g");
    }

    #[test]
    fn reading_before_stepping_sees_previous_tick() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |t| t).unwrap());
        let g = bus
            .add_computed(
                "g",
                Computed::with_inputs(0, 0, &[f], |ctx| ctx.input(0)[0]).unwrap(),
            )
            .unwrap();

        // wrong order: g reads f before f advances
        bus.step_in_order(&[g, f], 1.0).unwrap();
        assert_eq!(bus.get(g, 0).unwrap(), 0.0);
        bus.step_in_order(&[g, f], 1.0).unwrap();
        assert_eq!(bus.get(g, 0).unwrap(), 1.0);
        assert_eq!(bus.get(f, 0).unwrap(), 2.0);
    }

    #[test]
    fn unbound_input_is_reported() {
        let mut bus = SignalBus::new();
        let c = bus
            .add_computed("error", Computed::new(0, 0, 1, |ctx| ctx.input(0)[0]).unwrap())
            .unwrap();

        let err = bus.step(c, 0.1).unwrap_err();
        match err {
            SignalError::UninitializedReference { what } => assert!(what.contains("error")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(bus.get(c, 0).unwrap(), 0.0);
    }

    #[test]
    fn late_binding_allows_cycles() {
        let mut bus = SignalBus::new();
        let a = bus
            .add_computed("a", Computed::new(0, 0, 1, |ctx| ctx.input(0)[0] + 1.0).unwrap())
            .unwrap();
        let b = bus
            .add_computed("b", Computed::with_inputs(0, 0, &[a], |ctx| ctx.input(0)[0]).unwrap())
            .unwrap();
        bus.bind_input(a, 0, b).unwrap();

        for _ in 0..3 {
            bus.step_in_order(&[a, b], 0.1).unwrap();
        }
        assert_eq!(bus.get(a, 0).unwrap(), 3.0);
        assert_eq!(bus.get(b, 0).unwrap(), 3.0);
    }

    #[test]
    fn bind_input_validates_handles() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |_| 0.0).unwrap());
        let c = bus
            .add_computed("c", Computed::new(0, 0, 1, |_| 0.0).unwrap())
            .unwrap();

        assert!(bus.bind_input(c, 0, SignalId::new(99)).is_err());
        assert!(bus.bind_input(f, 0, c).is_err());
        assert!(
            bus.add_computed(
                "dangling",
                Computed::with_inputs(0, 0, &[SignalId::new(42)], |_| 0.0).unwrap()
            )
            .is_err()
        );
    }

    #[test]
    fn delay_line_over_forced_source() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(1, 0, |t| t).unwrap());
        let d = bus.add_delayed("f delayed", f, 0.5).unwrap();
        assert_eq!(bus.signal(d).unwrap().order(), 1);

        let h = 0.25;
        bus.step_in_order(&[f, d], h).unwrap();
        assert_eq!(bus.values(d).unwrap(), &[0.0, 0.0]);
        bus.step_in_order(&[f, d], h).unwrap();
        // replays f as it was one step ago
        assert!(nearly_equal(bus.get(d, 0).unwrap(), 0.25, tol()));
        assert!(nearly_equal(bus.get(d, 1).unwrap(), 1.0, tol()));
    }

    #[test]
    fn replacing_delay_keeps_handle_and_resets_history() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |_| 1.0).unwrap());
        let d = bus.add_delayed("d", f, 0.25).unwrap();

        bus.step_in_order(&[f, d], 0.25).unwrap();
        assert_eq!(bus.get(d, 0).unwrap(), 1.0);

        bus.replace_delayed(d, 0.5).unwrap();
        let line = bus.delayed(d).unwrap();
        assert_eq!(line.delay(), 0.5);
        assert_eq!(line.history_len(), 0);
        assert_eq!(line.source(), f);
        assert_eq!(bus.get(d, 0).unwrap(), 0.0);

        assert!(bus.replace_delayed(f, 0.5).is_err());
        assert!(bus.replace_delayed(d, -1.0).is_err());
    }

    #[test]
    fn set_raw_and_clear_through_bus() {
        let mut bus = SignalBus::new();
        let a = bus
            .add_computed("a", Computed::new(2, 2, 0, |_| -0.1).unwrap())
            .unwrap();
        bus.set_raw(a, 0, 0.2).unwrap();
        bus.set_raw(a, 1, 0.3).unwrap();
        assert_eq!(bus.values(a).unwrap(), &[0.2, 0.3, 0.0]);

        bus.clear(a).unwrap();
        assert_eq!(bus.values(a).unwrap(), &[0.0, 0.0, 0.0]);

        let d = bus.add_delayed("d", a, 0.1).unwrap();
        assert!(bus.set_raw(d, 0, 1.0).is_err());
    }

    #[test]
    fn kind_accessors() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |_| 0.0).unwrap());
        assert!(bus.delayed(f).is_err());
        assert!(bus.computed(f).is_err());
        assert_eq!(bus.node(f).unwrap().kind_name(), "forced");
    }

    #[test]
    fn invalid_step_size_is_domain_error() {
        let mut bus = SignalBus::new();
        let f = bus.add_forced("f", Forced::new(0, 0, |_| 1.0).unwrap());
        let c = bus
            .add_computed("c", Computed::new(0, 0, 0, |_| 1.0).unwrap())
            .unwrap();
        let d = bus.add_delayed("d", f, 0.1).unwrap();

        for id in [f, c, d] {
            assert!(matches!(bus.step(id, 0.0), Err(SignalError::Domain { .. })));
        }
    }
}
