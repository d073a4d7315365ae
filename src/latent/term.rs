//! The incremental statistic contract.
//!
//! A term reports a scalar statistic over the model's graph and keeps
//! whatever internal caches it needs to do so incrementally. The engine
//! drives every term through the same four-step protocol:
//!
//! 1. `initialize` computes the statistic from scratch on the current
//!    graph.
//! 2. `dyad_update(g, from, to, order, actor_index)` proposes the flip
//!    of dyad `(from, to)`. The graph is still in its *pre-toggle*
//!    state; after the call `value()` must report the statistic as if
//!    the dyad were flipped. `order[0..actor_index]` is the committed
//!    visitation history, which order-dependent terms may consult.
//! 3. The engine either toggles the dyad in the graph (committing the
//!    proposal) or calls `rollback`, which must restore `value()`
//!    bitwise to its pre-update result.
//!
//! At most one proposal is outstanding at a time; a second
//! `dyad_update` before commit or rollback is undefined.

use crate::error::LologError;
use crate::graph::Graph;

/// An incrementally maintained network statistic.
pub trait Term: Send + Sync {
    /// Short identifier, used by the term registry and diagnostics.
    fn name(&self) -> &'static str;

    /// Compute the statistic from scratch on `g`.
    fn initialize(&mut self, g: &Graph) -> Result<(), LologError>;

    /// Current statistic value. O(1).
    fn value(&self) -> f64;

    /// Propose the flip of dyad `(from, to)` against the pre-toggle
    /// graph `g`. `order` is the full visitation order and
    /// `actor_index` the position of the actor being processed.
    fn dyad_update(&mut self, g: &Graph, from: usize, to: usize, order: &[usize], actor_index: usize);

    /// Undo the last `dyad_update`.
    fn rollback(&mut self);

    /// Clone into a fresh box. Needed because models own `Box<dyn Term>`.
    fn clone_box(&self) -> Box<dyn Term>;

    /// Whether the change statistic ignores the rest of the graph.
    fn is_dyad_independent(&self) -> bool {
        false
    }

    /// Whether the change statistic ignores the visitation history.
    fn is_order_independent(&self) -> bool {
        true
    }
}

impl Clone for Box<dyn Term> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
