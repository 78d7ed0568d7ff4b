//! Conflict tracking for compound passes.
//!
//! A compound pass applies many moves computed against the same starting
//! solution. A move stays valid as long as none of the arcs it reads or
//! changes has been touched by a move applied earlier in the pass.

use crate::encoding::ArcSet;
use crate::moves::Move;
use crate::problem::{ArcId, Problem};

#[derive(Debug, Clone, Default)]
pub struct CompoundMoveTracker {
    /// Arcs that were moved during the pass
    location_changed: ArcSet,
    /// Arcs whose neighbours changed during the pass
    insertion_changed: ArcSet,
}

impl CompoundMoveTracker {
    pub fn new(arc_count: usize) -> Self {
        CompoundMoveTracker {
            location_changed: ArcSet::new(arc_count),
            insertion_changed: ArcSet::new(arc_count),
        }
    }

    /// Start a new pass.
    pub fn reset(&mut self, arc_count: usize) {
        *self = CompoundMoveTracker::new(arc_count);
    }

    fn mark(set: &mut ArcSet, arc: ArcId, problem: &Problem) {
        set.insert(arc);
        if let Some(inv) = problem.inverse(arc) {
            set.insert(inv);
        }
    }

    /// Record everything an applied move touched.
    pub fn record_influence(&mut self, mv: &Move, problem: &Problem) {
        let moved = mv.moved_arcs();
        for &arc in &moved {
            Self::mark(&mut self.location_changed, arc, problem);
        }
        for &arc in mv.footprint.iter().filter(|a| !moved.contains(a)) {
            Self::mark(&mut self.insertion_changed, arc, problem);
        }
    }

    /// Whether `mv` still describes the current solution correctly.
    pub fn is_still_applicable(&self, mv: &Move) -> bool {
        mv.footprint
            .iter()
            .chain(mv.moved_arcs().iter())
            .all(|&a| !self.is_touched(a))
    }

    #[inline]
    pub fn is_touched(&self, arc: ArcId) -> bool {
        self.location_changed.contains(arc) || self.insertion_changed.contains(arc)
    }

    /// The arcs of `base` that can still serve as insertion anchors this pass.
    pub fn insertion_targets(&self, base: &ArcSet) -> ArcSet {
        let mut targets = base.clone();
        for arc in self.location_changed.iter().chain(self.insertion_changed.iter()) {
            targets.remove(arc);
        }
        targets
    }

    pub fn location_changed(&self) -> &ArcSet {
        &self.location_changed
    }

    pub fn insertion_changed(&self) -> &ArcSet {
        &self.insertion_changed
    }

    /// Whether nothing was recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.location_changed.is_empty() && self.insertion_changed.is_empty()
    }
}
