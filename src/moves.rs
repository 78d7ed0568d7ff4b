//! Move descriptors shared by the cost calculator, the feasibility checker,
//! the executor and the compound-move tracker.
//!
//! A descriptor refers to arcs, never to raw positions: positions shift as
//! other moves of the same pass are applied, arcs do not. Anything the
//! descriptor needs to be re-resolved against the current solution is
//! expressed as an arc anchor.

use crate::problem::ArcId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Move families, used to enable or disable neighbourhoods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoveType {
    Relocate,
    DoubleRelocate,
    Exchange,
    Cross,
    Flip,
    RelocateAtRouteBoundary,
    CrossAtRouteBoundary,
    RelocatePreIf,
    RelocatePostIf,
    DoubleCross,
    Combo,
}

impl MoveType {
    pub const ALL: [MoveType; 11] = [
        MoveType::Relocate,
        MoveType::DoubleRelocate,
        MoveType::Exchange,
        MoveType::Cross,
        MoveType::Flip,
        MoveType::RelocateAtRouteBoundary,
        MoveType::CrossAtRouteBoundary,
        MoveType::RelocatePreIf,
        MoveType::RelocatePostIf,
        MoveType::DoubleCross,
        MoveType::Combo,
    ];
}

/// A set of enabled move families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSet(BTreeSet<MoveType>);

impl Default for MoveSet {
    fn default() -> Self {
        MoveSet::all()
    }
}

impl MoveSet {
    pub fn all() -> Self {
        MoveSet(MoveType::ALL.iter().copied().collect())
    }

    pub fn none() -> Self {
        MoveSet(BTreeSet::new())
    }

    pub fn only(types: impl IntoIterator<Item = MoveType>) -> Self {
        MoveSet(types.into_iter().collect())
    }

    pub fn with(mut self, move_type: MoveType) -> Self {
        self.0.insert(move_type);
        self
    }

    pub fn without(mut self, move_type: MoveType) -> Self {
        self.0.remove(&move_type);
        self
    }

    #[inline]
    pub fn contains(&self, move_type: MoveType) -> bool {
        self.0.contains(&move_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = MoveType> + '_ {
        self.0.iter().copied()
    }
}

/// Where an arc is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insertion {
    /// Directly in front of a scheduled arc.
    Before(ArcId),
    /// After the last arc of a trip, in front of its boundary.
    TripEnd(ArcId),
}

impl Insertion {
    /// The scheduled arc that identifies the insertion point.
    pub fn anchor(&self) -> ArcId {
        match *self {
            Insertion::Before(arc) | Insertion::TripEnd(arc) => arc,
        }
    }
}

/// Moving one arc to a new position, possibly in the opposite orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Relocation {
    pub arc: ArcId,
    /// Orientation scheduled at the target; `arc` or its inverse
    pub placed: ArcId,
    pub target: Insertion,
}

/// The move kinds, each with its strongly typed payload.
#[derive(Debug, Clone, Serialize)]
pub enum MoveKind {
    Relocate(Relocation),
    /// Insert right after an IF, in front of the first arc of a later trip.
    RelocatePostIf(Relocation),
    /// Insert at the end of a trip that is followed by another trip.
    RelocatePreIf(Relocation),
    /// Insert at the end of a route, in front of the depot return.
    RelocateAtRouteBoundary(Relocation),
    /// Move two consecutive arcs of a trip together.
    DoubleRelocate {
        first: ArcId,
        second: ArcId,
        target: Insertion,
    },
    /// Swap two arcs, each possibly flipped.
    Exchange {
        a: ArcId,
        a_placed: ArcId,
        b: ArcId,
        b_placed: ArcId,
    },
    /// Service an edge in its other orientation.
    Flip { arc: ArcId, placed: ArcId },
    /// Swap what follows `a` with what follows `b`.
    Cross { a: ArcId, b: ArcId },
    /// Swap the whole route starting at `route_first` with what follows `b`.
    CrossAtRouteBoundary { route_first: ArcId, b: ArcId },
    /// Reorder a trip by cutting after four increasing positions.
    DoubleCross { cuts: [ArcId; 4] },
    /// Two moves that only work together.
    Combo { first: Box<Move>, second: Box<Move> },
}

/// An amount charged to the route or trip currently holding `anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Charge {
    pub anchor: ArcId,
    pub amount: f64,
}

/// A candidate move together with its evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Move {
    pub kind: MoveKind,
    /// Net change of the total cost
    pub delta: f64,
    /// Tasks whose position or neighbours the move reads or changes
    pub footprint: Vec<ArcId>,
    /// Cost change per affected route
    pub route_costs: Vec<Charge>,
    /// Load change per affected trip
    pub trip_loads: Vec<Charge>,
}

impl Move {
    pub fn new(kind: MoveKind, delta: f64, footprint: Vec<ArcId>) -> Self {
        Move {
            kind,
            delta,
            footprint,
            route_costs: Vec::new(),
            trip_loads: Vec::new(),
        }
    }

    pub fn with_route_cost(mut self, anchor: ArcId, amount: f64) -> Self {
        self.route_costs.push(Charge { anchor, amount });
        self
    }

    pub fn with_trip_load(mut self, anchor: ArcId, amount: f64) -> Self {
        self.trip_loads.push(Charge { anchor, amount });
        self
    }

    /// Join two independent moves into a combo.
    pub fn combo(first: Move, second: Move) -> Move {
        let mut footprint = first.footprint.clone();
        footprint.extend(second.footprint.iter().copied());
        footprint.sort_unstable();
        footprint.dedup();

        let route_costs = first
            .route_costs
            .iter()
            .chain(second.route_costs.iter())
            .copied()
            .collect();
        let trip_loads = first
            .trip_loads
            .iter()
            .chain(second.trip_loads.iter())
            .copied()
            .collect();

        Move {
            delta: first.delta + second.delta,
            footprint,
            route_costs,
            trip_loads,
            kind: MoveKind::Combo {
                first: Box::new(first),
                second: Box::new(second),
            },
        }
    }

    pub fn move_type(&self) -> MoveType {
        match self.kind {
            MoveKind::Relocate(_) => MoveType::Relocate,
            MoveKind::RelocatePostIf(_) => MoveType::RelocatePostIf,
            MoveKind::RelocatePreIf(_) => MoveType::RelocatePreIf,
            MoveKind::RelocateAtRouteBoundary(_) => MoveType::RelocateAtRouteBoundary,
            MoveKind::DoubleRelocate { .. } => MoveType::DoubleRelocate,
            MoveKind::Exchange { .. } => MoveType::Exchange,
            MoveKind::Flip { .. } => MoveType::Flip,
            MoveKind::Cross { .. } => MoveType::Cross,
            MoveKind::CrossAtRouteBoundary { .. } => MoveType::CrossAtRouteBoundary,
            MoveKind::DoubleCross { .. } => MoveType::DoubleCross,
            MoveKind::Combo { .. } => MoveType::Combo,
        }
    }

    /// The relocation payload, for any of the relocate variants.
    pub fn relocation(&self) -> Option<&Relocation> {
        match &self.kind {
            MoveKind::Relocate(r)
            | MoveKind::RelocatePostIf(r)
            | MoveKind::RelocatePreIf(r)
            | MoveKind::RelocateAtRouteBoundary(r) => Some(r),
            _ => None,
        }
    }

    /// Arcs whose own location changes: these become tabu.
    pub fn moved_arcs(&self) -> Vec<ArcId> {
        match &self.kind {
            MoveKind::Relocate(r)
            | MoveKind::RelocatePostIf(r)
            | MoveKind::RelocatePreIf(r)
            | MoveKind::RelocateAtRouteBoundary(r) => vec![r.arc],
            MoveKind::DoubleRelocate { first, second, .. } => vec![*first, *second],
            MoveKind::Exchange { a, b, .. } => vec![*a, *b],
            MoveKind::Flip { arc, .. } => vec![*arc],
            MoveKind::Cross { a, b } => vec![*a, *b],
            MoveKind::CrossAtRouteBoundary { route_first, b } => vec![*route_first, *b],
            MoveKind::DoubleCross { cuts } => cuts.to_vec(),
            MoveKind::Combo { first, second } => {
                let mut arcs = first.moved_arcs();
                arcs.extend(second.moved_arcs());
                arcs
            }
        }
    }

    /// Whether load and cost changes are fully described by the charges.
    pub fn is_charge_based(&self) -> bool {
        match &self.kind {
            MoveKind::Cross { .. }
            | MoveKind::CrossAtRouteBoundary { .. }
            | MoveKind::DoubleCross { .. } => false,
            MoveKind::Combo { first, second } => {
                first.is_charge_based() && second.is_charge_based()
            }
            _ => true,
        }
    }

    /// Whether two moves read or write disjoint parts of the solution.
    pub fn is_independent_of(&self, other: &Move) -> bool {
        !self.footprint.iter().any(|a| other.footprint.contains(a))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:+.3} on {:?}", self.move_type(), self.delta, self.footprint)
    }
}
