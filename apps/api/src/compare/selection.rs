//! Compare-mode selection state machine.
//!
//! `Empty → One → Comparing`, driven by `select`. Transition functions are pure:
//! they mutate the machine and return the effect the caller must carry out
//! (fetch a pair, close the drawer). Fetch results come back through `settle`,
//! which drops anything issued for an older generation.
//!
//! Selecting a third candidate while comparing `[A, B]` yields `[A, C]`: the
//! first pick stays, the second is replaced.

use serde::Serialize;

use crate::models::explanation::Explanation;
use crate::plan::{BlockReason, PlanContext};
use crate::why_client::{ExplanationOrigin, FetchedExplanation};

/// Explanations needed to enter compare mode.
pub const COMPARE_COST: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Pending,
    Resolved(Explanation),
    /// Upstream failed; holds the fallback explanation.
    Substituted(Explanation),
}

impl Slot {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Slot::Pending)
    }

    pub fn explanation(&self) -> Option<&Explanation> {
        match self {
            Slot::Pending => None,
            Slot::Resolved(e) | Slot::Substituted(e) => Some(e),
        }
    }

    pub fn status(&self) -> SlotStatus {
        match self {
            Slot::Pending => SlotStatus::Pending,
            Slot::Resolved(_) => SlotStatus::Resolved,
            Slot::Substituted(_) => SlotStatus::Substituted,
        }
    }
}

impl From<FetchedExplanation> for Slot {
    fn from(fetched: FetchedExplanation) -> Self {
        match fetched.origin {
            ExplanationOrigin::Service => Slot::Resolved(fetched.explanation),
            ExplanationOrigin::Fallback => Slot::Substituted(fetched.explanation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Pending,
    Resolved,
    Substituted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Empty,
    OneSelected,
    Comparing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Empty,
    One(String),
    Comparing { pair: [String; 2], slots: [Slot; 2] },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEffect {
    /// State changed, nothing to fetch.
    Idle,
    /// Fetch both explanations; report each via `settle` with this generation.
    FetchPair { generation: u64, pair: [String; 2] },
    /// Compare drawer closed and both slots cleared.
    CloseDrawer,
    /// Transition into compare mode refused; state unchanged.
    Blocked(BlockReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareMachine {
    selection: Selection,
    generation: u64,
}

impl Default for CompareMachine {
    fn default() -> Self {
        Self {
            selection: Selection::Empty,
            generation: 0,
        }
    }
}

impl CompareMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> Phase {
        match self.selection {
            Selection::Empty => Phase::Empty,
            Selection::One(_) => Phase::OneSelected,
            Selection::Comparing { .. } => Phase::Comparing,
        }
    }

    pub fn selected_ids(&self) -> Vec<&str> {
        match &self.selection {
            Selection::Empty => Vec::new(),
            Selection::One(id) => vec![id.as_str()],
            Selection::Comparing { pair, .. } => pair.iter().map(String::as_str).collect(),
        }
    }

    /// Open once both slots have settled (resolved or substituted).
    pub fn drawer_open(&self) -> bool {
        match &self.selection {
            Selection::Comparing { slots, .. } => slots.iter().all(Slot::is_settled),
            _ => false,
        }
    }

    pub fn select(&mut self, id: &str, plan: &PlanContext) -> SelectionEffect {
        let current = std::mem::replace(&mut self.selection, Selection::Empty);

        let (next, effect) = match current {
            Selection::Empty => (Selection::One(id.to_string()), SelectionEffect::Idle),

            Selection::One(first) if first == id => (Selection::Empty, SelectionEffect::Idle),

            Selection::One(first) => match plan.check(COMPARE_COST) {
                Err(reason) => (Selection::One(first), SelectionEffect::Blocked(reason)),
                Ok(()) => self.start_comparing([first, id.to_string()]),
            },

            Selection::Comparing { pair, .. } if pair.iter().any(|p| p == id) => {
                self.generation += 1;
                (Selection::Empty, SelectionEffect::CloseDrawer)
            }

            Selection::Comparing { pair, slots } => match plan.check(COMPARE_COST) {
                Err(reason) => (
                    Selection::Comparing { pair, slots },
                    SelectionEffect::Blocked(reason),
                ),
                Ok(()) => {
                    let [first, _] = pair;
                    self.start_comparing([first, id.to_string()])
                }
            },
        };

        self.selection = next;
        effect
    }

    fn start_comparing(&mut self, pair: [String; 2]) -> (Selection, SelectionEffect) {
        self.generation += 1;
        let effect = SelectionEffect::FetchPair {
            generation: self.generation,
            pair: pair.clone(),
        };
        (
            Selection::Comparing {
                pair,
                slots: [Slot::Pending, Slot::Pending],
            },
            effect,
        )
    }

    /// Applies a fetch result. Returns false when the result is stale (issued
    /// for an earlier generation), targets a missing slot, or the slot already
    /// settled.
    pub fn settle(&mut self, generation: u64, slot: usize, fetched: FetchedExplanation) -> bool {
        if generation != self.generation {
            return false;
        }
        match &mut self.selection {
            Selection::Comparing { slots, .. } => match slots.get_mut(slot) {
                Some(target) if !target.is_settled() => {
                    *target = Slot::from(fetched);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }
}
