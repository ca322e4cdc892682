mod assignment;
mod balance;
mod eligibility;
mod types;
mod util;

pub use types::{
    AssignOptions, IneligibleCounts, PlanOutcome, SchedError, SoftOverride, UnfilledReason,
    UnfilledSlot,
};

use crate::context::ConstraintContext;
use crate::model::{Assignment, RequiredSlot, ShiftType, StaffId, TransitionRule};
use crate::policy::{Policy, ShiftHours};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Scheduler : état d'un run de planification (un mois).
///
/// Tout l'état mutable (tableau de garde, registre d'heures, compteurs) vit
/// ici ; les entrées restent en lecture seule.
#[derive(Debug)]
pub struct Scheduler<'a> {
    ctx: &'a ConstraintContext,
    rules: Vec<TransitionRule>,
    shift_hours: ShiftHours,
    opts: AssignOptions,
    board: BTreeMap<NaiveDate, BTreeMap<StaffId, ShiftType>>,
    ledger: BTreeMap<StaffId, u32>,
    unfilled: Vec<UnfilledSlot>,
    soft_overrides: Vec<SoftOverride>,
    swap_count: u32,
    balance_passes: u32,
}

impl<'a> Scheduler<'a> {
    pub fn new(ctx: &'a ConstraintContext, policy: &Policy) -> Result<Self, SchedError> {
        // roster sans doublon : garanti par `ConstraintContext::assemble`
        policy.validate()?;

        Ok(Self {
            ctx,
            rules: policy.active_rules().cloned().collect(),
            shift_hours: policy.shift_hours,
            opts: AssignOptions::from(policy),
            board: BTreeMap::new(),
            ledger: ctx.roster().iter().map(|id| (*id, 0)).collect(),
            unfilled: Vec::new(),
            soft_overrides: Vec::new(),
            swap_count: 0,
            balance_passes: 0,
        })
    }

    pub fn with_options(mut self, opts: AssignOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Run complet : remplissage glouton puis équilibrage.
    #[instrument(skip_all, fields(year = ctx.year(), month = ctx.month(), slots = slots.len()))]
    pub fn plan(
        ctx: &ConstraintContext,
        policy: &Policy,
        slots: &[RequiredSlot],
    ) -> Result<PlanOutcome, SchedError> {
        let mut scheduler = Scheduler::new(ctx, policy)?;
        scheduler.fill(slots)?;
        if scheduler.opts.balance {
            scheduler.balance();
        }
        let outcome = scheduler.finish();

        info!(
            assignments = outcome.assignments.len(),
            missing = outcome.missing_heads(),
            swaps = outcome.swap_count,
            soft_overrides = outcome.soft_overrides.len(),
            "plan generated"
        );
        if !outcome.unfilled.is_empty() {
            warn!(
                slots = outcome.unfilled.len(),
                "some slots could not be fully staffed"
            );
        }
        Ok(outcome)
    }

    /// Charge un lot existant (ex. mois déjà persisté) avant remplissage ou équilibrage.
    pub fn seed(&mut self, assignments: &[Assignment]) -> Result<(), SchedError> {
        util::seed(self, assignments)
    }

    /// Remplit les créneaux dans l'ordre chronologique (DAY, NIGHT, D24).
    pub fn fill(&mut self, slots: &[RequiredSlot]) -> Result<(), SchedError> {
        assignment::fill(self, slots)
    }

    /// Passe d'équilibrage bornée ; retourne le nombre de réaffectations.
    pub fn balance(&mut self) -> u32 {
        balance::balance(self)
    }

    pub fn hours(&self) -> &BTreeMap<StaffId, u32> {
        &self.ledger
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        let mut out: Vec<Assignment> = self
            .board
            .iter()
            .flat_map(|(date, day)| {
                day.iter()
                    .map(|(staff, shift)| Assignment::new(*date, *shift, *staff))
            })
            .collect();
        out.sort();
        out
    }

    pub fn finish(self) -> PlanOutcome {
        let assignments = self.assignments();
        let unfilled = self
            .unfilled
            .iter()
            .map(|u| RequiredSlot {
                date: u.date,
                shift: u.shift,
                headcount: u.missing,
            })
            .collect();
        PlanOutcome {
            assignments,
            unfilled,
            unfilled_debug: self.unfilled,
            hours: self.ledger,
            swap_count: self.swap_count,
            soft_overrides: self.soft_overrides,
            balance_passes: self.balance_passes,
        }
    }
}
