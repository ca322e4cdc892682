use crate::model::{Assignment, RequiredSlot, ShiftType, StaffId};
use crate::policy::{Policy, PolicyError};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Options d'assignation
#[derive(Debug, Clone, Copy)]
pub struct AssignOptions {
    /// Borne dure du nombre de passes d'équilibrage.
    pub max_balance_passes: u32,
    pub balance: bool,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            max_balance_passes: 50,
            balance: true,
        }
    }
}

impl From<&Policy> for AssignOptions {
    fn from(policy: &Policy) -> Self {
        Self {
            max_balance_passes: policy.max_balance_passes,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfilledReason {
    EmptyRoster,
    NoEligibleStaff,
}

impl UnfilledReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnfilledReason::EmptyRoster => "empty_roster",
            UnfilledReason::NoEligibleStaff => "no_eligible_staff",
        }
    }
}

/// Répartition des personnes écartées pour un créneau.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IneligibleCounts {
    /// déjà de garde ce jour-là
    pub busy: u32,
    pub blocked: u32,
    pub transition: u32,
}

/// Créneau resté incomplet après le remplissage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnfilledSlot {
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub required: u32,
    pub assigned: u32,
    pub missing: u32,
    pub reason: UnfilledReason,
    pub ineligible: IneligibleCounts,
}

/// Affectation faite malgré une demande SOFT, faute d'autre candidat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoftOverride {
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub staff_id: StaffId,
}

/// Résultat complet d'un run : lot d'affectations + diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanOutcome {
    pub assignments: Vec<Assignment>,
    /// Demande résiduelle : `headcount` = places manquantes.
    pub unfilled: Vec<RequiredSlot>,
    pub unfilled_debug: Vec<UnfilledSlot>,
    pub hours: BTreeMap<StaffId, u32>,
    pub swap_count: u32,
    pub soft_overrides: Vec<SoftOverride>,
    pub balance_passes: u32,
}

impl PlanOutcome {
    pub fn total_hours(&self) -> u64 {
        self.hours.values().map(|h| u64::from(*h)).sum()
    }

    pub fn missing_heads(&self) -> u32 {
        self.unfilled.iter().map(|s| s.headcount).sum()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("unknown staff: {0}")]
    UnknownStaff(StaffId),
    #[error("slot {date} {shift} is outside the planned month")]
    SlotOutsideMonth { date: NaiveDate, shift: ShiftType },
    #[error("slot {date} {shift} has a zero headcount")]
    EmptySlot { date: NaiveDate, shift: ShiftType },
    #[error("shift {shift} does not exist on {date}")]
    ShiftNotAllowed { date: NaiveDate, shift: ShiftType },
    #[error("seed invalid: {0}")]
    SeedInvalid(&'static str),
}
