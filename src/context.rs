use crate::calendar::{self, CalendarError};
use crate::model::{BlockReason, DayKind, LeaveRecord, RequestKind, StaffId, StaffRequest};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("duplicate staff id in roster: {0}")]
    DuplicateStaff(StaffId),
}

/// Entrées brutes d'un mois, telles que lues chez les collaborateurs externes.
#[derive(Debug, Clone, Default)]
pub struct PlanInputs {
    pub year: i32,
    pub month: u32,
    /// Personnel actif, dans l'ordre du registre.
    pub roster: Vec<StaffId>,
    pub leave: Vec<LeaveRecord>,
    pub requests: Vec<StaffRequest>,
    pub holidays: BTreeSet<NaiveDate>,
}

impl PlanInputs {
    pub fn new(year: i32, month: u32, roster: Vec<StaffId>) -> Self {
        Self {
            year,
            month,
            roster,
            ..Self::default()
        }
    }
}

/// Contexte de contraintes d'un mois : blocages durs, évitements souples,
/// objectifs d'heures minimaux. Lecture seule pour le moteur et le validateur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintContext {
    year: i32,
    month: u32,
    roster: Vec<StaffId>,
    holidays: BTreeSet<NaiveDate>,
    baseline_hours: u32,
    blocked_type: BTreeMap<StaffId, BTreeMap<NaiveDate, BlockReason>>,
    soft_avoid: BTreeMap<StaffId, BTreeSet<NaiveDate>>,
    min_by_staff: BTreeMap<StaffId, u32>,
}

impl ConstraintContext {
    /// Assemble le contexte à partir des congés, rapports et demandes approuvées.
    ///
    /// Les enregistrements hors roster ou hors mois sont ignorés. Pour un même
    /// jour, le dernier congé lu l'emporte et une demande HARD ne remplace
    /// jamais un congé.
    pub fn assemble(inputs: &PlanInputs, weekday_credit_hours: u32) -> Result<Self, ContextError> {
        let (year, month) = (inputs.year, inputs.month);
        let workdays =
            calendar::count_weekdays_excluding_holidays(year, month, &inputs.holidays)?;

        let mut seen = BTreeSet::new();
        for id in &inputs.roster {
            if !seen.insert(*id) {
                return Err(ContextError::DuplicateStaff(*id));
            }
        }

        let keep = |staff: StaffId, date: NaiveDate, what: &str| {
            if !seen.contains(&staff) {
                debug!(%staff, %date, what, "skipping record for staff outside roster");
                return false;
            }
            if !calendar::in_month(year, month, date) {
                debug!(%staff, %date, what, "skipping record outside planned month");
                return false;
            }
            true
        };

        let mut blocked_type: BTreeMap<StaffId, BTreeMap<NaiveDate, BlockReason>> =
            BTreeMap::new();
        for rec in &inputs.leave {
            if keep(rec.staff_id, rec.date, "leave") {
                blocked_type
                    .entry(rec.staff_id)
                    .or_default()
                    .insert(rec.date, rec.kind.into());
            }
        }

        let approved = || inputs.requests.iter().filter(|r| r.is_approved());
        for req in approved().filter(|r| r.kind == RequestKind::Hard) {
            if keep(req.staff_id, req.date, "hard request") {
                blocked_type
                    .entry(req.staff_id)
                    .or_default()
                    .entry(req.date)
                    .or_insert(BlockReason::OnayliIstekHard);
            }
        }

        let mut soft_avoid: BTreeMap<StaffId, BTreeSet<NaiveDate>> = BTreeMap::new();
        for req in approved().filter(|r| r.kind == RequestKind::Soft) {
            if !keep(req.staff_id, req.date, "soft request") {
                continue;
            }
            let already_blocked = blocked_type
                .get(&req.staff_id)
                .is_some_and(|days| days.contains_key(&req.date));
            if !already_blocked {
                soft_avoid.entry(req.staff_id).or_default().insert(req.date);
            }
        }

        let baseline_hours = workdays.saturating_mul(weekday_credit_hours);
        let min_by_staff = inputs
            .roster
            .iter()
            .map(|id| {
                let lost_days = blocked_type.get(id).map_or(0, |days| {
                    days.keys()
                        .filter(|d| {
                            calendar::day_kind(**d) == DayKind::Weekday
                                && !inputs.holidays.contains(d)
                        })
                        .count() as u32
                });
                let lost_hours = lost_days.saturating_mul(weekday_credit_hours);
                let target = baseline_hours.saturating_sub(lost_hours);
                (*id, target)
            })
            .collect();

        Ok(Self {
            year,
            month,
            roster: inputs.roster.clone(),
            holidays: inputs.holidays.clone(),
            baseline_hours,
            blocked_type,
            soft_avoid,
            min_by_staff,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }
    pub fn month(&self) -> u32 {
        self.month
    }
    pub fn roster(&self) -> &[StaffId] {
        &self.roster
    }
    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    /// Minimum mensuel avant ajustement (jours ouvrés × crédit).
    pub fn baseline_hours(&self) -> u32 {
        self.baseline_hours
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        calendar::in_month(self.year, self.month, date)
    }

    pub fn is_blocked(&self, staff: StaffId, date: NaiveDate) -> bool {
        self.block_reason(staff, date).is_some()
    }

    pub fn block_reason(&self, staff: StaffId, date: NaiveDate) -> Option<BlockReason> {
        self.blocked_type.get(&staff)?.get(&date).copied()
    }

    /// Jours bloqués d'une personne (congé, rapport, demande HARD).
    pub fn blocked_any(&self, staff: StaffId) -> impl Iterator<Item = NaiveDate> + '_ {
        self.blocked_type
            .get(&staff)
            .into_iter()
            .flat_map(|days| days.keys().copied())
    }

    pub fn blocked_type(&self, staff: StaffId) -> Option<&BTreeMap<NaiveDate, BlockReason>> {
        self.blocked_type.get(&staff)
    }

    pub fn is_soft_avoid(&self, staff: StaffId, date: NaiveDate) -> bool {
        self.soft_avoid
            .get(&staff)
            .is_some_and(|days| days.contains(&date))
    }

    pub fn soft_avoid(&self, staff: StaffId) -> Option<&BTreeSet<NaiveDate>> {
        self.soft_avoid.get(&staff)
    }

    /// Objectif ajusté ; `None` pour une personne hors roster.
    pub fn min_hours(&self, staff: StaffId) -> Option<u32> {
        self.min_by_staff.get(&staff).copied()
    }

    pub fn min_by_staff(&self) -> &BTreeMap<StaffId, u32> {
        &self.min_by_staff
    }
}
