use crate::calendar;
use crate::context::ConstraintContext;
use crate::model::{Assignment, DayState, RequiredSlot, ShiftType, StaffId, TransitionRule};
use crate::policy::{Policy, ShiftHours};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DoubleBooking,
    HardBlock,
    ForbiddenTransition,
    Overstaffed,
    /// Garde hors mois, hors roster ou sur le mauvais type de jour.
    InvalidAssignment,
    MinHoursDeficit,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::DoubleBooking => "double_booking",
            ViolationKind::HardBlock => "hard_block",
            ViolationKind::ForbiddenTransition => "forbidden_transition",
            ViolationKind::Overstaffed => "overstaffed",
            ViolationKind::InvalidAssignment => "invalid_assignment",
            ViolationKind::MinHoursDeficit => "min_hours_deficit",
        }
    }

    /// Tout sauf le déficit d'heures casse une contrainte dure.
    pub fn is_hard(self) -> bool {
        self != ViolationKind::MinHoursDeficit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ViolationRecord {
    pub date: Option<NaiveDate>,
    pub shift: Option<ShiftType>,
    pub staff_id: Option<StaffId>,
    pub kind: ViolationKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deficit {
    pub staff_id: StaffId,
    pub hours: u32,
    pub min_hours: u32,
    pub shortfall: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub hard_ok: bool,
    pub min_hours_ok: bool,
    pub violations: Vec<ViolationRecord>,
    pub deficits: Vec<Deficit>,
    pub hours: BTreeMap<StaffId, u32>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.hard_ok && self.min_hours_ok
    }

    pub fn hard_violations(&self) -> impl Iterator<Item = &ViolationRecord> {
        self.violations.iter().filter(|v| v.kind.is_hard())
    }
}

/// Audit indépendant d'un lot d'affectations (moteur ou source externe).
///
/// Ne partage rien avec l'état interne du moteur : tout est re-dérivé des
/// affectations et du contexte.
#[derive(Debug, Clone)]
pub struct Validator<'a> {
    ctx: &'a ConstraintContext,
    rules: Vec<&'a TransitionRule>,
    shift_hours: ShiftHours,
    slots: Option<&'a [RequiredSlot]>,
}

impl<'a> Validator<'a> {
    pub fn new(ctx: &'a ConstraintContext, policy: &'a Policy) -> Self {
        Self {
            ctx,
            rules: policy.active_rules().collect(),
            shift_hours: policy.shift_hours,
            slots: None,
        }
    }

    /// Active le contrôle de sur-effectif par créneau.
    pub fn with_slots(mut self, slots: &'a [RequiredSlot]) -> Self {
        self.slots = Some(slots);
        self
    }

    pub fn audit(&self, assignments: &[Assignment]) -> AuditReport {
        let mut violations = Vec::new();

        let mut by_staff: BTreeMap<StaffId, BTreeMap<NaiveDate, Vec<ShiftType>>> = BTreeMap::new();
        let mut hours: BTreeMap<StaffId, u32> =
            self.ctx.roster().iter().map(|id| (*id, 0)).collect();
        for a in assignments {
            by_staff
                .entry(a.staff_id)
                .or_default()
                .entry(a.date)
                .or_default()
                .push(a.shift);
            let worked = hours.entry(a.staff_id).or_insert(0);
            *worked = worked.saturating_add(self.shift_hours.of(a.shift));
        }

        for (staff, days) in &by_staff {
            for (date, shifts) in days {
                if shifts.len() > 1 {
                    let listed: Vec<&str> = shifts.iter().map(|s| s.as_str()).collect();
                    violations.push(ViolationRecord {
                        date: Some(*date),
                        shift: None,
                        staff_id: Some(*staff),
                        kind: ViolationKind::DoubleBooking,
                        detail: format!("{} shifts on the same day: {}", shifts.len(), listed.join(", ")),
                    });
                }
            }
        }

        for a in assignments {
            if let Some(problem) = self.malformed(a) {
                violations.push(ViolationRecord {
                    date: Some(a.date),
                    shift: Some(a.shift),
                    staff_id: Some(a.staff_id),
                    kind: ViolationKind::InvalidAssignment,
                    detail: problem.to_string(),
                });
            }
            if let Some(reason) = self.ctx.block_reason(a.staff_id, a.date) {
                violations.push(ViolationRecord {
                    date: Some(a.date),
                    shift: Some(a.shift),
                    staff_id: Some(a.staff_id),
                    kind: ViolationKind::HardBlock,
                    detail: format!("assigned on a blocked day ({reason})"),
                });
            }

            let prev_states = self.previous_states(&by_staff, a.staff_id, a.date);
            for rule in &self.rules {
                if let Some(prev) = prev_states
                    .iter()
                    .find(|prev| rule.forbids(**prev, a.shift, a.date))
                {
                    violations.push(ViolationRecord {
                        date: Some(a.date),
                        shift: Some(a.shift),
                        staff_id: Some(a.staff_id),
                        kind: ViolationKind::ForbiddenTransition,
                        detail: format!("rule {rule}: previous day {prev}"),
                    });
                }
            }
        }

        if let Some(slots) = self.slots {
            violations.extend(overstaffed(slots, assignments));
        }

        let mut deficits = Vec::new();
        for (staff, min_hours) in self.ctx.min_by_staff() {
            let worked = hours.get(staff).copied().unwrap_or(0);
            if worked < *min_hours {
                let shortfall = min_hours - worked;
                deficits.push(Deficit {
                    staff_id: *staff,
                    hours: worked,
                    min_hours: *min_hours,
                    shortfall,
                });
                violations.push(ViolationRecord {
                    date: None,
                    shift: None,
                    staff_id: Some(*staff),
                    kind: ViolationKind::MinHoursDeficit,
                    detail: format!("{worked}h worked, {min_hours}h required (-{shortfall}h)"),
                });
            }
        }

        violations.sort();
        let hard_ok = !violations.iter().any(|v| v.kind.is_hard());
        AuditReport {
            hard_ok,
            min_hours_ok: deficits.is_empty(),
            violations,
            deficits,
            hours,
        }
    }

    fn malformed(&self, a: &Assignment) -> Option<&'static str> {
        if !self.ctx.contains_date(a.date) {
            return Some("date outside the audited month");
        }
        if self.ctx.min_hours(a.staff_id).is_none() {
            return Some("staff not in the active roster");
        }
        if !a.shift.allowed_on(calendar::day_kind(a.date)) {
            return Some("shift type does not exist on this day");
        }
        None
    }

    /// États possibles de la veille ; plusieurs si la veille est elle-même en double.
    fn previous_states(
        &self,
        by_staff: &BTreeMap<StaffId, BTreeMap<NaiveDate, Vec<ShiftType>>>,
        staff: StaffId,
        date: NaiveDate,
    ) -> Vec<DayState> {
        let Some(prev) = date.pred_opt().filter(|d| self.ctx.contains_date(*d)) else {
            return vec![DayState::Off];
        };
        if let Some(shifts) = by_staff.get(&staff).and_then(|days| days.get(&prev)) {
            return shifts.iter().map(|s| DayState::Worked(*s)).collect();
        }
        match self.ctx.block_reason(staff, prev) {
            Some(reason) => vec![DayState::Blocked(reason)],
            None => vec![DayState::Off],
        }
    }
}

fn overstaffed(slots: &[RequiredSlot], assignments: &[Assignment]) -> Vec<ViolationRecord> {
    let demand: BTreeMap<(NaiveDate, ShiftType), u32> = slots
        .iter()
        .map(|s| ((s.date, s.shift), s.headcount))
        .collect();
    let mut staffed: BTreeMap<(NaiveDate, ShiftType), u32> = BTreeMap::new();
    for a in assignments {
        *staffed.entry((a.date, a.shift)).or_insert(0) += 1;
    }

    staffed
        .into_iter()
        .filter_map(|((date, shift), count)| {
            let required = demand.get(&(date, shift)).copied().unwrap_or(0);
            (count > required).then(|| ViolationRecord {
                date: Some(date),
                shift: Some(shift),
                staff_id: None,
                kind: ViolationKind::Overstaffed,
                detail: format!("{count} assigned for {required} required"),
            })
        })
        .collect()
}
