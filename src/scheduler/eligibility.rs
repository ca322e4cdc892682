use super::Scheduler;
use crate::model::{DayState, ShiftType, StaffId};
use chrono::NaiveDate;

/// Verdict d'éligibilité d'une personne pour une garde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Verdict {
    Eligible,
    Busy,
    Blocked,
    Transition,
}

impl Scheduler<'_> {
    /// État effectif : garde tenue, sinon motif de blocage, sinon libre.
    pub(super) fn day_state(&self, staff: StaffId, date: NaiveDate) -> DayState {
        if let Some(shift) = self.shift_on(staff, date) {
            return DayState::Worked(shift);
        }
        match self.ctx.block_reason(staff, date) {
            Some(reason) => DayState::Blocked(reason),
            None => DayState::Off,
        }
    }

    /// Hors du mois, la veille compte comme libre (pas de continuité inter-mois).
    fn state_before(&self, staff: StaffId, date: NaiveDate) -> DayState {
        match date.pred_opt() {
            Some(prev) if self.ctx.contains_date(prev) => self.day_state(staff, prev),
            _ => DayState::Off,
        }
    }

    fn forbidden(&self, prev: DayState, next: ShiftType, date: NaiveDate) -> bool {
        self.rules.iter().any(|r| r.forbids(prev, next, date))
    }

    pub(super) fn check(&self, staff: StaffId, date: NaiveDate, shift: ShiftType) -> Verdict {
        if self.shift_on(staff, date).is_some() {
            return Verdict::Busy;
        }
        if self.ctx.is_blocked(staff, date) {
            return Verdict::Blocked;
        }
        if !self.transitions_ok(staff, date, DayState::Worked(shift)) {
            return Verdict::Transition;
        }
        Verdict::Eligible
    }

    /// Vérifie les deux transitions autour de `date` si la personne y prend l'état `state`.
    ///
    /// Le lendemain n'est renseigné qu'en équilibrage ou après un `seed`.
    pub(super) fn transitions_ok(&self, staff: StaffId, date: NaiveDate, state: DayState) -> bool {
        if let DayState::Worked(shift) = state {
            if self.forbidden(self.state_before(staff, date), shift, date) {
                return false;
            }
        }
        let Some(next_day) = date.succ_opt() else {
            return true;
        };
        match self.shift_on(staff, next_day) {
            Some(next_shift) => !self.forbidden(state, next_shift, next_day),
            None => true,
        }
    }

    /// Une personne peut-elle céder sa garde du jour sans casser son lendemain ?
    pub(super) fn release_ok(&self, staff: StaffId, date: NaiveDate) -> bool {
        let freed = match self.ctx.block_reason(staff, date) {
            Some(reason) => DayState::Blocked(reason),
            None => DayState::Off,
        };
        self.transitions_ok(staff, date, freed)
    }
}
