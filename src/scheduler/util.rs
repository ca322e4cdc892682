use super::{SchedError, Scheduler};
use crate::calendar;
use crate::model::{Assignment, ShiftType, StaffId};
use chrono::NaiveDate;
use std::collections::BTreeMap;

impl Scheduler<'_> {
    pub(super) fn shift_on(&self, staff: StaffId, date: NaiveDate) -> Option<ShiftType> {
        self.board.get(&date)?.get(&staff).copied()
    }

    pub(super) fn staffed(&self, date: NaiveDate, shift: ShiftType) -> u32 {
        self.board
            .get(&date)
            .map_or(0, |day| day.values().filter(|s| **s == shift).count() as u32)
    }

    pub(super) fn place(&mut self, staff: StaffId, date: NaiveDate, shift: ShiftType) {
        self.board.entry(date).or_default().insert(staff, shift);
        let hours = self.ledger.entry(staff).or_insert(0);
        *hours = hours.saturating_add(self.shift_hours.of(shift));
    }

    pub(super) fn release(&mut self, staff: StaffId, date: NaiveDate) -> Option<ShiftType> {
        let day = self.board.get_mut(&date)?;
        let shift = day.remove(&staff)?;
        if day.is_empty() {
            self.board.remove(&date);
        }
        if let Some(hours) = self.ledger.get_mut(&staff) {
            *hours = hours.saturating_sub(self.shift_hours.of(shift));
        }
        Some(shift)
    }

    pub(super) fn shortfall(&self, staff: StaffId) -> u32 {
        let target = self.ctx.min_hours(staff).unwrap_or(0);
        let worked = self.ledger.get(&staff).copied().unwrap_or(0);
        target.saturating_sub(worked)
    }
}

/// Tout le lot est vérifié avant la première pose : un échec laisse le tableau intact.
pub(super) fn seed(scheduler: &mut Scheduler<'_>, assignments: &[Assignment]) -> Result<(), SchedError> {
    let mut batch: BTreeMap<(StaffId, NaiveDate), ShiftType> = BTreeMap::new();
    for a in assignments {
        if !scheduler.ledger.contains_key(&a.staff_id) {
            return Err(SchedError::UnknownStaff(a.staff_id));
        }
        if !scheduler.ctx.contains_date(a.date) {
            return Err(SchedError::SlotOutsideMonth {
                date: a.date,
                shift: a.shift,
            });
        }
        if !a.shift.allowed_on(calendar::day_kind(a.date)) {
            return Err(SchedError::ShiftNotAllowed {
                date: a.date,
                shift: a.shift,
            });
        }
        if scheduler.ctx.is_blocked(a.staff_id, a.date) {
            return Err(SchedError::SeedInvalid("assignment on a blocked day"));
        }
        if scheduler.shift_on(a.staff_id, a.date).is_some()
            || batch.insert((a.staff_id, a.date), a.shift).is_some()
        {
            return Err(SchedError::SeedInvalid("staff already assigned that day"));
        }
    }
    for ((staff, date), shift) in batch {
        scheduler.place(staff, date, shift);
    }
    Ok(())
}
