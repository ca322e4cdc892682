use super::eligibility::Verdict;
use super::{IneligibleCounts, SchedError, Scheduler, SoftOverride, UnfilledReason, UnfilledSlot};
use crate::calendar;
use crate::model::{RequiredSlot, StaffId};
use tracing::debug;

pub(super) fn fill(scheduler: &mut Scheduler<'_>, slots: &[RequiredSlot]) -> Result<(), SchedError> {
    for slot in slots {
        if !scheduler.ctx.contains_date(slot.date) {
            return Err(SchedError::SlotOutsideMonth {
                date: slot.date,
                shift: slot.shift,
            });
        }
        if slot.headcount == 0 {
            return Err(SchedError::EmptySlot {
                date: slot.date,
                shift: slot.shift,
            });
        }
        if !slot.shift.allowed_on(calendar::day_kind(slot.date)) {
            return Err(SchedError::ShiftNotAllowed {
                date: slot.date,
                shift: slot.shift,
            });
        }
    }

    // la veille doit être figée avant d'évaluer le jour
    let mut ordered = slots.to_vec();
    ordered.sort_by_key(|s| (s.date, s.shift));

    let roster: Vec<StaffId> = scheduler.ctx.roster().to_vec();

    for slot in &ordered {
        let already = scheduler.staffed(slot.date, slot.shift);
        let need = slot.headcount.saturating_sub(already);
        if need == 0 {
            continue;
        }

        let mut ineligible = IneligibleCounts::default();
        let mut candidates: Vec<StaffId> = Vec::with_capacity(roster.len());
        for &staff in &roster {
            match scheduler.check(staff, slot.date, slot.shift) {
                Verdict::Eligible => candidates.push(staff),
                Verdict::Busy => ineligible.busy += 1,
                Verdict::Blocked => ineligible.blocked += 1,
                Verdict::Transition => ineligible.transition += 1,
            }
        }

        // SOFT d'abord évité, puis moins d'heures, puis identifiant
        candidates.sort_by_key(|staff| {
            (
                scheduler.ctx.is_soft_avoid(*staff, slot.date),
                scheduler.ledger.get(staff).copied().unwrap_or(0),
                *staff,
            )
        });

        let mut placed = 0u32;
        for staff in candidates.into_iter().take(need as usize) {
            if scheduler.ctx.is_soft_avoid(staff, slot.date) {
                debug!(%staff, date = %slot.date, shift = %slot.shift, "soft request overridden");
                scheduler.soft_overrides.push(SoftOverride {
                    date: slot.date,
                    shift: slot.shift,
                    staff_id: staff,
                });
            }
            scheduler.place(staff, slot.date, slot.shift);
            placed += 1;
        }

        if placed < need {
            let missing = need - placed;
            let reason = if roster.is_empty() {
                UnfilledReason::EmptyRoster
            } else {
                UnfilledReason::NoEligibleStaff
            };
            debug!(
                date = %slot.date,
                shift = %slot.shift,
                missing,
                reason = reason.as_str(),
                "slot left short"
            );
            scheduler.unfilled.push(UnfilledSlot {
                date: slot.date,
                shift: slot.shift,
                required: slot.headcount,
                assigned: already + placed,
                missing,
                reason,
                ineligible,
            });
        }
    }

    Ok(())
}
