use super::eligibility::Verdict;
use super::Scheduler;
use crate::model::{ShiftType, StaffId};
use chrono::NaiveDate;
use std::cmp::Reverse;
use tracing::debug;

/// Réaffectation candidate : `donor` cède sa garde du `date` à la personne en déficit.
#[derive(Debug, Clone, Copy)]
struct Move {
    date: NaiveDate,
    shift: ShiftType,
    donor: StaffId,
    donor_surplus: u32,
}

pub(super) fn balance(scheduler: &mut Scheduler<'_>) -> u32 {
    let mut swaps = 0u32;

    for pass in 0..scheduler.opts.max_balance_passes {
        scheduler.balance_passes = pass + 1;
        let mut moved = false;

        for staff in deficit_staff(scheduler) {
            while scheduler.shortfall(staff) > 0 {
                let Some(mv) = best_move(scheduler, staff) else {
                    break;
                };
                scheduler.release(mv.donor, mv.date);
                scheduler.place(staff, mv.date, mv.shift);
                swaps += 1;
                moved = true;
                debug!(
                    from = %mv.donor,
                    to = %staff,
                    date = %mv.date,
                    shift = %mv.shift,
                    "balancing swap"
                );
            }
        }

        if !moved {
            break;
        }
    }

    scheduler.swap_count += swaps;
    swaps
}

/// Personnes sous leur objectif, plus gros déficit d'abord.
fn deficit_staff(scheduler: &Scheduler<'_>) -> Vec<StaffId> {
    let mut out: Vec<(u32, StaffId)> = scheduler
        .ctx
        .roster()
        .iter()
        .map(|id| (scheduler.shortfall(*id), *id))
        .filter(|(gap, _)| *gap > 0)
        .collect();
    out.sort_by_key(|(gap, id)| (Reverse(*gap), *id));
    out.into_iter().map(|(_, id)| id).collect()
}

fn surplus_after(scheduler: &Scheduler<'_>, donor: StaffId, hours: u32) -> Option<u32> {
    let worked = scheduler.ledger.get(&donor).copied()?;
    let target = scheduler.ctx.min_hours(donor).unwrap_or(0);
    let left = worked.checked_sub(hours)?;
    (left >= target).then(|| worked - target)
}

/// Meilleur mouvement : donneur le plus excédentaire, puis date, garde, identifiant.
fn best_move(scheduler: &Scheduler<'_>, staff: StaffId) -> Option<Move> {
    let ctx = scheduler.ctx;
    let mut best: Option<Move> = None;

    for (date, day) in &scheduler.board {
        let date = *date;
        if day.contains_key(&staff) || ctx.is_blocked(staff, date) || ctx.is_soft_avoid(staff, date)
        {
            continue;
        }
        for (donor, shift) in day {
            let (donor, shift) = (*donor, *shift);
            let Some(donor_surplus) = surplus_after(scheduler, donor, scheduler.shift_hours.of(shift))
            else {
                continue;
            };
            if scheduler.check(staff, date, shift) != Verdict::Eligible
                || !scheduler.release_ok(donor, date)
            {
                continue;
            }
            let candidate = Move {
                date,
                shift,
                donor,
                donor_surplus,
            };
            let better = best.map_or(true, |b| rank(&candidate) < rank(&b));
            if better {
                best = Some(candidate);
            }
        }
    }

    best
}

fn rank(mv: &Move) -> (Reverse<u32>, NaiveDate, ShiftType, StaffId) {
    (Reverse(mv.donor_surplus), mv.date, mv.shift, mv.donor)
}
