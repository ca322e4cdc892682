use crate::calendar::{self, CalendarError, DayInfo};
use crate::model::{RequiredSlot, ShiftType};
use crate::policy::Headcounts;

/// Construit la demande du mois : DAY + NIGHT en semaine, D24 le week-end.
///
/// Les jours fériés de semaine gardent le découpage DAY/NIGHT ; ils n'influent
/// que sur l'objectif d'heures minimal.
pub fn build_required_slots(days: &[DayInfo], headcounts: &Headcounts) -> Vec<RequiredSlot> {
    let mut out = Vec::with_capacity(days.len() * 2);
    for day in days {
        for &shift in ShiftType::for_day(day.kind()) {
            out.push(RequiredSlot {
                date: day.date,
                shift,
                headcount: headcounts.for_shift(shift),
            });
        }
    }
    out
}

pub fn required_slots_for_month(
    year: i32,
    month: u32,
    headcounts: &Headcounts,
) -> Result<Vec<RequiredSlot>, CalendarError> {
    let days = calendar::month_days(year, month)?;
    Ok(build_required_slots(&days, headcounts))
}
