use crate::calendar::{self, DayInfo};
use crate::context::ConstraintContext;
use crate::model::{Assignment, ShiftType, Staff, StaffId};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Ligne du récapitulatif d'heures par personne.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoursRow {
    pub staff_id: StaffId,
    pub full_name: String,
    pub total: u32,
    pub min_hours: u32,
    /// positif = excédent, négatif = déficit
    pub diff: i64,
}

/// Récapitulatif trié du plus gros déficit au plus gros excédent.
pub fn hours_summary(
    hours: &BTreeMap<StaffId, u32>,
    ctx: &ConstraintContext,
    staff: &[Staff],
) -> Vec<HoursRow> {
    let names: BTreeMap<StaffId, &str> =
        staff.iter().map(|s| (s.id, s.full_name.as_str())).collect();
    let mut rows: Vec<HoursRow> = ctx
        .roster()
        .iter()
        .map(|id| {
            let total = hours.get(id).copied().unwrap_or(0);
            let min_hours = ctx.min_hours(*id).unwrap_or(0);
            HoursRow {
                staff_id: *id,
                full_name: names
                    .get(id)
                    .map_or_else(|| format!("ID:{id}"), |n| (*n).to_string()),
                total,
                min_hours,
                diff: i64::from(total) - i64::from(min_hours),
            }
        })
        .collect();
    rows.sort_by_key(|r| (r.diff, r.staff_id));
    rows
}

/// Permet de customiser le rendu du planning (texte, markdown, etc.).
pub trait ReportRenderer {
    fn render_day(&self, day: &DayInfo, crews: &BTreeMap<ShiftType, Vec<&str>>) -> String;
}

/// Rendu texte simple, une section par jour.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReport;

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl ReportRenderer for TextReport {
    fn render_day(&self, day: &DayInfo, crews: &BTreeMap<ShiftType, Vec<&str>>) -> String {
        let mut out = format!("{} ({})", day.iso(), WEEKDAY_NAMES[usize::from(day.weekday)]);
        if day.is_weekend {
            out.push_str(" - weekend");
        }
        out.push('\n');
        for &shift in ShiftType::for_day(day.kind()) {
            let label = match shift {
                ShiftType::Day => "Day (08:00-16:00)",
                ShiftType::Night => "Night (16:00-08:00)",
                ShiftType::D24 => "24h (08:00-08:00)",
            };
            match crews.get(&shift).filter(|names| !names.is_empty()) {
                Some(names) => {
                    let _ = writeln!(out, "  {label}: {}", names.join(", "));
                }
                None => {
                    let _ = writeln!(out, "  {label}: (empty)");
                }
            }
        }
        out
    }
}

/// Prépare le planning du mois, jour par jour.
pub fn render_month(
    year: i32,
    month: u32,
    assignments: &[Assignment],
    staff: &[Staff],
    renderer: &dyn ReportRenderer,
) -> Result<String> {
    let days = calendar::month_days(year, month)?;
    let names: BTreeMap<StaffId, &str> =
        staff.iter().map(|s| (s.id, s.full_name.as_str())).collect();

    let mut by_day: BTreeMap<_, BTreeMap<ShiftType, Vec<&str>>> = BTreeMap::new();
    for a in assignments {
        let name = names.get(&a.staff_id).copied().unwrap_or("?");
        by_day
            .entry(a.date)
            .or_default()
            .entry(a.shift)
            .or_default()
            .push(name);
    }
    for crews in by_day.values_mut() {
        for names in crews.values_mut() {
            names.sort_unstable();
        }
    }

    let empty = BTreeMap::new();
    let mut out = String::new();
    for day in &days {
        out.push_str(&renderer.render_day(day, by_day.get(&day.date).unwrap_or(&empty)));
    }
    Ok(out)
}
