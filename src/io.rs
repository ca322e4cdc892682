use crate::calendar;
use crate::model::{
    Assignment, LeaveKind, LeaveRecord, RequestKind, RequestStatus, ShiftType, Staff, StaffId,
    StaffRequest,
};
use crate::scheduler::PlanOutcome;
use crate::validator::AuditReport;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Import du personnel depuis CSV: header `id,full_name[,active]`
pub fn import_staff_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Staff>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for rec in rdr.records() {
        let rec = rec?;
        let id: StaffId = rec.get(0).context("missing id")?.parse()?;
        let name = rec.get(1).context("missing full_name")?.trim();
        if name.is_empty() {
            bail!("invalid staff row {id} (empty name)");
        }
        if !seen.insert(id) {
            bail!("duplicate staff id {id}");
        }
        let mut staff = Staff::new(id.get(), name);
        if let Some(flag) = rec.get(2) {
            let flag = flag.trim();
            if !flag.is_empty() {
                staff.active = parse_bool(flag)
                    .with_context(|| format!("invalid active value for staff {id}"))?;
            }
        }
        out.push(staff);
    }
    Ok(out)
}

fn parse_bool(s: &str) -> anyhow::Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "evet" => Ok(true),
        "false" | "0" | "no" | "n" | "hayir" => Ok(false),
        _ => bail!("expected boolean"),
    }
}

/// Import des rapports/congés: header `staff_id,dates,kind[,note]`.
///
/// `dates` accepte des jours isolés et des plages inclusives
/// (`2025-10-01..2025-10-05` ou `2025-10-01/2025-10-05`) séparés par `;`.
pub fn import_leave_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<LeaveRecord>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let staff_id: StaffId = rec.get(0).context("missing staff_id")?.parse()?;
        let dates = rec.get(1).context("missing dates")?;
        let kind: LeaveKind = rec.get(2).context("missing kind")?.parse()?;
        let note = rec
            .get(3)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);
        let days = parse_date_ranges(dates)
            .with_context(|| format!("invalid dates value for staff {staff_id}"))?;
        for date in days {
            out.push(LeaveRecord {
                staff_id,
                date,
                kind,
                note: note.clone(),
            });
        }
    }
    Ok(out)
}

pub fn parse_date_ranges(raw: &str) -> anyhow::Result<Vec<NaiveDate>> {
    let mut out = Vec::new();
    for chunk in raw.split(';').map(str::trim).filter(|c| !c.is_empty()) {
        if let Some((start_raw, end_raw)) = chunk.split_once("..").or_else(|| chunk.split_once('/')) {
            let start = parse_day(start_raw.trim())?;
            let end = parse_day(end_raw.trim())?;
            if end < start {
                bail!("range end {end} is before start {start}");
            }
            out.extend(start.iter_days().take_while(|d| *d <= end));
        } else {
            out.push(parse_day(chunk)?);
        }
    }
    Ok(out)
}

fn parse_day(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

/// Import des demandes: header `staff_id,date,kind,status[,note]`
pub fn import_requests_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<StaffRequest>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let staff_id: StaffId = rec.get(0).context("missing staff_id")?.parse()?;
        let date = parse_day(rec.get(1).context("missing date")?.trim())?;
        let kind: RequestKind = rec.get(2).context("missing kind")?.parse()?;
        let status: RequestStatus = match rec.get(3).map(str::trim) {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => RequestStatus::default(),
        };
        let note = rec
            .get(4)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_owned);
        out.push(StaffRequest {
            staff_id,
            date,
            kind,
            status,
            note,
        });
    }
    Ok(out)
}

/// Import des jours fériés: header `date[,name]`
pub fn import_holidays_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<BTreeSet<NaiveDate>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = BTreeSet::new();
    for rec in rdr.records() {
        let rec = rec?;
        out.insert(parse_day(rec.get(0).context("missing date")?.trim())?);
    }
    Ok(out)
}

/// Import d'affectations externes: header `date,shift_type,staff_id`
pub fn import_assignments_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Assignment>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let date = parse_day(rec.get(0).context("missing date")?.trim())?;
        let shift: ShiftType = rec.get(1).context("missing shift_type")?.parse()?;
        let staff_id: StaffId = rec.get(2).context("missing staff_id")?.parse()?;
        out.push(Assignment::new(date, shift, staff_id));
    }
    Ok(out)
}

fn names_by_id(staff: &[Staff]) -> BTreeMap<StaffId, &str> {
    staff.iter().map(|s| (s.id, s.full_name.as_str())).collect()
}

/// Export CSV des affectations: header `date,shift_type,staff_id,full_name`
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    assignments: &[Assignment],
    staff: &[Staff],
) -> anyhow::Result<()> {
    let names = names_by_id(staff);
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["date", "shift_type", "staff_id", "full_name"])?;
    let mut buf = itoa::Buffer::new();
    for a in assignments {
        let date = a.date.to_string();
        let name = names.get(&a.staff_id).copied().unwrap_or("");
        w.write_record([
            date.as_str(),
            a.shift.as_str(),
            buf.format(a.staff_id.get()),
            name,
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export CSV de l'audit: header `kind,date,shift_type,staff_id,detail`
pub fn export_audit_csv<P: AsRef<Path>>(path: P, report: &AuditReport) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["kind", "date", "shift_type", "staff_id", "detail"])?;
    let mut buf = itoa::Buffer::new();
    for v in &report.violations {
        let date = v.date.map(|d| d.to_string()).unwrap_or_default();
        let shift = v.shift.map(ShiftType::as_str).unwrap_or("");
        let staff = v.staff_id.map(|id| buf.format(id.get()).to_owned()).unwrap_or_default();
        w.write_record([
            v.kind.as_str(),
            date.as_str(),
            shift,
            staff.as_str(),
            v.detail.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export matriciel personnel × jours (une colonne par jour, code de garde en cellule).
pub fn export_matrix_csv<P: AsRef<Path>>(
    path: P,
    year: i32,
    month: u32,
    assignments: &[Assignment],
    staff: &[Staff],
) -> anyhow::Result<()> {
    let days = calendar::month_days(year, month)?;
    let mut cells: BTreeMap<(StaffId, NaiveDate), Vec<&str>> = BTreeMap::new();
    for a in assignments {
        cells.entry((a.staff_id, a.date)).or_default().push(a.shift.as_str());
    }

    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    let mut header = vec!["staff_id".to_string(), "full_name".to_string()];
    header.extend(days.iter().map(|d| d.iso()));
    w.write_record(&header)?;

    let mut buf = itoa::Buffer::new();
    for person in staff {
        let mut row = vec![buf.format(person.id.get()).to_owned(), person.full_name.clone()];
        row.extend(days.iter().map(|d| {
            cells
                .get(&(person.id, d.date))
                .map(|codes| codes.join("+"))
                .unwrap_or_default()
        }));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Export JSON du résultat (jolie mise en forme)
pub fn export_outcome_json<P: AsRef<Path>>(path: P, outcome: &PlanOutcome) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(outcome)?;
    fs::write(path, s)?;
    Ok(())
}
