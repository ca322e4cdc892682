#![forbid(unsafe_code)]
//! Nöbet — bibliothèque de planification mensuelle des gardes (sans BD).
//!
//! - Calendrier du mois, créneaux requis (DAY/NIGHT en semaine, D24 le week-end).
//! - Contexte de contraintes : blocages durs, évitements souples, heures minimales.
//! - Moteur glouton + passe d'équilibrage bornée.
//! - Validateur indépendant qui ré-audite n'importe quel lot d'affectations.
//! - Import/export fichiers (CSV/JSON) en périphérie ; le cœur ne fait aucune I/O.

pub mod calendar;
pub mod context;
pub mod io;
pub mod model;
pub mod policy;
pub mod report;
pub mod requirements;
pub mod scheduler;
pub mod storage;
pub mod validator;

pub use calendar::{count_weekdays_excluding_holidays, month_days, CalendarError, DayInfo};
pub use context::{ConstraintContext, ContextError, PlanInputs};
pub use model::{
    ApplyDay, Assignment, BlockReason, DayKind, DayState, LeaveKind, LeaveRecord, NextKind,
    PrevKind, RequestKind, RequestStatus, RequiredSlot, ShiftType, Staff, StaffId, StaffRequest,
    TransitionRule,
};
pub use policy::{
    apply_preset, export_policy_json, load_policy_from_file, Headcounts, Policy, PolicyError,
    RulePreset, ShiftHours, MAX_SHIFT_HOURS,
};
pub use report::{hours_summary, render_month, HoursRow, ReportRenderer, TextReport};
pub use requirements::{build_required_slots, required_slots_for_month};
pub use scheduler::{
    AssignOptions, IneligibleCounts, PlanOutcome, SchedError, Scheduler, SoftOverride,
    UnfilledReason, UnfilledSlot,
};
pub use storage::{JsonStorage, MonthBatch, PlanArchive, Storage};
pub use validator::{AuditReport, Deficit, Validator, ViolationKind, ViolationRecord};
