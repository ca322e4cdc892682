#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nobet::{
    calendar, io,
    policy::{apply_preset, export_policy_json, load_policy_from_file, Policy, RulePreset},
    report::{hours_summary, render_month, TextReport},
    requirements::required_slots_for_month,
    scheduler::Scheduler,
    storage::{JsonStorage, MonthBatch, Storage},
    validator::{AuditReport, Validator},
    ConstraintContext, PlanInputs, Staff,
};
use std::collections::BTreeSet;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Planificateur mensuel de gardes (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Archive JSON des plannings mensuels
    #[arg(long, global = true, default_value = "plans.json")]
    store: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug)]
struct MonthArgs {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    month: u32,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// CSV `id,full_name[,active]`
    #[arg(long)]
    staff: String,
    /// CSV `staff_id,dates,kind[,note]`
    #[arg(long)]
    leave: Option<String>,
    /// CSV `staff_id,date,kind,status[,note]`
    #[arg(long)]
    requests: Option<String>,
    /// CSV `date[,name]`
    #[arg(long)]
    holidays: Option<String>,
    /// Politique JSON (effectifs, durées, règles)
    #[arg(long)]
    policy: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Afficher les jours du mois et le minimum d'heures de base
    Days {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long)]
        holidays: Option<String>,
        #[arg(long)]
        policy: Option<String>,
    },

    /// Lister les créneaux requis du mois
    Slots {
        #[command(flatten)]
        month: MonthArgs,
        #[arg(long)]
        policy: Option<String>,
    },

    /// Écrire une politique JSON à partir d'un preset de règles
    Preset {
        /// default | strict | flexible
        #[arg(long, default_value = "default")]
        name: RulePreset,
        /// Politique existante dans laquelle fusionner le preset
        #[arg(long)]
        base: Option<String>,
        /// Désactive les règles hors preset
        #[arg(long)]
        exclusive: bool,
        #[arg(long)]
        out: String,
    },

    /// Générer le planning du mois (remplace le lot existant)
    Plan {
        #[command(flatten)]
        month: MonthArgs,
        #[command(flatten)]
        inputs: InputArgs,
        #[arg(long)]
        out_csv: Option<String>,
        #[arg(long)]
        out_json: Option<String>,
        /// Export CSV de l'audit (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Auditer le planning stocké ou un CSV d'affectations
    Validate {
        #[command(flatten)]
        month: MonthArgs,
        #[command(flatten)]
        inputs: InputArgs,
        /// CSV `date,shift_type,staff_id` (sinon: lot stocké)
        #[arg(long)]
        assignments: Option<String>,
        #[arg(long)]
        report: Option<String>,
    },

    /// Afficher le planning stocké jour par jour et le récapitulatif d'heures
    Show {
        #[command(flatten)]
        month: MonthArgs,
        #[command(flatten)]
        inputs: InputArgs,
        /// Export CSV matriciel personnel × jours
        #[arg(long)]
        out_matrix: Option<String>,
    },
}

fn load_policy(path: Option<&str>) -> Result<Policy> {
    match path {
        Some(p) => load_policy_from_file(p),
        None => Ok(Policy::default()),
    }
}

fn load_holidays(path: Option<&str>) -> Result<BTreeSet<chrono::NaiveDate>> {
    match path {
        Some(p) => io::import_holidays_csv(p),
        None => Ok(BTreeSet::new()),
    }
}

fn load_context(
    month: &MonthArgs,
    inputs: &InputArgs,
    policy: &Policy,
) -> Result<(Vec<Staff>, ConstraintContext)> {
    let staff = io::import_staff_csv(&inputs.staff)?;
    let roster = staff.iter().filter(|s| s.active).map(|s| s.id).collect();
    let mut plan_inputs = PlanInputs::new(month.year, month.month, roster);
    if let Some(path) = &inputs.leave {
        plan_inputs.leave = io::import_leave_csv(path)?;
    }
    if let Some(path) = &inputs.requests {
        plan_inputs.requests = io::import_requests_csv(path)?;
    }
    plan_inputs.holidays = load_holidays(inputs.holidays.as_deref())?;
    let ctx = ConstraintContext::assemble(&plan_inputs, policy.weekday_credit_hours)?;
    Ok((staff, ctx))
}

fn print_audit(audit: &AuditReport) {
    println!(
        "hard constraints: {} | minimum hours: {}",
        if audit.hard_ok { "OK" } else { "VIOLATED" },
        if audit.min_hours_ok { "OK" } else { "DEFICIT" }
    );
    for v in &audit.violations {
        let date = v.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        let shift = v.shift.map(|s| s.as_str()).unwrap_or("-");
        let staff = v.staff_id.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
        println!("{} | {date} | {shift} | {staff} | {}", v.kind.as_str(), v.detail);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.store)?;

    let code = match cli.cmd {
        Commands::Days {
            month,
            holidays,
            policy,
        } => {
            let policy = load_policy(policy.as_deref())?;
            let holidays = load_holidays(holidays.as_deref())?;
            for day in calendar::month_days(month.year, month.month)? {
                let tag = if day.is_weekend {
                    " weekend"
                } else if holidays.contains(&day.date) {
                    " holiday"
                } else {
                    ""
                };
                println!("{} {}{tag}", day.iso(), day.weekday);
            }
            let weekdays =
                calendar::count_weekdays_excluding_holidays(month.year, month.month, &holidays)?;
            println!("weekdays (excluding holidays): {weekdays}");
            println!(
                "baseline minimum hours: {} x {} = {}",
                weekdays,
                policy.weekday_credit_hours,
                weekdays * policy.weekday_credit_hours
            );
            0
        }
        Commands::Slots { month, policy } => {
            let policy = load_policy(policy.as_deref())?;
            let slots = required_slots_for_month(month.year, month.month, &policy.headcounts)?;
            let mut heads = 0u64;
            let mut hours = 0u64;
            for s in &slots {
                println!("{} {} {}", s.date, s.shift, s.headcount);
                heads += u64::from(s.headcount);
                hours += u64::from(s.headcount) * u64::from(policy.shift_hours.of(s.shift));
            }
            println!("slots: {} | heads: {heads} | hours: {hours}", slots.len());
            0
        }
        Commands::Preset {
            name,
            base,
            exclusive,
            out,
        } => {
            let policy = match base {
                Some(path) => {
                    let mut policy = load_policy_from_file(&path)?;
                    let touched = apply_preset(&mut policy.rules, name, exclusive);
                    println!("preset {name}: {touched} rule(s) touched");
                    policy
                }
                None => Policy::from_preset(name),
            };
            export_policy_json(&out, &policy)?;
            0
        }
        Commands::Plan {
            month,
            inputs,
            out_csv,
            out_json,
            report,
        } => {
            let policy = load_policy(inputs.policy.as_deref())?;
            let (staff, ctx) = load_context(&month, &inputs, &policy)?;
            let slots = required_slots_for_month(month.year, month.month, &policy.headcounts)?;
            let outcome = Scheduler::plan(&ctx, &policy, &slots)?;
            let audit = Validator::new(&ctx, &policy)
                .with_slots(&slots)
                .audit(&outcome.assignments);

            storage
                .replace_month(MonthBatch::from_outcome(month.year, month.month, &outcome))
                .with_context(|| format!("saving {}", cli.store))?;
            if let Some(path) = out_csv {
                io::export_assignments_csv(path, &outcome.assignments, &staff)?;
            }
            if let Some(path) = out_json {
                io::export_outcome_json(path, &outcome)?;
            }
            if let Some(path) = report {
                io::export_audit_csv(path, &audit)?;
            }

            println!(
                "assignments: {} | unfilled slots: {} (missing {}) | swaps: {} | soft overrides: {}",
                outcome.assignments.len(),
                outcome.unfilled.len(),
                outcome.missing_heads(),
                outcome.swap_count,
                outcome.soft_overrides.len()
            );
            for u in &outcome.unfilled_debug {
                println!(
                    "unfilled | {} | {} | {}/{} | {}",
                    u.date,
                    u.shift,
                    u.assigned,
                    u.required,
                    u.reason.as_str()
                );
            }
            print_audit(&audit);

            // Code 2 = WARNING/INCOMPLETE
            if outcome.unfilled.is_empty() && audit.is_clean() {
                0
            } else {
                2
            }
        }
        Commands::Validate {
            month,
            inputs,
            assignments,
            report,
        } => {
            let policy = load_policy(inputs.policy.as_deref())?;
            let (_, ctx) = load_context(&month, &inputs, &policy)?;
            let assignments = match assignments {
                Some(path) => io::import_assignments_csv(path)?,
                None => match storage.load_month(month.year, month.month)? {
                    Some(batch) => batch.assignments,
                    None => bail!("no stored plan for {}-{:02}", month.year, month.month),
                },
            };
            let slots = required_slots_for_month(month.year, month.month, &policy.headcounts)?;
            let audit = Validator::new(&ctx, &policy)
                .with_slots(&slots)
                .audit(&assignments);
            if let Some(path) = report {
                io::export_audit_csv(path, &audit)?;
            }
            print_audit(&audit);
            if audit.is_clean() {
                0
            } else {
                2
            }
        }
        Commands::Show {
            month,
            inputs,
            out_matrix,
        } => {
            let policy = load_policy(inputs.policy.as_deref())?;
            let (staff, ctx) = load_context(&month, &inputs, &policy)?;
            let Some(batch) = storage.load_month(month.year, month.month)? else {
                bail!("no stored plan for {}-{:02}", month.year, month.month);
            };
            let sheet = render_month(month.year, month.month, &batch.assignments, &staff, &TextReport)?;
            print!("{sheet}");

            let audit = Validator::new(&ctx, &policy).audit(&batch.assignments);
            println!("name | id | total | minimum | diff");
            for row in hours_summary(&audit.hours, &ctx, &staff) {
                let sign = if row.diff > 0 { "+" } else { "" };
                println!(
                    "{} | {} | {} | {} | {sign}{}",
                    row.full_name, row.staff_id, row.total, row.min_hours, row.diff
                );
            }
            if let Some(path) = out_matrix {
                io::export_matrix_csv(path, month.year, month.month, &batch.assignments, &staff)?;
            }
            0
        }
    };

    std::process::exit(code);
}
