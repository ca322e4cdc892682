#![forbid(unsafe_code)]
use chrono::NaiveDate;
use nobet::{
    required_slots_for_month, ApplyDay, AssignOptions, Assignment, ConstraintContext, Headcounts,
    LeaveKind, LeaveRecord, NextKind, PlanInputs, Policy, PolicyError, PrevKind, RequestKind,
    RequiredSlot, RulePreset, SchedError, Scheduler, ShiftType, SoftOverride, StaffId,
    StaffRequest, TransitionRule, UnfilledReason, Validator,
};

fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

fn sid(raw: i64) -> StaffId {
    StaffId::new(raw)
}

fn roster(n: i64) -> Vec<StaffId> {
    (1..=n).map(StaffId::new).collect()
}

fn one_each() -> Headcounts {
    Headcounts {
        weekday_day: 1,
        weekday_night: 1,
        weekend_d24: 1,
    }
}

fn small_policy(rules: Vec<TransitionRule>) -> Policy {
    Policy {
        headcounts: one_each(),
        rules,
        ..Policy::default()
    }
}

fn slots(month: u32, policy: &Policy) -> Vec<RequiredSlot> {
    required_slots_for_month(2025, month, &policy.headcounts).unwrap()
}

#[test]
fn full_roster_fills_every_slot() {
    let inputs = PlanInputs::new(2025, 9, roster(40));
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = Policy::default();

    let outcome = Scheduler::plan(&ctx, &policy, &slots(9, &policy)).unwrap();
    assert!(outcome.unfilled.is_empty());
    assert!(outcome.unfilled_debug.is_empty());
    assert_eq!(outcome.assignments.len(), 22 * 24 + 8 * 12);
    assert_eq!(outcome.total_hours(), 22 * 12 * (8 + 16) + 8 * 12 * 24);
}

#[test]
fn empty_roster_reports_every_slot() {
    let inputs = PlanInputs::new(2025, 10, Vec::new());
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = Policy::default();

    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    assert!(outcome.assignments.is_empty());
    assert_eq!(outcome.unfilled.len(), 23 * 2 + 8);
    assert_eq!(outcome.missing_heads(), 23 * 24 + 8 * 12);
    assert!(outcome
        .unfilled_debug
        .iter()
        .all(|u| u.reason == UnfilledReason::EmptyRoster && u.assigned == 0));
}

#[test]
fn blocked_everyone_leaves_slot_short() {
    let mut inputs = PlanInputs::new(2025, 10, roster(3));
    inputs.leave = (1..=3)
        .map(|id| LeaveRecord::new(sid(id), d(10, 4), LeaveKind::Rapor))
        .collect();
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = small_policy(Vec::new());

    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    assert_eq!(outcome.unfilled_debug.len(), 1);
    let short = &outcome.unfilled_debug[0];
    assert_eq!((short.date, short.shift), (d(10, 4), ShiftType::D24));
    assert_eq!((short.required, short.assigned, short.missing), (1, 0, 1));
    assert_eq!(short.reason, UnfilledReason::NoEligibleStaff);
    assert_eq!(short.ineligible.blocked, 3);
    assert_eq!(
        outcome.unfilled,
        vec![RequiredSlot {
            date: d(10, 4),
            shift: ShiftType::D24,
            headcount: 1
        }]
    );
    assert!(outcome.assignments.iter().all(|a| a.date != d(10, 4)));
}

#[test]
fn ineligibility_is_broken_down() {
    let inputs = PlanInputs::new(2025, 10, roster(1));
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = small_policy(vec![TransitionRule::new(
        PrevKind::D24,
        NextKind::Any,
        ApplyDay::Any,
    )]);

    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    let night = outcome
        .unfilled_debug
        .iter()
        .find(|u| u.date == d(10, 1) && u.shift == ShiftType::Night)
        .unwrap();
    assert_eq!(night.ineligible.busy, 1);

    assert!(outcome
        .assignments
        .contains(&Assignment::new(d(10, 4), ShiftType::D24, sid(1))));
    let sunday = outcome
        .unfilled_debug
        .iter()
        .find(|u| u.date == d(10, 5))
        .unwrap();
    assert_eq!(sunday.ineligible.transition, 1);
    assert_eq!(sunday.missing, 1);
}

#[test]
fn any_previous_state_matches_a_free_day() {
    let inputs = PlanInputs::new(2025, 10, roster(4));
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = small_policy(vec![TransitionRule::new(
        PrevKind::Any,
        NextKind::Day,
        ApplyDay::Weekday,
    )]);

    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    assert!(outcome.assignments.iter().all(|a| a.shift != ShiftType::Day));
    assert_eq!(outcome.unfilled.len(), 23);
    assert!(outcome.unfilled.iter().all(|s| s.shift == ShiftType::Day));
}

#[test]
fn soft_request_overridden_when_no_one_else() {
    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.requests = vec![
        StaffRequest::approved(sid(2), d(10, 4), RequestKind::Hard),
        StaffRequest::approved(sid(1), d(10, 4), RequestKind::Soft),
    ];
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = small_policy(Vec::new());

    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    assert!(outcome
        .assignments
        .contains(&Assignment::new(d(10, 4), ShiftType::D24, sid(1))));
    assert_eq!(
        outcome.soft_overrides,
        vec![SoftOverride {
            date: d(10, 4),
            shift: ShiftType::D24,
            staff_id: sid(1)
        }]
    );
}

#[test]
fn soft_request_is_honoured_when_possible() {
    let policy = small_policy(Vec::new());
    let no_balance = AssignOptions {
        balance: false,
        ..AssignOptions::default()
    };

    // sans demande, la personne 1 (moins d'heures) prend le samedi
    let ctx = ConstraintContext::assemble(&PlanInputs::new(2025, 10, roster(2)), 8).unwrap();
    let mut scheduler = Scheduler::new(&ctx, &policy).unwrap().with_options(no_balance);
    scheduler.fill(&slots(10, &policy)).unwrap();
    assert!(scheduler
        .assignments()
        .contains(&Assignment::new(d(10, 4), ShiftType::D24, sid(1))));

    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.requests = vec![StaffRequest::approved(sid(1), d(10, 4), RequestKind::Soft)];
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let outcome = Scheduler::plan(&ctx, &policy, &slots(10, &policy)).unwrap();
    assert!(outcome
        .assignments
        .contains(&Assignment::new(d(10, 4), ShiftType::D24, sid(2))));
    assert!(outcome.soft_overrides.is_empty());
}

#[test]
fn balancing_moves_surplus_to_deficit() {
    let ctx = ConstraintContext::assemble(&PlanInputs::new(2025, 10, roster(3)), 8).unwrap();
    let policy = small_policy(Vec::new());
    let target = 23 * 8;

    let mut seed = Vec::new();
    for slot in slots(10, &policy) {
        let owner = match slot.shift {
            ShiftType::Day | ShiftType::D24 => sid(1),
            ShiftType::Night => sid(2),
        };
        seed.push(Assignment::new(slot.date, slot.shift, owner));
    }

    let mut scheduler = Scheduler::new(&ctx, &policy).unwrap();
    scheduler.seed(&seed).unwrap();
    assert_eq!(scheduler.hours()[&sid(1)], 23 * 8 + 8 * 24);
    assert_eq!(scheduler.hours()[&sid(2)], 23 * 16);
    assert_eq!(scheduler.hours()[&sid(3)], 0);

    let swaps = scheduler.balance();
    let outcome = scheduler.finish();

    assert!(swaps > 0);
    assert_eq!(outcome.swap_count, swaps);
    for id in 1..=3 {
        assert!(outcome.hours[&sid(id)] >= target, "staff {id} below target");
    }
    assert_eq!(outcome.total_hours(), 376 + 368);
    let taken = outcome
        .assignments
        .iter()
        .filter(|a| a.staff_id == sid(3))
        .count() as u32;
    assert_eq!(taken, swaps);
    assert_eq!(outcome.assignments.len(), seed.len());
}

#[test]
fn residual_deficit_is_reported_not_forced() {
    let ctx = ConstraintContext::assemble(&PlanInputs::new(2025, 10, roster(2)), 8).unwrap();
    let policy = small_policy(Vec::new());
    let seed: Vec<Assignment> = slots(10, &policy)
        .into_iter()
        .filter(|s| s.shift == ShiftType::Day)
        .map(|s| Assignment::new(s.date, s.shift, sid(1)))
        .collect();

    let mut scheduler = Scheduler::new(&ctx, &policy).unwrap();
    scheduler.seed(&seed).unwrap();
    assert_eq!(scheduler.balance(), 0);
    let outcome = scheduler.finish();
    assert_eq!(outcome.swap_count, 0);

    let audit = Validator::new(&ctx, &policy).audit(&outcome.assignments);
    assert!(audit.hard_ok);
    assert!(!audit.min_hours_ok);
    assert_eq!(audit.deficits.len(), 1);
    assert_eq!(audit.deficits[0].staff_id, sid(2));
    assert_eq!(audit.deficits[0].shortfall, 23 * 8);
}

#[test]
fn balancing_conserves_total_hours() {
    let mut inputs = PlanInputs::new(2025, 9, roster(30));
    inputs.leave = (1..=5)
        .map(|day| LeaveRecord::new(sid(1), d(9, day), LeaveKind::Rapor))
        .collect();
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = Policy::from_preset(RulePreset::Default);
    let slots = slots(9, &policy);

    let mut greedy = Scheduler::new(&ctx, &policy).unwrap().with_options(AssignOptions {
        balance: false,
        ..AssignOptions::default()
    });
    greedy.fill(&slots).unwrap();
    let greedy = greedy.finish();

    let balanced = Scheduler::plan(&ctx, &policy, &slots).unwrap();
    assert_eq!(greedy.total_hours(), balanced.total_hours());
    assert_eq!(greedy.assignments.len(), balanced.assignments.len());
}

fn busy_month() -> PlanInputs {
    let mut inputs = PlanInputs::new(2025, 9, roster(40));
    inputs.leave = (1..=5)
        .map(|day| LeaveRecord::new(sid(1), d(9, day), LeaveKind::Rapor))
        .chain((10..=12).map(|day| LeaveRecord::new(sid(2), d(9, day), LeaveKind::YillikIzin)))
        .collect();
    inputs.requests = vec![
        StaffRequest::approved(sid(3), d(9, 15), RequestKind::Hard),
        StaffRequest::approved(sid(4), d(9, 16), RequestKind::Soft),
        StaffRequest::approved(sid(5), d(9, 20), RequestKind::Soft),
    ];
    inputs
}

#[test]
fn plans_are_deterministic() {
    let ctx = ConstraintContext::assemble(&busy_month(), 8).unwrap();
    let policy = Policy::from_preset(RulePreset::Strict);
    let slots = slots(9, &policy);

    let first = Scheduler::plan(&ctx, &policy, &slots).unwrap();
    let second = Scheduler::plan(&ctx, &policy, &slots).unwrap();
    assert_eq!(first, second);
}

#[test]
fn engine_output_passes_hard_audit() {
    let ctx = ConstraintContext::assemble(&busy_month(), 8).unwrap();
    let policy = Policy::from_preset(RulePreset::Default);
    let slots = slots(9, &policy);

    let outcome = Scheduler::plan(&ctx, &policy, &slots).unwrap();
    let audit = Validator::new(&ctx, &policy)
        .with_slots(&slots)
        .audit(&outcome.assignments);
    assert!(audit.hard_ok, "{:?}", audit.hard_violations().collect::<Vec<_>>());
    assert_eq!(audit.hours, outcome.hours);

    // RAPOR -> ANY : pas de garde le lendemain d'un rapport
    assert!(outcome
        .assignments
        .iter()
        .all(|a| !(a.staff_id == sid(1) && a.date <= d(9, 6))));
    assert!(outcome
        .assignments
        .iter()
        .all(|a| !(a.staff_id == sid(3) && a.date == d(9, 15))));
}

#[test]
fn malformed_input_fails_fast() {
    let ctx = ConstraintContext::assemble(&PlanInputs::new(2025, 10, roster(2)), 8).unwrap();
    let policy = small_policy(Vec::new());

    let mut broken = policy.clone();
    broken.headcounts.weekday_day = 0;
    assert!(matches!(
        Scheduler::new(&ctx, &broken),
        Err(SchedError::Policy(PolicyError::ZeroHeadcount("weekday_day")))
    ));

    let mut oversized = policy.clone();
    oversized.shift_hours.d24 = u32::MAX / 2;
    assert!(matches!(
        Scheduler::new(&ctx, &oversized),
        Err(SchedError::Policy(PolicyError::ShiftHoursOutOfRange {
            shift: ShiftType::D24,
            ..
        }))
    ));

    let outside = [RequiredSlot {
        date: d(11, 3),
        shift: ShiftType::Day,
        headcount: 1,
    }];
    assert!(matches!(
        Scheduler::plan(&ctx, &policy, &outside),
        Err(SchedError::SlotOutsideMonth { .. })
    ));

    let empty = [RequiredSlot {
        date: d(10, 1),
        shift: ShiftType::Day,
        headcount: 0,
    }];
    assert!(matches!(
        Scheduler::plan(&ctx, &policy, &empty),
        Err(SchedError::EmptySlot { .. })
    ));

    let wrong_shift = [RequiredSlot {
        date: d(10, 1),
        shift: ShiftType::D24,
        headcount: 1,
    }];
    assert!(matches!(
        Scheduler::plan(&ctx, &policy, &wrong_shift),
        Err(SchedError::ShiftNotAllowed { .. })
    ));
}

#[test]
fn seed_rejects_inconsistent_batches() {
    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.leave = vec![LeaveRecord::new(sid(2), d(10, 2), LeaveKind::Rapor)];
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let policy = small_policy(Vec::new());

    let mut scheduler = Scheduler::new(&ctx, &policy).unwrap();
    assert!(matches!(
        scheduler.seed(&[Assignment::new(d(10, 1), ShiftType::Day, sid(99))]),
        Err(SchedError::UnknownStaff(id)) if id == sid(99)
    ));
    assert!(matches!(
        scheduler.seed(&[Assignment::new(d(10, 2), ShiftType::Day, sid(2))]),
        Err(SchedError::SeedInvalid(_))
    ));
    assert!(matches!(
        scheduler.seed(&[
            Assignment::new(d(10, 1), ShiftType::Day, sid(1)),
            Assignment::new(d(10, 1), ShiftType::Night, sid(1)),
        ]),
        Err(SchedError::SeedInvalid(_))
    ));
    // aucun échec ne laisse de pose partielle
    assert!(scheduler.assignments().is_empty());
    assert_eq!(scheduler.hours()[&sid(1)], 0);

    assert!(matches!(
        scheduler.seed(&[
            Assignment::new(d(10, 1), ShiftType::Day, sid(1)),
            Assignment::new(d(10, 3), ShiftType::Day, sid(99)),
        ]),
        Err(SchedError::UnknownStaff(_))
    ));
    assert!(scheduler.assignments().is_empty());

    scheduler
        .seed(&[Assignment::new(d(10, 1), ShiftType::Day, sid(1))])
        .unwrap();
    assert!(matches!(
        scheduler.seed(&[
            Assignment::new(d(10, 6), ShiftType::Night, sid(2)),
            Assignment::new(d(10, 1), ShiftType::Night, sid(1)),
        ]),
        Err(SchedError::SeedInvalid(_))
    ));
    assert_eq!(
        scheduler.assignments(),
        vec![Assignment::new(d(10, 1), ShiftType::Day, sid(1))]
    );
    assert_eq!(scheduler.hours()[&sid(1)], 8);
    assert_eq!(scheduler.hours()[&sid(2)], 0);
}

fn rapor_from(staff: StaffId, first: u32) -> Vec<LeaveRecord> {
    (first..=31)
        .map(|day| LeaveRecord::new(staff, d(10, day), LeaveKind::Rapor))
        .collect()
}

/// Personne 1 très excédentaire : NIGHT le 1er, DAY en semaine à partir du 3, D24 le week-end.
fn lone_donor_seed(extra: &[Assignment]) -> Vec<Assignment> {
    let mut seed: Vec<Assignment> = slots(10, &small_policy(Vec::new()))
        .into_iter()
        .filter(|s| s.date > d(10, 2) && s.shift != ShiftType::Night)
        .map(|s| Assignment::new(s.date, s.shift, sid(1)))
        .collect();
    seed.push(Assignment::new(d(10, 1), ShiftType::Night, sid(1)));
    seed.extend_from_slice(extra);
    seed
}

fn seeded_swaps<'a>(
    ctx: &'a ConstraintContext,
    policy: &Policy,
    seed: &[Assignment],
) -> (u32, Scheduler<'a>) {
    let mut scheduler = Scheduler::new(ctx, policy).unwrap();
    scheduler.seed(seed).unwrap();
    let swaps = scheduler.balance();
    (swaps, scheduler)
}

#[test]
fn balancing_checks_the_recipient_next_day() {
    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.leave = rapor_from(sid(2), 3);
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    assert_eq!(ctx.min_hours(sid(2)), Some(16));
    let seed = lone_donor_seed(&[Assignment::new(d(10, 2), ShiftType::Day, sid(2))]);

    // seule garde cessible : la nuit du 1er, suivie du DAY du 2 chez la personne 2
    let policy = small_policy(vec![TransitionRule::new(
        PrevKind::Night,
        NextKind::Day,
        ApplyDay::Any,
    )]);
    let (swaps, scheduler) = seeded_swaps(&ctx, &policy, &seed);
    assert_eq!(swaps, 0);
    assert_eq!(scheduler.hours()[&sid(2)], 8);
    let audit = Validator::new(&ctx, &policy).audit(&scheduler.assignments());
    assert!(audit.hard_ok, "{:?}", audit.violations);

    let free = small_policy(Vec::new());
    let (swaps, scheduler) = seeded_swaps(&ctx, &free, &seed);
    assert_eq!(swaps, 1);
    assert!(scheduler
        .assignments()
        .contains(&Assignment::new(d(10, 1), ShiftType::Night, sid(2))));
    assert_eq!(scheduler.hours()[&sid(2)], 24);
}

#[test]
fn balancing_checks_the_donor_next_day() {
    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.leave = rapor_from(sid(2), 2);
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    assert_eq!(ctx.min_hours(sid(2)), Some(8));
    let seed = lone_donor_seed(&[Assignment::new(d(10, 2), ShiftType::Day, sid(1))]);

    // céder la nuit du 1er placerait le DAY du 2 après un jour libre
    let policy = small_policy(vec![TransitionRule::new(
        PrevKind::Any,
        NextKind::Day,
        ApplyDay::Weekday,
    )]);
    let (swaps, scheduler) = seeded_swaps(&ctx, &policy, &seed);
    assert_eq!(swaps, 0);
    assert_eq!(scheduler.hours()[&sid(2)], 0);
    assert!(scheduler
        .assignments()
        .contains(&Assignment::new(d(10, 1), ShiftType::Night, sid(1))));

    let free = small_policy(Vec::new());
    let (swaps, scheduler) = seeded_swaps(&ctx, &free, &seed);
    assert_eq!(swaps, 1);
    assert_eq!(scheduler.hours()[&sid(2)], 16);
}

#[test]
fn balancing_skips_soft_avoid_days() {
    let mut inputs = PlanInputs::new(2025, 10, roster(2));
    inputs.leave = rapor_from(sid(2), 2);
    inputs.requests = vec![StaffRequest::approved(sid(2), d(10, 1), RequestKind::Soft)];
    let ctx = ConstraintContext::assemble(&inputs, 8).unwrap();
    let seed = lone_donor_seed(&[]);

    let (swaps, scheduler) = seeded_swaps(&ctx, &small_policy(Vec::new()), &seed);
    assert_eq!(swaps, 0);
    let outcome = scheduler.finish();
    assert_eq!(outcome.hours[&sid(2)], 0);
    assert!(outcome.soft_overrides.is_empty());
}
