use chrono::{TimeZone, Utc};
use hrms_kernel::{
    config::Ruleset,
    errors::AppError,
    models::{
        Advance, AdvanceStatus, Earnings, Employee, EmployeeRole, EmploymentClass, MaritalStatus,
        PayrollStatus, YtdAccumulators,
    },
    repository::{MemoryStore, PayrollRepository},
    services::payroll::{MonthlyInput, PayPeriod, PayrollService},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn employee(name: &str, basic: Decimal) -> Employee {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    Employee {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        outlet_id: None,
        full_name: name.to_string(),
        id_number: "920304-10-5521".to_string(),
        date_of_birth: None,
        employment_class: EmploymentClass::Confirmed,
        role: EmployeeRole::Staff,
        basic_salary: basic,
        hourly_rate: None,
        bank_name: "Public Bank".to_string(),
        bank_account_number: "3188-0042-17".to_string(),
        bank_account_holder: name.to_string(),
        epf_number: Some("18842391".to_string()),
        socso_number: None,
        tax_number: None,
        marital_status: MaritalStatus::Single,
        spouse_working: false,
        children_count: 0,
        disabled: false,
        spouse_disabled: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn january() -> PayPeriod {
    PayPeriod::new(2025, 1).unwrap()
}

fn compute(e: &Employee, earnings: Earnings) -> hrms_kernel::models::PayrollItem {
    PayrollService::compute_payroll_item(
        e,
        january(),
        &earnings,
        &YtdAccumulators::default(),
        &Ruleset::default(),
    )
    .unwrap()
}

// ─── Sample slips ─────────────────────────────────────────────────────────────

#[test]
fn salaried_with_allowance() {
    let e = employee("Lau Jia Cheng", dec!(10000));
    let item = compute(
        &e,
        Earnings {
            basic: dec!(10000),
            fixed_allowance: dec!(500),
            ..Earnings::default()
        },
    );

    assert_eq!(item.gross, dec!(10500.00));
    assert_eq!((item.epf_ee, item.epf_er), (dec!(1100), dec!(1200)));
    assert_eq!((item.socso_ee, item.socso_er), (dec!(29.75), dec!(104.15)));
    assert_eq!((item.eis_ee, item.eis_er), (dec!(11.90), dec!(11.90)));
    assert_eq!(item.pcb, dec!(928.45));
    assert_eq!(item.net, dec!(8429.90));
}

#[test]
fn commission_and_bonus_month() {
    let e = employee("Michelle Chean", dec!(4100));
    let item = compute(
        &e,
        Earnings {
            basic: dec!(4100),
            commission: dec!(8878),
            bonus: dec!(4000),
            ..Earnings::default()
        },
    );

    assert_eq!(item.gross, dec!(16978.00));
    assert_eq!((item.epf_ee, item.epf_er), (dec!(1870), dec!(2040)));
    assert_eq!(item.socso_ee, dec!(29.75));
    assert_eq!(item.eis_ee, dec!(11.90));
    assert_eq!(item.pcb, dec!(828.50));
    assert_eq!(item.net, dec!(14237.85));
}

#[test]
fn basic_only() {
    let e = employee("Leong Xia Hwei", dec!(4300));
    let item = compute(
        &e,
        Earnings {
            basic: dec!(4300),
            ..Earnings::default()
        },
    );

    assert_eq!(item.gross, dec!(4300.00));
    assert_eq!((item.epf_ee, item.epf_er), (dec!(473), dec!(559)));
    assert_eq!(item.socso_ee, dec!(21.25));
    assert_eq!(item.eis_ee, dec!(8.50));
    assert_eq!(item.pcb, dec!(67.85));
    assert_eq!(item.net, dec!(3729.40));
    assert_eq!(
        item.total_employee_deductions,
        item.epf_ee + item.socso_ee + item.eis_ee + item.pcb
    );
}

#[test]
fn idle_part_timer_costs_nothing() {
    let mut e = employee("Part Timer", dec!(0));
    e.employment_class = EmploymentClass::PartTime;
    e.hourly_rate = Some(dec!(8.72));

    let earnings =
        PayrollService::resolve_earnings(&e, january(), &MonthlyInput::default(), dec!(0), &Ruleset::default())
            .unwrap();
    let item = compute(&e, earnings);

    assert_eq!(item.gross, dec!(0));
    assert_eq!(item.epf_ee + item.epf_er, dec!(0));
    assert_eq!(item.socso_ee + item.socso_er, dec!(0));
    assert_eq!(item.eis_ee + item.eis_er, dec!(0));
    assert_eq!(item.pcb, dec!(0));
    assert_eq!(item.net, dec!(0));
}

#[test]
fn passport_holder_pays_non_resident_epf() {
    let mut e = employee("Contract Hire", dec!(3000));
    e.id_number = "A12345678".to_string();
    e.date_of_birth = Some(chrono::NaiveDate::from_ymd_opt(1995, 5, 5).unwrap());
    let item = compute(
        &e,
        Earnings {
            basic: dec!(3000),
            ..Earnings::default()
        },
    );
    assert_eq!((item.epf_ee, item.epf_er), (dec!(60), dec!(60)));
}

#[test]
fn same_inputs_same_item() {
    let e = employee("Leong Xia Hwei", dec!(4300));
    let earnings = Earnings {
        basic: dec!(4300),
        commission: dec!(812.40),
        ..Earnings::default()
    };
    assert_eq!(compute(&e, earnings.clone()), compute(&e, earnings));
}

// ─── Runs against the store ───────────────────────────────────────────────────

fn basic_input() -> MonthlyInput {
    MonthlyInput::default()
}

#[tokio::test]
async fn february_run_carries_january_ytd() {
    let store = MemoryStore::new();
    let rules = Ruleset::default();
    let e = employee("Leong Xia Hwei", dec!(4300));
    let org = e.organization_id;
    let now = Utc.with_ymd_and_hms(2025, 1, 28, 10, 0, 0).unwrap();

    let jan = PayrollService::run_payroll(&store, org, january(), &[(e.clone(), basic_input())], &rules, now)
        .await
        .unwrap();
    assert!(jan.failures.is_empty());
    assert_eq!(jan.total_net, dec!(3729.40));

    let feb = PayrollService::run_payroll(
        &store,
        org,
        PayPeriod::new(2025, 2).unwrap(),
        &[(e.clone(), basic_input())],
        &rules,
        now,
    )
    .await
    .unwrap();
    let snapshot = feb.items[0].ytd_snapshot.0;
    assert_eq!(snapshot.gross, dec!(4300));
    assert_eq!(snapshot.epf, dec!(473));
    assert_eq!(snapshot.pcb, dec!(67.85));
    assert_eq!(snapshot.socso_relief, dec!(21.25));
    assert_eq!(snapshot.eis_relief, dec!(8.50));
}

#[tokio::test]
async fn second_run_for_the_same_month_is_refused() {
    let store = MemoryStore::new();
    let rules = Ruleset::default();
    let e = employee("Leong Xia Hwei", dec!(4300));
    let org = e.organization_id;
    let now = Utc::now();
    let inputs = [(e, basic_input())];

    let first = PayrollService::run_payroll(&store, org, january(), &inputs, &rules, now)
        .await
        .unwrap();
    let again = PayrollService::run_payroll(&store, org, january(), &inputs, &rules, now).await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    PayrollService::finalise_run(&store, first.run.id, now).await.unwrap();
    let after_final = PayrollService::run_payroll(&store, org, january(), &inputs, &rules, now).await;
    assert!(matches!(after_final, Err(AppError::PayrollFinalised(_))));

    let refinalise = PayrollService::finalise_run(&store, first.run.id, now).await;
    assert!(matches!(refinalise, Err(AppError::PayrollFinalised(_))));
}

#[tokio::test]
async fn invalid_employee_is_reported_not_fatal() {
    let store = MemoryStore::new();
    let good = employee("Leong Xia Hwei", dec!(4300));
    let mut bad = employee("No Salary", dec!(0));
    bad.organization_id = good.organization_id;

    let report = PayrollService::run_payroll(
        &store,
        good.organization_id,
        january(),
        &[(good, basic_input()), (bad.clone(), basic_input())],
        &Ruleset::default(),
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, bad.id);
    assert_eq!(report.run.status, PayrollStatus::Draft);
}

#[tokio::test]
async fn advance_is_repaid_across_months() {
    let store = MemoryStore::new();
    let rules = Ruleset::default();
    let e = employee("Leong Xia Hwei", dec!(4300));
    let org = e.organization_id;
    let now = Utc::now();
    let advance_id = Uuid::new_v4();
    store.put_advance(Advance {
        id: advance_id,
        employee_id: e.id,
        amount: dec!(300),
        installment: dec!(200),
        remaining_balance: dec!(300),
        status: AdvanceStatus::Active,
        created_at: now,
    });

    let jan = PayrollService::run_payroll(&store, org, january(), &[(e.clone(), basic_input())], &rules, now)
        .await
        .unwrap();
    assert_eq!(jan.items[0].earnings.advance_deducted, dec!(200));
    assert_eq!(jan.items[0].net, dec!(3529.40));
    assert_eq!(store.advance(advance_id).unwrap().remaining_balance, dec!(100));

    let feb = PayrollService::run_payroll(
        &store,
        org,
        PayPeriod::new(2025, 2).unwrap(),
        &[(e, basic_input())],
        &rules,
        now,
    )
    .await
    .unwrap();
    assert_eq!(feb.items[0].earnings.advance_deducted, dec!(100));
    let settled = store.advance(advance_id).unwrap();
    assert_eq!(settled.remaining_balance, dec!(0));
    assert_eq!(settled.status, AdvanceStatus::Completed);
}

#[tokio::test]
async fn editing_a_month_cascades_into_later_months() {
    let store = MemoryStore::new();
    let rules = Ruleset::default();
    let e = employee("Leong Xia Hwei", dec!(4300));
    let org = e.organization_id;
    let now = Utc::now();

    PayrollService::run_payroll(&store, org, january(), &[(e.clone(), basic_input())], &rules, now)
        .await
        .unwrap();
    let feb = PayrollService::run_payroll(
        &store,
        org,
        PayPeriod::new(2025, 2).unwrap(),
        &[(e.clone(), basic_input())],
        &rules,
        now,
    )
    .await
    .unwrap();

    // A late commission for January.
    let mut jan_record = store.find_payroll_items(e.id, 2025, 1).await.unwrap().remove(0);
    jan_record.item.earnings.commission = dec!(1000);
    store.update_payroll_item(&jan_record).await.unwrap();

    let recomputed = PayrollService::recompute_from(&store, &e, january(), &rules, now)
        .await
        .unwrap();
    assert_eq!(recomputed.len(), 2);
    assert_eq!(recomputed[0].statutory_base, dec!(5300));
    assert_eq!(recomputed[1].ytd_snapshot.0.gross, dec!(5300));
    assert_eq!(recomputed[1].ytd_snapshot.0.epf, recomputed[0].epf_ee);

    let stored = store.find_payroll_items(e.id, 2025, 2).await.unwrap();
    assert_eq!(stored[1].item, recomputed[1]);

    PayrollService::finalise_run(&store, feb.run.id, now).await.unwrap();
    let blocked = PayrollService::recompute_from(&store, &e, january(), &rules, now).await;
    assert!(matches!(blocked, Err(AppError::PayrollFinalised(_))));
}

#[tokio::test]
async fn deactivated_employee_is_not_paid() {
    let store = MemoryStore::new();
    let active = employee("Leong Xia Hwei", dec!(4300));
    let mut leaver = employee("Former Staff", dec!(4300));
    leaver.organization_id = active.organization_id;
    leaver.is_active = false;
    let advance_id = Uuid::new_v4();
    store.put_advance(Advance {
        id: advance_id,
        employee_id: leaver.id,
        amount: dec!(300),
        installment: dec!(200),
        remaining_balance: dec!(300),
        status: AdvanceStatus::Active,
        created_at: Utc::now(),
    });

    let report = PayrollService::run_payroll(
        &store,
        active.organization_id,
        january(),
        &[(active.clone(), basic_input()), (leaver.clone(), basic_input())],
        &Ruleset::default(),
        Utc::now(),
    )
    .await
    .unwrap();

    assert_eq!(report.items.len(), 1);
    assert_eq!(report.items[0].employee_id, active.id);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, leaver.id);
    assert_eq!(report.total_net, dec!(3729.40));
    assert!(store.find_payroll_items(leaver.id, 2025, 1).await.unwrap().is_empty());
    assert_eq!(store.advance(advance_id).unwrap().remaining_balance, dec!(300));
}

#[tokio::test]
async fn failed_advance_write_leaves_no_item_behind() {
    let store = MemoryStore::new();
    let rules = Ruleset::default();
    let e = employee("Leong Xia Hwei", dec!(4300));
    let org = e.organization_id;
    let now = Utc::now();
    let advance_id = Uuid::new_v4();
    store.put_advance(Advance {
        id: advance_id,
        employee_id: e.id,
        amount: dec!(300),
        installment: dec!(200),
        remaining_balance: dec!(300),
        status: AdvanceStatus::Active,
        created_at: now,
    });
    store.fail_advance_update_for(advance_id);

    let report = PayrollService::run_payroll(&store, org, january(), &[(e.clone(), basic_input())], &rules, now)
        .await
        .unwrap();

    assert!(report.items.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, e.id);
    assert!(store.find_payroll_items(e.id, 2025, 1).await.unwrap().is_empty());
    let untouched = store.advance(advance_id).unwrap();
    assert_eq!(untouched.remaining_balance, dec!(300));
    assert_eq!(untouched.status, AdvanceStatus::Active);
}
