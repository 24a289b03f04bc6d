use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Category, Engine, EngineError, LedgerStore, MoneyCents, NewTemplate, NewTransaction, Period,
    RecurringTemplate, Schedule, SkipReason, SqlLedger, TemplatePatch, Transaction,
    TransactionKind, Workspace,
};
use migration::MigratorTrait;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap()
}

fn period(y: i32, m: u32) -> Period {
    Period::new(y, m).unwrap()
}

fn money(raw: &str) -> MoneyCents {
    raw.parse().unwrap()
}

struct Fixture {
    engine: Engine,
    db: DatabaseConnection,
    workspace: Workspace,
    salary: Category,
    bills: Category,
}

async fn fixture() -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    let workspace = engine
        .create_workspace("Home", period(2025, 1), at(2025, 1, 1))
        .await
        .unwrap();
    let salary = engine
        .create_category(workspace.id, "Salary", TransactionKind::Income)
        .await
        .unwrap();
    let bills = engine
        .create_category(workspace.id, "Bills", TransactionKind::Expense)
        .await
        .unwrap();
    Fixture {
        engine,
        db,
        workspace,
        salary,
        bills,
    }
}

impl Fixture {
    async fn template(&self, cmd: NewTemplate) -> RecurringTemplate {
        self.engine
            .create_template(cmd, at(2025, 1, 1))
            .await
            .unwrap()
    }

    async fn monthly_salary(&self, day: u32, start: NaiveDate) -> RecurringTemplate {
        self.template(
            NewTemplate::monthly(
                self.workspace.id,
                self.salary.id,
                "Salary",
                money("1000.00"),
                TransactionKind::Income,
                day,
                start,
            )
            .unwrap(),
        )
        .await
    }

    async fn expand(&self, p: Period) -> Vec<Transaction> {
        self.engine
            .expand_recurring(self.workspace.id, p, at(2025, 2, 5))
            .await
            .unwrap()
    }

    async fn generated(&self, p: Period) -> Vec<Transaction> {
        self.engine
            .transactions_in(self.workspace.id, p)
            .await
            .unwrap()
            .into_iter()
            .filter(|tx| tx.template_id.is_some())
            .collect()
    }
}

#[tokio::test]
async fn monthly_income_expands_once_per_period() {
    let f = fixture().await;
    let template = f.monthly_salary(5, date(2025, 1, 1)).await;

    let created = f.expand(period(2025, 2)).await;
    assert_eq!(created.len(), 1);
    let tx = &created[0];
    assert_eq!(tx.occurred_on, date(2025, 2, 5));
    assert_eq!(tx.amount, money("1000.00"));
    assert_eq!(tx.kind, TransactionKind::Income);
    assert_eq!(tx.template_id, Some(template.id));
    assert_eq!(tx.occurrence_key.as_deref(), Some("2025-02"));
    assert!(!tx.is_paid);
    assert!(!tx.is_fixed);

    for _ in 0..3 {
        assert!(f.expand(period(2025, 2)).await.is_empty());
    }
    assert_eq!(f.generated(period(2025, 2)).await.len(), 1);
}

#[tokio::test]
async fn concurrent_expansions_create_a_single_instance() {
    let f = fixture().await;
    f.monthly_salary(5, date(2025, 1, 1)).await;

    let (a, b) = tokio::join!(
        f.engine
            .expand_recurring(f.workspace.id, period(2025, 2), at(2025, 2, 5)),
        f.engine
            .expand_recurring(f.workspace.id, period(2025, 2), at(2025, 2, 5)),
    );

    assert_eq!(a.unwrap().len() + b.unwrap().len(), 1);
    assert_eq!(f.generated(period(2025, 2)).await.len(), 1);
}

#[tokio::test]
async fn store_rejects_a_second_instance_for_the_same_key() {
    let f = fixture().await;
    let template = f.monthly_salary(5, date(2025, 1, 1)).await;
    f.expand(period(2025, 2)).await;

    let mut duplicate = Transaction::new(
        f.workspace.id,
        f.salary.id,
        "Salary".to_string(),
        money("1000.00"),
        TransactionKind::Income,
        date(2025, 2, 6),
        at(2025, 2, 6),
    );
    duplicate.template_id = Some(template.id);
    duplicate.occurrence_key = Some("2025-02".to_string());

    let err = SqlLedger::new(&f.db)
        .insert_generated(&duplicate)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DuplicateExpansion(_)));
    assert_eq!(f.generated(period(2025, 2)).await.len(), 1);
}

#[tokio::test]
async fn expense_instances_are_fixed() {
    let f = fixture().await;
    f.template(
        NewTemplate::monthly(
            f.workspace.id,
            f.bills.id,
            "Rent",
            money("700.00"),
            TransactionKind::Expense,
            31,
            date(2025, 1, 1),
        )
        .unwrap()
        .notes("landlord"),
    )
    .await;

    let created = f.expand(period(2025, 2)).await;
    assert_eq!(created.len(), 1);
    assert!(created[0].is_fixed);
    assert!(!created[0].is_auto_loaded);
    assert_eq!(created[0].occurred_on, date(2025, 2, 28));
    assert_eq!(created[0].notes.as_deref(), Some("landlord"));
}

#[tokio::test]
async fn template_edits_only_affect_future_expansions() {
    let f = fixture().await;
    let template = f.monthly_salary(5, date(2025, 1, 1)).await;
    f.expand(period(2025, 2)).await;

    f.engine
        .update_template(
            TemplatePatch::new(f.workspace.id, template.id)
                .amount(money("1200.00"))
                .schedule(Schedule::monthly(20).unwrap()),
            at(2025, 2, 10),
        )
        .await
        .unwrap();

    assert!(f.expand(period(2025, 2)).await.is_empty());
    let february = f.generated(period(2025, 2)).await;
    assert_eq!(february.len(), 1);
    assert_eq!(february[0].amount, money("1000.00"));
    assert_eq!(february[0].occurred_on, date(2025, 2, 5));

    let march = f.expand(period(2025, 3)).await;
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].amount, money("1200.00"));
    assert_eq!(march[0].occurred_on, date(2025, 3, 20));
}

#[tokio::test]
async fn validity_window_bounds_expansion() {
    let f = fixture().await;
    let late_start = f.monthly_salary(5, date(2025, 3, 10)).await;
    let ended = f
        .template(
            NewTemplate::monthly(
                f.workspace.id,
                f.bills.id,
                "Gym",
                money("30.00"),
                TransactionKind::Expense,
                5,
                date(2024, 1, 1),
            )
            .unwrap()
            .end_date(date(2025, 2, 3)),
        )
        .await;

    assert!(f.expand(period(2025, 2)).await.is_empty());
    assert!(f.expand(period(2025, 3)).await.is_empty());
    let april = f.expand(period(2025, 4)).await;
    assert_eq!(april.len(), 1);
    assert_eq!(april[0].template_id, Some(late_start.id));

    let outcome = f
        .engine
        .expand_template(f.workspace.id, late_start.id, period(2025, 3), at(2025, 3, 1))
        .await
        .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.skipped[0].reason, SkipReason::OutsideWindow);
    assert_eq!(outcome.skipped[0].occurrence_key.as_deref(), Some("2025-03"));

    let err = f
        .engine
        .expand_template(f.workspace.id, ended.id, period(2025, 5), at(2025, 5, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPeriod(_)));
}

#[tokio::test]
async fn inactive_templates_and_categories_are_skipped() {
    let f = fixture().await;
    let template = f.monthly_salary(5, date(2025, 1, 1)).await;

    f.engine
        .set_template_active(f.workspace.id, template.id, false, at(2025, 2, 1))
        .await
        .unwrap();
    assert!(f.expand(period(2025, 2)).await.is_empty());

    f.engine
        .set_template_active(f.workspace.id, template.id, true, at(2025, 2, 2))
        .await
        .unwrap();
    f.engine
        .deactivate_category(f.workspace.id, f.salary.id)
        .await
        .unwrap();
    let outcome = f
        .engine
        .expand_template(f.workspace.id, template.id, period(2025, 2), at(2025, 2, 2))
        .await
        .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.skipped[0].reason, SkipReason::CategoryInactive);
}

#[tokio::test]
async fn weekly_and_yearly_schedules() {
    let f = fixture().await;
    f.template(NewTemplate::weekly(
        f.workspace.id,
        f.bills.id,
        "Cleaning",
        money("25.00"),
        TransactionKind::Expense,
        Weekday::Mon,
        date(2025, 1, 1),
    ))
    .await;
    f.template(NewTemplate::new(
        f.workspace.id,
        f.bills.id,
        "Insurance",
        money("480.00"),
        TransactionKind::Expense,
        Schedule::yearly(3, 15).unwrap(),
        date(2025, 1, 1),
    ))
    .await;

    let february = f.expand(period(2025, 2)).await;
    assert_eq!(february.len(), 4);
    assert!(february.iter().all(|tx| tx.description == "Cleaning"));

    let march = f.expand(period(2025, 3)).await;
    let insurance: Vec<_> = march
        .iter()
        .filter(|tx| tx.description == "Insurance")
        .collect();
    assert_eq!(insurance.len(), 1);
    assert_eq!(insurance[0].occurred_on, date(2025, 3, 15));
    assert_eq!(insurance[0].occurrence_key.as_deref(), Some("2025"));
    assert_eq!(march.len(), 6);
}

#[tokio::test]
async fn category_kind_must_match() {
    let f = fixture().await;

    let err = f
        .engine
        .create_template(
            NewTemplate::monthly(
                f.workspace.id,
                f.bills.id,
                "Salary",
                money("1000.00"),
                TransactionKind::Income,
                5,
                date(2025, 1, 1),
            )
            .unwrap(),
            at(2025, 1, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryMismatch(_)));

    let err = f
        .engine
        .record_transaction(
            NewTransaction::new(
                f.workspace.id,
                f.salary.id,
                "Coffee",
                money("2.50"),
                TransactionKind::Expense,
                date(2025, 1, 4),
            ),
            at(2025, 1, 4),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryMismatch(_)));
}

#[tokio::test]
async fn deleted_instances_are_not_recreated() {
    let f = fixture().await;
    f.monthly_salary(5, date(2025, 1, 1)).await;
    let created = f.expand(period(2025, 2)).await;

    f.engine
        .delete_transaction(f.workspace.id, created[0].id, at(2025, 2, 6))
        .await
        .unwrap();

    assert!(f.expand(period(2025, 2)).await.is_empty());
    assert!(f.generated(period(2025, 2)).await.is_empty());
}

#[tokio::test]
async fn excluded_occurrences_are_skipped() {
    let f = fixture().await;
    let template = f.monthly_salary(5, date(2025, 1, 1)).await;
    f.expand(period(2025, 2)).await;

    let keys = f
        .engine
        .exclude_occurrence(f.workspace.id, template.id, period(2025, 2), at(2025, 2, 6))
        .await
        .unwrap();
    assert_eq!(keys, vec!["2025-02".to_string()]);
    assert!(f.generated(period(2025, 2)).await.is_empty());

    f.engine
        .exclude_occurrence(f.workspace.id, template.id, period(2025, 3), at(2025, 2, 6))
        .await
        .unwrap();
    assert!(f.expand(period(2025, 3)).await.is_empty());
    assert_eq!(f.expand(period(2025, 4)).await.len(), 1);

    let outcome = f
        .engine
        .expand_template(f.workspace.id, template.id, period(2025, 3), at(2025, 3, 1))
        .await
        .unwrap();
    assert_eq!(outcome.skipped[0].reason, SkipReason::Excluded);
}

#[tokio::test]
async fn closed_periods_are_not_expanded() {
    let f = fixture().await;
    f.engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();
    f.monthly_salary(5, date(2024, 1, 1)).await;

    let err = f
        .engine
        .expand_recurring(f.workspace.id, period(2025, 1), at(2025, 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodClosed(_)));
}
