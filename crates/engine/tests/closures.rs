use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Category, ClosureStatus, Engine, EngineError, FixedExpenseCarryForward, LedgerStore,
    MoneyCents, NewTemplate, NewTransaction, Period, SqlLedger, Transaction, TransactionKind,
    TransactionPatch, Workspace,
};
use migration::MigratorTrait;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn period(y: i32, m: u32) -> Period {
    Period::new(y, m).unwrap()
}

fn money(raw: &str) -> MoneyCents {
    raw.parse().unwrap()
}

async fn engine_with_db(lock_timeout: Duration) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .lock_timeout(lock_timeout)
        .build()
        .await
        .unwrap();
    (engine, db)
}

struct Fixture {
    engine: Engine,
    db: DatabaseConnection,
    workspace: Workspace,
    salary: Category,
    bills: Category,
}

async fn fixture_with_timeout(opening: Period, lock_timeout: Duration) -> Fixture {
    let (engine, db) = engine_with_db(lock_timeout).await;
    let workspace = engine
        .create_workspace("Family", opening, at(2025, 1, 1))
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

async fn fixture(opening: Period) -> Fixture {
    fixture_with_timeout(opening, Duration::from_secs(5)).await
}

impl Fixture {
    async fn record(
        &self,
        kind: TransactionKind,
        amount: &str,
        occurred_on: NaiveDate,
        fixed: bool,
    ) -> Transaction {
        let category = match kind {
            TransactionKind::Income => self.salary.id,
            TransactionKind::Expense => self.bills.id,
        };
        let mut cmd = NewTransaction::new(
            self.workspace.id,
            category,
            "entry",
            money(amount),
            kind,
            occurred_on,
        );
        if fixed {
            cmd = cmd.fixed();
        }
        self.engine
            .record_transaction(cmd, at(2025, 1, 1))
            .await
            .unwrap()
    }

    async fn count_open_closures(&self) -> i64 {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS n FROM monthly_closures WHERE workspace_id = ? AND status = 'open'",
                vec![self.workspace.id.to_string().into()],
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get::<i64>("", "n").unwrap()
    }
}

/// January 2025: salary 3000.00, groceries 800.50 and a fixed 400.00 bill.
async fn january(f: &Fixture) -> Transaction {
    f.record(TransactionKind::Income, "3000.00", date(2025, 1, 10), false)
        .await;
    f.record(TransactionKind::Expense, "800.50", date(2025, 1, 12), false)
        .await;
    f.record(TransactionKind::Expense, "400.00", date(2025, 1, 3), true)
        .await
}

#[tokio::test]
async fn close_freezes_totals_and_carries_fixed_expense() {
    let f = fixture(period(2025, 1)).await;
    let fixed = january(&f).await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    assert_eq!(closed.closure.status, ClosureStatus::Closed);
    assert_eq!(closed.closure.total_income, money("3000.00"));
    assert_eq!(closed.closure.total_expense, money("1200.50"));
    assert_eq!(closed.closure.balance, money("1799.50"));
    assert_eq!(closed.closure.closed_at, Some(at(2025, 2, 1)));

    assert_eq!(closed.carried.len(), 1);
    let snapshot = &closed.carried[0];
    assert_eq!(snapshot.amount, money("400.00"));
    assert_eq!(snapshot.source_transaction_id, Some(fixed.id));
    assert_eq!(snapshot.closure_id, closed.next_period.id);

    let open = f
        .engine
        .current_open_period(f.workspace.id)
        .await
        .unwrap();
    assert_eq!(open.period, period(2025, 2));
    assert_eq!(open.id, closed.next_period.id);

    let february = f
        .engine
        .transactions_in(f.workspace.id, period(2025, 2))
        .await
        .unwrap();
    assert_eq!(february.len(), 1);
    let mirror = &february[0];
    assert_eq!(mirror.id, snapshot.carried_transaction_id);
    assert_eq!(mirror.occurred_on, date(2025, 2, 3));
    assert_eq!(mirror.amount, money("400.00"));
    assert!(mirror.is_fixed && mirror.is_auto_loaded && !mirror.is_paid);
    assert_eq!(mirror.closure_id, Some(closed.next_period.id));
}

#[tokio::test]
async fn close_stamps_the_period_transactions() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let details = f
        .engine
        .closure_details(f.workspace.id, closed.closure.id)
        .await
        .unwrap();
    assert_eq!(details.transactions.len(), 3);
    assert!(
        details
            .transactions
            .iter()
            .all(|tx| tx.closure_id == Some(closed.closure.id))
    );
}

#[tokio::test]
async fn closing_twice_fails_and_keeps_totals() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;
    f.engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let err = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 2))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::AlreadyClosed("2025-01".to_string()));

    let history = f.engine.closure_history(f.workspace.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].balance, money("1799.50"));
    assert_eq!(history[0].closed_at, Some(at(2025, 2, 1)));
}

#[tokio::test]
async fn closing_a_period_that_is_not_open_is_invalid() {
    let f = fixture(period(2025, 1)).await;

    let err = f
        .engine
        .close_month(f.workspace.id, period(2025, 3), at(2025, 4, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPeriod(_)));

    let open = f
        .engine
        .current_open_period(f.workspace.id)
        .await
        .unwrap();
    assert_eq!(open.period, period(2025, 1));
}

#[tokio::test]
async fn empty_period_closes_with_zero_totals() {
    let f = fixture(period(2025, 1)).await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    assert!(closed.closure.total_income.is_zero());
    assert!(closed.closure.total_expense.is_zero());
    assert!(closed.closure.balance.is_zero());
    assert!(closed.carried.is_empty());
    assert_eq!(closed.next_period.period, period(2025, 2));
}

#[tokio::test]
async fn future_dated_transactions_stay_out_of_the_totals() {
    let f = fixture(period(2025, 1)).await;
    f.record(TransactionKind::Income, "100.00", date(2025, 1, 31), false)
        .await;
    f.record(TransactionKind::Income, "900.00", date(2025, 2, 15), false)
        .await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 1, 20))
        .await
        .unwrap();
    assert_eq!(closed.closure.total_income, money("100.00"));

    let february = f
        .engine
        .period_summary(f.workspace.id, period(2025, 2))
        .await
        .unwrap();
    assert_eq!(february.status, Some(ClosureStatus::Open));
    assert_eq!(february.totals.income, money("900.00"));
}

#[tokio::test]
async fn closed_period_rejects_edits_but_allows_mark_paid() {
    let f = fixture(period(2025, 1)).await;
    let fixed = january(&f).await;
    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let err = f
        .engine
        .record_transaction(
            NewTransaction::new(
                f.workspace.id,
                f.bills.id,
                "late",
                money("10.00"),
                TransactionKind::Expense,
                date(2025, 1, 20),
            ),
            at(2025, 2, 2),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodClosed(_)));

    let err = f
        .engine
        .update_transaction(
            TransactionPatch::new(f.workspace.id, fixed.id).amount(money("1.00")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodClosed(_)));

    let err = f
        .engine
        .delete_transaction(f.workspace.id, fixed.id, at(2025, 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodClosed(_)));

    let paid = f
        .engine
        .mark_paid(f.workspace.id, fixed.id, date(2025, 2, 2))
        .await
        .unwrap();
    assert!(paid.is_paid);
    assert_eq!(paid.paid_on, Some(date(2025, 2, 2)));
    assert_eq!(paid.closure_id, Some(closed.closure.id));
    assert_eq!(paid.amount, fixed.amount);

    let summary = f
        .engine
        .period_summary(f.workspace.id, period(2025, 1))
        .await
        .unwrap();
    assert_eq!(summary.totals.balance, money("1799.50"));
}

#[tokio::test]
async fn moving_an_open_transaction_into_a_closed_period_is_rejected() {
    let f = fixture(period(2025, 1)).await;
    f.engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();
    let february = f
        .record(TransactionKind::Expense, "50.00", date(2025, 2, 10), false)
        .await;

    let err = f
        .engine
        .update_transaction(
            TransactionPatch::new(f.workspace.id, february.id).occurred_on(date(2025, 1, 10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PeriodClosed(_)));
}

#[tokio::test]
async fn closed_totals_ignore_rows_written_behind_the_engine() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;
    f.engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let stray = Transaction::new(
        f.workspace.id,
        f.salary.id,
        "stray".to_string(),
        money("5000.00"),
        TransactionKind::Income,
        date(2025, 1, 15),
        at(2025, 2, 3),
    );
    SqlLedger::new(&f.db)
        .insert_transaction(&stray)
        .await
        .unwrap();

    let summary = f
        .engine
        .period_summary(f.workspace.id, period(2025, 1))
        .await
        .unwrap();
    assert_eq!(summary.status, Some(ClosureStatus::Closed));
    assert_eq!(summary.totals.income, money("3000.00"));
    assert_eq!(summary.totals.balance, money("1799.50"));
}

#[tokio::test]
async fn exactly_one_open_period_per_workspace() {
    let f = fixture(period(2025, 1)).await;
    assert_eq!(f.count_open_closures().await, 1);

    for month in 1..=3 {
        f.engine
            .close_month(f.workspace.id, period(2025, month), at(2025, month + 1, 1))
            .await
            .unwrap();
        assert_eq!(f.count_open_closures().await, 1);
    }

    let backend = f.db.get_database_backend();
    let second_open = f
        .db
        .execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO monthly_closures \
             (id, workspace_id, year, month, status, total_income_minor, total_expense_minor, balance_minor, created_at) \
             VALUES (?, ?, 2025, 9, 'open', 0, 0, 0, ?)",
            vec![
                uuid::Uuid::new_v4().to_string().into(),
                f.workspace.id.to_string().into(),
                "2025-01-01T00:00:00Z".into(),
            ],
        ))
        .await;
    assert!(second_open.is_err());
}

#[tokio::test]
async fn carry_forward_twice_creates_no_duplicates() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;
    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let again = f
        .engine
        .carry_forward_fixed_expenses(f.workspace.id, period(2025, 1), at(2025, 2, 2))
        .await
        .unwrap();
    assert!(again.is_empty());

    let details = f
        .engine
        .closure_details(f.workspace.id, closed.next_period.id)
        .await
        .unwrap();
    assert_eq!(details.carried_in.len(), 1);
    assert_eq!(details.transactions.len(), 1);
}

#[tokio::test]
async fn carry_forward_of_an_open_period_is_invalid() {
    let f = fixture(period(2025, 1)).await;

    let err = f
        .engine
        .carry_forward_fixed_expenses(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPeriod(_)));
}

#[tokio::test]
async fn carried_day_clamps_to_short_month() {
    let f = fixture(period(2025, 1)).await;
    f.record(TransactionKind::Expense, "75.00", date(2025, 1, 31), true)
        .await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();

    let mirror = f
        .engine
        .transaction(f.workspace.id, closed.carried[0].carried_transaction_id)
        .await
        .unwrap();
    assert_eq!(mirror.occurred_on, date(2025, 2, 28));
}

#[tokio::test]
async fn carried_expenses_keep_rolling_month_after_month() {
    let f = fixture(period(2025, 1)).await;
    f.record(TransactionKind::Expense, "400.00", date(2025, 1, 3), true)
        .await;

    let january = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();
    let february = f
        .engine
        .close_month(f.workspace.id, period(2025, 2), at(2025, 3, 1))
        .await
        .unwrap();

    assert_eq!(february.closure.total_expense, money("400.00"));
    assert_eq!(february.carried.len(), 1);
    assert_eq!(
        february.carried[0].source_transaction_id,
        Some(january.carried[0].carried_transaction_id)
    );
    let march = f
        .engine
        .transactions_in(f.workspace.id, period(2025, 3))
        .await
        .unwrap();
    assert_eq!(march.len(), 1);
    assert_eq!(march[0].occurred_on, date(2025, 3, 3));
}

#[tokio::test]
async fn template_expenses_are_left_to_the_template() {
    let f = fixture(period(2025, 1)).await;
    f.engine
        .create_template(
            NewTemplate::monthly(
                f.workspace.id,
                f.bills.id,
                "Rent",
                money("700.00"),
                TransactionKind::Expense,
                1,
                date(2025, 1, 1),
            )
            .unwrap(),
            at(2025, 1, 1),
        )
        .await
        .unwrap();
    f.record(TransactionKind::Expense, "400.00", date(2025, 1, 3), true)
        .await;

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();
    assert_eq!(closed.expanded.len(), 1);
    assert_eq!(closed.closure.total_expense, money("1100.00"));
    assert_eq!(closed.carried.len(), 1);
    assert_eq!(closed.carried[0].amount, money("400.00"));

    f.engine
        .expand_recurring(f.workspace.id, period(2025, 2), at(2025, 2, 1))
        .await
        .unwrap();
    let rents: Vec<_> = f
        .engine
        .transactions_in(f.workspace.id, period(2025, 2))
        .await
        .unwrap()
        .into_iter()
        .filter(|tx| tx.description == "Rent")
        .collect();
    assert_eq!(rents.len(), 1);
    assert!(rents[0].template_id.is_some());
}

#[tokio::test]
async fn close_expands_missing_occurrences_before_sealing() {
    let f = fixture(period(2025, 1)).await;
    f.engine
        .create_template(
            NewTemplate::monthly(
                f.workspace.id,
                f.salary.id,
                "Salary",
                money("1000.00"),
                TransactionKind::Income,
                27,
                date(2024, 6, 1),
            )
            .unwrap(),
            at(2025, 1, 1),
        )
        .await
        .unwrap();

    let closed = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap();
    assert_eq!(closed.expanded.len(), 1);
    assert_eq!(closed.expanded[0].occurred_on, date(2025, 1, 27));
    assert_eq!(closed.closure.total_income, money("1000.00"));
}

#[tokio::test]
async fn concurrent_closes_let_exactly_one_win() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;

    let (a, b) = tokio::join!(
        f.engine
            .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1)),
        f.engine
            .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert_eq!(err, EngineError::AlreadyClosed("2025-01".to_string()));

    let history = f.engine.closure_history(f.workspace.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].balance, money("1799.50"));
    assert_eq!(f.count_open_closures().await, 1);
}

#[tokio::test]
async fn busy_workspace_fails_fast_with_a_short_lock_timeout() {
    let f = fixture_with_timeout(period(2025, 1), Duration::ZERO).await;
    january(&f).await;

    let (a, b) = tokio::join!(
        f.engine
            .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1)),
        f.engine
            .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert!(matches!(
        err,
        EngineError::ConcurrencyConflict(_) | EngineError::AlreadyClosed(_)
    ));
    assert_eq!(f.count_open_closures().await, 1);
}

#[tokio::test]
async fn roll_over_closes_every_elapsed_month_in_order() {
    let f = fixture(period(2025, 1)).await;
    f.engine
        .create_template(
            NewTemplate::monthly(
                f.workspace.id,
                f.salary.id,
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
        .unwrap();

    let closed = f
        .engine
        .roll_over(f.workspace.id, date(2025, 4, 2), at(2025, 4, 2))
        .await
        .unwrap();
    let periods: Vec<_> = closed.iter().map(|m| m.closure.period).collect();
    assert_eq!(periods, vec![period(2025, 1), period(2025, 2), period(2025, 3)]);
    assert!(
        closed
            .iter()
            .all(|m| m.closure.total_income == money("1000.00"))
    );

    let open = f
        .engine
        .current_open_period(f.workspace.id)
        .await
        .unwrap();
    assert_eq!(open.period, period(2025, 4));

    let again = f
        .engine
        .roll_over(f.workspace.id, date(2025, 4, 30), at(2025, 4, 30))
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn deactivated_workspaces_are_not_listed() {
    let f = fixture(period(2025, 1)).await;
    let other = f
        .engine
        .create_workspace("Side", period(2025, 1), at(2025, 1, 1))
        .await
        .unwrap();

    f.engine.deactivate_workspace(other.id).await.unwrap();

    let active = f.engine.active_workspaces().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, f.workspace.id);
}

#[tokio::test]
async fn oversized_amounts_are_rejected_and_overflowing_totals_do_not_close() {
    let f = fixture(period(2025, 1)).await;
    let huge = money("50000000000000000.00");

    let err = f
        .engine
        .record_transaction(
            NewTransaction::new(
                f.workspace.id,
                f.salary.id,
                "jackpot",
                huge,
                TransactionKind::Income,
                date(2025, 1, 10),
            ),
            at(2025, 1, 10),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let store = SqlLedger::new(&f.db);
    for day in [10, 11] {
        let tx = Transaction::new(
            f.workspace.id,
            f.salary.id,
            "jackpot".to_string(),
            huge,
            TransactionKind::Income,
            date(2025, 1, day),
            at(2025, 1, day),
        );
        store.insert_transaction(&tx).await.unwrap();
    }

    let err = f
        .engine
        .close_month(f.workspace.id, period(2025, 1), at(2025, 2, 1))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("income total overflow".to_string())
    );

    let open = f
        .engine
        .current_open_period(f.workspace.id)
        .await
        .unwrap();
    assert_eq!(open.period, period(2025, 1));
    assert_eq!(f.count_open_closures().await, 1);

    let err = f
        .engine
        .period_summary(f.workspace.id, period(2025, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn carry_forward_refuses_a_closed_target_period() {
    let f = fixture(period(2025, 1)).await;
    january(&f).await;
    for month in 1..=2 {
        f.engine
            .close_month(f.workspace.id, period(2025, month), at(2025, month + 1, 1))
            .await
            .unwrap();
    }

    let store = SqlLedger::new(&f.db);
    let jan = store
        .closure_for(f.workspace.id, period(2025, 1))
        .await
        .unwrap()
        .unwrap();
    let feb = store
        .closure_for(f.workspace.id, period(2025, 2))
        .await
        .unwrap()
        .unwrap();
    let mirrors_before = store
        .transactions_between(f.workspace.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .unwrap()
        .len();

    let err = FixedExpenseCarryForward::new(&store)
        .carry_forward(&jan, &feb, at(2025, 3, 2))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::PeriodClosed("2025-02 is closed".to_string()));

    let mirrors_after = store
        .transactions_between(f.workspace.id, date(2025, 2, 1), date(2025, 2, 28))
        .await
        .unwrap()
        .len();
    assert_eq!(mirrors_before, mirrors_after);
}
