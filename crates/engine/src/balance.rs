//! Income/expense/balance totals over a set of transactions.
//!
//! Used both for live reporting on the open period and, frozen, by month
//! closure.

use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine, Transaction, TransactionKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub income: MoneyCents,
    pub expense: MoneyCents,
    /// Always `income - expense`.
    pub balance: MoneyCents,
}

/// Sums `transactions` by kind. Pure: no filtering by date or paid state.
///
/// Fails with `InvalidAmount` when a total does not fit in `i64` cents.
pub fn aggregate<'a, I>(transactions: I) -> ResultEngine<Totals>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut income = MoneyCents::ZERO;
    let mut expense = MoneyCents::ZERO;
    for tx in transactions {
        let total = match tx.kind {
            TransactionKind::Income => &mut income,
            TransactionKind::Expense => &mut expense,
        };
        *total = total.checked_add(tx.amount).ok_or_else(|| overflow(tx.kind))?;
    }
    let balance = income
        .checked_sub(expense)
        .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;
    Ok(Totals {
        income,
        expense,
        balance,
    })
}

fn overflow(kind: TransactionKind) -> EngineError {
    EngineError::InvalidAmount(format!("{} total overflow", kind.as_str()))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn tx(kind: TransactionKind, amount: &str) -> Transaction {
        Transaction::new(
            Uuid::nil(),
            Uuid::nil(),
            "test".to_string(),
            amount.parse().unwrap(),
            kind,
            NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn empty_set_is_all_zero() {
        assert_eq!(aggregate(&[]).unwrap(), Totals::default());
    }

    #[test]
    fn sums_by_kind() {
        let txs = vec![
            tx(TransactionKind::Income, "3000.00"),
            tx(TransactionKind::Expense, "800.50"),
            tx(TransactionKind::Expense, "400.00"),
        ];
        let totals = aggregate(&txs).unwrap();
        assert_eq!(totals.income.to_string(), "3000.00");
        assert_eq!(totals.expense.to_string(), "1200.50");
        assert_eq!(totals.balance.to_string(), "1799.50");
    }

    #[test]
    fn balance_is_income_minus_expense_for_any_mix() {
        // Deterministic spread of mixes: amounts cycle through awkward cents.
        let amounts = ["0.01", "0.10", "0.29", "19.99", "1000.00", "333.33"];
        for size in 0..24 {
            let txs: Vec<Transaction> = (0..size)
                .map(|i| {
                    let kind = if (i * 7 + size) % 3 == 0 {
                        TransactionKind::Income
                    } else {
                        TransactionKind::Expense
                    };
                    tx(kind, amounts[i % amounts.len()])
                })
                .collect();
            let totals = aggregate(&txs).unwrap();
            assert_eq!(totals.balance, totals.income - totals.expense);
        }
    }

    #[test]
    fn overflowing_totals_are_an_error() {
        let huge = MoneyCents::new(i64::MAX / 2 + 1);
        let mut income = tx(TransactionKind::Income, "1.00");
        income.amount = huge;
        let txs = vec![income.clone(), income];
        assert_eq!(
            aggregate(&txs),
            Err(EngineError::InvalidAmount("income total overflow".to_string()))
        );

        let mut expense = tx(TransactionKind::Expense, "0.01");
        expense.amount = MoneyCents::new(i64::MAX);
        let txs = vec![expense, tx(TransactionKind::Expense, "0.01")];
        assert_eq!(
            aggregate(&txs),
            Err(EngineError::InvalidAmount("expense total overflow".to_string()))
        );
    }
}
