//! Balance summary of a ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, Transaction};

/// Income, expense and balance of a set of transactions.
///
/// Never stored: it is always recomputed in full from the live collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_balance: Decimal,
    pub income: Amount,
    pub expense: Amount,
}

impl Summary {
    /// Folds transactions into a summary in a single pass.
    ///
    /// Only `income` transactions count as income; every other type,
    /// including ones this ledger does not recognize, counts as expense.
    pub fn derive<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let (income, expense) = transactions.into_iter().fold(
            (Amount::ZERO, Amount::ZERO),
            |(income, expense), tx| {
                if tx.kind.is_income() {
                    (income + tx.amount, expense)
                } else {
                    (income, expense + tx.amount)
                }
            },
        );
        Self {
            total_balance: income - expense,
            income,
            expense,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::TransactionKind;

    fn tx(kind: TransactionKind, amount: &str) -> Transaction {
        Transaction {
            id: String::new(),
            kind,
            category: "misc".to_string(),
            amount: amount.parse().unwrap(),
            date: Utc::now(),
            description: String::new(),
            receipt: None,
        }
    }

    #[test]
    fn empty_ledger_is_zero() {
        let none: [Transaction; 0] = [];
        assert_eq!(Summary::derive(&none), Summary::default());
    }

    #[test]
    fn salary_minus_two_expenses() {
        let txs = [
            tx(TransactionKind::Income, "1000"),
            tx(TransactionKind::Expense, "250"),
            tx(TransactionKind::Expense, "50"),
        ];

        let summary = Summary::derive(&txs);

        assert_eq!(summary.income, Amount::from_major(1000));
        assert_eq!(summary.expense, Amount::from_major(300));
        assert_eq!(summary.total_balance, Decimal::from(700));
    }

    #[test]
    fn unrecognized_types_count_as_expense() {
        let txs = [
            tx(TransactionKind::Income, "10"),
            tx(TransactionKind::Unrecognized("refund".to_string()), "4"),
        ];

        let summary = Summary::derive(&txs);

        assert_eq!(summary.expense, Amount::from_major(4));
        assert_eq!(summary.total_balance, Decimal::from(6));
    }

    #[test]
    fn balance_is_income_minus_expense_for_many_mixes() {
        let amounts = ["0.01", "0.1", "0.2", "3.333", "12.50", "999999.99", "0"];
        for (i, _) in amounts.iter().enumerate() {
            let txs: Vec<Transaction> = amounts
                .iter()
                .enumerate()
                .map(|(j, amount)| {
                    let kind = if (i + j) % 3 == 0 {
                        TransactionKind::Income
                    } else {
                        TransactionKind::Expense
                    };
                    tx(kind, amount)
                })
                .collect();

            let summary = Summary::derive(&txs);

            let income: Amount = txs
                .iter()
                .filter(|t| t.kind == TransactionKind::Income)
                .map(|t| t.amount)
                .sum();
            let expense: Amount = txs
                .iter()
                .filter(|t| t.kind != TransactionKind::Income)
                .map(|t| t.amount)
                .sum();
            assert_eq!(summary.income, income);
            assert_eq!(summary.expense, expense);
            assert_eq!(summary.total_balance, summary.income - summary.expense);
        }
    }
}
