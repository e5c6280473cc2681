use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use ledger::TransactionDraft;

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Personal income and expense ledger")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the account email (password is never read from CLI).
    #[arg(long, global = true)]
    pub email: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account for the configured email and password.
    Signup {
        #[arg(long)]
        name: Option<String>,
    },
    /// Change the display name.
    Profile {
        #[arg(long)]
        name: String,
    },
    /// Record a transaction.
    Add(FieldArgs),
    /// Change some fields of a transaction.
    Edit {
        id: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Move a transaction to the history of deleted transactions.
    Delete { id: String },
    /// Print transactions, newest first, and the summary.
    List,
    /// Print deleted transactions.
    History,
    /// Print income, expense and balance.
    Summary,
    /// Print the ledger again after every change until Ctrl-C.
    Watch,
}

#[derive(Debug, Default, Args)]
pub struct FieldArgs {
    /// `income` or `expense`.
    #[arg(long = "type")]
    pub kind: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Non-negative decimal, e.g. `12.50`.
    #[arg(long)]
    pub amount: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339. Defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
    #[arg(long)]
    pub description: Option<String>,
    /// Reference to a receipt image.
    #[arg(long)]
    pub receipt: Option<String>,
}

impl FieldArgs {
    /// Overrides the fields of `draft` that were given on the command line.
    pub fn apply(self, mut draft: TransactionDraft) -> TransactionDraft {
        if let Some(kind) = self.kind {
            draft.kind = kind;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(amount) = self.amount {
            draft.amount = amount;
        }
        if let Some(date) = self.date {
            draft.date = Some(date);
        }
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
        if let Some(receipt) = self.receipt {
            draft.receipt = Some(receipt);
        }
        draft
    }
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid date {value:?}, expected YYYY-MM-DD or RFC 3339"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn dates_accept_day_or_timestamp() {
        assert_eq!(
            parse_date("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-05-01T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
        );
        assert!(parse_date("01/05/2024").is_err());
    }

    #[test]
    fn only_given_fields_are_overridden() {
        let stored = TransactionDraft::new("expense", "food", "12.50")
            .id("t1")
            .description("lunch");
        let fields = FieldArgs {
            amount: Some("15".to_string()),
            ..Default::default()
        };

        let draft = fields.apply(stored);

        assert_eq!(draft.id.as_deref(), Some("t1"));
        assert_eq!(draft.kind, "expense");
        assert_eq!(draft.amount, "15");
        assert_eq!(draft.description.as_deref(), Some("lunch"));
    }

    #[test]
    fn parses_add_with_type_flag() {
        let cli = Cli::try_parse_from([
            "tally", "--email", "a@b.c", "add", "--type", "income", "--category", "salary",
            "--amount", "1000",
        ])
        .unwrap();

        let Command::Add(fields) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(cli.email.as_deref(), Some("a@b.c"));
        assert_eq!(fields.kind.as_deref(), Some("income"));
        assert_eq!(fields.amount.as_deref(), Some("1000"));
    }
}
