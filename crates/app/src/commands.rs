//! Runs one CLI command against the ledger.

use std::io::Write;

use ledger::{
    Accounts, AuthError, DeletedTransaction, Ledger, LedgerView, MemoryStore, RemoteStore,
    Session, SqlStore, Summary, Transaction, TransactionDraft,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tokio::sync::mpsc;

use crate::{
    cli::Command,
    error::{AppError, Result},
    settings::{Account, Database, Settings},
};

pub async fn run(command: Command, settings: Settings) -> Result<()> {
    let database = connect(&settings.database).await?;
    let accounts = Accounts::builder().database(database.clone()).build();
    let poll_interval = settings.poll_interval();
    let mut out = std::io::stdout();

    match settings.database {
        Database::Memory => {
            tracing::debug!("using the in-memory store");
            let context = Context {
                accounts,
                ledger: Ledger::new(MemoryStore::new()),
                account: settings.account,
                register_on_sign_in: true,
            };
            context.execute(command, &mut out).await
        }
        Database::Sqlite(_) => {
            let store = SqlStore::builder()
                .database(database)
                .poll_interval(poll_interval)
                .build()
                .await?;
            let context = Context {
                accounts,
                ledger: Ledger::new(store),
                account: settings.account,
                register_on_sign_in: false,
            };
            context.execute(command, &mut out).await
        }
    }
}

async fn connect(config: &Database) -> Result<DatabaseConnection> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

struct Context<S> {
    accounts: Accounts,
    ledger: Ledger<S>,
    account: Account,
    /// The users table lives only as long as the process, so the configured
    /// account is registered on first sign-in.
    register_on_sign_in: bool,
}

impl<S: RemoteStore> Context<S> {
    fn credentials(&self) -> Result<(&str, &str)> {
        let email = self.account.email.as_deref().ok_or_else(|| {
            AppError::Input("no account email: pass --email or set account.email".to_string())
        })?;
        let password = self.account.password.as_deref().ok_or_else(|| {
            AppError::Input(
                "no password: set TALLY_ACCOUNT__PASSWORD or account.password".to_string(),
            )
        })?;
        Ok((email, password))
    }

    async fn sign_in(&self) -> Result<Session> {
        let (email, password) = self.credentials()?;
        match self.accounts.sign_in(email, password).await {
            Ok(_) => {}
            Err(AuthError::InvalidCredentials) if self.register_on_sign_in => {
                self.accounts.sign_up(email, password, None).await?;
                tracing::info!("registered {email} in the in-memory database");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(Session::require(&self.accounts)?)
    }

    async fn execute(&self, command: Command, out: &mut impl Write) -> Result<()> {
        if let Command::Signup { name } = &command {
            let (email, password) = self.credentials()?;
            let identity = self
                .accounts
                .sign_up(email, password, name.as_deref())
                .await?;
            writeln!(out, "signed up {} ({})", identity.email, identity.uid)?;
            return Ok(());
        }

        let session = self.sign_in().await?;
        let ledger = &self.ledger;

        match command {
            Command::Signup { .. } => {}
            Command::Profile { name } => {
                let identity = self.accounts.update_profile(&name).await?;
                writeln!(
                    out,
                    "display name set to {}",
                    identity.display_name.unwrap_or_default()
                )?;
            }
            Command::Add(fields) => {
                let draft = fields.apply(TransactionDraft::default());
                let id = ledger.upsert(&session, &draft, false).await?;
                writeln!(out, "added {id}")?;
            }
            Command::Edit { id, fields } => {
                let stored = ledger.transaction(&session, &id).await?;
                let draft = fields.apply(TransactionDraft::from(&stored));
                let id = ledger.upsert(&session, &draft, true).await?;
                writeln!(out, "updated {id}")?;
            }
            Command::Delete { id } => {
                ledger.soft_delete(&session, &id).await?;
                writeln!(out, "deleted {id}")?;
            }
            Command::List => write_view(out, &ledger.snapshot(&session).await?)?,
            Command::History => write_history(out, &ledger.archive_snapshot(&session).await?)?,
            Command::Summary => write_summary(out, &ledger.snapshot(&session).await?.summary)?,
            Command::Watch => watch(ledger, &session, out).await?,
        }
        Ok(())
    }
}

async fn watch<S: RemoteStore>(
    ledger: &Ledger<S>,
    session: &Session,
    out: &mut impl Write,
) -> Result<()> {
    let (views, mut received) = mpsc::unbounded_channel();
    let subscription = ledger.subscribe(session, move |view| {
        let _ = views.send(view);
    });

    loop {
        tokio::select! {
            view = received.recv() => match view {
                Some(Ok(view)) => {
                    write_view(out, &view)?;
                    writeln!(out)?;
                }
                Some(Err(err)) => return Err(err.into()),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    subscription.cancel();
    Ok(())
}

fn transaction_line(tx: &Transaction) -> String {
    let mut line = format!(
        "{}  {:<7}  {:>12}  {}",
        tx.date.format("%Y-%m-%d"),
        tx.kind.as_str(),
        tx.amount,
        tx.category
    );
    if !tx.description.is_empty() {
        line.push_str("  ");
        line.push_str(&tx.description);
    }
    line.push_str(&format!("  [{}]", tx.id));
    line
}

fn write_view(out: &mut impl Write, view: &LedgerView) -> std::io::Result<()> {
    if view.transactions.is_empty() {
        writeln!(out, "no transactions")?;
    }
    for tx in &view.transactions {
        writeln!(out, "{}", transaction_line(tx))?;
    }
    write_summary(out, &view.summary)
}

fn write_history(out: &mut impl Write, deleted: &[DeletedTransaction]) -> std::io::Result<()> {
    if deleted.is_empty() {
        writeln!(out, "no deleted transactions")?;
    }
    for entry in deleted {
        writeln!(
            out,
            "deleted {}  {}",
            entry.deleted_at.format("%Y-%m-%d %H:%M"),
            transaction_line(&entry.transaction)
        )?;
    }
    Ok(())
}

fn write_summary(out: &mut impl Write, summary: &Summary) -> std::io::Result<()> {
    writeln!(
        out,
        "income {}  expense {}  balance {:.2}",
        summary.income, summary.expense, summary.total_balance
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ledger::TransactionKind;

    use super::*;
    use crate::cli::FieldArgs;

    async fn memory_context(register_on_sign_in: bool) -> Context<MemoryStore> {
        let database = connect(&Database::Memory).await.unwrap();
        Context {
            accounts: Accounts::builder().database(database).cost(4).build(),
            ledger: Ledger::new(MemoryStore::new()),
            account: Account {
                email: Some("dana@example.com".to_string()),
                password: Some("hunter22".to_string()),
            },
            register_on_sign_in,
        }
    }

    fn expense(category: &str, amount: &str) -> Command {
        Command::Add(FieldArgs {
            kind: Some("expense".to_string()),
            category: Some(category.to_string()),
            amount: Some(amount.to_string()),
            ..FieldArgs::default()
        })
    }

    #[tokio::test]
    async fn memory_mode_registers_the_account_and_lists_what_was_added() {
        let context = memory_context(true).await;

        let mut out = Vec::new();
        context.execute(expense("food", "12.50"), &mut out).await.unwrap();
        let added = String::from_utf8(out).unwrap();
        assert!(added.starts_with("added "), "{added}");

        let mut out = Vec::new();
        context.execute(Command::List, &mut out).await.unwrap();
        let listed = String::from_utf8(out).unwrap();
        assert!(listed.contains("food"), "{listed}");
        assert!(listed.contains("expense 12.50"), "{listed}");
        assert!(listed.contains("balance -12.50"), "{listed}");
    }

    #[tokio::test]
    async fn unknown_account_is_rejected_without_registration() {
        let context = memory_context(false).await;

        let mut out = Vec::new();
        let err = context.execute(Command::List, &mut out).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidCredentials)), "{err:?}");
        assert!(out.is_empty());
    }

    #[test]
    fn transaction_line_shows_description_only_when_present() {
        let mut tx = Transaction {
            id: "t1".to_string(),
            kind: TransactionKind::Expense,
            category: "food".to_string(),
            amount: "12.5".parse().unwrap(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            description: String::new(),
            receipt: None,
        };
        assert_eq!(
            transaction_line(&tx),
            "2024-05-01  expense         12.50  food  [t1]"
        );

        tx.description = "lunch".to_string();
        assert!(transaction_line(&tx).ends_with("food  lunch  [t1]"));
    }
}
