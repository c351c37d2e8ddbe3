//! Walks one customer through register → login → open → deposit → transfer,
//! logging each step, then audits the books.

use anyhow::{Context, bail};

use tillbook_core::Entity;
use tillbook_infra::{LedgerConfig, Tillbook};
use tillbook_ledger::AccountFilter;

fn main() -> anyhow::Result<()> {
    tillbook_observability::init();

    let config = LedgerConfig::from_env().context("loading configuration")?;
    let bank = Tillbook::new(&config);

    bank.registrar()
        .register("demo@example.com", "demo-password", "Demo Customer")
        .context("registering demo user")?;
    let session = bank
        .registrar()
        .authenticate("demo@example.com", "demo-password")
        .context("logging in")?;
    let caller = bank
        .registrar()
        .resolve_caller(&session.token)
        .context("resolving bearer token")?;

    let engine = bank.engine();
    let checking = engine.create_account(caller, "Checking", "USD")?;
    let savings = engine.create_account(caller, "Savings", "USD")?;

    engine.deposit(*checking.id(), 1_000, None)?;
    engine.transfer(*checking.id(), *savings.id(), 400, None)?;

    for account in engine.list_accounts(&AccountFilter::owned_by(caller)) {
        tracing::info!(
            account_id = %account.id(),
            name = account.name(),
            currency = account.currency(),
            balance = account.balance(),
            "account summary"
        );
    }

    let mismatches = engine.audit();
    if !mismatches.is_empty() {
        bail!("books do not balance: {}", serde_json::to_string(&mismatches)?);
    }
    tracing::info!("audit clean");
    Ok(())
}
