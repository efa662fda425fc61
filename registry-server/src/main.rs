use registry_server::{
    Config, DbService, IssnLedger, RangeLedger, cleanup_old_logs, setup_environment,
};
use shared::models::IdentifierType;

const LOG_RETENTION_DAYS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration (.env first), directories, logging
    let config = Config::load();
    let _guard = setup_environment(&config)?;

    tracing::info!(
        environment = %config.environment,
        database = %config.database_path,
        "Identifier registry starting..."
    );

    if let Err(e) = cleanup_old_logs(&config.log_dir, LOG_RETENTION_DAYS) {
        tracing::warn!("Failed to clean up old logs: {}", e);
    }

    // 2. Database (runs migrations)
    let db = DbService::new(&config.database_path, config.db_max_connections).await?;

    // 3. Ledger status
    for identifier_type in [IdentifierType::Isbn, IdentifierType::Ismn] {
        let ledger = RangeLedger::new(db.pool.clone(), identifier_type);
        for r in ledger.read_all().await? {
            tracing::info!(
                identifier_type = %identifier_type,
                range_id = r.id,
                scope = %r.scope(),
                category = r.category,
                next = %r.next,
                free = r.free,
                taken = r.taken,
                canceled = r.canceled,
                active = r.is_active,
                closed = r.is_closed,
                "Range"
            );
        }
    }

    let issn = IssnLedger::new(db.pool.clone());
    for r in issn.read_all().await? {
        tracing::info!(
            range_id = r.id,
            block = %r.block,
            next = %r.next,
            free = r.free,
            taken = r.taken,
            canceled = r.canceled,
            active = r.is_active,
            closed = r.is_closed,
            "ISSN range"
        );
    }

    tracing::info!("Identifier registry ready");
    Ok(())
}
