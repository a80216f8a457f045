use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;
use wallet_payment_engine::{db_types::Transaction, traits::SettlementDatabase, SqliteDatabase};

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The sweep is best-effort reconciliation for gateways that never call back: pending payments older than the cutoff
/// move to `expired` through the same status-guarded update as every other transition, so a payment that settles
/// between sweeps is never touched.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    pending_timeout: Duration,
    sweep_interval: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(sweep_interval);
        info!("🕰️ Stale payment expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running stale payment expiry job");
            match db.expire_stale_pending(pending_timeout).await {
                Ok(expired) if expired.is_empty() => {
                    trace!("🕰️ No stale pending payments found");
                },
                Ok(expired) => {
                    info!("🕰️ {} stale pending payments expired", expired.len());
                    debug!("🕰️ Expired payments: {}", transaction_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running stale payment expiry job: {e}");
                },
            }
        }
    })
}

fn transaction_list(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|t| format!("[{}] order_id: {} buyer_id: {}", t.id, t.order_id, t.buyer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
