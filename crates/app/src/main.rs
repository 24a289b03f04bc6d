use std::time::Duration;

use chrono::Utc;
use engine::Engine;
use migration::{Migrator, MigratorTrait};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "monthbook={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_database(&settings.database).await?;
    let engine = Engine::builder()
        .database(db)
        .lock_timeout(Duration::from_millis(settings.engine.lock_timeout_ms))
        .build()
        .await?;

    let interval = Duration::from_secs(settings.scheduler.interval_secs.max(1));
    tracing::info!("scheduler started, ticking every {interval:?}");
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => run_tick(&engine).await,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Turn every active workspace over to the current month, then materialize
/// the recurring templates of its open period. Failures are per workspace.
async fn run_tick(engine: &Engine) {
    let now = Utc::now();
    let today = now.date_naive();

    let workspaces = match engine.active_workspaces().await {
        Ok(workspaces) => workspaces,
        Err(err) => {
            tracing::error!("failed to list workspaces: {err}");
            return;
        }
    };

    for workspace in workspaces {
        match engine.roll_over(workspace.id, today, now).await {
            Ok(closed) => {
                for month in closed {
                    tracing::info!(
                        workspace = %workspace.name,
                        period = %month.closure.period,
                        balance = %month.closure.balance,
                        "closed"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(workspace = %workspace.name, "roll over failed: {err}");
                continue;
            }
        }

        let open = match engine.current_open_period(workspace.id).await {
            Ok(open) => open,
            Err(err) => {
                tracing::warn!(workspace = %workspace.name, "no open period: {err}");
                continue;
            }
        };
        if let Err(err) = engine
            .expand_recurring(workspace.id, open.period, now)
            .await
        {
            tracing::warn!(
                workspace = %workspace.name,
                period = %open.period,
                "expansion failed: {err}"
            );
        }
    }
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
