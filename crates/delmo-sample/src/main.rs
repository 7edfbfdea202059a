use delmo::tracing::setup_tracing;
use delmo::Event;
use delmo_sample::lifecycle::UserSystem;
use delmo_sample::model::User;
use delmo_sample::{ADDRESS_VAR, DEFAULT_ADDRESS};
use serde_json::json;
use tracing::{info, warn, Instrument};
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let address = std::env::var(ADDRESS_VAR).unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
    let address = Url::parse(&address)?;
    info!(%address, "Starting sample");

    let system = UserSystem::new(address);
    let users = system.users.clone();

    // Log every push notification the model receives.
    let mut inserted = users.listen(Event::Inserted);
    let mut deleted = users.listen(Event::Deleted);
    let watcher = tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    Ok(user) = inserted.recv() => info!(%user, "Pushed: inserted"),
                    Ok(user) = deleted.recv() => info!(%user, "Pushed: deleted"),
                    else => break,
                }
            }
        }
        .instrument(tracing::info_span!("watcher")),
    );

    let taro = User::new("taro").with_email("taro@example.com");
    let created = users.save(taro.to_value()?).await?;
    let id = created["_id"].clone();
    info!(%id, "User created");

    let mut record = users.by_id(id.clone()).await?;
    record["username"] = json!("jiro");
    let updated = record.save().await?;
    info!(user = %updated, "User renamed");

    match record.save().await {
        Err(e) if e.is_same_object() => info!("Nothing changed, save rejected"),
        other => warn!(?other, "Unexpected result saving an unchanged user"),
    }

    let fetched = User::from_instance(&users.by_id(id.clone()).await?)?;
    info!(?fetched, "Fetched user");

    let found = users.find(json!({"username": "jiro"})).await?;
    info!(count = found.len(), "Query finished");

    users.delete_by_id(id.clone()).await?;
    match users.by_id(id).await {
        Err(e) if e.is_not_found() => info!(error = %e, "User is gone"),
        other => warn!(?other, "Deleted user still readable"),
    }

    // Give the watcher a moment to drain pushed notifications.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    watcher.abort();

    drop((record, found, users));
    system.shutdown().await?;
    info!("Sample completed");
    Ok(())
}
