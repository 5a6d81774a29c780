#![deny(warnings)]

use persistence::{default_sqlite_url, init_db, SlotStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let arg = std::env::args().nth(1);
    let url = arg.as_deref().unwrap_or(default_sqlite_url());
    // Ensure directory exists
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"));
    if let Some(path) = path.filter(|p| !p.starts_with(':')) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = SqliteStore::new(init_db(url).await?);
    let slots = store.slot_names().await?;
    for slot in &slots {
        // Rewrite every slot through the current schema so old saves upgrade.
        let Some(body) = store.read(slot).await? else {
            continue;
        };
        let doc: serde_json::Value = serde_json::from_str(&body)?;
        let upgraded = persistence::migrate(doc)?;
        store.write(slot, &serde_json::to_string(&upgraded)?).await?;
    }
    println!("DB migrated at {} ({} slots)", url, slots.len());
    Ok(())
}
