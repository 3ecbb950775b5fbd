use std::sync::Arc;

use before_storage::BeforeConfig;
use before_storage::MemoryStorage;
use before_storage::Oid;
use before_storage::Opened;
use before_storage::Startup;
use before_storage::Storage;
use before_storage::StorageRO;
use before_storage::SystemClock;
use before_storage::Tid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Captured once, for views configured with `before = "startup"`.
    let startup = Startup::capture(&SystemClock)?;

    // A storage with a few revisions of one object
    let storage = Arc::new(MemoryStorage::new("demo"));
    let oid = Oid::new(1);
    for (year, body) in [(2006, "first"), (2007, "second"), (2009, "third")] {
        let tid = Tid::from_parts(year, 1, 1, 0, 0, 0.0)?;
        storage.append(oid, tid, body.as_bytes().to_vec())?;
    }

    // Freeze it at mid 2008
    let config = BeforeConfig::default().with_before("2008-06-30T12:00:00");
    let view = config
        .open(Opened(storage.clone()), &SystemClock, startup)
        .await?;

    println!("{:?}", view);

    let loaded = view.load(oid).await?;
    println!(
        "current: {} written at {}",
        String::from_utf8_lossy(&loaded.data),
        loaded.serial
    );

    for entry in view.history(oid, 10).await? {
        println!("history: {} ({} bytes)", entry.tid, entry.size);
    }

    println!("last transaction: {}", view.last_transaction());

    // Writes never reach the storage
    if let Err(e) = view.new_oid().await {
        println!("new_oid: {}", e);
    }

    Ok(())
}
