use json_autosync::{AutoSave, AutoSyncBuilder, FlushPolicy};
use std::time::Duration;

fn main() -> Result<(), json_autosync::Error> {
    let path = std::env::temp_dir().join("json_autosync_example_builder.json");

    // 4-space indent + coalesced background writes
    let config = AutoSyncBuilder::new(&path)
        .indent(Some(4))
        .policy(FlushPolicy::Async(Duration::from_millis(100)))
        .build()?;

    let server = config.child("server")?;
    server.set("host", "127.0.0.1")?;
    server.set("port", 8080)?;
    config.child("features")?.set("telemetry", false)?;

    // make sure the background writer caught up before reading the file
    config.flush()?;
    let contents = std::fs::read_to_string(&path)?;
    println!("On-disk JSON:\n{contents}");
    println!("\nDebug output: {config:?}");

    let _ = std::fs::remove_file(&path);
    Ok(())
}
