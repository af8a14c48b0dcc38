use json_autosync::{connect, AutoSave};
use serde_json::json;

fn main() -> Result<(), json_autosync::Error> {
    let path = std::env::temp_dir().join("json_autosync_example_categories.json");
    let _ = std::fs::remove_file(&path);
    let config = connect(&path)?;

    // missing levels are created on the way down, one write per set
    config
        .at(["comics", "dc", "batman"])?
        .set("antagonists", json!(["Scarecrow", "The Joker", "Bane"]))?;
    config
        .at(["comics", "marvel", "ironman"])?
        .set("antagonists", "Ultron")?;
    println!("config = {config:?}");

    // reading never writes
    let marvel = config.at(["comics", "marvel"])?;
    println!("marvel keys = {:?}", marvel.keys());

    // deleting the last key of a branch prunes it
    config.at(["comics", "marvel", "ironman"])?.delete("antagonists")?;
    println!("after delete = {config}");

    config.flush()?;
    println!("On-disk JSON:\n{}", std::fs::read_to_string(&path)?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
