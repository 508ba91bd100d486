use crate::output::{print_json, print_table};
use std::path::Path;

use super::load_config;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if json {
        return print_json(&config.riders);
    }
    if config.riders.is_empty() {
        println!("No riders configured.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = config
        .riders
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.name.clone(),
                r.phone.clone(),
                format!("{:.1}", r.rating),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "PHONE", "RATING"], &rows);
    Ok(())
}
