//! List projects

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::Result;
use desyn_core::Project;
use owo_colors::OwoColorize;

pub async fn run(config: &SystemConfig) -> Result<()> {
    let store = util::open_store(&config.data_dir()?)?;
    let metas = store.list();

    if metas.is_empty() {
        println!("{}", "No projects yet".dimmed());
        println!("  {}", "Tip: Create one with 'desyn new <name>'".dimmed());
        return Ok(());
    }

    for meta in &metas {
        let name = match store.get::<Project>(&meta.id) {
            Ok(Some(doc)) => doc.value.name,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Skipping unreadable document {}: {}", meta.id, e);
                format!("<unreadable: {}>", e)
            }
        };
        util::display_document_compact(meta, &name);
    }

    println!();
    println!("{} projects", metas.len());
    Ok(())
}
