//! Create a new animation project

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use desyn_core::Project;
use owo_colors::OwoColorize;

pub async fn run(config: &SystemConfig, name: &str, fps: Option<u32>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Project name must not be empty");
    }

    let mut project = Project::new(name);
    if let Some(fps) = fps {
        project.set_fps(fps)?;
    }

    let store = util::open_store(&config.data_dir()?)?;
    let meta = store
        .create(&project)
        .context("Failed to create project document")?;

    tracing::info!("Created project '{}' as {}", name, meta.id);

    println!("{} Created {}", "✓".green(), name.bold());
    println!("  ID:  {}", meta.id.to_string().yellow());
    println!("  FPS: {}", project.fps);
    println!();
    println!(
        "{}",
        format!("Start editing with 'desyn edit {}'", &meta.id.to_string()[..10]).dimmed()
    );

    Ok(())
}
