//! Show a project summary

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use desyn_core::Project;
use desyn_store::Document;
use owo_colors::OwoColorize;

pub async fn run(config: &SystemConfig, reference: &str) -> Result<()> {
    let store = util::open_store(&config.data_dir()?)?;
    let id = util::resolve_document_ref(reference, &store)?;

    let doc: Document<Project> = store
        .get(&id)
        .context("Failed to read project document")?
        .with_context(|| format!("Document disappeared: {}", id))?;
    let Document { meta, value: project } = doc;

    println!("{}", project.name.bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("ID:        {}", meta.id.to_string().yellow());
    println!("FPS:       {}", project.fps);
    println!("Frames:    {}", project.frame_count());
    println!("Strokes:   {}", project.stroke_count());
    println!();
    println!("Revision:  {}", meta.revision);
    println!(
        "Updated:   {}",
        util::format_relative_time(meta.updated_at_ms)
    );
    println!(
        "Created:   {}",
        util::format_relative_time(meta.created_at_ms).dimmed()
    );
    println!("Size:      {}", util::format_size(meta.size_bytes));
    println!("Content:   {}", meta.content_hash.short(16).dimmed());

    if project.frame_count() > 1 {
        println!();
        println!("Frames:");
        for (index, frame) in project.frames.iter().enumerate().take(10) {
            println!("  {:>3}  {} strokes", index, frame.strokes.len());
        }
        if project.frame_count() > 10 {
            println!("  ... and {} more", project.frame_count() - 10);
        }
    }

    Ok(())
}
