use anyhow::Result;

use crate::config::PictovecConfig;
use crate::index::VectorIndex;

/// Display vector store statistics in the terminal.
pub fn stats(config: &PictovecConfig) -> Result<()> {
    let store = super::pinecone_index(config)?;
    let stats = store.describe_stats()?;

    println!("Index Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total vectors:       {}", stats.total_vector_count);
    println!();

    println!("By Namespace:");
    if stats.namespaces.is_empty() {
        println!("  (none)");
    } else {
        for (name, namespace) in &stats.namespaces {
            println!("  {:<24} {}", name, namespace.vector_count);
        }
    }

    if !stats.namespaces.contains_key(&config.index.namespace) {
        println!();
        println!(
            "Note: configured namespace '{}' holds no vectors yet.",
            config.index.namespace
        );
    }

    Ok(())
}
