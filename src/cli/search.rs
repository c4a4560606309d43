use anyhow::Result;

use crate::config::PictovecConfig;
use crate::index::search::{search as run_search, SearchOptions};

/// Run a similarity search from the terminal.
pub fn search(config: &PictovecConfig, query: &str, top_k: Option<usize>, raw: bool) -> Result<()> {
    let embedder = super::openai_embedder(config)?;
    let store = super::pinecone_index(config)?;

    let options = SearchOptions {
        namespace: config.index.namespace.clone(),
        top_k: top_k.unwrap_or(config.search.top_k),
        rewrite_query: config.search.rewrite_query && !raw,
    };

    let results = run_search(query, &embedder, &store, &options)?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s) for \"{query}\"\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let names = result
            .metadata
            .get("names")
            .map(|value| value.to_string())
            .unwrap_or_else(|| result.identifier.clone());

        println!(
            "  {}. {} (id {}, score {:.3})",
            i + 1,
            names,
            result.identifier,
            result.score
        );
        if let Some(definition) = result.metadata.get("definition") {
            println!("     {}", preview(&definition.to_string(), 160));
        }
        if let Some(category) = result.metadata.get("category") {
            match result.metadata.get("subcategory") {
                Some(subcategory) => println!("     {category} / {subcategory}"),
                None => println!("     {category}"),
            }
        }
        if let Some(equivalents) = result.metadata.get("equivalents") {
            println!("     Equivalentes: {equivalents}");
        }
        println!();
    }

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
