//! Deterministic embedding-text construction.
//!
//! [`build_text`] maps a record to the exact string submitted for embedding.
//! Field order, labels, and presence rules are part of the retrieval
//! contract: similar records must produce similar texts, and re-indexing the
//! same record must reproduce the same vector input byte for byte. Labels
//! stay in Spanish because the indexed catalog and its queries are Spanish.

use crate::catalog::types::Record;

/// Build the primary embedding text for a record.
///
/// Always nine lines, one per attribute, labels present even when the value
/// is empty. List attributes are comma-joined.
pub fn build_text(record: &Record) -> String {
    [
        format!("Nombre del pictograma: {}", record.names.join(", ")),
        format!("Definición: {}", field(&record.definition)),
        format!("Ingredientes: {}", join_list(&record.ingredients)),
        format!("Forma de servir: {}", field(&record.serving_style)),
        format!("Origen: {}", field(&record.origin)),
        format!("Tipo de cocción: {}", field(&record.preparation_method)),
        format!("Categoría: {}", field(&record.category)),
        format!("Subcategoría: {}", field(&record.subcategory)),
        format!("Equivalentes: {}", join_list(&record.equivalents)),
    ]
    .join("\n")
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn join_list(value: &Option<Vec<String>>) -> String {
    value.as_deref().unwrap_or(&[]).join(", ")
}
