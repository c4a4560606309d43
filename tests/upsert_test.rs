mod helpers;

use helpers::{record, FakeEmbedder, InMemoryIndex};
use pictovec::index::upsert::{upsert_all, UpsertConfig};
use pictovec::index::MetadataValue;

const NAMESPACE: &str = "pictogramas_ada";

fn upsert_config(batch_size: usize) -> UpsertConfig {
    UpsertConfig {
        namespace: NAMESPACE.into(),
        batch_size,
    }
}

#[test]
fn each_record_stores_a_document_vector_and_name_variants() {
    let records = vec![record("7", &["Empanada", "Empanada salteña"])];
    let index = InMemoryIndex::new();

    let summary = upsert_all(&records, &FakeEmbedder::new(), &index, &upsert_config(100));

    assert_eq!(summary.records_embedded, 1);
    assert_eq!(summary.vectors_upserted, 3);
    assert_eq!(
        index.ids_in(NAMESPACE),
        vec!["7", "7_name_0", "7_name_1"],
        "one document vector plus one per raw name"
    );

    let document = index.get(NAMESPACE, "7").unwrap();
    assert_eq!(
        document.metadata.get("identifier").unwrap().as_text(),
        Some("7")
    );
    assert_eq!(
        document.metadata.get("names"),
        Some(&MetadataValue::List(vec![
            "Empanada".into(),
            "Empanada salteña".into()
        ]))
    );

    // variants share the document's metadata
    let variant = index.get(NAMESPACE, "7_name_1").unwrap();
    assert_eq!(variant.metadata, document.metadata);
}

#[test]
fn buffer_flushes_at_the_threshold_and_drains_at_the_end() {
    // three single-name records produce two vectors each
    let records = vec![
        record("1", &["Flan"]),
        record("2", &["Asado"]),
        record("3", &["Locro"]),
    ];
    let index = InMemoryIndex::new();

    let summary = upsert_all(&records, &FakeEmbedder::new(), &index, &upsert_config(4));

    assert_eq!(index.upsert_sizes(), vec![4, 2]);
    assert_eq!(summary.flushes, 2);
    assert_eq!(summary.vectors_upserted, 6);
}

#[test]
fn enriched_attributes_become_store_metadata() {
    let mut cerveza = record("38", &["Cerveza"]);
    cerveza.definition = Some("Bebida alcohólica fermentada de cebada.".into());
    cerveza.category = Some("bebidas".into());
    cerveza.equivalents = Some(vec!["birra".into(), "chela".into()]);

    let index = InMemoryIndex::new();
    upsert_all(&[cerveza], &FakeEmbedder::new(), &index, &upsert_config(100));

    let document = index.get(NAMESPACE, "38").unwrap();
    assert_eq!(
        document.metadata.get("category"),
        Some(&MetadataValue::Text("bebidas".into()))
    );
    assert_eq!(
        document.metadata.get("equivalents"),
        Some(&MetadataValue::List(vec!["birra".into(), "chela".into()]))
    );
    assert!(
        !document.metadata.contains_key("origin"),
        "absent attributes stay out of the metadata"
    );
}

#[test]
fn one_failing_embed_does_not_stop_the_run() {
    let records = vec![record("1", &["veneno"]), record("2", &["Asado"])];
    let index = InMemoryIndex::new();

    let summary = upsert_all(
        &records,
        &FakeEmbedder::failing_on("veneno"),
        &index,
        &upsert_config(100),
    );

    assert_eq!(summary.records_embedded, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].record["identifier"], "1");
    assert!(summary.failures[0].error_message.contains("429"));
    assert_eq!(index.ids_in(NAMESPACE), vec!["2", "2_name_0"]);
}

#[test]
fn rejected_flushes_report_every_affected_identifier() {
    let records = vec![record("1", &["Fideos"]), record("2", &["Ñoquis"])];
    let index = InMemoryIndex::failing();

    let summary = upsert_all(&records, &FakeEmbedder::new(), &index, &upsert_config(100));

    assert_eq!(summary.vectors_upserted, 0);
    assert_eq!(summary.failures.len(), 2);
    assert_eq!(summary.failures[0].record["identifier"], "1");
    assert_eq!(summary.failures[1].record["identifier"], "2");
    assert_eq!(
        index.upsert_sizes(),
        vec![4],
        "the flush was attempted once with the full buffer"
    );
}
