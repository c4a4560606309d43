//! Core catalog record definitions.
//!
//! Defines [`Record`] (one pictogram/food entry), the tolerant deserializers
//! that accept the raw catalog's loose JSON (integer or string identifiers,
//! scalar or list names), and [`Record::normalize`] which derives the canonical
//! display name used in enrichment prompts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog-level errors: records that cannot participate in the pipeline.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The record lacks the identity fields the pipeline keys on.
    #[error("malformed record {identifier}: {reason}")]
    MalformedRecord { identifier: String, reason: String },
}

/// One catalog entry: a stable identifier, its display names, and the
/// descriptive attributes filled in by enrichment.
///
/// `identifier` and `names` come from the source catalog and are never
/// modified by the pipeline; every other field is optional and absent until
/// an enrichment run sets it. Absent fields are omitted on serialization so
/// unenriched records round-trip as `{identifier, names}` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Stable external identifier. Accepts a JSON string or integer on input;
    /// always held and written back as a string.
    #[serde(deserialize_with = "deserialize_identifier")]
    pub identifier: String,
    /// Ordered display names. A scalar name in the source JSON is promoted to
    /// a one-element list.
    #[serde(default, deserialize_with = "deserialize_names")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equivalents: Option<Vec<String>>,
}

impl Record {
    /// New record with identity fields only; attributes start unset.
    pub fn new(identifier: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            identifier: identifier.into(),
            names,
            definition: None,
            category: None,
            subcategory: None,
            origin: None,
            preparation_method: None,
            serving_style: None,
            ingredients: None,
            equivalents: None,
        }
    }

    /// Canonical `(primary_name, names)` pair for this record.
    ///
    /// Names are trimmed and empty entries dropped. The primary name is the
    /// first surviving entry truncated at its first comma, so
    /// `"Milanesa, estilo napolitana"` yields `"Milanesa"`. Fails with
    /// [`CatalogError::MalformedRecord`] when no usable name remains.
    pub fn normalize(&self) -> Result<(String, Vec<String>), CatalogError> {
        let names: Vec<String> = self
            .names
            .iter()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .collect();

        let first = names.first().ok_or_else(|| CatalogError::MalformedRecord {
            identifier: self.identifier.clone(),
            reason: "name field absent or empty".into(),
        })?;

        let primary = first
            .split(',')
            .next()
            .unwrap_or(first)
            .trim()
            .to_owned();
        if primary.is_empty() {
            return Err(CatalogError::MalformedRecord {
                identifier: self.identifier.clone(),
                reason: "name field absent or empty".into(),
            });
        }

        Ok((primary, names))
    }

    /// Primary display name, or an error when the record has none.
    pub fn primary_name(&self) -> Result<String, CatalogError> {
        self.normalize().map(|(primary, _)| primary)
    }
}

fn deserialize_identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct IdentifierVisitor;

    impl serde::de::Visitor<'_> for IdentifierVisitor {
        type Value = String;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a string or integer identifier")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_owned())
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdentifierVisitor)
}

fn deserialize_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NamesVisitor;

    impl<'de> serde::de::Visitor<'de> for NamesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("a name string or a list of name strings")
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Vec<String>, E> {
            Ok(vec![v.to_owned()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Vec<String>, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut names = Vec::new();
            while let Some(name) = seq.next_element::<String>()? {
                names.push(name);
            }
            Ok(names)
        }
    }

    deserializer.deserialize_any(NamesVisitor)
}
