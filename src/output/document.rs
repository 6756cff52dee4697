//! Nested document form: infinitive → voice → mood → tense → person.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SerializeError;
use crate::model::{Mood, Participle, TenseTable, Verb, Voice};

pub type Document = BTreeMap<String, VerbEntry>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbEntry {
    pub h_aspire: bool,
    pub rectification_1990: bool,
    pub rectification_1990_variante: Option<String>,
    #[serde(flatten)]
    pub voices: BTreeMap<Voice, VoiceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEntry {
    #[serde(rename = "participe", default, skip_serializing_if = "Option::is_none")]
    pub participle: Option<Participle>,
    #[serde(flatten)]
    pub moods: BTreeMap<Mood, TenseTable>,
}

pub fn verb_entry(verb: &Verb) -> VerbEntry {
    let voices = verb
        .voices
        .iter()
        .filter(|(_, table)| !table.is_empty())
        .map(|(voice, table)| {
            let entry = VoiceEntry {
                participle: table.participle.clone().filter(|p| !p.is_empty()),
                moods: table
                    .attested_moods()
                    .map(|(mood, tenses)| (mood, tenses.clone()))
                    .collect(),
            };
            (*voice, entry)
        })
        .collect();

    VerbEntry {
        h_aspire: verb.h_aspire,
        rectification_1990: verb.has_variant(),
        rectification_1990_variante: verb.variant_infinitive.clone(),
        voices,
    }
}

/// Key every record by its infinitive. A repeated infinitive is a merge bug.
pub fn to_document(verbs: &[Verb]) -> Result<Document, SerializeError> {
    let mut doc = Document::new();
    for verb in verbs {
        if doc.insert(verb.infinitive.clone(), verb_entry(verb)).is_some() {
            return Err(SerializeError::DuplicateKey(verb.infinitive.clone()));
        }
    }
    Ok(doc)
}

/// Four-space indented JSON, non-ASCII left as is.
pub fn to_pretty(doc: &Document) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    // serde_json only writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn to_compact(doc: &Document) -> serde_json::Result<String> {
    serde_json::to_string(doc)
}

#[cfg(test)]
pub fn parse(text: &str) -> serde_json::Result<Document> {
    serde_json::from_str(text)
}

// ── Tests ──
