pub mod agreement;
pub mod participles;
pub mod persons;

use super::blocks::PageHeader;
use super::sections::{Section, SectionKind};
use crate::error::ModelInconsistencyError;
use crate::model::{Person, Verb, VoiceTable};

/// Build the canonical record of one verb from its labeled sections.
///
/// Variant linkage is left to the resolver; only the `h aspiré` flag is
/// taken from the header here.
pub fn build_verb(
    infinitive: &str,
    header: &PageHeader,
    sections: &[Section],
) -> Result<Verb, ModelInconsistencyError> {
    let mut verb = Verb::new(infinitive);
    verb.h_aspire = header.h_aspire;

    for section in sections {
        let table = verb.voices.entry(section.voice).or_default();
        match section.kind {
            SectionKind::Conjugation { mood, tense } => {
                let read = persons::read_tense(infinitive, mood, tense, &section.rows)?;
                let slot = table.moods.entry(mood).or_default().entry(tense).or_default();
                for person in Person::ALL {
                    let merged = match (slot.take(person), read.get(person).cloned()) {
                        (Some(existing), Some(more)) => Some(existing.merged(more)),
                        (existing, more) => existing.or(more),
                    };
                    slot.set(person, merged);
                }
            }
            SectionKind::Participle(form) => {
                let participle = table.participle.get_or_insert_with(Default::default);
                participles::read(infinitive, form, &section.rows, participle);
            }
        }
    }

    agreement::normalize(&mut verb);
    prune(&mut verb);
    Ok(verb)
}

/// Drop moods with no conjugated person, empty participles, then empty voices.
/// Wholly empty tenses survive inside an attested mood.
fn prune(verb: &mut Verb) {
    for table in verb.voices.values_mut() {
        prune_voice(table);
    }
    verb.voices.retain(|_, table| !table.is_empty());
}

fn prune_voice(table: &mut VoiceTable) {
    table
        .moods
        .retain(|_, tenses| tenses.values().any(|p| !p.is_empty()));
    if table.participle.as_ref().is_some_and(|p| p.is_empty()) {
        table.participle = None;
    }
}

// ── Tests ──
