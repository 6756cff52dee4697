use tracing::{debug, warn};

use super::blocks::{Block, Row, VoiceClass};
use super::headings;
use crate::error::ExtractionError;
use crate::model::{Mood, Tense, Voice};

const AVOIR_FORMS: &[&str] = &["ai", "as", "a", "avons", "avez", "ont"];
const ETRE_FORMS: &[&str] = &["suis", "es", "est", "sommes", "êtes", "sont"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipleForm {
    Present,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Conjugation { mood: Mood, tense: Tense },
    Participle(ParticipleForm),
}

/// A labeled block: the rows of one tense (or participle form) of one voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub voice: Voice,
    pub kind: SectionKind,
    pub rows: Vec<Row>,
}

struct VoiceGroup {
    class: VoiceClass,
    mood: Option<Mood>,
    sections: Vec<(SectionKind, Vec<Row>)>,
}

/// Cluster the flat block stream into labeled sections by heading transitions.
/// Headings go through the fixed lookup table; an unmapped one is fatal.
pub fn cluster_sections(verb: &str, blocks: &[Block]) -> Result<Vec<Section>, ExtractionError> {
    let mut sections = Vec::new();
    let mut group: Option<VoiceGroup> = None;

    for block in blocks {
        match block {
            Block::Voice(class) => {
                if let Some(done) = group.take() {
                    flush(verb, done, &mut sections);
                }
                group = Some(VoiceGroup {
                    class: *class,
                    mood: None,
                    sections: Vec::new(),
                });
            }
            Block::Mood(text) => {
                let Some(g) = group.as_mut() else { continue };
                let mood = headings::mood(text).ok_or_else(|| unknown(verb, text))?;
                g.mood = Some(mood);
            }
            Block::Tense(text) => {
                let Some(g) = group.as_mut() else { continue };
                let mood = g.mood.ok_or_else(|| unknown(verb, text))?;
                let tense = headings::tense(mood, text).ok_or_else(|| unknown(verb, text))?;
                let kind = match (mood, tense) {
                    (Mood::Participle, Tense::Present) => {
                        SectionKind::Participle(ParticipleForm::Present)
                    }
                    (Mood::Participle, _) => SectionKind::Participle(ParticipleForm::Past),
                    (mood, tense) => SectionKind::Conjugation { mood, tense },
                };
                g.sections.push((kind, Vec::new()));
            }
            Block::Row(row) => match group.as_mut().and_then(|g| g.sections.last_mut()) {
                Some((_, rows)) => rows.push(row.clone()),
                None => debug!(verb, "row outside any tense block ignored"),
            },
        }
    }

    if let Some(done) = group.take() {
        flush(verb, done, &mut sections);
    }
    Ok(sections)
}

fn unknown(verb: &str, heading: &str) -> ExtractionError {
    ExtractionError::UnknownHeading {
        verb: verb.to_string(),
        heading: heading.to_string(),
    }
}

fn flush(verb: &str, group: VoiceGroup, out: &mut Vec<Section>) {
    let voice = match group.class {
        VoiceClass::ActiveAvoir => Voice::ActiveAvoir,
        VoiceClass::ActiveEtre => Voice::ActiveEtre,
        VoiceClass::Pronominal => Voice::Pronominal,
        VoiceClass::Active => match guess_auxiliary(&group.sections) {
            Some(voice) => voice,
            None => {
                warn!(verb, "unable to determine the auxiliary; active voice skipped");
                return;
            }
        },
    };
    out.extend(
        group
            .sections
            .into_iter()
            .map(|(kind, rows)| Section { voice, kind, rows }),
    );
}

/// Decide avoir/être from the first auxiliary of the indicative passé composé.
fn guess_auxiliary(sections: &[(SectionKind, Vec<Row>)]) -> Option<Voice> {
    let passe_compose = SectionKind::Conjugation {
        mood: Mood::Indicative,
        tense: Tense::PasseCompose,
    };
    let (_, rows) = sections.iter().find(|(kind, _)| *kind == passe_compose)?;
    let aux = rows
        .iter()
        .find(|r| !r.auxiliary.is_empty())?
        .auxiliary
        .split_whitespace()
        .next()?
        .to_lowercase();
    if AVOIR_FORMS.contains(&aux.as_str()) {
        Some(Voice::ActiveAvoir)
    } else if ETRE_FORMS.contains(&aux.as_str()) {
        Some(Voice::ActiveEtre)
    } else {
        None
    }
}

// ── Tests ──
