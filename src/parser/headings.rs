use crate::model::{Mood, Tense};

/// `h3` text → mood. New source spellings are added here and nowhere else.
const MOOD_HEADINGS: &[(&str, Mood)] = &[
    ("participe", Mood::Participle),
    ("indicatif", Mood::Indicative),
    ("subjonctif", Mood::Subjunctive),
    ("conditionnel", Mood::Conditional),
    ("impératif", Mood::Imperative),
    ("imperatif", Mood::Imperative),
];

/// `h4` text → tense. Participle form headings reuse `Present`/`Passe`.
const TENSE_HEADINGS: &[(&str, Tense)] = &[
    ("présent", Tense::Present),
    ("present", Tense::Present),
    ("imparfait", Tense::Imparfait),
    ("passé simple", Tense::PasseSimple),
    ("passe simple", Tense::PasseSimple),
    ("futur simple", Tense::FuturSimple),
    ("futur", Tense::FuturSimple),
    ("passé composé", Tense::PasseCompose),
    ("passe compose", Tense::PasseCompose),
    ("plus-que-parfait", Tense::PlusQueParfait),
    ("plus que parfait", Tense::PlusQueParfait),
    ("passé antérieur", Tense::PasseAnterieur),
    ("passe anterieur", Tense::PasseAnterieur),
    ("futur antérieur", Tense::FuturAnterieur),
    ("futur anterieur", Tense::FuturAnterieur),
    ("passé", Tense::Passe),
    ("passe", Tense::Passe),
    ("passé 1re forme", Tense::Passe),
];

/// Trim, lowercase, collapse whitespace, unify apostrophes, drop a trailing colon.
pub fn normalize(text: &str) -> String {
    let joined = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('’', "'");
    joined.trim_end_matches(':').trim_end().to_string()
}

pub fn mood(heading: &str) -> Option<Mood> {
    let key = normalize(heading);
    MOOD_HEADINGS
        .iter()
        .find(|(text, _)| *text == key)
        .map(|(_, mood)| *mood)
}

/// Tense for a heading, only if that tense exists in `mood`.
pub fn tense(mood: Mood, heading: &str) -> Option<Tense> {
    let key = normalize(heading);
    let tense = TENSE_HEADINGS
        .iter()
        .find(|(text, _)| *text == key)
        .map(|(_, tense)| *tense)?;
    let allowed = match mood {
        Mood::Participle => matches!(tense, Tense::Present | Tense::Passe),
        finite => finite.tenses().contains(&tense),
    };
    allowed.then_some(tense)
}
