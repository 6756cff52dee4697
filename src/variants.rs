//! Spelling variants: several accepted forms inside one cell, and reform
//! pairs of the infinitive itself.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{SerializeError, VariantAmbiguity};
use crate::model::{Origin, Verb};
use crate::parser::blocks::PageHeader;

/// Accepted forms of a verb cell, first-listed first. Dash placeholders and
/// blanks yield nothing.
pub fn split_cell(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() || text == "—" || text == "-" {
        return Vec::new();
    }
    text.split(',')
        .flat_map(|part| part.split(" ou "))
        .map(|form| form.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|form| !form.is_empty() && form != "—" && form != "-")
        .collect()
}

/// Reform spelling by dropping the circumflex on `i` and `u`.
pub fn derive_reformed(infinitive: &str) -> Option<String> {
    let reformed = infinitive.replace('î', "i").replace('û', "u");
    (reformed != infinitive).then_some(reformed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantDecision {
    /// No reform signal.
    None,
    /// The verb is one half of a reform pair with this infinitive.
    Linked(String),
    /// Header and spelling rule disagree; kept as a single record.
    Ambiguous(VariantAmbiguity),
    /// Flagged as reformed, but no second spelling can be found.
    Underivable,
}

/// Second spelling named by the header: the reform marker's text, or the other
/// half of a dual-spelling `h1` that lists `infinitive` itself. A lone headword
/// that merely differs from the infinitive (homograph number, superscript) is
/// not a spelling.
fn declared_spelling(infinitive: &str, header: &PageHeader) -> Option<String> {
    let usable = |s: &str| !s.is_empty() && s != infinitive && !s.contains(' ');
    let marker = header
        .reform_marker
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| usable(s));
    if marker.is_some() {
        return marker;
    }

    let spellings: Vec<String> = header
        .spellings
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    if spellings.len() < 2 || !spellings.iter().any(|s| s == infinitive) {
        return None;
    }
    spellings.into_iter().find(|s| usable(s))
}

/// Decide the reform partner of `infinitive` from its page header and the
/// spelling rule.
pub fn resolve_infinitive(infinitive: &str, header: &PageHeader) -> VariantDecision {
    let declared = declared_spelling(infinitive, header);
    let derived = derive_reformed(infinitive);

    match (declared, derived) {
        (Some(declared), Some(derived)) if declared != derived => {
            VariantDecision::Ambiguous(VariantAmbiguity {
                verb: infinitive.to_string(),
                declared,
                derived,
            })
        }
        (Some(variant), _) | (None, Some(variant)) => VariantDecision::Linked(variant),
        (None, None) if header.reform_marker.is_some() => VariantDecision::Underivable,
        (None, None) => VariantDecision::None,
    }
}

/// Apply a decision to a freshly built record and return the records the page
/// yields: the verb itself, plus its synthesized partner when linked.
pub fn apply(mut verb: Verb, decision: VariantDecision) -> Vec<Verb> {
    match decision {
        VariantDecision::None => vec![verb],
        VariantDecision::Ambiguous(ambiguity) => {
            warn!(verb = %verb.infinitive, "{}; keeping a single record", ambiguity);
            verb.variant_infinitive = None;
            vec![verb]
        }
        VariantDecision::Underivable => {
            warn!(verb = %verb.infinitive, "reform flag without a derivable variant spelling");
            verb.variant_infinitive = None;
            vec![verb]
        }
        VariantDecision::Linked(variant) => {
            verb.variant_infinitive = Some(variant);
            let partner = sibling(&verb);
            vec![verb, partner]
        }
    }
}

/// The reform partner of a linked record: same content under the other
/// spelling, pointing back, with multi-form cells listed in reverse.
pub fn sibling(verb: &Verb) -> Verb {
    let mut partner = verb.clone();
    partner.infinitive = verb.variant_infinitive.clone().unwrap_or_default();
    partner.variant_infinitive = Some(verb.infinitive.clone());
    partner.origin = Origin::Sibling;
    for table in partner.voices.values_mut() {
        for persons in table.moods.values_mut().flat_map(|t| t.values_mut()) {
            *persons = persons.map_cells(|cell| cell.reversed());
        }
    }
    partner
}

/// Merge the records of a whole batch into one record per infinitive, sorted.
///
/// A page record replaces a synthesized sibling; two page records for the
/// same infinitive are fatal. Afterwards every link is made mutual.
pub fn merge(mut records: Vec<Verb>) -> Result<Vec<Verb>, SerializeError> {
    records.sort_by(|a, b| {
        (&a.infinitive, a.origin, &a.variant_infinitive)
            .cmp(&(&b.infinitive, b.origin, &b.variant_infinitive))
    });

    let mut merged: BTreeMap<String, Verb> = BTreeMap::new();
    for record in records {
        match merged.get(&record.infinitive) {
            None => {
                merged.insert(record.infinitive.clone(), record);
            }
            Some(existing) => match (existing.origin, record.origin) {
                (Origin::Page, Origin::Page) => {
                    return Err(SerializeError::DuplicateKey(record.infinitive));
                }
                (Origin::Sibling, Origin::Page) => {
                    merged.insert(record.infinitive.clone(), record);
                }
                _ => {}
            },
        }
    }

    let links: Vec<(String, String)> = merged
        .values()
        .filter_map(|v| Some((v.infinitive.clone(), v.variant_infinitive.clone()?)))
        .collect();
    for (from, to) in links {
        let Some(partner) = merged.get_mut(&to) else {
            continue;
        };
        match &partner.variant_infinitive {
            None => partner.variant_infinitive = Some(from),
            Some(back) if *back != from => {
                warn!(verb = %to, linked_from = %from, points_to = %back, "conflicting reform links");
            }
            Some(_) => {}
        }
    }

    Ok(merged.into_values().collect())
}
