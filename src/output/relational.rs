//! Normalized relational rows: verbs, conjugations, participles.

use std::ops::Range;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::SerializeError;
use crate::model::{Cell, Mood, Person, Tense, Verb, Voice};

/// Joins the accepted forms of one person slot.
pub const FORM_DELIMITER: char = ';';

/// Process-wide infinitive → id allocator. Ids start at 1 and are never reused.
#[derive(Debug)]
pub struct VerbIds {
    next: AtomicI64,
}

impl Default for VerbIds {
    fn default() -> Self {
        Self {
            next: AtomicI64::new(1),
        }
    }
}

impl VerbIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `count` consecutive ids in one step.
    pub fn reserve(&self, count: usize) -> Range<i64> {
        let count = count as i64;
        let start = self.next.fetch_add(count, Ordering::SeqCst);
        start..start + count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbRow {
    pub id: i64,
    pub infinitive: String,
    pub h_aspire: bool,
    pub rectification_1990: bool,
    pub rectification_1990_variante: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConjugationRow {
    pub verb_id: i64,
    pub voice: Voice,
    pub mood: Mood,
    pub tense: Tense,
    pub person: Person,
    pub form: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParticipleRow {
    pub verb_id: i64,
    pub voice: Voice,
    pub form_name: String,
    pub participle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rows {
    pub verbs: Vec<VerbRow>,
    pub conjugations: Vec<ConjugationRow>,
    pub participles: Vec<ParticipleRow>,
}

impl Rows {
    pub fn extend(&mut self, other: Rows) {
        self.verbs.extend(other.verbs);
        self.conjugations.extend(other.conjugations);
        self.participles.extend(other.participles);
    }
}

/// Flatten a cell to one string. A form already holding the delimiter would
/// be unreadable afterwards.
pub fn join_cell(verb: &str, cell: &Cell) -> Result<String, SerializeError> {
    if let Some(form) = cell.forms().iter().find(|f| f.contains(FORM_DELIMITER)) {
        return Err(SerializeError::DelimiterCollision {
            verb: verb.to_string(),
            form: form.clone(),
            delimiter: FORM_DELIMITER,
        });
    }
    Ok(cell.forms().join(&FORM_DELIMITER.to_string()))
}

fn masculine_of(person: Person) -> Option<Person> {
    match person {
        Person::ThirdSingularFeminine => Some(Person::ThirdSingularMasculine),
        Person::ThirdPluralFeminine => Some(Person::ThirdPluralMasculine),
        _ => None,
    }
}

/// Rows of one verb under a given id.
///
/// No row for a null person. A feminine third person equal to its
/// masculine is implied by the masculine row and not written.
pub fn verb_rows(id: i64, verb: &Verb) -> Result<Rows, SerializeError> {
    let mut rows = Rows::default();
    rows.verbs.push(VerbRow {
        id,
        infinitive: verb.infinitive.clone(),
        h_aspire: verb.h_aspire,
        rectification_1990: verb.has_variant(),
        rectification_1990_variante: verb.variant_infinitive.clone(),
    });

    for (voice, table) in &verb.voices {
        if let Some(participle) = &table.participle {
            if let Some(present) = &participle.present {
                rows.participles.push(ParticipleRow {
                    verb_id: id,
                    voice: *voice,
                    form_name: "present".to_string(),
                    participle: present.clone(),
                });
            }
            for (key, form) in participle.past.entries() {
                rows.participles.push(ParticipleRow {
                    verb_id: id,
                    voice: *voice,
                    form_name: format!("passe_{}", key),
                    participle: form.to_string(),
                });
            }
        }

        for (mood, tenses) in table.attested_moods() {
            for (tense, persons) in tenses {
                for (person, cell) in persons.iter() {
                    let Some(cell) = cell else { continue };
                    let implied = masculine_of(person)
                        .and_then(|masc| persons.get(masc))
                        .is_some_and(|masc| masc == cell);
                    if implied {
                        continue;
                    }
                    rows.conjugations.push(ConjugationRow {
                        verb_id: id,
                        voice: *voice,
                        mood,
                        tense: *tense,
                        person,
                        form: join_cell(&verb.infinitive, cell)?,
                    });
                }
            }
        }
    }
    Ok(rows)
}

/// Rows of a whole merged batch. `verbs` must already be sorted by
/// infinitive; ids are reserved as one block and assigned in that order.
pub fn to_rows(verbs: &[Verb], ids: &VerbIds) -> Result<Rows, SerializeError> {
    let mut seen = std::collections::BTreeSet::new();
    for verb in verbs {
        if !seen.insert(verb.infinitive.as_str()) {
            return Err(SerializeError::DuplicateKey(verb.infinitive.clone()));
        }
    }

    let mut rows = Rows::default();
    for (id, verb) in ids.reserve(verbs.len()).zip(verbs) {
        rows.extend(verb_rows(id, verb)?);
    }
    rows.verbs.sort_by_key(|r| r.id);
    rows.conjugations.sort();
    rows.participles.sort();
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Persons;
    use crate::parser::process_page;
    use crate::source::RawPage;

    fn parse(verb: &str, fixture: &str) -> Vec<Verb> {
        let page = RawPage {
            infinitive: verb.to_string(),
            entry_id: None,
            html: std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap(),
        };
        process_page(&page).unwrap()
    }

    fn tense_rows<'a>(
        rows: &'a Rows,
        voice: Voice,
        mood: Mood,
        tense: Tense,
    ) -> Vec<&'a ConjugationRow> {
        rows.conjugations
            .iter()
            .filter(|r| r.voice == voice && r.mood == mood && r.tense == tense)
            .collect()
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let ids = VerbIds::new();
        let mut all: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..100).map(|_| ids.reserve(1).start).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(ids.reserve(3), 401..404);
    }

    #[test]
    fn agir_pronominal_present_is_one_row() {
        let verbs = parse("agir", "agir");
        let rows = verb_rows(1, &verbs[0]).unwrap();
        let present = tense_rows(&rows, Voice::Pronominal, Mood::Indicative, Tense::Present);
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].person, Person::ThirdSingularMasculine);
        assert_eq!(present[0].form, "s'agit");
    }

    #[test]
    fn divergent_feminine_gets_its_own_row() {
        let verbs = parse("aller", "aller");
        let rows = verb_rows(1, &verbs[0]).unwrap();
        let compose = tense_rows(&rows, Voice::ActiveEtre, Mood::Indicative, Tense::PasseCompose);
        assert_eq!(compose.len(), 8);
        assert!(compose
            .iter()
            .any(|r| r.person == Person::ThirdSingularFeminine && r.form == "est allée"));

        let present = tense_rows(&rows, Voice::ActiveEtre, Mood::Indicative, Tense::Present);
        assert_eq!(present.len(), 6);
        assert!(present.iter().any(|r| r.person == Person::FirstSingular && r.form == "vais"));
    }

    #[test]
    fn feuilleter_variants_joined() {
        let verbs = parse("feuilleter", "feuilleter");
        let rows = verb_rows(7, &verbs[0]).unwrap();
        let future = tense_rows(&rows, Voice::ActiveAvoir, Mood::Indicative, Tense::FuturSimple);
        let first = future
            .iter()
            .find(|r| r.person == Person::FirstSingular)
            .unwrap();
        assert_eq!(first.form, "feuilletterai;feuillèterai");
        assert_eq!(first.verb_id, 7);
    }

    #[test]
    fn row_count_bounded_by_tenses() {
        for (verb, fixture) in [("aller", "aller"), ("agir", "agir"), ("feuilleter", "feuilleter")] {
            let verbs = parse(verb, fixture);
            let rows = verb_rows(1, &verbs[0]).unwrap();
            let tenses: usize = verbs[0]
                .voices
                .values()
                .flat_map(|t| t.moods.values())
                .map(|m| m.len())
                .sum();
            assert!(rows.conjugations.len() <= 8 * tenses);
            assert!(!rows.conjugations.iter().any(|r| r.form.is_empty()));
        }
    }

    #[test]
    fn participle_form_names() {
        let verbs = parse("aller", "aller");
        let rows = verb_rows(1, &verbs[0]).unwrap();
        let names: Vec<&str> = rows.participles.iter().map(|r| r.form_name.as_str()).collect();
        assert!(names.contains(&"present"));
        assert!(names.contains(&"passe_sf"));
        assert!(names.contains(&"passe_compound_pf"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn delimiter_collision_is_fatal() {
        let mut verb = Verb::new("x");
        let mut persons = Persons::default();
        persons.set(Person::FirstSingular, Some(Cell::One("a;b".into())));
        verb.voices
            .entry(Voice::ActiveAvoir)
            .or_default()
            .moods
            .entry(Mood::Indicative)
            .or_default()
            .insert(Tense::Present, persons);
        assert!(matches!(
            verb_rows(1, &verb),
            Err(SerializeError::DelimiterCollision { delimiter: ';', .. })
        ));
    }

    #[test]
    fn batch_ids_follow_sorted_order() {
        let verbs = crate::variants::merge(parse("connaître", "connaitre")).unwrap();
        let ids = VerbIds::new();
        let rows = to_rows(&verbs, &ids).unwrap();
        let names: Vec<(i64, &str)> = rows
            .verbs
            .iter()
            .map(|r| (r.id, r.infinitive.as_str()))
            .collect();
        assert_eq!(names, vec![(1, "connaitre"), (2, "connaître")]);
        assert!(rows.verbs.iter().all(|r| r.rectification_1990));
        assert_eq!(rows.verbs[0].rectification_1990_variante.as_deref(), Some("connaître"));
    }
}
