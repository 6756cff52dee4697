use std::collections::BTreeSet;

use crate::error::ModelInconsistencyError;
use crate::model::{Cell, Mood, Person, Persons, Tense};
use crate::parser::blocks::Row;
use crate::variants;

/// Read one tense block into its eight person slots.
///
/// Labeled rows are placed by pronoun; unlabeled rows by position (3 for the
/// imperative, 6 or 8 otherwise). A labeled table must cover the six base
/// persons unless only third persons are present (impersonal use).
pub fn read_tense(
    verb: &str,
    mood: Mood,
    tense: Tense,
    rows: &[Row],
) -> Result<Persons, ModelInconsistencyError> {
    let mut persons = Persons::default();
    if rows.is_empty() {
        return Ok(persons);
    }

    let labeled = rows.iter().filter(|r| !r.label.is_empty()).count();
    let placed: Vec<(Person, &Row)> = if labeled == 0 {
        positional(verb, mood, tense, rows)?
    } else {
        let mut placed = Vec::with_capacity(rows.len());
        for row in rows {
            let person = person_for_label(&row.label)
                .filter(|p| mood != Mood::Imperative || Person::IMPERATIVE.contains(p))
                .ok_or_else(|| ModelInconsistencyError::UnknownPerson {
                    verb: verb.to_string(),
                    mood,
                    tense,
                    label: row.label.clone(),
                })?;
            placed.push((person, row));
        }
        if mood != Mood::Imperative {
            check_coverage(verb, mood, tense, &placed)?;
        }
        placed
    };

    for (person, row) in placed {
        let Some(cell) = Cell::from_forms(compose(row)) else {
            continue;
        };
        let merged = match persons.take(person) {
            Some(existing) => existing.merged(cell),
            None => cell,
        };
        persons.set(person, Some(merged));
    }
    Ok(persons)
}

fn positional<'r>(
    verb: &str,
    mood: Mood,
    tense: Tense,
    rows: &'r [Row],
) -> Result<Vec<(Person, &'r Row)>, ModelInconsistencyError> {
    let order: &[Person] = match (mood, rows.len()) {
        (Mood::Imperative, 3) => &Person::IMPERATIVE[..],
        (Mood::Imperative, _) => &[],
        (_, 6) => &Person::BASE[..],
        (_, 8) => &Person::ALL[..],
        _ => &[],
    };
    if order.is_empty() {
        return Err(ModelInconsistencyError::RowCount {
            verb: verb.to_string(),
            mood,
            tense,
            rows: rows.len(),
        });
    }
    Ok(order.iter().copied().zip(rows).collect())
}

fn check_coverage(
    verb: &str,
    mood: Mood,
    tense: Tense,
    placed: &[(Person, &Row)],
) -> Result<(), ModelInconsistencyError> {
    let present: BTreeSet<Person> = placed.iter().map(|(p, _)| p.base()).collect();
    if present.iter().all(|p| p.is_third()) {
        return Ok(());
    }
    let missing: Vec<&str> = Person::BASE
        .iter()
        .filter(|p| !present.contains(p))
        .map(|p| p.as_str())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ModelInconsistencyError::IncompletePersons {
        verb: verb.to_string(),
        mood,
        tense,
        missing: missing.join(","),
    })
}

pub fn person_for_label(label: &str) -> Option<Person> {
    let label = label.trim().to_lowercase().replace('’', "'");
    let label = label
        .strip_prefix("que ")
        .or_else(|| label.strip_prefix("qu'"))
        .unwrap_or(&label)
        .trim();
    let person = match label {
        "je" | "j'" => Person::FirstSingular,
        "tu" => Person::SecondSingular,
        "il" | "on" | "il, elle" | "il/elle" | "il / elle" | "il, elle, on" => {
            Person::ThirdSingularMasculine
        }
        "elle" => Person::ThirdSingularFeminine,
        "nous" => Person::FirstPlural,
        "vous" => Person::SecondPlural,
        "ils" | "ils, elles" | "ils/elles" | "ils / elles" => Person::ThirdPluralMasculine,
        "elles" => Person::ThirdPluralFeminine,
        _ => return None,
    };
    Some(person)
}

/// Surface forms of a row: reflexive and auxiliary prefixed to each accepted
/// spelling of the verb cell.
pub fn compose(row: &Row) -> Vec<String> {
    variants::split_cell(&row.verb)
        .into_iter()
        .map(|form| join_tokens([row.reflexive.as_str(), row.auxiliary.as_str(), form.as_str()]))
        .collect()
}

/// Space-join, except a token ending in an apostrophe glues to the next.
pub fn join_tokens<'a>(tokens: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for token in tokens.into_iter().map(str::trim).filter(|t| !t.is_empty()) {
        if !out.is_empty() && !out.ends_with('\'') {
            out.push(' ');
        }
        out.push_str(&token.replace('’', "'"));
    }
    out
}
