//! Flattened tab-separated shape kept for older consumers: one line per
//! (infinitive, voice, mood, tense), six persons in one field.

use crate::error::SerializeError;
use crate::model::{Person, Persons, Verb};

pub const PERSON_DELIMITER: char = '/';
pub const FORM_DELIMITER: char = ';';

fn flatten_persons(verb: &str, persons: &Persons) -> Result<String, SerializeError> {
    let mut fields = Vec::with_capacity(Person::BASE.len());
    for person in Person::BASE {
        let Some(cell) = persons.get(person) else {
            fields.push(String::new());
            continue;
        };
        for form in cell.forms() {
            if let Some(delimiter) = [FORM_DELIMITER, PERSON_DELIMITER]
                .into_iter()
                .find(|d| form.contains(*d))
            {
                return Err(SerializeError::DelimiterCollision {
                    verb: verb.to_string(),
                    form: form.clone(),
                    delimiter,
                });
            }
        }
        fields.push(cell.forms().join(&FORM_DELIMITER.to_string()));
    }
    Ok(fields.join(&PERSON_DELIMITER.to_string()))
}

pub fn render(verbs: &[Verb]) -> Result<String, SerializeError> {
    let mut out = String::new();
    for verb in verbs {
        for (voice, table) in &verb.voices {
            for (mood, tenses) in table.attested_moods() {
                for (tense, persons) in tenses {
                    let flat = flatten_persons(&verb.infinitive, persons)?;
                    out.push_str(&format!(
                        "{}\t{}\t{}\t{}\t{}\n",
                        verb.infinitive, voice, mood, tense, flat
                    ));
                }
            }
        }
    }
    Ok(out)
}
