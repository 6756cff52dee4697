use crate::model::{Cell, Person, Persons, Verb};

const GENDER_PAIRS: [(Person, Person); 2] = [
    (Person::ThirdSingularMasculine, Person::ThirdSingularFeminine),
    (Person::ThirdPluralMasculine, Person::ThirdPluralFeminine),
];

/// Decide the final masculine/feminine pair of one third person.
///
/// A missing feminine copies the masculine; a present one (equal or
/// divergent) is kept; a lone feminine is copied into the masculine.
pub fn resolve_agreement(masc: Option<Cell>, fem: Option<Cell>) -> (Option<Cell>, Option<Cell>) {
    match (masc, fem) {
        (Some(m), None) => (Some(m.clone()), Some(m)),
        (None, Some(f)) => (Some(f.clone()), Some(f)),
        (m, f) => (m, f),
    }
}

fn normalize_persons(persons: &mut Persons) {
    for (masc, fem) in GENDER_PAIRS {
        let (m, f) = resolve_agreement(persons.take(masc), persons.take(fem));
        persons.set(masc, m);
        persons.set(fem, f);
    }
}

/// Run the agreement pass over every tense of every voice.
pub fn normalize(verb: &mut Verb) {
    for table in verb.voices.values_mut() {
        for persons in table.moods.values_mut().flat_map(|tenses| tenses.values_mut()) {
            normalize_persons(persons);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mood, Tense, Voice, VoiceTable};

    fn one(s: &str) -> Option<Cell> {
        Some(Cell::One(s.to_string()))
    }

    #[test]
    fn feminine_copied_from_masculine() {
        assert_eq!(resolve_agreement(one("va"), None), (one("va"), one("va")));
    }

    #[test]
    fn divergent_feminine_kept() {
        assert_eq!(
            resolve_agreement(one("est allé"), one("est allée")),
            (one("est allé"), one("est allée"))
        );
    }

    #[test]
    fn equal_feminine_kept() {
        assert_eq!(resolve_agreement(one("a"), one("a")), (one("a"), one("a")));
    }

    #[test]
    fn lone_feminine_fills_masculine() {
        assert_eq!(resolve_agreement(None, one("vêlait")), (one("vêlait"), one("vêlait")));
        assert_eq!(resolve_agreement(None, None), (None, None));
    }

    #[test]
    fn normalize_touches_only_third_persons() {
        let mut persons = Persons::default();
        persons.set(Person::FirstSingular, one("vais"));
        persons.set(Person::ThirdSingularMasculine, one("va"));
        persons.set(Person::ThirdPluralMasculine, one("vont"));

        let mut verb = Verb::new("aller");
        let mut table = VoiceTable::default();
        table
            .moods
            .entry(Mood::Indicative)
            .or_default()
            .insert(Tense::Present, persons);
        verb.voices.insert(Voice::ActiveEtre, table);

        normalize(&mut verb);
        let p = verb.tense(Voice::ActiveEtre, Mood::Indicative, Tense::Present).unwrap();
        assert_eq!(p.get(Person::ThirdSingularFeminine).cloned(), one("va"));
        assert_eq!(p.get(Person::ThirdPluralFeminine).cloned(), one("vont"));
        assert_eq!(p.get(Person::SecondSingular), None);
        assert_eq!(p.conjugated(), 5);
    }
}
