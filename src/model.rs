//! Canonical in-memory representation of one verb's conjugations.
//!
//! Built fresh per verb by the extractor and consumed by the writers in
//! `output`. Nothing here is shared between verbs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Voice {
    #[serde(rename = "voix_active_avoir")]
    ActiveAvoir,
    #[serde(rename = "voix_active_etre")]
    ActiveEtre,
    #[serde(rename = "voix_prono")]
    Pronominal,
}

impl Voice {
    pub fn as_str(self) -> &'static str {
        match self {
            Voice::ActiveAvoir => "voix_active_avoir",
            Voice::ActiveEtre => "voix_active_etre",
            Voice::Pronominal => "voix_prono",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "participe")]
    Participle,
    #[serde(rename = "indicatif")]
    Indicative,
    #[serde(rename = "subjonctif")]
    Subjunctive,
    #[serde(rename = "conditionnel")]
    Conditional,
    #[serde(rename = "imperatif")]
    Imperative,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Participle => "participe",
            Mood::Indicative => "indicatif",
            Mood::Subjunctive => "subjonctif",
            Mood::Conditional => "conditionnel",
            Mood::Imperative => "imperatif",
        }
    }

    /// Tenses attested for this mood, in display order.
    pub fn tenses(self) -> &'static [Tense] {
        use Tense::*;
        match self {
            Mood::Participle => &[],
            Mood::Indicative => &[
                Present,
                Imparfait,
                PasseSimple,
                FuturSimple,
                PasseCompose,
                PlusQueParfait,
                PasseAnterieur,
                FuturAnterieur,
            ],
            Mood::Subjunctive => &[Present, Imparfait, Passe, PlusQueParfait],
            Mood::Conditional => &[Present, Passe],
            Mood::Imperative => &[Present, Passe],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tense {
    Present,
    Imparfait,
    PasseSimple,
    FuturSimple,
    PasseCompose,
    PlusQueParfait,
    PasseAnterieur,
    FuturAnterieur,
    Passe,
}

impl Tense {
    pub fn as_str(self) -> &'static str {
        match self {
            Tense::Present => "present",
            Tense::Imparfait => "imparfait",
            Tense::PasseSimple => "passe_simple",
            Tense::FuturSimple => "futur_simple",
            Tense::PasseCompose => "passe_compose",
            Tense::PlusQueParfait => "plus_que_parfait",
            Tense::PasseAnterieur => "passe_anterieur",
            Tense::FuturAnterieur => "futur_anterieur",
            Tense::Passe => "passe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Person {
    #[serde(rename = "1s")]
    FirstSingular,
    #[serde(rename = "2s")]
    SecondSingular,
    #[serde(rename = "3sm")]
    ThirdSingularMasculine,
    #[serde(rename = "3sf")]
    ThirdSingularFeminine,
    #[serde(rename = "1p")]
    FirstPlural,
    #[serde(rename = "2p")]
    SecondPlural,
    #[serde(rename = "3pm")]
    ThirdPluralMasculine,
    #[serde(rename = "3pf")]
    ThirdPluralFeminine,
}

impl Person {
    pub const ALL: [Person; 8] = [
        Person::FirstSingular,
        Person::SecondSingular,
        Person::ThirdSingularMasculine,
        Person::ThirdSingularFeminine,
        Person::FirstPlural,
        Person::SecondPlural,
        Person::ThirdPluralMasculine,
        Person::ThirdPluralFeminine,
    ];

    /// Positional order of a six-row table (masculine third persons).
    pub const BASE: [Person; 6] = [
        Person::FirstSingular,
        Person::SecondSingular,
        Person::ThirdSingularMasculine,
        Person::FirstPlural,
        Person::SecondPlural,
        Person::ThirdPluralMasculine,
    ];

    pub const IMPERATIVE: [Person; 3] = [
        Person::SecondSingular,
        Person::FirstPlural,
        Person::SecondPlural,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Person::FirstSingular => "1s",
            Person::SecondSingular => "2s",
            Person::ThirdSingularMasculine => "3sm",
            Person::ThirdSingularFeminine => "3sf",
            Person::FirstPlural => "1p",
            Person::SecondPlural => "2p",
            Person::ThirdPluralMasculine => "3pm",
            Person::ThirdPluralFeminine => "3pf",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn is_third(self) -> bool {
        matches!(
            self,
            Person::ThirdSingularMasculine
                | Person::ThirdSingularFeminine
                | Person::ThirdPluralMasculine
                | Person::ThirdPluralFeminine
        )
    }

    /// Collapses the gendered third persons onto their masculine slot.
    pub fn base(self) -> Person {
        match self {
            Person::ThirdSingularFeminine => Person::ThirdSingularMasculine,
            Person::ThirdPluralFeminine => Person::ThirdPluralMasculine,
            p => p,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Voice, Mood, Tense, Person);

/// One person slot's value: a single surface form or several accepted ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    One(String),
    Many(Vec<String>),
}

impl Cell {
    /// Builds a cell from forms in source order. Duplicates are dropped;
    /// `None` when nothing is left.
    pub fn from_forms<I>(forms: I) -> Option<Cell>
    where
        I: IntoIterator<Item = String>,
    {
        let mut out: Vec<String> = Vec::new();
        for form in forms {
            if !form.is_empty() && !out.contains(&form) {
                out.push(form);
            }
        }
        match out.len() {
            0 => None,
            1 => out.pop().map(Cell::One),
            _ => Some(Cell::Many(out)),
        }
    }

    pub fn forms(&self) -> &[String] {
        match self {
            Cell::One(form) => std::slice::from_ref(form),
            Cell::Many(forms) => forms,
        }
    }

    /// Appends the forms of `other`, keeping first-listed order.
    pub fn merged(self, other: Cell) -> Cell {
        let forms = self.forms().iter().chain(other.forms()).cloned().collect::<Vec<_>>();
        Cell::from_forms(forms).unwrap_or(self)
    }

    pub fn reversed(&self) -> Cell {
        match self {
            Cell::One(form) => Cell::One(form.clone()),
            Cell::Many(forms) => Cell::Many(forms.iter().rev().cloned().collect()),
        }
    }
}

/// The eight person slots of one tense. Always complete: an unconjugated
/// person is `None`, never a missing key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PersonsRepr", into = "PersonsRepr")]
pub struct Persons([Option<Cell>; 8]);

impl Persons {
    pub fn get(&self, person: Person) -> Option<&Cell> {
        self.0[person.index()].as_ref()
    }

    pub fn set(&mut self, person: Person, cell: Option<Cell>) {
        self.0[person.index()] = cell;
    }

    pub fn take(&mut self, person: Person) -> Option<Cell> {
        self.0[person.index()].take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Person, Option<&Cell>)> + '_ {
        Person::ALL.iter().map(move |p| (*p, self.get(*p)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    #[cfg(test)]
    pub fn conjugated(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    pub fn map_cells(&self, f: impl Fn(&Cell) -> Cell) -> Persons {
        let mut out = Persons::default();
        for (person, cell) in self.iter() {
            out.set(person, cell.map(&f));
        }
        out
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct PersonsRepr {
    #[serde(rename = "1s")]
    s1: Option<Cell>,
    #[serde(rename = "2s")]
    s2: Option<Cell>,
    #[serde(rename = "3sm")]
    s3m: Option<Cell>,
    #[serde(rename = "3sf")]
    s3f: Option<Cell>,
    #[serde(rename = "1p")]
    p1: Option<Cell>,
    #[serde(rename = "2p")]
    p2: Option<Cell>,
    #[serde(rename = "3pm")]
    p3m: Option<Cell>,
    #[serde(rename = "3pf")]
    p3f: Option<Cell>,
}

impl From<PersonsRepr> for Persons {
    fn from(r: PersonsRepr) -> Self {
        Persons([r.s1, r.s2, r.s3m, r.s3f, r.p1, r.p2, r.p3m, r.p3f])
    }
}

impl From<Persons> for PersonsRepr {
    fn from(p: Persons) -> Self {
        let [s1, s2, s3m, s3f, p1, p2, p3m, p3f] = p.0;
        PersonsRepr {
            s1,
            s2,
            s3m,
            s3f,
            p1,
            p2,
            p3m,
            p3f,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastParticiple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_sm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_sf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_pm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_pf: Option<String>,
}

impl PastParticiple {
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Attested forms keyed by their short name (`sm`, `compound_pf`, ...).
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("sm", &self.sm),
            ("sf", &self.sf),
            ("pm", &self.pm),
            ("pf", &self.pf),
            ("compound_sm", &self.compound_sm),
            ("compound_sf", &self.compound_sf),
            ("compound_pm", &self.compound_pm),
            ("compound_pf", &self.compound_pf),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<String>,
    #[serde(rename = "passe", default, skip_serializing_if = "PastParticiple::is_empty")]
    pub past: PastParticiple,
}

impl Participle {
    pub fn is_empty(&self) -> bool {
        self.present.is_none() && self.past.is_empty()
    }
}

pub type TenseTable = BTreeMap<Tense, Persons>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceTable {
    pub participle: Option<Participle>,
    pub moods: BTreeMap<Mood, TenseTable>,
}

impl VoiceTable {
    /// Moods with at least one conjugated person in at least one tense.
    pub fn attested_moods(&self) -> impl Iterator<Item = (Mood, &TenseTable)> + '_ {
        self.moods
            .iter()
            .filter(|(_, tenses)| tenses.values().any(|p| !p.is_empty()))
            .map(|(mood, tenses)| (*mood, tenses))
    }

    pub fn is_empty(&self) -> bool {
        self.participle.as_ref().map_or(true, Participle::is_empty)
            && self.attested_moods().next().is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    /// Extracted from the verb's own page.
    #[default]
    Page,
    /// Reform sibling built from another spelling's page.
    Sibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verb {
    pub infinitive: String,
    pub h_aspire: bool,
    pub variant_infinitive: Option<String>,
    pub voices: BTreeMap<Voice, VoiceTable>,
    pub origin: Origin,
}

impl Verb {
    pub fn new(infinitive: impl Into<String>) -> Self {
        Self {
            infinitive: infinitive.into(),
            h_aspire: false,
            variant_infinitive: None,
            voices: BTreeMap::new(),
            origin: Origin::Page,
        }
    }

    pub fn has_variant(&self) -> bool {
        self.variant_infinitive.is_some()
    }

    #[cfg(test)]
    pub fn tense(&self, voice: Voice, mood: Mood, tense: Tense) -> Option<&Persons> {
        self.voices.get(&voice)?.moods.get(&mood)?.get(&tense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_from_forms_dedups_and_collapses() {
        assert_eq!(Cell::from_forms(Vec::<String>::new()), None);
        assert_eq!(
            Cell::from_forms(vec!["va".into(), "va".into()]),
            Some(Cell::One("va".into()))
        );
        assert_eq!(
            Cell::from_forms(vec!["paie".into(), "paye".into()]),
            Some(Cell::Many(vec!["paie".into(), "paye".into()]))
        );
    }

    #[test]
    fn persons_serialize_all_eight_keys() {
        let mut p = Persons::default();
        p.set(Person::ThirdSingularMasculine, Some(Cell::One("s'agit".into())));
        let json = serde_json::to_value(&p).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 8);
        assert_eq!(obj["3sm"], "s'agit");
        assert!(obj["1s"].is_null());
    }

    #[test]
    fn persons_roundtrip_with_variant_list() {
        let mut p = Persons::default();
        p.set(
            Person::FirstSingular,
            Some(Cell::Many(vec!["feuilletterai".into(), "feuillèterai".into()])),
        );
        let json = serde_json::to_string(&p).unwrap();
        let back: Persons = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn mood_tense_counts() {
        assert_eq!(Mood::Indicative.tenses().len(), 8);
        assert_eq!(Mood::Subjunctive.tenses().len(), 4);
        assert_eq!(Mood::Conditional.tenses().len(), 2);
        assert_eq!(Mood::Imperative.tenses().len(), 2);
    }

    #[test]
    fn empty_moods_are_not_attested() {
        let mut table = VoiceTable::default();
        table
            .moods
            .entry(Mood::Subjunctive)
            .or_default()
            .insert(Tense::Present, Persons::default());
        assert_eq!(table.attested_moods().count(), 0);
        assert!(table.is_empty());
    }
}
