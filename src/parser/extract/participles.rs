use tracing::debug;

use super::persons::join_tokens;
use crate::model::Participle;
use crate::parser::blocks::Row;
use crate::parser::sections::ParticipleForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PastSlot {
    Sm,
    Sf,
    Pm,
    Pf,
    Compound,
}

fn past_slot(label: &str) -> Option<PastSlot> {
    let label = label.trim().to_lowercase();
    let slot = match label.as_str() {
        "masculin singulier" | "singulier masculin" => PastSlot::Sm,
        "féminin singulier" | "singulier féminin" | "feminin singulier" => PastSlot::Sf,
        "masculin pluriel" | "pluriel masculin" => PastSlot::Pm,
        "féminin pluriel" | "pluriel féminin" | "feminin pluriel" => PastSlot::Pf,
        "composé" | "compose" | "passé composé" | "forme composée" => PastSlot::Compound,
        _ => return None,
    };
    Some(slot)
}

/// Participle cells keep their text whole: commas in a compound list
/// gender/number forms, not spelling variants.
fn row_text(row: &Row) -> Option<String> {
    let verb = row.verb.trim();
    if verb.is_empty() || verb == "—" || verb == "-" {
        return None;
    }
    Some(join_tokens([row.reflexive.as_str(), row.auxiliary.as_str(), verb]))
}

/// Fill `into` from the rows of one participle block.
pub fn read(verb: &str, form: ParticipleForm, rows: &[Row], into: &mut Participle) {
    match form {
        ParticipleForm::Present => {
            if into.present.is_none() {
                into.present = rows.iter().find_map(row_text);
            }
        }
        ParticipleForm::Past => {
            let mut compound = None;
            for row in rows {
                let slot = if row.label.is_empty() && !row.auxiliary.is_empty() {
                    Some(PastSlot::Compound)
                } else {
                    past_slot(&row.label)
                };
                let Some(slot) = slot else {
                    debug!(verb, label = %row.label, "unrecognized participle row ignored");
                    continue;
                };
                let target = match slot {
                    PastSlot::Sm => &mut into.past.sm,
                    PastSlot::Sf => &mut into.past.sf,
                    PastSlot::Pm => &mut into.past.pm,
                    PastSlot::Pf => &mut into.past.pf,
                    PastSlot::Compound => &mut compound,
                };
                if target.is_none() {
                    *target = row_text(row);
                }
            }
            if let Some(compound) = compound {
                expand_compound(&compound, into);
            }
        }
    }
}

/// "étant allé, allée, allés, allées" → four compound forms sharing the
/// auxiliary. Without four parts the whole text is used for each. When no
/// simple form was given the participle is invariable: the compound's last word.
fn expand_compound(text: &str, into: &mut Participle) {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let compounds: [String; 4] = if parts.len() >= 4 {
        let first: Vec<&str> = parts[0].split_whitespace().collect();
        let aux = first[..first.len().saturating_sub(1)].join(" ");
        [
            parts[0].to_string(),
            join_tokens([aux.as_str(), parts[1]]),
            join_tokens([aux.as_str(), parts[2]]),
            join_tokens([aux.as_str(), parts[3]]),
        ]
    } else {
        std::array::from_fn(|_| text.to_string())
    };

    let past = &mut into.past;
    if past.sm.is_none() && past.sf.is_none() && past.pm.is_none() && past.pf.is_none() {
        let invariable = compounds[0]
            .split_whitespace()
            .last()
            .map(str::to_string);
        past.sm = invariable.clone();
        past.sf = invariable.clone();
        past.pm = invariable.clone();
        past.pf = invariable;
    }
    let [sm, sf, pm, pf] = compounds;
    past.compound_sm = Some(sm);
    past.compound_sf = Some(sf);
    past.compound_pm = Some(pm);
    past.compound_pf = Some(pf);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, aux: &str, verb: &str) -> Row {
        Row {
            label: label.into(),
            reflexive: String::new(),
            auxiliary: aux.into(),
            verb: verb.into(),
        }
    }

    #[test]
    fn present_participle() {
        let mut p = Participle::default();
        read("aller", ParticipleForm::Present, &[row("", "", "allant")], &mut p);
        assert_eq!(p.present.as_deref(), Some("allant"));
    }

    #[test]
    fn variable_past_with_gendered_compound() {
        let rows = vec![
            row("masculin singulier", "", "allé"),
            row("féminin singulier", "", "allée"),
            row("masculin pluriel", "", "allés"),
            row("féminin pluriel", "", "allées"),
            row("composé", "étant", "allé, allée, allés, allées"),
        ];
        let mut p = Participle::default();
        read("aller", ParticipleForm::Past, &rows, &mut p);
        assert_eq!(p.past.sf.as_deref(), Some("allée"));
        assert_eq!(p.past.compound_sm.as_deref(), Some("étant allé"));
        assert_eq!(p.past.compound_sf.as_deref(), Some("étant allée"));
        assert_eq!(p.past.compound_pf.as_deref(), Some("étant allées"));
    }

    #[test]
    fn invariable_past_from_compound() {
        let rows = vec![row("composé", "ayant", "agi")];
        let mut p = Participle::default();
        read("agir", ParticipleForm::Past, &rows, &mut p);
        assert_eq!(p.past.sm.as_deref(), Some("agi"));
        assert_eq!(p.past.pf.as_deref(), Some("agi"));
        assert_eq!(p.past.compound_sm.as_deref(), Some("ayant agi"));
        assert_eq!(p.past.compound_pf.as_deref(), Some("ayant agi"));
    }

    #[test]
    fn reflexive_compound_keeps_elision() {
        let rows = vec![Row {
            label: "composé".into(),
            reflexive: "s'".into(),
            auxiliary: "étant".into(),
            verb: "agi".into(),
        }];
        let mut p = Participle::default();
        read("agir", ParticipleForm::Past, &rows, &mut p);
        assert_eq!(p.past.compound_sm.as_deref(), Some("s'étant agi"));
    }

    #[test]
    fn unknown_rows_and_empty_cells_skipped() {
        let rows = vec![row("gérondif", "", "en allant"), row("masculin singulier", "", "—")];
        let mut p = Participle::default();
        read("aller", ParticipleForm::Past, &rows, &mut p);
        assert!(p.is_empty());
    }
}
