pub mod blocks;
pub mod extract;
pub mod headings;
pub mod sections;

use crate::error::VerbError;
use crate::model::Verb;
use crate::source::RawPage;
use crate::variants;

/// Four-pass pipeline: markup → blocks → sections → canonical record(s).
///
/// All-or-nothing per verb: either every record the page yields (the verb,
/// plus its reform partner) or the error that stopped it.
pub fn process_page(page: &RawPage) -> Result<Vec<Verb>, VerbError> {
    let verb = page.infinitive.as_str();
    let classified = blocks::classify_page(&page.html, verb, page.entry_id.as_deref())
        .map_err(|e| VerbError::new(verb, e))?;
    let sections = sections::cluster_sections(verb, &classified.blocks)
        .map_err(|e| VerbError::new(verb, e))?;
    let record = extract::build_verb(verb, &classified.header, &sections)
        .map_err(|e| VerbError::new(verb, e))?;
    let decision = variants::resolve_infinitive(verb, &classified.header);
    Ok(variants::apply(record, decision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerbErrorKind;

    fn page(verb: &str, fixture: &str) -> RawPage {
        RawPage {
            infinitive: verb.to_string(),
            entry_id: None,
            html: std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap(),
        }
    }

    #[test]
    fn connaitre_yields_linked_pair() {
        let verbs = process_page(&page("connaître", "connaitre")).unwrap();
        let names: Vec<_> = verbs.iter().map(|v| v.infinitive.as_str()).collect();
        assert_eq!(names, vec!["connaître", "connaitre"]);
        assert_eq!(verbs[0].variant_infinitive.as_deref(), Some("connaitre"));
        assert_eq!(verbs[1].variant_infinitive.as_deref(), Some("connaître"));
    }

    #[test]
    fn plain_verb_single_record() {
        let verbs = process_page(&page("aller", "aller")).unwrap();
        assert_eq!(verbs.len(), 1);
        assert!(!verbs[0].has_variant());
    }

    #[test]
    fn homograph_number_in_headword_stays_single() {
        let mut raw = page("aller", "aller");
        raw.html = raw.html.replace("<h1>aller</h1>", "<h1>aller<sup>1</sup></h1>");
        assert!(raw.html.contains("<sup>1</sup>"));
        let verbs = process_page(&raw).unwrap();
        assert_eq!(verbs.len(), 1);
        assert_eq!(verbs[0].infinitive, "aller");
        assert!(!verbs[0].has_variant());
    }

    #[test]
    fn broken_page_reported_per_verb() {
        let raw = RawPage {
            infinitive: "aller".into(),
            entry_id: None,
            html: "<html><body>Erreur</body></html>".into(),
        };
        let err = process_page(&raw).unwrap_err();
        assert_eq!(err.verb, "aller");
        assert!(matches!(err.kind, VerbErrorKind::Extraction(_)));
        assert_eq!(err.kind.label(), "ExtractionError");
    }
}
