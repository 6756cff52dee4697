use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;

static CONJ_ROOT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.conjugaison").unwrap());
static HEADER_H1: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.s_Entree_haut h1").unwrap());
static ANY_H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static REFORM_MARK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.s_rect").unwrap());
static H_ASPIRE_MARK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.s_h_aspire").unwrap());
static DIVS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static CELLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Voice container class as written in the page. `Active` still needs its
/// auxiliary guessed from the table content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceClass {
    ActiveAvoir,
    ActiveEtre,
    Active,
    Pronominal,
}

impl VoiceClass {
    fn from_class(class: &str) -> Option<Self> {
        match class {
            "voix_active_avoir" => Some(VoiceClass::ActiveAvoir),
            "voix_active_être" | "voix_active_etre" => Some(VoiceClass::ActiveEtre),
            "voix_active" => Some(VoiceClass::Active),
            "voix_prono" | "voix_pronominale" => Some(VoiceClass::Pronominal),
            _ => None,
        }
    }
}

/// One table row, cells already whitespace-normalized. Empty string = cell absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub label: String,
    pub reflexive: String,
    pub auxiliary: String,
    pub verb: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Voice(VoiceClass),
    Mood(String),
    Tense(String),
    Row(Row),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHeader {
    /// Spellings in the `h1`, first one is the headword.
    pub spellings: Vec<String>,
    /// `Some` when the page carries a 1990 reform marker; its text, possibly empty.
    pub reform_marker: Option<String>,
    pub h_aspire: bool,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub header: PageHeader,
    pub blocks: Vec<Block>,
}

/// Segment a conjugation page into its header and a flat, document-ordered
/// stream of voice/heading/row blocks.
pub fn classify_page(
    html: &str,
    verb: &str,
    entry_id: Option<&str>,
) -> Result<Page, ExtractionError> {
    let document = Html::parse_document(html);
    let root = find_root(&document, entry_id).ok_or_else(|| ExtractionError::MissingRoot {
        verb: verb.to_string(),
    })?;

    let header = parse_header(&document, root);

    let mut blocks = Vec::new();
    for div in root.select(&DIVS) {
        let Some(class) = div.value().classes().find_map(VoiceClass::from_class) else {
            continue;
        };
        blocks.push(Block::Voice(class));
        classify_voice(div, &mut blocks);
    }

    Ok(Page { header, blocks })
}

fn find_root<'a>(document: &'a Html, entry_id: Option<&str>) -> Option<ElementRef<'a>> {
    let by_id = entry_id.and_then(|id| Selector::parse(&format!("div[id=\"{}\"]", id)).ok());
    if let Some(by_id) = by_id {
        if let Some(root) = document.select(&by_id).next() {
            return Some(root);
        }
    }
    document.select(&CONJ_ROOT).next()
}

fn parse_header(document: &Html, root: ElementRef<'_>) -> PageHeader {
    let h1 = root
        .select(&HEADER_H1)
        .next()
        .or_else(|| document.select(&ANY_H1).next());

    let spellings = h1
        .map(|h| split_spellings(&cell_text(h)))
        .unwrap_or_default();
    let reform_marker = root
        .select(&REFORM_MARK)
        .next()
        .or_else(|| document.select(&REFORM_MARK).next())
        .map(cell_text);
    let h_aspire = root.select(&H_ASPIRE_MARK).next().is_some()
        || document.select(&H_ASPIRE_MARK).next().is_some();

    PageHeader {
        spellings,
        reform_marker,
        h_aspire,
    }
}

/// "connaître ou connaitre (se)" → ["connaître", "connaitre"]
fn split_spellings(h1: &str) -> Vec<String> {
    h1.split(" ou ")
        .flat_map(|part| part.split(','))
        .map(|s| {
            s.replace(" (s')", "")
                .replace(" (se)", "")
                .trim()
                .to_lowercase()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn classify_voice(voice: ElementRef<'_>, blocks: &mut Vec<Block>) {
    for node in voice.descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        match el.value().name() {
            "h3" => blocks.push(Block::Mood(cell_text(el))),
            "h4" => blocks.push(Block::Tense(cell_text(el))),
            "tr" => {
                if let Some(row) = classify_row(el) {
                    blocks.push(Block::Row(row));
                }
            }
            _ => {}
        }
    }
}

fn classify_row(tr: ElementRef<'_>) -> Option<Row> {
    let mut row = Row::default();
    let mut recognized = false;
    for td in tr.select(&CELLS) {
        let Some(class) = td
            .value()
            .classes()
            .find(|c| matches!(*c, "conj_pp" | "conj_refl" | "conj_auxil" | "conj_verb"))
        else {
            continue;
        };
        let slot = match class {
            "conj_pp" => &mut row.label,
            "conj_refl" => &mut row.reflexive,
            "conj_auxil" => &mut row.auxiliary,
            _ => &mut row.verb,
        };
        *slot = cell_text(td);
        recognized = true;
    }
    recognized.then_some(row)
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .replace('’', "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
