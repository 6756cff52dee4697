use std::path::Path;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::model::Cell;
use crate::output::relational::{Rows, VerbRow};
use crate::parser::extract::agreement::resolve_agreement;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Open a new database at `path`, removing whatever a previous run left there.
pub fn create_fresh(path: &Path) -> Result<Connection> {
    for suffix in ["", "-wal", "-shm"] {
        let mut stale = path.as_os_str().to_owned();
        stale.push(suffix);
        let stale = Path::new(&stale);
        if stale.exists() {
            std::fs::remove_file(stale)?;
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = connect(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS verbs (
            id                          INTEGER PRIMARY KEY,
            infinitive                  TEXT UNIQUE NOT NULL,
            h_aspire                    BOOLEAN NOT NULL DEFAULT 0,
            rectification_1990          BOOLEAN NOT NULL DEFAULT 0,
            rectification_1990_variante TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_verbs_infinitive ON verbs(infinitive);
        CREATE INDEX IF NOT EXISTS idx_verbs_variante ON verbs(rectification_1990_variante);

        CREATE TABLE IF NOT EXISTS conjugations (
            id          INTEGER PRIMARY KEY,
            verbe_id    INTEGER NOT NULL REFERENCES verbs(id),
            voix        TEXT NOT NULL,
            mode        TEXT NOT NULL,
            temps       TEXT NOT NULL,
            personne    TEXT NOT NULL,
            conjugaison TEXT NOT NULL,
            UNIQUE(verbe_id, voix, mode, temps, personne)
        );
        CREATE INDEX IF NOT EXISTS idx_conjugations_form ON conjugations(conjugaison);

        CREATE TABLE IF NOT EXISTS participes (
            id          INTEGER PRIMARY KEY,
            verbe_id    INTEGER NOT NULL REFERENCES verbs(id),
            voix        TEXT NOT NULL,
            forme       TEXT NOT NULL,
            participe   TEXT NOT NULL,
            UNIQUE(verbe_id, voix, forme)
        );
        ",
    )?;
    Ok(())
}

// ── Writing ──

pub fn save_rows(conn: &Connection, rows: &Rows) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut v_stmt = tx.prepare(
            "INSERT INTO verbs
             (id, infinitive, h_aspire, rectification_1990, rectification_1990_variante)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for v in &rows.verbs {
            v_stmt.execute(rusqlite::params![
                v.id, v.infinitive, v.h_aspire, v.rectification_1990, v.rectification_1990_variante,
            ])?;
        }

        let mut c_stmt = tx.prepare(
            "INSERT INTO conjugations (verbe_id, voix, mode, temps, personne, conjugaison)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for c in &rows.conjugations {
            c_stmt.execute(rusqlite::params![
                c.verb_id,
                c.voice.as_str(),
                c.mood.as_str(),
                c.tense.as_str(),
                c.person.as_str(),
                c.form,
            ])?;
        }

        let mut p_stmt = tx.prepare(
            "INSERT INTO participes (verbe_id, voix, forme, participe) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in &rows.participles {
            p_stmt.execute(rusqlite::params![p.verb_id, p.voice.as_str(), p.form_name, p.participle])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Lookup ──

pub fn fetch_verb(conn: &Connection, infinitive: &str) -> Result<Option<VerbRow>> {
    let row = conn
        .query_row(
            "SELECT id, infinitive, h_aspire, rectification_1990, rectification_1990_variante
             FROM verbs WHERE infinitive = ?1",
            [infinitive],
            |row| {
                Ok(VerbRow {
                    id: row.get(0)?,
                    infinitive: row.get(1)?,
                    h_aspire: row.get(2)?,
                    rectification_1990: row.get(3)?,
                    rectification_1990_variante: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// One tense of one voice as read back for display.
pub struct TenseLine {
    pub voice: String,
    pub mood: String,
    pub tense: String,
    pub persons: Vec<(String, String)>,
}

/// Conjugations of a verb grouped by tense, in canonical person order, with
/// feminine forms implied by the masculine filled back in.
pub fn fetch_tense_rows(conn: &Connection, verb_id: i64) -> Result<Vec<TenseLine>> {
    let mut stmt = conn.prepare(
        "SELECT voix, mode, temps, personne, conjugaison
         FROM conjugations WHERE verbe_id = ?1
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([verb_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut lines: Vec<TenseLine> = Vec::new();
    for (voice, mood, tense, person, form) in rows {
        let same = lines
            .last()
            .is_some_and(|l| l.voice == voice && l.mood == mood && l.tense == tense);
        if !same {
            lines.push(TenseLine {
                voice,
                mood,
                tense,
                persons: Vec::new(),
            });
        }
        if let Some(line) = lines.last_mut() {
            line.persons.push((person, form));
        }
    }
    for line in &mut lines {
        restore_feminine(&mut line.persons);
    }
    Ok(lines)
}

fn restore_feminine(persons: &mut Vec<(String, String)>) {
    for (masc, fem) in [("3sm", "3sf"), ("3pm", "3pf")] {
        if persons.iter().any(|(p, _)| p == fem) {
            continue;
        }
        let (_, resolved) = resolve_agreement(cell_of(persons, masc), None);
        let Some(Cell::One(form)) = resolved else {
            continue;
        };
        let at = persons
            .iter()
            .position(|(p, _)| p == masc)
            .map_or(persons.len(), |i| i + 1);
        persons.insert(at, (fem.to_string(), form));
    }
}

fn cell_of(persons: &[(String, String)], person: &str) -> Option<Cell> {
    persons
        .iter()
        .find(|(p, _)| p == person)
        .map(|(_, form)| Cell::One(form.clone()))
}

// ── Stats ──

pub struct Stats {
    pub verbs: usize,
    pub conjugations: usize,
    pub participles: usize,
    pub variant_pairs: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    };
    Ok(Stats {
        verbs: count("SELECT COUNT(*) FROM verbs")?,
        conjugations: count("SELECT COUNT(*) FROM conjugations")?,
        participles: count("SELECT COUNT(*) FROM participes")?,
        variant_pairs: count(
            "SELECT COUNT(*) FROM verbs a JOIN verbs b
               ON a.rectification_1990_variante = b.infinitive
              AND b.rectification_1990_variante = a.infinitive
             WHERE a.infinitive < b.infinitive",
        )?,
    })
}

// ── Tests ──
