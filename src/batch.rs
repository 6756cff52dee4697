use std::fs;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::db;
use crate::error::VerbError;
use crate::model::Verb;
use crate::output::{self, legacy, VerbIds};
use crate::parser;
use crate::settings::Settings;
use crate::source::PageSource;
use crate::variants;

const CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub gen_sqlite3: bool,
    pub legacy: bool,
    pub limit: Option<usize>,
}

/// Everything the workers produced. Each verb is in exactly one of the two lists.
#[derive(Debug, Default)]
pub struct Parsed {
    pub records: Vec<Verb>,
    pub failures: Vec<VerbError>,
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub verb: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub requested: usize,
    pub verbs: usize,
    pub variant_records: usize,
    pub conjugation_rows: usize,
    pub participle_rows: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn print(&self) {
        println!(
            "Wrote {} verbs ({} reform records), {} conjugation rows, {} participle rows.",
            self.verbs, self.variant_records, self.conjugation_rows, self.participle_rows
        );
        if !self.failures.is_empty() {
            println!("{} verbs failed:", self.failures.len());
            for f in &self.failures {
                println!("  {}: {}", f.verb, f.kind);
            }
        }
    }
}

fn parse_one(source: &impl PageSource, verb: &str) -> Result<Vec<Verb>, VerbError> {
    let page = source
        .fetch_raw_page(verb)
        .map_err(|e| VerbError::new(verb, e))?;
    parser::process_page(&page)
}

/// Parse every verb on a pool of `threads` workers. A verb contributes all of
/// its records or none.
pub fn parse_all(source: &(impl PageSource + Sync), verbs: &[String], threads: usize) -> Result<Parsed> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let pb = ProgressBar::new(verbs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut parsed = Parsed::default();
    for chunk in verbs.chunks(CHUNK_SIZE) {
        let results: Vec<_> =
            pool.install(|| chunk.par_iter().map(|v| parse_one(source, v)).collect());
        for result in results {
            match result {
                Ok(records) => parsed.records.extend(records),
                Err(e) => {
                    warn!(verb = %e.verb, kind = e.kind.label(), "{}", e.kind);
                    parsed.failures.push(e);
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(parsed)
}

/// Merge the batch and write every requested artifact. Invariant violations
/// found here abort the run.
pub fn write_outputs(
    settings: &Settings,
    requested: usize,
    parsed: Parsed,
    options: &BatchOptions,
    ids: &VerbIds,
) -> Result<Report> {
    let verbs = variants::merge(parsed.records)?;
    fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("creating {}", settings.output_dir.display()))?;

    let doc = output::to_document(&verbs)?;
    fs::write(settings.verbs_json(), output::to_pretty(&doc)?)?;
    fs::write(settings.verbs_min_json(), output::to_compact(&doc)?)?;
    info!("Wrote {} and {}", settings.verbs_json().display(), settings.verbs_min_json().display());

    let rows = output::to_rows(&verbs, ids)?;
    if options.gen_sqlite3 {
        let conn = db::create_fresh(&settings.database)?;
        db::save_rows(&conn, &rows)?;
        info!("Wrote {}", settings.database.display());
    }
    if options.legacy {
        fs::write(settings.legacy_tsv(), legacy::render(&verbs)?)?;
        info!("Wrote {}", settings.legacy_tsv().display());
    }

    let mut failures: Vec<Failure> = parsed
        .failures
        .iter()
        .map(|e| Failure {
            verb: e.verb.clone(),
            kind: e.kind.label(),
            message: e.kind.to_string(),
        })
        .collect();
    failures.sort_by(|a, b| a.verb.cmp(&b.verb));

    let report = Report {
        generated_at: Utc::now(),
        requested,
        verbs: verbs.len(),
        variant_records: verbs.iter().filter(|v| v.has_variant()).count(),
        conjugation_rows: rows.conjugations.len(),
        participle_rows: rows.participles.len(),
        failures,
    };
    fs::write(settings.report(), serde_json::to_string_pretty(&report)?)?;
    Ok(report)
}

/// Parse the cached pages of the listed verbs and write the outputs.
pub fn process(settings: &Settings, source: &(impl PageSource + Sync), options: &BatchOptions) -> Result<Report> {
    let mut verbs = crate::infinitives::fetch_infinitive_list(&settings.infinitives_file)?;
    if let Some(limit) = options.limit {
        verbs.truncate(limit);
    }
    info!("Processing {} verbs on {} threads", verbs.len(), settings.max_threads);
    let parsed = parse_all(source, &verbs, settings.max_threads)?;
    write_outputs(settings, verbs.len(), parsed, options, &VerbIds::new())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{CacheSource, CachedEntry};
    use std::path::Path;

    fn seeded_cache(dir: &Path) -> CacheSource {
        let cache = CacheSource::new(dir.join("cache"));
        for (verb, fixture) in [
            ("aller", "aller"),
            ("agir", "agir"),
            ("feuilleter", "feuilleter"),
            ("connaître", "connaitre"),
        ] {
            let html = fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap();
            cache.write_page(verb, &html).unwrap();
        }
        cache.write_entry("zzz", &CachedEntry::NotFound).unwrap();
        cache
    }

    fn add_unreadable_page(cache: &CacheSource) {
        let html = "<html><body><div class=\"conjugaison\">\
                    <div class=\"voix_active_avoir\"><h3>Gérondif</h3></div>\
                    </div></body></html>";
        cache.write_page("zébrer", html).unwrap();
    }

    fn settings(dir: &Path) -> Settings {
        let mut s = Settings::load_from(&dir.join("none.toml"), &Default::default()).unwrap();
        s.output_dir = dir.join("out");
        s.database = dir.join("out/verbs.db");
        s.infinitives_file = dir.join("infinitives.txt");
        s.max_threads = 2;
        s
    }

    #[test]
    fn end_to_end_with_failures() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        add_unreadable_page(&cache);
        let s = settings(dir.path());
        fs::write(
            &s.infinitives_file,
            "aller\nagir\nzébrer\nfeuilleter\nconnaître\nzzz\nmanquant\n",
        )
        .unwrap();

        let options = BatchOptions {
            gen_sqlite3: true,
            legacy: true,
            limit: None,
        };
        let report = process(&s, &cache, &options).unwrap();
        assert_eq!(report.requested, 7);
        assert_eq!(report.verbs, 5);
        assert_eq!(report.variant_records, 2);
        let failed: Vec<_> = report.failures.iter().map(|f| (f.verb.as_str(), f.kind)).collect();
        assert_eq!(
            failed,
            vec![
                ("manquant", "FetchError"),
                ("zzz", "FetchError"),
                ("zébrer", "ExtractionError"),
            ]
        );
        let heading = &report.failures[2].message;
        assert!(heading.contains("Gérondif"), "{}", heading);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(s.report()).unwrap()).unwrap();
        assert_eq!(written["failures"][2]["verb"], "zébrer");
        assert_eq!(written["failures"][2]["kind"], "ExtractionError");

        let doc = output::document::parse(&fs::read_to_string(s.verbs_json()).unwrap()).unwrap();
        let keys: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["agir", "aller", "connaitre", "connaître", "feuilleter"]);
        assert!(s.verbs_min_json().exists());
        assert!(s.legacy_tsv().exists());
        assert!(s.report().exists());

        let conn = db::connect(&s.database).unwrap();
        assert_eq!(db::get_stats(&conn).unwrap().variant_pairs, 1);
    }

    #[test]
    fn outputs_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        let s = settings(dir.path());
        fs::write(&s.infinitives_file, "feuilleter\nconnaître\naller\nagir\n").unwrap();

        process(&s, &cache, &BatchOptions::default()).unwrap();
        let first = fs::read_to_string(s.verbs_min_json()).unwrap();

        fs::write(&s.infinitives_file, "agir\naller\nconnaître\nfeuilleter\n").unwrap();
        process(&s, &cache, &BatchOptions::default()).unwrap();
        assert_eq!(fs::read_to_string(s.verbs_min_json()).unwrap(), first);
    }

    #[test]
    fn limit_truncates_list() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        let s = settings(dir.path());
        fs::write(&s.infinitives_file, "aller\nagir\nfeuilleter\n").unwrap();
        let options = BatchOptions {
            limit: Some(1),
            ..BatchOptions::default()
        };
        let report = process(&s, &cache, &options).unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.verbs, 1);
        assert!(!s.database.exists());
    }
}
