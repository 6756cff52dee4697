use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE, SET_COOKIE};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::settings::Settings;
use crate::source::{CacheSource, CachedEntry};

const BASE_BACKOFF_MS: u64 = 1000;
const MISC_COOKIES: &str =
    "acceptCookies=1; accessibilitySettings=wordNavigationLink=false&openDyslexic=false";

static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"JSESSIONID=([^;]+)").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub nature: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchResult>,
}

pub fn session_from_cookie(set_cookie: &str) -> Option<String> {
    SESSION_COOKIE
        .captures(set_cookie)
        .map(|c| c[1].to_string())
}

/// The verb entry whose label is exactly `verb` (pronominal suffix ignored).
pub fn select_entry(verb: &str, results: &[SearchResult]) -> Option<CachedEntry> {
    results
        .iter()
        .filter(|r| r.nature.contains("v."))
        .find(|r| r.label.replace(" (s')", "").replace(" (se)", "") == verb)
        .and_then(|r| {
            let entry_id = r.url.rsplit('/').next().filter(|id| !id.is_empty())?;
            Some(CachedEntry::Found {
                entry_id: entry_id.to_string(),
                nature: r.nature.clone(),
            })
        })
}

pub struct DictionaryClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<String>,
    max_retry: u32,
    delay: Duration,
}

impl DictionaryClient {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"));
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            session: settings.jsession_id.clone(),
            max_retry: settings.max_retry.max(1),
            delay: Duration::from_millis(settings.requests_delay),
        })
    }

    /// Take a session id from the root page unless one was configured.
    pub async fn ensure_session(&mut self) -> Result<(), FetchError> {
        if self.session.is_some() {
            return Ok(());
        }
        let url = format!("{}/", self.base_url);
        info!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        self.session = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_from_cookie);
        if self.session.is_none() {
            warn!("JSESSIONID not found in response; continuing without a session");
        }
        Ok(())
    }

    fn cookies(&self) -> String {
        match &self.session {
            Some(id) => format!("JSESSIONID={}; {}", id, MISC_COOKIES),
            None => MISC_COOKIES.to_string(),
        }
    }

    pub async fn search_entry(&self, verb: &str) -> Result<CachedEntry, FetchError> {
        let url = format!("{}/search", self.base_url);
        let cookies = self.cookies();
        let (http, url, cookies) = (&self.http, url.as_str(), cookies.as_str());
        let result = self
            .with_retry(verb, move || post_search(http, url, cookies, verb))
            .await;
        settle_search(verb, result)
    }

    pub async fn download_page(&self, verb: &str, entry_id: &str) -> Result<String, FetchError> {
        let url = format!("{}/conjuguer/{}", self.base_url, entry_id);
        let cookies = format!("{}; lastEntry={}", self.cookies(), entry_id);
        let (http, url, cookies) = (&self.http, url.as_str(), cookies.as_str());
        self.with_retry(verb, move || get_text(http, url, cookies))
            .await
    }

    /// Run `op` up to `max_retry` times, sleeping the request delay before each
    /// attempt and backing off exponentially after retryable failures.
    async fn with_retry<T, F, Fut>(&self, verb: &str, op: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut last = None;
        for attempt in 0..self.max_retry {
            tokio::time::sleep(self.delay).await;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    let backoff = backoff(attempt);
                    warn!(
                        "Request for {} failed (attempt {}/{}): {}; backing off {:.1}s",
                        verb,
                        attempt + 1,
                        self.max_retry,
                        e,
                        backoff.as_secs_f64()
                    );
                    if attempt + 1 < self.max_retry {
                        tokio::time::sleep(backoff).await;
                    }
                    last = Some(Box::new(e));
                }
            }
        }
        Err(FetchError::Exhausted {
            verb: verb.to_string(),
            attempts: self.max_retry,
            last,
        })
    }
}

async fn post_search(
    http: &reqwest::Client,
    url: &str,
    cookies: &str,
    verb: &str,
) -> Result<CachedEntry, FetchError> {
    let response = http
        .post(url)
        .header(COOKIE, cookies)
        .form(&[("term", verb), ("options", "1")])
        .send()
        .await?;
    let body = checked_text(url, response).await?;
    decode_search(verb, &body)
}

/// Entry for `verb` in a search response body. A body that is not the
/// expected JSON (an HTML challenge page, a truncated reply) is a `Decode`
/// error and is retried.
pub fn decode_search(verb: &str, body: &str) -> Result<CachedEntry, FetchError> {
    let parsed: SearchResponse = serde_json::from_str(body).map_err(|e| {
        debug!(verb, error = %e, "unreadable search response");
        FetchError::Decode {
            verb: verb.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(select_entry(verb, &parsed.result).unwrap_or(CachedEntry::NotFound))
}

/// A search whose every attempt came back unreadable counts as no entry, so
/// the verb gets the not-found marker instead of being searched again.
fn settle_search(verb: &str, result: Result<CachedEntry, FetchError>) -> Result<CachedEntry, FetchError> {
    match result {
        Err(FetchError::Exhausted { last: Some(last), .. })
            if matches!(*last, FetchError::Decode { .. }) =>
        {
            warn!(verb, "search response never readable: {}", last);
            Ok(CachedEntry::NotFound)
        }
        other => other,
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(2u64.saturating_pow(attempt)))
}

async fn get_text(http: &reqwest::Client, url: &str, cookies: &str) -> Result<String, FetchError> {
    let response = http.get(url).header(COOKIE, cookies).send().await?;
    checked_text(url, response).await
}

async fn checked_text(url: &str, response: reqwest::Response) -> Result<String, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

fn is_retryable(e: &FetchError) -> bool {
    match e {
        FetchError::Http(_) | FetchError::Decode { .. } => true,
        FetchError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

// ── Batch fetch ──

pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub cached: usize,
    pub not_found: usize,
    pub errors: usize,
}

enum Outcome {
    Page { verb: String, entry: CachedEntry, html: String },
    NotFound { verb: String },
    Failed { verb: String, error: FetchError },
}

async fn fetch_one(client: &DictionaryClient, verb: String) -> Outcome {
    let entry = match client.search_entry(&verb).await {
        Ok(entry) => entry,
        Err(error) => return Outcome::Failed { verb, error },
    };
    let entry_id = match &entry {
        CachedEntry::Found { entry_id, .. } => entry_id.clone(),
        CachedEntry::NotFound => return Outcome::NotFound { verb },
    };
    match client.download_page(&verb, &entry_id).await {
        Ok(html) => Outcome::Page { verb, entry, html },
        Err(error) => Outcome::Failed { verb, error },
    }
}

/// A verb is settled once its page is stored or the dictionary has been found
/// to have no entry for it.
fn is_cached(cache: &CacheSource, verb: &str) -> bool {
    cache.has_page(verb) || matches!(cache.read_entry(verb), Ok(Some(CachedEntry::NotFound)))
}

/// Download every verb not already cached, writing each result to the cache
/// as it arrives.
pub async fn fetch_all(settings: &Settings, cache: &CacheSource, verbs: &[String]) -> Result<FetchStats> {
    let (todo, cached): (Vec<&String>, Vec<&String>) = verbs
        .iter()
        .partition(|v| settings.ignore_cache || !is_cached(cache, v));
    let mut stats = FetchStats {
        total: verbs.len(),
        ok: 0,
        cached: cached.len(),
        not_found: 0,
        errors: 0,
    };
    if todo.is_empty() {
        return Ok(stats);
    }

    let mut client = DictionaryClient::new(settings)?;
    client.ensure_session().await?;
    let client = Arc::new(client);
    let semaphore = Arc::new(Semaphore::new(settings.max_threads));

    let pb = ProgressBar::new(todo.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Outcome>(settings.max_threads * 2);
    for verb in todo {
        let client = Arc::clone(&client);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let verb = verb.clone();
        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let outcome = fetch_one(&client, verb).await;
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        match outcome {
            Outcome::Page { verb, entry, html } => {
                cache.write_entry(&verb, &entry)?;
                cache.write_page(&verb, &html)?;
                stats.ok += 1;
            }
            Outcome::NotFound { verb } => {
                warn!(verb, "no verb entry in the dictionary");
                cache.write_entry(&verb, &CachedEntry::NotFound)?;
                stats.not_found += 1;
            }
            Outcome::Failed { verb, error } => {
                warn!(verb, "fetch failed: {}", error);
                stats.errors += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} pages ({} ok, {} not found, {} errors, {} cached)",
        stats.total, stats.ok, stats.not_found, stats.errors, stats.cached
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str, label: &str, nature: &str) -> SearchResult {
        SearchResult {
            url: url.into(),
            label: label.into(),
            nature: nature.into(),
        }
    }

    #[test]
    fn session_cookie_parsed() {
        assert_eq!(
            session_from_cookie("JSESSIONID=ABC123XYZ; Path=/; Secure; HttpOnly").as_deref(),
            Some("ABC123XYZ")
        );
        assert_eq!(session_from_cookie("other=1"), None);
    }

    #[test]
    fn selects_exact_verb_entry() {
        let results = vec![
            result("/article/A9A1233", "aller", "n. m."),
            result("/article/A9A1234", "aller", "v. intr."),
        ];
        assert_eq!(
            select_entry("aller", &results),
            Some(CachedEntry::Found {
                entry_id: "A9A1234".into(),
                nature: "v. intr.".into()
            })
        );
    }

    #[test]
    fn pronominal_label_matches() {
        let results = vec![result("/article/A9A0712", "agir (s')", "v. pron.")];
        assert!(select_entry("agir", &results).is_some());
        assert!(select_entry("agiter", &results).is_none());
    }

    #[test]
    fn search_response_shape() {
        let json = r#"{"result":[{"url":"/article/A9C3388","label":"connaître","nature":"v. tr."}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            select_entry("connaître", &parsed.result),
            Some(CachedEntry::Found { entry_id, .. }) if entry_id == "A9C3388"
        ));
    }

    #[test]
    fn html_search_body_is_a_decode_error() {
        let err = decode_search("aller", "<html><body>Please wait</body></html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode { ref verb, .. } if verb == "aller"));
        assert!(is_retryable(&err));
    }

    #[test]
    fn search_without_verb_entry_is_not_found() {
        let json = r#"{"result":[{"url":"/article/A9A1233","label":"aller","nature":"n. m."}]}"#;
        assert_eq!(decode_search("aller", json).unwrap(), CachedEntry::NotFound);
    }

    #[test]
    fn exhausted_decode_settles_as_not_found() {
        let exhausted = |last: FetchError| FetchError::Exhausted {
            verb: "aller".into(),
            attempts: 3,
            last: Some(Box::new(last)),
        };
        let decode = FetchError::Decode {
            verb: "aller".into(),
            message: "expected value".into(),
        };
        assert_eq!(
            settle_search("aller", Err(exhausted(decode))).unwrap(),
            CachedEntry::NotFound
        );

        let unavailable = FetchError::Status {
            url: String::new(),
            status: 503,
        };
        assert!(matches!(
            settle_search("aller", Err(exhausted(unavailable))),
            Err(FetchError::Exhausted { .. })
        ));
    }

    #[test]
    fn backoff_saturates_for_large_retry_counts() {
        assert_eq!(backoff(0), Duration::from_millis(1000));
        assert_eq!(backoff(3), Duration::from_millis(8000));
        assert_eq!(backoff(64), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn not_found_marker_counts_as_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheSource::new(dir.path());
        cache.write_entry("zzz", &CachedEntry::NotFound).unwrap();
        cache.write_page("aller", "<div></div>").unwrap();
        cache
            .write_entry(
                "agir",
                &CachedEntry::Found {
                    entry_id: "A9A0712".into(),
                    nature: "v. intr.".into(),
                },
            )
            .unwrap();

        assert!(is_cached(&cache, "zzz"));
        assert!(is_cached(&cache, "aller"));
        // entry found but page never downloaded
        assert!(!is_cached(&cache, "agir"));
        assert!(!is_cached(&cache, "manquant"));
    }

    #[test]
    fn retry_policy() {
        let status = |status| FetchError::Status {
            url: String::new(),
            status,
        };
        assert!(is_retryable(&status(503)));
        assert!(is_retryable(&status(429)));
        assert!(!is_retryable(&status(404)));
        assert!(!is_retryable(&FetchError::NotFound("x".into())));
    }
}
