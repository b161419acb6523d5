//! Source collection: gather up to K web sources per subtopic via the search
//! gateway, with pinned-URL seeding and best-effort supplementary queries.
//!
//! Collection never fails on "no results" — an empty list is a valid outcome
//! the orchestrator redirects to a subtopic failure. A primary search error
//! does propagate (and is caught at the per-subtopic boundary); supplementary
//! searches are best-effort and swallow their errors.

use std::collections::HashSet;

use tracing::{debug, instrument, warn};

use lessonforge_gateways::{SEARCH_RESULT_CAP, SearchDepth, SearchGateway, SearchHit, SearchOptions};
use lessonforge_shared::{Result, ScalePreset, WebSource};

/// Sources with less extracted text than this are too thin to be useful.
pub const MIN_CONTENT_LEN: usize = 200;

/// Accepted content is truncated to this budget to bound prompt size.
pub const CONTENT_CHAR_BUDGET: usize = 8_000;

/// Supplementary searches fire when fewer than this share of the target was
/// collected (broad presets only).
const COVERAGE_RATIO: f64 = 0.7;

/// Fixed task words appended to every primary search query.
const TASK_WORDS: &str = "comprehensive guide explanation examples";

/// Query variations for supplementary coverage top-up.
const SUPPLEMENTAL_SUFFIXES: [&str; 3] = [
    "tutorial examples",
    "best practices guide",
    "advanced techniques",
];

/// Options for collecting sources for one subtopic.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Hard cap on accepted sources.
    pub max_sources: usize,
    /// Scale preset controlling allow-list use and supplementary searches.
    pub scale: ScalePreset,
    /// Pinned reference URLs seeded ahead of search hits. Their content is
    /// resolved downstream at synthesis time, not during collection.
    pub pinned_urls: Vec<String>,
    /// Curated quality-domain allow-list, skipped for broad presets.
    pub domain_allowlist: Vec<String>,
}

impl CollectOptions {
    pub fn for_scale(scale: ScalePreset, domain_allowlist: Vec<String>) -> Self {
        Self {
            max_sources: scale.sources_per_subtopic(),
            scale,
            pinned_urls: Vec::new(),
            domain_allowlist,
        }
    }
}

/// Collect up to `max_sources` web sources for one subtopic.
#[instrument(skip(gateway, options), fields(subtopic, max_sources = options.max_sources))]
pub async fn collect_sources<S: SearchGateway>(
    gateway: &S,
    subtopic: &str,
    topic: &str,
    options: &CollectOptions,
) -> Result<Vec<WebSource>> {
    let mut sources: Vec<WebSource> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // Pinned references first; they count toward the cap.
    for url in &options.pinned_urls {
        if sources.len() >= options.max_sources {
            break;
        }
        if seen.insert(url.clone()) {
            sources.push(placeholder_source(url));
        }
    }

    let query = format!("{topic} {subtopic} {TASK_WORDS}");
    let search_options = SearchOptions {
        depth: SearchDepth::Advanced,
        max_results: (2 * options.max_sources).min(SEARCH_RESULT_CAP),
        include_domains: if options.scale.broad_search() {
            Vec::new()
        } else {
            options.domain_allowlist.clone()
        },
        include_raw_content: true,
    };

    let hits = gateway.search(&query, &search_options).await?;
    accept_hits(&mut sources, &mut seen, hits, options.max_sources);

    if options.scale.supplemental_search() && below_coverage(sources.len(), options.max_sources) {
        supplement(gateway, subtopic, topic, options, &mut sources, &mut seen).await;
    }

    debug!(
        subtopic,
        accepted = sources.len(),
        target = options.max_sources,
        "source collection complete"
    );
    Ok(sources)
}

/// Issue cheap query variations to top up coverage. Best-effort: gateway
/// errors are swallowed.
async fn supplement<S: SearchGateway>(
    gateway: &S,
    subtopic: &str,
    topic: &str,
    options: &CollectOptions,
    sources: &mut Vec<WebSource>,
    seen: &mut HashSet<String>,
) {
    for suffix in SUPPLEMENTAL_SUFFIXES {
        if sources.len() >= options.max_sources {
            break;
        }

        let query = format!("{topic} {subtopic} {suffix}");
        let search_options = SearchOptions {
            depth: SearchDepth::Basic,
            max_results: (options.max_sources - sources.len()).min(SEARCH_RESULT_CAP),
            include_domains: Vec::new(),
            include_raw_content: true,
        };

        match gateway.search(&query, &search_options).await {
            Ok(hits) => accept_hits(sources, seen, hits, options.max_sources),
            Err(e) => {
                warn!(subtopic, query, error = %e, "supplementary search failed, continuing");
            }
        }
    }
}

/// Filter hits into accepted sources: dedup by URL, drop thin content,
/// truncate to the character budget, stop at the cap.
fn accept_hits(
    sources: &mut Vec<WebSource>,
    seen: &mut HashSet<String>,
    hits: Vec<SearchHit>,
    max_sources: usize,
) {
    for hit in hits {
        if sources.len() >= max_sources {
            break;
        }
        if !seen.insert(hit.url.clone()) {
            continue;
        }
        if hit.content.trim().len() < MIN_CONTENT_LEN {
            continue;
        }

        sources.push(WebSource {
            domain: WebSource::domain_of(&hit.url),
            url: hit.url,
            title: hit.title,
            content: truncate_to_budget(&hit.content, CONTENT_CHAR_BUDGET),
            score: hit.score,
        });
    }
}

fn below_coverage(collected: usize, target: usize) -> bool {
    (collected as f64) < COVERAGE_RATIO * (target as f64)
}

fn placeholder_source(url: &str) -> WebSource {
    WebSource {
        url: url.to_string(),
        title: url.to_string(),
        domain: WebSource::domain_of(url),
        content: String::new(),
        score: None,
    }
}

/// Truncate to `budget` bytes without splitting a UTF-8 character.
fn truncate_to_budget(content: &str, budget: usize) -> String {
    if content.len() <= budget {
        return content.to_string();
    }
    let mut end = budget;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use lessonforge_shared::LessonForgeError;

    /// Stub search gateway replaying queued responses and recording calls.
    struct StubSearch {
        responses: Mutex<std::collections::VecDeque<Result<Vec<SearchHit>>>>,
        calls: Mutex<Vec<(String, SearchOptions)>>,
    }

    impl StubSearch {
        fn new(responses: Vec<Result<Vec<SearchHit>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, SearchOptions)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl SearchGateway for StubSearch {
        async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((query.to_string(), options.clone()));
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn hit(url: &str, content_len: usize) -> SearchHit {
        SearchHit {
            url: url.into(),
            title: format!("Title for {url}"),
            content: "x".repeat(content_len),
            score: Some(0.8),
        }
    }

    fn options(scale: ScalePreset) -> CollectOptions {
        CollectOptions::for_scale(scale, vec!["en.wikipedia.org".into()])
    }

    #[tokio::test]
    async fn collects_up_to_max_sources() {
        let hits = (0..10)
            .map(|i| hit(&format!("https://a.org/{i}"), 500))
            .collect();
        let gateway = StubSearch::new(vec![Ok(hits)]);

        let sources = collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Quick))
            .await
            .unwrap();

        assert_eq!(sources.len(), 5);
        assert_eq!(sources[0].domain, "a.org");
    }

    #[tokio::test]
    async fn empty_results_are_ok_not_error() {
        let gateway = StubSearch::new(vec![Ok(vec![])]);
        let sources = collect_sources(&gateway, "Obscure", "Topic", &options(ScalePreset::Quick))
            .await
            .unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn primary_search_error_propagates() {
        let gateway = StubSearch::new(vec![Err(LessonForgeError::Search("HTTP 500".into()))]);
        let result =
            collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Quick)).await;
        assert!(matches!(result, Err(LessonForgeError::Search(_))));
    }

    #[tokio::test]
    async fn thin_content_is_dropped_and_long_content_truncated() {
        let hits = vec![
            hit("https://a.org/thin", MIN_CONTENT_LEN - 1),
            hit("https://a.org/long", CONTENT_CHAR_BUDGET + 5_000),
        ];
        let gateway = StubSearch::new(vec![Ok(hits)]);

        let sources = collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Quick))
            .await
            .unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://a.org/long");
        assert_eq!(sources[0].content.len(), CONTENT_CHAR_BUDGET);
    }

    #[tokio::test]
    async fn pinned_urls_seed_first_and_dedup_search_hits() {
        let hits = vec![
            hit("https://pinned.org/ref", 500),
            hit("https://a.org/1", 500),
        ];
        let gateway = StubSearch::new(vec![Ok(hits)]);

        let mut opts = options(ScalePreset::Quick);
        opts.pinned_urls = vec!["https://pinned.org/ref".into()];

        let sources = collect_sources(&gateway, "Basics", "Topic", &opts)
            .await
            .unwrap();

        assert_eq!(sources.len(), 2);
        // Pinned placeholder comes first, with unresolved content.
        assert_eq!(sources[0].url, "https://pinned.org/ref");
        assert!(sources[0].content.is_empty());
        // The identical search hit was not accepted a second time.
        assert_eq!(sources[1].url, "https://a.org/1");
    }

    #[tokio::test]
    async fn quick_scale_uses_allowlist_and_skips_supplements() {
        let gateway = StubSearch::new(vec![Ok(vec![hit("https://a.org/1", 500)])]);

        collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Quick))
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1, "no supplementary searches for quick scale");
        assert_eq!(calls[0].1.include_domains, vec!["en.wikipedia.org"]);
        assert_eq!(calls[0].1.depth, SearchDepth::Advanced);
        assert_eq!(calls[0].1.max_results, 10); // 2 × 5 sources
        assert!(calls[0].0.ends_with(TASK_WORDS));
    }

    #[tokio::test]
    async fn book_scale_skips_allowlist_and_supplements_thin_coverage() {
        // Primary search yields 2 of 20 → well below 70% coverage.
        let primary: Vec<SearchHit> = (0..2).map(|i| hit(&format!("https://a.org/{i}"), 500)).collect();
        let supp1: Vec<SearchHit> = (0..3).map(|i| hit(&format!("https://b.org/{i}"), 500)).collect();
        let gateway = StubSearch::new(vec![
            Ok(primary),
            Ok(supp1),
            Err(LessonForgeError::Search("HTTP 429".into())), // swallowed
            Ok(vec![hit("https://c.org/0", 500)]),
        ]);

        let sources = collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Book))
            .await
            .unwrap();

        assert_eq!(sources.len(), 6);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 4);
        // Broad preset: no allow-list on the primary call.
        assert!(calls[0].1.include_domains.is_empty());
        assert_eq!(calls[0].1.max_results, SEARCH_RESULT_CAP); // 2 × 20 clamped
        // Supplementary calls run at cheap depth with variation suffixes.
        assert_eq!(calls[1].1.depth, SearchDepth::Basic);
        assert!(calls[1].0.ends_with("tutorial examples"));
        assert!(calls[2].0.ends_with("best practices guide"));
        assert!(calls[3].0.ends_with("advanced techniques"));
    }

    #[tokio::test]
    async fn supplements_skipped_when_coverage_is_adequate() {
        let primary: Vec<SearchHit> = (0..15)
            .map(|i| hit(&format!("https://a.org/{i}"), 500))
            .collect();
        let gateway = StubSearch::new(vec![Ok(primary)]);

        let sources = collect_sources(&gateway, "Basics", "Topic", &options(ScalePreset::Book))
            .await
            .unwrap();

        // 15 of 20 = 75% coverage; no supplementary calls.
        assert_eq!(sources.len(), 15);
        assert_eq!(gateway.calls().len(), 1);
    }

    #[test]
    fn coverage_threshold() {
        assert!(below_coverage(13, 20)); // 65%
        assert!(!below_coverage(14, 20)); // 70%
        assert!(!below_coverage(5, 5));
    }

    #[test]
    fn budget_truncation_respects_char_boundaries() {
        // Multi-byte char straddling the cut point must not panic.
        let s = format!("{}é", "a".repeat(CONTENT_CHAR_BUDGET - 1));
        let truncated = truncate_to_budget(&s, CONTENT_CHAR_BUDGET);
        assert_eq!(truncated.len(), CONTENT_CHAR_BUDGET - 1);
    }
}
