//! Query/relevance engine.
//!
//! A fixed, ordered cascade of rules. Each rule either claims the question
//! and returns a [`QueryResult`] or passes; the first claim wins. Rules are
//! pure functions of the question, the corpus (newest first) and today's
//! date, so the whole engine is deterministic and synchronous.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use releasebot_core::{Corpus, ReleaseRecord};
use tracing::debug;

use crate::types::{QueryResult, QueryType};

pub const MAX_LAST_N: usize = 20;
pub const MAX_BY_YEAR: usize = 50;
pub const MAX_BY_PRODUCT: usize = 15;
pub const MAX_BY_CATEGORY: usize = 15;
pub const MAX_BY_CONTENT: usize = 15;

/// Free-text scoring: every matched term earns the base weight, plus a bonus
/// when it appears in the description and a larger one in the feature name.
pub const TERM_BASE_WEIGHT: u32 = 10;
pub const DESCRIPTION_WEIGHT: u32 = 30;
pub const FEATURE_WEIGHT: u32 = 50;

// =============================================================================
// Vocabulary
// =============================================================================

/// Product names the assistant knows about, in scan order.
pub static KNOWN_PRODUCTS: &[&str] = &[
    "aiR for Review",
    "Processing",
    "Legal Hold",
    "Collect",
    "ARM",
    "Analytics",
    "Review Center",
    "Integration Points",
    "Management Console",
    "Cost Explorer",
    "Search",
    "Imaging",
    "Production",
    "Staging Explorer",
    "Billing API",
    "Short Message",
    "Authentication",
    "OAuth",
    "PDF",
];

static TECHNICAL_TERMS: &[&str] = &[
    "workspace",
    "document",
    "field",
    "search",
    "export",
    "import",
    "user",
    "permission",
    "role",
    "api",
    "integration",
    "report",
    "billing",
    "cost",
    "usage",
    "storage",
    "performance",
];

static STOP_WORDS: &[&str] = &[
    "el", "la", "de", "que", "y", "a", "en", "un", "una", "por", "con", "para", "the", "is",
    "at", "which", "on", "are", "was", "were", "about", "hay", "algo", "del", "más", "no", "si",
    "me", "te", "se", "what", "when", "where", "who", "why", "how", "tell", "show", "give",
    "list", "does", "have", "there", "with", "from", "that", "this", "these", "those", "cuál",
    "cual", "qué", "cómo", "como", "cuándo", "dónde", "sobre", "esta", "este", "están", "hubo",
    "been", "anything", "changes", "changed", "release", "releases", "cambios",
];

// =============================================================================
// Compiled patterns (compiled once, reused across calls)
// =============================================================================

struct EnginePatterns {
    latest: Vec<Regex>,
    last_n: Regex,
    exact_date: Regex,
    this_month: Regex,
    today: Regex,
    this_week: Regex,
    bare_year: Regex,
    summary_request: Vec<Regex>,
    categories: Vec<(Regex, &'static str)>,
    quoted: Regex,
    capitalized: Regex,
    non_word: Regex,
    products: Vec<(&'static str, Regex)>,
}

static PATTERNS: LazyLock<EnginePatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid engine regex"))
            .collect()
    };

    EnginePatterns {
        latest: mk(&[
            r"(?i)[uú]ltimo\s+(lanzamiento|release|cambio)",
            r"(?i)[uú]ltima\s+(release|versi[oó]n)",
            r"(?i)\blast\s+(release|launch|change|update)",
            r"(?i)\blatest\s+(release|version)",
            r"(?i)\bmost\s+recent\b",
            r"(?i)m[aá]s\s+reciente",
            r"(?i)cu[aá]l\s+(fue|es)\s+el\s+[uú]ltimo",
            r"(?i)\bwhat\s+(was|is)\s+the\s+last\b",
            r"(?i)\bwhen\s+was\s+the\s+last\b",
            r"(?i)quiero\s+saber\s+sobre\s+el\s+[uú]ltimo",
        ]),
        last_n: Regex::new(
            r"(?i)[uú]ltim[oa]s?\s+(\d+)|\blast\s+(\d+)|\blatest\s+(\d+)|\b(\d+)\s+[uú]ltim[oa]s?|\b(\d+)\s+(?:most\s+)?recent",
        )
        .expect("Invalid engine regex"),
        exact_date: Regex::new(
            r"\b(20\d{2})[/\-](0?[1-9]|1[0-2])[/\-](0?[1-9]|[12]\d|3[01])\b",
        )
        .expect("Invalid engine regex"),
        this_month: Regex::new(r"(?i)\b(este\s+mes|this\s+month)\b").expect("Invalid engine regex"),
        today: Regex::new(r"(?i)\b(hoy|today)\b").expect("Invalid engine regex"),
        this_week: Regex::new(r"(?i)\b(esta\s+semana|this\s+week)\b").expect("Invalid engine regex"),
        bare_year: Regex::new(r"\b(20\d{2})\b").expect("Invalid engine regex"),
        summary_request: mk(&[
            r"(?i)\bresumen\b",
            r"(?i)\bsummary\b",
            r"(?i)de\s+qu[ée]\s+trata",
            r"(?i)\bwhat\s+about\b",
            r"(?i)sobre\s+qu[ée]\b",
        ]),
        categories: vec![
            (
                Regex::new(r"(?i)\b(fix|defecto|bug|resolved|corregido|solucionado)").expect("Invalid engine regex"),
                "resolved defect",
            ),
            (
                Regex::new(r"(?i)\b(enhancement|mejora|improvement|nueva|new)").expect("Invalid engine regex"),
                "enhancement",
            ),
            (
                Regex::new(r"(?i)\b(change|cambio|modification)").expect("Invalid engine regex"),
                "change",
            ),
            (
                Regex::new(r"(?i)\b(deprecation|deprecated|eliminado)").expect("Invalid engine regex"),
                "deprecation",
            ),
        ],
        quoted: Regex::new(r#""([^"]+)""#).expect("Invalid engine regex"),
        capitalized: Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("Invalid engine regex"),
        non_word: Regex::new(r"[^\w\s]").expect("Invalid engine regex"),
        products: KNOWN_PRODUCTS
            .iter()
            .map(|p| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(p)))
                    .expect("Invalid product regex");
                (*p, re)
            })
            .collect(),
    }
});

// =============================================================================
// Rules
// =============================================================================

/// Everything a rule may look at.
pub struct QueryContext<'a> {
    pub question: &'a str,
    pub lowered: String,
    /// Corpus sorted by date, newest first, ties in corpus order.
    pub records: Vec<Arc<ReleaseRecord>>,
    pub today: NaiveDate,
}

impl<'a> QueryContext<'a> {
    pub fn new(question: &'a str, corpus: &Corpus, today: NaiveDate) -> Self {
        let mut records: Vec<Arc<ReleaseRecord>> = corpus.iter().cloned().collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Self {
            question,
            lowered: question.to_lowercase(),
            records,
            today,
        }
    }

    fn filtered<F>(&self, limit: usize, pred: F) -> Vec<Arc<ReleaseRecord>>
    where
        F: Fn(&ReleaseRecord) -> bool,
    {
        self.records
            .iter()
            .filter(|r| pred(r))
            .take(limit)
            .cloned()
            .collect()
    }
}

/// One step of the cascade.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&QueryContext<'_>) -> Option<QueryResult>,
}

/// The default cascade, in priority order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule { name: "latest-release", apply: latest_release },
        Rule { name: "last-n", apply: last_n },
        Rule { name: "exact-date", apply: exact_date },
        Rule { name: "relative-window", apply: relative_window },
        Rule { name: "bare-year", apply: bare_year },
        Rule { name: "known-product", apply: known_product },
        Rule { name: "category", apply: category },
        Rule { name: "free-text", apply: free_text },
    ]
}

/// Product named in the question, multi-word names first.
fn named_product(question: &str) -> Option<&'static str> {
    let products = &PATTERNS.products;
    products
        .iter()
        .filter(|(name, _)| name.contains(' '))
        .chain(products.iter().filter(|(name, _)| !name.contains(' ')))
        .find(|(_, re)| re.is_match(question))
        .map(|(name, _)| *name)
}

fn latest_release(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    if !PATTERNS.latest.iter().any(|re| re.is_match(ctx.question)) {
        return None;
    }
    // "the 5 most recent" asks for a count; leave it to last-n.
    if PATTERNS.last_n.is_match(ctx.question) {
        return None;
    }

    if let Some(product) = named_product(ctx.question) {
        if let Some(record) = ctx.records.iter().find(|r| r.mentions(product)) {
            return Some(QueryResult::new(
                vec![record.clone()],
                QueryType::LatestByProduct,
                100,
                format!("most recent release mentioning {}", product),
            ));
        }
    }

    let latest: Vec<_> = ctx.records.first().cloned().into_iter().collect();
    Some(QueryResult::new(
        latest,
        QueryType::LatestOverall,
        100,
        "most recent release overall",
    ))
}

fn last_n(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let caps = PATTERNS.last_n.captures(ctx.question)?;
    let raw = caps.iter().skip(1).flatten().next()?.as_str();
    // Digit strings too large for usize are still "more than the cap".
    let n = raw.parse::<usize>().unwrap_or(usize::MAX).min(MAX_LAST_N);

    let selected: Vec<_> = ctx.records.iter().take(n).cloned().collect();
    Some(QueryResult::new(
        selected,
        QueryType::LastN,
        100,
        format!("{} most recent releases", n),
    ))
}

fn exact_date(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let caps = PATTERNS.exact_date.captures(ctx.question)?;
    let part = |i: usize| caps.get(i).map_or(0, |m| m.as_str().parse::<u32>().unwrap_or(0));
    let date = format!("{:04}/{:02}/{:02}", part(1), part(2), part(3));

    let selected = ctx.filtered(usize::MAX, |r| r.date == date);
    Some(QueryResult::new(
        selected,
        QueryType::ByExactDate,
        100,
        format!("releases dated {}", date),
    ))
}

fn relative_window(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let today = ctx.today;

    if PATTERNS.this_month.is_match(ctx.question) {
        let prefix = today.format("%Y/%m").to_string();
        let selected = ctx.filtered(usize::MAX, |r| r.date.starts_with(&prefix));
        return Some(QueryResult::new(
            selected,
            QueryType::ThisMonth,
            100,
            format!("releases in {}", prefix),
        ));
    }

    if PATTERNS.today.is_match(ctx.question) {
        let date = today.format("%Y/%m/%d").to_string();
        let selected = ctx.filtered(usize::MAX, |r| r.date == date);
        return Some(QueryResult::new(
            selected,
            QueryType::Today,
            100,
            format!("releases dated today ({})", date),
        ));
    }

    if PATTERNS.this_week.is_match(ctx.question) {
        let cutoff = (today - Duration::days(7)).format("%Y/%m/%d").to_string();
        let selected = ctx.filtered(usize::MAX, |r| r.date >= cutoff);
        return Some(QueryResult::new(
            selected,
            QueryType::ThisWeek,
            100,
            format!("releases since {}", cutoff),
        ));
    }

    None
}

fn bare_year(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let question = ctx.question;
    let year = PATTERNS
        .bare_year
        .find_iter(question)
        .find(|m| {
            !question[..m.start()].ends_with(['/', '-'])
                && !question[m.end()..].starts_with(['/', '-'])
        })?
        .as_str();

    let selected = ctx.filtered(MAX_BY_YEAR, |r| r.date.starts_with(year));
    Some(QueryResult::new(
        selected,
        QueryType::ByYear,
        95,
        format!("releases from {}", year),
    ))
}

fn known_product(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    if PATTERNS
        .summary_request
        .iter()
        .any(|re| re.is_match(ctx.question))
    {
        return None;
    }

    PATTERNS
        .products
        .iter()
        .filter(|(_, re)| re.is_match(ctx.question))
        .find_map(|(name, _)| {
            let selected = ctx.filtered(MAX_BY_PRODUCT, |r| r.mentions(name));
            (!selected.is_empty()).then(|| {
                QueryResult::new(
                    selected,
                    QueryType::ByProduct,
                    95,
                    format!("releases mentioning {}", name),
                )
            })
        })
}

fn category(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let (_, value) = PATTERNS
        .categories
        .iter()
        .find(|(re, _)| re.is_match(ctx.question))?;

    let selected = ctx.filtered(MAX_BY_CATEGORY, |r| {
        r.category.to_lowercase().contains(value)
    });
    Some(QueryResult::new(
        selected,
        QueryType::ByCategory,
        90,
        format!("releases in category \"{}\"", value),
    ))
}

fn free_text(ctx: &QueryContext<'_>) -> Option<QueryResult> {
    let terms = extract_terms(ctx.question);
    if terms.is_empty() {
        return None;
    }

    let mut scored: Vec<(u32, &Arc<ReleaseRecord>)> = ctx
        .records
        .iter()
        .filter_map(|record| {
            let score = score_record(record, &terms);
            (score > 0).then_some((score, record))
        })
        .collect();
    if scored.is_empty() {
        return None;
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.date.cmp(&a.1.date)));
    let selected: Vec<_> = scored
        .into_iter()
        .take(MAX_BY_CONTENT)
        .map(|(_, r)| r.clone())
        .collect();

    Some(QueryResult::new(
        selected,
        QueryType::ByContent,
        75,
        format!("text match on: {}", terms.join(", ")),
    ))
}

// =============================================================================
// Free-text helpers
// =============================================================================

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Lowercased search terms, deduplicated, in discovery order: quoted
/// phrases, capitalized phrases, technical vocabulary, then remaining words
/// longer than three characters.
pub fn extract_terms(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    let mut terms: Vec<String> = Vec::new();

    for caps in PATTERNS.quoted.captures_iter(question) {
        terms.push(caps[1].trim().to_lowercase());
    }

    for m in PATTERNS.capitalized.find_iter(question) {
        let phrase = m.as_str().to_lowercase();
        if !is_stop_word(&phrase) {
            terms.push(phrase);
        }
    }

    for term in TECHNICAL_TERMS {
        if lowered.contains(term) {
            terms.push((*term).to_string());
        }
    }

    let cleaned = PATTERNS.non_word.replace_all(&lowered, " ");
    for word in cleaned.split_whitespace() {
        if word.chars().count() > 3 && !is_stop_word(word) {
            terms.push(word.to_string());
        }
    }

    let mut seen = HashSet::new();
    terms.retain(|t| !t.is_empty() && seen.insert(t.clone()));
    terms
}

/// Sum of per-term weights; zero when no term matches.
pub fn score_record(record: &ReleaseRecord, terms: &[String]) -> u32 {
    let text = record.searchable_text();
    let description = record.description.to_lowercase();
    let feature = record.feature.to_lowercase();

    terms
        .iter()
        .filter(|term| text.contains(term.as_str()))
        .map(|term| {
            let mut score = TERM_BASE_WEIGHT;
            if description.contains(term.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            if feature.contains(term.as_str()) {
                score += FEATURE_WEIGHT;
            }
            score
        })
        .sum()
}

// =============================================================================
// QueryEngine
// =============================================================================

/// Runs the rule cascade over a corpus snapshot.
pub struct QueryEngine {
    rules: Vec<Rule>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Names of the rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// Classify `question` against `corpus` using the local date.
    pub fn query(&self, question: &str, corpus: &Corpus) -> QueryResult {
        self.query_on(question, corpus, Local::now().date_naive())
    }

    /// Classify `question` with an explicit notion of "today".
    pub fn query_on(&self, question: &str, corpus: &Corpus, today: NaiveDate) -> QueryResult {
        if corpus.is_empty() {
            debug!("Corpus is empty; nothing to match");
            return QueryResult::no_match("release corpus is empty");
        }

        let ctx = QueryContext::new(question, corpus, today);
        for rule in &self.rules {
            if let Some(result) = (rule.apply)(&ctx) {
                debug!(
                    rule = rule.name,
                    query_type = %result.query_type,
                    selected = result.selected.len(),
                    confidence = result.confidence,
                    "Query rule matched"
                );
                return result;
            }
        }

        debug!("No query rule matched");
        QueryResult::no_match("no rule matched the question")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use releasebot_core::corpus_from;

    fn rec(date: &str, category: &str, feature: &str, description: &str) -> ReleaseRecord {
        ReleaseRecord::new(date, "", category, feature, description)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()
    }

    fn corpus() -> Corpus {
        corpus_from(vec![
            rec("2024/06/12", "Enhancement", "Imaging", "Image on the fly for large sets"),
            rec("2024/06/08", "Resolved Defect", "Legal Hold", "Fixed reminder email scheduling"),
            rec("2024/06/01", "Change", "Processing", "Discovery now retries failed files"),
            rec("2024/05/20", "Enhancement", "aiR for Review", "Prompt criteria versioning"),
            rec("2024/03/15", "Deprecation", "Short Message", "Legacy RSMF viewer removed"),
            rec("2024/03/15", "Enhancement", "Search", "Keyword search highlights in Viewer"),
            rec("2023/11/02", "Enhancement", "Processing", "Faster text extraction"),
            rec("2023/07/19", "Resolved Defect", "Billing API", "Usage report totals corrected"),
        ])
    }

    fn run(question: &str) -> QueryResult {
        QueryEngine::new().query_on(question, &corpus(), today())
    }

    fn features(result: &QueryResult) -> Vec<&str> {
        result.selected.iter().map(|r| r.feature.as_str()).collect()
    }

    // ---- Cascade shape ----

    #[test]
    fn test_rule_order() {
        assert_eq!(
            QueryEngine::new().rule_names(),
            vec![
                "latest-release",
                "last-n",
                "exact-date",
                "relative-window",
                "bare-year",
                "known-product",
                "category",
                "free-text",
            ]
        );
    }

    #[test]
    fn test_empty_corpus_is_no_match() {
        let result = QueryEngine::new().query_on("what was the last release?", &corpus_from(vec![]), today());
        assert_eq!(result.query_type, QueryType::NoMatch);
        assert_eq!(result.confidence, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_unsorted_corpus_is_ordered_by_recency() {
        let shuffled = corpus_from(vec![
            rec("2023/01/01", "Change", "Old", ""),
            rec("2024/02/02", "Change", "New", ""),
            rec("2023/06/06", "Change", "Middle", ""),
        ]);
        let result = QueryEngine::new().query_on("show me the last 3", &shuffled, today());
        assert_eq!(features(&result), vec!["New", "Middle", "Old"]);
    }

    #[test]
    fn test_selected_records_are_shared_not_copied() {
        let corpus = corpus();
        let result = QueryEngine::new().query_on("latest release", &corpus, today());
        assert!(Arc::ptr_eq(&result.selected[0], &corpus[0]));
    }

    // ---- Latest release ----

    #[test]
    fn test_latest_release_english_and_spanish() {
        for q in [
            "What was the last release?",
            "latest version please",
            "most recent update",
            "¿Cuál fue el último lanzamiento?",
            "la versión más reciente",
            "quiero saber sobre el último cambio",
        ] {
            let result = run(q);
            assert_eq!(result.query_type, QueryType::LatestOverall, "question: {}", q);
            assert_eq!(result.confidence, 100);
            assert_eq!(features(&result), vec!["Imaging"]);
        }
    }

    #[test]
    fn test_latest_release_is_maximum_date() {
        let result = run("when was the last release");
        let max = corpus().iter().map(|r| r.date.clone()).max().unwrap();
        assert_eq!(result.selected[0].date, max);
    }

    #[test]
    fn test_latest_release_by_product() {
        let result = run("What was the last update to Processing?");
        assert_eq!(result.query_type, QueryType::LatestByProduct);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.selected.len(), 1);
        assert_eq!(result.selected[0].date, "2024/06/01");
    }

    #[test]
    fn test_latest_release_prefers_multi_word_product() {
        let result = run("latest release for aiR for Review");
        assert_eq!(result.query_type, QueryType::LatestByProduct);
        assert_eq!(features(&result), vec!["aiR for Review"]);
    }

    #[test]
    fn test_latest_release_unknown_product_records_falls_back() {
        let result = run("latest release for OAuth");
        assert_eq!(result.query_type, QueryType::LatestOverall);
        assert_eq!(features(&result), vec!["Imaging"]);
    }

    #[test]
    fn test_latest_rule_beats_exact_date() {
        let result = run("what was the last release on 2024/03/15");
        assert_eq!(result.query_type, QueryType::LatestOverall);
        assert_eq!(result.selected.len(), 1);
    }

    // ---- Last N ----

    #[test]
    fn test_last_n_variants() {
        for (q, n) in [
            ("show the last 3 releases", 3),
            ("latest 2", 2),
            ("los últimos 4 cambios", 4),
            ("5 últimos", 5),
            ("give me 2 recent changes", 2),
            ("show me the 5 most recent releases", 5),
            ("the 3 most recent updates to Processing", 3),
        ] {
            let result = run(q);
            assert_eq!(result.query_type, QueryType::LastN, "question: {}", q);
            assert_eq!(result.confidence, 100);
            assert_eq!(result.selected.len(), n.min(corpus().len()));
        }
    }

    #[test]
    fn test_last_n_is_capped() {
        let many: Vec<ReleaseRecord> = (1..=28)
            .map(|d| rec(&format!("2024/02/{:02}", d), "Change", "Search", "x"))
            .collect();
        let corpus = corpus_from(many);
        let result = QueryEngine::new().query_on("last 50 releases", &corpus, today());
        assert_eq!(result.query_type, QueryType::LastN);
        assert_eq!(result.selected.len(), MAX_LAST_N);
        assert_eq!(result.selected[0].date, "2024/02/28");
    }

    #[test]
    fn test_last_n_huge_number_does_not_panic() {
        let result = run("last 99999999999999999999999 releases");
        assert_eq!(result.query_type, QueryType::LastN);
        assert_eq!(result.selected.len(), corpus().len());
    }

    #[test]
    fn test_last_zero_returns_empty_last_n() {
        let result = run("last 0 releases");
        assert_eq!(result.query_type, QueryType::LastN);
        assert!(result.is_empty());
    }

    // ---- Exact date ----

    #[test]
    fn test_exact_date_slash_and_dash() {
        for q in ["What shipped on 2024/03/15?", "releases 2024-03-15", "2024-3-15 notes"] {
            let result = run(q);
            assert_eq!(result.query_type, QueryType::ByExactDate, "question: {}", q);
            assert_eq!(result.confidence, 100);
            assert_eq!(features(&result), vec!["Short Message", "Search"]);
        }
    }

    #[test]
    fn test_exact_date_without_matches_keeps_type() {
        let result = run("What happened on 2024/01/01?");
        assert_eq!(result.query_type, QueryType::ByExactDate);
        assert_eq!(result.confidence, 100);
        assert!(result.is_empty());
    }

    // ---- Relative windows ----

    #[test]
    fn test_this_month() {
        let result = run("What was released this month?");
        assert_eq!(result.query_type, QueryType::ThisMonth);
        assert_eq!(features(&result), vec!["Imaging", "Legal Hold", "Processing"]);
    }

    #[test]
    fn test_este_mes() {
        let result = run("¿Qué salió este mes?");
        assert_eq!(result.query_type, QueryType::ThisMonth);
        assert_eq!(result.selected.len(), 3);
    }

    #[test]
    fn test_today() {
        let result = run("anything today?");
        assert_eq!(result.query_type, QueryType::Today);
        assert_eq!(features(&result), vec!["Imaging"]);
    }

    #[test]
    fn test_this_week() {
        let result = run("cambios de esta semana");
        assert_eq!(result.query_type, QueryType::ThisWeek);
        assert_eq!(features(&result), vec!["Imaging", "Legal Hold"]);
    }

    #[test]
    fn test_relative_words_need_word_boundaries() {
        // "hoy" inside another word must not trigger the today rule.
        let result = run("ahoyy matey");
        assert_ne!(result.query_type, QueryType::Today);
    }

    // ---- Year ----

    #[test]
    fn test_bare_year() {
        let result = run("What changed in 2023?");
        assert_eq!(result.query_type, QueryType::ByYear);
        assert_eq!(result.confidence, 95);
        assert_eq!(features(&result), vec!["Processing", "Billing API"]);
    }

    #[test]
    fn test_year_inside_malformed_date_is_ignored() {
        let result = run("notes for 2024/13/45");
        assert_ne!(result.query_type, QueryType::ByYear);
    }

    #[test]
    fn test_year_is_capped() {
        let many: Vec<ReleaseRecord> = (0..60)
            .map(|i| rec(&format!("2022/01/{:02}", (i % 28) + 1), "Change", "Search", "x"))
            .collect();
        let result = QueryEngine::new().query_on("2022 releases", &corpus_from(many), today());
        assert_eq!(result.selected.len(), MAX_BY_YEAR);
    }

    // ---- Product ----

    #[test]
    fn test_known_product() {
        let result = run("Tell me about Processing");
        assert_eq!(result.query_type, QueryType::ByProduct);
        assert_eq!(result.confidence, 95);
        assert_eq!(result.selected.len(), 2);
        assert_eq!(result.selected[0].date, "2024/06/01");
    }

    #[test]
    fn test_known_product_is_case_insensitive_whole_word() {
        let result = run("legal hold changes?");
        assert_eq!(result.query_type, QueryType::ByProduct);
        assert_eq!(features(&result), vec!["Legal Hold"]);

        // "Searching" is not the product "Search".
        let result = run("Researching something unusual");
        assert_ne!(result.query_type, QueryType::ByProduct);
    }

    #[test]
    fn test_product_without_records_tries_next_product() {
        let result = run("Collect or Imaging improvements?");
        // Collect is scanned first but has no records.
        assert_eq!(result.query_type, QueryType::ByProduct);
        assert_eq!(features(&result), vec!["Imaging"]);
    }

    #[test]
    fn test_summary_request_skips_product_rule() {
        let result = run("Give me a summary of Processing");
        assert_ne!(result.query_type, QueryType::ByProduct);
    }

    // ---- Category ----

    #[test]
    fn test_category_keywords() {
        let result = run("Which bugs were resolved?");
        assert_eq!(result.query_type, QueryType::ByCategory);
        assert_eq!(result.confidence, 90);
        assert_eq!(features(&result), vec!["Legal Hold", "Billing API"]);

        let result = run("any deprecated features?");
        assert_eq!(result.query_type, QueryType::ByCategory);
        assert_eq!(features(&result), vec!["Short Message"]);

        let result = run("muéstrame las mejoras");
        assert_eq!(result.query_type, QueryType::ByCategory);
        assert_eq!(result.selected.len(), 4);
    }

    // ---- Free text ----

    #[test]
    fn test_extract_terms() {
        let terms = extract_terms("Is there anything about \"text extraction\" for Viewer workspaces?");
        assert_eq!(terms[0], "text extraction");
        assert!(terms.contains(&"viewer".to_string()));
        assert!(terms.contains(&"workspace".to_string()));
        assert!(terms.contains(&"workspaces".to_string()));
        assert!(!terms.contains(&"about".to_string()));
        assert!(!terms.contains(&"is".to_string()));
        let unique: HashSet<_> = terms.iter().collect();
        assert_eq!(unique.len(), terms.len());
    }

    #[test]
    fn test_score_record_weights() {
        let record = rec("2024/01/01", "Enhancement", "Viewer", "Viewer highlights");
        assert_eq!(
            score_record(&record, &["viewer".to_string()]),
            TERM_BASE_WEIGHT + DESCRIPTION_WEIGHT + FEATURE_WEIGHT
        );
        assert_eq!(score_record(&record, &["enhancement".to_string()]), TERM_BASE_WEIGHT);
        assert_eq!(score_record(&record, &["absent".to_string()]), 0);
    }

    #[test]
    fn test_free_text_ranks_feature_matches_first() {
        let corpus = corpus_from(vec![
            rec("2024/05/01", "Enhancement", "Dashboards", "Pivot widgets on the viewer page"),
            rec("2024/01/01", "Enhancement", "Viewer", "Redaction tools"),
        ]);
        let result = QueryEngine::new().query_on("viewer redaction", &corpus, today());
        assert_eq!(result.query_type, QueryType::ByContent);
        assert_eq!(result.confidence, 75);
        assert_eq!(features(&result), vec!["Viewer", "Dashboards"]);
    }

    #[test]
    fn test_free_text_ties_break_by_date() {
        let corpus = corpus_from(vec![
            rec("2023/01/01", "Enhancement", "Alpha", "retries"),
            rec("2024/01/01", "Enhancement", "Beta", "retries"),
        ]);
        let result = QueryEngine::new().query_on("retries", &corpus, today());
        assert_eq!(features(&result), vec!["Beta", "Alpha"]);
    }

    #[test]
    fn test_free_text_match() {
        let result = run("extraction speed");
        assert_eq!(result.query_type, QueryType::ByContent);
        assert_eq!(features(&result), vec!["Processing"]);
    }

    #[test]
    fn test_no_match() {
        let result = run("zzzz qqqq");
        assert_eq!(result.query_type, QueryType::NoMatch);
        assert_eq!(result.confidence, 0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_short_words_only_is_no_match() {
        let result = run("ok so");
        assert_eq!(result.query_type, QueryType::NoMatch);
    }
}
