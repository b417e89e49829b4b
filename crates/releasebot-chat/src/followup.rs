//! Follow-up detection.
//!
//! Decides whether a message continues the previous turn (clarification,
//! summary, or a reference back to "those changes") rather than asking
//! something new. The caller then reuses the previous turn's records.

use std::sync::LazyLock;

use regex::Regex;

use crate::memory::Session;

struct FollowUpPatterns {
    clarification: Vec<Regex>,
    summary: Vec<Regex>,
    anaphora: Vec<Regex>,
}

static PATTERNS: LazyLock<FollowUpPatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid follow-up regex"))
            .collect()
    };

    FollowUpPatterns {
        clarification: mk(&[
            r"(?i)\bno\s+entiendo\b",
            r"(?i)\bexpl[ií]ca(me|lo|melo)?\b",
            r"(?i)\bm[aá]s\s+(informaci[oó]n|detalles?|claro)\b",
            r"(?i)\bc[oó]mo\s+(as[ií]|es\s+eso)\b",
            r"(?i)\ba\s+qu[ée]\s+te\s+refieres\b",
            r"(?i)\btell\s+me\s+more\b",
            r"(?i)\bexplain\b",
            r"(?i)\bwhat\s+do\s+you\s+mean\b",
            r"(?i)\bcan\s+you\s+clarify\b",
            r"(?i)\bmore\s+details?\b",
            r"(?i)\belaborate\b",
            r"(?i)\bi\s+(don'?t|do\s+not)\s+understand\b",
        ]),
        summary: mk(&[
            r"(?i)\bresumen\b",
            r"(?i)\bresum(ir|e|elo|emelo)\b",
            r"(?i)\bde\s+qu[ée]\s+trata\b",
            r"(?i)\bsummary\b",
            r"(?i)\bsummari[sz]e\b",
            r"(?i)\bwhat\s+(is|was|are|were)\s+(this|that|it|these|those|they)\s+about\b",
            r"(?i)\bwhat\s+about\s+(it|that|this|them|those)\b",
            r"(?i)\bsobre\s+qu[ée]\b",
        ]),
        anaphora: mk(&[
            r"(?i)^(y\s+)?(eso|ese|esos|esas|esto)\b",
            r"(?i)^y\s+cu[aá]l",
            r"(?i)^cu[aá]l(es)?\s+de\s+(esos|estos|ellos|ellas)\b",
            r"(?i)^ok\b.*\bpero\b",
            r"(?i)^ah\b.*\by\b",
            r"(?i)\bestos?\s+(cambios?|releases?|lanzamientos?)\b",
            r"(?i)^(and\s+)?(that|this|these|those)(\s+(one|ones|changes?|releases?|updates?|features?))?\s*[?.!]*$",
            r"(?i)^(and\s+)?(that|this|these|those)\s+(changes?|releases?|updates?)\b",
            r"(?i)^and\s+which\b",
            r"(?i)^ok\b.*\bbut\b",
            r"(?i)^ah\b.*\band\b",
            r"(?i)\b(these|those)\s+(changes?|releases?|updates?)\b",
        ]),
    }
});

/// Outcome of follow-up detection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FollowUp {
    pub is_follow_up: bool,
    /// The previous turn's user message, set only for follow-ups.
    pub prior_topic: Option<String>,
}

/// Pattern-based follow-up detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowUpDetector;

impl FollowUpDetector {
    pub fn new() -> Self {
        Self
    }

    /// Whether `message` reads like a continuation, ignoring history.
    pub fn is_follow_up_phrase(&self, message: &str) -> bool {
        let text = message.trim();
        let p = &*PATTERNS;
        p.clarification
            .iter()
            .chain(&p.summary)
            .chain(&p.anaphora)
            .any(|re| re.is_match(text))
    }

    /// A message is a follow-up only when the session has history and the
    /// message matches one of the follow-up phrase families.
    pub fn detect(&self, message: &str, session: &Session) -> FollowUp {
        let Some(previous) = session.last_user_message() else {
            return FollowUp::default();
        };
        if !self.is_follow_up_phrase(message) {
            return FollowUp::default();
        }
        FollowUp {
            is_follow_up: true,
            prior_topic: Some(previous.to_string()),
        }
    }
}
