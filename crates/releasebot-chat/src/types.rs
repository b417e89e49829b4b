use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use releasebot_core::ReleaseRecord;
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Query results
// =============================================================================

/// Which rule of the cascade produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    LatestOverall,
    LatestByProduct,
    LastN,
    ByExactDate,
    ThisMonth,
    Today,
    ThisWeek,
    ByYear,
    ByProduct,
    ByCategory,
    ByContent,
    NoMatch,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::LatestOverall => "latest-overall",
            QueryType::LatestByProduct => "latest-by-product",
            QueryType::LastN => "last-n",
            QueryType::ByExactDate => "by-exact-date",
            QueryType::ThisMonth => "this-month",
            QueryType::Today => "today",
            QueryType::ThisWeek => "this-week",
            QueryType::ByYear => "by-year",
            QueryType::ByProduct => "by-product",
            QueryType::ByCategory => "by-category",
            QueryType::ByContent => "by-content",
            QueryType::NoMatch => "no-match",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running the cascade over the corpus.
///
/// `selected` holds shared references into the corpus in presentation order.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryResult {
    pub selected: Vec<Arc<ReleaseRecord>>,
    pub query_type: QueryType,
    /// 0-100.
    pub confidence: u8,
    pub rationale: String,
}

impl QueryResult {
    pub fn new(
        selected: Vec<Arc<ReleaseRecord>>,
        query_type: QueryType,
        confidence: u8,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            selected,
            query_type,
            confidence: confidence.min(100),
            rationale: rationale.into(),
        }
    }

    pub fn no_match(rationale: impl Into<String>) -> Self {
        Self::new(Vec::new(), QueryType::NoMatch, 0, rationale)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

// =============================================================================
// Intent
// =============================================================================

/// Coarse classification of an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Greeting,
    Question,
    EscalationRequest,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "GREETING",
            Intent::Question => "QUESTION",
            Intent::EscalationRequest => "ESCALATION_REQUEST",
            Intent::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Conversation turns
// =============================================================================

/// How a recorded turn was answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnTag {
    Query(QueryType),
    FollowUp,
    Greeting,
    Escalation,
}

impl TurnTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnTag::Query(t) => t.as_str(),
            TurnTag::FollowUp => "follow-up",
            TurnTag::Greeting => "greeting",
            TurnTag::Escalation => "escalation",
        }
    }
}

impl fmt::Display for TurnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TurnTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One completed user/assistant exchange.
#[derive(Clone, Debug)]
pub struct ConversationTurn {
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub bot_response: String,
    pub records_used: Vec<Arc<ReleaseRecord>>,
    pub tag: TurnTag,
}

impl ConversationTurn {
    pub fn new(
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        records_used: Vec<Arc<ReleaseRecord>>,
        tag: TurnTag,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            records_used,
            tag,
        }
    }
}
