//! Conversation sessions and slot-filling state
//!
//! Each session is either idle or awaiting exactly one follow-up answer
//! of a known kind. Successful extraction fills the profile slot and
//! clears the pending state; failed extraction re-prompts and stays put.
//! Sessions live in a bounded LRU cache with an inactivity TTL, and each
//! one is guarded by its own async mutex so concurrent turns on the same
//! session serialize while distinct sessions proceed in parallel.

pub mod extract;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::classifier::QueryTopic;
use crate::tax::TaxRegime;

//
// ================= Profile =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncomeSource {
    Salary,
    Business,
}

impl fmt::Display for IncomeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncomeSource::Salary => "salary",
            IncomeSource::Business => "business",
        };
        write!(f, "{}", s)
    }
}

/// Profile slots filled in over the conversation. Unset slots render as
/// "unknown" in prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<u32>,
    pub total_income: Option<f64>,
    pub savings: Option<f64>,
    pub income_source: Option<IncomeSource>,
    pub tax_regime: Option<TaxRegime>,
    pub investment_horizon_years: Option<u32>,
    pub risk_tolerance: String,
    pub investment_goal: String,
    pub experience_level: String,
    pub location: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: None,
            total_income: None,
            savings: None,
            income_source: None,
            tax_regime: None,
            investment_horizon_years: None,
            risk_tolerance: "moderate".to_string(),
            investment_goal: "general".to_string(),
            experience_level: "beginner".to_string(),
            location: "India".to_string(),
        }
    }
}

impl UserProfile {
    fn fmt_opt<T: fmt::Display>(value: &Option<T>) -> String {
        match value {
            Some(v) => v.to_string(),
            None => "unknown".to_string(),
        }
    }

    /// Ordered attribute snapshot for prompts and persistence.
    pub fn snapshot(&self) -> Vec<(&'static str, String)> {
        vec![
            ("age", Self::fmt_opt(&self.age)),
            ("annual_income", Self::fmt_opt(&self.total_income)),
            ("savings", Self::fmt_opt(&self.savings)),
            ("income_source", Self::fmt_opt(&self.income_source)),
            ("tax_regime", Self::fmt_opt(&self.tax_regime)),
            (
                "investment_horizon_years",
                Self::fmt_opt(&self.investment_horizon_years),
            ),
            ("risk_tolerance", self.risk_tolerance.clone()),
            ("investment_goal", self.investment_goal.clone()),
            ("experience_level", self.experience_level.clone()),
            ("location", self.location.clone()),
        ]
    }

    /// Single-line rendering for the LLM prompt.
    pub fn prompt_block(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

//
// ================= Slots =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    TotalIncome,
    IncomeSource,
    TaxRegime,
    InvestmentHorizon,
}

impl SlotKind {
    /// The follow-up question that opens this slot.
    pub fn question(&self) -> &'static str {
        match self {
            SlotKind::TotalIncome => {
                "What is your approximate annual income in rupees, like 'ten lakhs'?"
            }
            SlotKind::IncomeSource => "Is your income from salary or business?",
            SlotKind::TaxRegime => "Are you using the old or new tax regime?",
            SlotKind::InvestmentHorizon => "What's your investment horizon in years?",
        }
    }

    /// Clarifying guidance when extraction fails.
    pub fn reprompt(&self) -> &'static str {
        match self {
            SlotKind::TotalIncome => "Please say your annual income, like 'ten lakhs'.",
            SlotKind::IncomeSource => "Please say 'salary' or 'business'.",
            SlotKind::TaxRegime => "Please say 'old' or 'new' regime.",
            SlotKind::InvestmentHorizon => {
                "Please say a number of years, like 'ten' or 'twenty five'."
            }
        }
    }

    /// Try to fill this slot from the utterance. Returns false (and
    /// leaves the profile untouched) when the answer doesn't parse.
    pub fn try_fill(&self, profile: &mut UserProfile, utterance: &str) -> bool {
        match self {
            SlotKind::TotalIncome => match extract::extract_income(utterance) {
                Some(income) => {
                    profile.total_income = Some(income);
                    true
                }
                None => false,
            },
            SlotKind::IncomeSource => match extract::extract_income_source(utterance) {
                Some(source) => {
                    profile.income_source = Some(source);
                    true
                }
                None => false,
            },
            SlotKind::TaxRegime => match extract::extract_tax_regime(utterance) {
                Some(regime) => {
                    profile.tax_regime = Some(regime);
                    true
                }
                None => false,
            },
            SlotKind::InvestmentHorizon => match extract::extract_years(utterance) {
                Some(years) => {
                    profile.investment_horizon_years = Some(years);
                    true
                }
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingFollowUp {
    pub question: String,
    pub kind: SlotKind,
}

/// Decide whether the answered query leaves a profile gap worth a
/// follow-up question. First matching rule wins, which also drives
/// chained slot-filling after each successful fill.
pub fn next_follow_up(topic: QueryTopic, query: &str, profile: &UserProfile) -> Option<PendingFollowUp> {
    let query_lower = query.to_lowercase();

    let kind = if topic == QueryTopic::InvestmentAdvice
        && profile.investment_horizon_years.is_none()
        && (query_lower.contains("sip") || query_lower.contains("investment"))
    {
        Some(SlotKind::InvestmentHorizon)
    } else if topic == QueryTopic::TaxRules && profile.tax_regime.is_none() {
        Some(SlotKind::TaxRegime)
    } else if topic == QueryTopic::TaxRules
        && profile.income_source.is_none()
        && query_lower.contains("filing")
    {
        Some(SlotKind::IncomeSource)
    } else if topic == QueryTopic::TaxRules
        && profile.total_income.is_none()
        && query_lower.contains("filing")
    {
        Some(SlotKind::TotalIncome)
    } else {
        None
    };

    kind.map(|kind| PendingFollowUp {
        question: kind.question().to_string(),
        kind,
    })
}

//
// ================= Sessions =================
//

/// Per-session state. Owned exclusively by the session store; all turn
/// processing happens under the session's mutex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSession {
    pub profile: UserProfile,
    pub pending_follow_up: Option<PendingFollowUp>,
    pub last_query: Option<String>,
    pub last_response: Option<String>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_awaiting_slot(&self) -> bool {
        self.pending_follow_up.is_some()
    }

    pub fn clear_pending(&mut self) {
        self.pending_follow_up = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

struct SessionEntry {
    session: Arc<AsyncMutex<ConversationSession>>,
    last_active: Instant,
}

/// Bounded session cache: LRU capacity plus an inactivity TTL, both
/// enforced on access. Expired sessions are replaced with fresh state.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Fetch the live session for `id`, creating or recycling as needed.
    /// The returned handle serializes all turns for this session.
    pub fn get_or_create(&self, id: &str) -> Arc<AsyncMutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");

        if let Some(entry) = sessions.get_mut(id) {
            if entry.last_active.elapsed() <= self.ttl {
                entry.last_active = Instant::now();
                return Arc::clone(&entry.session);
            }
            debug!("Session {} expired, starting fresh", id);
        }

        let session = Arc::new(AsyncMutex::new(ConversationSession::new()));
        sessions.put(
            id.to_string(),
            SessionEntry {
                session: Arc::clone(&session),
                last_active: Instant::now(),
            },
        );
        session
    }

    /// Drop a session outright (explicit end-of-conversation).
    pub fn end(&self, id: &str) {
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        if sessions.pop(id).is_some() {
            info!("Session {} ended", id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
