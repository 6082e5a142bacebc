//! Process-start configuration
//!
//! Loaded once from the environment and validated before any request is
//! served. Slab tables, deduction limits, and keyword tables are
//! compiled-in constants; everything tunable lives here.

use std::env;
use std::time::Duration;

use crate::error::{AdvisorError, Result};
use crate::knowledge::RetrievalConfig;

#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    /// Retrieval relevance cutoff (results at or beyond are dropped).
    pub distance_cutoff: f32,
    /// Minimum ingestion-declared confidence when metadata carries one.
    pub min_confidence: f32,
    pub top_k: usize,
    /// Cap on the assembled knowledge-context block fed to the prompt.
    pub max_context_chars: usize,

    pub llm_timeout: Duration,
    pub retrieval_timeout: Duration,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,

    pub session_capacity: usize,
    pub session_ttl: Duration,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            gemini_api_key: None,
            distance_cutoff: 0.5,
            min_confidence: 0.8,
            top_k: 5,
            max_context_chars: 2_000,
            llm_timeout: Duration::from_secs(20),
            retrieval_timeout: Duration::from_secs(5),
            llm_max_tokens: 200,
            llm_temperature: 0.1,
            session_capacity: 1_024,
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AdvisorError::Configuration(format!("{} has an unparseable value: {}", key, raw))
        }),
        Err(_) => Ok(None),
    }
}

impl AdvisorConfig {
    /// Read overrides from the environment (.env supported) on top of
    /// the defaults, then validate.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        config.groq_api_key = env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty());
        config.gemini_api_key = env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());

        if let Some(cutoff) = env_parse::<f32>("RETRIEVAL_DISTANCE_CUTOFF")? {
            config.distance_cutoff = cutoff;
        }
        if let Some(min_confidence) = env_parse::<f32>("RETRIEVAL_MIN_CONFIDENCE")? {
            config.min_confidence = min_confidence;
        }
        if let Some(top_k) = env_parse::<usize>("RETRIEVAL_TOP_K")? {
            config.top_k = top_k;
        }
        if let Some(chars) = env_parse::<usize>("MAX_CONTEXT_CHARS")? {
            config.max_context_chars = chars;
        }
        if let Some(secs) = env_parse::<u64>("LLM_TIMEOUT_SECS")? {
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("RETRIEVAL_TIMEOUT_SECS")? {
            config.retrieval_timeout = Duration::from_secs(secs);
        }
        if let Some(tokens) = env_parse::<u32>("LLM_MAX_TOKENS")? {
            config.llm_max_tokens = tokens;
        }
        if let Some(capacity) = env_parse::<usize>("SESSION_CAPACITY")? {
            config.session_capacity = capacity;
        }
        if let Some(mins) = env_parse::<u64>("SESSION_TTL_MINUTES")? {
            config.session_ttl = Duration::from_secs(mins * 60);
        }

        config.validate()?;
        Ok(config)
    }

    /// Fail fast on nonsense values rather than serving degraded math.
    pub fn validate(&self) -> Result<()> {
        if !(self.distance_cutoff > 0.0 && self.distance_cutoff <= 2.0) {
            return Err(AdvisorError::Configuration(format!(
                "distance_cutoff must be in (0, 2], got {}",
                self.distance_cutoff
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(AdvisorError::Configuration(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.top_k == 0 {
            return Err(AdvisorError::Configuration(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.max_context_chars == 0 {
            return Err(AdvisorError::Configuration(
                "max_context_chars must be at least 1".to_string(),
            ));
        }
        if self.llm_max_tokens == 0 {
            return Err(AdvisorError::Configuration(
                "llm_max_tokens must be at least 1".to_string(),
            ));
        }
        if self.session_capacity == 0 {
            return Err(AdvisorError::Configuration(
                "session_capacity must be at least 1".to_string(),
            ));
        }
        if self.llm_timeout.is_zero() || self.retrieval_timeout.is_zero() {
            return Err(AdvisorError::Configuration(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retrieval(&self) -> RetrievalConfig {
        RetrievalConfig {
            top_k: self.top_k,
            distance_cutoff: self.distance_cutoff,
            min_confidence: self.min_confidence,
            timeout: self.retrieval_timeout,
        }
    }
}
