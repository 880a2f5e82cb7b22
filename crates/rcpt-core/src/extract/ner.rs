//! Named-entity recognition capability.
//!
//! The extraction pipeline only needs organization and money entities.
//! A recognizer is expensive to build (gazetteers, models) and is built
//! once at startup, then shared read-only between extraction calls.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rules::patterns::MONEY_ENTITY;
use crate::error::ExtractionError;
use crate::models::config::NerConfig;

/// Category of a recognized entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    /// Company, store or brand name.
    Organization,
    /// Monetary value, usually with a currency marker.
    Money,
}

/// An entity span recognized in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub category: EntityCategory,
    pub text: String,
}

impl Entity {
    pub fn new(category: EntityCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }
}

/// Recognizes entities in raw receipt text.
///
/// Implementations must be safe to share between threads; `recognize`
/// takes `&self` and must not mutate shared state.
pub trait EntityRecognizer: Send + Sync {
    /// Entities in the order they appear in `text`.
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, ExtractionError>;
}

/// Gazetteer and pattern based recognizer.
///
/// Organizations are known merchant names (case-insensitive) or lines
/// carrying a corporate suffix such as `Inc` or `LLC`. Money entities are
/// amounts with a currency symbol or code.
#[derive(Debug, Clone)]
pub struct RuleBasedRecognizer {
    merchants: Vec<String>,
    suffixes: Option<Regex>,
}

impl RuleBasedRecognizer {
    pub fn new(merchants: Vec<String>, org_suffixes: &[String]) -> Self {
        let alternatives: Vec<String> = org_suffixes
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| regex::escape(s.trim()))
            .collect();

        let suffixes = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|"))).ok()
        };

        Self {
            merchants: merchants
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            suffixes,
        }
    }

    /// Build from configuration, loading the merchant gazetteer if one is set.
    pub fn from_config(config: &NerConfig) -> crate::Result<Self> {
        let merchants = match &config.merchants_file {
            Some(path) => load_merchants(path)?,
            None => Vec::new(),
        };
        info!("Entity recognizer ready with {} known merchants", merchants.len());

        Ok(Self::new(merchants, &config.org_suffixes))
    }

    fn organizations(&self, text: &str) -> Vec<(usize, Entity)> {
        let mut found = Vec::new();
        let lowered = text.to_lowercase();

        for merchant in &self.merchants {
            if let Some(pos) = lowered.find(&merchant.to_lowercase()) {
                found.push((pos, Entity::new(EntityCategory::Organization, merchant.clone())));
            }
        }

        if let Some(suffixes) = &self.suffixes {
            let mut offset = 0;
            for line in text.split_inclusive('\n') {
                let trimmed = line.trim();
                if is_name_line(trimmed) && suffixes.is_match(trimmed) {
                    found.push((offset, Entity::new(EntityCategory::Organization, trimmed)));
                }
                offset += line.len();
            }
        }

        found
    }
}

/// Store numbers, addresses and phone lines are never the merchant name.
fn is_name_line(line: &str) -> bool {
    !line.is_empty() && !line.chars().any(|c| c.is_ascii_digit() || c == '#')
}

impl Default for RuleBasedRecognizer {
    fn default() -> Self {
        Self::new(Vec::new(), &NerConfig::default().org_suffixes)
    }
}

impl EntityRecognizer for RuleBasedRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<Entity>, ExtractionError> {
        let mut found = self.organizations(text);

        for m in MONEY_ENTITY.find_iter(text) {
            found.push((m.start(), Entity::new(EntityCategory::Money, m.as_str())));
        }

        found.sort_by_key(|(pos, _)| *pos);
        debug!("Recognized {} entities", found.len());

        Ok(found.into_iter().map(|(_, entity)| entity).collect())
    }
}

/// Read a newline-delimited merchant list; blank lines and `#` comments are skipped.
pub fn load_merchants(path: &Path) -> crate::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}
