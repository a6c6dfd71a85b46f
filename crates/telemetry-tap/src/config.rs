//! Injected relevance filters.
//!
//! The exact classification criteria are product-specific, so they arrive
//! as configuration data. Severity `error`/`warning` console output is
//! always relevant; the keyword list widens the net, it never narrows it.

use page_port::ConsoleLevel;
use serde::{Deserialize, Serialize};

use crate::Relevance;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TapFilters {
    /// Substrings that make an info-level console message relevant.
    #[serde(default = "default_console_keywords")]
    pub console_keywords: Vec<String>,
    /// Domain substrings a network entry must match to be retained.
    /// Empty retains everything.
    #[serde(default)]
    pub network_domains: Vec<String>,
}

fn default_console_keywords() -> Vec<String> {
    [
        "memory", "heap", "allocation", "canvas", "blob", "export", "render",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for TapFilters {
    fn default() -> Self {
        Self {
            console_keywords: default_console_keywords(),
            network_domains: Vec::new(),
        }
    }
}

impl TapFilters {
    pub fn classify_console(&self, level: ConsoleLevel, text: &str) -> Relevance {
        if matches!(level, ConsoleLevel::Error | ConsoleLevel::Warning) {
            return Relevance::Relevant;
        }
        let lowered = text.to_lowercase();
        if self
            .console_keywords
            .iter()
            .any(|kw| lowered.contains(&kw.to_lowercase()))
        {
            Relevance::Relevant
        } else {
            Relevance::Noise
        }
    }

    pub fn retain_network(&self, url: &str) -> bool {
        if self.network_domains.is_empty() {
            return true;
        }
        let lowered = url.to_lowercase();
        self.network_domains
            .iter()
            .any(|domain| lowered.contains(&domain.to_lowercase()))
    }
}
