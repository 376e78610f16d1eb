use ensemble_core::AgentCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one category of specialized agent.
///
/// The orchestrator prefixes each task's assembled prompt with its
/// category's preamble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerProfile {
    /// The category this profile configures.
    pub category: AgentCategory,
    /// Instruction block prepended to every prompt for this category.
    pub preamble: String,
    /// Soft cap on output size, forwarded to invokers that honor it.
    pub max_tokens: u32,
}

/// A lookup table of profiles by category.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: HashMap<AgentCategory, InvokerProfile>,
}

impl ProfileSet {
    /// Build a set from a list of profiles (later entries win on conflict).
    pub fn new(profiles: Vec<InvokerProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.category, p)).collect(),
        }
    }

    /// The preamble for a category, or the empty string if unconfigured.
    pub fn preamble_for(&self, category: AgentCategory) -> &str {
        self.profiles
            .get(&category)
            .map(|p| p.preamble.as_str())
            .unwrap_or("")
    }

    /// The profile for a category, if configured.
    pub fn get(&self, category: AgentCategory) -> Option<&InvokerProfile> {
        self.profiles.get(&category)
    }

    /// Number of configured categories.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profiles are configured.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Create the default profiles for the four built-in categories.
pub fn default_profiles() -> Vec<InvokerProfile> {
    vec![
        InvokerProfile {
            category: AgentCategory::Research,
            preamble: RESEARCH_PREAMBLE.to_string(),
            max_tokens: 1500,
        },
        InvokerProfile {
            category: AgentCategory::Analysis,
            preamble: ANALYSIS_PREAMBLE.to_string(),
            max_tokens: 1500,
        },
        InvokerProfile {
            category: AgentCategory::Writing,
            preamble: WRITING_PREAMBLE.to_string(),
            max_tokens: 2000,
        },
        InvokerProfile {
            category: AgentCategory::Review,
            preamble: REVIEW_PREAMBLE.to_string(),
            max_tokens: 1000,
        },
    ]
}

const RESEARCH_PREAMBLE: &str = "\
You are a research specialist. Gather relevant facts for the task below and \
compile your findings as a concise, sourced summary. Do not analyze or \
editorialize — report what you found.";

const ANALYSIS_PREAMBLE: &str = "\
You are an analysis specialist. Interpret the material provided in context, \
identify patterns and implications, and state your conclusions with the \
reasoning behind them.";

const WRITING_PREAMBLE: &str = "\
You are a writing specialist. Turn the context material into a clear, \
well-structured piece that a reader outside the team can follow. Preserve \
the substance; improve the form.";

const REVIEW_PREAMBLE: &str = "\
You are a review specialist. Check the context material for factual \
consistency, gaps, and unclear passages. List concrete issues; approve \
explicitly if there are none.";
