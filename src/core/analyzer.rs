use crate::config::AnalyzerConfig;
use crate::core::llm::OllamaClient;
use crate::domain::model::{Classification, Verdict};
use crate::domain::ports::RelevanceClassifier;
use crate::utils::error::{FocusError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const KNOWN_SITES: &[(&str, &str)] = &[
    ("youtube", "youtube.com"),
    ("wikipedia", "wikipedia.org"),
    ("stack overflow", "stackoverflow.com"),
    ("github", "github.com"),
];

type ClassificationKey = (String, String, String, String);

/// Scores window titles against a goal, through the LLM when it is reachable.
pub struct ContentAnalyzer {
    llm: OllamaClient,
    config: AnalyzerConfig,
    titled_domain: Regex,
    bare_domain: Regex,
    word: Regex,
    json_array: Regex,
    keyword_cache: Mutex<HashMap<(String, String), Vec<String>>>,
    classification_cache: Mutex<HashMap<ClassificationKey, Verdict>>,
}

impl ContentAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| FocusError::ConfigError {
                message: format!("invalid pattern {}: {}", pattern, e),
            })
        };

        Ok(Self {
            llm: OllamaClient::new(&config),
            titled_domain: compile(r"- ([^-]+\.com)")?,
            bare_domain: compile(r"([^|\s]+\.[a-z]{2,4})")?,
            word: compile(r"\w+")?,
            json_array: compile(r"(?s)\[.*\]")?,
            config,
            keyword_cache: Mutex::new(HashMap::new()),
            classification_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn extract_domain(&self, title: &str, process: &str) -> String {
        let title_lower = title.to_lowercase();
        let process_lower = process.to_lowercase();

        if process_lower.contains("code") || title_lower.contains("visual studio code") {
            return "code".to_string();
        }

        for pattern in [&self.titled_domain, &self.bare_domain] {
            if let Some(caps) = pattern.captures(&title_lower) {
                return caps[1].to_string();
            }
        }

        for (name, domain) in KNOWN_SITES {
            if title_lower.contains(name) {
                return domain.to_string();
            }
        }

        process_lower
    }

    /// 目標與描述中的字詞，去除重複並保留順序
    pub fn fallback_keywords(&self, goal: &str, description: &str) -> Vec<String> {
        let text = format!("{} {}", goal, description).to_lowercase();
        let mut seen = HashSet::new();
        self.word
            .find_iter(&text)
            .map(|m| m.as_str().to_string())
            .filter(|w| seen.insert(w.clone()))
            .take(self.config.max_keywords)
            .collect()
    }

    pub fn rule_based_classify(&self, title: &str, domain: &str, keywords: &[String]) -> Verdict {
        let title_lower = title.to_lowercase();
        let mut score = 0.5;

        for keyword in keywords {
            if title_lower.contains(&keyword.to_lowercase()) {
                score += 0.1;
            }
        }

        if self
            .config
            .project_terms
            .iter()
            .any(|term| title_lower.contains(&term.to_lowercase()))
        {
            score += 0.3;
        }

        if self.config.distraction_domains.iter().any(|d| d == domain) {
            score = f64::max(0.05, score - 0.4);
        }

        // 以兩位小數為準，避免 0.1 累加誤差跨過分類門檻
        let score = (score.min(1.0) * 100.0).round() / 100.0;
        Verdict::from_score(score)
    }

    async fn llm_keywords(&self, goal: &str, description: &str) -> Vec<String> {
        let key = (goal.to_string(), description.to_string());
        if let Some(cached) = self.cached_keywords(&key) {
            return cached;
        }

        match self.request_keywords(goal, description).await {
            Ok(keywords) => {
                if let Ok(mut cache) = self.keyword_cache.lock() {
                    cache.insert(key, keywords.clone());
                }
                keywords
            }
            Err(e) => {
                tracing::warn!("LLM keyword generation failed: {}. Using goal words instead", e);
                self.fallback_keywords(goal, description)
            }
        }
    }

    fn cached_keywords(&self, key: &(String, String)) -> Option<Vec<String>> {
        self.keyword_cache.lock().ok()?.get(key).cloned()
    }

    async fn request_keywords(&self, goal: &str, description: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "List keywords that are relevant to this study goal.\n\
             Goal: {goal}\n\
             Description: {description}\n\
             Answer with a JSON array of strings only, between {} and {} entries.\n",
            self.config.min_keywords, self.config.max_keywords
        );

        let content = self.llm.generate(&prompt, self.config.keyword_tokens).await?;
        let mut keywords = self.parse_keyword_array(&content)?;

        if keywords.len() < self.config.min_keywords {
            let extra = format!("{} {}", goal, description).to_lowercase();
            keywords.extend(extra.split_whitespace().map(String::from));
        }
        keywords.truncate(self.config.max_keywords);
        Ok(keywords)
    }

    fn parse_keyword_array(&self, content: &str) -> Result<Vec<String>> {
        let array = self
            .json_array
            .find(content)
            .ok_or_else(|| FocusError::LlmError {
                message: "no JSON array in response".to_string(),
            })?;

        let values: Vec<serde_json::Value> = serde_json::from_str(array.as_str())?;
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    async fn llm_classify(&self, title: &str, goal: &str, description: &str, domain: &str) -> Verdict {
        let key = (
            title.to_string(),
            goal.to_string(),
            description.to_string(),
            domain.to_string(),
        );
        if let Some(cached) = self
            .classification_cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(&key).copied())
        {
            return cached;
        }

        let keywords = self.llm_keywords(goal, description).await;
        let prompt = format!(
            "Decide how relevant this window is to the study goal.\n\
             Window title: {title}\n\
             Study goal: {goal}\n\
             Description: {description}\n\
             Domain: {domain}\n\
             Relevant keywords: {}\n\n\
             Categories: DIRECT, PERIPHERAL, INDIRECT, DISTRACTION.\n\
             Reply with the category name only.\n",
            keywords.join(", ")
        );

        let answer = match self.llm.generate(&prompt, self.config.classify_tokens).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("LLM classification failed: {}. Falling back to rules", e);
                return self.rule_based_classify(title, domain, &keywords);
            }
        };

        match answer.trim().to_uppercase().parse::<Classification>() {
            Ok(classification) => {
                let verdict = Verdict::from_classification(classification);
                if let Ok(mut cache) = self.classification_cache.lock() {
                    cache.insert(key, verdict);
                }
                verdict
            }
            Err(_) => {
                tracing::warn!(
                    "LLM returned an invalid classification '{}'. Falling back to rules",
                    answer.trim()
                );
                self.rule_based_classify(title, domain, &keywords)
            }
        }
    }

    pub async fn calculate_relevance(
        &self,
        title: &str,
        goal: &str,
        description: &str,
        domain: &str,
    ) -> Verdict {
        if self.llm.is_online().await {
            self.llm_classify(title, goal, description, domain).await
        } else {
            tracing::warn!("Ollama server offline. Using keyword-based fallback");
            let keywords = self.fallback_keywords(goal, description);
            self.rule_based_classify(title, domain, &keywords)
        }
    }
}

#[async_trait]
impl RelevanceClassifier for ContentAnalyzer {
    async fn classify(&self, title: &str, goal: &str, description: &str, domain: &str) -> Verdict {
        self.calculate_relevance(title, goal, description, domain).await
    }

    fn extract_domain(&self, title: &str, process: &str) -> String {
        ContentAnalyzer::extract_domain(self, title, process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ContentAnalyzer {
        ContentAnalyzer::new(AnalyzerConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_domain_editor() {
        let a = analyzer();
        assert_eq!(a.extract_domain("main.rs - focus", "Code"), "code");
        assert_eq!(a.extract_domain("lib.rs - Visual Studio Code", "electron"), "code");
    }

    #[test]
    fn test_extract_domain_from_title() {
        let a = analyzer();
        assert_eq!(
            a.extract_domain("Pull requests - github.com - Chromium", "chromium"),
            "github.com"
        );
        assert_eq!(
            a.extract_domain("Ownership doc.rust-lang.org - Firefox", "firefox"),
            "doc.rust-lang.org"
        );
        assert_eq!(a.extract_domain("Rust tutorial - YouTube", "firefox"), "youtube.com");
        assert_eq!(a.extract_domain("Inbox", "Thunderbird"), "thunderbird");
    }

    #[test]
    fn test_fallback_keywords_dedup() {
        let a = analyzer();
        let words = a.fallback_keywords("Deep Learning", "deep nets, learning rates");
        assert_eq!(words, vec!["deep", "learning", "nets", "rates"]);
    }

    #[test]
    fn test_rule_based_keyword_hits() {
        let a = analyzer();
        let keywords = vec!["rust".to_string(), "ownership".to_string(), "borrow".to_string()];

        let verdict = a.rule_based_classify("Rust ownership and borrow rules", "firefox", &keywords);
        assert!((verdict.score - 0.8).abs() < 1e-9);
        assert_eq!(verdict.classification, Classification::Direct);

        let verdict = a.rule_based_classify("Weather today", "firefox", &keywords);
        assert!((verdict.score - 0.5).abs() < 1e-9);
        assert_eq!(verdict.classification, Classification::Indirect);
    }

    #[test]
    fn test_rule_based_distraction_and_project_terms() {
        let a = analyzer();
        let verdict = a.rule_based_classify("Home / X", "twitter.com", &[]);
        assert!((verdict.score - 0.1).abs() < 1e-9);
        assert_eq!(verdict.classification, Classification::Distraction);

        let verdict = a.rule_based_classify("focus-tracker: src/lib.rs", "code", &[]);
        assert!((verdict.score - 0.8).abs() < 1e-9);

        let many: Vec<String> = (0..10).map(|i| format!("k{}", i)).collect();
        let verdict = a.rule_based_classify("k0 k1 k2 k3 k4 k5 k6 k7 k8 k9", "x", &many);
        assert_eq!(verdict.score, 1.0);
    }

    #[test]
    fn test_parse_keyword_array() {
        let a = analyzer();
        let parsed = a
            .parse_keyword_array("Sure! Here:\n[\"cnn\", \"resnet\", 3]\nThanks")
            .unwrap();
        assert_eq!(parsed, vec!["cnn", "resnet"]);
        assert!(a.parse_keyword_array("no list here").is_err());
    }
}
