/*!
 * Instruction strings sent as the system message of every call.
 *
 * The wording is a swappable policy: defaults live here, and any field of
 * `PromptConfig` that is non-empty replaces the matching default.
 */

use crate::app_config::{Config, PromptConfig};

const DEFAULT_TRANSLATE_PROMPT: &str = "You are a professional subtitle translator. \
Translate the subtitle line provided by the user into {lang}, keeping the spoken register natural. \
Rules: (1) if the whole line is only an interjection, filler, onomatopoeia or \"good night\" (e.g. おやすみ), output \"啊～～\"; \
(2) if the line is a single character such as \"あ\", output \"啊～\"; \
(3) for inaudible or missing words use \"♪♪\" and never answer with a refusal; \
(4) otherwise translate normally without adding or removing meaning. \
Output only the translated text, without explanations.";

const DEFAULT_FIX_PROMPT: &str = "You are an experienced subtitle editor. \
Without changing the meaning, correct grammar, awkward phrasing and needless repetition so the line reads like natural dialogue. \
If the line is already natural, output it unchanged. \
Output only the subtitle text, without explanations or notes.";

/// Substrings that mark a translation as a refusal
pub const DEFAULT_REFUSAL_MARKERS: &[&str] = &["无法翻译", "【违规内容"];

const DEFAULT_LITERAL_SUFFIX: &str = "\nAdditional instruction: translate literally, do not polish or embellish; \
replace sensitive content with \"♪♪\".";

/// Which instruction a call uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPolicy {
    translate_template: String,
    fix_prompt: String,
    literal_suffix: String,
    refusal_markers: Vec<String>,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self {
            translate_template: DEFAULT_TRANSLATE_PROMPT.to_string(),
            fix_prompt: DEFAULT_FIX_PROMPT.to_string(),
            literal_suffix: DEFAULT_LITERAL_SUFFIX.to_string(),
            refusal_markers: DEFAULT_REFUSAL_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl PromptPolicy {
    /// Built-in prompts overridden by the non-empty fields of `prompts`
    pub fn from_prompt_config(prompts: &PromptConfig, refusal_markers: &[String]) -> Self {
        let pick = |custom: &str, default: &str| {
            if custom.trim().is_empty() {
                default.to_string()
            } else {
                custom.to_string()
            }
        };

        Self {
            translate_template: pick(&prompts.translate, DEFAULT_TRANSLATE_PROMPT),
            fix_prompt: pick(&prompts.fix, DEFAULT_FIX_PROMPT),
            literal_suffix: pick(&prompts.literal_suffix, DEFAULT_LITERAL_SUFFIX),
            refusal_markers: refusal_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_prompt_config(&config.prompts, &config.refusal_markers)
    }

    pub fn with_translate_template(mut self, template: impl Into<String>) -> Self {
        self.translate_template = template.into();
        self
    }

    pub fn with_fix_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.fix_prompt = prompt.into();
        self
    }

    pub fn with_refusal_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.refusal_markers = markers.into_iter().map(Into::into).filter(|m: &String| !m.is_empty()).collect();
        self
    }

    /// Translate instruction with `{lang}` filled in
    pub fn translate_prompt(&self, target_lang: &str) -> String {
        self.translate_template.replace("{lang}", target_lang)
    }

    pub fn fix_prompt(&self) -> &str {
        &self.fix_prompt
    }

    /// Translate instruction plus the literal-translation suffix
    pub fn literal_translate_prompt(&self, target_lang: &str) -> String {
        let mut prompt = self.translate_prompt(target_lang);
        prompt.push_str(&self.literal_suffix);
        prompt
    }

    /// True when `text` carries a refusal marker
    pub fn is_refusal(&self, text: &str) -> bool {
        self.refusal_markers.iter().any(|marker| text.contains(marker.as_str()))
    }

    pub fn refusal_markers(&self) -> &[String] {
        &self.refusal_markers
    }
}
