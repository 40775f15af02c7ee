use finder_core::ConfigError;
use regex::{Regex, RegexBuilder};

/// Pulls the target username out of a summoning comment or message.
///
/// The accepted text is an optional self-mention (`/u/<bot>` or `u/<bot>`), then an
/// optionally `u/`- or `/u/`-prefixed name, with nothing but whitespace around them.
#[derive(Debug, Clone)]
pub struct UsernameExtractor {
    pattern: Regex,
}

impl UsernameExtractor {
    pub fn new(bot_name: &str) -> Result<Self, ConfigError> {
        let source = format!(
            r"\A\s*(?:/?u/{}\s*)?(?:/?u/)?(?P<username>\w+)\s*\z",
            regex::escape(bot_name)
        );
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "reddit.username".to_string(),
                value: e.to_string(),
            })?;
        Ok(Self { pattern })
    }

    /// Returns the lowercased username, or `None` if `text` has any other shape.
    pub fn extract(&self, text: &str) -> Option<String> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.name("username"))
            .map(|m| m.as_str().to_lowercase())
    }
}
