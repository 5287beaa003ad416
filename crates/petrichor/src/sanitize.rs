use regex::Regex;

pub trait StringSanitizer: Send + Sync {
    fn sanitize(&self, s: &str) -> String;
}

/// Strips every match of the pattern.
#[derive(Debug, Clone)]
pub struct RegexSanitizer(pub Regex);

impl StringSanitizer for RegexSanitizer {
    fn sanitize(&self, s: &str) -> String {
        self.0.replace_all(s, "").into_owned()
    }
}
