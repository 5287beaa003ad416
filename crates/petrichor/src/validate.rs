//! String validators composed out of length and regex checks.

use regex::Regex;

pub trait StringValidator: Send + Sync {
    fn is_valid(&self, s: &str) -> bool;
}

/// Inclusive bounds on byte length.
#[derive(Debug, Clone, Copy)]
pub struct LengthValidator {
    pub min: usize,
    pub max: usize,
}

impl LengthValidator {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl StringValidator for LengthValidator {
    fn is_valid(&self, s: &str) -> bool {
        s.len() >= self.min && s.len() <= self.max
    }
}

/// Valid when the pattern matches somewhere in the input.
#[derive(Debug, Clone)]
pub struct RegexMatch(pub Regex);

impl StringValidator for RegexMatch {
    fn is_valid(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

/// Valid when the pattern matches nowhere. Used with disallowed-character
/// classes like `[^a-z-]+`.
#[derive(Debug, Clone)]
pub struct RegexNoMatch(pub Regex);

impl StringValidator for RegexNoMatch {
    fn is_valid(&self, s: &str) -> bool {
        !self.0.is_match(s)
    }
}

/// All members must pass.
#[derive(Default)]
pub struct ValidatorGroup {
    validators: Vec<Box<dyn StringValidator>>,
}

impl ValidatorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, v: impl StringValidator + 'static) -> Self {
        self.validators.push(Box::new(v));
        self
    }

    /// Length bounds plus a disallowed-character pattern: the shape of
    /// nearly every text field in the game.
    pub fn length_and_charset(min: usize, max: usize, disallowed: &Regex) -> Self {
        Self::new()
            .with(LengthValidator::new(min, max))
            .with(RegexNoMatch(disallowed.clone()))
    }
}

impl StringValidator for ValidatorGroup {
    fn is_valid(&self, s: &str) -> bool {
        self.validators.iter().all(|v| v.is_valid(s))
    }
}

impl std::fmt::Debug for ValidatorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorGroup")
            .field("validators", &self.validators.len())
            .finish()
    }
}
