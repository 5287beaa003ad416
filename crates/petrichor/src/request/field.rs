use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::FieldStatus;
use crate::validate::StringValidator;

/// Who fills a field in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFor {
    Player,
    Reviewer,
}

/// Bounds on a multi-valued field such as keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubfieldConfig {
    pub min_values: usize,
    pub max_values: usize,
    pub require: bool,
}

impl SubfieldConfig {
    pub const fn new(min_values: usize, max_values: usize) -> Self {
        Self {
            min_values,
            max_values,
            require: true,
        }
    }
}

pub struct FieldDef {
    pub kind: &'static str,
    pub for_: FieldFor,
    pub label: &'static str,
    pub description: &'static str,
    pub validator: Box<dyn StringValidator>,
    pub subfields: Option<SubfieldConfig>,
}

impl FieldDef {
    pub fn builder(kind: &'static str) -> FieldDefBuilder {
        FieldDefBuilder {
            kind,
            for_: FieldFor::Player,
            label: "",
            description: "",
            validator: None,
            subfields: None,
        }
    }

    pub fn for_player(&self) -> bool {
        self.for_ == FieldFor::Player
    }

    pub fn for_reviewer(&self) -> bool {
        self.for_ == FieldFor::Reviewer
    }

    pub fn is_valid(&self, v: &str) -> bool {
        self.validator.is_valid(v)
    }

    /// Validates the stored form of a field: its value, or its subfields
    /// when it has them.
    pub fn is_field_valid(&self, f: &RequestField) -> bool {
        match self.subfields {
            Some(cfg) => self.are_subfields_valid(cfg, &f.subfields),
            None => self.is_valid(&f.value),
        }
    }

    pub fn are_subfields_valid(&self, cfg: SubfieldConfig, values: &[String]) -> bool {
        if values.is_empty() && !cfg.require {
            return true;
        }
        (cfg.min_values..=cfg.max_values).contains(&values.len())
            && values.iter().all(|v| self.is_valid(v))
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("kind", &self.kind)
            .field("for", &self.for_)
            .field("label", &self.label)
            .field("subfields", &self.subfields)
            .finish()
    }
}

pub struct FieldDefBuilder {
    kind: &'static str,
    for_: FieldFor,
    label: &'static str,
    description: &'static str,
    validator: Option<Box<dyn StringValidator>>,
    subfields: Option<SubfieldConfig>,
}

impl FieldDefBuilder {
    pub fn for_(mut self, for_: FieldFor) -> Self {
        self.for_ = for_;
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn validator(mut self, v: impl StringValidator + 'static) -> Self {
        self.validator = Some(Box::new(v));
        self
    }

    pub fn subfields(mut self, cfg: SubfieldConfig) -> Self {
        self.subfields = Some(cfg);
        self
    }

    /// A field built without a validator accepts nothing.
    pub fn build(self) -> FieldDef {
        FieldDef {
            kind: self.kind,
            for_: self.for_,
            label: self.label,
            description: self.description,
            validator: self.validator.unwrap_or_else(|| Box::new(RejectAll)),
            subfields: self.subfields,
        }
    }
}

struct RejectAll;

impl StringValidator for RejectAll {
    fn is_valid(&self, _: &str) -> bool {
        false
    }
}

/// Ordered field definitions with lookup by type.
#[derive(Debug)]
pub struct FieldGroup {
    list: Vec<FieldDef>,
    index: HashMap<&'static str, usize>,
}

impl FieldGroup {
    pub fn new(list: Vec<FieldDef>) -> Self {
        let index = list.iter().enumerate().map(|(i, f)| (f.kind, i)).collect();
        Self { list, index }
    }

    pub fn list(&self) -> &[FieldDef] {
        &self.list
    }

    pub fn get(&self, kind: &str) -> Option<&FieldDef> {
        self.index.get(kind).map(|i| &self.list[*i])
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.index.contains_key(kind)
    }

    pub fn player_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.list.iter().filter(|f| f.for_player())
    }

    pub fn reviewer_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.list.iter().filter(|f| f.for_reviewer())
    }

    /// Every player field holds a valid value.
    pub fn is_ready(&self, fields: &FieldMap) -> bool {
        self.player_fields()
            .all(|fd| fields.get(fd.kind).is_some_and(|f| fd.is_field_valid(f)))
    }

    /// First player field, in order, still without a value.
    pub fn next_incomplete(&self, fields: &FieldMap) -> Option<NextField> {
        let player: Vec<&FieldDef> = self.player_fields().collect();
        let n = player.len();
        player.into_iter().enumerate().find_map(|(i, fd)| {
            let empty = fields.get(fd.kind).map_or(true, |f| f.value.is_empty());
            empty.then_some(NextField {
                kind: fd.kind,
                last: i + 1 == n,
            })
        })
    }

    /// First player field, in order, the reviewer has not ruled on.
    pub fn next_unreviewed(&self, fields: &FieldMap) -> Option<NextField> {
        let player: Vec<&FieldDef> = self.player_fields().collect();
        let n = player.len();
        player.into_iter().enumerate().find_map(|(i, fd)| {
            let unreviewed = fields
                .get(fd.kind)
                .map_or(true, |f| f.status == FieldStatus::NotReviewed);
            unreviewed.then_some(NextField {
                kind: fd.kind,
                last: i + 1 == n,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextField {
    pub kind: &'static str,
    /// No further fields follow this one.
    pub last: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestField {
    pub kind: String,
    #[serde(default)]
    pub value: String,
    pub status: FieldStatus,
    #[serde(default)]
    pub subfields: Vec<String>,
}

impl RequestField {
    pub fn empty(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: String::new(),
            status: FieldStatus::NotReviewed,
            subfields: Vec::new(),
        }
    }
}

pub type FieldMap = BTreeMap<String, RequestField>;
