//! Typed, defaulted view over an extension's declared metadata

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::ui::UiContext;

/// Label used for missing or unknown categories
pub const DEFAULT_CATEGORY: &str = "Other";

pub const DEFAULT_DESCRIPTION: &str = "No description for this extension.";

/// Machine category keys and their display labels
const CATEGORIES: &[(&str, &str)] = &[
    ("desktop-integration", "Desktop Integration"),
    ("interface", "Interface"),
    ("post-download", "Post download"),
];

/// Display priority of well-known fields
const SORT_KEYS: &[(&str, u8)] = &[
    ("title", 1),
    ("description", 2),
    ("category", 3),
    ("authors", 4),
    ("only_for", 5),
    ("mandatory_in", 6),
    ("disable_in", 7),
];

fn sort_priority(field: &str) -> u8 {
    SORT_KEYS
        .iter()
        .find(|(k, _)| *k == field)
        .map_or(99, |(_, priority)| *priority)
}

/// A field was read that is neither declared nor has a default
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing metadata attribute: {0}")]
pub struct MissingAttribute(pub String);

/// Default for an undeclared field.
///
/// `Ok(None)` means the field is optional and absent.
pub fn field_default(field: &str) -> Result<Option<&'static str>, MissingAttribute> {
    match field {
        "description" => Ok(Some(DEFAULT_DESCRIPTION)),
        "doc" | "payment" => Ok(None),
        _ => Err(MissingAttribute(field.to_string())),
    }
}

/// Display label for a category key
pub fn category_label(key: &str) -> &'static str {
    CATEGORIES
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(DEFAULT_CATEGORY, |(_, label)| *label)
}

/// Metadata of one extension. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionMetadata {
    title: String,
    category: String,
    description: Option<String>,
    authors: Option<String>,
    only_for: Option<String>,
    mandatory_in: Option<String>,
    disable_in: Option<String>,
    doc: Option<String>,
    payment: Option<String>,
    /// Any other declared field
    extra: BTreeMap<String, String>,
}

impl ExtensionMetadata {
    /// Build from parsed fields. The title falls back to `name`, and the
    /// category is replaced by its (translated) display label.
    pub fn new(
        name: &str,
        mut fields: BTreeMap<String, String>,
        translate: &dyn Fn(&str) -> String,
    ) -> Self {
        let title = fields.remove("title").unwrap_or_else(|| name.to_string());
        let category = fields
            .remove("category")
            .map_or(DEFAULT_CATEGORY, |key| category_label(&key));

        Self {
            title,
            category: translate(category),
            description: fields.remove("description"),
            authors: fields.remove("authors"),
            only_for: fields.remove("only_for"),
            mandatory_in: fields.remove("mandatory_in"),
            disable_in: fields.remove("disable_in"),
            doc: fields.remove("doc"),
            payment: fields.remove("payment"),
            extra: fields,
        }
    }

    /// The declared value of a field, without defaults
    pub fn declared(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "category" => Some(&self.category),
            "description" => self.description.as_deref(),
            "authors" => self.authors.as_deref(),
            "only_for" => self.only_for.as_deref(),
            "mandatory_in" => self.mandatory_in.as_deref(),
            "disable_in" => self.disable_in.as_deref(),
            "doc" => self.doc.as_deref(),
            "payment" => self.payment.as_deref(),
            other => self.extra.get(other).map(String::as_str),
        }
    }

    /// The declared value of a field, falling back to its default
    pub fn get(&self, field: &str) -> Result<Option<&str>, MissingAttribute> {
        match self.declared(field) {
            Some(value) => Ok(Some(value)),
            None => field_default(field),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn authors(&self) -> Option<&str> {
        self.authors.as_deref()
    }

    pub fn only_for(&self) -> Option<&str> {
        self.only_for.as_deref()
    }

    pub fn mandatory_in(&self) -> Option<&str> {
        self.mandatory_in.as_deref()
    }

    pub fn disable_in(&self) -> Option<&str> {
        self.disable_in.as_deref()
    }

    /// Documentation URL
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Donation URL
    pub fn payment(&self) -> Option<&str> {
        self.payment.as_deref()
    }

    /// All declared fields, well-known fields first in display order.
    /// Other fields follow alphabetically.
    pub fn get_sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = [
            "title",
            "description",
            "category",
            "authors",
            "only_for",
            "mandatory_in",
            "disable_in",
            "doc",
            "payment",
        ]
        .into_iter()
        .filter_map(|key| self.declared(key).map(|value| (key, value)))
        .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .collect();

        pairs.sort_by_key(|(key, _)| (sort_priority(key), *key));
        pairs
    }

    /// Whether a comma-separated UI list names any active flag.
    ///
    /// Returns `default` when `target` is not declared.
    pub fn check_ui(&self, target: &str, default: bool, ui: &UiContext) -> bool {
        match self.declared(target) {
            None => default,
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .any(|token| ui.flag(token)),
        }
    }

    pub fn available_for_current_ui(&self, ui: &UiContext) -> bool {
        self.check_ui("only_for", true, ui)
    }

    pub fn mandatory_in_current_ui(&self, ui: &UiContext) -> bool {
        self.check_ui("mandatory_in", false, ui)
    }

    pub fn disable_in_current_ui(&self, ui: &UiContext) -> bool {
        self.check_ui("disable_in", false, ui)
    }
}
