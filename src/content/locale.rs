use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::catalog::CatalogError;

const BUILTIN_STRINGS: &str = include_str!("../../assets/locale/silent_echo.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
    Pl,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Fr, Language::En, Language::Pl];

    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
            Language::Pl => "pl",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Language::Fr),
            "en" => Ok(Language::En),
            "pl" => Ok(Language::Pl),
            other => Err(format!("unsupported language '{other}' (expected fr, en or pl)")),
        }
    }
}

/// A string key plus named arguments, rendered late by a [`Translator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<(String, String)>,
}

impl Message {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((name.into(), value.to_string()));
        self
    }
}

pub trait Translator {
    fn lookup(&self, language: Language, key: &str) -> Option<&str>;

    /// Falls back to `default`, then to the key itself.
    fn translate<'a>(&'a self, language: Language, key: &'a str, default: Option<&'a str>) -> &'a str {
        self.lookup(language, key).or(default).unwrap_or(key)
    }

    fn render(&self, language: Language, message: &Message) -> String {
        let mut text = self.translate(language, &message.key, None).to_string();
        for (name, value) in &message.args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringTable {
    entries: HashMap<Language, HashMap<String, String>>,
}

impl StringTable {
    /// Labels and case text for the shipped case.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_STRINGS)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(raw).map_err(|source| CatalogError::Json {
            path: "<inline>".to_string(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| CatalogError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn insert(&mut self, language: Language, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(language)
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Entries from `other` override existing ones.
    pub fn merge(&mut self, other: StringTable) {
        for (language, strings) in other.entries {
            self.entries.entry(language).or_default().extend(strings);
        }
    }

    pub fn len(&self, language: Language) -> usize {
        self.entries.get(&language).map_or(0, HashMap::len)
    }
}

impl Translator for StringTable {
    fn lookup(&self, language: Language, key: &str) -> Option<&str> {
        self.entries
            .get(&language)
            .and_then(|strings| strings.get(key))
            .map(String::as_str)
    }
}
