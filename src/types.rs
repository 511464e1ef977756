/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language variants served by the platform. Each one owns an isolated
/// storage partition; nothing references across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Am,
    Or,
    En,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Am, Language::Or, Language::En];

    /// Lowercase code as used in request paths
    pub fn code(&self) -> &'static str {
        match self {
            Language::Am => "am",
            Language::Or => "or",
            Language::En => "en",
        }
    }

    /// Default database name holding this language's collections
    pub fn default_partition_name(&self) -> &'static str {
        match self {
            Language::Am => "AM_courses",
            Language::Or => "OR_courses",
            Language::En => "EN_courses",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language code: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "am" => Ok(Language::Am),
            "or" => Ok(Language::Or),
            "en" => Ok(Language::En),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// The five resource kinds exposed per language partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Programs,
    Courses,
    Modules,
    FinalQuiz,
    Images,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Programs,
        ResourceKind::Courses,
        ResourceKind::Modules,
        ResourceKind::FinalQuiz,
        ResourceKind::Images,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Programs => "programs",
            ResourceKind::Courses => "courses",
            ResourceKind::Modules => "modules",
            ResourceKind::FinalQuiz => "final_quiz",
            ResourceKind::Images => "images",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ResourceKind::Programs => Collection::Programs,
            ResourceKind::Courses => Collection::Courses,
            ResourceKind::Modules => Collection::Modules,
            ResourceKind::FinalQuiz => Collection::FinalQuiz,
            ResourceKind::Images => Collection::Images,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown resource kind: {0}")]
pub struct UnknownResource(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

/// Physical collections known to the document stores.
/// Certificates live in their own partition and are not a public resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Programs,
    Courses,
    Modules,
    FinalQuiz,
    Images,
    Certificates,
}

impl Collection {
    pub const COURSE_CONTENT: [Collection; 5] = [
        Collection::Programs,
        Collection::Courses,
        Collection::Modules,
        Collection::FinalQuiz,
        Collection::Images,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::Programs => "programs",
            Collection::Courses => "courses",
            Collection::Modules => "modules",
            Collection::FinalQuiz => "final_quiz",
            Collection::Images => "images",
            Collection::Certificates => "certificates",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_codes_case_insensitively() {
        assert_eq!("am".parse::<Language>().unwrap(), Language::Am);
        assert_eq!("OR".parse::<Language>().unwrap(), Language::Or);
        assert_eq!("En".parse::<Language>().unwrap(), Language::En);
        assert!("xx".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }

    #[test]
    fn resource_kinds_map_to_their_collections() {
        assert_eq!("final_quiz".parse::<ResourceKind>().unwrap(), ResourceKind::FinalQuiz);
        assert_eq!(ResourceKind::Images.collection(), Collection::Images);
        assert!("certificates".parse::<ResourceKind>().is_err());
        assert!("Programs".parse::<ResourceKind>().is_err());
    }
}
