//! Language tags for the embedded languages of a composite file.
//!
//! The set of languages is fixed: a composite root, the host script
//! languages, the markup template language and the style dialects.

use serde::Serialize;

/// Language id of composite source files.
pub const TREATY_LANGUAGE_ID: &str = "treaty";

/// File extension of composite source files.
pub const TREATY_EXTENSION: &str = "treaty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageTag {
    Treaty,
    TypeScript,
    JavaScript,
    Html,
    Css,
    Scss,
    Less,
}

/// Script kinds understood by the script engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScriptKind {
    Js = 1,
    Ts = 3,
    Deferred = 7,
}

impl LanguageTag {
    /// Parse a host language id (e.g. `"scss"`, `"typescript"`).
    pub fn from_language_id(language_id: &str) -> Option<Self> {
        match language_id {
            TREATY_LANGUAGE_ID => Some(LanguageTag::Treaty),
            "typescript" | "ts" => Some(LanguageTag::TypeScript),
            "javascript" | "js" => Some(LanguageTag::JavaScript),
            "html" => Some(LanguageTag::Html),
            "css" => Some(LanguageTag::Css),
            "scss" => Some(LanguageTag::Scss),
            "less" => Some(LanguageTag::Less),
            _ => None,
        }
    }

    pub fn language_id(&self) -> &'static str {
        match self {
            LanguageTag::Treaty => TREATY_LANGUAGE_ID,
            LanguageTag::TypeScript => "typescript",
            LanguageTag::JavaScript => "javascript",
            LanguageTag::Html => "html",
            LanguageTag::Css => "css",
            LanguageTag::Scss => "scss",
            LanguageTag::Less => "less",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            LanguageTag::Treaty => TREATY_EXTENSION,
            LanguageTag::TypeScript => "ts",
            LanguageTag::JavaScript => "js",
            LanguageTag::Html => "html",
            LanguageTag::Css => "css",
            LanguageTag::Scss => "scss",
            LanguageTag::Less => "less",
        }
    }

    pub fn is_style(&self) -> bool {
        matches!(self, LanguageTag::Css | LanguageTag::Scss | LanguageTag::Less)
    }

    pub fn is_script(&self) -> bool {
        matches!(self, LanguageTag::TypeScript | LanguageTag::JavaScript)
    }

    /// Script kind for script-like languages.
    pub fn script_kind(&self) -> Option<ScriptKind> {
        match self {
            LanguageTag::TypeScript => Some(ScriptKind::Ts),
            LanguageTag::JavaScript => Some(ScriptKind::Js),
            LanguageTag::Treaty => Some(ScriptKind::Deferred),
            LanguageTag::Html | LanguageTag::Css | LanguageTag::Scss | LanguageTag::Less => None,
        }
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.language_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("treaty", Some(LanguageTag::Treaty))]
    #[case("typescript", Some(LanguageTag::TypeScript))]
    #[case("js", Some(LanguageTag::JavaScript))]
    #[case("scss", Some(LanguageTag::Scss))]
    #[case("stylus", None)]
    #[case("", None)]
    fn test_from_language_id(#[case] id: &str, #[case] expected: Option<LanguageTag>) {
        assert_eq!(LanguageTag::from_language_id(id), expected);
    }

    #[test]
    fn test_language_id_round_trips() {
        for tag in [
            LanguageTag::Treaty,
            LanguageTag::TypeScript,
            LanguageTag::JavaScript,
            LanguageTag::Html,
            LanguageTag::Css,
            LanguageTag::Scss,
            LanguageTag::Less,
        ] {
            assert_eq!(LanguageTag::from_language_id(tag.language_id()), Some(tag));
        }
    }

    #[test]
    fn test_script_kinds() {
        assert_eq!(LanguageTag::TypeScript.script_kind(), Some(ScriptKind::Ts));
        assert_eq!(LanguageTag::JavaScript.script_kind(), Some(ScriptKind::Js));
        assert_eq!(LanguageTag::Css.script_kind(), None);
        assert_eq!(ScriptKind::Deferred as i32, 7);
    }
}
