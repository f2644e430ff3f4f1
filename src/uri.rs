//! URIs for embedded virtual codes.
//!
//! An embedded code lives beside its host file so that language engines can
//! resolve relative imports and find project configuration:
//! `file:///project/src/app.treaty` + `css_0` -> `file:///project/src/app.treaty.css_0.css`.
//!
//! Hosts whose URL cannot be a base (`untitled:`, `data:`) fall back to
//! `treaty:///embedded/{encoded host}/{file}.{id}.{ext}`.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::language::LanguageTag;

/// Scheme used when the host URL cannot carry a sibling path.
pub const FALLBACK_SCHEME: &str = "treaty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDocumentUri {
    host: Url,
    code_id: String,
    language: LanguageTag,
}

impl EmbeddedDocumentUri {
    pub fn new(host: &Url, code_id: &str, language: LanguageTag) -> Self {
        debug_assert!(!code_id.is_empty(), "code id must not be empty");
        Self {
            host: host.clone(),
            code_id: code_id.to_string(),
            language,
        }
    }

    pub fn code_id(&self) -> &str {
        &self.code_id
    }

    pub fn language(&self) -> LanguageTag {
        self.language
    }

    fn host_file_name(&self) -> &str {
        let path = self.host.path();
        path.rsplit('/').next().unwrap_or(path)
    }

    /// `{host file}.{code id}.{extension}`
    pub fn file_name(&self) -> String {
        format!(
            "{}.{}.{}",
            self.host_file_name(),
            self.code_id,
            self.language.extension()
        )
    }

    pub fn to_uri_string(&self) -> String {
        let file_name = self.file_name();

        let mut url = self.host.clone();
        let modified = url
            .path_segments_mut()
            .map(|mut segments| {
                segments.pop();
                segments.push(&file_name);
            })
            .is_ok();
        if modified {
            url.set_query(None);
            url.set_fragment(None);
            return url.to_string();
        }

        let encoded_host = utf8_percent_encode(self.host.as_str(), NON_ALPHANUMERIC);
        let encoded_file = utf8_percent_encode(&file_name, NON_ALPHANUMERIC);
        format!("{FALLBACK_SCHEME}:///embedded/{encoded_host}/{encoded_file}")
    }

    pub fn to_url(&self) -> Option<Url> {
        Url::parse(&self.to_uri_string()).ok()
    }

    /// Whether `uri` names an embedded code of `host`.
    pub fn is_embedded_uri(uri: &str, host: &Url) -> bool {
        let Ok(url) = Url::parse(uri) else {
            return false;
        };
        let Some(file_name) = url.path_segments().and_then(|mut s| s.next_back()) else {
            return false;
        };
        let host_name = EmbeddedDocumentUri::new(host, "_", LanguageTag::Treaty)
            .host_file_name()
            .to_string();
        let host_encoded = utf8_percent_encode(&host_name, NON_ALPHANUMERIC).to_string();

        [host_name, host_encoded].iter().any(|prefix| {
            file_name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.').or_else(|| rest.strip_prefix("%2E")))
                .is_some_and(|rest| rest.contains('.') || rest.contains("%2E"))
        })
    }
}
