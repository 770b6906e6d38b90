//! Output language handling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of the generated review
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "he")]
    Hebrew,
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// Parse an ISO 639-1 code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "he" | "iw" => Some(Language::Hebrew),
            "en" => Some(Language::English),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Hebrew => "he",
            Language::English => "en",
        }
    }

    /// Locale passed to the chart embed
    pub fn chart_locale(self) -> &'static str {
        match self {
            Language::Hebrew => "he_IL",
            Language::English => "en_US",
        }
    }

    /// Placeholder for missing values in prose
    pub fn not_available(self) -> &'static str {
        match self {
            Language::Hebrew => "לא זמין",
            Language::English => "N/A",
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

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| format!("unsupported language '{s}' (expected he or en)"))
    }
}

/// Escape text interpolated into generated HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
