use crate::error::ForbiddenDomainError;
use model::core::value::Value;
use regex::Regex;
use std::borrow::Cow;

/// A domain whose links must not reach the forum.
///
/// Matching is case-insensitive. `cleanse` removes the scheme and host of
/// every `http(s)://(www.)<domain>` URL, keeping the path and the text
/// around it.
#[derive(Debug, Clone)]
pub struct ForbiddenDomain {
    domain: String,
    url_prefix: Regex,
}

impl ForbiddenDomain {
    pub fn new(domain: &str) -> Result<Self, ForbiddenDomainError> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(ForbiddenDomainError::Empty);
        }
        let url_prefix = Regex::new(&format!(r"(?i)https?://(www\.)?{}", regex::escape(&domain)))?;
        Ok(ForbiddenDomain { domain, url_prefix })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn contains(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.domain)
    }

    pub fn cleanse<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.url_prefix.replace_all(text, "")
    }

    /// Strings and string arrays are inspected; every other value is clean.
    pub fn value_contains(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.contains(s),
            Value::StringArray(items) => items.iter().any(|s| self.contains(s)),
            _ => false,
        }
    }

    /// Returns `None` when the value has nothing to cleanse.
    pub fn cleanse_value(&self, value: &Value) -> Option<Value> {
        match value {
            Value::String(s) => match self.cleanse(s) {
                Cow::Borrowed(_) => None,
                Cow::Owned(cleansed) => Some(Value::String(cleansed)),
            },
            Value::StringArray(items) if items.iter().any(|s| self.url_prefix.is_match(s)) => {
                Some(Value::StringArray(
                    items.iter().map(|s| self.cleanse(s).into_owned()).collect(),
                ))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oct() -> ForbiddenDomain {
        ForbiddenDomain::new("offshorecorptalk.com").unwrap()
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let domain = oct();
        assert!(domain.contains("see https://OffshoreCorpTalk.com/threads/1"));
        assert!(domain.contains("offshorecorptalk.com"));
        assert!(!domain.contains("offshore corp talk"));
    }

    #[test]
    fn test_cleanse_strips_scheme_and_host_only() {
        let domain = oct();
        assert_eq!(
            domain.cleanse("a https://www.offshorecorptalk.com/members/joe.5/ b http://offshorecorptalk.com"),
            "a /members/joe.5/ b "
        );
        assert_eq!(domain.cleanse("https://example.com/x"), "https://example.com/x");
    }

    #[test]
    fn test_dots_in_domain_are_literal() {
        let domain = oct();
        assert_eq!(
            domain.cleanse("https://offshorecorptalkXcom/path"),
            "https://offshorecorptalkXcom/path"
        );
    }

    #[test]
    fn test_value_helpers() {
        let domain = oct();
        assert!(domain.value_contains(&Value::StringArray(vec![
            "tax".into(),
            "https://offshorecorptalk.com/tags/tax".into(),
        ])));
        assert!(!domain.value_contains(&Value::Int(5)));
        assert_eq!(domain.cleanse_value(&Value::String("plain".into())), None);
        assert_eq!(domain.cleanse_value(&Value::Null), None);
        assert_eq!(
            domain.cleanse_value(&Value::StringArray(vec!["https://offshorecorptalk.com/t".into()])),
            Some(Value::StringArray(vec!["/t".into()]))
        );
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        assert!(matches!(ForbiddenDomain::new(""), Err(ForbiddenDomainError::Empty)));
        assert!(matches!(ForbiddenDomain::new("   "), Err(ForbiddenDomainError::Empty)));
    }
}
