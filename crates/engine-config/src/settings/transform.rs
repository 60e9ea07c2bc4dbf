use std::collections::HashMap;

pub const DEFAULT_FORBIDDEN_DOMAIN: &str = "offshorecorptalk.com";

/// Content rules applied to rows on their way to the forum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSettings {
    /// Rows linking to this domain are dropped; links in kept rows are stripped.
    pub forbidden_domain: String,
}

impl Default for TransformSettings {
    fn default() -> Self {
        TransformSettings {
            forbidden_domain: DEFAULT_FORBIDDEN_DOMAIN.to_string(),
        }
    }
}

impl TransformSettings {
    pub fn from_env(vars: &HashMap<String, String>) -> Self {
        match vars.get("FORBIDDEN_DOMAIN").map(|v| v.trim()) {
            Some(domain) if !domain.is_empty() => TransformSettings {
                forbidden_domain: domain.to_lowercase(),
            },
            _ => TransformSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_domain_override() {
        let mut vars = HashMap::new();
        assert_eq!(
            TransformSettings::from_env(&vars).forbidden_domain,
            DEFAULT_FORBIDDEN_DOMAIN
        );

        vars.insert("FORBIDDEN_DOMAIN".to_string(), "  Example.ORG ".to_string());
        assert_eq!(TransformSettings::from_env(&vars).forbidden_domain, "example.org");

        vars.insert("FORBIDDEN_DOMAIN".to_string(), "".to_string());
        assert_eq!(
            TransformSettings::from_env(&vars).forbidden_domain,
            DEFAULT_FORBIDDEN_DOMAIN
        );
    }
}
