pub mod search;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::error::PocError;

/// A declarative proof-of-concept: one or more probe rules plus a top-level
/// expression over their results.
///
/// Loaded once per run from a YAML file and treated as read-only thereafter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Poc {
    pub name: String,
    pub manual: bool,
    pub transport: String,
    pub set: HashMap<String, String>,
    #[serde(deserialize_with = "ordered_rules")]
    pub rules: Vec<(String, Rule)>,
    pub expression: String,
    pub detail: Detail,
}

/// One named probe: a request template plus a match expression.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub request: RequestTemplate,
    pub expression: String,
    pub output: Output,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestTemplate {
    /// HTTP method; an empty string means GET.
    pub method: String,
    /// Path appended to the target base URL, e.g. `/admin/login`.
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub cache: bool,
    pub follow_redirects: bool,
}

/// Per-rule output block. Pass-through for downstream reporting; the
/// evaluator never consults it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Output {
    pub search: String,
    pub filen: String,
}

/// Reporting metadata. Irrelevant to evaluation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Detail {
    pub author: String,
    pub links: Vec<String>,
    pub warning: String,
    pub description: String,
    pub fingerprint: Fingerprint,
    pub vulnerability: Vulnerability,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fingerprint {
    pub id: String,
    pub name: String,
    pub version: String,
    pub cpe: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vulnerability {
    pub id: String,
    pub level: String,
    #[serde(rename = "match")]
    pub matched: String,
}

impl Poc {
    /// Parses a POC definition from YAML text and validates its required
    /// fields. `transport` defaults to `"http"` when omitted.
    pub fn parse(yaml: &str) -> Result<Self, PocError> {
        let mut poc: Poc = serde_yaml::from_str(yaml)?;
        poc.validate()?;
        Ok(poc)
    }

    /// Loads and validates a POC definition from a `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PocError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    fn validate(&mut self) -> Result<(), PocError> {
        if self.name.is_empty() {
            return Err(PocError::MissingField("name"));
        }
        if self.rules.is_empty() {
            return Err(PocError::MissingField("rules"));
        }
        if self.expression.is_empty() {
            return Err(PocError::MissingField("expression"));
        }
        for (i, (name, _)) in self.rules.iter().enumerate() {
            if self.rules[..i].iter().any(|(seen, _)| seen == name) {
                return Err(PocError::DuplicateRule(name.clone()));
            }
        }
        if self.transport.is_empty() {
            self.transport = "http".to_string();
        }
        Ok(())
    }
}

/// Deserializes the `rules` mapping into a vector of `(name, rule)` pairs so
/// that YAML declaration order survives; the engine executes rules in exactly
/// this order.
fn ordered_rules<'de, D>(deserializer: D) -> Result<Vec<(String, Rule)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct RulesVisitor;

    impl<'de> Visitor<'de> for RulesVisitor {
        type Value = Vec<(String, Rule)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of rule name to rule")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut rules = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, Rule>()? {
                rules.push(entry);
            }
            Ok(rules)
        }
    }

    deserializer.deserialize_map(RulesVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: poc-yaml-demo-admin-panel
transport: http
rules:
  r0:
    request:
      method: GET
      path: /admin
    expression: response.status == 200 && response.body.bcontains(b"admin panel")
  r1:
    request:
      method: POST
      path: /admin/login
      headers:
        Content-Type: application/x-www-form-urlencoded
      body: user=admin&pass=admin
      follow_redirects: true
    expression: response.status == 302
expression: r0() && r1()
detail:
  author: demo
  description: exposed admin panel with default credentials
  links:
    - https://example.com/advisory
  vulnerability:
    level: high
    match: admin panel
"#;

    #[test]
    fn test_parse_full_definition() {
        let poc = Poc::parse(SAMPLE).unwrap();

        assert_eq!(poc.name, "poc-yaml-demo-admin-panel");
        assert_eq!(poc.transport, "http");
        assert_eq!(poc.expression, "r0() && r1()");
        assert_eq!(poc.rules.len(), 2);
        assert_eq!(poc.detail.author, "demo");
        assert_eq!(poc.detail.links.len(), 1);
        assert_eq!(poc.detail.vulnerability.level, "high");
        assert_eq!(poc.detail.vulnerability.matched, "admin panel");
    }

    #[test]
    fn test_rule_declaration_order_preserved() {
        let yaml = r#"
name: order-check
rules:
  zeta:
    expression: "true"
  alpha:
    expression: "true"
  mid:
    expression: "true"
expression: zeta() && alpha() && mid()
"#;
        let poc = Poc::parse(yaml).unwrap();
        let names: Vec<&str> = poc.rules.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_rule_template_fields() {
        let poc = Poc::parse(SAMPLE).unwrap();
        let (_, r1) = &poc.rules[1];

        assert_eq!(r1.request.method, "POST");
        assert_eq!(r1.request.path, "/admin/login");
        assert_eq!(r1.request.body, "user=admin&pass=admin");
        assert!(r1.request.follow_redirects);
        assert_eq!(
            r1.request.headers.get("Content-Type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_missing_name_rejected() {
        let yaml = "rules:\n  r0:\n    expression: \"true\"\nexpression: r0()\n";
        assert!(matches!(
            Poc::parse(yaml),
            Err(PocError::MissingField("name"))
        ));
    }

    #[test]
    fn test_missing_rules_rejected() {
        let yaml = "name: x\nexpression: r0()\n";
        assert!(matches!(
            Poc::parse(yaml),
            Err(PocError::MissingField("rules"))
        ));
    }

    #[test]
    fn test_missing_expression_rejected() {
        let yaml = "name: x\nrules:\n  r0:\n    expression: \"true\"\n";
        assert!(matches!(
            Poc::parse(yaml),
            Err(PocError::MissingField("expression"))
        ));
    }

    #[test]
    fn test_transport_defaults_to_http() {
        let yaml = "name: x\nrules:\n  r0:\n    expression: \"true\"\nexpression: r0()\n";
        let poc = Poc::parse(yaml).unwrap();
        assert_eq!(poc.transport, "http");
    }

    #[test]
    fn test_duplicate_rule_name_rejected() {
        // Either the YAML layer or our validation catches the duplicate;
        // the definition must not load.
        let yaml = "name: x\nrules:\n  r0:\n    expression: \"true\"\n  r0:\n    expression: \"false\"\nexpression: r0()\n";
        assert!(Poc::parse(yaml).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let yaml = "name: x\nrules:\n  r0:\n    expression: \"true\"\nexpression: r0()\n";
        let poc = Poc::parse(yaml).unwrap();
        let (_, rule) = &poc.rules[0];

        assert!(rule.request.method.is_empty());
        assert!(rule.request.path.is_empty());
        assert!(rule.request.body.is_empty());
        assert!(!rule.request.follow_redirects);
    }
}
