use thiserror::Error;

/// Errors produced while evaluating a match expression or a top-level
/// verdict expression.
#[derive(Debug, Error)]
pub enum EvalError {
    /// No form of the condition grammar matched the expression text.
    #[error("unrecognized expression: {0}")]
    UnrecognizedExpression(String),

    /// A status comparison carried a right-hand side that is not a
    /// decimal integer.
    #[error("invalid integer literal: {0}")]
    IntLiteral(String),

    /// A `matches`/`bmatches` pattern failed to compile.
    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The top-level expression referenced a rule whose result was never
    /// computed: declared out of order, skipped by a fail-fast abort, or
    /// simply misspelled.
    #[error("no result recorded for rule `{0}`")]
    MissingRuleResult(String),
}

/// Errors that abort a POC run. Each variant carries the failing stage, and
/// the rule-level ones name the offending rule.
///
/// A `false` verdict means "probed and found not vulnerable"; any of these
/// means "inconclusive". Callers must never collapse one into the other.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("rule `{rule}`: failed to build request: {source}")]
    RequestBuild { rule: String, source: anyhow::Error },

    #[error("rule `{rule}`: request failed: {source}")]
    Network {
        rule: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rule `{rule}`: match evaluation failed: {source}")]
    Match {
        rule: String,
        #[source]
        source: EvalError,
    },

    #[error("top-level expression evaluation failed: {0}")]
    Combinator(#[source] EvalError),
}

/// Errors from loading or discovering POC definitions.
#[derive(Debug, Error)]
pub enum PocError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid POC YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("POC definition missing required field: {0}")]
    MissingField(&'static str),

    #[error("duplicate rule name `{0}`")]
    DuplicateRule(String),
}
