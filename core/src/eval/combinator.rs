use regex::Regex;

use super::RuleResults;
use crate::error::EvalError;

/// Resolves a POC's top-level expression (e.g. `r0() && r1()`) into the
/// final verdict using only memoized rule results.
///
/// Every `name()` call token of a computed rule is substituted with its
/// boolean literal, then the residue is evaluated with the same flat
/// `&&`/`||` splitting as the rule-level grammar. Substitution over distinct
/// rule names is unordered, so a rule name that is a prefix of another
/// rule's call token would be rewritten ambiguously; POC authors avoid such
/// names and this engine does not try to repair them.
pub fn evaluate(expression: &str, results: &RuleResults) -> Result<bool, EvalError> {
    let mut expr = expression.trim().replace('\n', "").replace('\r', "");

    for (name, value) in results.computed() {
        let call = format!("{}()", name);
        expr = expr.replace(&call, if value { "true" } else { "false" });
    }

    // Any call token left over names a rule with no computed result:
    // declared out of order, skipped by a fail-fast abort, or misspelled.
    let residual = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\(\)").expect("dispatch pattern is valid");
    if let Some(caps) = residual.captures(&expr) {
        return Err(EvalError::MissingRuleResult(caps[1].to_string()));
    }

    let stripped: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    eval_boolean(&stripped)
}

/// Flat evaluation of a literal-only boolean expression. Only `true`,
/// `false`, `&&`, and `||` are legal here; no field-access forms, no
/// negation, no parentheses.
fn eval_boolean(expr: &str) -> Result<bool, EvalError> {
    if expr.contains("&&") {
        for part in expr.split("&&") {
            if !eval_boolean(part)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    if expr.contains("||") {
        for part in expr.split("||") {
            if eval_boolean(part)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    match expr {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(EvalError::UnrecognizedExpression(expr.to_string())),
    }
}
