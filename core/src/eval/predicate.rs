use regex::Regex;

use crate::error::EvalError;
use crate::http::ResponseView;

/// Evaluates one rule's match expression against a response view.
///
/// The condition language is closed: a fixed set of forms resolved by
/// ordered pattern dispatch over the raw expression text, first structural
/// match wins. `&&` and `||` are recognized by substring presence with no
/// precedence between them and no parentheses; POC files in the wild are
/// written against exactly these semantics, so the dispatch order here is
/// load-bearing and pinned by the test vectors below.
///
/// Evaluation is pure: same expression and view always yield the same
/// result, and nothing is mutated.
pub fn evaluate(expression: &str, response: &ResponseView) -> Result<bool, EvalError> {
    let expr = expression.trim().replace('\n', " ").replace('\r', "");
    eval(&expr, response)
}

fn eval(expr: &str, response: &ResponseView) -> Result<bool, EvalError> {
    let expr = expr.trim();

    if expr == "true" {
        return Ok(true);
    }
    if expr == "false" {
        return Ok(false);
    }

    if expr.contains("&&") {
        for part in expr.split("&&") {
            if !eval(part, response)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    if expr.contains("||") {
        for part in expr.split("||") {
            if eval(part, response)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    // reverse.wait(n): reverse-connection oracle, reserved. Never fires.
    if expr.contains("reverse.wait") {
        return Ok(false);
    }

    if expr.starts_with("response.status") {
        return eval_status_comparison(expr, response.status);
    }

    // response.headers["Name"] == "Value"
    if expr.contains("response.headers[") {
        if let Some(caps) = capture(r#"response\.headers\["([^"]+)"\]\s*==\s*"([^"]*)""#, expr) {
            return Ok(response.header(&caps[0]) == Some(caps[1].as_str()));
        }
        // Malformed header comparison: fall through to the remaining probes.
    }

    // "Name" in response.headers
    if expr.contains("in response.headers") {
        if let Some(caps) = capture(r#""([^"]+)"\s+in\s+response\.headers"#, expr) {
            return Ok(response.header(&caps[0]).is_some());
        }
    }

    // response.content_type.contains("needle")
    if expr.contains("response.content_type.contains") {
        if let Some(caps) = capture(r#"response\.content_type\.contains\("([^"]+)"\)"#, expr) {
            return Ok(response
                .content_type
                .to_lowercase()
                .contains(&caps[0].to_lowercase()));
        }
    }

    // response.body.bcontains(b"literal"), \" unescaped before the search
    if expr.contains(r#"response.body.bcontains(b""#) {
        if let Some(caps) = capture(r#"response\.body\.bcontains\(b"((?:\\.|[^"])*)"\)"#, expr) {
            let needle = caps[0].replace(r#"\""#, "\"");
            return Ok(response.body.contains(&needle));
        }
    }

    // bytes(...) body literals: reserved. Never fires.
    if expr.contains("response.body.bcontains(bytes(") {
        return Ok(false);
    }

    // "pattern".matches(response.body) / (response.body_string)
    if expr.contains(".matches(response.body") {
        if let Some(caps) = capture(r#""([^"]+)"\.matches\(response\.body[_a-z]*\)"#, expr) {
            return regex_match(&caps[0], response.body_string());
        }
    }

    // "pattern".bmatches(response.body...): same behavior as matches, the
    // byte variant is not distinguished here.
    if expr.contains(".bmatches(response.body") {
        if let Some(caps) = capture(r#""([^"]+)"\.bmatches\(response\.body[_a-z]*\)"#, expr) {
            return regex_match(&caps[0], response.body_string());
        }
    }

    // Flipped spelling: response.body.matches("pattern")
    if expr.contains("response.body") && expr.contains(".matches(") {
        if let Some(caps) = capture(r#"response\.body[_a-z]*\.matches\("([^"]+)"\)"#, expr) {
            return regex_match(&caps[0], response.body_string());
        }
    }

    if expr.contains("response.body") && expr.contains(".bmatches(") {
        if let Some(caps) = capture(r#"response\.body[_a-z]*\.bmatches\("([^"]+)"\)"#, expr) {
            return regex_match(&caps[0], response.body_string());
        }
    }

    Err(EvalError::UnrecognizedExpression(expr.to_string()))
}

/// `response.status == N` / `response.status != N`.
fn eval_status_comparison(expr: &str, status: u16) -> Result<bool, EvalError> {
    for (operator, negated) in [("==", false), ("!=", true)] {
        if !expr.contains(operator) {
            continue;
        }
        let parts: Vec<&str> = expr.split(operator).collect();
        if parts.len() != 2 {
            return Err(EvalError::UnrecognizedExpression(expr.to_string()));
        }
        let literal = parts[1].trim();
        let expected: i64 = literal
            .parse()
            .map_err(|_| EvalError::IntLiteral(literal.to_string()))?;
        let equal = i64::from(status) == expected;
        return Ok(equal != negated);
    }
    Err(EvalError::UnrecognizedExpression(expr.to_string()))
}

/// Runs one of the fixed dispatch patterns and returns its capture groups.
fn capture(pattern: &str, text: &str) -> Option<Vec<String>> {
    let re = Regex::new(pattern).expect("dispatch pattern is valid");
    re.captures(text).map(|caps| {
        caps.iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}

fn regex_match(pattern: &str, text: &str) -> Result<bool, EvalError> {
    let re = Regex::new(pattern)?;
    Ok(re.is_match(text))
}
