use log::debug;

use crate::error::ScanError;
use crate::eval::{combinator, predicate, RuleResults};
use crate::http::{HttpClient, HttpRequest, ResponseView};
use crate::poc::Poc;

/// Outcome of a completed POC run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final verdict from the top-level expression.
    pub vulnerable: bool,
    /// Per-rule booleans in declared order, surfaced for reporting.
    pub rule_results: Vec<(String, bool)>,
}

/// Drives one POC against one target: builds each rule's request, obtains a
/// response view from the transport, evaluates the match expression, and
/// finally resolves the top-level expression over the memoized results.
///
/// The engine holds no per-run state, so one instance can serve concurrent
/// runs against different targets; within a single run the rules are strictly
/// sequential.
pub struct PocEngine {
    client: HttpClient,
}

impl PocEngine {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Runs every rule strictly in declared order. Fail-fast: the first
    /// request-build, network, or evaluation failure aborts the run, later
    /// rules never execute, and the combinator is never invoked.
    pub async fn run(&self, poc: &Poc, target_url: &str) -> Result<RunOutcome, ScanError> {
        let mut results = RuleResults::for_rules(poc.rules.iter().map(|(name, _)| name.as_str()));
        let mut ordered = Vec::with_capacity(poc.rules.len());

        for (name, rule) in &poc.rules {
            let request = HttpRequest::from_template(&rule.request, target_url).map_err(
                |source| ScanError::RequestBuild {
                    rule: name.clone(),
                    source,
                },
            )?;

            debug!("rule `{}`: {} {}", name, request.method, request.url);
            if !request.body.is_empty() {
                debug!("rule `{}`: request body: {}", name, request.body);
            }

            let (status, headers, body) =
                self.client
                    .execute(&request)
                    .await
                    .map_err(|source| ScanError::Network {
                        rule: name.clone(),
                        source,
                    })?;

            let view = ResponseView::from_parts(status, &headers, &body);
            debug!(
                "rule `{}`: response status {} ({} body bytes)",
                name,
                view.status,
                body.len()
            );
            if !view.body.is_empty() {
                let preview: String = view.body.chars().take(500).collect();
                debug!("rule `{}`: body preview: {}", name, preview);
            }

            debug!("rule `{}`: evaluating `{}`", name, rule.expression);
            let matched =
                predicate::evaluate(&rule.expression, &view).map_err(|source| ScanError::Match {
                    rule: name.clone(),
                    source,
                })?;
            debug!("rule `{}` => {}", name, matched);

            results.record(name, matched);
            ordered.push((name.clone(), matched));
        }

        debug!("top-level expression: {}", poc.expression);
        let vulnerable =
            combinator::evaluate(&poc.expression, &results).map_err(ScanError::Combinator)?;

        Ok(RunOutcome {
            vulnerable,
            rule_results: ordered,
        })
    }
}
