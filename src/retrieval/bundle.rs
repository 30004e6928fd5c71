//! Query bundle construction
//!
//! Turns a raw query plus a resolved plan into the exact search text used for
//! each part. A bundle's parts are always exactly the plan's parts.

use crate::error::{EvalError, Result};
use crate::formatter::QueryFormatter;
use crate::identifier::{ModelIdentifier, Part, Strategy};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Search text per part, for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBundle {
    queries: BTreeMap<Part, String>,
}

impl QueryBundle {
    /// (part, query) pairs in canonical part order
    pub fn iter(&self) -> impl Iterator<Item = (Part, &str)> {
        self.queries.iter().map(|(part, query)| (*part, query.as_str()))
    }

    pub fn parts(&self) -> impl Iterator<Item = Part> + '_ {
        self.queries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Builds [`QueryBundle`]s, calling the formatter only for `formatted` plans
#[derive(Clone)]
pub struct QueryBundleBuilder {
    formatter: Option<Arc<dyn QueryFormatter>>,
    timeout: Duration,
}

impl QueryBundleBuilder {
    /// `formatter` is `None` when formatting is disabled or failed to initialize
    pub fn new(formatter: Option<Arc<dyn QueryFormatter>>, timeout: Duration) -> Self {
        Self { formatter, timeout }
    }

    pub fn can_format(&self) -> bool {
        self.formatter.is_some()
    }

    pub async fn build(&self, raw_query: &str, plan: &ModelIdentifier) -> Result<QueryBundle> {
        let queries = match plan.strategy() {
            Strategy::Direct => plan
                .parts()
                .iter()
                .map(|part| (*part, raw_query.to_string()))
                .collect(),
            Strategy::Formatted => self.formatted_queries(raw_query, plan).await?,
        };

        Ok(QueryBundle { queries })
    }

    async fn formatted_queries(
        &self,
        raw_query: &str,
        plan: &ModelIdentifier,
    ) -> Result<BTreeMap<Part, String>> {
        let formatter = self.formatter.as_ref().ok_or_else(|| {
            EvalError::NotReady(format!(
                "'{}' requires query formatting, but no formatter is configured",
                plan
            ))
        })?;

        tracing::info!("'{}' requires query formatting, calling {}", plan, formatter.name());

        let formatted = match tokio::time::timeout(self.timeout, formatter.format(raw_query)).await
        {
            Ok(Ok(formatted)) => formatted,
            Ok(Err(e @ (EvalError::FormatterUnavailable(_) | EvalError::FormatterMalformed(_)))) => {
                return Err(e)
            }
            Ok(Err(e)) => return Err(EvalError::FormatterUnavailable(e.to_string())),
            Err(_) => {
                return Err(EvalError::FormatterUnavailable(format!(
                    "no response within {:?}",
                    self.timeout
                )))
            }
        };

        plan.parts()
            .iter()
            .map(|part| {
                formatted
                    .get(*part)
                    .map(|text| (*part, text.to_string()))
                    .ok_or_else(|| {
                        EvalError::FormatterMalformed(format!(
                            "formatter output is missing '{}' required by '{}'",
                            part, plan
                        ))
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormattedQueries;
    use crate::identifier::{enumerate_all, resolve};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFormatter {
        output: FormattedQueries,
        calls: AtomicUsize,
    }

    impl FixedFormatter {
        fn full() -> Self {
            Self {
                output: FormattedQueries {
                    proposition: Some("P".to_string()),
                    summary: Some("S".to_string()),
                    question: Some("Q".to_string()),
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryFormatter for FixedFormatter {
        async fn format(&self, _query: &str) -> Result<FormattedQueries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct StalledFormatter;

    #[async_trait]
    impl QueryFormatter for StalledFormatter {
        async fn format(&self, _query: &str) -> Result<FormattedQueries> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(FormattedQueries::default())
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_direct_copies_raw_query() {
        let builder = QueryBundleBuilder::new(None, Duration::from_secs(1));
        let raw = "এনআইডি কার্ড হারালে কী করতে হবে?";

        for plan in enumerate_all()
            .into_iter()
            .filter(|id| id.strategy() == Strategy::Direct)
        {
            let bundle = builder.build(raw, &plan).await.unwrap();
            assert_eq!(bundle.parts().collect::<Vec<_>>(), plan.parts().iter().copied().collect::<Vec<_>>());
            assert!(bundle.iter().all(|(_, query)| query.as_bytes() == raw.as_bytes()));
        }
    }

    #[tokio::test]
    async fn test_formatted_projects_plan_parts() {
        let formatter = Arc::new(FixedFormatter::full());
        let builder = QueryBundleBuilder::new(Some(formatter.clone()), Duration::from_secs(1));

        for plan in enumerate_all()
            .into_iter()
            .filter(|id| id.strategy() == Strategy::Formatted)
        {
            let bundle = builder.build("raw", &plan).await.unwrap();
            assert_eq!(bundle.parts().collect::<Vec<_>>(), plan.parts().iter().copied().collect::<Vec<_>>());
        }

        // One call per build, never one per part
        assert_eq!(formatter.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_formatted_missing_category() {
        let formatter = Arc::new(FixedFormatter {
            output: FormattedQueries {
                proposition: Some("P".to_string()),
                summary: None,
                question: Some("Q".to_string()),
            },
            calls: AtomicUsize::new(0),
        });
        let builder = QueryBundleBuilder::new(Some(formatter), Duration::from_secs(1));

        let ok = builder
            .build("raw", &resolve("formatted_question_proposition").unwrap())
            .await
            .unwrap();
        assert_eq!(ok.iter().collect::<Vec<_>>(), vec![(Part::Question, "Q")]);

        let err = builder
            .build("raw", &resolve("formatted_summary").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::FormatterMalformed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_formatter_timeout() {
        let builder =
            QueryBundleBuilder::new(Some(Arc::new(StalledFormatter)), Duration::from_millis(200));

        let err = builder
            .build("raw", &resolve("formatted_summary").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::FormatterUnavailable(_)));
    }

    #[tokio::test]
    async fn test_formatted_without_formatter() {
        let builder = QueryBundleBuilder::new(None, Duration::from_secs(1));
        let err = builder
            .build("raw", &resolve("formatted_summary").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::NotReady(_)));
    }
}
