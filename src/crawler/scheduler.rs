//! Scheduler for running independent query sessions in parallel
//!
//! This module handles:
//! - Capping concurrent sessions via a semaphore
//! - One fetch strategy per session, never shared
//! - Fanning a shared cancellation signal out to every session
//! - Returning outcomes in the order queries were given

use crate::config::Config;
use crate::crawler::coordinator::{run_crawl, CrawlOptions};
use crate::session::CrawlSession;
use crate::CrawlError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Result of one query's session
#[derive(Debug)]
pub struct QueryOutcome {
    /// The query as given
    pub query: String,

    /// The finished session, or the error that prevented it
    pub result: Result<CrawlSession, CrawlError>,
}

/// Runs many queries as independent sessions
///
/// Sessions share nothing but the concurrency cap and the cancellation
/// token. Each one gets its own fetcher.
pub struct Scheduler {
    /// Global semaphore for limiting concurrent sessions
    session_semaphore: Arc<Semaphore>,

    /// Cancels every session at its next loop top
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler allowing `max_concurrent_sessions` at once (minimum 1)
    pub fn new(max_concurrent_sessions: usize, cancel: CancellationToken) -> Self {
        Self {
            session_semaphore: Arc::new(Semaphore::new(max_concurrent_sessions.max(1))),
            cancel,
        }
    }

    /// Creates a scheduler from the `[crawler]` configuration section
    pub fn from_config(config: &Config, cancel: CancellationToken) -> Self {
        Self::new(config.crawler.max_concurrent_sessions as usize, cancel)
    }

    /// Returns the token shared with every session
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Crawls every query with the engine selected in configuration
    pub async fn run_all(
        &self,
        config: Arc<Config>,
        options: CrawlOptions,
        queries: Vec<String>,
    ) -> Vec<QueryOutcome> {
        self.run_all_with(queries, move |query, cancel| {
            let config = Arc::clone(&config);
            let options = options.clone();
            async move { run_crawl(&config, options, &query, cancel).await }
        })
        .await
    }

    /// Crawls every query with a caller-supplied session runner
    ///
    /// `runner` is called once per query; the future it returns is awaited
    /// in its own task once a session slot is free.
    pub async fn run_all_with<R, Fut>(&self, queries: Vec<String>, runner: R) -> Vec<QueryOutcome>
    where
        R: Fn(String, CancellationToken) -> Fut,
        Fut: Future<Output = Result<CrawlSession, CrawlError>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();

        for (index, query) in queries.iter().enumerate() {
            let semaphore = Arc::clone(&self.session_semaphore);
            let cancel = self.cancel.clone();
            let session = runner(query.clone(), cancel.clone());
            let query = query.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so a permit is always granted
                let _permit = semaphore.acquire_owned().await.ok();
                tracing::debug!("Session slot acquired for '{}'", query);
                (index, session.await)
            });
        }

        let mut outcomes: Vec<Option<Result<CrawlSession, CrawlError>>> =
            queries.iter().map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Err(e) = &result {
                        tracing::error!("Session '{}' failed: {}", queries[index], e);
                    }
                    outcomes[index] = Some(result);
                }
                Err(e) => tracing::error!("Session task panicked: {}", e),
            }
        }

        queries
            .into_iter()
            .zip(outcomes)
            .map(|(query, result)| QueryOutcome {
                result: result.unwrap_or_else(|| {
                    Err(CrawlError::Task(format!("session for '{}' aborted", query)))
                }),
                query,
            })
            .collect()
    }
}
