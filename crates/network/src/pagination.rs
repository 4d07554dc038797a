// crates/network/src/pagination.rs
//! Cursor-driven pagination
//!
//! A fetch callback returns one [`Page`] per call. The driver threads the
//! `after` cursor between calls and stops on the first of:
//! - the item limit being reached (the result is trimmed to exactly `limit`)
//! - an empty cursor
//! - an empty page while `stop_on_empty` is set
//! - the context finishing, which discards everything collected so far
//!
//! Items are passed through as returned; overlapping pages are not deduplicated.

use serde::{Deserialize, Serialize};
use std::future::Future;
use threadline_resilience::{Context, ContextError};

/// One page of results and the cursor for the next one.
///
/// An empty `after` means there are no more pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub after: String,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, after: impl Into<String>) -> Self {
        Self {
            items,
            after: after.into(),
        }
    }

    /// A page with no successor
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, "")
    }
}

/// Stop conditions for [`paginate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginateOptions {
    /// Maximum number of items to return; 0 means no limit
    pub limit: usize,
    /// Stop when a page is empty even though it carries a cursor
    pub stop_on_empty: bool,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            limit: 0,
            stop_on_empty: true,
        }
    }
}

impl PaginateOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// Collects items from the first page onward
pub async fn paginate<T, E, F, Fut>(
    ctx: &Context,
    options: PaginateOptions,
    fetch: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(Context, String) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: From<ContextError>,
{
    drive(ctx, options, String::new(), fetch).await
}

/// Collects items that follow `start`, using `cursor_of` to derive the first cursor
pub async fn paginate_after<T, E, C, F, Fut>(
    ctx: &Context,
    options: PaginateOptions,
    start: &T,
    cursor_of: C,
    fetch: F,
) -> Result<Vec<T>, E>
where
    C: Fn(&T) -> String,
    F: FnMut(Context, String) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: From<ContextError>,
{
    drive(ctx, options, cursor_of(start), fetch).await
}

async fn drive<T, E, F, Fut>(
    ctx: &Context,
    options: PaginateOptions,
    mut after: String,
    mut fetch: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(Context, String) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: From<ContextError>,
{
    let mut items = Vec::new();
    let mut pages = 0usize;

    loop {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }

        let page = ctx.run(fetch(ctx.clone(), after)).await??;
        pages += 1;
        let page_was_empty = page.items.is_empty();
        items.extend(page.items);

        if options.limit > 0 && items.len() >= options.limit {
            items.truncate(options.limit);
            break;
        }
        if page.after.is_empty() {
            break;
        }
        if page_was_empty && options.stop_on_empty {
            log::debug!("stopping pagination on empty page with cursor {}", page.after);
            break;
        }
        after = page.after;
    }

    log::debug!("paginated {} items over {} pages", items.len(), pages);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Context(ContextError),
        Upstream,
    }

    impl From<ContextError> for TestError {
        fn from(err: ContextError) -> Self {
            TestError::Context(err)
        }
    }

    /// Serves `pages` in order and records the cursors it was asked for
    fn serve(
        pages: Vec<Page<u32>>,
    ) -> (
        Arc<Mutex<Vec<String>>>,
        impl FnMut(Context, String) -> std::future::Ready<Result<Page<u32>, TestError>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut pages = pages.into_iter();
        let fetch = move |_ctx: Context, after: String| {
            recorder.lock().expect("lock").push(after);
            std::future::ready(pages.next().ok_or(TestError::Upstream))
        };
        (seen, fetch)
    }

    #[tokio::test]
    async fn test_limit_truncates_exactly() {
        let (seen, fetch) = serve(vec![Page::new(vec![1, 2], "a"), Page::new(vec![3, 4], "b")]);

        let items = paginate(&Context::new(), PaginateOptions::with_limit(3), fetch)
            .await
            .expect("two pages");

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(*seen.lock().expect("lock"), vec!["".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_cursor_ends_pagination() {
        let (seen, fetch) = serve(vec![Page::new(vec![1], "a"), Page::last(vec![2, 3])]);

        let items = paginate(&Context::new(), PaginateOptions::default(), fetch)
            .await
            .expect("two pages");

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(seen.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_with_cursor_stops() {
        let (seen, fetch) = serve(vec![
            Page::new(vec![1], "a"),
            Page::new(vec![], "b"),
            Page::new(vec![2], "c"),
        ]);

        let items = paginate(&Context::new(), PaginateOptions::default(), fetch)
            .await
            .expect("stops on empty page");

        assert_eq!(items, vec![1]);
        assert_eq!(seen.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_followed_when_not_stopping() {
        let (_, fetch) = serve(vec![
            Page::new(vec![1], "a"),
            Page::new(vec![], "b"),
            Page::last(vec![2]),
        ]);
        let options = PaginateOptions {
            limit: 0,
            stop_on_empty: false,
        };

        let items = paginate(&Context::new(), options, fetch).await.expect("three pages");
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_duplicates_pass_through() {
        let (_, fetch) = serve(vec![Page::new(vec![1, 2], "a"), Page::last(vec![2, 3])]);

        let items = paginate(&Context::new(), PaginateOptions::default(), fetch)
            .await
            .expect("two pages");
        assert_eq!(items, vec![1, 2, 2, 3]);
    }

    #[tokio::test]
    async fn test_paginate_after_derives_first_cursor() {
        let (seen, fetch) = serve(vec![Page::last(vec![8, 9])]);

        let items = paginate_after(
            &Context::new(),
            PaginateOptions::default(),
            &7u32,
            |item| format!("t3_{}", item),
            fetch,
        )
        .await
        .expect("one page");

        assert_eq!(items, vec![8, 9]);
        assert_eq!(*seen.lock().expect("lock"), vec!["t3_7".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_discards_partial_results() {
        let ctx = Context::new();
        let canceler = ctx.clone();
        let mut calls = 0;

        let result: Result<Vec<u32>, TestError> =
            paginate(&ctx, PaginateOptions::default(), |_ctx, _after| {
                calls += 1;
                canceler.cancel();
                std::future::ready(Ok(Page::new(vec![1, 2], "next")))
            })
            .await;

        assert_eq!(result, Err(TestError::Context(ContextError::Canceled)));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_fetch() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        let started = Instant::now();

        let result: Result<Vec<u32>, TestError> =
            paginate(&ctx, PaginateOptions::default(), |_ctx, _after| async {
                // Ignores the context it was handed
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Page::last(vec![1, 2]))
            })
            .await;

        assert_eq!(result, Err(TestError::Context(ContextError::DeadlineExceeded)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (_, fetch) = serve(vec![Page::new(vec![1], "a")]);

        let result = paginate(&Context::new(), PaginateOptions::default(), fetch).await;
        assert_eq!(result, Err(TestError::Upstream));
    }
}
