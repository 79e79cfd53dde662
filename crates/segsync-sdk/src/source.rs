//! Membership sources: where the current segment membership comes from.
//!
//! A source serves the membership one page at a time. [`pages`] turns it into
//! a lazy, forward-only stream that restarts from the first page on every
//! call and ends after the first page without a `next` cursor.

use crate::error::SourceError;
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use parking_lot::RwLock;
use segsync_core::{Identity, MembershipSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Opaque continuation token handed back by the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor(pub String);

impl PageCursor {
    pub fn new(cursor: impl Into<String>) -> Self {
        Self(cursor.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of members.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub members: Vec<Identity>,
    pub next: Option<PageCursor>,
}

/// Serves the current membership of a segment page by page.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch the page at `cursor` (the first page when `None`).
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, SourceError>;
}

/// Lazily walk every page of `source`.
///
/// The stream yields at most one error and ends right after it. A source
/// that hands back the cursor it was just given would loop forever; that is
/// reported as [`SourceError::Decode`].
pub fn pages<'a, S>(
    source: &'a S,
    page_size: usize,
) -> impl Stream<Item = Result<Page, SourceError>> + 'a
where
    S: MembershipSource + ?Sized,
{
    async_stream::stream! {
        let mut cursor: Option<PageCursor> = None;
        loop {
            let page = match source.fetch_page(cursor.as_ref(), page_size).await {
                Ok(page) => page,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            };

            if page.next.is_some() && page.next == cursor {
                yield Err(SourceError::Decode(format!(
                    "next cursor repeats the current one: {:?}",
                    cursor
                )));
                break;
            }

            let next = page.next.clone();
            yield Ok(page);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
    }
}

/// Drain every page into a membership set.
///
/// Any page error fails the whole fetch; partial membership is never
/// returned.
pub async fn fetch_membership<S>(
    source: &S,
    page_size: usize,
) -> Result<MembershipSet, SourceError>
where
    S: MembershipSource + ?Sized,
{
    let stream = pages(source, page_size);
    futures::pin_mut!(stream);

    let mut members = MembershipSet::new();
    let mut page_count = 0usize;
    while let Some(page) = stream.next().await {
        let page = page?;
        page_count += 1;
        members.extend(page.members);
    }

    tracing::debug!(pages = page_count, members = members.len(), "Membership fetched");
    Ok(members)
}

/// In-memory source for testing and simulation.
///
/// Serves a mutable member list in pages; the cursor is the offset of the
/// next page.
#[derive(Default)]
pub struct MemorySource {
    members: RwLock<Vec<Identity>>,
    failing: AtomicBool,
    requests: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members<I, T>(members: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        let source = Self::new();
        source.set_members(members);
        source
    }

    /// Replace the served membership.
    pub fn set_members<I, T>(&self, members: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Identity>,
    {
        *self.members.write() = members.into_iter().map(Into::into).collect();
    }

    /// Make every request fail (or succeed again).
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of page requests served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipSource for MemorySource {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, SourceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Status {
                status: 503,
                body: "simulated outage".to_string(),
            });
        }

        let offset = match cursor {
            Some(c) => c
                .as_str()
                .parse::<usize>()
                .map_err(|e| SourceError::Decode(e.to_string()))?,
            None => 0,
        };

        let members = self.members.read();
        let end = (offset + page_size.max(1)).min(members.len());
        let page = members.get(offset..end).unwrap_or(&[]).to_vec();
        let next = (end < members.len()).then(|| PageCursor::new(end.to_string()));

        Ok(Page {
            members: page,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always answers with the same continuation cursor.
    struct StuckSource;

    #[async_trait]
    impl MembershipSource for StuckSource {
        async fn fetch_page(
            &self,
            _cursor: Option<&PageCursor>,
            _page_size: usize,
        ) -> Result<Page, SourceError> {
            Ok(Page {
                members: vec![Identity::from("a")],
                next: Some(PageCursor::new("same")),
            })
        }
    }

    #[tokio::test]
    async fn test_paginates_through_all_members() {
        let source = MemorySource::with_members(["a", "b", "c", "d", "e"]);

        let pages: Vec<_> = pages(&source, 2).collect().await;

        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.is_ok()));
        assert_eq!(source.request_count(), 3);
    }

    #[tokio::test]
    async fn test_fetch_collapses_duplicates() {
        let source = MemorySource::with_members(["a", "b", "a", "c"]);

        let members = fetch_membership(&source, 3).await.unwrap();

        assert_eq!(members.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_segment_is_one_page() {
        let source = MemorySource::new();

        let members = fetch_membership(&source, 100).await.unwrap();

        assert!(members.is_empty());
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_discards_partial_result() {
        let source = MemorySource::with_members(["a"]);
        source.fail(true);

        let err = fetch_membership(&source, 100).await.unwrap_err();

        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_rejected() {
        let err = fetch_membership(&StuckSource, 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_stream_restarts_per_call() {
        let source = MemorySource::with_members(["a", "b", "c"]);

        let first = fetch_membership(&source, 2).await.unwrap();
        source.set_members(["c", "d"]);
        let second = fetch_membership(&source, 2).await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(second.contains(&Identity::from("d")));
        assert!(!second.contains(&Identity::from("a")));
    }
}
