//! Paginated blob enumeration.
//!
//! [`enumerate`] turns a [`BlobPageSource`] into a lazy stream of blob
//! records. Pages are requested one at a time, and the next page is only
//! requested once every record of the current page has been yielded. A
//! failed request yields a single `Err` and ends the stream.

use crate::domain::model::{BlobRecord, ContainerRef, ContinuationState, EnumerationResult};
use crate::domain::ports::BlobPageSource;
use crate::utils::error::{EnumerationCause, EnumerationError};
use futures::stream::{self, Stream, StreamExt};
use std::collections::{HashSet, VecDeque};

struct Cursor {
    buffered: VecDeque<BlobRecord>,
    state: ContinuationState,
    /// Every token already sent to the service.
    sent_tokens: HashSet<String>,
    pages: usize,
    pending_error: Option<EnumerationError>,
}

impl Cursor {
    fn new() -> Self {
        Self {
            buffered: VecDeque::new(),
            state: ContinuationState::Start,
            sent_tokens: HashSet::new(),
            pages: 0,
            pending_error: None,
        }
    }

    async fn advance<S>(
        mut self,
        source: &S,
        container: &ContainerRef,
    ) -> Option<(Result<BlobRecord, EnumerationError>, Self)>
    where
        S: BlobPageSource + ?Sized,
    {
        loop {
            if let Some(blob) = self.buffered.pop_front() {
                return Some((Ok(blob), self));
            }
            if let Some(error) = self.pending_error.take() {
                return Some((Err(error), self));
            }
            if self.state.is_done() {
                return None;
            }

            self.fetch(source, container).await;
        }
    }

    async fn fetch<S>(&mut self, source: &S, container: &ContainerRef)
    where
        S: BlobPageSource + ?Sized,
    {
        let sent = std::mem::replace(&mut self.state, ContinuationState::Done);
        if let Some(token) = sent.token() {
            self.sent_tokens.insert(token.to_string());
        }
        self.pages += 1;

        tracing::debug!(
            "📄 Requesting page {} of container '{}'",
            self.pages,
            container.container_name()
        );

        match source.list_page(container, &sent).await {
            Ok(page) => {
                tracing::debug!(
                    "Page {} returned {} blobs (more: {})",
                    self.pages,
                    page.blobs.len(),
                    !page.next.is_done()
                );
                self.buffered.extend(page.blobs);

                match page.next {
                    ContinuationState::More(next) if self.sent_tokens.contains(&next) => {
                        tracing::warn!(
                            "Page {} of container '{}' returned an already used token",
                            self.pages,
                            container.container_name()
                        );
                        self.pending_error = Some(EnumerationError::new(
                            container.container_name(),
                            self.pages,
                            EnumerationCause::Service {
                                status: 200,
                                code: "MarkerNotAdvancing".to_string(),
                                message: "continuation token did not advance".to_string(),
                            },
                        ));
                    }
                    next => self.state = next,
                }
            }
            Err(cause) => {
                tracing::warn!(
                    "Page {} of container '{}' failed: {}",
                    self.pages,
                    container.container_name(),
                    cause
                );
                self.pending_error = Some(EnumerationError::new(
                    container.container_name(),
                    self.pages,
                    cause,
                ));
            }
        }
    }
}

/// Lists every blob of `container`, page by page, in service order.
///
/// The stream is single-pass. Calling `enumerate` again starts over from the
/// first page.
pub fn enumerate<'a, S>(
    source: &'a S,
    container: &'a ContainerRef,
) -> impl Stream<Item = Result<BlobRecord, EnumerationError>> + 'a
where
    S: BlobPageSource + ?Sized,
{
    stream::unfold(Cursor::new(), move |cursor| cursor.advance(source, container))
}

/// Drains an enumeration, keeping records delivered before a failure.
pub async fn collect_all<St>(stream: St) -> EnumerationResult
where
    St: Stream<Item = Result<BlobRecord, EnumerationError>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut result = EnumerationResult::default();

    while let Some(item) = stream.next().await {
        match item {
            Ok(blob) => result.blobs.push(blob),
            Err(error) => {
                result.error = Some(error);
                break;
            }
        }
    }

    result
}
