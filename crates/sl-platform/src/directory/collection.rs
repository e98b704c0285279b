//! Paged Collections
//!
//! The directory pages list endpoints with `Link: <url>; rel="next"` headers.
//! A [`Collection`] remembers the first page and fetches pages lazily when
//! streamed; each call to [`Collection::stream`] starts from the beginning.

use std::marker::PhantomData;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;

use super::error::DirectoryError;
use super::okta::OktaClient;

/// One fetched page: its items and the next page, if any.
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Lazy, restartable sequence of directory resources
pub struct Collection<T> {
    client: OktaClient,
    first_page: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            first_page: self.first_page.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(client: OktaClient, first_page: String) -> Self {
        Self {
            client,
            first_page,
            _item: PhantomData,
        }
    }

    /// URL of the first page
    pub fn first_page(&self) -> &str {
        &self.first_page
    }

    /// Stream every item, requesting the next page only once the current one
    /// is exhausted. An error ends the stream.
    pub fn stream(&self) -> BoxStream<'static, Result<T, DirectoryError>> {
        let client = self.client.clone();

        stream::try_unfold(Some(self.first_page.clone()), move |next| {
            let client = client.clone();
            async move {
                let Some(url) = next else {
                    return Ok(None);
                };
                let page = client.fetch_page::<T>(&url).await?;
                Ok::<_, DirectoryError>(Some((page.items, page.next)))
            }
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, DirectoryError>)))
        .try_flatten()
        .boxed()
    }

    /// Drain the whole collection into a vector.
    pub async fn collect_all(&self) -> Result<Vec<T>, DirectoryError> {
        self.stream().try_collect().await
    }
}

/// Find the `rel="next"` target among all `Link` headers.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_next)
}

fn parse_next(link: &str) -> Option<String> {
    let mut parts = link.split(';');
    let target = parts.next()?.trim();
    let url = target.strip_prefix('<')?.strip_suffix('>')?;

    let is_next = parts.any(|param| {
        let param = param.trim();
        param
            .strip_prefix("rel=")
            .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
            .unwrap_or(false)
    });

    is_next.then(|| url.to_string())
}
