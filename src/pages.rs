//! Link-driven pagination over list endpoints.
//!
//! Continuation is dictated by the server: each page's `Link: <...>; rel="next"`
//! target is requested verbatim, with no caller parameters re-added, until a
//! page arrives without one.

use std::{collections::VecDeque, time::Duration};

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    link::next_link,
    params::{Payload, Prepared},
    ExpectedCodes, Result, Session, SparkError,
};

enum Cursor {
    First { url: Url, payload: Payload },
    Next(Url),
    Done,
}

/// Forward-only sequence of decoded page bodies.
///
/// `Ok(None)` means the walk ended; an `Err` ends it as well.
pub struct Pages<'a> {
    session: &'a mut Session,
    cursor: Cursor,
    timeout: Option<Duration>,
    expected: ExpectedCodes,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(session: &'a mut Session, url: Url, prepared: Prepared) -> Self {
        Self {
            session,
            cursor: Cursor::First {
                url,
                payload: prepared.payload,
            },
            timeout: prepared.timeout,
            expected: prepared.expected,
        }
    }

    /// Fetches the next page, or `Ok(None)` once the last page was returned.
    pub async fn next_page(&mut self) -> Result<Option<serde_json::Value>> {
        let (url, payload) = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::First { url, payload } => (url, payload),
            Cursor::Next(url) => (url, Payload::Query(Vec::new())),
            Cursor::Done => return Ok(None),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("fetching page {}", url);

        let response = self
            .session
            .exchange(Method::GET, &url, &payload, self.timeout, &self.expected)
            .await?;
        let page = response.json()?;

        if let Some(next) = next_link(&response.headers, &response.url) {
            self.cursor = Cursor::Next(next);
        }
        Ok(Some(page))
    }

    /// Flattens the walk into the items of each page.
    pub fn into_items(self) -> Items<'a> {
        Items::new(self)
    }

    fn finish(&mut self) {
        self.cursor = Cursor::Done;
    }
}

/// Forward-only sequence of the `items` of every page.
pub struct Items<'a> {
    pages: Pages<'a>,
    buffered: VecDeque<serde_json::Value>,
}

impl<'a> Items<'a> {
    pub(crate) fn new(pages: Pages<'a>) -> Self {
        Self {
            pages,
            buffered: VecDeque::new(),
        }
    }

    /// Next item across pages, fetching pages as needed.
    ///
    /// A page without an `items` array fails with [`SparkError::Protocol`]
    /// and ends the walk.
    pub async fn next_item(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }
            let Some(page) = self.pages.next_page().await? else {
                return Ok(None);
            };
            match page_items(page) {
                Ok(items) => self.buffered = items.into(),
                Err(err) => {
                    self.pages.finish();
                    return Err(err);
                }
            }
        }
    }

    /// Next item decoded into `T`.
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        self.next_item()
            .await?
            .map(|item| {
                serde_json::from_value(item)
                    .map_err(|err| SparkError::Decode(format!("invalid item: {err}")))
            })
            .transpose()
    }

    /// Drains the walk, failing on the first error.
    pub async fn try_collect(mut self) -> Result<Vec<serde_json::Value>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }
}

fn page_items(page: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    let mut page = match page {
        serde_json::Value::Object(page) => page,
        other => {
            return Err(SparkError::Protocol(format!(
                "list page is not a JSON object: {other}"
            )))
        }
    };
    match page.remove("items") {
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(other) => Err(SparkError::Protocol(format!(
            "'items' is not an array: {other}"
        ))),
        None => Err(SparkError::Protocol(format!(
            "'items' object not found in JSON data: {}",
            serde_json::Value::Object(page)
        ))),
    }
}
