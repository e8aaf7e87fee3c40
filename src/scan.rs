//! Reads a whole table from a store that caps each response.

use std::future::Future;
use tracing::debug;

/// One response of a paginated read.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T, K = String> {
    pub items: Vec<T>,
    /// Present while more data remains; pass it back to get the next page.
    pub next_token: Option<K>,
}

impl<T, K> Page<T, K> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Fetches every page and concatenates the items in response order.
///
/// The first call is made with no token, unconditionally. The scan stops at
/// the first page without a `next_token`. Pages are fetched one after the
/// other since each call depends on the previous token.
///
/// # Errors
///
/// Returns the first error from `fetch_page` unchanged; items already read
/// are discarded.
pub async fn scan_all<T, K, E, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<K>) -> Fut,
    Fut: Future<Output = Result<Page<T, K>, E>>,
{
    let mut items = Vec::new();
    let mut token: Option<K> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(token.take()).await?;
        pages += 1;
        items.extend(page.items);

        token = page.next_token;
        if token.is_none() {
            break;
        }
    }

    debug!(pages, items = items.len(), "Scan complete");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: &[u32], next: Option<&str>) -> Page<u32> {
        Page {
            items: items.to_vec(),
            next_token: next.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_concatenates_pages_in_order() {
        let mut pages = vec![
            page(&[1, 2, 3], Some("a")),
            page(&[4], Some("b")),
            page(&[5, 6], None),
        ]
        .into_iter();
        let mut tokens = Vec::new();

        let items = scan_all(|token| {
            tokens.push(token);
            let next = pages.next();
            async move { next.ok_or("ran out of pages") }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            tokens,
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_table_still_fetches_once() {
        let mut calls = 0;

        let items: Vec<u32> = scan_all(|_token: Option<String>| {
            calls += 1;
            async { Ok::<_, String>(Page::last(Vec::new())) }
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_error_aborts_without_partial_result() {
        let mut calls = 0;

        let result = scan_all(|token: Option<String>| {
            calls += 1;
            async move {
                match token {
                    None => Ok(page(&[1, 2], Some("next"))),
                    Some(_) => Err("store rejected scan".to_string()),
                }
            }
        })
        .await;

        assert_eq!(result, Err("store rejected scan".to_string()));
        assert_eq!(calls, 2);
    }
}
