use std::any::type_name;
use std::future::Future;

use anyhow::Result;
use tracing::{event, trace_span, Instrument, Level};

/// Downloads every page of a paginated source, starting at page 1. The source
/// signals the end of the data set with an empty page.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let output_parameter_type_name = type_name::<T>();

    let span = trace_span!("pagination");

    async move {
        event!(Level::TRACE, "Start downloading all pages of type {}", output_parameter_type_name);

        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let page_data = fetch_page(page).await?;
            if page_data.is_empty() {
                break;
            }

            event!(Level::TRACE, "Downloaded page {} with {} entries", page, page_data.len());

            all_data.extend(page_data);
            page += 1;
        }

        event!(Level::TRACE, "Done downloading {} pages with {} entries in total", page - 1, all_data.len());
        Ok(all_data)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accumulates_pages_until_the_first_empty_one() {
        let pages = vec![vec![1, 2, 3], vec![4, 5], vec![], vec![99]];

        let all = fetch_all_pages(|page| {
            let page_data = pages.get(page as usize - 1).cloned().unwrap_or_default();
            async move { Ok(page_data) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn propagates_a_page_fetch_failure() {
        let result: Result<Vec<u32>> = fetch_all_pages(|page| async move {
            if page == 2 {
                anyhow::bail!("boom");
            }
            Ok(vec![1])
        })
        .await;

        assert!(result.is_err());
    }
}
