//! Paged reads of OpenAPI collections.

use serde::de::DeserializeOwned;
use tracing::trace;
use url::form_urlencoded;
use vcd_core::{ApiVersion, Session};

use crate::models::OpenApiPage;
use crate::Result;

/// Page size requested from OpenAPI collections.
pub const DEFAULT_PAGE_SIZE: u32 = 128;

/// Append query pairs to an HREF.
pub(crate) fn with_query(href: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return href.to_string();
    }
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
    let separator = if href.contains('?') { '&' } else { '?' };
    format!("{href}{separator}{}", query.finish())
}

/// Fetch every page of an OpenAPI collection.
pub(crate) async fn get_all_items<T>(
    session: &Session,
    href: &str,
    version: ApiVersion,
    filters: &[(&str, &str)],
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let page_size = DEFAULT_PAGE_SIZE.to_string();
    let mut items = Vec::new();
    let mut page: u32 = 1;

    loop {
        let page_number = page.to_string();
        let mut pairs = filters.to_vec();
        pairs.push(("page", page_number.as_str()));
        pairs.push(("pageSize", page_size.as_str()));

        let current: OpenApiPage<T> = session
            .fetch_as(&with_query(href, &pairs), Some(version))
            .await?;
        trace!(href, page, page_count = current.page_count, "fetched OpenAPI page");
        items.extend(current.values);

        if page >= current.page_count {
            return Ok(items);
        }
        page += 1;
    }
}
