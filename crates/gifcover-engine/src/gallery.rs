use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;

use gifcover_contracts::images::{
    aspect_ratio_for_height, AspectFilter, GallerySearchResult, ImageRecord,
};
use gifcover_contracts::{PluginError, PluginResult};

use crate::http::{json_or_error, response_text, send_failed};

pub const DEFAULT_SET_LIMIT: u64 = 50;
pub const PLACEHOLDER_NAME: &str = "search";
pub const PLACEHOLDER_IMAGE_URL: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/7/7e/Vector_search_icon.svg/330px-Vector_search_icon.svg.png";

const SEARCH_ORDER: &str = "likeCount";
const SEARCH_ORIENTATION: &str = "straight";
const SEARCH_TARGET: &str = "gallery search";

/// One page of the remote search API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub search: String,
    pub limit: u64,
    pub page: u64,
}

impl SearchRequest {
    pub fn new(search: &str, limit: u64, offset: u64) -> PluginResult<Self> {
        if limit == 0 {
            return Err(PluginError::invalid_argument("limit must be positive"));
        }
        Ok(Self {
            search: search.to_string(),
            limit,
            page: page_for_offset(limit, offset),
        })
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("search", self.search.clone()),
            ("limit", self.limit.to_string()),
            ("page", self.page.to_string()),
            ("order", SEARCH_ORDER.to_string()),
            ("sexual-orientation", SEARCH_ORIENTATION.to_string()),
        ]
    }
}

/// 1-based page holding the item at `offset`. `limit` must be non-zero.
pub fn page_for_offset(limit: u64, offset: u64) -> u64 {
    offset / limit + 1
}

/// Where search results come from; returns the decoded JSON body.
pub trait GallerySource {
    fn search(&self, request: &SearchRequest) -> PluginResult<Value>;
}

pub struct RemoteGallerySource {
    api_url: String,
    http: HttpClient,
    timeout: Duration,
}

impl RemoteGallerySource {
    pub fn new(api_url: impl Into<String>, http: HttpClient, timeout: Duration) -> Self {
        Self {
            api_url: api_url.into(),
            http,
            timeout,
        }
    }
}

impl GallerySource for RemoteGallerySource {
    fn search(&self, request: &SearchRequest) -> PluginResult<Value> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&request.query_pairs())
            .timeout(self.timeout)
            .send()
            .map_err(|err| send_failed(SEARCH_TARGET, err))?;
        let (code, body) = response_text(SEARCH_TARGET, response)?;
        json_or_error(SEARCH_TARGET, code, &body)
    }
}

pub struct GalleryFetcher {
    source: Box<dyn GallerySource>,
    cdn_url: String,
}

impl GalleryFetcher {
    pub fn new(source: Box<dyn GallerySource>, cdn_url: impl Into<String>) -> Self {
        Self {
            source,
            cdn_url: cdn_url.into(),
        }
    }

    /// Static search tile standing in for a gallery listing. The remote
    /// listing endpoint is not queried.
    pub fn list_placeholder(&self, query: &str, aspect: AspectFilter) -> Vec<ImageRecord> {
        let placeholder = ImageRecord {
            name: PLACEHOLDER_NAME.to_string(),
            url: PLACEHOLDER_IMAGE_URL.to_string(),
            url_hd: PLACEHOLDER_IMAGE_URL.to_string(),
            set_url: query.to_string(),
            aspect_ratio: aspect_ratio_for_height(Some(300)),
        };
        aspect.apply(vec![placeholder])
    }

    pub fn fetch_gallery_set(
        &self,
        identifier: &str,
        aspect: AspectFilter,
        limit: u64,
        offset: u64,
    ) -> PluginResult<GallerySearchResult> {
        let request = SearchRequest::new(identifier, limit, offset)?;
        debug!(
            "searching '{}' (limit {}, page {}, aspect {aspect})",
            request.search, request.limit, request.page
        );
        let payload = self.source.search(&request)?;
        let mut result = parse_search_payload(&payload, identifier, &self.cdn_url)?;
        result.images = aspect.apply(result.images);
        Ok(result)
    }

    /// Like [`Self::fetch_gallery_set`], but a failed lookup is logged and
    /// reported as an empty set.
    pub fn fetch_gallery_set_or_empty(
        &self,
        identifier: &str,
        aspect: AspectFilter,
        limit: u64,
        offset: u64,
    ) -> GallerySearchResult {
        match self.fetch_gallery_set(identifier, aspect, limit, offset) {
            Ok(result) => result,
            Err(err) => {
                warn!("Error fetching galleries for '{identifier}': {err}");
                GallerySearchResult::empty()
            }
        }
    }
}

/// Turns a search response body into image records.
///
/// The description is the title of the last item in `data`, whether or not
/// that item produced a record.
pub fn parse_search_payload(
    payload: &Value,
    set_url: &str,
    cdn_url: &str,
) -> PluginResult<GallerySearchResult> {
    let items = match payload.get("data") {
        None | Some(Value::Null) => return Ok(GallerySearchResult::empty()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(PluginError::parse(
                "gallery search response 'data' is not an array",
            ))
        }
    };

    let mut images = Vec::with_capacity(items.len());
    for item in items {
        let Some(path) = item
            .get("uri")
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
        else {
            continue;
        };
        images.push(ImageRecord {
            name: item_title(item),
            url: cdn_join(cdn_url, path),
            url_hd: cdn_join(cdn_url, &hd_path(path)),
            set_url: set_url.to_string(),
            aspect_ratio: aspect_ratio_for_height(item_height(item)),
        });
    }

    Ok(GallerySearchResult {
        description: items.last().map(item_title).unwrap_or_default(),
        images,
    })
}

/// Animated variant of a still preview: `.webp` becomes `.gif`.
pub fn hd_path(path: &str) -> String {
    match path.strip_suffix(".webp") {
        Some(stem) => format!("{stem}.gif"),
        None => path.to_string(),
    }
}

fn cdn_join(cdn_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        cdn_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn item_title(item: &Value) -> String {
    item.get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn item_height(item: &Value) -> Option<u64> {
    match item.get("height")? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|value| *value >= 1.0).map(|value| value as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use reqwest::blocking::Client as HttpClient;
    use serde_json::{json, Value};

    use gifcover_contracts::images::{AspectFilter, GallerySearchResult};
    use gifcover_contracts::{PluginError, PluginResult};

    use super::{
        hd_path, page_for_offset, parse_search_payload, GalleryFetcher, GallerySource,
        RemoteGallerySource, SearchRequest, PLACEHOLDER_IMAGE_URL,
    };
    use crate::http::loopback::{join, serve_once};

    const CDN: &str = "https://cdn.test/";

    struct StubSource {
        payload: PluginResult<Value>,
        requests: Rc<RefCell<Vec<SearchRequest>>>,
    }

    impl GallerySource for StubSource {
        fn search(&self, request: &SearchRequest) -> PluginResult<Value> {
            self.requests.borrow_mut().push(request.clone());
            match &self.payload {
                Ok(value) => Ok(value.clone()),
                Err(_) => Err(PluginError::transport("gallery search", 500, "boom")),
            }
        }
    }

    fn fetcher(payload: PluginResult<Value>) -> (GalleryFetcher, Rc<RefCell<Vec<SearchRequest>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let source = StubSource {
            payload,
            requests: Rc::clone(&requests),
        };
        (GalleryFetcher::new(Box::new(source), CDN), requests)
    }

    #[test]
    fn page_is_one_based() {
        assert_eq!(page_for_offset(50, 100), 3);
        assert_eq!(page_for_offset(50, 0), 1);
        assert_eq!(page_for_offset(50, 49), 1);
        assert_eq!(page_for_offset(200, 200), 2);
    }

    #[test]
    fn search_request_rejects_zero_limit() {
        assert!(matches!(
            SearchRequest::new("x", 0, 10),
            Err(PluginError::InvalidArgument(_))
        ));
    }

    #[test]
    fn search_request_sends_fixed_order_and_orientation() -> anyhow::Result<()> {
        let pairs = SearchRequest::new("sunset beach", 50, 100)?.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("search", "sunset beach".to_string()),
                ("limit", "50".to_string()),
                ("page", "3".to_string()),
                ("order", "likeCount".to_string()),
                ("sexual-orientation", "straight".to_string()),
            ]
        );
        Ok(())
    }

    fn loopback_source(port: u16) -> RemoteGallerySource {
        RemoteGallerySource::new(
            format!("http://127.0.0.1:{port}/portal/api/gifs/search"),
            HttpClient::new(),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn remote_search_encodes_query_string() -> anyhow::Result<()> {
        let (port, server) =
            serve_once("200 OK", r#"{"data": [{"uri": "a.webp", "title": "A"}]}"#)?;
        let request = SearchRequest::new("sunset beach", 50, 100)?;
        let payload = loopback_source(port).search(&request)?;
        assert_eq!(payload["data"][0]["title"], "A");

        let request = join(server)?;
        assert_eq!(
            request.request_line,
            "GET /portal/api/gifs/search?search=sunset+beach&limit=50&page=3&order=likeCount&sexual-orientation=straight HTTP/1.1"
        );
        Ok(())
    }

    #[test]
    fn remote_search_maps_error_status() -> anyhow::Result<()> {
        let (port, server) = serve_once("503 Service Unavailable", r#"{"error": "busy"}"#)?;
        let result = loopback_source(port).search(&SearchRequest::new("rain", 50, 0)?);
        assert!(matches!(
            result,
            Err(PluginError::Transport { status: 503, ref target, .. }) if target == "gallery search"
        ));

        let request = join(server)?;
        assert!(request.request_line.contains("search=rain&"));
        Ok(())
    }

    #[test]
    fn hd_path_swaps_webp_suffix_only() {
        assert_eq!(hd_path("a/b.webp"), "a/b.gif");
        assert_eq!(hd_path("a/b.png"), "a/b.png");
        assert_eq!(hd_path("a.webp/b.jpg"), "a.webp/b.jpg");
    }

    #[test]
    fn parses_records_from_search_payload() -> anyhow::Result<()> {
        let payload = json!({
            "data": [
                {"uri": "/a/b.webp", "height": 600, "title": "Tall one"},
                {"uri": "a/c.png", "height": "150", "title": "Wide one"},
                {"uri": "a/d.webp", "title": "No height"},
                {"uri": "a/e.webp", "height": 0},
                {"uri": "", "title": "Skipped"},
                {"title": "Last title"}
            ]
        });
        let result = parse_search_payload(&payload, "sunset", CDN)?;

        assert_eq!(result.description, "Last title");
        assert_eq!(result.images.len(), 4);

        let tall = &result.images[0];
        assert_eq!(tall.name, "Tall one");
        assert_eq!(tall.url, "https://cdn.test/a/b.webp");
        assert_eq!(tall.url_hd, "https://cdn.test/a/b.gif");
        assert_eq!(tall.set_url, "sunset");
        assert_eq!(tall.aspect_ratio, 0.5);

        let wide = &result.images[1];
        assert_eq!(wide.url_hd, wide.url);
        assert_eq!(wide.aspect_ratio, 2.0);

        assert_eq!(result.images[2].aspect_ratio, 1.0);
        assert_eq!(result.images[3].aspect_ratio, 1.0);
        assert_eq!(result.images[3].name, "");
        Ok(())
    }

    #[test]
    fn empty_payload_is_empty_result() -> anyhow::Result<()> {
        assert_eq!(
            parse_search_payload(&json!({"data": []}), "q", CDN)?,
            GallerySearchResult::empty()
        );
        assert_eq!(
            parse_search_payload(&json!({}), "q", CDN)?,
            GallerySearchResult::empty()
        );
        assert!(matches!(
            parse_search_payload(&json!({"data": {"uri": "x"}}), "q", CDN),
            Err(PluginError::Parse(_))
        ));
        Ok(())
    }

    #[test]
    fn placeholder_echoes_query() {
        let (fetcher, requests) = fetcher(Ok(json!({})));
        let images = fetcher.list_placeholder("anything at all", AspectFilter::Both);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "search");
        assert_eq!(images[0].url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(images[0].url_hd, PLACEHOLDER_IMAGE_URL);
        assert_eq!(images[0].set_url, "anything at all");
        assert_eq!(images[0].aspect_ratio, 1.0);
        assert!(fetcher
            .list_placeholder("anything at all", AspectFilter::Vertical)
            .is_empty());
        assert!(requests.borrow().is_empty());
    }

    #[test]
    fn fetch_filters_by_orientation() -> anyhow::Result<()> {
        let (fetcher, requests) = fetcher(Ok(json!({
            "data": [
                {"uri": "tall.webp", "height": 450, "title": "tall"},
                {"uri": "wide.webp", "height": 200, "title": "wide"},
                {"uri": "square.webp", "height": 300, "title": "square"}
            ]
        })));

        let vertical = fetcher.fetch_gallery_set("q", AspectFilter::Vertical, 200, 0)?;
        assert_eq!(vertical.images.len(), 1);
        assert!(vertical.images.iter().all(|image| image.aspect_ratio < 1.0));
        assert_eq!(vertical.description, "square");

        let landscape = fetcher.fetch_gallery_set("q", AspectFilter::Landscape, 50, 100)?;
        assert!(landscape.images.iter().all(|image| image.aspect_ratio > 1.0));
        assert_eq!(landscape.images[0].name, "wide");

        let seen = requests.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].limit, 200);
        assert_eq!(seen[1].page, 3);
        Ok(())
    }

    #[test]
    fn failed_fetch_degrades_only_in_lenient_variant() {
        let (fetcher, _) = fetcher(Err(PluginError::parse("unused")));
        assert!(matches!(
            fetcher.fetch_gallery_set("q", AspectFilter::Both, 50, 0),
            Err(PluginError::Transport { status: 500, .. })
        ));
        assert_eq!(
            fetcher.fetch_gallery_set_or_empty("q", AspectFilter::Both, 50, 0),
            GallerySearchResult::empty()
        );
    }
}
