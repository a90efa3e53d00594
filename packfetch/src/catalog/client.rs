//! HTTP implementation of the catalog API.

use reqwest::Url;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Catalog, CatalogError, CatalogResult, ProjectInfo};
use crate::manager::download::{ComponentRef, HttpTransport, TransferError, Transport};

/// Default catalog API root.
pub const DEFAULT_API_URL: &str = "https://addons-ecs.forgesvc.net/api/v2/addon";

/// Game id the catalog uses for Minecraft.
pub const DEFAULT_GAME_ID: u32 = 432;

/// Catalog section holding modpacks.
pub const DEFAULT_SECTION_ID: u32 = 4471;

/// Number of search results inspected for an exact slug match.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 20;

/// Endpoint settings for [`HttpCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// API root, without trailing slash.
    pub api_url: String,
    /// Game the searched packs belong to.
    pub game_id: u32,
    /// Catalog section searched for packs.
    pub section_id: u32,
    /// Search results inspected for an exact slug match.
    pub search_page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            game_id: DEFAULT_GAME_ID,
            section_id: DEFAULT_SECTION_ID,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
    slug: String,
}

/// Catalog client speaking the catalog's JSON API.
///
/// All requests go through the wrapped [`Transport`], so they carry its
/// identification header and honor cancellation.
#[derive(Debug)]
pub struct HttpCatalog<T: Transport = HttpTransport> {
    transport: T,
    settings: CatalogSettings,
}

impl<T: Transport> HttpCatalog<T> {
    /// Create a catalog client.
    pub fn new(transport: T, settings: CatalogSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// The transport used for catalog requests.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Endpoint settings.
    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    fn api_root(&self) -> &str {
        self.settings.api_url.trim_end_matches('/')
    }

    fn search_url(&self, slug: &str) -> CatalogResult<String> {
        let endpoint = format!("{}/search", self.api_root());
        let url = Url::parse_with_params(
            &endpoint,
            &[
                ("gameId", self.settings.game_id.to_string()),
                ("searchFilter", slug.to_string()),
                ("pageSize", self.settings.search_page_size.to_string()),
                ("sectionId", self.settings.section_id.to_string()),
            ],
        )
        .map_err(|e| CatalogError::InvalidEndpoint {
            url: endpoint,
            reason: e.to_string(),
        })?;

        Ok(url.into())
    }

    fn project_url(&self, project_id: u64) -> String {
        format!("{}/{}", self.api_root(), project_id)
    }

    fn download_url_endpoint(&self, component: &ComponentRef) -> String {
        format!(
            "{}/{}/file/{}/download-url",
            self.api_root(),
            component.component_id,
            component.release_id
        )
    }

    fn get_json<D>(&self, url: &str, cancel: &CancellationToken) -> CatalogResult<D>
    where
        D: for<'de> Deserialize<'de>,
    {
        let fetched = self.transport.fetch(url, cancel)?;
        serde_json::from_slice(&fetched.bytes).map_err(|e| CatalogError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl<T: Transport> Catalog for HttpCatalog<T> {
    fn search_project(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<Option<u64>> {
        let url = self.search_url(slug)?;
        debug!(slug, "Searching catalog");

        let hits: Vec<SearchHit> = self.get_json(&url, cancel)?;
        Ok(hits.into_iter().find(|hit| hit.slug == slug).map(|hit| hit.id))
    }

    fn project_info(
        &self,
        project_id: u64,
        cancel: &CancellationToken,
    ) -> CatalogResult<ProjectInfo> {
        let url = self.project_url(project_id);
        debug!(project_id, "Fetching project info");

        match self.get_json(&url, cancel) {
            Err(CatalogError::Transfer(TransferError::Status { status: 404, .. })) => {
                Err(CatalogError::NotFound(project_id))
            }
            result => result,
        }
    }

    fn release_download_url(
        &self,
        component: &ComponentRef,
        cancel: &CancellationToken,
    ) -> CatalogResult<String> {
        let url = self.download_url_endpoint(component);
        let fetched = self.transport.fetch(&url, cancel)?;

        let text = String::from_utf8_lossy(&fetched.bytes);
        let download_url = text.trim();
        if download_url.is_empty() {
            return Err(CatalogError::EmptyDownloadUrl(*component));
        }

        Ok(download_url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::manager::download::{Fetched, TransferResult};

    /// Serves canned bodies by URL and records requested URLs.
    #[derive(Default)]
    struct Routes {
        bodies: HashMap<String, &'static str>,
        requested: Mutex<Vec<String>>,
    }

    impl Routes {
        fn with(mut self, url: &str, body: &'static str) -> Self {
            self.bodies.insert(url.to_string(), body);
            self
        }
    }

    impl Transport for Routes {
        fn fetch(&self, url: &str, cancel: &CancellationToken) -> TransferResult<Fetched> {
            self.requested.lock().unwrap().push(url.to_string());
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            match self.bodies.get(url) {
                Some(body) => Ok(Fetched::new(body.as_bytes().to_vec())),
                None => Err(TransferError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    const API: &str = "https://api.example.com/v2/addon";

    fn settings() -> CatalogSettings {
        CatalogSettings {
            api_url: format!("{}/", API),
            ..CatalogSettings::default()
        }
    }

    #[test]
    fn test_search_project_exact_slug() {
        let routes = Routes::default().with(
            "https://api.example.com/v2/addon/search?gameId=432&searchFilter=atm6&pageSize=20&sectionId=4471",
            r#"[{"id": 1, "slug": "atm6-sky"}, {"id": 2, "slug": "atm6"}]"#,
        );
        let catalog = HttpCatalog::new(routes, settings());

        let id = catalog
            .search_project("atm6", &CancellationToken::new())
            .unwrap();
        assert_eq!(id, Some(2));
    }

    #[test]
    fn test_search_project_no_match() {
        let routes = Routes::default().with(
            "https://api.example.com/v2/addon/search?gameId=432&searchFilter=nope&pageSize=20&sectionId=4471",
            r#"[{"id": 1, "slug": "nope-2"}]"#,
        );
        let catalog = HttpCatalog::new(routes, settings());

        assert_eq!(
            catalog
                .search_project("nope", &CancellationToken::new())
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_project_info_not_found() {
        let catalog = HttpCatalog::new(Routes::default(), settings());

        let result = catalog.project_info(42, &CancellationToken::new());
        assert!(matches!(result, Err(CatalogError::NotFound(42))));
    }

    #[test]
    fn test_project_info_parse_error() {
        let routes = Routes::default().with("https://api.example.com/v2/addon/42", "<html>");
        let catalog = HttpCatalog::new(routes, settings());

        let result = catalog.project_info(42, &CancellationToken::new());
        assert!(matches!(result, Err(CatalogError::Parse { .. })));
    }

    #[test]
    fn test_release_download_url_trims_body() {
        let routes = Routes::default().with(
            "https://api.example.com/v2/addon/238222/file/3043174/download-url",
            "https://edge.example.com/files/3043/174/jei.jar\n",
        );
        let catalog = HttpCatalog::new(routes, settings());

        let url = catalog
            .release_download_url(&ComponentRef::new(238222, 3043174), &CancellationToken::new())
            .unwrap();
        assert_eq!(url, "https://edge.example.com/files/3043/174/jei.jar");
    }

    #[test]
    fn test_release_download_url_empty_body() {
        let routes = Routes::default().with(
            "https://api.example.com/v2/addon/1/file/2/download-url",
            "  ",
        );
        let catalog = HttpCatalog::new(routes, settings());

        let result =
            catalog.release_download_url(&ComponentRef::new(1, 2), &CancellationToken::new());
        assert!(matches!(result, Err(CatalogError::EmptyDownloadUrl(_))));
    }

    #[test]
    fn test_release_download_url_cancelled() {
        let catalog = HttpCatalog::new(Routes::default(), settings());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = catalog
            .release_download_url(&ComponentRef::new(1, 2), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_search_query_is_encoded() {
        let routes = Routes::default().with(
            "https://api.example.com/v2/addon/search?gameId=432&searchFilter=a+b%26c&pageSize=20&sectionId=4471",
            "[]",
        );
        let catalog = HttpCatalog::new(routes, settings());

        let id = catalog
            .search_project("a b&c", &CancellationToken::new())
            .unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn test_search_with_invalid_api_url() {
        let settings = CatalogSettings {
            api_url: "not a url".to_string(),
            ..CatalogSettings::default()
        };
        let catalog = HttpCatalog::new(Routes::default(), settings);

        let result = catalog.search_project("atm6", &CancellationToken::new());
        assert!(matches!(result, Err(CatalogError::InvalidEndpoint { .. })));
        assert!(catalog.transport().requested.lock().unwrap().is_empty());
    }
}
