use serde::{Deserialize, Serialize};

/// Path of the interstitial slideshow page.
pub const EXTRA_PATH: &str = "/extra";

/// One entry in the kiosk's page sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub path: String,
    pub name: String,
    pub duration_secs: u64,
}

impl Route {
    pub fn new(path: &str, name: &str, duration_secs: u64) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            duration_secs,
        }
    }
}

/// The ordered page list plus the interstitial shown between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
    extra: Route,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>, extra: Route) -> Self {
        Self { routes, extra }
    }

    /// The ten kiosk pages in display order, each shown for
    /// `page_duration_secs`; the interstitial runs `extra_multiplier` times
    /// as long.
    pub fn kiosk_default(page_duration_secs: u64, extra_multiplier: u64) -> Self {
        let page = |path, name| Route::new(path, name, page_duration_secs);
        Self {
            routes: vec![
                page("/", "Home"),
                page("/reduce", "Reduce"),
                page("/reduce-calc", "ReduceCalc"),
                page("/reuse", "Reuse"),
                page("/reuse-calc", "ReuseCalc"),
                page("/recycle", "Recycle"),
                page("/recycle-calc", "RecycleCalc"),
                page("/regenerate", "Regenerate"),
                page("/regenerate-calc", "RegenerateCalc"),
                page("/dashboard", "Dashboard"),
            ],
            extra: Route::new(
                EXTRA_PATH,
                "Extra",
                page_duration_secs * extra_multiplier,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn extra(&self) -> &Route {
        &self.extra
    }

    /// Index of the page at `path`. The interstitial is not addressable.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        self.routes.iter().position(|route| route.path == path)
    }
}
