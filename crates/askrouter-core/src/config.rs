use std::fmt;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "ASKROUTER_API_URL";

/// Value of `ASKROUTER_API_URL` when the crate was compiled
const BUILD_TIME_API_URL: Option<&str> = option_env!("ASKROUTER_API_URL");

/// Where the base URL came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    Runtime,
    BuildTime,
    Default,
}

impl fmt::Display for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UrlSource::Runtime => "runtime",
            UrlSource::BuildTime => "build-time",
            UrlSource::Default => "default",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub source: UrlSource,
}

impl Config {
    /// Resolve the base URL: a runtime value wins over the build-time
    /// value, which wins over the local default. Blank values are skipped.
    pub fn resolve(runtime: Option<&str>) -> Self {
        Self::resolve_with(runtime, BUILD_TIME_API_URL)
    }

    /// Resolve using `ASKROUTER_API_URL` from the process environment as the
    /// runtime value.
    pub fn from_env() -> Self {
        let runtime = std::env::var(API_URL_ENV).ok();
        Self::resolve(runtime.as_deref())
    }

    fn resolve_with(runtime: Option<&str>, build_time: Option<&str>) -> Self {
        let candidates = [
            (runtime, UrlSource::Runtime),
            (build_time, UrlSource::BuildTime),
        ];

        candidates
            .into_iter()
            .find_map(|(value, source)| {
                let value = value?.trim().trim_end_matches('/');
                (!value.is_empty()).then(|| Self {
                    base_url: value.to_string(),
                    source,
                })
            })
            .unwrap_or_else(|| Self {
                base_url: DEFAULT_API_URL.to_string(),
                source: UrlSource::Default,
            })
    }
}
