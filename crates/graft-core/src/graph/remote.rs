//! Remote URL normalization for CDN hosts.

use crate::config::{BuildConfig, DEFAULT_ES_TARGET};
use url::{form_urlencoded, Url};

/// Which hosts get normalized, and to what language level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOptions {
    pub cdn_hosts: Vec<String>,
    pub target: String,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            cdn_hosts: vec!["esm.sh".to_string()],
            target: DEFAULT_ES_TARGET.to_string(),
        }
    }
}

impl RemoteOptions {
    #[must_use]
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            cdn_hosts: config.cdn_hosts.clone(),
            target: config.compiler.target.clone(),
        }
    }

    #[must_use]
    pub fn is_cdn_host(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.cdn_hosts.iter().any(|h| h == host))
    }
}

/// Request the production, declaration-free, fixed-target build of a CDN module.
///
/// Drops `dev`, sets `no-dts` and `target`. Other parameters are kept
/// verbatim and in order. URLs on other hosts are returned unchanged.
#[must_use]
pub fn prepare_remote_url(url: &Url, options: &RemoteOptions) -> Url {
    if !options.is_cdn_host(url) {
        return url.clone();
    }

    let mut params: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|param| {
            let key = param.split_once('=').map_or(*param, |(key, _)| key);
            !key.is_empty() && !matches!(key, "dev" | "no-dts" | "target")
        })
        .map(String::from)
        .collect();
    params.push("no-dts=".to_string());
    params.push(format!(
        "target={}",
        form_urlencoded::byte_serialize(options.target.as_bytes()).collect::<String>()
    ));

    let mut prepared = url.clone();
    prepared.set_query(Some(&params.join("&")));
    prepared
}
