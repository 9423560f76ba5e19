use std::sync::Arc;

use anyhow::Result;

use crate::Loader;

/// Link-time loader registration.
///
/// Any crate linked into the host can `inventory::submit!` a provider; the
/// manager falls back to these when no explicit factory exists for a tag.
#[derive(Clone, Copy)]
pub struct LoaderProvider {
    pub tag: &'static str,
    pub create: fn() -> Result<Arc<dyn Loader>>,
}

inventory::collect!(crate::providers::LoaderProvider);

pub fn find_provider(tag: &str) -> Option<&'static LoaderProvider> {
    inventory::iter::<LoaderProvider>
        .into_iter()
        .find(|provider| provider.tag == tag)
}

pub fn provided_tags() -> Vec<&'static str> {
    let mut tags = inventory::iter::<LoaderProvider>
        .into_iter()
        .map(|provider| provider.tag)
        .collect::<Vec<_>>();
    tags.sort_unstable();
    tags
}
