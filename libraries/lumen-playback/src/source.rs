//! Media source boundary
//!
//! Abstracts the device media library (or any other catalogue) that
//! produces the items to play. The controller calls it once per
//! "load library" request and does no paging or caching of its own.

use crate::types::PlayableItem;
use async_trait::async_trait;
use thiserror::Error;

/// Media source errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Access to the library was denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Library could not be read
    #[error("Library unavailable: {0}")]
    Unavailable(String),
}

/// Producer of playable items
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Items in presentation order
    async fn load_items(&self) -> Result<Vec<PlayableItem>, SourceError>;
}

/// Fixed list of items
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: Vec<PlayableItem>,
}

impl StaticSource {
    pub fn new(items: Vec<PlayableItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl MediaSource for StaticSource {
    async fn load_items(&self) -> Result<Vec<PlayableItem>, SourceError> {
        Ok(self.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_returns_items_in_order() {
        let source = StaticSource::new(vec![
            PlayableItem::new("2", "/music/2.mp3", "Two"),
            PlayableItem::new("1", "/music/1.mp3", "One"),
        ]);

        let ids: Vec<String> = source
            .load_items()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }
}
