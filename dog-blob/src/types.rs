use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Tag name carrying the MIME type of a bundle item
pub const CONTENT_TYPE_TAG: &str = "Content-Type";

/// Content-derived identifier of an uploaded payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub String);

impl ContentId {
    /// Derive the id of a payload (SHA-256, base64url without padding)
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Link to an uploaded payload, as returned by a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLink(pub String);

impl RemoteLink {
    pub fn new<S: Into<String>>(link: S) -> Self {
        Self(link.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RemoteLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name/value pair attached to a bundle item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One independently addressable payload inside a bundle
#[derive(Debug, Clone)]
pub struct BundleItem {
    pub data: Bytes,
    pub tags: Vec<Tag>,
}

impl BundleItem {
    pub fn new<B: Into<Bytes>>(data: B) -> Self {
        Self {
            data: data.into(),
            tags: Vec::new(),
        }
    }

    /// Attach a tag
    pub fn with_tag<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Attach the `Content-Type` tag
    pub fn with_content_type<S: Into<String>>(self, content_type: S) -> Self {
        self.with_tag(CONTENT_TYPE_TAG, content_type)
    }

    /// MIME type declared through tags, if any
    pub fn content_type(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.name == CONTENT_TYPE_TAG)
            .map(|tag| tag.value.as_str())
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Cumulative payload size of a bundle
pub fn bundle_size(items: &[BundleItem]) -> u64 {
    items.iter().map(BundleItem::size_bytes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_is_stable_and_url_safe() {
        let a = ContentId::of(b"hello");
        let b = ContentId::of(b"hello");
        let c = ContentId::of(b"hello!");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 43);
        assert!(!a.as_str().contains(['+', '/', '=']));
    }

    #[test]
    fn bundle_item_reports_content_type() {
        let item = BundleItem::new(vec![1u8, 2, 3])
            .with_tag("App-Name", "dog-mint")
            .with_content_type("image/png");

        assert_eq!(item.content_type(), Some("image/png"));
        assert_eq!(item.size_bytes(), 3);
        assert_eq!(bundle_size(&[item.clone(), item]), 6);
    }
}
