//! Current location and share-link construction.

use url::Url;

/// The location the workbench was opened at.
///
/// The fragment (if any) carries a shareable token; share links are built from the location
/// without its fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Parse a location from an absolute URL.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Url::parse(input).map(Self::from)
    }

    /// The fragment, if present and non-empty.
    pub fn fragment(&self) -> Option<&str> {
        self.url.fragment().filter(|fragment| !fragment.is_empty())
    }

    /// Remove the fragment so a reload does not decode the same token again.
    pub fn clear_fragment(&mut self) {
        self.url.set_fragment(None);
    }

    /// The location without its fragment.
    pub fn base(&self) -> String {
        let mut base = self.url.clone();
        base.set_fragment(None);
        base.into()
    }

    /// A link to this location carrying `token` as its fragment.
    pub fn share_link(&self, token: &str) -> String {
        format!("{}#{}", self.base(), token)
    }

    /// The full location, including any fragment.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        Self { url }
    }
}
