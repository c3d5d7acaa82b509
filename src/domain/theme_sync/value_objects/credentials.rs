use derivative::Derivative;
use getset::Getters;
use url::Url;

/// Access to the theme API. The token is kept out of `Debug` output.
#[derive(Derivative, Clone, PartialEq, Eq, Getters)]
#[derivative(Debug)]
#[getset(get = "pub")]
pub struct Credentials {
    api_url: Url,
    #[derivative(Debug = "ignore")]
    access_token: String,
}

impl Credentials {
    pub fn new(api_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            api_url,
            access_token: access_token.into(),
        }
    }

    /// `{api_url}/shops/{shop_id}/theme.json`, with `shop_id` percent-encoded as one segment.
    /// The api url is checked to be a base url at startup.
    pub fn theme_endpoint(&self, shop_id: &str) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["shops", shop_id, "theme.json"]);
        }
        url
    }
}
