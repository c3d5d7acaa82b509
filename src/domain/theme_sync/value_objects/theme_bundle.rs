//! Theme Bundle
//! The decoded `theme.json` document: templates carry their body inline, assets link to a download

use std::collections::HashMap;

use getset::Getters;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct ThemeEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    file_name: String,
    #[serde(rename = "_links", default)]
    links: HashMap<String, Link>,
}

impl ThemeEntry {
    /// Templates are stored as `<name>.<content_type>`
    pub fn template_file_name(&self) -> String {
        format!("{}.{}", self.name, self.content_type)
    }

    /// Assets are downloaded from their `file` link, or the `image` link for images
    pub fn asset_href(&self) -> Option<&str> {
        ["file", "image"]
            .iter()
            .filter_map(|rel| self.links.get(*rel))
            .find_map(|link| link.href.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ThemeBundle {
    #[serde(rename = "_embedded", default)]
    embedded: HashMap<String, Vec<ThemeEntry>>,
}

impl ThemeBundle {
    pub fn templates(&self) -> &[ThemeEntry] {
        self.entries("templates")
    }

    pub fn assets(&self) -> &[ThemeEntry] {
        self.entries("assets")
    }

    fn entries(&self, rel: &str) -> &[ThemeEntry] {
        self.embedded.get(rel).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_should_decode_templates_and_assets() {
        let body = r#"{
            "_class": ["theme"],
            "_embedded": {
                "templates": [
                    {"name": "layout", "content_type": "html", "body": "<html></html>"}
                ],
                "assets": [
                    {"file_name": "logo.png", "_links": {"image": {"href": "https://cdn/logo.png"}}},
                    {"file_name": "app.js", "_links": {"file": {"href": "https://cdn/app.js"}, "image": {"href": "https://cdn/other"}}}
                ]
            },
            "_links": {"self": {"href": "https://api/theme.json"}}
        }"#;

        let bundle: ThemeBundle = serde_json::from_str(body).unwrap();
        assert_eq!(bundle.templates().len(), 1);
        assert_eq!(bundle.templates()[0].template_file_name(), "layout.html");
        assert_eq!(bundle.assets()[0].asset_href(), Some("https://cdn/logo.png"));
        assert_eq!(bundle.assets()[1].asset_href(), Some("https://cdn/app.js"));
    }

    #[test]
    fn missing_sections_are_empty() {
        let bundle: ThemeBundle = serde_json::from_str("{}").unwrap();
        assert!(bundle.templates().is_empty());
        assert!(bundle.assets().is_empty());
    }
}
