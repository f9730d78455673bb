//! Social media link model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    /// Unique, lower-case platform name.
    pub platform: String,
    pub url: String,
    pub enabled: bool,
    pub updated_at: u64,
}

/// One entry of a bulk update request.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialLinkInput {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialLinksUpdate {
    #[serde(default)]
    pub links: Option<Vec<SocialLinkInput>>,
}
