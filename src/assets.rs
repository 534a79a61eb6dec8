//! Default avatars and placeholder media for sources that have none.

use std::collections::HashMap;

use crate::config::AssetConfig;
use crate::model::Category;

/// Lookup table from source name or category to a default avatar, plus the
/// placeholder-image template. Built once from configuration and shared by
/// every adapter.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    default_avatar: String,
    placeholder_image: String,
    avatars: HashMap<String, String>,
}

fn builtin_avatar(category: Category) -> Option<&'static str> {
    let url = match category {
        Category::Tech => "https://images.unsplash.com/photo-1485827404703-89b55fcc595e?w=100&h=100&fit=crop&crop=face",
        Category::Sports => "https://images.unsplash.com/photo-1461896836934-ffe607ba8211?w=100&h=100&fit=crop&crop=face",
        Category::Crypto => "https://images.unsplash.com/photo-1621761191319-c6fb62004040?w=100&h=100&fit=crop&crop=face",
        _ => return None,
    };
    Some(url)
}

impl AssetCatalog {
    pub fn from_config(config: &AssetConfig) -> Self {
        let mut avatars: HashMap<String, String> = Category::ALL
            .iter()
            .filter_map(|c| builtin_avatar(*c).map(|url| (c.as_str().to_string(), url.to_string())))
            .collect();
        for (key, url) in &config.avatars {
            avatars.insert(key.to_lowercase(), url.clone());
        }

        Self {
            default_avatar: config.default_avatar.clone(),
            placeholder_image: config.placeholder_image.clone(),
            avatars,
        }
    }

    /// Source-specific avatar first, then the category's, then the global default.
    pub fn avatar_for(&self, source_name: &str, category: Category) -> &str {
        self.avatars
            .get(&source_name.to_lowercase())
            .or_else(|| self.avatars.get(category.as_str()))
            .map(String::as_str)
            .unwrap_or(&self.default_avatar)
    }

    /// Deterministic placeholder image: the same seed always yields the same URL.
    pub fn placeholder_image(&self, seed: &str) -> String {
        let seed: String = seed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(48)
            .collect();
        self.placeholder_image.replace("{seed}", &seed)
    }

    /// Avatar for a person-like handle (commenters, synthetic authors).
    pub fn person_avatar(&self, handle: &str) -> String {
        format!("https://i.pravatar.cc/150?u={}", handle)
    }
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self::from_config(&AssetConfig::default())
    }
}
