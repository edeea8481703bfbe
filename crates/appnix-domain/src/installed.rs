use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPaths {
    pub bin: PathBuf,
    pub desktop: PathBuf,
    pub icon: Option<PathBuf>,
}

/// One application known to be installed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledAppRecord {
    pub name: String,
    pub app_name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub paths: InstalledPaths,
    /// RFC 3339 timestamp of the install.
    #[serde(rename = "installedAt")]
    pub installed_at: String,
}

/// Identifier → record mapping, serialized as a flat JSON object in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstalledRegistry {
    apps: IndexMap<String, InstalledAppRecord>,
}

impl InstalledRegistry {
    /// Inserts `record` under its identifier, returning any record it replaced.
    pub fn upsert(&mut self, record: InstalledAppRecord) -> Option<InstalledAppRecord> {
        self.apps.insert(record.app_name.clone(), record)
    }

    pub fn remove(&mut self, app_name: &str) -> Option<InstalledAppRecord> {
        self.apps.shift_remove(app_name)
    }

    pub fn get(&self, app_name: &str) -> Option<&InstalledAppRecord> {
        self.apps.get(app_name)
    }

    pub fn contains(&self, app_name: &str) -> bool {
        self.apps.contains_key(app_name)
    }

    pub fn records(&self) -> impl Iterator<Item = &InstalledAppRecord> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> InstalledAppRecord {
        InstalledAppRecord {
            name: id.to_uppercase(),
            app_name: id.to_string(),
            url: format!("https://{id}.example"),
            category: "Utility".to_string(),
            description: String::new(),
            paths: InstalledPaths {
                bin: PathBuf::from(format!("/home/u/.config/appnix/bin/{id}")),
                desktop: PathBuf::from(format!("/home/u/.local/share/applications/{id}.desktop")),
                icon: None,
            },
            installed_at: "2026-01-02T03:04:05Z".to_string(),
        }
    }

    #[test]
    fn serializes_as_flat_object_with_camel_case_timestamp() {
        let mut registry = InstalledRegistry::default();
        registry.upsert(record("wikipedia"));
        let value = serde_json::to_value(&registry).expect("serialize");
        assert_eq!(
            value,
            json!({
                "wikipedia": {
                    "name": "WIKIPEDIA",
                    "app_name": "wikipedia",
                    "url": "https://wikipedia.example",
                    "category": "Utility",
                    "description": "",
                    "paths": {
                        "bin": "/home/u/.config/appnix/bin/wikipedia",
                        "desktop": "/home/u/.local/share/applications/wikipedia.desktop",
                        "icon": null,
                    },
                    "installedAt": "2026-01-02T03:04:05Z",
                }
            })
        );
    }

    #[test]
    fn upsert_overwrites_existing_identifier() {
        let mut registry = InstalledRegistry::default();
        assert!(registry.upsert(record("a")).is_none());
        let mut newer = record("a");
        newer.installed_at = "2026-02-01T00:00:00Z".to_string();
        let previous = registry.upsert(newer.clone()).expect("replaced");
        assert_eq!(previous.installed_at, "2026-01-02T03:04:05Z");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a"), Some(&newer));
    }

    #[test]
    fn remove_keeps_order_of_remaining_records() {
        let mut registry = InstalledRegistry::default();
        for id in ["a", "b", "c"] {
            registry.upsert(record(id));
        }
        assert_eq!(registry.remove("b").map(|r| r.app_name), Some("b".into()));
        assert!(registry.remove("b").is_none());
        let ids: Vec<_> = registry.records().map(|r| r.app_name.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
