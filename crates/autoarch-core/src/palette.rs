//! Static catalog of placeable component kinds, plus the fixed color and
//! icon registries the inspector offers.

use serde::Serialize;

use crate::canvas::DragPayload;
use crate::{ProjectType, GROUP_TYPE};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaletteItem {
    #[serde(rename = "type")]
    pub item_type: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    /// Quick-start items load this template on click instead of being dragged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<&'static str>,
}

impl PaletteItem {
    const fn new(
        item_type: &'static str,
        label: &'static str,
        color: Option<&'static str>,
        icon: &'static str,
    ) -> Self {
        Self {
            item_type,
            label,
            color,
            icon: Some(icon),
            template_id: None,
        }
    }

    const fn template(
        item_type: &'static str,
        label: &'static str,
        color: &'static str,
        icon: &'static str,
        template_id: &'static str,
    ) -> Self {
        Self {
            item_type,
            label,
            color: Some(color),
            icon: Some(icon),
            template_id: Some(template_id),
        }
    }

    pub fn is_template(&self) -> bool {
        self.template_id.is_some()
    }

    pub fn is_group(&self) -> bool {
        self.item_type == GROUP_TYPE
    }

    /// The payload carried by a drag from this item. Template items are
    /// click-only and produce none.
    pub fn drag_payload(&self) -> Option<DragPayload> {
        if self.is_template() {
            return None;
        }
        Some(DragPayload {
            node_type: self.item_type.to_string(),
            label: self.label.to_string(),
            icon: self.icon.map(str::to_string),
            color: self.color.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum PaletteEntry {
    Item(PaletteItem),
    Subcategory {
        name: &'static str,
        items: &'static [PaletteItem],
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub name: &'static str,
    pub entries: &'static [PaletteEntry],
}

impl Category {
    pub fn items(&self) -> impl Iterator<Item = &'static PaletteItem> {
        self.entries.iter().flat_map(|entry| match entry {
            PaletteEntry::Item(item) => std::slice::from_ref(item).iter(),
            PaletteEntry::Subcategory { items, .. } => items.iter(),
        })
    }
}

use PaletteEntry::{Item, Subcategory};

static CATALOG: &[Category] = &[
    Category {
        name: "Clients",
        entries: &[
            Subcategory {
                name: "Mobile",
                items: &[
                    PaletteItem::template("Mobile App", "iOS App", "bg-purple-600", "Mobile", "ios"),
                    PaletteItem::template("Mobile App", "Android App", "bg-green-600", "Mobile", "android"),
                ],
            },
            Subcategory {
                name: "Web",
                items: &[
                    PaletteItem::template("Web App", "React App", "bg-blue-500", "Web", "react"),
                    PaletteItem::template("Web App", "Next.js App", "bg-black", "Web", "nextjs"),
                    PaletteItem::new("SPA", "SPA (TypeScript)", Some("bg-blue-400"), "Code"),
                ],
            },
        ],
    },
    Category {
        name: "Infrastructure",
        entries: &[
            Item(PaletteItem::new(GROUP_TYPE, "Layer Group", None, "Group")),
            Item(PaletteItem::new("Kubernetes", "Kubernetes", None, "Kubernetes")),
            Item(PaletteItem::new("Docker", "Docker", None, "Docker")),
            Item(PaletteItem::new("Server", "Server", None, "Server")),
            Item(PaletteItem::new("Cloud", "Cloud", None, "Cloud")),
            Item(PaletteItem::new("Load Balancer", "Load Balancer", Some("bg-yellow-500"), "Server")),
            Item(PaletteItem::new("Nginx", "Nginx", Some("bg-green-500"), "Server")),
            Item(PaletteItem::new("Apache", "Apache", Some("bg-red-500"), "Server")),
            Item(PaletteItem::new("API Gateway", "API Gateway", Some("bg-orange-500"), "Gateway")),
            Item(PaletteItem::new("CDN", "CDN", Some("bg-cyan-500"), "Cloud")),
            Item(PaletteItem::new("Static Content", "Static Content", Some("bg-green-500"), "File")),
        ],
    },
    Category {
        name: "Services",
        entries: &[
            Item(PaletteItem::new("Microservice", "Microservice", Some("bg-green-600"), "Microservice")),
            Item(PaletteItem::new("Service Discovery", "Service Discovery", Some("bg-indigo-500"), "Compass")),
            Item(PaletteItem::new("Management", "Management", Some("bg-gray-500"), "Settings")),
        ],
    },
    Category {
        name: "Data & Messaging",
        entries: &[
            Item(PaletteItem::new("Database", "Database", Some("bg-red-600"), "Database")),
            Item(PaletteItem::new("RabbitMQ/KAFKA", "RabbitMQ/KAFKA", Some("bg-blue-800"), "Queue")),
            Item(PaletteItem::new("Logstash", "Logstash", Some("bg-yellow-600"), "Log")),
            Item(PaletteItem::new("ELK", "ELK Stack", Some("bg-blue-400"), "Stack")),
        ],
    },
    Category {
        name: "Notifications",
        entries: &[
            Item(PaletteItem::new("Email", "Email", Some("bg-blue-300"), "Mail")),
            Item(PaletteItem::new("SMS", "SMS", Some("bg-blue-300"), "Chat")),
            Item(PaletteItem::new("Alerts", "Alerts", Some("bg-red-500"), "Bell")),
        ],
    },
];

pub fn catalog() -> &'static [Category] {
    CATALOG
}

/// Every item across all categories, in display order.
pub fn items() -> impl Iterator<Item = &'static PaletteItem> {
    CATALOG.iter().flat_map(Category::items)
}

pub fn find_by_label(label: &str) -> Option<&'static PaletteItem> {
    items().find(|item| item.label == label)
}

// --- Templates ---

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TemplateInfo {
    pub id: &'static str,
    pub title: &'static str,
}

const MOBILE_TEMPLATES: &[TemplateInfo] = &[
    TemplateInfo { id: "ios", title: "iOS Standard Architecture" },
    TemplateInfo { id: "android", title: "Android MVVM Architecture" },
];

const WEB_TEMPLATES: &[TemplateInfo] = &[
    TemplateInfo { id: "react", title: "React SPA" },
    TemplateInfo { id: "nextjs", title: "Next.js Full Stack" },
];

/// Templates offered at project setup for a given project type.
pub fn templates_for(project_type: ProjectType) -> &'static [TemplateInfo] {
    match project_type {
        ProjectType::Mobile => MOBILE_TEMPLATES,
        ProjectType::Web => WEB_TEMPLATES,
    }
}

// --- Colors & icons ---

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ColorToken {
    pub name: &'static str,
    pub value: &'static str,
}

pub const COLORS: &[ColorToken] = &[
    ColorToken { name: "Blue", value: "bg-blue-600" },
    ColorToken { name: "Green", value: "bg-green-600" },
    ColorToken { name: "Red", value: "bg-red-600" },
    ColorToken { name: "Purple", value: "bg-purple-600" },
    ColorToken { name: "Orange", value: "bg-orange-500" },
    ColorToken { name: "Gray", value: "bg-gray-500" },
    ColorToken { name: "Teal", value: "bg-teal-600" },
    ColorToken { name: "Indigo", value: "bg-indigo-600" },
];

/// Shown by the inspector for a node that has no color yet.
pub const DEFAULT_COLOR: &str = "bg-blue-600";

pub fn is_palette_color(value: &str) -> bool {
    COLORS.iter().any(|c| c.value == value)
}

pub const ICON_KEYS: &[&str] = &[
    "Mobile",
    "Web",
    "Code",
    "Group",
    "Kubernetes",
    "Docker",
    "Server",
    "Cloud",
    "Gateway",
    "File",
    "Microservice",
    "Compass",
    "Settings",
    "Database",
    "Queue",
    "Log",
    "Stack",
    "Mail",
    "Chat",
    "Bell",
    "Key",
];

pub fn is_known_icon(key: &str) -> bool {
    ICON_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn template_items_are_click_only() {
        let ios = find_by_label("iOS App").expect("ios item");
        assert_eq!(ios.template_id, Some("ios"));
        assert!(ios.drag_payload().is_none());
    }

    #[test]
    fn draggable_items_carry_their_defaults() {
        let db = find_by_label("Database").expect("database item");
        let payload = db.drag_payload().expect("payload");
        assert_eq!(payload.node_type, "Database");
        assert_eq!(payload.label, "Database");
        assert_eq!(payload.icon.as_deref(), Some("Database"));
        assert_eq!(payload.color.as_deref(), Some("bg-red-600"));
    }

    #[test]
    fn group_item_has_no_color() {
        let group = items().find(|i| i.is_group()).expect("group item");
        assert_eq!(group.label, "Layer Group");
        assert_eq!(group.drag_payload().and_then(|p| p.color), None);
    }

    #[test]
    fn every_icon_in_the_catalog_is_registered() {
        for item in items() {
            let icon = item.icon.expect("icon");
            assert!(is_known_icon(icon), "{icon} missing from registry");
        }
    }

    #[test]
    fn labels_are_unique() {
        let labels: Vec<&str> = items().map(|i| i.label).collect();
        let unique: HashSet<&str> = labels.iter().copied().collect();
        assert_eq!(labels.len(), unique.len());
    }

    #[test]
    fn palette_templates_are_offered_at_setup() {
        let offered: HashSet<&str> = [ProjectType::Mobile, ProjectType::Web]
            .into_iter()
            .flat_map(|t| templates_for(t).iter().map(|info| info.id))
            .collect();
        for item in items().filter(|i| i.is_template()) {
            assert!(offered.contains(item.template_id.expect("template id")));
        }
    }

    #[test]
    fn catalog_serializes_with_wire_names() {
        let value = serde_json::to_value(catalog()).expect("value");
        assert_eq!(value[0]["name"], "Clients");
        assert_eq!(value[0]["entries"][0]["items"][0]["templateId"], "ios");
        assert_eq!(value[1]["entries"][0]["type"], "group");
    }

    #[test]
    fn default_color_is_in_palette() {
        assert!(is_palette_color(DEFAULT_COLOR));
        assert!(!is_palette_color("#ff00ff"));
    }
}
