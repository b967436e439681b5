#![forbid(unsafe_code)]

//! Vocabulary of the SAS Visual Analytics BIRD report dialect.

/// Two-letter prefix reserved for prompt definitions (`pr12`).
pub const PROMPT_PREFIX: &str = "pr";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // Top-level sections
    pub const DATA_SOURCES: &str = "DataSources";
    pub const DATA_DEFINITIONS: &str = "DataDefinitions";
    pub const VISUAL_ELEMENTS: &str = "VisualElements";
    pub const ACTIONS: &str = "Actions";

    // Report objects
    pub const PARENT_DATA_DEFINITION: &str = "ParentDataDefinition";
    pub const DATA_DEFINITION: &str = "DataDefinition";
    pub const DATA_SOURCE: &str = "DataSource";
    pub const DATA_ITEM: &str = "DataItem";
    pub const PREDEFINED_DATA_ITEM: &str = "PredefinedDataItem";
    pub const IMAGE: &str = "Image";
    pub const VISUAL_CONTAINER: &str = "VisualContainer";
    pub const PROMPT: &str = "Prompt";
    pub const MEDIA_CONTAINER: &str = "MediaContainer";
    pub const SECTION: &str = "Section";
    pub const CONTAINER: &str = "Container";
    pub const NAVIGATION_ACTION: &str = "NavigationAction";

    // Elements that legitimately repeat a `name` across contexts
    pub const DYN_VAR: &str = "DynVar";
    pub const CATEGORY: &str = "Category";
    pub const PROPERTY: &str = "Property";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const HISTOGRAM_PARM: &str = "HistogramParm";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    /// Identity attribute: its value declares the element's identifier.
    pub const NAME: &str = "name";
    /// Root counter supplying the next free numeric suffix.
    pub const NEXT_UNIQUE_NAME_INDEX: &str = "nextUniqueNameIndex";
}
