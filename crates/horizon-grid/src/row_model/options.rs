//! Row model configuration.
//!
//! [`GridSettings`] holds the plain, serializable knobs and can be loaded from
//! JSON. [`GridOptions`] wraps the settings together with the callback hooks
//! (row ids, tree-data paths, row heights, external filter) that cannot be
//! serialized.

use std::fmt;
use std::sync::Arc;

use horizon_grid_core::{GridError, Result};
use serde::{Deserialize, Serialize};

use super::node::RowNode;
use super::value::Record;

/// Extracts a stable row id from a record.
pub type RowIdFn = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// Extracts the tree-data path (ancestor keys, then own key) from a record.
pub type DataPathFn = Arc<dyn Fn(&Record) -> Vec<String> + Send + Sync>;

/// Computes a row height. `None` falls back to the default height.
pub type RowHeightFn = Arc<dyn Fn(&RowNode) -> Option<f64> + Send + Sync>;

/// Extra predicate applied to leaf rows in addition to the filter model.
pub type ExternalFilterFn = Arc<dyn Fn(&RowNode) -> bool + Send + Sync>;

/// What to do with a record whose group key is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NullGroupPolicy {
    /// Group null keys under their own group.
    #[default]
    Bucket,
    /// Stop grouping and keep the record at the current level.
    Skip,
}

/// What to do with an update for an id that is not in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingUpdatePolicy {
    /// Drop the update and report a warning.
    #[default]
    Skip,
    /// Treat the update as an add.
    Add,
}

/// How conditions of different columns combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterJoin {
    /// Every condition must pass.
    #[default]
    And,
    /// At least one condition must pass.
    Or,
}

/// Serializable row model settings.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::GridSettings;
///
/// let settings = GridSettings::from_json(r#"{"rowHeight": 30, "groupDefaultExpanded": -1}"#).unwrap();
/// assert_eq!(settings.row_height, 30.0);
/// assert!(settings.nulls_first);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridSettings {
    /// Default row height in pixels.
    pub row_height: f64,
    /// Expansion of newly created groups: 0 collapsed, -1 all levels, n the
    /// first n levels.
    pub group_default_expanded: i32,
    /// Emit a footer row after each expanded group.
    pub group_include_footer: bool,
    /// Emit a grand-total footer after all rows.
    pub group_include_total_footer: bool,
    /// Handling of null group keys.
    pub null_group_policy: NullGroupPolicy,
    /// Hide groups that have a single child and show the child in place.
    pub group_remove_single_children: bool,
    /// Let a group pass the filter when its own key matches.
    pub group_level_filter: bool,
    /// In tree data, do not keep the children of a matching parent.
    pub exclude_children_when_tree_data_filtering: bool,
    /// Sort null values before non-null values when ascending.
    pub nulls_first: bool,
    /// Count rows whose value is missing.
    pub count_includes_missing: bool,
    /// Handling of updates for unknown ids.
    pub missing_update_policy: MissingUpdatePolicy,
    /// How per-column filters combine.
    pub column_filter_join: FilterJoin,
    /// Pivot mode.
    pub pivot_mode: bool,
    /// Columns searched by the quick filter. Empty means every column.
    pub quick_filter_columns: Vec<String>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            row_height: 25.0,
            group_default_expanded: 0,
            group_include_footer: false,
            group_include_total_footer: false,
            null_group_policy: NullGroupPolicy::Bucket,
            group_remove_single_children: false,
            group_level_filter: false,
            exclude_children_when_tree_data_filtering: false,
            nulls_first: true,
            count_includes_missing: true,
            missing_update_policy: MissingUpdatePolicy::Skip,
            column_filter_join: FilterJoin::And,
            pivot_mode: false,
            quick_filter_columns: Vec::new(),
        }
    }
}

impl GridSettings {
    /// Parses settings from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(GridError::InvalidSettings)
    }

    /// Serializes settings to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(GridError::InvalidSettings)
    }

    /// Whether a group created at `level` starts expanded.
    pub fn is_expanded_by_default(&self, level: i32) -> bool {
        match self.group_default_expanded {
            -1 => true,
            n => level < n,
        }
    }
}

/// Full row model configuration.
///
/// # Example
///
/// ```
/// use horizon_grid::row_model::GridOptions;
///
/// let options = GridOptions::new()
///     .with_group_columns(["country", "year"])
///     .with_row_id(|record| record.value("id").to_key_string());
/// assert_eq!(options.group_columns().len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct GridOptions {
    /// Serializable settings.
    pub settings: GridSettings,
    group_columns: Vec<String>,
    pivot_columns: Vec<String>,
    row_id: Option<RowIdFn>,
    data_path: Option<DataPathFn>,
    tree_data: bool,
    row_height: Option<RowHeightFn>,
    external_filter: Option<ExternalFilterFn>,
}

impl fmt::Debug for GridOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridOptions")
            .field("settings", &self.settings)
            .field("group_columns", &self.group_columns)
            .field("pivot_columns", &self.pivot_columns)
            .field("row_id", &self.row_id.is_some())
            .field("tree_data", &self.tree_data)
            .field("row_height", &self.row_height.is_some())
            .field("external_filter", &self.external_filter.is_some())
            .finish()
    }
}

impl GridOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Groups rows by these columns, outermost first.
    pub fn with_group_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Pivots on these columns, outermost first.
    pub fn with_pivot_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pivot_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Derives row ids from records instead of generating them.
    pub fn with_row_id<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        self.row_id = Some(Arc::new(f));
        self
    }

    /// Enables tree data with the given path function.
    pub fn with_tree_data_path<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Vec<String> + Send + Sync + 'static,
    {
        self.data_path = Some(Arc::new(f));
        self.tree_data = true;
        self
    }

    /// Turns tree data on or off. A path function is required when on.
    pub fn with_tree_data(mut self, enabled: bool) -> Self {
        self.tree_data = enabled;
        self
    }

    /// Computes per-row heights.
    pub fn with_row_height_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RowNode) -> Option<f64> + Send + Sync + 'static,
    {
        self.row_height = Some(Arc::new(f));
        self
    }

    /// Adds a filter predicate applied to leaf rows.
    pub fn with_external_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&RowNode) -> bool + Send + Sync + 'static,
    {
        self.external_filter = Some(Arc::new(f));
        self
    }

    /// Row grouping columns.
    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    pub(crate) fn set_group_columns(&mut self, columns: Vec<String>) {
        self.group_columns = columns;
    }

    /// Pivot columns.
    pub fn pivot_columns(&self) -> &[String] {
        &self.pivot_columns
    }

    pub(crate) fn set_pivot_columns(&mut self, columns: Vec<String>) {
        self.pivot_columns = columns;
    }

    /// Whether tree data is enabled.
    pub fn is_tree_data(&self) -> bool {
        self.tree_data
    }

    /// Whether any grouping (row grouping or tree data) is active.
    pub fn is_grouping(&self) -> bool {
        self.tree_data || !self.group_columns.is_empty()
    }

    /// Whether the pivot stage produces result columns.
    pub fn is_pivot_active(&self) -> bool {
        self.settings.pivot_mode && !self.pivot_columns.is_empty()
    }

    pub(crate) fn row_id_fn(&self) -> Option<&RowIdFn> {
        self.row_id.as_ref()
    }

    pub(crate) fn data_path_fn(&self) -> Option<&DataPathFn> {
        self.data_path.as_ref()
    }

    pub(crate) fn row_height_fn(&self) -> Option<&RowHeightFn> {
        self.row_height.as_ref()
    }

    pub(crate) fn external_filter_fn(&self) -> Option<&ExternalFilterFn> {
        self.external_filter.as_ref()
    }

    /// Checks that the combination of options is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tree_data && self.data_path.is_none() {
            return Err(GridError::MissingTreeDataPath);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = GridSettings::default();
        assert_eq!(settings.row_height, 25.0);
        assert!(settings.nulls_first);
        assert!(settings.count_includes_missing);
        assert_eq!(settings.missing_update_policy, MissingUpdatePolicy::Skip);
    }

    #[test]
    fn test_settings_from_json_camel_case() {
        let settings = GridSettings::from_json(
            r#"{
                "groupIncludeFooter": true,
                "nullGroupPolicy": "skip",
                "missingUpdatePolicy": "add",
                "columnFilterJoin": "or",
                "quickFilterColumns": ["name"]
            }"#,
        )
        .unwrap();
        assert!(settings.group_include_footer);
        assert_eq!(settings.null_group_policy, NullGroupPolicy::Skip);
        assert_eq!(settings.missing_update_policy, MissingUpdatePolicy::Add);
        assert_eq!(settings.column_filter_join, FilterJoin::Or);
        assert_eq!(settings.quick_filter_columns, vec!["name".to_string()]);
        assert_eq!(settings.row_height, 25.0);
    }

    #[test]
    fn test_settings_invalid_json() {
        let err = GridSettings::from_json(r#"{"rowHeight": "tall"}"#).unwrap_err();
        assert!(matches!(err, GridError::InvalidSettings(_)));
    }

    #[test]
    fn test_default_expansion_levels() {
        let mut settings = GridSettings::default();
        assert!(!settings.is_expanded_by_default(0));
        settings.group_default_expanded = 1;
        assert!(settings.is_expanded_by_default(0));
        assert!(!settings.is_expanded_by_default(1));
        settings.group_default_expanded = -1;
        assert!(settings.is_expanded_by_default(5));
    }

    #[test]
    fn test_tree_data_requires_path() {
        let options = GridOptions::new().with_tree_data(true);
        assert!(matches!(
            options.validate(),
            Err(GridError::MissingTreeDataPath)
        ));

        let options = GridOptions::new().with_tree_data_path(|_| Vec::new());
        assert!(options.validate().is_ok());
        assert!(options.is_grouping());
    }
}
