use serde::Deserialize;

use crate::error::Result;

/// Construction options for a component.
///
/// Options are applied once, under a single update lock, so assigning several
/// of them produces no intermediate notifications. When parsed from JSON, keys
/// that are not recognized are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Component ID. Generated if absent.
    pub id: Option<String>,
    /// DOM `id` attribute of the root element.
    pub node_id: Option<String>,
    /// Replacement for the renderer's base CSS class.
    pub css_prefix: Option<String>,
    /// Extra classes for the root element, separated by spaces.
    pub css_class: Option<String>,
    /// Initial disabled state.
    pub disabled: Option<bool>,
    /// Initial readonly state.
    pub readonly: Option<bool>,
    /// Initial checked state.
    pub checked: Option<bool>,
    /// Initial selected state.
    pub selected: Option<bool>,
    /// Initial opened state.
    pub opened: Option<bool>,
    /// Initial active state.
    pub active: Option<bool>,
    /// Initial focused state.
    pub focused: Option<bool>,
    /// Initial indeterminate state.
    pub indeterminate: Option<bool>,
}

impl Options {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the component ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the DOM `id` attribute.
    pub fn node_id(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    /// Set the CSS prefix.
    pub fn css_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.css_prefix = Some(prefix.into());
        self
    }

    /// Set extra CSS classes.
    pub fn css_class(mut self, class: impl Into<String>) -> Self {
        self.css_class = Some(class.into());
        self
    }

    /// Set the initial disabled state.
    pub fn disabled(mut self, v: bool) -> Self {
        self.disabled = Some(v);
        self
    }

    /// Set the initial readonly state.
    pub fn readonly(mut self, v: bool) -> Self {
        self.readonly = Some(v);
        self
    }

    /// Set the initial checked state.
    pub fn checked(mut self, v: bool) -> Self {
        self.checked = Some(v);
        self
    }

    /// Set the initial selected state.
    pub fn selected(mut self, v: bool) -> Self {
        self.selected = Some(v);
        self
    }

    /// Set the initial opened state.
    pub fn opened(mut self, v: bool) -> Self {
        self.opened = Some(v);
        self
    }

    /// Set the initial active state.
    pub fn active(mut self, v: bool) -> Self {
        self.active = Some(v);
        self
    }

    /// Set the initial focused state.
    pub fn focused(mut self, v: bool) -> Self {
        self.focused = Some(v);
        self
    }

    /// Set the initial indeterminate state.
    pub fn indeterminate(mut self, v: bool) -> Self {
        self.indeterminate = Some(v);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keys_are_camel_case() -> Result<()> {
        let o = Options::from_json(
            r#"{"id": "a", "nodeId": "n", "cssPrefix": "p", "cssClass": "x y", "checked": true}"#,
        )?;
        assert_eq!(
            o,
            Options::new()
                .id("a")
                .node_id("n")
                .css_prefix("p")
                .css_class("x y")
                .checked(true)
        );
        Ok(())
    }

    #[test]
    fn unknown_keys_are_ignored() -> Result<()> {
        let o = Options::from_json(r#"{"domHelper": {}, "flavour": 3, "opened": false}"#)?;
        assert_eq!(o, Options::new().opened(false));
        Ok(())
    }

    #[test]
    fn wrong_types_are_invalid() {
        assert!(Options::from_json(r#"{"checked": "yes"}"#).is_err());
    }
}
