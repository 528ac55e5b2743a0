#![forbid(unsafe_code)]

//! Tour definitions: [`Step`] and [`Tour`].
//!
//! Both types are plain data. They are immutable once built, can be loaded
//! from JSON, and are only validated when a run is constructed from them
//! (see [`Tour::validate`]).
//!
//! # Example
//!
//! ```
//! use featuretour::model::{Step, Tour};
//!
//! let tour = Tour::new(
//!     "Welcome",
//!     vec![
//!         Step::new("Toolbar", "Toolbar", "Common commands live here."),
//!         Step::new("Editor", "Editor", "Type here.").with_id("editor-intro"),
//!     ],
//! )
//! .show_next_button_default(true);
//!
//! assert_eq!(tour.steps()[1].id(), "editor-intro");
//! assert!(tour.validate().is_ok());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, TourError};

/// Deserialize `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One stop of a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(
        rename = "elementID",
        alias = "elementId",
        default,
        deserialize_with = "null_as_default"
    )]
    element_id: String,
    #[serde(alias = "ID", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    header: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    show_next_button: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    header_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_template: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    tag: Value,
}

impl Step {
    /// Create a step anchored at `element_id`. Its identity defaults to the
    /// same key.
    pub fn new(
        element_id: impl Into<String>,
        header: impl Into<Value>,
        content: impl Into<Value>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            id: None,
            header: header.into(),
            content: content.into(),
            show_next_button: None,
            header_template: None,
            content_template: None,
            tag: Value::Null,
        }
    }

    /// Give the step an identity different from its anchor key.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the tour's next-button default for this step.
    #[must_use]
    pub fn show_next_button(mut self, show: bool) -> Self {
        self.show_next_button = Some(show);
        self
    }

    /// Template key used to render the header.
    #[must_use]
    pub fn header_template(mut self, key: impl Into<String>) -> Self {
        self.header_template = Some(key.into());
        self
    }

    /// Template key used to render the content.
    #[must_use]
    pub fn content_template(mut self, key: impl Into<String>) -> Self {
        self.content_template = Some(key.into());
        self
    }

    /// Attach opaque host data.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<Value>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Key of the anchor element.
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// Logical identity used for hooks and step comparisons.
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.element_id)
    }

    /// Header payload.
    pub fn header(&self) -> &Value {
        &self.header
    }

    /// Content payload.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Per-step next-button setting; `None` inherits the tour default.
    pub fn next_button(&self) -> Option<bool> {
        self.show_next_button
    }

    /// Header template key.
    pub fn header_template_key(&self) -> Option<&str> {
        self.header_template.as_deref()
    }

    /// Content template key.
    pub fn content_template_key(&self) -> Option<&str> {
        self.content_template.as_deref()
    }

    /// Opaque host data.
    pub fn tag_value(&self) -> &Value {
        &self.tag
    }
}

/// An ordered sequence of steps plus tour-wide button settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default)]
    show_next_button_default: bool,
    #[serde(default)]
    enable_next_button_always: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    steps: Vec<Step>,
}

impl Tour {
    /// Create a tour.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            show_next_button_default: false,
            enable_next_button_always: false,
            steps,
        }
    }

    /// Show the next button on steps that do not say otherwise.
    #[must_use]
    pub fn show_next_button_default(mut self, show: bool) -> Self {
        self.show_next_button_default = show;
        self
    }

    /// Enable the next button even when the next anchor is not available yet.
    #[must_use]
    pub fn enable_next_button_always(mut self, enable: bool) -> Self {
        self.enable_next_button_always = enable;
        self
    }

    /// Load a tour definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the tour definition to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Tour name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tour-wide next-button default.
    pub fn next_button_default(&self) -> bool {
        self.show_next_button_default
    }

    /// Whether the next button is enabled unconditionally.
    pub fn next_button_always_enabled(&self) -> bool {
        self.enable_next_button_always
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Check that the tour can be run.
    ///
    /// Fails when there are no steps or when a step has an empty anchor key.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(TourError::EmptySteps);
        }
        if let Some(index) = self.steps.iter().position(|s| s.element_id.is_empty()) {
            return Err(TourError::BlankElementId { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Step ─────────────────────────────────────────────────────────────

    #[test]
    fn id_defaults_to_element_id() {
        let step = Step::new("Button", "h", "c");
        assert_eq!(step.id(), "Button");
        assert_eq!(step.with_id("other").id(), "other");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let step = Step::new("E", json!({"title": "T"}), "c")
            .show_next_button(false)
            .header_template("HeaderTpl")
            .content_template("ContentTpl")
            .tag(7);
        assert_eq!(step.header()["title"], "T");
        assert_eq!(step.next_button(), Some(false));
        assert_eq!(step.header_template_key(), Some("HeaderTpl"));
        assert_eq!(step.content_template_key(), Some("ContentTpl"));
        assert_eq!(step.tag_value(), &json!(7));
    }

    // ── Validation ───────────────────────────────────────────────────────

    #[test]
    fn empty_tour_is_rejected() {
        let err = Tour::new("t", vec![]).validate().unwrap_err();
        assert!(matches!(err, TourError::EmptySteps));
    }

    #[test]
    fn blank_element_id_is_rejected_with_index() {
        let tour = Tour::new("t", vec![Step::new("a", "", ""), Step::new("", "", "")]);
        let err = tour.validate().unwrap_err();
        assert!(matches!(err, TourError::BlankElementId { index: 1 }));
    }

    // ── JSON ─────────────────────────────────────────────────────────────

    #[test]
    fn null_steps_load_but_fail_validation() {
        let tour = Tour::from_json(r#"{"name": "t", "steps": null}"#).unwrap();
        assert!(tour.steps().is_empty());
        assert!(matches!(tour.validate(), Err(TourError::EmptySteps)));
    }

    #[test]
    fn null_element_id_loads_but_fails_validation() {
        let tour =
            Tour::from_json(r#"{"name": "t", "steps": [{"elementID": null, "header": "h"}]}"#)
                .unwrap();
        assert!(matches!(
            tour.validate(),
            Err(TourError::BlankElementId { index: 0 })
        ));
    }

    #[test]
    fn json_uses_camel_case_fields() {
        let json = r#"{
            "name": "Intro",
            "showNextButtonDefault": true,
            "enableNextButtonAlways": true,
            "steps": [
                {"elementID": "A", "header": "Header A", "content": {"text": "x"}},
                {"elementId": "B", "ID": "b-step", "showNextButton": false,
                 "headerTemplate": "H", "contentTemplate": "C", "tag": [1, 2]}
            ]
        }"#;
        let tour = Tour::from_json(json).unwrap();
        assert_eq!(tour.name(), "Intro");
        assert!(tour.next_button_default());
        assert!(tour.next_button_always_enabled());
        assert_eq!(tour.steps()[0].id(), "A");
        assert_eq!(tour.steps()[0].content()["text"], "x");
        assert_eq!(tour.steps()[1].element_id(), "B");
        assert_eq!(tour.steps()[1].id(), "b-step");
        assert_eq!(tour.steps()[1].next_button(), Some(false));
        assert_eq!(tour.steps()[1].tag_value(), &json!([1, 2]));
    }

    #[test]
    fn to_json_writes_element_id_key() {
        let tour = Tour::new("t", vec![Step::new("A", "h", "c")]);
        let json = tour.to_json().unwrap();
        assert!(json.contains("\"elementID\": \"A\""));
        assert_eq!(Tour::from_json(&json).unwrap(), tour);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Tour::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TourError::Parse(_)));
    }
}
