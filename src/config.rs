//! Layout configuration.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::unicode::WidthMethod;

/// Soft-wrap mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// No wrapping - lines extend beyond the viewport.
    #[default]
    None,
    /// Wrap at grapheme boundaries.
    Char,
    /// Wrap after whitespace, falling back to grapheme boundaries.
    Word,
}

/// Options of one display: wrap, tabs and viewport size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Columns per tab stop.
    pub tab_width: usize,
    pub wrap_mode: WrapMode,
    /// Columns per screen row when wrapping.
    pub wrap_width: usize,
    /// Number of screen rows in the window.
    pub viewport_height: usize,
    pub width_method: WidthMethod,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            tab_width: 4,
            wrap_mode: WrapMode::None,
            wrap_width: 80,
            viewport_height: 24,
            width_method: WidthMethod::WcWidth,
        }
    }
}

impl LayoutOptions {
    /// Parse options from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tab_width == 0 {
            return Err(Error::Config("tab_width must be at least 1".to_string()));
        }
        if self.wrap_mode != WrapMode::None && self.wrap_width == 0 {
            return Err(Error::Config(
                "wrap_width must be at least 1 when wrapping".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width.max(1);
        self
    }

    #[must_use]
    pub fn with_wrap(mut self, mode: WrapMode, width: usize) -> Self {
        self.wrap_mode = mode;
        self.wrap_width = width.max(1);
        self
    }

    #[must_use]
    pub fn with_viewport_height(mut self, height: usize) -> Self {
        self.viewport_height = height;
        self
    }

    #[must_use]
    pub fn with_width_method(mut self, method: WidthMethod) -> Self {
        self.width_method = method;
        self
    }

    /// Wrap width in effect, or `None` when not wrapping.
    #[must_use]
    pub fn effective_wrap_width(&self) -> Option<usize> {
        match self.wrap_mode {
            WrapMode::None => None,
            WrapMode::Char | WrapMode::Word => Some(self.wrap_width.max(1)),
        }
    }
}
