//! Tool contract for driving a browser from an agent loop

use crate::browser::{BrowserConfig, TextBrowser};
use crate::TOOL_DESCRIPTION;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

/// One browser operation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    /// Navigate to an address (URL, `search:<query>`, local path)
    Visit {
        /// Address to visit
        uri: String,
        /// Restrict search results to a single year
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter_year: Option<u16>,
    },
    /// Scroll one viewport up
    PageUp,
    /// Scroll one viewport down
    PageDown,
    /// Find a query on the current page, from the current viewport forward
    Find {
        /// Query text; `*` matches any sequence
        query: String,
    },
    /// Jump to the next viewport matching the previous find query
    FindNext,
}

/// Result of a browser operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BrowserToolResponse {
    /// Address of the current page
    pub address: String,
    /// Title of the current page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Viewport position, e.g. `1 of 3`
    pub position: String,
    /// Text of the current viewport
    pub viewport: String,
    /// For find actions: whether a match was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
}

/// A [`TextBrowser`] wrapped in an LLM-tool contract
pub struct BrowserTool {
    browser: TextBrowser,
}

impl Default for BrowserTool {
    fn default() -> Self {
        Self::new(BrowserConfig::default())
    }
}

impl BrowserTool {
    /// Create a tool over a freshly configured browser
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            browser: TextBrowser::new(config),
        }
    }

    /// Access the underlying browser
    pub fn browser(&self) -> &TextBrowser {
        &self.browser
    }

    /// Get tool description
    pub fn description(&self) -> &'static str {
        TOOL_DESCRIPTION
    }

    /// Get input schema as JSON
    pub fn input_schema(&self) -> serde_json::Value {
        let schema = schema_for!(BrowserAction);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Get output schema as JSON
    pub fn output_schema(&self) -> serde_json::Value {
        let schema = schema_for!(BrowserToolResponse);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Execute one action against the browser
    pub fn execute(&mut self, action: BrowserAction) -> BrowserToolResponse {
        let found = match action {
            BrowserAction::Visit { uri, filter_year } => {
                self.browser.visit_page(&uri, filter_year);
                None
            }
            BrowserAction::PageUp => {
                self.browser.page_up();
                None
            }
            BrowserAction::PageDown => {
                self.browser.page_down();
                None
            }
            BrowserAction::Find { query } => Some(self.browser.find_on_page(&query).is_some()),
            BrowserAction::FindNext => Some(self.browser.find_next().is_some()),
        };

        let (current, total) = self.browser.viewport_position();
        BrowserToolResponse {
            address: self.browser.address().to_string(),
            title: self.browser.page_title().map(|t| t.to_string()),
            position: format!("{current} of {total}"),
            viewport: self.browser.viewport().to_string(),
            found,
        }
    }
}
