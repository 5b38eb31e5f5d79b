//! Driver port
//!
//! The engine issues every browser command through [`DriverPort`]. The
//! actual automation technology (WebDriver, CDP, a test double) lives
//! behind it and is owned by the caller.

use async_trait::async_trait;
use formpilot_core_types::Locator;
use std::time::Duration;

use crate::{
    errors::DriverError,
    types::{ElementHandle, SelectBy, SelectedOption},
};

/// Abstract browser commands used by the form engine
///
/// A single session is not safe for concurrent commands; the engine only
/// ever has one command in flight per driver.
#[async_trait]
pub trait DriverPort: Send + Sync {
    /// Navigate the session to `url`
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Block until the document reports ready, or fail with `DriverError::Timeout`
    async fn wait_ready(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Resolve a locator into an element handle
    async fn locate(&self, locator: &Locator) -> Result<ElementHandle, DriverError>;

    /// Replace the element's value with `value`
    async fn set_value(&self, element: &ElementHandle, value: &str) -> Result<(), DriverError>;

    /// Read the element's current `value` property
    async fn read_value(&self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Read the element's visible text
    async fn read_text(&self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Checked/selected state of a checkbox, radio or option
    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Choose an option of a `<select>` element
    async fn select_option(
        &self,
        element: &ElementHandle,
        by: SelectBy,
        item: &str,
    ) -> Result<(), DriverError>;

    /// Currently selected option of a `<select>` element, if any
    async fn selected_option(
        &self,
        element: &ElementHandle,
    ) -> Result<Option<SelectedOption>, DriverError>;

    /// Click the element
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// URL of the current document
    async fn current_url(&self) -> Result<String, DriverError>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;
}
