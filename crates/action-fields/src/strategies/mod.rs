mod checkbox;
mod select;
mod text;

pub use checkbox::{CheckboxStrategy, RadioStrategy};
pub use select::SelectStrategy;
pub use text::TextStrategy;

#[cfg(test)]
pub(crate) mod fake {
    //! Minimal single-element driver for strategy tests

    use action_primitives::{DriverError, DriverPort, ElementHandle, SelectBy, SelectedOption};
    use async_trait::async_trait;
    use formpilot_core_types::Locator;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct Element {
        pub value: String,
        pub selected: bool,
        pub options: Vec<SelectedOption>,
        pub chosen: Option<usize>,
        pub clicks: u32,
        pub writes: u32,
        /// Value the element reports regardless of what was written
        pub sticky_value: Option<String>,
    }

    #[derive(Default)]
    pub struct FakeElementDriver {
        pub element: Mutex<Element>,
    }

    impl FakeElementDriver {
        pub fn handle() -> ElementHandle {
            ElementHandle::new("el-1", Locator::id("field"))
        }
    }

    #[async_trait]
    impl DriverPort for FakeElementDriver {
        async fn navigate(&self, _url: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn wait_ready(&self, _timeout: Duration) -> Result<(), DriverError> {
            Ok(())
        }

        async fn locate(&self, _locator: &Locator) -> Result<ElementHandle, DriverError> {
            Ok(Self::handle())
        }

        async fn set_value(&self, _element: &ElementHandle, value: &str) -> Result<(), DriverError> {
            let mut element = self.element.lock();
            element.writes += 1;
            element.value = value.to_string();
            Ok(())
        }

        async fn read_value(&self, _element: &ElementHandle) -> Result<String, DriverError> {
            let element = self.element.lock();
            Ok(element
                .sticky_value
                .clone()
                .unwrap_or_else(|| element.value.clone()))
        }

        async fn read_text(&self, _element: &ElementHandle) -> Result<String, DriverError> {
            Ok(self.element.lock().value.clone())
        }

        async fn is_selected(&self, _element: &ElementHandle) -> Result<bool, DriverError> {
            Ok(self.element.lock().selected)
        }

        async fn select_option(
            &self,
            _element: &ElementHandle,
            by: SelectBy,
            item: &str,
        ) -> Result<(), DriverError> {
            let mut element = self.element.lock();
            let index = element
                .options
                .iter()
                .position(|option| option.by(by) == item)
                .ok_or_else(|| DriverError::OptionNotFound(item.to_string()))?;
            element.chosen = Some(index);
            Ok(())
        }

        async fn selected_option(
            &self,
            _element: &ElementHandle,
        ) -> Result<Option<SelectedOption>, DriverError> {
            let element = self.element.lock();
            Ok(element.chosen.map(|index| element.options[index].clone()))
        }

        async fn click(&self, _element: &ElementHandle) -> Result<(), DriverError> {
            let mut element = self.element.lock();
            element.clicks += 1;
            element.selected = !element.selected;
            Ok(())
        }

        async fn current_url(&self) -> Result<String, DriverError> {
            Ok("about:blank".into())
        }

        async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
            Ok(Vec::new())
        }
    }
}
