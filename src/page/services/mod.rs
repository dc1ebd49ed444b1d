//! Page services: waits, value setters and element discovery.

mod locate;
mod wait;

pub use locate::{HINT_ATTRIBUTES, Located, LocatorChain, NamedStrategy, Strategy};
pub use wait::{
    WaitError, click_element, set_controlled_input_value, set_editable_region_value,
    wait_for_condition, wait_for_selector,
};
