//! Plugins shipped with quire.

mod back_to_top;
mod medium_zoom;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Plugin, PluginError};

/// Canonical name of the back-to-top plugin.
pub const BACK_TO_TOP: &str = "back-to-top";
/// Canonical name of the medium-zoom plugin.
pub const MEDIUM_ZOOM: &str = "medium-zoom";

/// Factory for the back-to-top plugin.
pub(crate) fn back_to_top(options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(back_to_top::BackToTop::new(parse_options(options)?)))
}

/// Factory for the medium-zoom plugin.
pub(crate) fn medium_zoom(options: &Value) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(medium_zoom::MediumZoom::new(
        parse_options(options)?,
    )?))
}

/// Deserialize plugin options, treating `null` as an empty table.
fn parse_options<T: DeserializeOwned + Default>(options: &Value) -> Result<T, PluginError> {
    if options.is_null() {
        return Ok(T::default());
    }
    T::deserialize(options).map_err(|e| PluginError::InvalidOptions(e.to_string()))
}
