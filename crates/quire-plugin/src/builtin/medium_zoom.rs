//! Click-to-zoom for content images.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::MEDIUM_ZOOM;
use crate::{Asset, PageDraft, Plugin, PluginError};

const SCRIPT_PATH: &str = "assets/js/medium-zoom.js";

const SCRIPT: &str = r"(function () {
  var config = document.getElementById('medium-zoom-config');
  if (!config) return;
  var settings = JSON.parse(config.textContent);
  var margin = settings.options.margin || 0;
  document.querySelectorAll(settings.selector).forEach(function (img) {
    img.setAttribute('data-zoomable', '');
    img.style.cursor = 'zoom-in';
    img.addEventListener('click', function () {
      var zoomed = img.classList.toggle('medium-zoom-image--opened');
      img.style.cursor = zoomed ? 'zoom-out' : 'zoom-in';
      img.style.transform = zoomed ? 'scale(1.5)' : '';
      img.style.margin = zoomed ? margin + 'px' : '';
    });
  });
})();
";

/// Options for [`MediumZoom`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MediumZoomOptions {
    /// CSS selector of the images to make zoomable.
    selector: String,
    /// Options handed to the zoom script as-is.
    options: Map<String, Value>,
}

impl Default for MediumZoomOptions {
    fn default() -> Self {
        Self {
            selector: ".content :not(a) > img".to_owned(),
            options: Map::new(),
        }
    }
}

/// Marks content images as zoomable.
#[derive(Debug)]
pub(crate) struct MediumZoom {
    /// Serialized `{ selector, options }` for the page.
    config_json: String,
}

impl MediumZoom {
    pub(crate) fn new(options: MediumZoomOptions) -> Result<Self, PluginError> {
        if options.selector.trim().is_empty() {
            return Err(PluginError::InvalidOptions(
                "selector cannot be empty".to_owned(),
            ));
        }
        let config = serde_json::json!({
            "selector": options.selector,
            "options": options.options,
        });
        Ok(Self {
            config_json: config.to_string(),
        })
    }
}

impl Plugin for MediumZoom {
    fn name(&self) -> &str {
        MEDIUM_ZOOM
    }

    fn transform_page(&self, page: &mut PageDraft) -> Result<(), PluginError> {
        // `</` cannot appear inside a script element
        let config = self.config_json.replace("</", "<\\/");
        page.body_end.push(format!(
            r#"<script type="application/json" id="medium-zoom-config">{config}</script>"#
        ));
        page.body_end
            .push(format!(r#"<script src="/{SCRIPT_PATH}" defer></script>"#));
        Ok(())
    }

    fn emit_assets(&self, _page: &PageDraft) -> Result<Vec<Asset>, PluginError> {
        Ok(vec![Asset::text(SCRIPT_PATH, SCRIPT)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::medium_zoom as factory;
    use serde_json::json;

    fn draft() -> PageDraft {
        PageDraft::from_page(&quire_content::Page::new(
            "rules.md".into(),
            "/rules/".to_owned(),
            quire_content::Frontmatter::new(),
            None,
            "![diagram](/img/d.png)\n".to_owned(),
        ))
    }

    #[test]
    fn test_injects_selector_config() {
        let plugin = factory(&json!({"selector": ".content img", "options": {"margin": 16}})).unwrap();
        let mut page = draft();

        plugin.transform_page(&mut page).unwrap();

        assert!(page.body_end[0].contains(r#""selector":".content img""#));
        assert!(page.body_end[0].contains(r#""margin":16"#));
        assert!(page.body_end[1].contains("/assets/js/medium-zoom.js"));
    }

    #[test]
    fn test_config_cannot_close_script() {
        let plugin = factory(&json!({"selector": "img[alt='</script>']"})).unwrap();
        let mut page = draft();

        plugin.transform_page(&mut page).unwrap();

        assert!(!page.body_end[0].contains("'</script>'"));
    }

    #[test]
    fn test_emits_script() {
        let plugin = factory(&json!({})).unwrap();
        let assets = plugin.emit_assets(&draft()).unwrap();
        assert_eq!(assets[0].path, "assets/js/medium-zoom.js");
    }

    #[test]
    fn test_rejects_empty_selector() {
        assert!(matches!(
            factory(&json!({"selector": "  "})),
            Err(PluginError::InvalidOptions(_))
        ));
    }
}
