//! Floating "back to top" button.

use serde::Deserialize;

use super::BACK_TO_TOP;
use crate::{Asset, PageDraft, Plugin, PluginError};

const SCRIPT_PATH: &str = "assets/js/back-to-top.js";

const SCRIPT: &str = r"(function () {
  var button = document.querySelector('.back-to-top');
  if (!button) return;
  var threshold = parseInt(button.getAttribute('data-threshold'), 10) || 0;
  function update() {
    button.classList.toggle('visible', window.scrollY > threshold);
  }
  button.addEventListener('click', function () {
    window.scrollTo({ top: 0, behavior: 'smooth' });
  });
  window.addEventListener('scroll', update, { passive: true });
  update();
})();
";

/// Options for [`BackToTop`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BackToTopOptions {
    /// Scroll offset in pixels after which the button appears.
    threshold: u32,
}

impl Default for BackToTopOptions {
    fn default() -> Self {
        Self { threshold: 300 }
    }
}

/// Injects a button that scrolls the page back to the top.
#[derive(Debug)]
pub(crate) struct BackToTop {
    options: BackToTopOptions,
}

impl BackToTop {
    pub(crate) fn new(options: BackToTopOptions) -> Self {
        Self { options }
    }
}

impl Plugin for BackToTop {
    fn name(&self) -> &str {
        BACK_TO_TOP
    }

    fn transform_page(&self, page: &mut PageDraft) -> Result<(), PluginError> {
        page.body_end.push(format!(
            r#"<button type="button" class="back-to-top" data-threshold="{}" aria-label="Back to top">&uarr;</button>"#,
            self.options.threshold
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
    use crate::builtin::back_to_top as factory;
    use serde_json::json;

    fn draft() -> PageDraft {
        PageDraft::from_page(&quire_content::Page::new(
            "guide.md".into(),
            "/guide/".to_owned(),
            quire_content::Frontmatter::new(),
            None,
            "# Guide\n".to_owned(),
        ))
    }

    #[test]
    fn test_injects_button_with_threshold() {
        let plugin = factory(&json!({"threshold": 120})).unwrap();
        let mut page = draft();

        plugin.transform_page(&mut page).unwrap();

        assert!(page.body_end[0].contains(r#"data-threshold="120""#));
        assert!(page.body_end[1].contains("/assets/js/back-to-top.js"));
    }

    #[test]
    fn test_default_threshold() {
        let plugin = factory(&json!({})).unwrap();
        let mut page = draft();

        plugin.transform_page(&mut page).unwrap();

        assert!(page.body_end[0].contains(r#"data-threshold="300""#));
    }

    #[test]
    fn test_emits_script() {
        let plugin = factory(&json!(null)).unwrap();
        let assets = plugin.emit_assets(&draft()).unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].path, "assets/js/back-to-top.js");
    }

    #[test]
    fn test_rejects_bad_options() {
        assert!(matches!(
            factory(&json!({"threshold": "high"})),
            Err(PluginError::InvalidOptions(_))
        ));
        assert!(matches!(
            factory(&json!({"color": "red"})),
            Err(PluginError::InvalidOptions(_))
        ));
    }
}
