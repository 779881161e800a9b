//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `serve` - Dev server resources (hotreload.js)
//!
//! The live-reload client is minified by `build.rs` into `OUT_DIR`.

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the dev server answers with the live-reload client.
    pub const HOTRELOAD_URL: &str = "/__kiln/hotreload.js";

    /// Variables for hotreload.js template.
    pub struct HotreloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for HotreloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__KILN_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live-reload client, connects back to the WebSocket port.
    pub const HOTRELOAD_JS: Template<HotreloadVars> =
        Template::new(include_str!(concat!(env!("OUT_DIR"), "/hotreload.min.js")));

    /// `<script>` tag injected into served HTML pages.
    pub fn script_tag() -> String {
        format!(r#"<script type="module" src="{HOTRELOAD_URL}"></script>"#)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_hotreload_port_injected() {
            let js = HOTRELOAD_JS.render(&HotreloadVars { ws_port: 40001 });
            assert!(js.contains("40001"));
            assert!(!js.contains("__KILN_WS_PORT__"));
        }

        #[test]
        fn test_script_tag_points_at_client() {
            assert!(script_tag().contains(HOTRELOAD_URL));
        }
    }
}
