// src/server/livereload.rs

use tokio::sync::broadcast;
use tracing::debug;

use crate::types::AssetClass;

/// Capacity of the reload broadcast; slow clients that fall further behind
/// get a full reload instead.
const RELOAD_CHANNEL_CAPACITY: usize = 16;

pub const SCRIPT_PATH: &str = "/__livereload.js";
pub const EVENTS_PATH: &str = "/__livereload";

/// Script tag injected into every HTML response.
pub const SCRIPT_TAG: &str = "<script src=\"/__livereload.js\"></script>";

/// Browser side: subscribe to the event stream, swap stylesheets on `css`,
/// reload the page on anything else.
pub const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function (event) {
    if (event.data === "css") {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var url = new URL(links[i].href);
        url.searchParams.set("livereload", Date.now());
        links[i].href = url.toString();
      }
    } else {
      window.location.reload();
    }
  });
})();
"#;

/// What the browser should do after a task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Re-fetch stylesheets in place.
    Css,
    /// Reload the whole page.
    Full,
}

impl ReloadKind {
    /// Style changes swap stylesheets; everything else (images included)
    /// reloads the page.
    pub fn for_class(class: AssetClass) -> Self {
        match class {
            AssetClass::Style => ReloadKind::Css,
            AssetClass::Script | AssetClass::Image | AssetClass::Template => ReloadKind::Full,
        }
    }

    /// SSE `data:` payload.
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadKind::Css => "css",
            ReloadKind::Full => "reload",
        }
    }
}

/// Injectable reload capability handed to the watch loop.
pub trait ReloadTrigger: Send + Sync {
    fn reload(&self, class: AssetClass);
}

/// Broadcast sender shared by the watch loop and every connected browser.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadKind>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(RELOAD_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.tx.subscribe()
    }

    pub fn clients(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ReloadTrigger for LiveReload {
    fn reload(&self, class: AssetClass) {
        let kind = ReloadKind::for_class(class);
        match self.tx.send(kind) {
            Ok(clients) => debug!(class = %class, kind = kind.as_str(), clients, "live reload sent"),
            Err(_) => debug!(class = %class, "live reload skipped; no clients connected"),
        }
    }
}

/// Insert the client script before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], SCRIPT_TAG, &html[idx..]),
        None => format!("{html}{SCRIPT_TAG}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_swaps_css_and_images_reload_fully() {
        assert_eq!(ReloadKind::for_class(AssetClass::Style), ReloadKind::Css);
        assert_eq!(ReloadKind::for_class(AssetClass::Image), ReloadKind::Full);
        assert_eq!(ReloadKind::for_class(AssetClass::Template), ReloadKind::Full);
    }

    #[test]
    fn reload_reaches_subscribers() {
        let live = LiveReload::new();
        let mut rx = live.subscribe();
        live.reload(AssetClass::Style);
        live.reload(AssetClass::Script);
        assert_eq!(rx.try_recv().unwrap(), ReloadKind::Css);
        assert_eq!(rx.try_recv().unwrap(), ReloadKind::Full);
    }

    #[test]
    fn reload_without_clients_is_harmless() {
        LiveReload::new().reload(AssetClass::Image);
    }

    #[test]
    fn injects_before_closing_body() {
        assert_eq!(
            inject_script("<html><BODY><p>x</p></BODY></html>"),
            format!("<html><BODY><p>x</p>{SCRIPT_TAG}</BODY></html>")
        );
        assert_eq!(inject_script("<p>x</p>"), format!("<p>x</p>{SCRIPT_TAG}"));
    }
}
