//! Everything the browser tells the tracker, and the one question the tracker asks back.
//! Messages arrive through [native_messaging]; [TabQuery] abstracts "which tab is active in the
//! focused window" so the tracker can be driven by a mock in tests.

pub mod native_messaging;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Browser idle detector states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Lifecycle events emitted by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    TabActivated,
    /// `url` is only present when the navigation changed it.
    TabUpdated {
        #[serde(default)]
        url: Option<Arc<str>>,
        #[serde(default)]
        active: bool,
    },
    WindowFocusChanged {
        focused: bool,
    },
    IdleStateChanged {
        state: IdleState,
    },
    Startup,
    Installed,
    /// Reported by the page probe. Purely observational.
    PageVisibility {
        #[serde(default)]
        url: Option<Arc<str>>,
        hidden: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveTab {
    #[serde(default)]
    pub url: Option<Arc<str>>,
}

/// One inbound frame: the event plus the browser's view of the active tab at the moment the
/// event fired, when it sent one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostMessage {
    #[serde(flatten)]
    pub event: HostEvent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<ActiveTab>,
}

impl From<HostEvent> for HostMessage {
    fn from(event: HostEvent) -> Self {
        Self {
            event,
            active_tab: None,
        }
    }
}

/// Frames sent back to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutgoingMessage {
    /// Asks the extension to report idle after this many seconds without input.
    #[serde(rename_all = "camelCase")]
    Configure { idle_detection_interval_secs: u32 },
}

/// Answers "what is the active tab in the focused window".
#[cfg_attr(test, mockall::automock)]
pub trait TabQuery {
    fn active_tab(&mut self) -> Result<Option<ActiveTab>>;

    /// Called with every active tab snapshot the browser pushes.
    fn observe(&mut self, _tab: ActiveTab) {}

    /// Called when the active tab changed without the browser saying which one it is now.
    fn forget(&mut self) {}
}

/// [TabQuery] backed by the snapshots the extension attaches to its messages. Fails until the
/// first snapshot arrives.
#[derive(Default)]
pub struct ReportedTabs {
    latest: Option<ActiveTab>,
}

impl TabQuery for ReportedTabs {
    fn active_tab(&mut self) -> Result<Option<ActiveTab>> {
        self.latest
            .clone()
            .map(Some)
            .ok_or_else(|| anyhow!("The browser has not reported an active tab yet"))
    }

    fn observe(&mut self, tab: ActiveTab) {
        self.latest = Some(tab);
    }

    fn forget(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn test_parse_events() -> Result<()> {
        let message: HostMessage = serde_json::from_str(
            r#"{"type":"tabActivated","activeTab":{"url":"https://example.com/a"}}"#,
        )?;
        assert_eq!(message.event, HostEvent::TabActivated);
        assert_eq!(
            message.active_tab.and_then(|t| t.url).as_deref(),
            Some("https://example.com/a")
        );

        let message: HostMessage = serde_json::from_str(
            r#"{"type":"tabUpdated","url":"https://rust-lang.org/","active":true}"#,
        )?;
        assert_eq!(
            message.event,
            HostEvent::TabUpdated {
                url: Some("https://rust-lang.org/".into()),
                active: true
            }
        );
        assert_eq!(message.active_tab, None);

        let message: HostMessage =
            serde_json::from_str(r#"{"type":"idleStateChanged","state":"locked"}"#)?;
        assert_eq!(
            message.event,
            HostEvent::IdleStateChanged {
                state: IdleState::Locked
            }
        );

        let message: HostMessage = serde_json::from_str(r#"{"type":"tabUpdated","active":false}"#)?;
        assert_eq!(
            message.event,
            HostEvent::TabUpdated {
                url: None,
                active: false
            }
        );
        Ok(())
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<HostMessage>(r#"{"type":"bookmarkAdded"}"#).is_err());
    }

    #[test]
    fn test_configure_wire_format() -> Result<()> {
        let json = serde_json::to_string(&OutgoingMessage::Configure {
            idle_detection_interval_secs: 60,
        })?;
        assert_eq!(json, r#"{"type":"configure","idleDetectionIntervalSecs":60}"#);
        Ok(())
    }

    #[test]
    fn test_reported_tabs() -> Result<()> {
        let mut tabs = ReportedTabs::default();
        assert!(tabs.active_tab().is_err());

        tabs.observe(ActiveTab {
            url: Some("https://example.com".into()),
        });
        tabs.observe(ActiveTab { url: None });
        assert_eq!(tabs.active_tab()?, Some(ActiveTab { url: None }));

        tabs.forget();
        assert!(tabs.active_tab().is_err());
        Ok(())
    }
}
