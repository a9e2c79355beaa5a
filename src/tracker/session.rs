use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    host::{ActiveTab, HostEvent, HostMessage, IdleState, TabQuery},
    store::{entry, value_as_count, KeyValueStore, SWITCH_COUNT_KEY},
    utils::clock::{elapsed_seconds, Clock},
};

use super::{domain::extract_domain, probe::log_visibility, processing::EventProcessor};

/// Time is being attributed to `domain` since `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub domain: String,
    pub start: DateTime<Utc>,
}

/// Owns the in-memory tracking state and turns browser events into stored durations.
///
/// A session's time is written to the store before the session's domain changes or the
/// session is torn down, so time is never carried across a domain switch. Idle time is never
/// billed: no session starts while idle, and resuming re-reads the active tab instead of
/// reviving the old session.
pub struct Tracker<S: KeyValueStore> {
    store: S,
    tabs: Box<dyn TabQuery>,
    clock: Box<dyn Clock>,
    session: Option<Session>,
    idle: bool,
    /// Switches seen by this process. The persisted total lives in the store.
    switch_count: u64,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(store: S, tabs: Box<dyn TabQuery>, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            tabs,
            clock,
            session: None,
            idle: false,
            switch_count: 0,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn current_domain(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.domain.as_str())
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Ends the current session and adds its whole seconds to the domain's total. Safe to call
    /// without an active session.
    pub async fn stop_tracking(&mut self) -> Result<()> {
        let Some(Session { domain, start }) = self.session.take() else {
            return Ok(());
        };
        if self.idle {
            return Ok(());
        }

        let elapsed = elapsed_seconds(start, self.clock.time());
        let seconds = elapsed.floor() as u64;
        if elapsed <= 0. {
            debug!("Dropping {elapsed}s session on {domain}");
            return Ok(());
        }

        self.add_time(&domain, seconds).await.inspect_err(|e| {
            error!("Lost {seconds}s of activity on {domain}: {e:?}");
        })?;
        info!("Recorded {seconds}s on {domain}");
        Ok(())
    }

    async fn add_time(&self, domain: &str, seconds: u64) -> Result<()> {
        let current = value_as_count(self.store.get(domain).await?.as_ref());
        self.store
            .set(entry(domain, current.saturating_add(seconds)))
            .await
            .with_context(|| format!("Saving time for {domain}"))
    }

    /// Starts a session on `domain`. Does nothing without a domain or while idle.
    pub fn start_tracking(&mut self, domain: Option<String>) {
        match domain {
            Some(domain) if !self.idle => {
                debug!("Tracking {domain}");
                self.session = Some(Session {
                    domain,
                    start: self.clock.time(),
                });
            }
            _ => {}
        }
    }

    /// Re-reads the active tab of the focused window and switches sessions if its domain
    /// differs from the tracked one. Query failures are logged and skipped.
    pub async fn update_current_tab(&mut self) -> Result<()> {
        let tab = match self.tabs.active_tab() {
            Ok(tab) => tab,
            Err(e) => {
                warn!("Error updating current tab: {e:?}");
                return Ok(());
            }
        };
        let Some(url) = tab.and_then(|tab| tab.url) else {
            return Ok(());
        };

        let domain = extract_domain(&url);
        if domain.as_deref() != self.current_domain() {
            self.stop_tracking().await?;
            self.start_tracking(domain);
        }
        Ok(())
    }

    /// Counts a tab switch and persists the new total.
    pub async fn increment_switch_count(&mut self) -> Result<()> {
        self.switch_count += 1;
        let stored = value_as_count(self.store.get(SWITCH_COUNT_KEY).await?.as_ref());
        self.store
            .set(entry(SWITCH_COUNT_KEY, stored.saturating_add(1)))
            .await
            .context("Saving switch count")?;
        debug!(
            "Switch count {} ({} since start)",
            stored.saturating_add(1),
            self.switch_count
        );
        Ok(())
    }

    /// Reacts to a single browser event.
    #[instrument(skip(self))]
    pub async fn handle(&mut self, message: HostMessage) -> Result<()> {
        let reported_tab = message.active_tab.is_some();
        if let Some(tab) = message.active_tab {
            self.tabs.observe(tab);
        }

        match message.event {
            HostEvent::TabActivated => {
                // The previously reported tab is no longer the active one.
                if !reported_tab {
                    self.tabs.forget();
                }
                self.stop_tracking().await?;
                self.increment_switch_count().await?;
                self.update_current_tab().await?;
            }
            HostEvent::TabUpdated {
                url: Some(url),
                active: true,
            } => {
                self.tabs.observe(ActiveTab {
                    url: Some(url.clone()),
                });
                self.stop_tracking().await?;
                self.start_tracking(extract_domain(&url));
            }
            HostEvent::TabUpdated { .. } => {}
            HostEvent::WindowFocusChanged { focused: false } => {
                self.stop_tracking().await?;
            }
            HostEvent::WindowFocusChanged { focused: true } => {
                self.update_current_tab().await?;
            }
            HostEvent::IdleStateChanged {
                state: IdleState::Idle | IdleState::Locked,
            } => {
                // Flush while still marked active so the time before going idle counts. Idle
                // is entered even when the flush fails.
                let flushed = self.stop_tracking().await;
                self.idle = true;
                flushed?;
            }
            HostEvent::IdleStateChanged {
                state: IdleState::Active,
            } => {
                self.idle = false;
                self.update_current_tab().await?;
            }
            HostEvent::Startup | HostEvent::Installed => {
                self.update_current_tab().await?;
            }
            HostEvent::PageVisibility { url, hidden } => {
                log_visibility(url.as_deref(), hidden);
            }
        }
        Ok(())
    }
}

impl<S: KeyValueStore> EventProcessor for Tracker<S> {
    async fn process_next(&mut self, message: HostMessage) -> Result<()> {
        self.handle(message).await
    }

    /// The process is going away, so the running session is written out.
    async fn finalize(&mut self) -> Result<()> {
        self.stop_tracking().await
    }
}
