use tracing::info;

/// Page probe: records when a page goes to the background or comes back. Nothing is stored.
pub fn log_visibility(url: Option<&str>, hidden: bool) {
    let page = url.unwrap_or("<unknown page>");
    if hidden {
        info!("Page moved to the background: {page}");
    } else {
        info!("Page became visible again: {page}");
    }
}
