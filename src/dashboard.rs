//! Terminal views over the latest capture (`tabr tabs`, `tabr ask`,
//! `tabr status`).

use anyhow::Result;

use crate::query::{answer, match_tab};
use crate::retrieve::{format_timestamp, latest_snapshot};
use crate::store::TabStore;

/// Characters of page text shown per tab.
pub const PREVIEW_CHARS: usize = 1000;

pub async fn run_tabs(store: &dyn TabStore) -> Result<()> {
    let Some(snapshot) = latest_snapshot(store).await.filter(|s| !s.tabs.is_empty()) else {
        println!(
            "No active tab data available. Ensure the Chrome extension is installed and enabled."
        );
        return Ok(());
    };

    println!("--- Active Tabs ({}) ---", snapshot.tabs.len());
    println!();
    for tab in &snapshot.tabs {
        let title = if tab.title.is_empty() {
            "Unknown Tab"
        } else {
            tab.title.as_str()
        };
        let url = if tab.url.is_empty() {
            "Unknown URL"
        } else {
            tab.url.as_str()
        };
        println!("{}", title);
        println!("  URL: {}", url);
        println!("  {}", tab.content_preview(PREVIEW_CHARS).replace('\n', "\n  "));
        println!();
    }
    Ok(())
}

pub async fn run_ask(store: &dyn TabStore, question: &str) -> Result<()> {
    let tabs = crate::retrieve::list_tabs(store).await;
    if tabs.is_empty() {
        println!("No active tab data available.");
        return Ok(());
    }

    match match_tab(question, &tabs) {
        Some(tab) => {
            let title = if tab.title.is_empty() {
                "Unknown"
            } else {
                tab.title.as_str()
            };
            println!("Answer Based on: {}", title);
            println!("{}", answer(question, tab));
        }
        None => println!("No matching website found."),
    }
    Ok(())
}

pub async fn run_status(store: &dyn TabStore) -> Result<()> {
    match latest_snapshot(store).await.filter(|s| !s.tabs.is_empty()) {
        Some(snapshot) => println!(
            "Connected! {} tab(s) received. Last update: {}",
            snapshot.tabs.len(),
            format_timestamp(&snapshot.timestamp)
        ),
        None => println!("No data received from extension yet."),
    }
    let artifacts = store.list_artifacts().await?;
    println!("Stored captures: {}", artifacts.len());
    Ok(())
}
