//! Simulated Search Progress
//!
//! Fallback progress source for servers that accept a search request
//! but never stream `search_progress` records. Fabricated result
//! titles rotate on a timer so the progress indicator does not sit
//! frozen on the raw query.
//!
//! The simulation is owned by the request context and dropped with it,
//! so the ticker cannot outlive the exchange. The first real progress
//! record from the server suppresses it for the rest of the request.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Rotating fabricated search titles on a timer.
pub struct SimulatedProgress {
    titles: Vec<String>,
    index: usize,
    ticker: Interval,
    active: bool,
}

impl SimulatedProgress {
    /// Create a simulation for the given query.
    ///
    /// The first title appears after `initial_delay` (giving the user
    /// a moment to read the raw query), then every `cadence`.
    #[must_use]
    pub fn new(query: &str, initial_delay: Duration, cadence: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + initial_delay, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            titles: fabricated_titles(query),
            index: 0,
            ticker,
            active: true,
        }
    }

    /// Whether the simulation is still producing titles.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop simulating. Called once the server streams real progress.
    pub fn suppress(&mut self) {
        self.active = false;
    }

    /// Wait for the next tick and return the next fabricated title.
    ///
    /// Cancel-safe: dropping the future between ticks loses nothing.
    pub async fn tick(&mut self) -> String {
        self.ticker.tick().await;
        let title = self.titles[self.index % self.titles.len()].clone();
        self.index += 1;
        title
    }
}

/// Plausible result titles for a query.
fn fabricated_titles(query: &str) -> Vec<String> {
    // Long queries get abbreviated the same way the progress indicator
    // abbreviates them.
    let query = clip(query, 50);
    vec![
        format!("{query} - web search"),
        format!("{query} - community answers"),
        format!("{query} - encyclopedia"),
        format!("latest research on {query}"),
        format!("{query} explained"),
    ]
}

/// Clip to at most `max` characters, appending an ellipsis when cut.
#[must_use]
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}
