use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror the server's JSON shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct PoolSeries {
    pub dates: Vec<String>,
    pub staker_numbers: Vec<u64>,
    pub pos_amounts: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub snapshot_date: String,
    pub espace_addr: String,
    pub pos_amount: u128,
    pub abc_amount: u128,
    pub vote: u128,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub const SERIES_OPTIONS: &[&str] = &["All", "v1 core", "v1 espace", "v2 espace"];

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    PoolStats,
    Roster,
}

impl Page {
    pub const TITLES: [&'static str; 2] = ["ABC Stats", "Tesla Voting"];

    pub fn index(self) -> usize {
        match self {
            Page::PoolStats => 0,
            Page::Roster => 1,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Page::PoolStats => Page::Roster,
            Page::Roster => Page::PoolStats,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub page: Page,
    pub series_index: usize,
    pub pool: PoolSeries,
    pub roster: Vec<RosterRow>,
    /// Applied roster filter.
    pub search: String,
    /// Text being typed while the search box is focused.
    pub search_input: Option<String>,
    pub last_refresh: std::time::Instant,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            page: Page::PoolStats,
            series_index: 0,
            pool: PoolSeries::default(),
            roster: Vec::new(),
            search: String::new(),
            search_input: None,
            last_refresh: std::time::Instant::now(),
            base_url,
        }
    }

    pub fn series(&self) -> &'static str {
        SERIES_OPTIONS[self.series_index % SERIES_OPTIONS.len()]
    }

    pub fn next_series(&mut self) {
        self.series_index = (self.series_index + 1) % SERIES_OPTIONS.len();
    }

    pub fn prev_series(&mut self) {
        self.series_index = (self.series_index + SERIES_OPTIONS.len() - 1) % SERIES_OPTIONS.len();
    }

    pub fn editing(&self) -> bool {
        self.search_input.is_some()
    }

    pub fn begin_search(&mut self) {
        self.search_input = Some(self.search.clone());
    }

    pub fn push_search_char(&mut self, c: char) {
        if let Some(input) = self.search_input.as_mut() {
            input.push(c);
        }
    }

    pub fn pop_search_char(&mut self) {
        if let Some(input) = self.search_input.as_mut() {
            input.pop();
        }
    }

    /// Leave the search box, applying its text. Returns true if the filter changed.
    pub fn commit_search(&mut self) -> bool {
        match self.search_input.take() {
            Some(input) if input != self.search => {
                self.search = input;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_search(&mut self) {
        self.search_input = None;
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let pool_url = format!("{}/stats/pool", self.base_url);
        let roster_url = format!("{}/roster", self.base_url);

        let (pool_res, roster_res) = tokio::join!(
            client.get(&pool_url).query(&[("series", self.series())]).send(),
            client.get(&roster_url).query(&[("q", self.search.as_str())]).send(),
        );

        let (pool_resp, roster_resp) = match (pool_res, roster_res) {
            (Ok(p), Ok(r)) => (p, r),
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("{e}"));
                return;
            }
        };

        let (pool, roster) = tokio::join!(pool_resp.json::<PoolSeries>(), roster_resp.json::<Vec<RosterRow>>());

        match (pool, roster) {
            (Ok(p), Ok(r)) => {
                self.pool = p;
                self.roster = r;
                self.status = ConnectionStatus::Connected;
                self.last_refresh = std::time::Instant::now();
            }
            (Err(e), _) | (_, Err(e)) => {
                self.status = ConnectionStatus::Error(format!("parse error: {e}"));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// `0x1234...abcd`
pub fn truncate_address(addr: &str) -> String {
    if addr.len() <= 10 || !addr.is_ascii() {
        addr.to_string()
    } else {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    }
}

/// `1234567` -> `1,234,567`
pub fn format_thousands(v: u128) -> String {
    let digits = v.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `12345.67` -> `12,345.7`
pub fn format_tenths(v: f64) -> String {
    let tenths = (v.max(0.0) * 10.0).round() as u128;
    format!("{}.{}", format_thousands(tenths / 10), tenths % 10)
}

/// `20250224` -> `2025-02-24`
pub fn format_date(d: &str) -> String {
    if d.len() == 8 && d.is_ascii() {
        format!("{}-{}-{}", &d[..4], &d[4..6], &d[6..])
    } else {
        d.to_string()
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_cycles_both_ways() {
        let mut app = AppState::new("http://x".into());
        assert_eq!(app.series(), "All");
        app.prev_series();
        assert_eq!(app.series(), "v2 espace");
        app.next_series();
        app.next_series();
        assert_eq!(app.series(), "v1 core");
    }

    #[test]
    fn search_input_applies_on_commit_only() {
        let mut app = AppState::new("http://x".into());
        app.begin_search();
        for c in "0xab".chars() {
            app.push_search_char(c);
        }
        app.pop_search_char();
        assert!(app.editing());
        assert_eq!(app.search, "");
        assert!(app.commit_search());
        assert_eq!(app.search, "0xa");
        assert!(!app.editing());

        app.begin_search();
        app.push_search_char('z');
        app.cancel_search();
        assert_eq!(app.search, "0xa");
        app.begin_search();
        assert!(!app.commit_search());
    }

    #[test]
    fn formats() {
        assert_eq!(truncate_address("0x1234567890abcdef1234567890abcdef1234abcd"), "0x1234...abcd");
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
        assert_eq!(format_tenths(12_345.67), "12,345.7");
        assert_eq!(format_tenths(60.0), "60.0");
        assert_eq!(format_date("20250224"), "2025-02-24");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn roster_row_reads_dataset_names() {
        let row: RosterRow = serde_json::from_str(
            r#"{"snapshotDate":"20250224","espaceAddr":"0xAb","posAmount":5000,"abcAmount":940,"vote":1}"#,
        )
        .unwrap();
        assert_eq!(row.abc_amount, 940);
        assert_eq!(row.vote, 1);
    }
}
