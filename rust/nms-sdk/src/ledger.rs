//! Page index to continuation token bookkeeping for the token-cursor listing.
//!
//! The listing endpoint has no random-access offsets: page `i` can only be
//! requested with the token returned by page `i - 1`. The ledger remembers
//! every token seen so revisiting a page reuses its token.

/// Ordered continuation tokens. Index 0 is always the empty first-page token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTokenLedger {
    tokens: Vec<String>,
    total_count: Option<u64>,
}

impl PageTokenLedger {
    pub fn new() -> Self {
        Self {
            tokens: vec![String::new()],
            total_count: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Token for `page`, or the last known token when `page` is past the
    /// fetched range.
    pub fn token_at(&self, page: usize) -> &str {
        self.tokens
            .get(page)
            .or_else(|| self.tokens.last())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Record the token that follows `page`. Returns false when the token is
    /// already known.
    pub fn record(&mut self, page: usize, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.tokens.contains(&token) {
            return false;
        }
        tracing::debug!(
            "ledger: page {} -> next token #{} ({} chars)",
            page,
            self.tokens.len(),
            token.len()
        );
        self.tokens.push(token);
        true
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn set_total_count(&mut self, total: u64) {
        self.total_count = Some(total);
    }

    /// Clamp `page` so it never points past the last known rows.
    ///
    /// A page past the ledger resolves to the last page with a known token, so
    /// the result always names the page its token fetches. With a total
    /// estimate, a page starting at or beyond the total falls back to the last
    /// page that holds rows.
    pub fn resolve_page(&self, page: usize, page_size: usize) -> usize {
        let last_known = self.tokens.len() - 1;
        let page_size = page_size.max(1) as u64;

        match self.total_count {
            Some(total) if (page as u64).saturating_mul(page_size) >= total => {
                let last_with_rows = if total == 0 {
                    0
                } else {
                    ((total - 1) / page_size) as usize
                };
                last_with_rows.min(last_known)
            }
            _ => page.min(last_known),
        }
    }
}

impl Default for PageTokenLedger {
    fn default() -> Self {
        Self::new()
    }
}
