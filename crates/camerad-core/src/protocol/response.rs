//! Controller reply accumulation and reduction.
//!
//! A controller answers a request with one or more text fragments.  The
//! reply is *terminal* once a fragment contains the substring `DONE`, the
//! substring `ERROR`, or a newline.  Interim fragments (progress chatter
//! without a marker) are discarded; only the terminal fragment is kept, and
//! its first whitespace-delimited token is the comparable result value the
//! broadcast layer compares across hosts.
//!
//! Fragments are whatever one socket read returned, so a terminal marker is
//! checked per fragment rather than against the accumulated text.  This
//! matches the controllers' behavior of writing each status line in one
//! piece.

/// Returns true when `fragment` completes a reply.
pub fn is_terminal(fragment: &str) -> bool {
    fragment.contains("DONE") || fragment.contains("ERROR") || fragment.contains('\n')
}

/// Accumulates reply fragments for one host until a terminal marker.
///
/// A timed-out host simply never reaches the terminal state and reduces to
/// [`None`] via [`ReplyBuffer::token`].
#[derive(Debug, Default, Clone)]
pub struct ReplyBuffer {
    fragments: Vec<String>,
    terminal: bool,
}

impl ReplyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one received fragment; returns true when the reply is now
    /// terminal and no further reads are needed.
    ///
    /// Interim fragments carry no terminal marker and are dropped, so the
    /// first fragment kept is the terminal response the token comes from.
    pub fn push(&mut self, fragment: impl Into<String>) -> bool {
        let fragment = fragment.into();
        if is_terminal(&fragment) {
            self.terminal = true;
            self.fragments.push(fragment);
        }
        self.terminal
    }

    /// True once a terminal fragment has been pushed.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// True when no terminal fragment was received (timeout case, or a host
    /// that only produced interim chatter).
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Reduces the reply to its comparable token: the first
    /// whitespace-delimited token of the terminal fragment.
    ///
    /// Returns [`None`] for an empty reply or a terminal fragment that holds
    /// only whitespace — both count as "no parsable response".
    pub fn token(&self) -> Option<&str> {
        self.fragments.first()?.split_whitespace().next()
    }

    /// Whether the reply reported completion (`DONE` appears anywhere).
    pub fn is_complete(&self) -> bool {
        self.fragments.iter().any(|f| f.contains("DONE"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_error_and_newline_are_terminal() {
        assert!(is_terminal("DONE"));
        assert!(is_terminal("mode ERROR 12"));
        assert!(is_terminal("partial line\n"));
        assert!(!is_terminal("still going"));
    }

    #[test]
    fn test_push_reports_terminal_state() {
        let mut reply = ReplyBuffer::new();
        assert!(!reply.push("interim"));
        assert!(reply.push("DONE\n"));
        assert!(reply.is_terminal());
    }

    #[test]
    fn test_token_is_first_token_of_terminal_fragment() {
        let mut reply = ReplyBuffer::new();
        reply.push("DONE 0 extra\n");
        assert_eq!(reply.token(), Some("DONE"));
    }

    #[test]
    fn test_interim_chatter_does_not_shadow_terminal_token() {
        let mut reply = ReplyBuffer::new();
        assert!(!reply.push("busy"));
        assert!(reply.push("DONE 0\n"));
        assert_eq!(reply.token(), Some("DONE"));
    }

    #[test]
    fn test_reply_with_only_interim_fragments_has_no_token() {
        let mut reply = ReplyBuffer::new();
        reply.push("busy");
        reply.push("still busy");
        assert!(!reply.is_terminal());
        assert!(reply.is_empty());
        assert_eq!(reply.token(), None);
    }

    #[test]
    fn test_empty_reply_has_no_token() {
        let reply = ReplyBuffer::new();
        assert!(reply.is_empty());
        assert_eq!(reply.token(), None);
    }

    #[test]
    fn test_whitespace_only_fragment_has_no_token() {
        let mut reply = ReplyBuffer::new();
        reply.push("\n");
        assert_eq!(reply.token(), None);
    }

    #[test]
    fn test_is_complete_requires_done_marker() {
        let mut ok = ReplyBuffer::new();
        ok.push("DONE\n");
        assert!(ok.is_complete());

        let mut err = ReplyBuffer::new();
        err.push("ERROR 3\n");
        assert!(err.is_terminal());
        assert!(!err.is_complete());
    }
}
