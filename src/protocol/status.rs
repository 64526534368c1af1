bitflags::bitflags! {
    /// Server status flags, refreshed after every command. Drives whether the
    /// client believes it is inside a transaction, whether auto-commit is on,
    /// and whether another result set follows in a multi-statement response.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ServerStatus: u16 {
        const SERVER_STATUS_IN_TRANS = 1;
        const SERVER_STATUS_AUTOCOMMIT = 1 << 1;
        const SERVER_MORE_RESULTS_EXISTS = 1 << 3;
        const SERVER_STATUS_NO_GOOD_INDEX_USED = 1 << 4;
        const SERVER_STATUS_NO_INDEX_USED = 1 << 5;
        const SERVER_STATUS_CURSOR_EXISTS = 1 << 6;
        const SERVER_STATUS_LAST_ROW_SENT = 1 << 7;
        const SERVER_STATUS_DB_DROPPED = 1 << 8;
        const SERVER_STATUS_NO_BACKSLASH_ESCAPES = 1 << 9;
        const SERVER_STATUS_METADATA_CHANGED = 1 << 10;
        const SERVER_QUERY_WAS_SLOW = 1 << 11;
        const SERVER_PS_OUT_PARAMS = 1 << 12;
        const SERVER_STATUS_IN_TRANS_READONLY = 1 << 13;
        const SERVER_SESSION_STATE_CHANGED = 1 << 14;
    }
}

impl ServerStatus {
    pub fn in_transaction(self) -> bool {
        self.contains(ServerStatus::SERVER_STATUS_IN_TRANS)
    }

    pub fn has_more_results(self) -> bool {
        self.contains(ServerStatus::SERVER_MORE_RESULTS_EXISTS)
    }

    pub fn autocommit(self) -> bool {
        self.contains(ServerStatus::SERVER_STATUS_AUTOCOMMIT)
    }
}
