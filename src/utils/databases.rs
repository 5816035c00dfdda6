// Tables whose row counts are reported on every full sync.
pub const TRACKED_TABLES: &[&str] = &["holdings_list", "watch_list", "symbol_info", "sold_list"];
