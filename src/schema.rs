/// Column-name constants for POD failure tables.
/// Single source of truth - exported to Python via PyO3.

// ── Record columns ──────────────────────────────────────────────────────────
pub mod record {
    pub const WHS: &str = "WHS";
    pub const TEAM_ID: &str = "team_id";
    pub const RESULT: &str = "result";
    pub const DRIVER_ID: &str = "Driver ID";
    pub const TNO: &str = "tno";
}

// ── Photo slots ─────────────────────────────────────────────────────────────
pub mod photos {
    pub const POD_1: &str = "pod_1";
    pub const POD_2: &str = "pod_2";
    pub const POD_3: &str = "pod_3";
    pub const POD_4: &str = "pod_4";
    pub const POD_5: &str = "pod_5";
    pub const POD_6: &str = "pod_6";

    pub const ALL: [&str; 6] = [POD_1, POD_2, POD_3, POD_4, POD_5, POD_6];
}

// ── Columns added by the pipeline ───────────────────────────────────────────
pub mod derived {
    pub const SOURCE_TABLE: &str = "source_table";
    pub const COUNT: &str = "count";
}

// ── Export naming ───────────────────────────────────────────────────────────
pub mod export {
    pub const ARTIFACT_SUFFIX: &str = "PODfailed";
    pub const ARTIFACT_EXTENSION: &str = "xlsx";
    pub const ARCHIVE_NAME: &str = "PODfailed_exports.zip";
    pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
}

// ── Selection sentinels ─────────────────────────────────────────────────────
pub mod choice {
    pub const ALL: &str = "All";
    pub const UNKNOWN_WHS: &str = "UnknownWHS";
    pub const UNKNOWN_TEAM: &str = "UnknownTeam";
    pub const UNKNOWN_PARCEL: &str = "Unknown";
}
