//! Output table definitions
//!
//! Each table is a projection of a source DataFrame: an ordered list of
//! `source -> output` column mappings plus the columns it is partitioned by.
//! Partition columns are always part of the projection, so they are stored
//! inside the data files as well as in the directory layout.

use super::records::*;

use datafusion::logical_expr::{ident, Expr};

/// Columns produced by timestamp decomposition
pub const START_TIME_COLUMN: &str = "start_time";
pub const HOUR_COLUMN: &str = "hour";
pub const DAY_COLUMN: &str = "day";
pub const WEEK_COLUMN: &str = "week";
pub const MONTH_COLUMN: &str = "month";
pub const YEAR_COLUMN: &str = "year";
pub const WEEKDAY_COLUMN: &str = "weekday";

/// One projected column: read `source`, write it as `output`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub source: &'static str,
    pub output: &'static str,
}

const fn col(source: &'static str, output: &'static str) -> ColumnMapping {
    ColumnMapping { source, output }
}

const fn same(name: &'static str) -> ColumnMapping {
    ColumnMapping {
        source: name,
        output: name,
    }
}

/// A logical output table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name, also the sub-directory under the output root
    pub name: &'static str,
    /// Ordered projection from the source DataFrame
    pub columns: &'static [ColumnMapping],
    /// Output columns used for Hive-style partition directories, outermost first
    pub partition_by: &'static [&'static str],
}

impl TableDefinition {
    pub fn is_partitioned(&self) -> bool {
        !self.partition_by.is_empty()
    }

    /// Output column names in order
    pub fn output_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.output)
    }

    /// Select list for `DataFrame::select`. Source names are matched
    /// exactly (no identifier normalization), so `userId` stays `userId`.
    pub fn select_exprs(&self) -> Vec<Expr> {
        self.columns
            .iter()
            .map(|c| ident(c.source).alias(c.output))
            .collect()
    }
}

pub const SONGS: TableDefinition = TableDefinition {
    name: "songs",
    columns: &[
        same(SONG_ID_FIELD),
        same(TITLE_FIELD),
        same(ARTIST_ID_FIELD),
        same(YEAR_FIELD),
        same(DURATION_FIELD),
    ],
    partition_by: &[YEAR_FIELD, ARTIST_ID_FIELD],
};

pub const ARTISTS: TableDefinition = TableDefinition {
    name: "artists",
    columns: &[
        same(ARTIST_ID_FIELD),
        col(ARTIST_NAME_FIELD, "name"),
        col(ARTIST_LOCATION_FIELD, "location"),
        col(ARTIST_LATITUDE_FIELD, "latitude"),
        col(ARTIST_LONGITUDE_FIELD, "longitude"),
    ],
    partition_by: &[],
};

pub const USERS: TableDefinition = TableDefinition {
    name: "users",
    columns: &[
        col(USAGE_USER_ID_FIELD, "user_id"),
        col(USAGE_FIRST_NAME_FIELD, "first_name"),
        col(USAGE_LAST_NAME_FIELD, "last_name"),
        same(USAGE_GENDER_FIELD),
        same(USAGE_LEVEL_FIELD),
    ],
    partition_by: &[],
};

pub const TIME: TableDefinition = TableDefinition {
    name: "time",
    columns: &[
        same(START_TIME_COLUMN),
        same(HOUR_COLUMN),
        same(DAY_COLUMN),
        same(WEEK_COLUMN),
        same(MONTH_COLUMN),
        same(YEAR_COLUMN),
        same(WEEKDAY_COLUMN),
    ],
    partition_by: &[YEAR_COLUMN, MONTH_COLUMN],
};

pub const SONGPLAYS: TableDefinition = TableDefinition {
    name: "songplays",
    columns: &[
        same(START_TIME_COLUMN),
        col(USAGE_USER_ID_FIELD, "user_id"),
        same(USAGE_LEVEL_FIELD),
        same(SONG_ID_FIELD),
        same(ARTIST_ID_FIELD),
        col(USAGE_SESSION_ID_FIELD, "session_id"),
        same(USAGE_LOCATION_FIELD),
        col(USAGE_USER_AGENT_FIELD, "user_agent"),
        same(YEAR_COLUMN),
        same(MONTH_COLUMN),
    ],
    partition_by: &[YEAR_COLUMN, MONTH_COLUMN],
};

/// Every table a full run produces
pub const ALL_TABLES: [TableDefinition; 5] = [SONGS, ARTISTS, USERS, TIME, SONGPLAYS];
