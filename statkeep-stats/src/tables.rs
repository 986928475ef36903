//! Table and column names for the tracked statistic categories.
//!
//! Every identifier handed to the query builder comes from here; nothing
//! user-controlled ever names a table or column.

pub mod players {
    pub const TABLE: &str = "players";
    pub const PLAYER_ID: &str = "player_id";
    pub const NAME: &str = "name";
    pub const ONLINE: &str = "online";
    pub const SESSION_START: &str = "session_start";
    pub const FIRST_LOGIN: &str = "first_login";
    pub const LOGINS: &str = "logins";
}

pub mod total_blocks {
    pub const TABLE: &str = "total_blocks";
    pub const ENTRY_ID: &str = "total_blocks_id";
    pub const PLAYER_ID: &str = "player_id";
    pub const MATERIAL_ID: &str = "material_id";
    pub const MATERIAL_DATA: &str = "material_data";
    pub const DESTROYED: &str = "destroyed";
    pub const PLACED: &str = "placed";
}

pub mod total_distances {
    pub const TABLE: &str = "total_distances";
    pub const ENTRY_ID: &str = "total_distances_id";
    pub const PLAYER_ID: &str = "player_id";
    pub const FOOT: &str = "foot";
    pub const RIDE: &str = "ride";
    pub const MINECART: &str = "minecart";
    pub const BOAT: &str = "boat";
    pub const SWIM: &str = "swim";
}
