//! Per-player session statistics.

use statkeep_db::{Database, OwnerKey, Query, SqlValue, StatEntity};

use crate::tables::players;
use crate::util;

/// The per-player record that is being tracked.
///
/// Constructed when a player's session opens, hydrated once through
/// [`StatEntity::fetch_data`], and pushed on every sync. The owning
/// session is expected to call [`PlayerStats::set_online`] with `false`
/// and push one final time before dropping the record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStats {
    name: String,
    online: bool,
    session_start: i64,
    first_login: i64,
    logins: i32,
}

impl PlayerStats {
    /// Record for a session opening right now.
    pub fn new(name: impl Into<String>) -> Self {
        Self::new_at(name, util::timestamp())
    }

    /// Record for a session that opened at a known instant, typically
    /// the login event's own timestamp.
    pub fn new_at(name: impl Into<String>, at: i64) -> Self {
        Self {
            name: name.into(),
            online: true,
            session_start: at,
            first_login: at,
            logins: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub fn logins(&self) -> i32 {
        self.logins
    }

    /// Count one completed login.
    pub fn record_login(&mut self) {
        self.logins += 1;
    }

    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    pub fn first_login(&self) -> i64 {
        self.first_login
    }
}

impl StatEntity for PlayerStats {
    fn fetch_data(&mut self, db: &Database, owner: OwnerKey) {
        let rows = Query::table(players::TABLE)
            .columns([players::FIRST_LOGIN, players::LOGINS])
            .filter(players::PLAYER_ID, owner)
            .select(db);
        match rows.first() {
            None => {
                Query::table(players::TABLE)
                    .values(self.values(owner))
                    .insert(db);
            }
            Some(row) => {
                match row.get_long(players::FIRST_LOGIN) {
                    Ok(v) => self.first_login = v,
                    Err(e) => log::warn!("players row for {owner}: {e}"),
                }
                match row.get_int(players::LOGINS) {
                    Ok(v) => self.logins = v,
                    Err(e) => log::warn!("players row for {owner}: {e}"),
                }
            }
        }
    }

    fn push_data(&self, db: &Database, owner: OwnerKey) -> bool {
        Query::table(players::TABLE)
            .values(self.values(owner))
            .filter(players::PLAYER_ID, owner)
            .update(db)
    }

    fn values(&self, owner: OwnerKey) -> Vec<(&'static str, SqlValue)> {
        vec![
            (players::PLAYER_ID, owner.into()),
            (players::NAME, self.name.as_str().into()),
            (players::ONLINE, self.online.into()),
            (players::SESSION_START, self.session_start.into()),
            (players::FIRST_LOGIN, self.first_login.into()),
            (players::LOGINS, self.logins.into()),
        ]
    }
}
