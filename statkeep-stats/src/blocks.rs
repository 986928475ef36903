//! Per-material block placement and destruction counters.

use statkeep_db::{Database, OwnerKey, Query, SqlValue, StatEntity};

use crate::tables::total_blocks;

/// Destroyed/placed counters for one player and one material.
///
/// One row per `(player, material_id, material_data)` triple; the
/// material pair is part of the key, so fetch and push filter on all
/// three columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTotals {
    material_id: i32,
    material_data: i32,
    destroyed: i32,
    placed: i32,
}

impl BlockTotals {
    pub fn new(material_id: i32, material_data: i32) -> Self {
        Self {
            material_id,
            material_data,
            destroyed: 0,
            placed: 0,
        }
    }

    pub fn material_id(&self) -> i32 {
        self.material_id
    }

    pub fn material_data(&self) -> i32 {
        self.material_data
    }

    pub fn destroyed(&self) -> i32 {
        self.destroyed
    }

    pub fn placed(&self) -> i32 {
        self.placed
    }

    pub fn record_destroyed(&mut self) {
        self.destroyed += 1;
    }

    pub fn record_placed(&mut self) {
        self.placed += 1;
    }
}

impl StatEntity for BlockTotals {
    fn fetch_data(&mut self, db: &Database, owner: OwnerKey) {
        let rows = Query::table(total_blocks::TABLE)
            .columns([total_blocks::DESTROYED, total_blocks::PLACED])
            .filter(total_blocks::PLAYER_ID, owner)
            .filter(total_blocks::MATERIAL_ID, self.material_id)
            .filter(total_blocks::MATERIAL_DATA, self.material_data)
            .select(db);
        match rows.first() {
            None => {
                Query::table(total_blocks::TABLE)
                    .values(self.values(owner))
                    .insert(db);
            }
            Some(row) => {
                match row.get_int(total_blocks::DESTROYED) {
                    Ok(v) => self.destroyed = v,
                    Err(e) => log::warn!("total_blocks row for {owner}: {e}"),
                }
                match row.get_int(total_blocks::PLACED) {
                    Ok(v) => self.placed = v,
                    Err(e) => log::warn!("total_blocks row for {owner}: {e}"),
                }
            }
        }
    }

    fn push_data(&self, db: &Database, owner: OwnerKey) -> bool {
        Query::table(total_blocks::TABLE)
            .values(self.values(owner))
            .filter(total_blocks::PLAYER_ID, owner)
            .filter(total_blocks::MATERIAL_ID, self.material_id)
            .filter(total_blocks::MATERIAL_DATA, self.material_data)
            .update(db)
    }

    fn values(&self, owner: OwnerKey) -> Vec<(&'static str, SqlValue)> {
        vec![
            (total_blocks::PLAYER_ID, owner.into()),
            (total_blocks::MATERIAL_ID, self.material_id.into()),
            (total_blocks::MATERIAL_DATA, self.material_data.into()),
            (total_blocks::DESTROYED, self.destroyed.into()),
            (total_blocks::PLACED, self.placed.into()),
        ]
    }
}
