//! Distance traveled per player, broken down by travel mode.

use statkeep_db::{Database, OwnerKey, Query, SqlValue, StatEntity};

use crate::tables::total_distances;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Foot,
    Ride,
    Minecart,
    Boat,
    Swim,
}

/// Cumulative distance counters for one player, in meters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TravelTotals {
    foot: f64,
    ride: f64,
    minecart: f64,
    boat: f64,
    swim: f64,
}

impl TravelTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, mode: TravelMode, meters: f64) {
        match mode {
            TravelMode::Foot => self.foot += meters,
            TravelMode::Ride => self.ride += meters,
            TravelMode::Minecart => self.minecart += meters,
            TravelMode::Boat => self.boat += meters,
            TravelMode::Swim => self.swim += meters,
        }
    }

    pub fn total(&self) -> f64 {
        self.foot + self.ride + self.minecart + self.boat + self.swim
    }

    pub fn for_mode(&self, mode: TravelMode) -> f64 {
        match mode {
            TravelMode::Foot => self.foot,
            TravelMode::Ride => self.ride,
            TravelMode::Minecart => self.minecart,
            TravelMode::Boat => self.boat,
            TravelMode::Swim => self.swim,
        }
    }
}

impl StatEntity for TravelTotals {
    fn fetch_data(&mut self, db: &Database, owner: OwnerKey) {
        let rows = Query::table(total_distances::TABLE)
            .columns([
                total_distances::FOOT,
                total_distances::RIDE,
                total_distances::MINECART,
                total_distances::BOAT,
                total_distances::SWIM,
            ])
            .filter(total_distances::PLAYER_ID, owner)
            .select(db);
        match rows.first() {
            None => {
                Query::table(total_distances::TABLE)
                    .values(self.values(owner))
                    .insert(db);
            }
            Some(row) => {
                let fields = [
                    (total_distances::FOOT, &mut self.foot),
                    (total_distances::RIDE, &mut self.ride),
                    (total_distances::MINECART, &mut self.minecart),
                    (total_distances::BOAT, &mut self.boat),
                    (total_distances::SWIM, &mut self.swim),
                ];
                for (column, field) in fields {
                    match row.get_double(column) {
                        Ok(v) => *field = v,
                        Err(e) => log::warn!("total_distances row for {owner}: {e}"),
                    }
                }
            }
        }
    }

    fn push_data(&self, db: &Database, owner: OwnerKey) -> bool {
        Query::table(total_distances::TABLE)
            .values(self.values(owner))
            .filter(total_distances::PLAYER_ID, owner)
            .update(db)
    }

    fn values(&self, owner: OwnerKey) -> Vec<(&'static str, SqlValue)> {
        vec![
            (total_distances::PLAYER_ID, owner.into()),
            (total_distances::FOOT, self.foot.into()),
            (total_distances::RIDE, self.ride.into()),
            (total_distances::MINECART, self.minecart.into()),
            (total_distances::BOAT, self.boat.into()),
            (total_distances::SWIM, self.swim.into()),
        ]
    }
}
