pub mod match_perks;
pub mod match_players;
pub mod matches;

use sea_orm_migration::prelude::*;

pub struct Migrator;

impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(matches::Migration),
            Box::new(match_players::Migration),
            Box::new(match_perks::Migration),
        ]
    }
}
