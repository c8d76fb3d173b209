pub mod match_perk;
pub mod match_player;
pub mod match_record;

pub use match_perk::Model as MatchPerk;
pub use match_player::Model as MatchPlayer;
pub use match_record::Model as MatchRecord;
