// Library root: the I/O-free keeper cost and draft-slot engine.
//
// Every calculation here runs over an already-fetched snapshot of league
// facts and returns plain data. Loading and persisting those facts is the
// job of the calling layer (see the keeper-app crate).

pub mod board;
pub mod cascade;
pub mod eligibility;
pub mod model;
pub mod ownership;
pub mod selection;
pub mod settings;
pub mod trade;

pub use board::{build_board, DraftBoard};
pub use cascade::{resolve, CascadeCandidate, CascadeResult};
pub use eligibility::{evaluate, CostResult, EligibilityResult, KeeperEvaluation};
pub use model::*;
pub use ownership::PickLedger;
pub use selection::KeeperRejection;
pub use settings::{KeeperSettings, SettingsError};
pub use trade::{analyze_trade, TradeAnalysis, TradeError, TradeProposal, TradeValueWeights};
