pub mod bet_repository;
pub mod event_repository;
pub mod mapping_repository;
pub mod payout_repository;

pub use bet_repository::BetRepository;
pub use event_repository::EventRepository;
pub use mapping_repository::MappingRepository;
pub use payout_repository::PayoutRepository;
