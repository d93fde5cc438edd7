//! Molecular interactors: curated static data, PSICQUIC services and user
//! uploads addressed by token.

pub mod mitab;
pub mod model;
pub mod parser;
pub mod psicquic;
pub mod service;
pub mod static_interactions;
pub mod tokens;

pub use model::{InteractionsResult, InteractorResource, TupleResult, UploadFormat};
pub use psicquic::PsicquicClient;
pub use service::{parse_accessions, InteractorsService, Paging};
pub use static_interactions::StaticInteractions;
pub use tokens::TokenStore;
