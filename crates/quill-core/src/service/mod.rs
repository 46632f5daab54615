//! Application services built on the ports.

mod article_mutation;
mod guard;
mod mutator;

pub use article_mutation::{ArticleMutationService, CreateOutcome};
pub use guard::{Claim, IdempotencyConfig, IdempotencyGuard, KeyPolicy, MAX_KEY_LEN};
pub use mutator::{EditCommand, VersionCheckedMutator};
