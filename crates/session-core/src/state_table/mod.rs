//! Call state machine as data
//!
//! Every state change of a [`CallSession`](crate::session::CallSession) is
//! looked up in [`MASTER_TABLE`] by `(Role, CallState, CallEvent)`. A missing
//! entry means the event is not allowed in that state.

pub mod builder;
pub mod tables;
pub mod types;

pub use builder::StateTableBuilder;
pub use types::*;

use std::sync::Arc;

use lazy_static::lazy_static;

lazy_static! {
    /// The master state table - single source of truth for all transitions
    pub static ref MASTER_TABLE: Arc<MasterStateTable> = Arc::new(build_master_table());
}

/// Build the complete master state table
fn build_master_table() -> MasterStateTable {
    let mut builder = StateTableBuilder::new();
    tables::add_uac_transitions(&mut builder);
    tables::add_uas_transitions(&mut builder);
    tables::add_common_transitions(&mut builder);
    let table = builder.build();

    if let Err(errors) = table.validate() {
        tracing::error!("Invalid call state table: {:?}", errors);
    }

    tracing::debug!("Built call state table with {} transitions", table.transition_count());
    table
}
