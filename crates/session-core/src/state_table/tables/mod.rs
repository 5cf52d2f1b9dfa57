mod common;
mod uac;
mod uas;

pub use common::add_common_transitions;
pub use uac::add_uac_transitions;
pub use uas::add_uas_transitions;
