mod doctor;
mod init;
mod search;

pub use doctor::run_doctor;
pub use init::run_init;
pub use search::{run_identity, run_search};
