pub mod act;
pub mod commit;
pub mod conflicts;
pub mod dashboard;
pub mod init;
pub mod remote;
pub mod status;
pub mod tracking;

pub use act::*;
pub use commit::*;
pub use conflicts::*;
pub use dashboard::*;
pub use init::*;
pub use remote::*;
pub use status::*;
pub use tracking::*;
