//! Burning module - writes converted discs to audio CDs with wodim
//!
//! Output lines are classified into `BurnStatus` events by an ordered rule
//! list in `parser`; `burner` owns the process and the run-wide state.

mod burner;
mod drives;
mod parser;
mod status;

pub use burner::{BurnOptions, BurnRun, Burner, burn_args};
pub use drives::{
    COMMON_DEVICE_PATHS, DEFAULT_DEVICE, DiscStatus, MediaType, available_drives,
    check_disc_status, parse_device_list,
};
pub use parser::{MAX_RUNNING_PROGRESS, ParseContext, parse_line};
pub use status::{BurnPhase, BurnStatus};
