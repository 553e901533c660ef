pub mod areas;
pub mod check;
pub mod inspect;
pub mod list;
pub mod sheet;
pub mod sync;

pub use areas::handle_areas_command;
pub use check::handle_check_command;
pub use inspect::handle_inspect_command;
pub use list::{ListArgs, handle_list_command};
pub use sheet::{SheetArgs, handle_sheet_command};
pub use sync::{SyncCommands, handle_sync_command};
