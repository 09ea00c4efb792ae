pub mod accounts;
pub mod dates;
pub mod files;
pub mod numbers;

// Re-export commonly used items
pub use crate::accounts::{AliasTable, ResolutionStats, resolve_account};
pub use crate::dates::{extract_folder_date, latest_dated_folder, parse_flexible_date};
pub use crate::files::find_latest_matching;
pub use crate::numbers::coerce_number;
