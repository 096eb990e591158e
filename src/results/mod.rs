mod outcome;
mod result_set;
mod row;

pub use outcome::{LastInsertId, MutationResult};
pub use result_set::RecordSet;
pub use row::Record;
