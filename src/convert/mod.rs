mod to_record;
mod to_schema;

pub use to_record::{record_name, render_module, render_record, to_record};
pub use to_schema::{schema_of, to_schema};
