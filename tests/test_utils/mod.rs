pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    access_event, access_metadata, collector_providers, formatter, read_octet_frame,
};
