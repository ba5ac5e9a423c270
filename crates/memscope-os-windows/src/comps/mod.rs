mod handle_table;
mod handle_table_entry;
mod module;
mod process;
mod region;
mod thread;
mod timestamp;
mod unicode_string;

pub use self::{
    handle_table::WindowsHandleTable,
    handle_table_entry::WindowsHandleTableEntry,
    module::WindowsModule,
    process::{ProcessClass, WindowsProcess},
    region::{VadClass, WindowsRegion},
    thread::WindowsThread,
    timestamp::{WIN_TIMESTAMP, WinTimeStampClass, filetime_to_utc, read_timestamp},
    unicode_string::{UnicodeStringClass, read_unicode_string},
};
