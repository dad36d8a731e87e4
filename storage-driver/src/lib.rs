//! Storage driver interface shared by every storage backend.

mod content;
mod driver;
mod error;

pub use content::ByteStream;
pub use content::Content;
pub use driver::Driver;
pub use driver::Reader;
pub use error::StorageError;
pub use error::StorageErrorBuilder;
pub use error::StorageErrorKind;
