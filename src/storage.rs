mod file;
mod key_value;
mod memory;
pub mod session;

pub use file::FileStore;
pub use key_value::KeyValueStore;
pub use memory::MemoryStore;
pub use session::SessionRepository;
