pub mod flash;
pub mod serial_console;

pub use flash::{FlashProgrammer, Mismatch, Mode, SelfProgram};
pub use serial_console::SerialConsole;
