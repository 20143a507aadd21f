pub mod interfaces;

pub use interfaces::InterfaceService;
