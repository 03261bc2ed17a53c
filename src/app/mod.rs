pub mod errors;
mod service;

pub use errors::AppError;
pub use service::App;
