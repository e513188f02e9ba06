pub mod controller_service;
pub mod server;

pub use controller_service::ControllerService;
pub use server::GrpcServer;
