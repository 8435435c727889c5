pub mod server;

pub use server::BalanceGrpcServer;
