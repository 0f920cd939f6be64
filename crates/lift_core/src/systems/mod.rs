pub mod dispatch;
pub mod metrics;
pub mod motion;
pub mod snapshot;
pub mod spawner;
